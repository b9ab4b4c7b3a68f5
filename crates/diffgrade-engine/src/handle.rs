//! Implementation handles: the explicit marker registry.
//!
//! The host's introspection capability builds one `ImplementationHandle` per
//! implementation at load time. The handle is a queryable table of
//! (role, label) declarations — operations, generators, case sets, a
//! state-transition function, preconditions, verifiers, a no-argument
//! constructor — plus public field names and mutable static state. The engine
//! never performs its own ambient reflection; every lookup goes through here.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::cases::CaseDecl;
use crate::config::RunConfig;
use crate::generator::Gen;
use crate::logical_type::LogicalType;
use crate::rng::DeterministicRng;
use crate::step::{CapturedBehavior, Fault};
use crate::value::Value;

/// Invocation context handed to every operation call. Output-capturing
/// operations write their printed text here; the sinks are fresh per
/// invocation and harvested by the executor on every exit path.
#[derive(Debug, Default)]
pub struct OpContext {
    pub stdout: String,
    pub stderr: String,
}

impl OpContext {
    pub fn print(&mut self, text: impl AsRef<str>) {
        self.stdout.push_str(text.as_ref());
    }

    pub fn println(&mut self, text: impl AsRef<str>) {
        self.stdout.push_str(text.as_ref());
        self.stdout.push('\n');
    }

    pub fn eprint(&mut self, text: impl AsRef<str>) {
        self.stderr.push_str(text.as_ref());
    }

    pub fn eprintln(&mut self, text: impl AsRef<str>) {
        self.stderr.push_str(text.as_ref());
        self.stderr.push('\n');
    }
}

pub type OpFn = Arc<
    dyn Fn(Option<&mut Value>, &[Value], &mut OpContext) -> Result<Value, Fault> + Send + Sync,
>;
pub type NextStateFn =
    Arc<dyn Fn(Option<&Value>, u64, &mut DeterministicRng) -> Value + Send + Sync>;
pub type PreconditionFn = Arc<dyn Fn(Option<&Value>, &[Value]) -> bool + Send + Sync>;
pub type VerifierFn = Arc<
    dyn Fn(&CapturedBehavior, &CapturedBehavior, Option<&mut DeterministicRng>) -> Result<(), Fault>
        + Send
        + Sync,
>;
pub type CtorFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// One parameter slot of an operation: its logical type plus the optional
/// label requesting a specific generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub ty: LogicalType,
    pub generator_label: Option<String>,
}

impl ParamSpec {
    pub fn of(ty: LogicalType) -> Self {
        Self {
            ty,
            generator_label: None,
        }
    }

    pub fn with_generator(ty: LogicalType, label: impl Into<String>) -> Self {
        Self {
            ty,
            generator_label: Some(label.into()),
        }
    }
}

/// The comparable shape of an operation: name, parameter types, return type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSignature {
    pub label: String,
    pub param_types: Vec<LogicalType>,
    pub return_type: LogicalType,
    pub instance_bound: bool,
}

impl fmt::Display for OperationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.label)?;
        for (i, ty) in self.param_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty}")?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// An operation under test, as declared by its implementation.
#[derive(Clone)]
pub struct OperationDecl {
    pub label: String,
    pub params: Vec<ParamSpec>,
    pub return_type: LogicalType,
    pub instance_bound: bool,
    pub captures_output: bool,
    pub timeout_ms: Option<u64>,
    pub default_config: Option<RunConfig>,
    pub invoke: OpFn,
}

impl OperationDecl {
    pub fn signature(&self) -> OperationSignature {
        OperationSignature {
            label: self.label.clone(),
            param_types: self.params.iter().map(|p| p.ty.clone()).collect(),
            return_type: self.return_type.clone(),
            instance_bound: self.instance_bound,
        }
    }
}

impl fmt::Debug for OperationDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationDecl({})", self.signature())
    }
}

/// A declared value generator, tagged with its return type and optional label.
#[derive(Clone)]
pub struct GeneratorDecl {
    pub return_type: LogicalType,
    pub label: Option<String>,
    pub enabled: bool,
    pub gen: Gen,
}

impl fmt::Debug for GeneratorDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GeneratorDecl({}, label: {:?}, enabled: {})",
            self.return_type, self.label, self.enabled
        )
    }
}

/// A declared state-transition function producing the next receiver from the
/// previous one. A `label` of `None` applies to every operation.
#[derive(Clone)]
pub struct NextStateDecl {
    pub label: Option<String>,
    pub next: NextStateFn,
}

/// A declared precondition for the operation with the given label.
#[derive(Clone)]
pub struct PreconditionDecl {
    pub label: String,
    pub check: PreconditionFn,
}

/// A declared custom comparator. `standalone` verifiers may exist without an
/// invocable operation; `wants_random` verifiers receive a shared random
/// source as a third input.
#[derive(Clone)]
pub struct VerifierDecl {
    pub label: String,
    pub standalone: bool,
    pub wants_random: bool,
    pub timeout_ms: Option<u64>,
    pub default_config: Option<RunConfig>,
    pub verify: VerifierFn,
}

/// Queryable registry describing one implementation.
#[derive(Clone)]
pub struct ImplementationHandle {
    name: String,
    type_name: String,
    public_fields: Vec<String>,
    operations: Vec<OperationDecl>,
    generators: Vec<GeneratorDecl>,
    cases: Vec<CaseDecl>,
    next_states: Vec<NextStateDecl>,
    preconditions: Vec<PreconditionDecl>,
    verifiers: Vec<VerifierDecl>,
    default_constructor: Option<CtorFn>,
    statics: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl fmt::Debug for ImplementationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ImplementationHandle({} as {}, {} operations)",
            self.name,
            self.type_name,
            self.operations.len()
        )
    }
}

impl ImplementationHandle {
    pub fn builder(name: impl Into<String>, type_name: impl Into<String>) -> HandleBuilder {
        HandleBuilder {
            name: name.into(),
            type_name: type_name.into(),
            public_fields: Vec::new(),
            operations: Vec::new(),
            generators: Vec::new(),
            cases: Vec::new(),
            next_states: Vec::new(),
            preconditions: Vec::new(),
            verifiers: Vec::new(),
            default_constructor: None,
            statics: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The logical type of this implementation's receiver objects.
    pub fn receiver_type(&self) -> LogicalType {
        LogicalType::Named(self.type_name.clone())
    }

    pub fn public_fields(&self) -> &[String] {
        &self.public_fields
    }

    pub fn operations(&self) -> &[OperationDecl] {
        &self.operations
    }

    pub fn operations_labeled(&self, label: &str) -> Vec<&OperationDecl> {
        self.operations.iter().filter(|op| op.label == label).collect()
    }

    /// Find an operation whose shape matches `signature` exactly.
    pub fn operation_matching(&self, signature: &OperationSignature) -> Option<&OperationDecl> {
        self.operations.iter().find(|op| op.signature() == *signature)
    }

    pub fn generators(&self) -> &[GeneratorDecl] {
        &self.generators
    }

    pub fn cases(&self) -> &[CaseDecl] {
        &self.cases
    }

    /// State-transition declarations applicable to the operation with `label`.
    pub fn next_states_for(&self, label: &str) -> Vec<&NextStateDecl> {
        self.next_states
            .iter()
            .filter(|decl| decl.label.as_deref().map(|l| l == label).unwrap_or(true))
            .collect()
    }

    pub fn preconditions_labeled(&self, label: &str) -> Vec<&PreconditionDecl> {
        self.preconditions
            .iter()
            .filter(|decl| decl.label == label)
            .collect()
    }

    pub fn verifiers_labeled(&self, label: &str) -> Vec<&VerifierDecl> {
        self.verifiers
            .iter()
            .filter(|decl| decl.label == label)
            .collect()
    }

    pub fn default_constructor(&self) -> Option<&CtorFn> {
        self.default_constructor.as_ref()
    }

    /// Copy of the implementation's mutable static state.
    pub fn snapshot_statics(&self) -> BTreeMap<String, Value> {
        self.statics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Overwrite the implementation's static state with a snapshot.
    pub fn restore_statics(&self, snapshot: BTreeMap<String, Value>) {
        *self
            .statics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot;
    }

    pub fn static_value(&self, key: &str) -> Option<Value> {
        self.statics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    /// Shared static-state cell; operation closures capture clones of this.
    pub fn statics_cell(&self) -> Arc<Mutex<BTreeMap<String, Value>>> {
        Arc::clone(&self.statics)
    }
}

/// Builder used by the introspection capability to assemble a handle.
pub struct HandleBuilder {
    name: String,
    type_name: String,
    public_fields: Vec<String>,
    operations: Vec<OperationDecl>,
    generators: Vec<GeneratorDecl>,
    cases: Vec<CaseDecl>,
    next_states: Vec<NextStateDecl>,
    preconditions: Vec<PreconditionDecl>,
    verifiers: Vec<VerifierDecl>,
    default_constructor: Option<CtorFn>,
    statics: Arc<Mutex<BTreeMap<String, Value>>>,
}

impl HandleBuilder {
    pub fn public_fields(mut self, fields: impl IntoIterator<Item = &'static str>) -> Self {
        self.public_fields = fields.into_iter().map(str::to_string).collect();
        self
    }

    pub fn operation(mut self, decl: OperationDecl) -> Self {
        self.operations.push(decl);
        self
    }

    pub fn generator(mut self, decl: GeneratorDecl) -> Self {
        self.generators.push(decl);
        self
    }

    pub fn case_set(mut self, decl: CaseDecl) -> Self {
        self.cases.push(decl);
        self
    }

    pub fn next_state(mut self, decl: NextStateDecl) -> Self {
        self.next_states.push(decl);
        self
    }

    pub fn precondition(mut self, decl: PreconditionDecl) -> Self {
        self.preconditions.push(decl);
        self
    }

    pub fn verifier(mut self, decl: VerifierDecl) -> Self {
        self.verifiers.push(decl);
        self
    }

    pub fn default_constructor(
        mut self,
        ctor: impl Fn() -> Value + Send + Sync + 'static,
    ) -> Self {
        self.default_constructor = Some(Arc::new(ctor));
        self
    }

    /// Use an externally created static-state cell, letting operation
    /// closures share it with the handle.
    pub fn statics(mut self, cell: Arc<Mutex<BTreeMap<String, Value>>>) -> Self {
        self.statics = cell;
        self
    }

    pub fn build(self) -> ImplementationHandle {
        ImplementationHandle {
            name: self.name,
            type_name: self.type_name,
            public_fields: self.public_fields,
            operations: self.operations,
            generators: self.generators,
            cases: self.cases,
            next_states: self.next_states,
            preconditions: self.preconditions,
            verifiers: self.verifiers,
            default_constructor: self.default_constructor,
            statics: self.statics,
        }
    }
}
