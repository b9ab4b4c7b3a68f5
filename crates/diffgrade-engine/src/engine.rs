//! Binding, loading, and running.
//!
//! `Engine::bind` resolves one operation label against the reference
//! implementation into everything the loop needs — operation or standalone
//! verifier, generator map, case tables, receiver strategy, timeout — and
//! proves the configuration sound by running the reference against a copy of
//! itself with a fixed seed. `Engine::load` gates one candidate through the
//! structural conformance check and yields a `Runner`; `Runner::run` executes
//! the lockstep loop inside the injected sandbox and assembles the run
//! output.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::cases::{CaseKind, CaseTables};
use crate::conformance::{conformance_passed, AnalysisAspect, ConformanceGate, SignatureGate};
use crate::config::RunConfig;
use crate::environment::{StaticStateGuard, TestEnvironment};
use crate::error::{BindError, LoadError};
use crate::executor::DifferentialExecutor;
use crate::handle::{
    GeneratorDecl, ImplementationHandle, NextStateFn, OperationDecl, ParamSpec, PreconditionFn,
    VerifierDecl,
};
use crate::logical_type::{LogicalType, TypeKey};
use crate::receiver::{ReceiverFactory, ReceiverStrategy};
use crate::resolution::{resolve_generators, GeneratorMap};
use crate::scheduler::{CaseScheduler, SideContext};
use crate::step::{BlockCounts, RunOutput, TestStep};

const SELF_TEST_SEED: u64 = 0x0403;
const SELF_TEST_TIMEOUT_MS: u64 = 10_000;

/// Everything bind time resolved for one operation label. Shared read-only
/// by every runner loaded from the same engine.
struct BoundOperation {
    reference: ImplementationHandle,
    operation_label: String,
    operation: Option<OperationDecl>,
    verifier: Option<VerifierDecl>,
    precondition: Option<PreconditionFn>,
    next_state: Option<NextStateFn>,
    params: Vec<ParamSpec>,
    required: Vec<TypeKey>,
    receiver_type: LogicalType,
    instance_bound: bool,
    captures_output: bool,
    strategy: ReceiverStrategy,
    generators: GeneratorMap,
    edge_cases: CaseTables,
    simple_cases: CaseTables,
    timeout_ms: Option<u64>,
    config: RunConfig,
    gate: Arc<dyn ConformanceGate>,
}

/// A reference implementation bound to one operation label, ready to load
/// candidates against.
pub struct Engine {
    bound: Arc<BoundOperation>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("operation_label", &self.bound.operation_label)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Bind with the built-in structural gate.
    pub fn bind(
        reference: ImplementationHandle,
        operation_label: impl Into<String>,
        defaults: RunConfig,
    ) -> Result<Engine, BindError> {
        Self::bind_with_gate(reference, operation_label, defaults, Arc::new(SignatureGate))
    }

    pub fn bind_with_gate(
        reference: ImplementationHandle,
        operation_label: impl Into<String>,
        defaults: RunConfig,
        gate: Arc<dyn ConformanceGate>,
    ) -> Result<Engine, BindError> {
        let bound = analyze(reference, operation_label.into(), defaults, gate)?;
        let engine = Engine {
            bound: Arc::new(bound),
        };
        engine.self_test()?;
        info!(
            operation = %engine.bound.operation_label,
            strategy = engine.bound.strategy.as_str(),
            "bound reference implementation"
        );
        Ok(engine)
    }

    pub fn operation_label(&self) -> &str {
        &self.bound.operation_label
    }

    pub fn receiver_strategy(&self) -> ReceiverStrategy {
        self.bound.strategy
    }

    /// Gate one candidate and build its runner. A failed gate is not an
    /// error: the runner reports the conformance detail with zero steps.
    pub fn load(
        &self,
        candidate: &ImplementationHandle,
        config: RunConfig,
    ) -> Result<Runner, LoadError> {
        let aspects = self.bound.gate.analyze(&self.bound.reference, candidate);
        if !conformance_passed(&aspects) {
            debug!(candidate = %candidate.name(), "conformance gate failed");
            return Ok(Runner::FailedConformance(FailedConformanceRunner {
                bound: Arc::clone(&self.bound),
                candidate_name: candidate.name().to_string(),
                conformance: aspects,
            }));
        }

        let candidate_op = match &self.bound.operation {
            Some(operation) => {
                let signature = operation.signature();
                match candidate.operation_matching(&signature) {
                    Some(found) => Some(found.clone()),
                    None => {
                        return Err(LoadError::SubmissionMismatch {
                            candidate: candidate.name().to_string(),
                            signature: signature.to_string(),
                        })
                    }
                }
            }
            None => None,
        };

        debug!(candidate = %candidate.name(), "loaded candidate");
        let merged = config.apply_over(self.bound.config);
        Ok(Runner::Lockstep(self.make_runner(
            candidate,
            candidate_op,
            aspects,
            merged,
        )))
    }

    /// Run the reference against a structural copy of itself. Any comparison
    /// fault or timeout here means the declarations themselves are unsound.
    fn self_test(&self) -> Result<(), BindError> {
        let runner = self.make_runner(
            &self.bound.reference,
            self.bound.operation.clone(),
            Vec::new(),
            self.bound.config,
        );
        let output = runner.run_bounded(
            SELF_TEST_SEED,
            &TestEnvironment::threaded(),
            RunConfig::new(),
            Some(SELF_TEST_TIMEOUT_MS),
        );
        if output.timed_out {
            return Err(BindError::SelfTestTimeout);
        }
        if let Some(step) = output.executed_steps().find(|step| !step.succeeded) {
            let inputs = step
                .reference_behavior
                .args
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(BindError::SelfTestFailure { inputs });
        }
        Ok(())
    }

    fn make_runner(
        &self,
        candidate: &ImplementationHandle,
        candidate_op: Option<OperationDecl>,
        conformance: Vec<AnalysisAspect>,
        config: RunConfig,
    ) -> LockstepRunner {
        let bound = &self.bound;

        // The candidate draws through the reference's generator declarations
        // so parameter slots stay aligned; only the receiver-type generator
        // is taken from the candidate when it declares its own.
        let mut decls: Vec<GeneratorDecl> = bound.reference.generators().to_vec();
        if let Some(own) = candidate
            .generators()
            .iter()
            .find(|decl| decl.enabled && decl.return_type == bound.receiver_type)
        {
            for decl in &mut decls {
                if decl.enabled && decl.return_type == bound.receiver_type {
                    decl.gen = own.gen.clone();
                }
            }
        }
        let receiver_type = bound.instance_bound.then(|| &bound.receiver_type);
        let candidate_generators = resolve_generators(&bound.required, &decls, receiver_type)
            .unwrap_or_else(|_| bound.generators.clone());

        // Same rule for case tables: reference keys, candidate's own
        // receiver-slot declarations where present.
        let candidate_edge = candidate_case_values(candidate, CaseKind::Edge, &bound.receiver_type);
        let candidate_simple =
            candidate_case_values(candidate, CaseKind::Simple, &bound.receiver_type);
        let edge_cases = match candidate_edge {
            Some(values) => bound
                .edge_cases
                .clone()
                .with_receiver_replaced(&bound.receiver_type, Some(values)),
            None => bound.edge_cases.clone(),
        };
        let simple_cases = match candidate_simple {
            Some(values) => bound
                .simple_cases
                .clone()
                .with_receiver_replaced(&bound.receiver_type, Some(values)),
            None => bound.simple_cases.clone(),
        };

        let reference_side = SideContext {
            generators: bound.generators.clone(),
            edge_cases: bound.edge_cases.clone(),
            simple_cases: bound.simple_cases.clone(),
            receivers: ReceiverFactory::new(
                bound.strategy,
                bound.receiver_type.clone(),
                bound.generators.clone(),
                bound.next_state.clone(),
                bound.reference.default_constructor().cloned(),
            ),
        };
        let candidate_side = SideContext {
            generators: candidate_generators.clone(),
            edge_cases,
            simple_cases,
            receivers: ReceiverFactory::new(
                bound.strategy,
                bound.receiver_type.clone(),
                candidate_generators,
                bound.next_state.clone(),
                candidate.default_constructor().cloned(),
            ),
        };

        let executor = DifferentialExecutor::new(
            bound.operation.as_ref().map(|op| op.invoke.clone()),
            candidate_op.map(|op| op.invoke),
            bound.instance_bound,
            bound.captures_output,
            bound.reference.type_name().to_string(),
            bound.reference.public_fields().to_vec(),
            bound.verifier.clone(),
        );

        LockstepRunner {
            bound: Arc::clone(bound),
            candidate_name: candidate.name().to_string(),
            scheduler: CaseScheduler {
                params: bound.params.clone(),
                receiver_type: bound.receiver_type.clone(),
                executor,
                precondition: bound.precondition.clone(),
            },
            reference_side,
            candidate_side,
            config,
            conformance,
        }
    }
}

fn analyze(
    reference: ImplementationHandle,
    label: String,
    defaults: RunConfig,
    gate: Arc<dyn ConformanceGate>,
) -> Result<BoundOperation, BindError> {
    let operations = reference.operations_labeled(&label);
    let operation = match operations.len() {
        0 => None,
        1 => Some(operations[0].clone()),
        _ => return Err(BindError::AmbiguousOperation { label }),
    };

    let verifiers = reference.verifiers_labeled(&label);
    let verifier = match verifiers.len() {
        0 => None,
        1 => Some(verifiers[0].clone()),
        _ => return Err(BindError::AmbiguousVerifier { label }),
    };

    if operation.is_none() {
        match &verifier {
            None => {
                return Err(BindError::MissingOperation {
                    reference: reference.name().to_string(),
                    label,
                })
            }
            Some(decl) if !decl.standalone => {
                return Err(BindError::VerifierNotStandalone { label })
            }
            Some(_) => {}
        }
    }

    let operation_default = operation.as_ref().and_then(|op| op.default_config);
    let verifier_default = verifier.as_ref().and_then(|v| v.default_config);
    if operation_default.is_some() && verifier_default.is_some() {
        return Err(BindError::ConflictingDefaultConfig { label });
    }
    let config = defaults.apply_over(operation_default.or(verifier_default).unwrap_or_default());

    let params = operation
        .as_ref()
        .map(|op| op.params.clone())
        .unwrap_or_default();
    let instance_bound = operation
        .as_ref()
        .map(|op| op.instance_bound)
        .unwrap_or(false);
    let captures_output = operation
        .as_ref()
        .map(|op| op.captures_output)
        .unwrap_or(false);
    let receiver_type = reference.receiver_type();

    let mut required: Vec<TypeKey> = Vec::new();
    for param in &params {
        let key = TypeKey {
            ty: param.ty.clone(),
            label: param.generator_label.clone(),
        };
        if !required.contains(&key) {
            required.push(key);
        }
    }
    let generators = resolve_generators(
        &required,
        reference.generators(),
        instance_bound.then_some(&receiver_type),
    )?;

    let next_states = reference.next_states_for(&label);
    let next_state = match next_states.len() {
        0 => None,
        1 => Some(next_states[0].next.clone()),
        _ => return Err(BindError::AmbiguousNextState { label }),
    };

    let strategy = ReceiverStrategy::select(
        instance_bound,
        next_state.is_some(),
        generators.get_unlabeled(&receiver_type).is_some(),
        reference.default_constructor().is_some(),
    )
    .ok_or_else(|| BindError::MissingReceiverStrategy {
        type_name: reference.type_name().to_string(),
        label: label.clone(),
    })?;

    let preconditions = reference.preconditions_labeled(&label);
    let precondition = match preconditions.len() {
        0 => None,
        1 => Some(preconditions[0].check.clone()),
        _ => return Err(BindError::AmbiguousPrecondition { label }),
    };

    let mut slot_types: Vec<LogicalType> = vec![receiver_type.clone()];
    slot_types.extend(params.iter().map(|p| p.ty.clone()));
    let edge_cases = CaseTables::build(CaseKind::Edge, &slot_types, reference.cases())?;
    let simple_cases = CaseTables::build(CaseKind::Simple, &slot_types, reference.cases())?;

    let timeout_ms = operation
        .as_ref()
        .and_then(|op| op.timeout_ms)
        .or(verifier.as_ref().and_then(|v| v.timeout_ms));

    Ok(BoundOperation {
        reference,
        operation_label: label,
        operation,
        verifier,
        precondition,
        next_state,
        params,
        required,
        receiver_type,
        instance_bound,
        captures_output,
        strategy,
        generators,
        edge_cases,
        simple_cases,
        timeout_ms,
        config,
        gate,
    })
}

fn candidate_case_values(
    candidate: &ImplementationHandle,
    kind: CaseKind,
    receiver_type: &LogicalType,
) -> Option<Vec<crate::value::Value>> {
    candidate
        .cases()
        .iter()
        .find(|decl| decl.enabled && decl.kind == kind && decl.ty == *receiver_type)
        .map(|decl| decl.values.clone())
}

/// A candidate readied for differential runs.
pub enum Runner {
    Lockstep(LockstepRunner),
    FailedConformance(FailedConformanceRunner),
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Runner::Lockstep(_) => f.debug_tuple("Lockstep").finish(),
            Runner::FailedConformance(_) => f.debug_tuple("FailedConformance").finish(),
        }
    }
}

impl Runner {
    pub fn run(&self, seed: u64, environment: &TestEnvironment, overrides: RunConfig) -> RunOutput {
        match self {
            Runner::Lockstep(runner) => runner.run(seed, environment, overrides),
            Runner::FailedConformance(runner) => runner.run(seed),
        }
    }

    pub fn conformance_passed(&self) -> bool {
        matches!(self, Runner::Lockstep(_))
    }
}

/// Runs the five-block loop against one conforming candidate.
pub struct LockstepRunner {
    bound: Arc<BoundOperation>,
    candidate_name: String,
    scheduler: CaseScheduler,
    reference_side: SideContext,
    candidate_side: SideContext,
    config: RunConfig,
    conformance: Vec<AnalysisAspect>,
}

impl LockstepRunner {
    pub fn run(&self, seed: u64, environment: &TestEnvironment, overrides: RunConfig) -> RunOutput {
        self.run_bounded(seed, environment, overrides, self.bound.timeout_ms)
    }

    fn run_bounded(
        &self,
        seed: u64,
        environment: &TestEnvironment,
        overrides: RunConfig,
        timeout_ms: Option<u64>,
    ) -> RunOutput {
        let resolved = overrides.apply_over(self.config).resolve();
        let started_at = Utc::now();
        let steps: Arc<Mutex<Vec<TestStep>>> = Arc::new(Mutex::new(Vec::new()));
        let counts = Arc::new(Mutex::new(BlockCounts::default()));

        let timed_out;
        {
            // Reference-side globals are restored on every exit path,
            // including a timed-out worker left running detached.
            let _guard = StaticStateGuard::acquire(&self.bound.reference);
            let scheduler = self.scheduler.clone();
            let reference_side = self.reference_side.clone();
            let candidate_side = self.candidate_side.clone();
            let worker_steps = Arc::clone(&steps);
            let worker_counts = Arc::clone(&counts);
            let completed = environment.sandbox.run(
                timeout_ms.map(Duration::from_millis),
                Box::new(move || {
                    scheduler.run_tests(
                        seed,
                        resolved,
                        &reference_side,
                        &candidate_side,
                        &worker_steps,
                        &worker_counts,
                    );
                }),
            );
            timed_out = !completed;
        }

        let counts = *lock(&counts);
        let steps = lock(&steps).clone();
        info!(
            seed,
            candidate = %self.candidate_name,
            num_tests = counts.num_tests(),
            discarded = counts.discarded_tests,
            timed_out,
            "differential run finished"
        );

        RunOutput {
            seed,
            reference: self.bound.reference.name().to_string(),
            candidate: self.candidate_name.clone(),
            operation_label: self.bound.operation_label.clone(),
            started_at,
            ended_at: Utc::now(),
            timed_out,
            num_discarded_tests: counts.discarded_tests,
            num_tests: counts.num_tests(),
            num_edge_case_tests: counts.edge_tests,
            num_simple_case_tests: counts.simple_tests,
            num_simple_edge_mixed_tests: counts.simple_edge_mixed_tests,
            num_all_generated_tests: counts.all_generated_tests,
            num_generated_mixed_tests: counts.generated_mixed_tests,
            conformance: self.conformance.clone(),
            steps,
        }
    }
}

/// Produces well-formed zero-step outputs for a candidate the gate rejected.
pub struct FailedConformanceRunner {
    bound: Arc<BoundOperation>,
    candidate_name: String,
    conformance: Vec<AnalysisAspect>,
}

impl FailedConformanceRunner {
    pub fn run(&self, seed: u64) -> RunOutput {
        let now = Utc::now();
        RunOutput {
            seed,
            reference: self.bound.reference.name().to_string(),
            candidate: self.candidate_name.clone(),
            operation_label: self.bound.operation_label.clone(),
            started_at: now,
            ended_at: now,
            timed_out: false,
            num_discarded_tests: 0,
            num_tests: 0,
            num_edge_case_tests: 0,
            num_simple_case_tests: 0,
            num_simple_edge_mixed_tests: 0,
            num_all_generated_tests: 0,
            num_generated_mixed_tests: 0,
            conformance: self.conformance.clone(),
            steps: Vec::new(),
        }
    }

    pub fn conformance(&self) -> &[AnalysisAspect] {
        &self.conformance
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::step::Fault;
    use crate::value::Value;

    fn add_op() -> OperationDecl {
        OperationDecl {
            label: "add".to_string(),
            params: vec![
                ParamSpec::of(LogicalType::Int),
                ParamSpec::of(LogicalType::Int),
            ],
            return_type: LogicalType::Int,
            instance_bound: false,
            captures_output: false,
            timeout_ms: None,
            default_config: None,
            invoke: Arc::new(|_, args, _| match (&args[0], &args[1]) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
                _ => Err(Fault::new("type", "expected ints")),
            }),
        }
    }

    fn adder(name: &str) -> ImplementationHandle {
        ImplementationHandle::builder(name, "Adder")
            .operation(add_op())
            .build()
    }

    fn small() -> RunConfig {
        RunConfig::new()
            .num_tests(40)
            .max_only_edge_case_tests(8)
            .max_only_simple_case_tests(8)
            .num_simple_edge_mixed_tests(4)
            .num_all_generated_tests(8)
            .max_complexity(10)
    }

    #[test]
    fn bind_rejects_unknown_labels() {
        let err = Engine::bind(adder("ref"), "multiply", RunConfig::new()).unwrap_err();
        assert!(matches!(err, BindError::MissingOperation { .. }));
    }

    #[test]
    fn bind_rejects_duplicate_labels() {
        let reference = ImplementationHandle::builder("ref", "Adder")
            .operation(add_op())
            .operation(add_op())
            .build();
        let err = Engine::bind(reference, "add", RunConfig::new()).unwrap_err();
        assert_eq!(err, BindError::AmbiguousOperation { label: "add".to_string() });
    }

    #[test]
    fn non_standalone_verifier_needs_an_operation() {
        let reference = ImplementationHandle::builder("ref", "Adder")
            .verifier(VerifierDecl {
                label: "check".to_string(),
                standalone: false,
                wants_random: false,
                timeout_ms: None,
                default_config: None,
                verify: Arc::new(|_, _, _| Ok(())),
            })
            .build();
        let err = Engine::bind(reference, "check", RunConfig::new()).unwrap_err();
        assert!(matches!(err, BindError::VerifierNotStandalone { .. }));
    }

    #[test]
    fn conflicting_default_configs_are_rejected() {
        let mut operation = add_op();
        operation.default_config = Some(RunConfig::new().num_tests(10));
        let reference = ImplementationHandle::builder("ref", "Adder")
            .operation(operation)
            .verifier(VerifierDecl {
                label: "add".to_string(),
                standalone: false,
                wants_random: false,
                timeout_ms: None,
                default_config: Some(RunConfig::new().num_tests(20)),
                verify: Arc::new(|_, _, _| Ok(())),
            })
            .build();
        let err = Engine::bind(reference, "add", RunConfig::new()).unwrap_err();
        assert!(matches!(err, BindError::ConflictingDefaultConfig { .. }));
    }

    #[test]
    fn instance_bound_operation_without_any_strategy_fails() {
        let mut operation = add_op();
        operation.instance_bound = true;
        let reference = ImplementationHandle::builder("ref", "Adder")
            .operation(operation)
            .build();
        let err = Engine::bind(reference, "add", small()).unwrap_err();
        assert!(matches!(err, BindError::MissingReceiverStrategy { .. }));
    }

    #[test]
    fn stateless_operations_bind_with_the_stateless_strategy() {
        let engine = Engine::bind(adder("ref"), "add", small()).unwrap();
        assert_eq!(engine.receiver_strategy(), ReceiverStrategy::Stateless);
        assert_eq!(engine.operation_label(), "add");
    }

    #[test]
    fn self_test_catches_order_dependent_references() {
        // The operation leaks shared mutable state across invocations, so the
        // reference disagrees with its own copy and binding must fail.
        let statics = Arc::new(Mutex::new(BTreeMap::new()));
        let cell = Arc::clone(&statics);
        let leaky = OperationDecl {
            label: "count".to_string(),
            params: vec![ParamSpec::of(LogicalType::Int)],
            return_type: LogicalType::Int,
            instance_bound: false,
            captures_output: false,
            timeout_ms: None,
            default_config: None,
            invoke: Arc::new(move |_, _, _| {
                let mut statics = cell.lock().unwrap();
                let next = match statics.get("calls") {
                    Some(Value::Int(n)) => n + 1,
                    _ => 1,
                };
                statics.insert("calls".to_string(), Value::Int(next));
                Ok(Value::Int(next))
            }),
        };
        let reference = ImplementationHandle::builder("ref", "Counter")
            .operation(leaky)
            .statics(statics)
            .build();
        let err = Engine::bind(reference, "count", small()).unwrap_err();
        assert!(matches!(err, BindError::SelfTestFailure { .. }));
    }

    #[test]
    fn gate_failure_yields_a_zero_step_runner() {
        let engine = Engine::bind(adder("ref"), "add", small()).unwrap();
        let shapeless = ImplementationHandle::builder("sub", "Adder").build();
        let runner = engine.load(&shapeless, RunConfig::new()).unwrap();
        assert!(!runner.conformance_passed());

        let output = runner.run(9, &TestEnvironment::unsecured(), RunConfig::new());
        assert_eq!(output.num_tests, 0);
        assert!(output.steps.is_empty());
        assert!(!conformance_passed(&output.conformance));
        assert_eq!(output.candidate, "sub");
    }

    #[test]
    fn mismatched_submission_fails_fast_under_a_permissive_gate() {
        struct AlwaysPasses;
        impl ConformanceGate for AlwaysPasses {
            fn analyze(
                &self,
                _reference: &ImplementationHandle,
                _candidate: &ImplementationHandle,
            ) -> Vec<AnalysisAspect> {
                Vec::new()
            }
        }
        let engine =
            Engine::bind_with_gate(adder("ref"), "add", small(), Arc::new(AlwaysPasses)).unwrap();
        let shapeless = ImplementationHandle::builder("sub", "Adder").build();
        let err = engine.load(&shapeless, RunConfig::new()).unwrap_err();
        match err {
            LoadError::SubmissionMismatch { candidate, signature } => {
                assert_eq!(candidate, "sub");
                assert_eq!(signature, "add(int, int) -> int");
            }
        }
    }

    #[test]
    fn matching_implementations_agree_on_every_step() {
        let engine = Engine::bind(adder("ref"), "add", small()).unwrap();
        let runner = engine.load(&adder("sub"), RunConfig::new()).unwrap();
        let output = runner.run(17, &TestEnvironment::unsecured(), RunConfig::new());
        assert!(output.all_succeeded());
        assert_eq!(output.num_tests, 40);
        assert!(!output.timed_out);
    }

    #[test]
    fn diverging_candidates_produce_failing_steps() {
        let mut broken = add_op();
        broken.invoke = Arc::new(|_, args, _| match (&args[0], &args[1]) {
            // Wrong at zero: 0 + 0 becomes 1.
            (Value::Int(0), Value::Int(0)) => Ok(Value::Int(1)),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
            _ => Err(Fault::new("type", "expected ints")),
        });
        let candidate = ImplementationHandle::builder("sub", "Adder")
            .operation(broken)
            .build();

        // An edge cap above the 25 int/int combinations makes the edge block
        // exhaustive, so (0, 0) is guaranteed to be iteration 1.
        let engine =
            Engine::bind(adder("ref"), "add", small().max_only_edge_case_tests(32)).unwrap();
        let runner = engine.load(&candidate, RunConfig::new()).unwrap();
        let output = runner.run(17, &TestEnvironment::unsecured(), RunConfig::new());
        assert!(!output.all_succeeded());
        let failing = output
            .executed_steps()
            .find(|step| !step.succeeded)
            .unwrap();
        assert_eq!(failing.reference_behavior.args, vec![Value::Int(0), Value::Int(0)]);
    }

    #[test]
    fn run_overrides_take_precedence_over_load_and_bind() {
        let mut operation = add_op();
        operation.default_config = Some(RunConfig::new().num_tests(128));
        let reference = ImplementationHandle::builder("ref", "Adder")
            .operation(operation)
            .build();
        let engine = Engine::bind(
            reference,
            "add",
            RunConfig::new().max_only_simple_case_tests(1),
        )
        .unwrap();
        let runner = engine
            .load(&adder("sub"), RunConfig::new().max_only_edge_case_tests(2))
            .unwrap();
        let output = runner.run(
            1,
            &TestEnvironment::unsecured(),
            RunConfig::new().num_simple_edge_mixed_tests(3),
        );
        assert_eq!(output.num_tests, 128);
        assert_eq!(output.num_simple_case_tests, 1);
        assert_eq!(output.num_edge_case_tests, 2);
        assert_eq!(output.num_simple_edge_mixed_tests, 3);
    }

    #[test]
    fn static_state_is_restored_after_a_run() {
        let statics = Arc::new(Mutex::new(BTreeMap::new()));
        statics
            .lock()
            .unwrap()
            .insert("total".to_string(), Value::Int(0));
        let cell = Arc::clone(&statics);
        let tallying = OperationDecl {
            label: "tally".to_string(),
            params: vec![ParamSpec::of(LogicalType::Int)],
            return_type: LogicalType::Int,
            instance_bound: false,
            captures_output: false,
            timeout_ms: None,
            default_config: None,
            invoke: Arc::new(move |_, args, _| {
                // Mutates a global, but returns a pure function of the args,
                // so the self-test still passes.
                let mut statics = cell.lock().unwrap();
                if let (Some(Value::Int(total)), Value::Int(v)) = (statics.get("total"), &args[0]) {
                    let total = total.wrapping_add(*v);
                    statics.insert("total".to_string(), Value::Int(total));
                }
                Ok(args[0].clone())
            }),
        };
        let reference = ImplementationHandle::builder("ref", "Tally")
            .operation(tallying.clone())
            .statics(statics)
            .build();
        let candidate = ImplementationHandle::builder("sub", "Tally")
            .operation(tallying)
            .build();

        let engine = Engine::bind(reference.clone(), "tally", small()).unwrap();
        let runner = engine.load(&candidate, RunConfig::new()).unwrap();
        let _ = runner.run(3, &TestEnvironment::unsecured(), RunConfig::new());
        assert_eq!(reference.static_value("total"), Some(Value::Int(0)));
    }

    #[test]
    fn operation_timeouts_mark_the_run_timed_out() {
        let mut slow = add_op();
        slow.timeout_ms = Some(30);
        slow.invoke = Arc::new(|_, args, _| {
            std::thread::sleep(Duration::from_millis(20));
            match (&args[0], &args[1]) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
                _ => Err(Fault::new("type", "expected ints")),
            }
        });
        let reference = ImplementationHandle::builder("ref", "Adder")
            .operation(slow.clone())
            .build();
        let candidate = ImplementationHandle::builder("sub", "Adder")
            .operation(slow)
            .build();

        // Bind's self-test runs with its own generous bound; only the real
        // run is held to the 30ms operation timeout.
        let engine = Engine::bind(reference, "add", RunConfig::new().num_tests(4)).unwrap();
        let runner = engine.load(&candidate, RunConfig::new()).unwrap();
        let output = runner.run(5, &TestEnvironment::threaded(), RunConfig::new());
        assert!(output.timed_out);
        // Whatever completed before abandonment is still reported.
        assert!(output.num_tests <= 4);
    }
}
