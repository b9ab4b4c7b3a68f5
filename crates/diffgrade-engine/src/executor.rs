//! Differential executor: one iteration against both implementations.
//!
//! The same decoded case is invoked on the reference and the candidate, each
//! side drawing from its own random stream. Behaviors are captured (return
//! value, fault category, printed output when the operation captures it) and
//! judged for equivalence — structurally by default, or by a custom verifier
//! that observes candidate state through a reference-shaped proxy.

use crate::handle::{OpContext, OpFn, VerifierDecl};
use crate::rng::DeterministicRng;
use crate::step::{BehaviorKind, CapturedBehavior, ExecutedStep, Fault};
use crate::value::Value;

/// Category assigned to default structural-comparison failures.
pub const COMPARISON_FAULT_CATEGORY: &str = "comparison";

/// Executes single iterations in lockstep and judges equivalence.
#[derive(Clone)]
pub struct DifferentialExecutor {
    reference_op: Option<OpFn>,
    candidate_op: Option<OpFn>,
    instance_bound: bool,
    captures_output: bool,
    reference_type_name: String,
    public_fields: Vec<String>,
    verifier: Option<VerifierDecl>,
}

impl DifferentialExecutor {
    pub fn new(
        reference_op: Option<OpFn>,
        candidate_op: Option<OpFn>,
        instance_bound: bool,
        captures_output: bool,
        reference_type_name: String,
        public_fields: Vec<String>,
        verifier: Option<VerifierDecl>,
    ) -> Self {
        Self {
            reference_op,
            candidate_op,
            instance_bound,
            captures_output,
            reference_type_name,
            public_fields,
            verifier,
        }
    }

    /// Run one iteration on both sides and judge the outcome.
    pub fn execute(
        &self,
        iteration: u64,
        mut reference_receiver: Option<Value>,
        mut candidate_receiver: Option<Value>,
        reference_args: Vec<Value>,
        candidate_args: Vec<Value>,
        scheduler_rng: &mut DeterministicRng,
    ) -> ExecutedStep {
        let reference_behavior = self.run_one(
            self.reference_op.as_ref(),
            reference_receiver.as_mut(),
            reference_args,
        );
        let mut candidate_behavior = self.run_one(
            self.candidate_op.as_ref(),
            candidate_receiver.as_mut(),
            candidate_args,
        );

        // Candidate state is always observed through a reference-shaped
        // proxy, so comparators written against the reference's public field
        // names see the candidate's values.
        let proxy = self.reference_shaped_proxy(candidate_receiver.as_ref());
        if proxy.is_some() {
            candidate_behavior.receiver = proxy;
        }

        let comparison_fault = match &self.verifier {
            None => structural_judgment(&reference_behavior, &candidate_behavior),
            Some(verifier) => {
                let rng = verifier.wants_random.then_some(&mut *scheduler_rng);
                (verifier.verify)(&reference_behavior, &candidate_behavior, rng).err()
            }
        };

        ExecutedStep {
            iteration,
            reference_receiver,
            candidate_receiver,
            succeeded: comparison_fault.is_none(),
            reference_behavior,
            candidate_behavior,
            comparison_fault,
        }
    }

    fn run_one(
        &self,
        op: Option<&OpFn>,
        mut receiver: Option<&mut Value>,
        args: Vec<Value>,
    ) -> CapturedBehavior {
        let Some(op) = op else {
            let receiver = receiver.map(|r| r.clone());
            return CapturedBehavior::verify_only(receiver, args);
        };

        let mut ctx = OpContext::default();
        let result = op(receiver.as_deref_mut(), &args, &mut ctx);
        // The captured view reflects the receiver after the invocation, so
        // comparators observe post-call state.
        let receiver_view = receiver.as_ref().map(|r| (**r).clone());
        let (kind, output, fault) = match result {
            Ok(value) => (BehaviorKind::Returned, Some(value), None),
            Err(fault) => (BehaviorKind::Threw, None, Some(fault)),
        };
        let (stdout, stderr) = if self.captures_output {
            (Some(ctx.stdout), Some(ctx.stderr))
        } else {
            (None, None)
        };
        CapturedBehavior {
            kind,
            receiver: receiver_view,
            args,
            output,
            fault,
            stdout,
            stderr,
        }
    }

    fn reference_shaped_proxy(&self, candidate_receiver: Option<&Value>) -> Option<Value> {
        if !self.instance_bound {
            return None;
        }
        let candidate = candidate_receiver?;
        let mut proxy = Value::record(self.reference_type_name.clone());
        for field in &self.public_fields {
            if let Some(value) = candidate.field(field) {
                proxy.set_field(field, value.clone());
            }
        }
        Some(proxy)
    }
}

/// The default equivalence judgment: same fault category (or none), equal
/// return values, equal captured stdout and stderr.
fn structural_judgment(
    reference: &CapturedBehavior,
    candidate: &CapturedBehavior,
) -> Option<Fault> {
    match (&reference.fault, &candidate.fault) {
        (Some(expected), Some(found)) if !expected.same_category(found) => {
            return Some(Fault::new(
                COMPARISON_FAULT_CATEGORY,
                format!(
                    "fault category mismatch: expected `{}', found `{}'",
                    expected.category, found.category
                ),
            ));
        }
        (Some(expected), None) => {
            return Some(Fault::new(
                COMPARISON_FAULT_CATEGORY,
                format!("expected a `{}' fault, but the candidate returned", expected.category),
            ));
        }
        (None, Some(found)) => {
            return Some(Fault::new(
                COMPARISON_FAULT_CATEGORY,
                format!("candidate threw an unexpected `{}' fault", found.category),
            ));
        }
        _ => {}
    }

    if reference.output != candidate.output {
        let expected = display_opt(&reference.output);
        let found = display_opt(&candidate.output);
        return Some(Fault::new(
            COMPARISON_FAULT_CATEGORY,
            format!("return value mismatch: expected {expected}, found {found}"),
        ));
    }
    if reference.stdout != candidate.stdout {
        return Some(Fault::new(
            COMPARISON_FAULT_CATEGORY,
            "captured stdout mismatch",
        ));
    }
    if reference.stderr != candidate.stderr {
        return Some(Fault::new(
            COMPARISON_FAULT_CATEGORY,
            "captured stderr mismatch",
        ));
    }
    None
}

fn display_opt(value: &Option<Value>) -> String {
    value
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_else(|| "nothing".to_string())
}
