//! Per-iteration artifacts and the terminal run output.
//!
//! A run appends exactly one `TestStep` per iteration; the sequence is
//! append-only and ordered by iteration index. `RunOutput` is the immutable
//! terminal artifact and carries a SHA-256 digest over the step sequence so
//! two runs can be compared for byte-identical behavior.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::conformance::AnalysisAspect;
use crate::value::Value;

/// A fault thrown by an operation or raised by a comparator. Faults compare
/// by category only; the message is diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub category: String,
    pub message: String,
}

impl Fault {
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
        }
    }

    pub fn same_category(&self, other: &Fault) -> bool {
        self.category == other.category
    }
}

/// The kinds of behavior an operation under test can exhibit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    Returned,
    Threw,
    VerifyOnly,
}

impl BehaviorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Returned => "returned",
            Self::Threw => "threw",
            Self::VerifyOnly => "verify_only",
        }
    }
}

/// Everything observed from one side of one iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedBehavior {
    pub kind: BehaviorKind,
    /// Receiver in its reference-compatible view (candidate receivers are
    /// proxied onto the reference shape before comparison).
    pub receiver: Option<Value>,
    pub args: Vec<Value>,
    pub output: Option<Value>,
    pub fault: Option<Fault>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl CapturedBehavior {
    pub fn verify_only(receiver: Option<Value>, args: Vec<Value>) -> Self {
        Self {
            kind: BehaviorKind::VerifyOnly,
            receiver,
            args,
            output: None,
            fault: None,
            stdout: None,
            stderr: None,
        }
    }
}

/// A test case that ran to comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedStep {
    pub iteration: u64,
    pub reference_receiver: Option<Value>,
    pub candidate_receiver: Option<Value>,
    pub succeeded: bool,
    pub reference_behavior: CapturedBehavior,
    pub candidate_behavior: CapturedBehavior,
    pub comparison_fault: Option<Fault>,
}

/// A test case whose inputs failed the declared precondition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardedStep {
    pub iteration: u64,
    pub receiver: Option<Value>,
    pub args: Vec<Value>,
}

/// One iteration of the main testing loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TestStep {
    Executed(ExecutedStep),
    Discarded(DiscardedStep),
}

impl TestStep {
    pub fn iteration(&self) -> u64 {
        match self {
            TestStep::Executed(step) => step.iteration,
            TestStep::Discarded(step) => step.iteration,
        }
    }

    pub fn was_discarded(&self) -> bool {
        matches!(self, TestStep::Discarded(_))
    }
}

/// Running totals per scheduler block. Discards are tracked separately and
/// never count toward the executed total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCounts {
    pub discarded_tests: u32,
    pub edge_tests: u32,
    pub simple_tests: u32,
    pub simple_edge_mixed_tests: u32,
    pub all_generated_tests: u32,
    pub generated_mixed_tests: u32,
}

impl BlockCounts {
    /// Executed tests across all blocks.
    pub fn num_tests(&self) -> u32 {
        self.edge_tests
            + self.simple_tests
            + self.simple_edge_mixed_tests
            + self.all_generated_tests
            + self.generated_mixed_tests
    }
}

/// The immutable output of one differential run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutput {
    pub seed: u64,
    pub reference: String,
    pub candidate: String,
    pub operation_label: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub timed_out: bool,
    pub num_discarded_tests: u32,
    pub num_tests: u32,
    pub num_edge_case_tests: u32,
    pub num_simple_case_tests: u32,
    pub num_simple_edge_mixed_tests: u32,
    pub num_all_generated_tests: u32,
    pub num_generated_mixed_tests: u32,
    pub conformance: Vec<AnalysisAspect>,
    pub steps: Vec<TestStep>,
}

#[derive(Serialize)]
struct DigestView<'a> {
    seed: u64,
    operation_label: &'a str,
    timed_out: bool,
    counts: [u32; 6],
    steps: &'a [TestStep],
}

impl RunOutput {
    /// Whether every executed step compared equal.
    pub fn all_succeeded(&self) -> bool {
        self.steps.iter().all(|step| match step {
            TestStep::Executed(s) => s.succeeded,
            TestStep::Discarded(_) => true,
        })
    }

    pub fn executed_steps(&self) -> impl Iterator<Item = &ExecutedStep> {
        self.steps.iter().filter_map(|step| match step {
            TestStep::Executed(s) => Some(s),
            TestStep::Discarded(_) => None,
        })
    }

    /// Deterministic fingerprint of the run's observable behavior. Wall-clock
    /// timestamps are excluded so replays of the same seed digest equally.
    pub fn digest(&self) -> String {
        let view = DigestView {
            seed: self.seed,
            operation_label: &self.operation_label,
            timed_out: self.timed_out,
            counts: [
                self.num_tests,
                self.num_edge_case_tests,
                self.num_simple_case_tests,
                self.num_simple_edge_mixed_tests,
                self.num_all_generated_tests,
                self.num_generated_mixed_tests,
            ],
            steps: &self.steps,
        };
        let bytes = serde_json::to_vec(&view).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hasher.finalize();
        let mut out = String::with_capacity(digest.len() * 2);
        for byte in digest {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}
