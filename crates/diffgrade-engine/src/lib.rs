#![forbid(unsafe_code)]

//! Differential test generation and execution for grading a candidate
//! implementation against a trusted reference.
//!
//! The engine binds one operation of a reference implementation, generates a
//! deterministic schedule of test cases (curated edge and simple cases first,
//! then generated inputs of ramping complexity), runs each case against both
//! implementations in lockstep, and records per-step agreement in an
//! immutable, digestable run output. Same seed, same configuration, same
//! declarations: byte-identical behavior.

pub mod cases;
pub mod config;
pub mod conformance;
pub mod engine;
pub mod environment;
pub mod error;
pub mod executor;
pub mod generator;
pub mod handle;
pub mod logical_type;
pub mod receiver;
pub mod resolution;
pub mod rng;
pub mod scheduler;
pub mod step;
pub mod value;

pub use cases::{CaseDecl, CaseKind, CaseTables};
pub use config::{ResolvedRunConfig, RunConfig};
pub use conformance::{AnalysisAspect, AspectResult, ConformanceGate, SignatureGate};
pub use engine::{Engine, FailedConformanceRunner, LockstepRunner, Runner};
pub use environment::{InlineSandbox, Sandbox, TestEnvironment, ThreadSandbox};
pub use error::{BindError, LoadError};
pub use generator::Gen;
pub use handle::{
    CtorFn, GeneratorDecl, ImplementationHandle, NextStateDecl, NextStateFn, OpContext,
    OpFn, OperationDecl, OperationSignature, ParamSpec, PreconditionDecl, PreconditionFn,
    VerifierDecl, VerifierFn,
};
pub use logical_type::{LogicalType, TypeArg, TypeKey};
pub use receiver::ReceiverStrategy;
pub use rng::DeterministicRng;
pub use step::{
    BehaviorKind, BlockCounts, CapturedBehavior, DiscardedStep, ExecutedStep, Fault, RunOutput,
    TestStep,
};
pub use value::Value;
