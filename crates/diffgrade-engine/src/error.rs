//! Binding and loading error taxonomy.
//!
//! Configuration/misuse faults abort binding entirely; submission mismatch
//! aborts loading for that candidate only. Comparison faults and discards are
//! per-iteration data, never errors, and a timeout is a flag on the run
//! output — none of those appear here.

use thiserror::Error;

use crate::cases::CaseConflict;
use crate::resolution::ResolutionError;

/// Fatal configuration/misuse faults, reported before any iteration runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("no operation or standalone verifier named `{label}' was found on `{reference}'")]
    MissingOperation { reference: String, label: String },

    #[error("found multiple operations named `{label}'")]
    AmbiguousOperation { label: String },

    #[error("found multiple verifiers named `{label}'")]
    AmbiguousVerifier { label: String },

    #[error("no operation named `{label}' was found; perhaps the verifier `{label}' should be standalone")]
    VerifierNotStandalone { label: String },

    #[error("found multiple preconditions named `{label}'")]
    AmbiguousPrecondition { label: String },

    #[error("found multiple state-transition declarations applicable to `{label}'")]
    AmbiguousNextState { label: String },

    #[error("the operation and verifier for `{label}' cannot both declare default run configuration")]
    ConflictingDefaultConfig { label: String },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Cases(#[from] CaseConflict),

    #[error(
        "the reference must declare a generator or state-transition for `{type_name}', \
         or expose a no-argument constructor, because `{label}' is instance-bound"
    )]
    MissingReceiverStrategy { type_name: String, label: String },

    #[error("testing the reference against itself timed out")]
    SelfTestTimeout,

    #[error("testing the reference against itself failed on inputs: {inputs}")]
    SelfTestFailure { inputs: String },
}

/// Fatal for one candidate: its shape cannot be tested against the reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("no operation matching `{signature}' was found on candidate `{candidate}'")]
    SubmissionMismatch { candidate: String, signature: String },
}
