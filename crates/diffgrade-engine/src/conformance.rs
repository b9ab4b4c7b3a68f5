//! Structural conformance gate.
//!
//! Structural/API-shape analysis is an external collaborator; the engine only
//! consumes its per-aspect results and gates on the single boolean "did every
//! aspect match". A failed gate still yields a well-formed run output with
//! zero executed steps and the detail attached. `SignatureGate` is the
//! built-in gate covering type name, public fields, and operation signatures.

use serde::{Deserialize, Serialize};

use crate::handle::ImplementationHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AspectResult {
    Matched,
    Mismatched { expected: String, found: String },
}

/// One checked aspect of structural agreement between the two implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisAspect {
    pub aspect: String,
    pub result: AspectResult,
}

impl AnalysisAspect {
    pub fn matched(aspect: impl Into<String>) -> Self {
        Self {
            aspect: aspect.into(),
            result: AspectResult::Matched,
        }
    }

    pub fn mismatched(
        aspect: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            aspect: aspect.into(),
            result: AspectResult::Mismatched {
                expected: expected.into(),
                found: found.into(),
            },
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self.result, AspectResult::Matched)
    }
}

/// Whether every analyzed aspect matched.
pub fn conformance_passed(aspects: &[AnalysisAspect]) -> bool {
    aspects.iter().all(AnalysisAspect::passed)
}

/// Injected capability producing the ordered per-aspect results.
pub trait ConformanceGate: Send + Sync {
    fn analyze(
        &self,
        reference: &ImplementationHandle,
        candidate: &ImplementationHandle,
    ) -> Vec<AnalysisAspect>;
}

/// Built-in gate: type name, public field set, and the presence of every
/// reference operation signature on the candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureGate;

impl ConformanceGate for SignatureGate {
    fn analyze(
        &self,
        reference: &ImplementationHandle,
        candidate: &ImplementationHandle,
    ) -> Vec<AnalysisAspect> {
        let mut aspects = Vec::new();

        if reference.type_name() == candidate.type_name() {
            aspects.push(AnalysisAspect::matched("type name"));
        } else {
            aspects.push(AnalysisAspect::mismatched(
                "type name",
                reference.type_name(),
                candidate.type_name(),
            ));
        }

        let mut expected_fields: Vec<&str> =
            reference.public_fields().iter().map(String::as_str).collect();
        let mut found_fields: Vec<&str> =
            candidate.public_fields().iter().map(String::as_str).collect();
        expected_fields.sort_unstable();
        found_fields.sort_unstable();
        if expected_fields == found_fields {
            aspects.push(AnalysisAspect::matched("public fields"));
        } else {
            aspects.push(AnalysisAspect::mismatched(
                "public fields",
                expected_fields.join(", "),
                found_fields.join(", "),
            ));
        }

        for operation in reference.operations() {
            let signature = operation.signature();
            let aspect = format!("operation `{}'", signature.label);
            match candidate.operation_matching(&signature) {
                Some(_) => aspects.push(AnalysisAspect::matched(aspect)),
                None => {
                    let found = candidate
                        .operations_labeled(&signature.label)
                        .first()
                        .map(|op| op.signature().to_string())
                        .unwrap_or_else(|| "absent".to_string());
                    aspects.push(AnalysisAspect::mismatched(
                        aspect,
                        signature.to_string(),
                        found,
                    ));
                }
            }
        }

        aspects
    }
}
