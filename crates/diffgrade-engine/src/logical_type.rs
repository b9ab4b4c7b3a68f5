//! Logical types and the keys that address generators and case tables.
//!
//! A `TypeKey` pairs a logical type with an optional generator label; at most
//! one enabled generator and one edge/simple case source may resolve per key.
//! Structural compatibility matching is deliberately conservative: a
//! parametrized or wildcard-bounded request may reuse a generator declared for
//! a compatible shape, but an unrelated type never matches.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    Unit,
    Bool,
    Int,
    Double,
    Char,
    Str,
    Array(Box<LogicalType>),
    Named(String),
    Parametrized(String, Vec<TypeArg>),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeArg {
    Concrete(LogicalType),
    Wildcard {
        lower: Option<Box<LogicalType>>,
        upper: Option<Box<LogicalType>>,
    },
}

impl LogicalType {
    pub fn named(name: impl Into<String>) -> Self {
        LogicalType::Named(name.into())
    }

    pub fn array_of(element: LogicalType) -> Self {
        LogicalType::Array(Box::new(element))
    }

    /// Whether a generator known for `known` may serve a request for `self`.
    ///
    /// Exact equality always matches. A parametrized request matches a
    /// parametrized known type with the same head and pairwise-compatible
    /// arguments, which lets a request like `Consumer<? super Event>` reuse a
    /// generator declared for `Consumer<Event>`. Everything else is rejected.
    pub fn compatible_with(&self, known: &LogicalType) -> bool {
        if self == known {
            return true;
        }
        match (self, known) {
            (LogicalType::Parametrized(req_head, req_args), LogicalType::Parametrized(k_head, k_args)) => {
                req_head == k_head
                    && req_args.len() == k_args.len()
                    && req_args
                        .iter()
                        .zip(k_args.iter())
                        .all(|(r, k)| r.compatible_with(k))
            }
            _ => false,
        }
    }
}

impl TypeArg {
    /// Compatibility of one requested type argument against a known one.
    /// Only the requested side may carry a wildcard; a wildcard with no bound
    /// at all never matches.
    pub fn compatible_with(&self, known: &TypeArg) -> bool {
        if self == known {
            return true;
        }
        match (self, known) {
            (TypeArg::Concrete(req), TypeArg::Concrete(k)) => req.compatible_with(k),
            (TypeArg::Wildcard { lower, upper }, TypeArg::Concrete(k)) => {
                let has_lower = lower.is_some();
                let has_upper = upper.is_some();
                let matches_lower = lower
                    .as_deref()
                    .map(|bound| bound.compatible_with(k))
                    .unwrap_or(false);
                let matches_upper = upper
                    .as_deref()
                    .map(|bound| bound.compatible_with(k))
                    .unwrap_or(false);
                (!has_lower || matches_lower)
                    && (!has_upper || matches_upper)
                    && (has_lower || has_upper)
            }
            _ => false,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Unit => f.write_str("unit"),
            LogicalType::Bool => f.write_str("bool"),
            LogicalType::Int => f.write_str("int"),
            LogicalType::Double => f.write_str("double"),
            LogicalType::Char => f.write_str("char"),
            LogicalType::Str => f.write_str("string"),
            LogicalType::Array(element) => write!(f, "{element}[]"),
            LogicalType::Named(name) => f.write_str(name),
            LogicalType::Parametrized(head, args) => {
                write!(f, "{head}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
        }
    }
}

impl fmt::Display for TypeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArg::Concrete(ty) => write!(f, "{ty}"),
            TypeArg::Wildcard { lower: Some(b), .. } => write!(f, "? super {b}"),
            TypeArg::Wildcard {
                upper: Some(b),
                lower: None,
            } => write!(f, "? extends {b}"),
            TypeArg::Wildcard { .. } => f.write_str("?"),
        }
    }
}

/// Addresses one generator or case-table slot: a logical type plus the
/// optional label a parameter may request a specific generator by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeKey {
    pub ty: LogicalType,
    pub label: Option<String>,
}

impl TypeKey {
    pub fn unlabeled(ty: LogicalType) -> Self {
        Self { ty, label: None }
    }

    pub fn labeled(ty: LogicalType, label: impl Into<String>) -> Self {
        Self {
            ty,
            label: Some(label.into()),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} (generator `{label}')", self.ty),
            None => write!(f, "{}", self.ty),
        }
    }
}
