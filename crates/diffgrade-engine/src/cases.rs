//! Curated edge and simple case tables.
//!
//! Case tables hold literal values prioritized over generated ones for
//! boundary/common-input coverage. Built-in defaults cover the primitive
//! logical types; an implementation's enabled declarations override the
//! default for their type. Tables are read-only after construction and are
//! built once per implementation, addressed through the reference's slot
//! types so reference and candidate slots stay aligned.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logical_type::LogicalType;
use crate::rng::DeterministicRng;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    Edge,
    Simple,
}

impl fmt::Display for CaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Edge => f.write_str("edge"),
            Self::Simple => f.write_str("simple"),
        }
    }
}

/// One declared case set: curated values for a logical type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDecl {
    pub kind: CaseKind,
    pub ty: LogicalType,
    pub label: Option<String>,
    pub enabled: bool,
    pub values: Vec<Value>,
}

/// Two enabled declarations competing for one type is a configuration error;
/// competing candidates must be disambiguated by label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("found multiple enabled {kind} case declarations for type `{ty}'")]
pub struct CaseConflict {
    pub kind: CaseKind,
    pub ty: LogicalType,
}

/// Read-only mapping from slot type to its curated values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseTables {
    map: BTreeMap<LogicalType, Vec<Value>>,
}

impl CaseTables {
    /// Build the effective table for `slot_types` (receiver first): built-in
    /// defaults overlaid with the implementation's enabled declarations of
    /// the given kind.
    pub fn build(
        kind: CaseKind,
        slot_types: &[LogicalType],
        declared: &[CaseDecl],
    ) -> Result<CaseTables, CaseConflict> {
        let mut all: BTreeMap<LogicalType, Vec<Value>> = default_cases(kind);
        let mut seen: BTreeMap<LogicalType, ()> = BTreeMap::new();
        for decl in declared {
            if decl.kind != kind || !decl.enabled {
                continue;
            }
            if seen.insert(decl.ty.clone(), ()).is_some() {
                return Err(CaseConflict {
                    kind,
                    ty: decl.ty.clone(),
                });
            }
            all.insert(decl.ty.clone(), decl.values.clone());
        }

        let mut map = BTreeMap::new();
        for ty in slot_types {
            if let Some(values) = all.get(ty) {
                map.insert(ty.clone(), values.clone());
            }
        }
        Ok(CaseTables { map })
    }

    /// Replace the receiver-type entry with the candidate's own declaration.
    /// Only an already-present entry is replaced, so slot alignment with the
    /// reference's keys is preserved.
    pub fn with_receiver_replaced(
        mut self,
        receiver_ty: &LogicalType,
        values: Option<Vec<Value>>,
    ) -> CaseTables {
        if self.map.contains_key(receiver_ty) {
            match values {
                Some(values) => {
                    self.map.insert(receiver_ty.clone(), values);
                }
                None => {
                    self.map.remove(receiver_ty);
                }
            }
        }
        self
    }

    pub fn get(&self, ty: &LogicalType) -> Option<&[Value]> {
        self.map.get(ty).map(Vec::as_slice)
    }

    pub fn len_of(&self, ty: &LogicalType) -> usize {
        self.map.get(ty).map(Vec::len).unwrap_or(0)
    }

    /// Whether every table is absent or empty.
    pub fn all_empty(&self) -> bool {
        self.map.values().all(Vec::is_empty)
    }

    /// Uniform draw from the table for `ty`; `None` when absent or empty.
    pub fn pick(&self, ty: &LogicalType, rng: &mut DeterministicRng) -> Option<Value> {
        let values = self.map.get(ty)?;
        if values.is_empty() {
            return None;
        }
        let idx = rng.next_below(values.len() as u64) as usize;
        Some(values[idx].clone())
    }
}

fn default_cases(kind: CaseKind) -> BTreeMap<LogicalType, Vec<Value>> {
    let mut map = BTreeMap::new();
    match kind {
        CaseKind::Edge => {
            map.insert(
                LogicalType::Int,
                vec![
                    Value::Int(0),
                    Value::Int(-1),
                    Value::Int(1),
                    Value::Int(i64::MIN),
                    Value::Int(i64::MAX),
                ],
            );
            map.insert(
                LogicalType::Double,
                vec![Value::Double(0.0), Value::Double(-1.0), Value::Double(1.0)],
            );
            map.insert(LogicalType::Bool, vec![Value::Bool(true), Value::Bool(false)]);
            map.insert(LogicalType::Char, vec![Value::Char(' ')]);
            map.insert(LogicalType::Str, vec![Value::Str(String::new())]);
        }
        CaseKind::Simple => {
            map.insert(LogicalType::Int, vec![Value::Int(-1), Value::Int(1)]);
            map.insert(
                LogicalType::Double,
                vec![Value::Double(-1.0), Value::Double(1.0)],
            );
            map.insert(
                LogicalType::Char,
                vec![Value::Char('a'), Value::Char('A'), Value::Char('0')],
            );
            map.insert(
                LogicalType::Str,
                vec![
                    Value::Str("a".to_string()),
                    Value::Str("A".to_string()),
                    Value::Str("0".to_string()),
                ],
            );
        }
    }
    map
}
