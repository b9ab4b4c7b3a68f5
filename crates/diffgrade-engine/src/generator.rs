//! Complexity-parameterized value generators.
//!
//! A `Gen` is a pluggable function from `(complexity, random source)` to a
//! `Value`. Complexity is a monotonic size/difficulty knob, not a count: the
//! scheduler ramps it linearly across the generated blocks. Built-in defaults
//! cover the primitive logical types; strings are built from the char
//! generator and arrays from their element generator.

use std::fmt;
use std::sync::Arc;

use crate::logical_type::{LogicalType, TypeKey};
use crate::rng::DeterministicRng;
use crate::value::Value;

type GenFn = dyn Fn(u32, &mut DeterministicRng) -> Value + Send + Sync;

/// A shareable value generator for one logical type.
#[derive(Clone)]
pub struct Gen {
    inner: Arc<GenFn>,
}

impl Gen {
    pub fn new(f: impl Fn(u32, &mut DeterministicRng) -> Value + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    pub fn generate(&self, complexity: u32, rng: &mut DeterministicRng) -> Value {
        (self.inner)(complexity, rng)
    }
}

impl fmt::Debug for Gen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Gen")
    }
}

/// Signed integers in `[-complexity, complexity]`.
pub fn int_gen() -> Gen {
    Gen::new(|complexity, rng| {
        let bound = i64::from(complexity);
        Value::Int(rng.next_i64_in(-bound, bound))
    })
}

pub fn bool_gen() -> Gen {
    Gen::new(|_, rng| Value::Bool(rng.next_bool()))
}

/// Doubles in `[-complexity, complexity]`.
pub fn double_gen() -> Gen {
    Gen::new(|complexity, rng| {
        let magnitude = f64::from(complexity);
        Value::Double((rng.next_f64() * 2.0 - 1.0) * magnitude)
    })
}

/// Printable ASCII characters.
pub fn char_gen() -> Gen {
    Gen::new(|_, rng| {
        let offset = rng.next_below(95) as u8;
        Value::Char((b' ' + offset) as char)
    })
}

pub fn unit_gen() -> Gen {
    Gen::new(|_, _| Value::Unit)
}

/// Strings of length `0..=complexity` drawn from a character generator.
pub fn string_gen(chars: Gen) -> Gen {
    Gen::new(move |complexity, rng| {
        let len = rng.next_below(u64::from(complexity) + 1);
        let mut out = String::new();
        for _ in 0..len {
            match chars.generate(complexity, rng) {
                Value::Char(c) => out.push(c),
                other => out.push_str(&other.to_string()),
            }
        }
        Value::Str(out)
    })
}

/// Lists of length `0..=complexity`; each element is generated at a fresh
/// complexity drawn below the current one, so large arrays still contain
/// small elements.
pub fn array_gen(element: Gen) -> Gen {
    Gen::new(move |complexity, rng| {
        let len = rng.next_below(u64::from(complexity) + 1);
        let mut items = Vec::with_capacity(len as usize);
        for _ in 0..len {
            let element_complexity = rng.next_below(u64::from(complexity) + 1) as u32;
            items.push(element.generate(element_complexity, rng));
        }
        Value::List(items)
    })
}

/// The built-in generator table, keyed with no label.
pub fn default_generators() -> Vec<(TypeKey, Gen)> {
    vec![
        (TypeKey::unlabeled(LogicalType::Unit), unit_gen()),
        (TypeKey::unlabeled(LogicalType::Bool), bool_gen()),
        (TypeKey::unlabeled(LogicalType::Int), int_gen()),
        (TypeKey::unlabeled(LogicalType::Double), double_gen()),
        (TypeKey::unlabeled(LogicalType::Char), char_gen()),
    ]
}
