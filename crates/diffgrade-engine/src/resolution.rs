//! Generator resolution: building the effective generator map.
//!
//! Given the set of required type keys and an implementation's declared
//! generators, this pass produces a total mapping from every required key to
//! a generator, or fails with a precise configuration error. It is a pure
//! function over declared metadata; no exception-driven control flow.
//!
//! Resolution order: built-in defaults first (unlabeled keys, string
//! synthesized from the char generator), then enabled declarations (two
//! enabled declarations for one key is a conflict), then labeled
//! declarations, then lazy array synthesis from element generators, then a
//! conservative structural-compatibility fallback. A missing generator for a
//! parameter key is fatal; a missing receiver generator is not, since other
//! receiver strategies may cover it.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::generator::{array_gen, default_generators, string_gen, Gen};
use crate::handle::{GeneratorDecl, ParamSpec};
use crate::logical_type::{LogicalType, TypeKey};
use crate::rng::DeterministicRng;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("found multiple enabled generators for type `{ty}'")]
    ConflictingGenerators { ty: LogicalType },

    #[error("found multiple generators labeled `{label}' for type `{ty}'")]
    ConflictingLabeledGenerators { ty: LogicalType, label: String },

    #[error("a generator for type `{ty}' was requested, but no generator for that type was found")]
    MissingGenerator { ty: LogicalType },

    #[error("a generator for an array with element type `{element}' was requested, but no generator for that type was found")]
    MissingElementGenerator { element: LogicalType },
}

/// The resolved, total mapping from required keys to generators.
/// Read-only after construction; shared freely across runs.
#[derive(Debug, Clone, Default)]
pub struct GeneratorMap {
    map: BTreeMap<TypeKey, Gen>,
}

impl GeneratorMap {
    pub fn get(&self, key: &TypeKey) -> Option<&Gen> {
        self.map.get(key)
    }

    pub fn get_unlabeled(&self, ty: &LogicalType) -> Option<&Gen> {
        self.map.get(&TypeKey::unlabeled(ty.clone()))
    }

    /// Lookup for a parameter slot's key.
    pub fn for_param(&self, param: &ParamSpec) -> Option<&Gen> {
        self.map.get(&TypeKey {
            ty: param.ty.clone(),
            label: param.generator_label.clone(),
        })
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.map.contains_key(key)
    }

    pub fn generate_for(
        &self,
        param: &ParamSpec,
        complexity: u32,
        rng: &mut DeterministicRng,
    ) -> Option<Value> {
        self.for_param(param).map(|gen| gen.generate(complexity, rng))
    }
}

/// Build the effective generator map for one implementation.
pub fn resolve_generators(
    required: &[TypeKey],
    declared: &[GeneratorDecl],
    receiver_type: Option<&LogicalType>,
) -> Result<GeneratorMap, ResolutionError> {
    let mut known: BTreeMap<TypeKey, Gen> = default_generators().into_iter().collect();

    // String is built from whatever char generator is in effect.
    if let Some(chars) = known.get(&TypeKey::unlabeled(LogicalType::Char)).cloned() {
        known.insert(TypeKey::unlabeled(LogicalType::Str), string_gen(chars));
    }

    let mut enabled_seen: BTreeMap<LogicalType, ()> = BTreeMap::new();
    for decl in declared.iter().filter(|decl| decl.enabled) {
        if enabled_seen.insert(decl.return_type.clone(), ()).is_some() {
            return Err(ResolutionError::ConflictingGenerators {
                ty: decl.return_type.clone(),
            });
        }
        known.insert(TypeKey::unlabeled(decl.return_type.clone()), decl.gen.clone());
    }

    let mut labeled_seen: BTreeMap<(LogicalType, String), ()> = BTreeMap::new();
    for decl in declared.iter() {
        let Some(label) = &decl.label else { continue };
        if labeled_seen
            .insert((decl.return_type.clone(), label.clone()), ())
            .is_some()
        {
            return Err(ResolutionError::ConflictingLabeledGenerators {
                ty: decl.return_type.clone(),
                label: label.clone(),
            });
        }
        known.insert(
            TypeKey::labeled(decl.return_type.clone(), label.clone()),
            decl.gen.clone(),
        );
    }

    // Array keys without an explicit declaration are synthesized from their
    // element key, recursively for nested arrays.
    for key in required {
        if key.label.is_none() {
            synthesize_arrays(&key.ty, &mut known)?;
        }
    }

    let mut discovered = GeneratorMap::default();
    for key in required {
        let gen = select_generator(key, &known)
            .ok_or_else(|| ResolutionError::MissingGenerator { ty: key.ty.clone() })?;
        discovered.map.insert(key.clone(), gen);
    }

    // Transparently fill a receiver generator when one matches the
    // implementation's own type; absence here is covered by the other
    // receiver strategies.
    if let Some(receiver_ty) = receiver_type {
        let receiver_key = TypeKey::unlabeled(receiver_ty.clone());
        if !discovered.map.contains_key(&receiver_key) {
            if let Some(gen) = known.get(&receiver_key) {
                discovered.map.insert(receiver_key, gen.clone());
            }
        }
    }

    Ok(discovered)
}

fn synthesize_arrays(
    ty: &LogicalType,
    known: &mut BTreeMap<TypeKey, Gen>,
) -> Result<(), ResolutionError> {
    let LogicalType::Array(element) = ty else {
        return Ok(());
    };
    if known.contains_key(&TypeKey::unlabeled(ty.clone())) {
        return Ok(());
    }
    synthesize_arrays(element, known)?;
    let element_gen = known
        .get(&TypeKey::unlabeled((**element).clone()))
        .cloned()
        .ok_or_else(|| ResolutionError::MissingElementGenerator {
            element: (**element).clone(),
        })?;
    known.insert(TypeKey::unlabeled(ty.clone()), array_gen(element_gen));
    Ok(())
}

/// Exact match first; otherwise a structurally compatible known generator
/// with the same label. `BTreeMap` order keeps the fallback deterministic.
fn select_generator(goal: &TypeKey, known: &BTreeMap<TypeKey, Gen>) -> Option<Gen> {
    if let Some(gen) = known.get(goal) {
        return Some(gen.clone());
    }
    known
        .iter()
        .find(|(key, _)| key.label == goal.label && goal.ty.compatible_with(&key.ty))
        .map(|(_, gen)| gen.clone())
}
