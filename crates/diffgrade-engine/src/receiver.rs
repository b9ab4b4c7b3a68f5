//! Receiver lifecycle strategies.
//!
//! Exactly one of four mutually exclusive strategies produces the receiver
//! object for each iteration. The strategy is selected once at bind time; per
//! iteration, a case table may still supply a receiver directly for slot 0,
//! which preempts the strategy for that iteration (handled by the scheduler).

use serde::{Deserialize, Serialize};

use crate::handle::{CtorFn, NextStateFn};
use crate::logical_type::LogicalType;
use crate::resolution::GeneratorMap;
use crate::rng::DeterministicRng;
use crate::value::Value;

/// How the "self" object under test is produced across iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverStrategy {
    /// The operation is not instance-bound; no receiver exists.
    Stateless,
    /// A declared state-transition function produces the next receiver from
    /// the previous one.
    NextState,
    /// A resolved generator for the implementation's own type.
    Generator,
    /// A no-argument constructor, fresh per iteration.
    DefaultConstruct,
}

impl ReceiverStrategy {
    /// Selection priority: stateless, then next-state, then generator, then
    /// default construction. `None` means no strategy covers the operation,
    /// which is fatal at bind time.
    pub fn select(
        instance_bound: bool,
        has_next_state: bool,
        has_receiver_generator: bool,
        has_default_constructor: bool,
    ) -> Option<ReceiverStrategy> {
        if !instance_bound {
            Some(ReceiverStrategy::Stateless)
        } else if has_next_state {
            Some(ReceiverStrategy::NextState)
        } else if has_receiver_generator {
            Some(ReceiverStrategy::Generator)
        } else if has_default_constructor {
            Some(ReceiverStrategy::DefaultConstruct)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stateless => "stateless",
            Self::NextState => "next_state",
            Self::Generator => "generator",
            Self::DefaultConstruct => "default_construct",
        }
    }
}

/// One side's receiver production: the selected strategy plus that side's
/// own generator map, state-transition function, and constructor.
#[derive(Clone)]
pub struct ReceiverFactory {
    strategy: ReceiverStrategy,
    receiver_type: LogicalType,
    generators: GeneratorMap,
    next_state: Option<NextStateFn>,
    constructor: Option<CtorFn>,
}

impl ReceiverFactory {
    pub fn new(
        strategy: ReceiverStrategy,
        receiver_type: LogicalType,
        generators: GeneratorMap,
        next_state: Option<NextStateFn>,
        constructor: Option<CtorFn>,
    ) -> Self {
        Self {
            strategy,
            receiver_type,
            generators,
            next_state,
            constructor,
        }
    }

    pub fn strategy(&self) -> ReceiverStrategy {
        self.strategy
    }

    /// Produce the receiver for one iteration. `previous` is threaded only by
    /// the next-state strategy; the other strategies are ephemeral.
    pub fn produce(
        &self,
        iteration: u64,
        complexity: u32,
        previous: Option<&Value>,
        rng: &mut DeterministicRng,
    ) -> Option<Value> {
        match self.strategy {
            ReceiverStrategy::Stateless => None,
            ReceiverStrategy::DefaultConstruct => self.constructor.as_ref().map(|ctor| ctor()),
            ReceiverStrategy::Generator => self
                .generators
                .get_unlabeled(&self.receiver_type)
                .map(|gen| gen.generate(complexity, rng)),
            ReceiverStrategy::NextState => self
                .next_state
                .as_ref()
                .map(|next| next(previous, iteration, rng)),
        }
    }
}
