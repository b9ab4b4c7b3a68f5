//! Run configuration knobs and their per-option override precedence.
//!
//! Every knob is independently overridable; later-supplied configuration wins
//! per option. The precedence chain is operation-declared defaults, then
//! bind-time defaults, then per-candidate defaults, then per-run overrides.

use serde::{Deserialize, Serialize};

pub const DEFAULT_NUM_TESTS: u32 = 1024;
pub const DEFAULT_MAX_ONLY_EDGE_CASE_TESTS: u32 = 64;
pub const DEFAULT_MAX_ONLY_SIMPLE_CASE_TESTS: u32 = 64;
pub const DEFAULT_NUM_SIMPLE_EDGE_MIXED_TESTS: u32 = 64;
pub const DEFAULT_NUM_ALL_GENERATED_TESTS: u32 = 256;
pub const DEFAULT_MAX_COMPLEXITY: u32 = 100;
pub const DEFAULT_MAX_DISCARDS: u32 = 1024;

/// A partial set of run options. Unset options defer to the next layer down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub num_tests: Option<u32>,
    pub max_only_edge_case_tests: Option<u32>,
    pub max_only_simple_case_tests: Option<u32>,
    pub num_simple_edge_mixed_tests: Option<u32>,
    pub num_all_generated_tests: Option<u32>,
    pub max_complexity: Option<u32>,
    pub max_discards: Option<u32>,
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_tests(mut self, value: u32) -> Self {
        self.num_tests = Some(value);
        self
    }

    pub fn max_only_edge_case_tests(mut self, value: u32) -> Self {
        self.max_only_edge_case_tests = Some(value);
        self
    }

    pub fn max_only_simple_case_tests(mut self, value: u32) -> Self {
        self.max_only_simple_case_tests = Some(value);
        self
    }

    pub fn num_simple_edge_mixed_tests(mut self, value: u32) -> Self {
        self.num_simple_edge_mixed_tests = Some(value);
        self
    }

    pub fn num_all_generated_tests(mut self, value: u32) -> Self {
        self.num_all_generated_tests = Some(value);
        self
    }

    pub fn max_complexity(mut self, value: u32) -> Self {
        self.max_complexity = Some(value);
        self
    }

    pub fn max_discards(mut self, value: u32) -> Self {
        self.max_discards = Some(value);
        self
    }

    /// Layer `self` over `base`: options set here win, unset options fall
    /// through to `base`.
    pub fn apply_over(self, base: RunConfig) -> RunConfig {
        RunConfig {
            num_tests: self.num_tests.or(base.num_tests),
            max_only_edge_case_tests: self
                .max_only_edge_case_tests
                .or(base.max_only_edge_case_tests),
            max_only_simple_case_tests: self
                .max_only_simple_case_tests
                .or(base.max_only_simple_case_tests),
            num_simple_edge_mixed_tests: self
                .num_simple_edge_mixed_tests
                .or(base.num_simple_edge_mixed_tests),
            num_all_generated_tests: self
                .num_all_generated_tests
                .or(base.num_all_generated_tests),
            max_complexity: self.max_complexity.or(base.max_complexity),
            max_discards: self.max_discards.or(base.max_discards),
        }
    }

    /// Fill every unset option with the library default.
    pub fn resolve(self) -> ResolvedRunConfig {
        ResolvedRunConfig {
            num_tests: self.num_tests.unwrap_or(DEFAULT_NUM_TESTS),
            max_only_edge_case_tests: self
                .max_only_edge_case_tests
                .unwrap_or(DEFAULT_MAX_ONLY_EDGE_CASE_TESTS),
            max_only_simple_case_tests: self
                .max_only_simple_case_tests
                .unwrap_or(DEFAULT_MAX_ONLY_SIMPLE_CASE_TESTS),
            num_simple_edge_mixed_tests: self
                .num_simple_edge_mixed_tests
                .unwrap_or(DEFAULT_NUM_SIMPLE_EDGE_MIXED_TESTS),
            num_all_generated_tests: self
                .num_all_generated_tests
                .unwrap_or(DEFAULT_NUM_ALL_GENERATED_TESTS),
            max_complexity: self.max_complexity.unwrap_or(DEFAULT_MAX_COMPLEXITY),
            max_discards: self.max_discards.unwrap_or(DEFAULT_MAX_DISCARDS),
        }
    }
}

/// A fully resolved configuration; every knob has a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRunConfig {
    pub num_tests: u32,
    pub max_only_edge_case_tests: u32,
    pub max_only_simple_case_tests: u32,
    pub num_simple_edge_mixed_tests: u32,
    pub num_all_generated_tests: u32,
    pub max_complexity: u32,
    pub max_discards: u32,
}
