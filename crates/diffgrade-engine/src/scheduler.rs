//! Case scheduling: the five-block main testing loop.
//!
//! Iterations are numbered from 1 and partitioned into five ordered blocks:
//! pure edge cases, pure simple cases, edge/simple mixed, fully generated,
//! and generated-mixed filling the remaining budget. Curated blocks decode a
//! combination index into one value per slot (receiver first) in mixed-radix
//! style; when a block's combination space fits its cap the block enumerates
//! it exhaustively, otherwise indices are sampled from the scheduler stream.
//!
//! Three random streams are seeded identically per run: one per
//! implementation side, one for scheduling decisions. Each side draws its
//! values from its own stream so both sides see the same sequence of draws.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::cases::CaseTables;
use crate::config::ResolvedRunConfig;
use crate::executor::DifferentialExecutor;
use crate::handle::{ParamSpec, PreconditionFn};
use crate::logical_type::LogicalType;
use crate::receiver::ReceiverFactory;
use crate::resolution::GeneratorMap;
use crate::rng::DeterministicRng;
use crate::step::{BlockCounts, DiscardedStep, TestStep};
use crate::value::Value;

/// One side's inputs to the loop: its generator map, case tables, and
/// receiver production. Tables are addressed through the reference's slot
/// types on both sides, keeping slot decoding aligned.
#[derive(Clone)]
pub struct SideContext {
    pub generators: GeneratorMap,
    pub edge_cases: CaseTables,
    pub simple_cases: CaseTables,
    pub receivers: ReceiverFactory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Edge,
    Simple,
    SimpleEdgeMixed,
    AllGenerated,
    GeneratedMixed,
}

/// Runs the main testing loop for one bound operation.
#[derive(Clone)]
pub struct CaseScheduler {
    pub params: Vec<ParamSpec>,
    pub receiver_type: LogicalType,
    pub executor: DifferentialExecutor,
    pub precondition: Option<PreconditionFn>,
}

impl CaseScheduler {
    /// Execute the loop, appending one step per iteration to `steps` and
    /// keeping `counts` current. Both live behind mutexes shared with the
    /// caller so a timed-out run still exposes the work done so far.
    pub fn run_tests(
        &self,
        seed: u64,
        config: ResolvedRunConfig,
        reference: &SideContext,
        candidate: &SideContext,
        steps: &Arc<Mutex<Vec<TestStep>>>,
        counts: &Arc<Mutex<BlockCounts>>,
    ) {
        let mut reference_rng = DeterministicRng::seeded(seed);
        let mut candidate_rng = DeterministicRng::seeded(seed);
        let mut scheduler_rng = DeterministicRng::seeded(seed);

        let edge_cap = u64::from(config.max_only_edge_case_tests);
        let edge_combinations =
            count_combinations(&reference.edge_cases, &self.receiver_type, &self.params);
        let edge_block_len = if reference.edge_cases.all_empty() {
            0
        } else {
            edge_combinations.min(edge_cap)
        };
        let edge_exhaustive = edge_combinations <= edge_cap;

        let simple_cap = u64::from(config.max_only_simple_case_tests);
        let simple_combinations =
            count_combinations(&reference.simple_cases, &self.receiver_type, &self.params);
        let simple_block_len = if reference.simple_cases.all_empty() {
            0
        } else {
            simple_combinations.min(simple_cap)
        };
        let simple_exhaustive = simple_combinations <= simple_cap;

        let simple_upper = edge_block_len + simple_block_len;
        let mixed_upper = simple_upper + u64::from(config.num_simple_edge_mixed_tests);

        let mut reference_receiver: Option<Value> = None;
        let mut candidate_receiver: Option<Value> = None;
        let mut generated_mixed_span: Option<u32> = None;
        let mut iteration: u64 = 1;

        loop {
            let current = *lock(counts);
            if current.num_tests() >= config.num_tests {
                break;
            }

            let block;
            let reference_args;
            let candidate_args;

            if iteration <= edge_block_len {
                block = Block::Edge;
                let index = if edge_exhaustive {
                    iteration - 1
                } else {
                    scheduler_rng.next_below(edge_combinations)
                };
                let (case_receiver, args) = decode_case(
                    index,
                    edge_combinations,
                    &reference.edge_cases,
                    &reference.generators,
                    &self.receiver_type,
                    &self.params,
                    &mut reference_rng,
                );
                reference_args = args;
                reference_receiver = case_receiver.or_else(|| {
                    reference.receivers.produce(
                        iteration,
                        0,
                        reference_receiver.as_ref(),
                        &mut reference_rng,
                    )
                });
                let (case_receiver, args) = decode_case(
                    index,
                    edge_combinations,
                    &candidate.edge_cases,
                    &candidate.generators,
                    &self.receiver_type,
                    &self.params,
                    &mut candidate_rng,
                );
                candidate_args = args;
                candidate_receiver = case_receiver.or_else(|| {
                    candidate.receivers.produce(
                        iteration,
                        0,
                        candidate_receiver.as_ref(),
                        &mut candidate_rng,
                    )
                });
            } else if iteration <= simple_upper {
                block = Block::Simple;
                let offset = iteration - edge_block_len - 1;
                let index = if simple_exhaustive {
                    offset
                } else {
                    scheduler_rng.next_below(simple_combinations)
                };
                let (case_receiver, args) = decode_case(
                    index,
                    simple_combinations,
                    &reference.simple_cases,
                    &reference.generators,
                    &self.receiver_type,
                    &self.params,
                    &mut reference_rng,
                );
                reference_args = args;
                reference_receiver = case_receiver.or_else(|| {
                    reference.receivers.produce(
                        iteration,
                        0,
                        reference_receiver.as_ref(),
                        &mut reference_rng,
                    )
                });
                let (case_receiver, args) = decode_case(
                    index,
                    simple_combinations,
                    &candidate.simple_cases,
                    &candidate.generators,
                    &self.receiver_type,
                    &self.params,
                    &mut candidate_rng,
                );
                candidate_args = args;
                candidate_receiver = case_receiver.or_else(|| {
                    candidate.receivers.produce(
                        iteration,
                        0,
                        candidate_receiver.as_ref(),
                        &mut candidate_rng,
                    )
                });
            } else if iteration <= mixed_upper {
                block = Block::SimpleEdgeMixed;
                reference_receiver = reference.receivers.produce(
                    iteration,
                    2,
                    reference_receiver.as_ref(),
                    &mut reference_rng,
                );
                candidate_receiver = candidate.receivers.produce(
                    iteration,
                    2,
                    candidate_receiver.as_ref(),
                    &mut candidate_rng,
                );
                reference_args =
                    self.simple_edge_mixed_args(reference, &mut reference_rng);
                candidate_args =
                    self.simple_edge_mixed_args(candidate, &mut candidate_rng);
            } else if current.all_generated_tests < config.num_all_generated_tests {
                block = Block::AllGenerated;
                // Ramp indices are the executed block counts, so a discarded
                // iteration retries the same complexity.
                let complexity = ramp(
                    config.max_complexity,
                    current.all_generated_tests,
                    config.num_all_generated_tests,
                );
                reference_receiver = reference.receivers.produce(
                    iteration,
                    complexity,
                    reference_receiver.as_ref(),
                    &mut reference_rng,
                );
                candidate_receiver = candidate.receivers.produce(
                    iteration,
                    complexity,
                    candidate_receiver.as_ref(),
                    &mut candidate_rng,
                );
                reference_args =
                    self.generated_args(reference, complexity, &mut reference_rng);
                candidate_args =
                    self.generated_args(candidate, complexity, &mut candidate_rng);
            } else {
                block = Block::GeneratedMixed;
                // The ramp span is fixed on first entry: the budget remaining
                // for this block at that point, never less than 1.
                let span = *generated_mixed_span.get_or_insert_with(|| {
                    config
                        .num_tests
                        .saturating_sub(config.num_all_generated_tests)
                        .saturating_sub(current.edge_tests)
                        .saturating_sub(current.simple_tests)
                        .saturating_sub(current.simple_edge_mixed_tests)
                        .max(1)
                });
                let complexity =
                    ramp(config.max_complexity, current.generated_mixed_tests, span);
                reference_receiver = reference.receivers.produce(
                    iteration,
                    complexity,
                    reference_receiver.as_ref(),
                    &mut reference_rng,
                );
                candidate_receiver = candidate.receivers.produce(
                    iteration,
                    complexity,
                    candidate_receiver.as_ref(),
                    &mut candidate_rng,
                );
                reference_args =
                    self.generated_mixed_args(reference, complexity, &mut reference_rng);
                candidate_args =
                    self.generated_mixed_args(candidate, complexity, &mut candidate_rng);
            }

            let precondition_met = match &self.precondition {
                Some(check) => check(reference_receiver.as_ref(), &reference_args),
                None => true,
            };

            if precondition_met {
                let step = self.executor.execute(
                    iteration,
                    reference_receiver.clone(),
                    candidate_receiver.clone(),
                    reference_args,
                    candidate_args,
                    &mut scheduler_rng,
                );
                // Receivers thread forward in their post-invocation state, so
                // a state-transition sees the mutations the call made.
                reference_receiver = step.reference_receiver.clone();
                candidate_receiver = step.candidate_receiver.clone();
                {
                    let mut counts = lock(counts);
                    match block {
                        Block::Edge => counts.edge_tests += 1,
                        Block::Simple => counts.simple_tests += 1,
                        Block::SimpleEdgeMixed => counts.simple_edge_mixed_tests += 1,
                        Block::AllGenerated => counts.all_generated_tests += 1,
                        Block::GeneratedMixed => counts.generated_mixed_tests += 1,
                    }
                }
                lock(steps).push(TestStep::Executed(step));
            } else {
                lock(steps).push(TestStep::Discarded(DiscardedStep {
                    iteration,
                    receiver: reference_receiver.clone(),
                    args: reference_args,
                }));
                let mut counts = lock(counts);
                counts.discarded_tests += 1;
                if counts.discarded_tests >= config.max_discards {
                    break;
                }
            }

            iteration += 1;
        }
    }

    /// Coin flip per slot between its edge and simple table; an empty chosen
    /// table falls back to the other, and when both are empty the slot is
    /// generated at complexity 0 (edge path) or 2 (simple path).
    fn simple_edge_mixed_args(
        &self,
        side: &SideContext,
        rng: &mut DeterministicRng,
    ) -> Vec<Value> {
        let mut args = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let chose_edge = rng.next_below(2) == 0;
            let mut use_simple = !chose_edge;
            let mut value = None;
            if chose_edge {
                if side.edge_cases.len_of(&param.ty) != 0 {
                    value = side.edge_cases.pick(&param.ty, rng);
                } else {
                    use_simple = true;
                }
            }
            if use_simple {
                if side.simple_cases.len_of(&param.ty) != 0 {
                    value = side.simple_cases.pick(&param.ty, rng);
                } else {
                    let complexity = if chose_edge { 0 } else { 2 };
                    value = side.generators.generate_for(param, complexity, rng);
                }
            }
            args.push(value.unwrap_or(Value::Unit));
        }
        args
    }

    /// Three-way choice per slot among edge table, simple table, and
    /// generator; an empty chosen table degrades to the generator.
    fn generated_mixed_args(
        &self,
        side: &SideContext,
        complexity: u32,
        rng: &mut DeterministicRng,
    ) -> Vec<Value> {
        let mut args = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let mut choice = rng.next_below(3);
            let mut value = None;
            if choice == 0 {
                if side.edge_cases.len_of(&param.ty) != 0 {
                    value = side.edge_cases.pick(&param.ty, rng);
                } else {
                    choice = 2;
                }
            }
            if choice == 1 {
                if side.simple_cases.len_of(&param.ty) != 0 {
                    value = side.simple_cases.pick(&param.ty, rng);
                } else {
                    choice = 2;
                }
            }
            if choice == 2 {
                value = side.generators.generate_for(param, complexity, rng);
            }
            args.push(value.unwrap_or(Value::Unit));
        }
        args
    }

    fn generated_args(
        &self,
        side: &SideContext,
        complexity: u32,
        rng: &mut DeterministicRng,
    ) -> Vec<Value> {
        self.params
            .iter()
            .map(|param| {
                side.generators
                    .generate_for(param, complexity, rng)
                    .unwrap_or(Value::Unit)
            })
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Linear complexity ramp over a block: `max * index / span`, capped at `max`.
fn ramp(max_complexity: u32, index: u32, span: u32) -> u32 {
    let raw = u64::from(max_complexity) * u64::from(index) / u64::from(span.max(1));
    raw.min(u64::from(max_complexity)) as u32
}

/// Number of slot-value combinations a table admits: the product of present
/// table lengths, with absent tables contributing a factor of 1. The receiver
/// slot comes first. An explicitly empty table zeroes the product.
fn count_combinations(
    tables: &CaseTables,
    receiver_type: &LogicalType,
    params: &[ParamSpec],
) -> u64 {
    let mut total: u64 = 1;
    for ty in std::iter::once(receiver_type).chain(params.iter().map(|p| &p.ty)) {
        if let Some(values) = tables.get(ty) {
            total = total.saturating_mul(values.len() as u64);
        }
    }
    total
}

/// Decode combination `index` out of `total` into one value per slot,
/// receiver first. Slots with a table take the digit for their radix; slots
/// without one draw from their generator at complexity 0.
fn decode_case(
    index: u64,
    total: u64,
    tables: &CaseTables,
    generators: &GeneratorMap,
    receiver_type: &LogicalType,
    params: &[ParamSpec],
    rng: &mut DeterministicRng,
) -> (Option<Value>, Vec<Value>) {
    let mut segment_size = total.max(1);
    let mut remaining = index;

    let receiver = match tables.get(receiver_type) {
        Some(values) if !values.is_empty() => {
            segment_size = (segment_size / values.len() as u64).max(1);
            let choice = ((remaining / segment_size) as usize).min(values.len() - 1);
            remaining %= segment_size;
            Some(values[choice].clone())
        }
        _ => None,
    };

    let mut args = Vec::with_capacity(params.len());
    for param in params {
        let value = match tables.get(&param.ty) {
            Some(values) if !values.is_empty() => {
                segment_size = (segment_size / values.len() as u64).max(1);
                let choice = ((remaining / segment_size) as usize).min(values.len() - 1);
                remaining %= segment_size;
                values[choice].clone()
            }
            _ => generators
                .generate_for(param, 0, rng)
                .unwrap_or(Value::Unit),
        };
        args.push(value);
    }
    (receiver, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use crate::cases::CaseKind;
    use crate::config::RunConfig;
    use crate::handle::OpFn;
    use crate::receiver::{ReceiverFactory, ReceiverStrategy};
    use crate::resolution::resolve_generators;
    use crate::logical_type::TypeKey;

    fn int_params(n: usize) -> Vec<ParamSpec> {
        (0..n).map(|_| ParamSpec::of(LogicalType::Int)).collect()
    }

    fn int_side(params: &[ParamSpec]) -> SideContext {
        let required: Vec<TypeKey> = params
            .iter()
            .map(|p| TypeKey::unlabeled(p.ty.clone()))
            .collect();
        let generators = resolve_generators(&required, &[], None).unwrap();
        let slot_types: Vec<LogicalType> = std::iter::once(LogicalType::named("Widget"))
            .chain(params.iter().map(|p| p.ty.clone()))
            .collect();
        SideContext {
            generators: generators.clone(),
            edge_cases: CaseTables::build(CaseKind::Edge, &slot_types, &[]).unwrap(),
            simple_cases: CaseTables::build(CaseKind::Simple, &slot_types, &[]).unwrap(),
            receivers: ReceiverFactory::new(
                ReceiverStrategy::Stateless,
                LogicalType::named("Widget"),
                generators,
                None,
                None,
            ),
        }
    }

    fn echo_scheduler(params: Vec<ParamSpec>, precondition: Option<PreconditionFn>) -> CaseScheduler {
        let echo: OpFn = Arc::new(|_, args, _| Ok(Value::List(args.to_vec())));
        CaseScheduler {
            params,
            receiver_type: LogicalType::named("Widget"),
            executor: DifferentialExecutor::new(
                Some(echo.clone()),
                Some(echo),
                false,
                false,
                "Widget".to_string(),
                Vec::new(),
                None,
            ),
            precondition,
        }
    }

    fn run(
        scheduler: &CaseScheduler,
        side: &SideContext,
        config: ResolvedRunConfig,
        seed: u64,
    ) -> (Vec<TestStep>, BlockCounts) {
        let steps = Arc::new(Mutex::new(Vec::new()));
        let counts = Arc::new(Mutex::new(BlockCounts::default()));
        scheduler.run_tests(seed, config, side, side, &steps, &counts);
        let steps = steps.lock().unwrap().clone();
        let counts = *counts.lock().unwrap();
        (steps, counts)
    }

    fn small_config() -> ResolvedRunConfig {
        RunConfig::new()
            .num_tests(64)
            .max_only_edge_case_tests(16)
            .max_only_simple_case_tests(16)
            .num_simple_edge_mixed_tests(8)
            .num_all_generated_tests(16)
            .max_complexity(10)
            .resolve()
    }

    #[test]
    fn combination_counting_multiplies_present_tables() {
        let params = int_params(2);
        let side = int_side(&params);
        // Receiver table absent (factor 1), two int slots of 5 edges each.
        assert_eq!(
            count_combinations(&side.edge_cases, &LogicalType::named("Widget"), &params),
            25
        );
    }

    #[test]
    fn absent_tables_contribute_factor_one() {
        let params = vec![ParamSpec::of(LogicalType::named("Widget"))];
        let side = int_side(&params);
        assert_eq!(
            count_combinations(&side.edge_cases, &LogicalType::named("Widget"), &params),
            1
        );
    }

    #[test]
    fn exhaustive_decode_enumerates_every_combination_once() {
        let params = int_params(2);
        let side = int_side(&params);
        let total = count_combinations(&side.edge_cases, &LogicalType::named("Widget"), &params);
        let mut rng = DeterministicRng::seeded(1);
        let mut seen = BTreeSet::new();
        for index in 0..total {
            let (receiver, args) = decode_case(
                index,
                total,
                &side.edge_cases,
                &side.generators,
                &LogicalType::named("Widget"),
                &params,
                &mut rng,
            );
            assert_eq!(receiver, None);
            seen.insert(format!("{}|{}", args[0], args[1]));
        }
        assert_eq!(seen.len(), total as usize);
    }

    #[test]
    fn slots_without_tables_fall_back_to_generators() {
        let params = vec![
            ParamSpec::of(LogicalType::Int),
            ParamSpec::of(LogicalType::array_of(LogicalType::Int)),
        ];
        let required: Vec<TypeKey> = params
            .iter()
            .map(|p| TypeKey::unlabeled(p.ty.clone()))
            .collect();
        let generators = resolve_generators(&required, &[], None).unwrap();
        let slot_types: Vec<LogicalType> = params.iter().map(|p| p.ty.clone()).collect();
        let tables = CaseTables::build(CaseKind::Edge, &slot_types, &[]).unwrap();
        let total = count_combinations(&tables, &LogicalType::named("Widget"), &params);
        assert_eq!(total, 5);

        let mut rng = DeterministicRng::seeded(2);
        let (_, args) = decode_case(
            0,
            total,
            &tables,
            &generators,
            &LogicalType::named("Widget"),
            &params,
            &mut rng,
        );
        assert!(matches!(args[1], Value::List(_)));
    }

    #[test]
    fn block_accounting_covers_the_whole_budget() {
        let params = int_params(1);
        let side = int_side(&params);
        let scheduler = echo_scheduler(params, None);
        let config = small_config();
        let (steps, counts) = run(&scheduler, &side, config, 99);

        // 5 edge combos, 2 simple combos, then the fixed and filling blocks.
        assert_eq!(counts.edge_tests, 5);
        assert_eq!(counts.simple_tests, 2);
        assert_eq!(counts.simple_edge_mixed_tests, 8);
        assert_eq!(counts.all_generated_tests, 16);
        assert_eq!(counts.num_tests(), config.num_tests);
        assert_eq!(counts.discarded_tests, 0);
        assert_eq!(steps.len(), config.num_tests as usize);

        // Iterations are 1-based and contiguous.
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.iteration(), i as u64 + 1);
        }
    }

    #[test]
    fn edge_block_is_exhaustive_and_duplicate_free_when_it_fits() {
        let params = int_params(1);
        let side = int_side(&params);
        let scheduler = echo_scheduler(params, None);
        let (steps, counts) = run(&scheduler, &side, small_config(), 7);

        let edge_args: BTreeSet<String> = steps[..counts.edge_tests as usize]
            .iter()
            .map(|step| match step {
                TestStep::Executed(s) => s.reference_behavior.args[0].to_string(),
                TestStep::Discarded(_) => unreachable!(),
            })
            .collect();
        assert_eq!(edge_args.len(), 5);
        assert!(edge_args.contains(&Value::Int(i64::MIN).to_string()));
        assert!(edge_args.contains(&Value::Int(0).to_string()));
    }

    #[test]
    fn oversized_edge_spaces_are_sampled_up_to_the_cap() {
        // Two int slots: 25 combinations against a cap of 4.
        let params = int_params(2);
        let side = int_side(&params);
        let scheduler = echo_scheduler(params, None);
        let config = RunConfig::new()
            .num_tests(8)
            .max_only_edge_case_tests(4)
            .max_only_simple_case_tests(4)
            .num_simple_edge_mixed_tests(2)
            .num_all_generated_tests(2)
            .max_complexity(10)
            .resolve();
        let (_, counts) = run(&scheduler, &side, config, 3);
        assert_eq!(counts.edge_tests, 4);
        assert_eq!(counts.simple_tests, 4);
    }

    #[test]
    fn identical_seeds_produce_identical_step_sequences() {
        let params = int_params(2);
        let side = int_side(&params);
        let scheduler = echo_scheduler(params, None);
        let (first, _) = run(&scheduler, &side, small_config(), 42);
        let (second, _) = run(&scheduler, &side, small_config(), 42);
        assert_eq!(first, second);

        let (other, _) = run(&scheduler, &side, small_config(), 43);
        assert_ne!(first, other);
    }

    #[test]
    fn failing_precondition_discards_instead_of_executing() {
        let params = int_params(1);
        let side = int_side(&params);
        let reject_negatives: PreconditionFn =
            Arc::new(|_, args| !matches!(args[0], Value::Int(n) if n < 0));
        let scheduler = echo_scheduler(params, Some(reject_negatives));
        let (steps, counts) = run(&scheduler, &side, small_config(), 11);

        let discarded: Vec<_> = steps.iter().filter(|s| s.was_discarded()).collect();
        assert_eq!(discarded.len() as u32, counts.discarded_tests);
        assert!(counts.discarded_tests >= 2);
        assert_eq!(
            steps.len() as u32,
            counts.num_tests() + counts.discarded_tests
        );
        assert_eq!(counts.num_tests(), small_config().num_tests);
    }

    #[test]
    fn discard_cap_stops_the_loop_early() {
        let params = int_params(1);
        let side = int_side(&params);
        let reject_all: PreconditionFn = Arc::new(|_, _| false);
        let scheduler = echo_scheduler(params, Some(reject_all));
        let config = RunConfig::new().num_tests(64).max_discards(10).resolve();
        let (steps, counts) = run(&scheduler, &side, config, 5);

        assert_eq!(counts.discarded_tests, 10);
        assert_eq!(counts.num_tests(), 0);
        assert_eq!(steps.len(), 10);
        assert!(steps.iter().all(TestStep::was_discarded));
    }

    #[test]
    fn complexity_ramp_is_linear_and_capped() {
        assert_eq!(ramp(100, 0, 256), 0);
        assert_eq!(ramp(100, 128, 256), 50);
        assert_eq!(ramp(100, 255, 256), 99);
        assert_eq!(ramp(100, 500, 256), 100);
        assert_eq!(ramp(0, 10, 16), 0);
    }

    #[test]
    fn empty_tables_skip_the_curated_blocks() {
        let params = vec![ParamSpec::of(LogicalType::named("Widget"))];
        let required = [TypeKey::unlabeled(LogicalType::named("Widget"))];
        let widget_gen = crate::handle::GeneratorDecl {
            return_type: LogicalType::named("Widget"),
            label: None,
            enabled: true,
            gen: crate::generator::Gen::new(|_, _| Value::record("Widget")),
        };
        let generators = resolve_generators(&required, &[widget_gen], None).unwrap();
        let slot_types = [LogicalType::named("Widget")];
        let side = SideContext {
            generators: generators.clone(),
            edge_cases: CaseTables::build(CaseKind::Edge, &slot_types, &[]).unwrap(),
            simple_cases: CaseTables::build(CaseKind::Simple, &slot_types, &[]).unwrap(),
            receivers: ReceiverFactory::new(
                ReceiverStrategy::Stateless,
                LogicalType::named("Widget"),
                generators,
                None,
                None,
            ),
        };
        let scheduler = echo_scheduler(params, None);
        let (_, counts) = run(&scheduler, &side, small_config(), 8);

        assert_eq!(counts.edge_tests, 0);
        assert_eq!(counts.simple_tests, 0);
        assert_eq!(counts.num_tests(), small_config().num_tests);
    }

    #[test]
    fn mixed_args_degrade_to_generators_when_tables_are_empty() {
        let params = vec![ParamSpec::of(LogicalType::named("Widget"))];
        let required = [TypeKey::unlabeled(LogicalType::named("Widget"))];
        let widget_gen = crate::handle::GeneratorDecl {
            return_type: LogicalType::named("Widget"),
            label: None,
            enabled: true,
            gen: crate::generator::Gen::new(|_, _| Value::record("Widget")),
        };
        let generators = resolve_generators(&required, &[widget_gen], None).unwrap();
        let side = SideContext {
            generators: generators.clone(),
            edge_cases: CaseTables::build(CaseKind::Edge, &[], &[]).unwrap(),
            simple_cases: CaseTables::build(CaseKind::Simple, &[], &[]).unwrap(),
            receivers: ReceiverFactory::new(
                ReceiverStrategy::Stateless,
                LogicalType::named("Widget"),
                generators,
                None,
                None,
            ),
        };
        let scheduler = echo_scheduler(params, None);
        let mut rng = DeterministicRng::seeded(9);
        let mixed = scheduler.simple_edge_mixed_args(&side, &mut rng);
        assert_eq!(mixed, vec![Value::record("Widget")]);
        let generated = scheduler.generated_mixed_args(&side, 5, &mut rng);
        assert_eq!(generated, vec![Value::record("Widget")]);
    }
}
