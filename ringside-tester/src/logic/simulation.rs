use anyhow::{Context, Result};
use ringside_game::tuning::uniform_scale;
use ringside_game::{
    AdjustmentRecommendation, AggregateStats, BatchRunner, BatchSummary, GameEngine, PoolProfile,
    ShapedOutcome, WinHistogram, recommend_adjustments,
};
use serde::Serialize;
use std::ops::Range;

use super::plan::{CategoryAllocation, DistributionPlan};
use super::seeds::SeedInfo;
use crate::common::timestamp;

/// Knobs shared by every batch in a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub trials: u64,
    /// Trials per rayon chunk; `0` runs sequentially.
    pub chunk_size: u64,
    pub dump_trials: u64,
    pub histogram: WinHistogram,
    pub analyze_pools: bool,
    pub tune: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            trials: 10_000,
            chunk_size: 0,
            dump_trials: 0,
            histogram: WinHistogram::default(),
            analyze_pools: false,
            tune: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: String,
    pub target_win: Option<f64>,
    pub offset: u64,
    pub trials: u64,
    pub rtp: f64,
    pub hit_rate: f64,
    pub mean_attempts: f64,
    pub exhausted: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeReport {
    pub summary: BatchSummary,
    pub categories: Vec<CategoryReport>,
    pub sample_trials: Vec<ShapedOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub mode: String,
    pub profile: PoolProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct TuningReport {
    pub recommendations: Vec<AdjustmentRecommendation>,
    pub uniform_scale: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub generated_at: String,
    pub trials: u64,
    pub seeds: Vec<u64>,
    pub modes: Vec<ModeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pools: Option<Vec<PoolReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuning: Option<TuningReport>,
}

/// Expand `all` into every configured mode name, keeping order otherwise.
pub fn expand_modes(engine: &GameEngine, requested: &[String]) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for name in requested {
        if name.eq_ignore_ascii_case("all") {
            for known in engine.config().mode_names() {
                if !names.iter().any(|seen| seen == known) {
                    names.push(known.to_string());
                }
            }
            continue;
        }
        let mode = engine.config().mode(name)?;
        if !names.contains(&mode.name) {
            names.push(mode.name.clone());
        }
    }
    Ok(names)
}

/// Run every mode under every seed with the trial budget split by `plan`.
pub fn run_simulation(
    engine: &GameEngine,
    modes: &[String],
    seeds: &[SeedInfo],
    plan: &DistributionPlan,
    options: &SimulationOptions,
) -> Result<SimulationReport> {
    let allocations = plan.allocate(options.trials);
    let mut reports = Vec::with_capacity(modes.len() * seeds.len());

    for mode in modes {
        for seed in seeds {
            reports.push(run_mode(engine, mode, seed.seed, &allocations, options)?);
        }
    }

    let pools = options.analyze_pools.then(|| {
        engine
            .config()
            .modes
            .iter()
            .filter(|mode| modes.contains(&mode.name))
            .map(|mode| PoolReport {
                mode: mode.name.clone(),
                profile: mode.pool.profile(),
            })
            .collect()
    });

    let tuning = options.tune.then(|| {
        let summaries: Vec<BatchSummary> =
            reports.iter().map(|report| report.summary.clone()).collect();
        let recommendations = recommend_adjustments(engine.config(), &summaries);
        let uniform_scale = uniform_scale(&recommendations);
        TuningReport {
            recommendations,
            uniform_scale,
        }
    });

    Ok(SimulationReport {
        generated_at: timestamp(),
        trials: options.trials,
        seeds: seeds.iter().map(|seed| seed.seed).collect(),
        modes: reports,
        pools,
        tuning,
    })
}

fn run_mode(
    engine: &GameEngine,
    mode: &str,
    seed: u64,
    allocations: &[CategoryAllocation],
    options: &SimulationOptions,
) -> Result<ModeReport> {
    let mode_config = engine.config().mode(mode)?;
    let mut total = AggregateStats::with_histogram(options.histogram.clone());
    let mut categories = Vec::with_capacity(allocations.len());
    let mut sample_trials = Vec::new();

    for allocation in allocations {
        let runner = engine
            .runner(mode, seed, allocation.request.clone())?
            .with_histogram(options.histogram.clone());
        let range = allocation.offset..allocation.offset + allocation.trials;
        let stats = run_range(&runner, range.clone(), options.chunk_size)?;
        let summary = runner.summarize(&stats);
        total
            .merge(&stats)
            .with_context(|| format!("merging {} for {mode}", allocation.request.category))?;

        let dumped = overlap(&range, 0..options.dump_trials);
        if !dumped.is_empty() {
            sample_trials.extend(runner.records(dumped));
        }

        categories.push(CategoryReport {
            category: allocation.request.category.clone(),
            target_win: allocation.request.target_win,
            offset: allocation.offset,
            trials: allocation.trials,
            rtp: summary.rtp,
            hit_rate: summary.hit_rate,
            mean_attempts: summary.mean_attempts,
            exhausted: summary.exhausted,
        });
    }

    let summary = BatchSummary::new(mode_config, &engine.config().paytable, seed, &total);
    if summary.exhausted > 0 {
        log::warn!(
            "{mode}: {} trials hit the retry ceiling without meeting their target",
            summary.exhausted
        );
    }

    Ok(ModeReport {
        summary,
        categories,
        sample_trials,
    })
}

fn run_range(runner: &BatchRunner<'_>, range: Range<u64>, chunk_size: u64) -> Result<AggregateStats> {
    if chunk_size == 0 {
        return Ok(runner.run_range(range));
    }
    Ok(runner.run_range_parallel(range, chunk_size)?)
}

fn overlap(a: &Range<u64>, b: Range<u64>) -> Range<u64> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end).max(start);
    start..end
}

/// Reproduce a single trial of a batch, shaped the way the batch shaped it.
pub fn replay_trial(
    engine: &GameEngine,
    mode: &str,
    seed: u64,
    index: u64,
    plan: &DistributionPlan,
    trials: u64,
) -> Result<ShapedOutcome> {
    let allocation = plan
        .allocate(trials)
        .into_iter()
        .find(|allocation| (allocation.offset..allocation.offset + allocation.trials).contains(&index))
        .with_context(|| format!("trial {index} is outside a {trials}-trial batch"))?;
    engine
        .replay(mode, seed, index..index + 1, allocation.request)?
        .pop()
        .with_context(|| format!("no record for trial {index}"))
}
