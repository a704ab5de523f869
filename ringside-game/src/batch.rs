//! Batch aggregation over independent shaped trials.
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{ConfigError, GameConfig, ModeConfig};
use crate::evaluator::OutcomeEvaluator;
use crate::shaper::{DistributionRequest, DistributionShaper, ShapedOutcome};
#[cfg(feature = "parallel")]
use crate::stats::StatsError;
use crate::stats::{AggregateStats, BatchSummary, WinHistogram};

/// Shared stop signal checked between trials.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs trials of one variant under one distribution request.
#[derive(Debug, Clone)]
pub struct BatchRunner<'a> {
    config: &'a GameConfig,
    mode: &'a ModeConfig,
    seed: u64,
    request: DistributionRequest,
    histogram: WinHistogram,
    cancel: CancelFlag,
}

impl<'a> BatchRunner<'a> {
    /// # Errors
    ///
    /// Returns an error if `request` is invalid.
    pub fn new(
        config: &'a GameConfig,
        mode: &'a ModeConfig,
        seed: u64,
        request: DistributionRequest,
    ) -> Result<Self, ConfigError> {
        request.validate()?;
        Ok(Self {
            config,
            mode,
            seed,
            request,
            histogram: WinHistogram::default(),
            cancel: CancelFlag::new(),
        })
    }

    #[must_use]
    pub fn with_histogram(mut self, histogram: WinHistogram) -> Self {
        self.histogram = histogram;
        self
    }

    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub const fn mode(&self) -> &'a ModeConfig {
        self.mode
    }

    #[must_use]
    pub const fn request(&self) -> &DistributionRequest {
        &self.request
    }

    fn shaper(&self) -> DistributionShaper<'a> {
        DistributionShaper::new(OutcomeEvaluator::new(self.config, self.mode))
    }

    fn empty_stats(&self) -> AggregateStats {
        AggregateStats::with_histogram(self.histogram.clone())
    }

    /// Run trials `0..trials` sequentially.
    #[must_use]
    pub fn run(&self, trials: u64) -> AggregateStats {
        self.run_range(0..trials)
    }

    /// Run the trials whose indices fall in `range`. Stops early, keeping what
    /// has been recorded, once the cancel flag is raised.
    #[must_use]
    pub fn run_range(&self, range: Range<u64>) -> AggregateStats {
        let shaper = self.shaper();
        let mut stats = self.empty_stats();
        for index in range {
            if self.cancel.is_cancelled() {
                log::info!(
                    "{}: cancelled after {} trials",
                    self.mode.name,
                    stats.trials
                );
                break;
            }
            stats.record(&shaper.shape(self.seed, index, &self.request));
        }
        stats
    }

    /// Full trial records for replay tooling.
    #[must_use]
    pub fn records(&self, range: Range<u64>) -> Vec<ShapedOutcome> {
        let shaper = self.shaper();
        range
            .map(|index| shaper.shape(self.seed, index, &self.request))
            .collect()
    }

    /// Split `0..trials` into chunks of `chunk_size`, run them on the rayon
    /// pool and merge the partial stats.
    ///
    /// # Errors
    ///
    /// Fails only if partial stats disagree on histogram edges.
    #[cfg(feature = "parallel")]
    pub fn run_parallel(&self, trials: u64, chunk_size: u64) -> Result<AggregateStats, StatsError> {
        self.run_range_parallel(0..trials, chunk_size)
    }

    /// Parallel counterpart of [`BatchRunner::run_range`].
    ///
    /// # Errors
    ///
    /// Fails only if partial stats disagree on histogram edges.
    #[cfg(feature = "parallel")]
    pub fn run_range_parallel(
        &self,
        range: Range<u64>,
        chunk_size: u64,
    ) -> Result<AggregateStats, StatsError> {
        let chunk_size = chunk_size.max(1);
        let chunks: Vec<Range<u64>> = (range.start..range.end)
            .step_by(usize::try_from(chunk_size).unwrap_or(usize::MAX))
            .map(|start| start..start.saturating_add(chunk_size).min(range.end))
            .collect();
        chunks
            .into_par_iter()
            .map(|chunk| Ok(self.run_range(chunk)))
            .try_reduce(|| self.empty_stats(), AggregateStats::merged)
    }

    #[must_use]
    pub fn summarize(&self, stats: &AggregateStats) -> BatchSummary {
        let summary = BatchSummary::new(self.mode, &self.config.paytable, self.seed, stats);
        log::info!(
            "{}: {} trials, rtp {:.4}, hit rate {:.4}",
            summary.mode,
            summary.trials,
            summary.rtp,
            summary.hit_rate
        );
        summary
    }
}
