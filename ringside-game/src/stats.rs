//! Batch statistics: running totals, win histogram and summaries.
//!
//! Win totals are kept in fixed-point micro-units so that merging partial
//! results is exact in any grouping or order.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::{ConfigError, ModeConfig};
use crate::constants::{DEFAULT_BUCKET_EDGES, DEFAULT_BUCKET_LABELS, WIN_UNITS_PER_MULTIPLIER};
use crate::evaluator::TerminationReason;
use crate::paytable::Paytable;
use crate::shaper::ShapedOutcome;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("cannot merge histograms with different edges ({left:?} vs {right:?})")]
    BucketMismatch { left: Vec<f64>, right: Vec<f64> },
}

/// Bucketed counts of final wins. Zero wins land in a dedicated loss bucket;
/// positive wins are split by ascending upper edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinHistogram {
    edges: Vec<f64>,
    losses: u64,
    counts: Vec<u64>,
}

/// One rendered histogram row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub label: String,
    pub lower: f64,
    pub upper: Option<f64>,
    pub count: u64,
}

impl Default for WinHistogram {
    fn default() -> Self {
        Self {
            edges: DEFAULT_BUCKET_EDGES.to_vec(),
            losses: 0,
            counts: vec![0; DEFAULT_BUCKET_EDGES.len() + 1],
        }
    }
}

impl WinHistogram {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBuckets`] unless the edges are finite,
    /// positive and strictly increasing.
    pub fn new(edges: Vec<f64>) -> Result<Self, ConfigError> {
        let ascending = edges.windows(2).all(|pair| pair[0] < pair[1]);
        if !ascending || edges.iter().any(|edge| !edge.is_finite() || *edge <= 0.0) {
            return Err(ConfigError::InvalidBuckets);
        }
        let counts = vec![0; edges.len() + 1];
        Ok(Self {
            edges,
            losses: 0,
            counts,
        })
    }

    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn record(&mut self, win: f64) {
        if win <= 0.0 {
            self.losses += 1;
            return;
        }
        let index = self.edges.partition_point(|edge| *edge <= win);
        self.counts[index] += 1;
    }

    #[must_use]
    pub const fn losses(&self) -> u64 {
        self.losses
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.losses + self.counts.iter().sum::<u64>()
    }

    /// # Errors
    ///
    /// Returns [`StatsError::BucketMismatch`] when the edges differ.
    pub fn merge(&mut self, other: &Self) -> Result<(), StatsError> {
        if self.edges != other.edges {
            return Err(StatsError::BucketMismatch {
                left: self.edges.clone(),
                right: other.edges.clone(),
            });
        }
        self.losses += other.losses;
        for (count, extra) in self.counts.iter_mut().zip(&other.counts) {
            *count += extra;
        }
        Ok(())
    }

    /// Rows in order, loss bucket first.
    #[must_use]
    pub fn buckets(&self) -> Vec<HistogramBucket> {
        let named = self.edges.as_slice() == DEFAULT_BUCKET_EDGES.as_slice();
        let mut rows = vec![HistogramBucket {
            label: "loss".to_string(),
            lower: 0.0,
            upper: Some(0.0),
            count: self.losses,
        }];
        for (index, &count) in self.counts.iter().enumerate() {
            let lower = if index == 0 { 0.0 } else { self.edges[index - 1] };
            let upper = self.edges.get(index).copied();
            let label = if named {
                DEFAULT_BUCKET_LABELS[index].to_string()
            } else {
                match upper {
                    Some(upper) => format!("{lower}x-{upper}x"),
                    None => format!("{lower}x+"),
                }
            };
            rows.push(HistogramBucket {
                label,
                lower,
                upper,
                count,
            });
        }
        rows
    }
}

/// Running totals over shaped trials. One instance per reporting run or per
/// worker chunk; chunks combine with [`AggregateStats::merge`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateStats {
    pub trials: u64,
    pub win_units: u128,
    pub wins: u64,
    pub max_win: f64,
    pub cap_hits: u64,
    pub attempts: u64,
    pub exhausted: u64,
    pub terminations: BTreeMap<TerminationReason, u64>,
    pub histogram: WinHistogram,
}

impl AggregateStats {
    #[must_use]
    pub fn with_histogram(histogram: WinHistogram) -> Self {
        Self {
            histogram,
            ..Self::default()
        }
    }

    /// Empty stats sharing this instance's histogram edges.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        Self::with_histogram(WinHistogram {
            edges: self.histogram.edges.clone(),
            losses: 0,
            counts: vec![0; self.histogram.counts.len()],
        })
    }

    pub fn record(&mut self, outcome: &ShapedOutcome) {
        let win = outcome.record.final_win;
        self.trials += 1;
        self.win_units += win_to_units(win);
        if win > 0.0 {
            self.wins += 1;
        }
        self.max_win = self.max_win.max(win);
        if outcome.record.cap_triggered {
            self.cap_hits += 1;
        }
        self.attempts += u64::from(outcome.attempts);
        if outcome.exhausted {
            self.exhausted += 1;
        }
        *self
            .terminations
            .entry(outcome.record.termination)
            .or_insert(0) += 1;
        self.histogram.record(win);
    }

    /// Fold `other` into `self`.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::BucketMismatch`] when histogram edges differ;
    /// `self` is left untouched in that case.
    pub fn merge(&mut self, other: &Self) -> Result<(), StatsError> {
        self.histogram.merge(&other.histogram)?;
        self.trials += other.trials;
        self.win_units += other.win_units;
        self.wins += other.wins;
        self.max_win = self.max_win.max(other.max_win);
        self.cap_hits += other.cap_hits;
        self.attempts += other.attempts;
        self.exhausted += other.exhausted;
        for (&reason, &count) in &other.terminations {
            *self.terminations.entry(reason).or_insert(0) += count;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// See [`AggregateStats::merge`].
    pub fn merged(mut self, other: Self) -> Result<Self, StatsError> {
        self.merge(&other)?;
        Ok(self)
    }

    /// Sum of final wins as a multiple of the wager.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_win(&self) -> f64 {
        self.win_units as f64 / WIN_UNITS_PER_MULTIPLIER
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rtp(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        self.total_win() / self.trials as f64
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        self.wins as f64 / self.trials as f64
    }

    /// Mean final win over winning trials only.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_win(&self) -> f64 {
        if self.wins == 0 {
            return 0.0;
        }
        self.total_win() / self.wins as f64
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_attempts(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        self.attempts as f64 / self.trials as f64
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn win_to_units(win: f64) -> u128 {
    (win.max(0.0) * WIN_UNITS_PER_MULTIPLIER).round() as u128
}

/// Reporting record for one batch of one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub mode: String,
    pub seed: u64,
    pub cost: f64,
    pub trials: u64,
    pub rtp: f64,
    pub rtp_target: f64,
    pub rtp_deviation: f64,
    pub hit_rate: f64,
    pub hit_rate_target: f64,
    pub average_win: f64,
    pub max_win: f64,
    pub max_win_cap: f64,
    pub cap_hits: u64,
    pub exhausted: u64,
    pub mean_attempts: f64,
    pub terminations: BTreeMap<TerminationReason, u64>,
    pub histogram: Vec<HistogramBucket>,
    pub paytable_fingerprint: String,
}

impl BatchSummary {
    #[must_use]
    pub fn new(mode: &ModeConfig, paytable: &Paytable, seed: u64, stats: &AggregateStats) -> Self {
        let rtp = stats.rtp();
        Self {
            mode: mode.name.clone(),
            seed,
            cost: mode.cost,
            trials: stats.trials,
            rtp,
            rtp_target: mode.rtp_target,
            rtp_deviation: rtp - mode.rtp_target,
            hit_rate: stats.hit_rate(),
            hit_rate_target: mode.hit_rate_target,
            average_win: stats.average_win(),
            max_win: stats.max_win,
            max_win_cap: mode.max_win,
            cap_hits: stats.cap_hits,
            exhausted: stats.exhausted,
            mean_attempts: stats.mean_attempts(),
            terminations: stats.terminations.clone(),
            histogram: stats.histogram.buckets(),
            paytable_fingerprint: format!("{:016x}", paytable.fingerprint(mode.adjustment)),
        }
    }
}
