//! RTP tuning helpers driven by measured batch summaries.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::GameConfig;
use crate::stats::BatchSummary;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TuningError {
    #[error("measured rtp must be positive to derive an adjustment (got {measured})")]
    NonPositiveRtp { measured: f64 },
}

/// Factor that moves `measured_rtp` onto `target_rtp` when applied to every
/// multiplier.
///
/// # Errors
///
/// Returns [`TuningError::NonPositiveRtp`] if `measured_rtp` is not positive.
pub fn rtp_adjustment(measured_rtp: f64, target_rtp: f64) -> Result<f64, TuningError> {
    if !measured_rtp.is_finite() || measured_rtp <= 0.0 {
        return Err(TuningError::NonPositiveRtp {
            measured: measured_rtp,
        });
    }
    Ok(target_rtp / measured_rtp)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRecommendation {
    pub mode: String,
    pub trials: u64,
    pub measured_rtp: f64,
    pub target_rtp: f64,
    pub current_adjustment: f64,
    pub recommended_adjustment: f64,
}

/// Pool every summary per mode (trial-weighted) and recommend a new
/// adjustment factor for each mode known to `config`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn recommend_adjustments(
    config: &GameConfig,
    summaries: &[BatchSummary],
) -> Vec<AdjustmentRecommendation> {
    let mut pooled: BTreeMap<&str, (u64, f64)> = BTreeMap::new();
    for summary in summaries {
        let entry = pooled.entry(summary.mode.as_str()).or_insert((0, 0.0));
        entry.0 += summary.trials;
        entry.1 += summary.rtp * summary.trials as f64;
    }

    config
        .modes
        .iter()
        .filter_map(|mode| {
            let &(trials, weighted) = pooled.get(mode.name.as_str())?;
            if trials == 0 {
                return None;
            }
            let measured_rtp = weighted / trials as f64;
            match rtp_adjustment(measured_rtp, mode.rtp_target) {
                Ok(factor) => Some(AdjustmentRecommendation {
                    mode: mode.name.clone(),
                    trials,
                    measured_rtp,
                    target_rtp: mode.rtp_target,
                    current_adjustment: mode.adjustment,
                    recommended_adjustment: round_to(mode.adjustment * factor, 4),
                }),
                Err(err) => {
                    log::warn!("{}: {err}", mode.name);
                    None
                }
            }
        })
        .collect()
}

/// Mean of the per-mode correction factors, for a single uniform paytable
/// rescale.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn uniform_scale(recommendations: &[AdjustmentRecommendation]) -> Option<f64> {
    if recommendations.is_empty() {
        return None;
    }
    let total: f64 = recommendations
        .iter()
        .map(|rec| rec.recommended_adjustment / rec.current_adjustment)
        .sum();
    Some(total / recommendations.len() as f64)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let precision = 10_f64.powi(decimals);
    (value * precision).round() / precision
}
