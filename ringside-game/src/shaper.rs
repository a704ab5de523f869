//! Distribution shaper: bounded rejection sampling toward a target win.
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::constants::{DEFAULT_CATEGORY, DEFAULT_RETRY_CEILING, DEFAULT_TOLERANCE};
use crate::evaluator::{OutcomeEvaluator, TrialRecord};
use crate::seed::trial_seed;

/// Requested outcome category for one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRequest {
    pub category: String,
    /// `None` accepts the first attempt. `Some(0.0)` is a real target.
    #[serde(default)]
    pub target_win: Option<f64>,
    #[serde(default = "DistributionRequest::default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "DistributionRequest::default_retry_ceiling")]
    pub retry_ceiling: u32,
}

impl Default for DistributionRequest {
    fn default() -> Self {
        Self::any(DEFAULT_CATEGORY)
    }
}

impl DistributionRequest {
    const fn default_tolerance() -> f64 {
        DEFAULT_TOLERANCE
    }

    const fn default_retry_ceiling() -> u32 {
        DEFAULT_RETRY_CEILING
    }

    /// Accept whatever happens.
    #[must_use]
    pub fn any(category: &str) -> Self {
        Self {
            category: category.to_string(),
            target_win: None,
            tolerance: DEFAULT_TOLERANCE,
            retry_ceiling: DEFAULT_RETRY_CEILING,
        }
    }

    #[must_use]
    pub fn targeting(category: &str, target_win: f64) -> Self {
        Self {
            target_win: Some(target_win),
            ..Self::any(category)
        }
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_retry_ceiling(mut self, retry_ceiling: u32) -> Self {
        self.retry_ceiling = retry_ceiling;
        self
    }

    /// # Errors
    ///
    /// Rejects a negative or non-finite target or tolerance, and a zero retry
    /// ceiling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance {
                value: self.tolerance,
            });
        }
        if let Some(target) = self.target_win
            && (!target.is_finite() || target < 0.0)
        {
            return Err(ConfigError::NegativeValue {
                field: format!("{}.target_win", self.category),
                value: target,
            });
        }
        if self.retry_ceiling == 0 {
            return Err(ConfigError::InvalidRetryCeiling);
        }
        Ok(())
    }

    /// Whether `win` satisfies this request.
    #[must_use]
    pub fn accepts(&self, win: f64) -> bool {
        self.target_win
            .is_none_or(|target| (win - target).abs() <= self.tolerance * target)
    }
}

/// Accepted trial plus the cost of finding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapedOutcome {
    pub record: TrialRecord,
    pub attempts: u32,
    /// The ceiling forced acceptance of an out-of-tolerance trial.
    pub exhausted: bool,
}

/// Runs fresh trials until one satisfies the request or the ceiling is hit.
#[derive(Debug, Clone, Copy)]
pub struct DistributionShaper<'a> {
    evaluator: OutcomeEvaluator<'a>,
}

impl<'a> DistributionShaper<'a> {
    #[must_use]
    pub const fn new(evaluator: OutcomeEvaluator<'a>) -> Self {
        Self { evaluator }
    }

    #[must_use]
    pub const fn evaluator(&self) -> &OutcomeEvaluator<'a> {
        &self.evaluator
    }

    /// Shape trial `index` of a batch. Attempt `k` runs on the seed derived
    /// for `(mode, index, k)`, so retries are as reproducible as the first
    /// attempt.
    #[must_use]
    pub fn shape(&self, batch_seed: u64, index: u64, request: &DistributionRequest) -> ShapedOutcome {
        let mode = &self.evaluator.mode().name;
        let ceiling = request.retry_ceiling.max(1);
        let mut attempts = 0_u32;
        loop {
            let seed = trial_seed(batch_seed, &attempt_domain(mode, attempts), index);
            let record = self.evaluator.run_trial(seed);
            attempts += 1;
            if request.accepts(record.final_win) {
                return ShapedOutcome {
                    record,
                    attempts,
                    exhausted: false,
                };
            }
            if attempts >= ceiling {
                log::warn!(
                    "{mode} trial {index}: retry ceiling {ceiling} reached for {} (target {:?}, accepted {:.4})",
                    request.category,
                    request.target_win,
                    record.final_win
                );
                return ShapedOutcome {
                    record,
                    attempts,
                    exhausted: true,
                };
            }
            log::debug!(
                "{mode} trial {index}: attempt {attempts} won {:.4}, retrying for {}",
                record.final_win,
                request.category
            );
        }
    }
}

fn attempt_domain(mode: &str, attempt: u32) -> String {
    if attempt == 0 {
        mode.to_string()
    } else {
        format!("{mode}#{attempt}")
    }
}
