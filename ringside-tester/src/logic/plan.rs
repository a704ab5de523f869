use anyhow::{Context, Result, ensure};
use ringside_game::DistributionRequest;
use ringside_game::constants::{DEFAULT_CATEGORY, DEFAULT_RETRY_CEILING, DEFAULT_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One named slice of a batch with its own shaping target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanCategory {
    pub name: String,
    pub quota: f64,
    #[serde(default)]
    pub target_win: Option<f64>,
}

/// How a batch is split across distribution categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionPlan {
    pub categories: Vec<PlanCategory>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: u32,
}

const fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

const fn default_retry_ceiling() -> u32 {
    DEFAULT_RETRY_CEILING
}

/// Trials assigned to one category: indices `offset..offset + trials`.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAllocation {
    pub request: DistributionRequest,
    pub offset: u64,
    pub trials: u64,
}

impl Default for DistributionPlan {
    fn default() -> Self {
        Self::single(DEFAULT_CATEGORY, None)
    }
}

impl DistributionPlan {
    #[must_use]
    pub fn single(category: &str, target_win: Option<f64>) -> Self {
        Self {
            categories: vec![PlanCategory {
                name: category.to_string(),
                quota: 1.0,
                target_win,
            }],
            tolerance: DEFAULT_TOLERANCE,
            retry_ceiling: DEFAULT_RETRY_CEILING,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan {}", path.display()))?;
        let plan: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse plan {}", path.display()))?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.categories.is_empty(), "plan has no categories");
        for category in &self.categories {
            ensure!(
                category.quota.is_finite() && category.quota >= 0.0,
                "category {} has invalid quota {}",
                category.name,
                category.quota
            );
        }
        let total: f64 = self.categories.iter().map(|c| c.quota).sum();
        ensure!(
            (total - 1.0).abs() <= 1e-6,
            "category quotas must sum to 1 (got {total})"
        );
        for request in self.requests() {
            request.validate()?;
        }
        Ok(())
    }

    fn requests(&self) -> impl Iterator<Item = DistributionRequest> + '_ {
        self.categories.iter().map(|category| DistributionRequest {
            category: category.name.clone(),
            target_win: category.target_win,
            tolerance: self.tolerance,
            retry_ceiling: self.retry_ceiling,
        })
    }

    /// Split `trials` across categories by largest remainder so the counts
    /// always add up to `trials`. Quotas are normalised by their sum first,
    /// and ties go to the earlier category.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn allocate(&self, trials: u64) -> Vec<CategoryAllocation> {
        let total_quota: f64 = self.categories.iter().map(|c| c.quota).sum();
        let exact: Vec<f64> = self
            .categories
            .iter()
            .map(|category| {
                if total_quota > 0.0 {
                    category.quota / total_quota * trials as f64
                } else {
                    0.0
                }
            })
            .collect();
        let mut counts: Vec<u64> = exact.iter().map(|value| value.floor() as u64).collect();
        let mut order: Vec<usize> = (0..counts.len()).collect();
        order.sort_by(|&a, &b| {
            let rem_a = exact[a] - exact[a].floor();
            let rem_b = exact[b] - exact[b].floor();
            rem_b.total_cmp(&rem_a).then(a.cmp(&b))
        });

        let mut assigned: u64 = counts.iter().sum();
        // Rounding can still overshoot by a trial or two; take it back from
        // the smallest remainders.
        for &index in order.iter().rev().cycle().take(order.len() * 2) {
            if assigned <= trials {
                break;
            }
            if counts[index] > 0 {
                counts[index] -= 1;
                assigned -= 1;
            }
        }
        let leftover = trials.saturating_sub(assigned);
        for &index in order.iter().cycle().take(usize::try_from(leftover).unwrap_or(0)) {
            counts[index] += 1;
        }

        let mut offset = 0;
        self.requests()
            .zip(counts)
            .map(|(request, count)| {
                let allocation = CategoryAllocation {
                    request,
                    offset,
                    trials: count,
                };
                offset += count;
                allocation
            })
            .collect()
    }
}
