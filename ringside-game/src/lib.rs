//! Ringside Game Engine
//!
//! Platform-agnostic probabilistic core for the Ringside sequence-outcome game:
//! weighted symbol pools, longest-suffix paytable matching, the per-trial
//! combat state machine, bounded rejection sampling and batch aggregation.
//! This crate performs no I/O; reel sources are supplied through [`PoolSource`].

pub mod batch;
pub mod combat;
pub mod config;
pub mod constants;
pub mod evaluator;
pub mod generator;
pub mod paytable;
pub mod seed;
pub mod shaper;
pub mod stats;
pub mod symbols;
pub mod tuning;

use std::ops::Range;
use thiserror::Error;

// Re-export commonly used types
pub use batch::{BatchRunner, CancelFlag};
pub use combat::{CombatState, SymbolEffect};
pub use config::{ConfigError, GameConfig, LoadError, ModeConfig};
pub use evaluator::{
    BestWin, OutcomeEvaluator, SequenceTrial, TerminationReason, TrialPhase, TrialRecord,
};
pub use generator::{SequenceGenerator, draw, generate_sequence};
pub use paytable::{Pattern, PatternMatch, Paytable, PaytableEntry};
pub use seed::{CountingRng, TrialRng, trial_seed};
pub use shaper::{DistributionRequest, DistributionShaper, ShapedOutcome};
pub use stats::{AggregateStats, BatchSummary, HistogramBucket, StatsError, WinHistogram};
pub use symbols::{PoolProfile, Symbol, SymbolClass, SymbolPool, SymbolShare};
pub use tuning::{AdjustmentRecommendation, TuningError, recommend_adjustments, rtp_adjustment};

/// Supplies reel strips that replace the configured pool of a mode.
///
/// The engine does no I/O itself; callers that keep strips on disk or in a
/// database implement this and hand it to [`GameEngine::with_pools`].
pub trait PoolSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the strip for `mode`, or `None` to keep the configured pool.
    ///
    /// # Errors
    ///
    /// Returns an error if a strip exists but cannot be read or parsed.
    fn load_pool(&self, mode: &str) -> Result<Option<SymbolPool>, Self::Error>;
}

/// Source that never overrides the configured pools.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredPools;

impl PoolSource for ConfiguredPools {
    type Error = std::convert::Infallible;

    fn load_pool(&self, _mode: &str) -> Result<Option<SymbolPool>, Self::Error> {
        Ok(None)
    }
}

#[derive(Debug, Error)]
pub enum EngineError<E> {
    #[error("failed to load pool for {mode}")]
    Source {
        mode: String,
        #[source]
        source: E,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Validated game definition plus entry points for batches and replays.
#[derive(Debug, Clone)]
pub struct GameEngine {
    config: GameConfig,
}

impl GameEngine {
    /// # Errors
    ///
    /// Returns the first configuration invariant that fails.
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Build an engine, letting `source` replace the pool of any mode it
    /// knows about.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails or the final configuration is
    /// invalid.
    pub fn with_pools<P: PoolSource>(
        mut config: GameConfig,
        source: &P,
    ) -> Result<Self, EngineError<P::Error>> {
        for mode in &mut config.modes {
            let loaded = source
                .load_pool(&mode.name)
                .map_err(|source| EngineError::Source {
                    mode: mode.name.clone(),
                    source,
                })?;
            if let Some(pool) = loaded {
                log::debug!("{}: loaded {} symbol pool", mode.name, pool.len());
                mode.pool = pool;
            }
        }
        Ok(Self::new(config)?)
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// # Errors
    ///
    /// Returns an error for an unknown mode or an invalid request.
    pub fn runner(
        &self,
        mode: &str,
        seed: u64,
        request: DistributionRequest,
    ) -> Result<BatchRunner<'_>, ConfigError> {
        let mode = self.config.mode(mode)?;
        BatchRunner::new(&self.config, mode, seed, request)
    }

    /// Reproduce shaped trials of a batch without running the whole batch.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown mode or an invalid request.
    pub fn replay(
        &self,
        mode: &str,
        seed: u64,
        indices: Range<u64>,
        request: DistributionRequest,
    ) -> Result<Vec<ShapedOutcome>, ConfigError> {
        Ok(self.runner(mode, seed, request)?.records(indices))
    }
}
