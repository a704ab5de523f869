//! Variant configuration, validation, and the built-in catalogue.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::constants::{
    DEFAULT_ATTACKER_HEALTH, DEFAULT_ATTACKER_STAMINA, DEFAULT_MAX_SEQUENCE_LENGTH,
    MIN_MATCH_LENGTH, STANDARD_POOL_SIZE, STANDARD_RTP,
};
use crate::paytable::{Paytable, PaytableEntry};
use crate::symbols::{Symbol, SymbolPool};

/// Errors raised when configuration invariants are violated. These are fatal
/// for a batch and are never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("symbol pool {pool} is empty")]
    EmptyPool { pool: String },
    #[error("unknown symbol identifier {token:?}")]
    UnknownSymbol { token: String },
    #[error("paytable pattern {pattern} declares length {declared} but has {actual} symbols")]
    PatternLength {
        pattern: String,
        declared: usize,
        actual: usize,
    },
    #[error("paytable patterns must have at least one symbol")]
    ZeroLengthPattern,
    #[error("paytable pattern {pattern} appears more than once")]
    DuplicatePattern { pattern: String },
    #[error("paytable pattern {pattern} has invalid multiplier {value}")]
    NegativeMultiplier { pattern: String, value: f64 },
    #[error("{field} must be non-negative (got {value})")]
    NegativeValue { field: String, value: f64 },
    #[error("max sequence length must be at least {min} (got {value})", min = MIN_MATCH_LENGTH)]
    InvalidSequenceLength { value: usize },
    #[error("tolerance must be a finite non-negative fraction (got {value})")]
    InvalidTolerance { value: f64 },
    #[error("retry ceiling must be at least 1")]
    InvalidRetryCeiling,
    #[error("unknown mode {name}")]
    UnknownMode { name: String },
    #[error("mode {name} is defined more than once")]
    DuplicateMode { name: String },
    #[error("histogram edges must be finite, positive and strictly increasing")]
    InvalidBuckets,
}

/// Failure while reading a configuration document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Per-variant settings. Immutable once validated and passed by reference
/// into every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeConfig {
    pub name: String,
    #[serde(default)]
    pub style: String,
    pub cost: f64,
    pub rtp_target: f64,
    pub max_win: f64,
    pub pool: SymbolPool,
    #[serde(default = "ModeConfig::default_adjustment")]
    pub adjustment: f64,
    #[serde(default)]
    pub hit_rate_target: f64,
    pub defender_health: f64,
    #[serde(default = "ModeConfig::default_attacker_health")]
    pub attacker_health: f64,
    #[serde(default = "ModeConfig::default_attacker_stamina")]
    pub attacker_stamina: f64,
}

impl ModeConfig {
    const fn default_adjustment() -> f64 {
        1.0
    }

    const fn default_attacker_health() -> f64 {
        DEFAULT_ATTACKER_HEALTH
    }

    const fn default_attacker_stamina() -> f64 {
        DEFAULT_ATTACKER_STAMINA
    }

    /// Minimal variant around a pool, useful for tooling and tests.
    #[must_use]
    pub fn new(name: &str, pool: SymbolPool) -> Self {
        Self {
            name: name.to_string(),
            style: String::new(),
            cost: 1.0,
            rtp_target: STANDARD_RTP,
            max_win: 5_000.0,
            pool,
            adjustment: Self::default_adjustment(),
            hit_rate_target: 0.0,
            defender_health: 100.0,
            attacker_health: DEFAULT_ATTACKER_HEALTH,
            attacker_stamina: DEFAULT_ATTACKER_STAMINA,
        }
    }

    #[must_use]
    pub fn with_max_win(mut self, max_win: f64) -> Self {
        self.max_win = max_win;
        self
    }

    #[must_use]
    pub fn with_adjustment(mut self, adjustment: f64) -> Self {
        self.adjustment = adjustment;
        self
    }

    #[must_use]
    pub fn with_health(mut self, attacker: f64, defender: f64) -> Self {
        self.attacker_health = attacker;
        self.defender_health = defender;
        self
    }

    /// Check the numeric invariants of this variant.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NegativeValue`] for negative or non-finite
    /// health, stamina, cap, cost, or adjustment values, and
    /// [`ConfigError::EmptyPool`] for an empty pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool.is_empty() {
            return Err(ConfigError::EmptyPool {
                pool: self.name.clone(),
            });
        }
        for (field, value) in [
            ("cost", self.cost),
            ("rtp_target", self.rtp_target),
            ("max_win", self.max_win),
            ("adjustment", self.adjustment),
            ("hit_rate_target", self.hit_rate_target),
            ("defender_health", self.defender_health),
            ("attacker_health", self.attacker_health),
            ("attacker_stamina", self.attacker_stamina),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeValue {
                    field: format!("{}.{field}", self.name),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Complete game definition: shared paytable plus every variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "GameConfig::default_max_sequence_length")]
    pub max_sequence_length: usize,
    pub paytable: Paytable,
    pub modes: Vec<ModeConfig>,
}

impl GameConfig {
    const fn default_max_sequence_length() -> usize {
        DEFAULT_MAX_SEQUENCE_LENGTH
    }

    /// Assemble and validate a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn new(
        max_sequence_length: usize,
        paytable: Paytable,
        modes: Vec<ModeConfig>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            max_sequence_length,
            paytable,
            modes,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or violates an invariant.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every invariant before any trial runs.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sequence_length < MIN_MATCH_LENGTH {
            return Err(ConfigError::InvalidSequenceLength {
                value: self.max_sequence_length,
            });
        }
        let mut seen = HashSet::new();
        for mode in &self.modes {
            if !seen.insert(mode.name.as_str()) {
                return Err(ConfigError::DuplicateMode {
                    name: mode.name.clone(),
                });
            }
            mode.validate()?;
        }
        Ok(())
    }

    /// Resolve a variant by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownMode`] when no variant matches.
    pub fn mode(&self, name: &str) -> Result<&ModeConfig, ConfigError> {
        self.modes
            .iter()
            .find(|mode| mode.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownMode {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn mode_names(&self) -> Vec<&str> {
        self.modes.iter().map(|mode| mode.name.as_str()).collect()
    }

    /// Swap in a replacement pool for a variant.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownMode`] when no variant matches.
    pub fn replace_pool(&mut self, name: &str, pool: SymbolPool) -> Result<(), ConfigError> {
        let mode = self
            .modes
            .iter_mut()
            .find(|mode| mode.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownMode {
                name: name.to_string(),
            })?;
        mode.pool = pool;
        Ok(())
    }

    /// Built-in three-variant catalogue.
    #[must_use]
    pub fn standard() -> Self {
        let paytable = Paytable::from_entries(standard_paytable_rows())
            .unwrap_or_else(|_| unreachable!("standard paytable rows are well formed"));
        let modes = STANDARD_MODES
            .iter()
            .map(|spec| ModeConfig {
                name: spec.name.to_string(),
                style: spec.style.to_string(),
                cost: spec.cost,
                rtp_target: STANDARD_RTP,
                max_win: spec.max_win,
                pool: standard_pool(spec),
                adjustment: spec.adjustment,
                hit_rate_target: spec.hit_rate_target,
                defender_health: spec.defender_health,
                attacker_health: DEFAULT_ATTACKER_HEALTH,
                attacker_stamina: DEFAULT_ATTACKER_STAMINA,
            })
            .collect();
        Self {
            max_sequence_length: DEFAULT_MAX_SEQUENCE_LENGTH,
            paytable,
            modes,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::standard()
    }
}

struct StandardMode {
    name: &'static str,
    style: &'static str,
    cost: f64,
    max_win: f64,
    adjustment: f64,
    hit_rate_target: f64,
    defender_health: f64,
    counts: [(Symbol, usize); 8],
}

const STANDARD_MODES: [StandardMode; 3] = [
    StandardMode {
        name: "defensive",
        style: "Strategic and defensive fighter",
        cost: 1.0,
        max_win: 5_000.0,
        adjustment: 1.0390,
        hit_rate_target: 0.70,
        defender_health: 150.0,
        counts: [
            (Symbol::Backward, 26),
            (Symbol::Duck, 16),
            (Symbol::Forward, 20),
            (Symbol::Punch, 20),
            (Symbol::Uppercut, 12),
            (Symbol::Hurt, 4),
            (Symbol::Dizzy, 1),
            (Symbol::Knockout, 1),
        ],
    },
    StandardMode {
        name: "balanced",
        style: "Tactical and unpredictable fighter",
        cost: 2.0,
        max_win: 7_500.0,
        adjustment: 1.0432,
        hit_rate_target: 0.50,
        defender_health: 125.0,
        counts: [
            (Symbol::Forward, 26),
            (Symbol::Punch, 25),
            (Symbol::Backward, 16),
            (Symbol::Duck, 12),
            (Symbol::Uppercut, 11),
            (Symbol::Hurt, 5),
            (Symbol::Dizzy, 4),
            (Symbol::Knockout, 1),
        ],
    },
    StandardMode {
        name: "aggressive",
        style: "Aggressive and chaotic fighter",
        cost: 3.0,
        max_win: 10_000.0,
        adjustment: 0.9179,
        hit_rate_target: 0.35,
        defender_health: 100.0,
        counts: [
            (Symbol::Forward, 32),
            (Symbol::Punch, 32),
            (Symbol::Uppercut, 12),
            (Symbol::Duck, 8),
            (Symbol::Backward, 10),
            (Symbol::Hurt, 4),
            (Symbol::Dizzy, 1),
            (Symbol::Knockout, 1),
        ],
    },
];

fn standard_pool(spec: &StandardMode) -> SymbolPool {
    debug_assert_eq!(
        spec.counts.iter().map(|(_, count)| count).sum::<usize>(),
        STANDARD_POOL_SIZE
    );
    SymbolPool::from_counts(spec.name, &spec.counts)
        .unwrap_or_else(|_| unreachable!("standard pools are non-empty"))
}

const STANDARD_PAYTABLE: &[(usize, &str, f64)] = &[
    // Basic two-move combos
    (2, "FWD-PUN", 0.053),
    (2, "PUN-PUN", 0.053),
    (2, "BWD-PUN", 0.0636),
    (2, "FWD-UPP", 0.1484),
    (2, "PUN-UPP", 0.0954),
    (2, "BWD-UPP", 0.1166),
    (2, "BWD-BWD", 0.0212),
    (2, "DUK-DUK", 0.053),
    (2, "BWD-DUK", 0.053),
    (2, "DUK-BWD", 0.053),
    (2, "BWD-FWD", 0.0212),
    (2, "FWD-BWD", 0.0212),
    (2, "FWD-FWD", 0.053),
    (2, "DUK-PUN", 0.053),
    (2, "DUK-FWD", 0.053),
    (2, "DUK-UPP", 0.4241),
    // Three-move combos
    (3, "PUN-PUN-UPP", 0.2757),
    (3, "FWD-PUN-UPP", 0.3287),
    (3, "BWD-FWD-UPP", 0.4665),
    (3, "FWD-FWD-PUN", 0.2121),
    (3, "BWD-BWD-PUN", 0.159),
    (3, "DUK-DUK-PUN", 0.2333),
    (3, "FWD-PUN-PUN", 0.2333),
    (3, "BWD-PUN-UPP", 0.2757),
    (3, "DUK-DUK-UPP", 0.6574),
    // Four-move combos
    (4, "BWD-DUK-FWD-UPP", 1.3996),
    (4, "PUN-PUN-PUN-UPP", 1.0709),
    (4, "FWD-FWD-PUN-UPP", 0.9331),
    (4, "DUK-DUK-DUK-UPP", 2.0994),
    (4, "FWD-FWD-FWD-PUN", 0.7952),
    // Finisher sequences
    (2, "UPP-KO", 23.369),
    (2, "DUK-KO", 46.7274),
    (2, "PUN-KO", 14.0278),
    (3, "PUN-UPP-KO", 35.0429),
    (3, "DUK-UPP-KO", 70.1071),
    (4, "DUK-DUK-UPP-KO", 116.8345),
    (5, "BWD-DUK-FWD-UPP-KO", 233.6584),
    (4, "FWD-FWD-UPP-KO", 93.4655),
    // Legendary sequences
    (4, "HRT-DIZ-UPP-KO", 467.3274),
    (5, "DUK-DUK-DUK-UPP-KO", 2_336.6264),
    (5, "FWD-FWD-FWD-UPP-KO", 2_336.6264),
    (6, "DUK-DUK-DUK-DUK-UPP-KO", 2_336.6264),
];

fn standard_paytable_rows() -> impl Iterator<Item = PaytableEntry> {
    STANDARD_PAYTABLE
        .iter()
        .map(|&(length, pattern, multiplier)| PaytableEntry::new(length, pattern, multiplier))
}
