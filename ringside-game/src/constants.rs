//! Payout and combat constants for the Ringside outcome engine.
//!
//! Mode-level values (RTP targets, caps, pools) live in configuration; the
//! numbers here fix the rules every mode shares.

// Sequence -----------------------------------------------------------------
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 6;
pub(crate) const MIN_MATCH_LENGTH: usize = 2;

// Combat -------------------------------------------------------------------
pub(crate) const DAMAGE_PER_BASE_MULTIPLIER: f64 = 2.0;
pub(crate) const KNOCKOUT_BONUS_RATIO: f64 = 0.5;
pub(crate) const HURT_DAMAGE_MIN: u32 = 10;
pub(crate) const HURT_DAMAGE_MAX: u32 = 20;
pub(crate) const STUN_DAMAGE_MIN: u32 = 5;
pub(crate) const STUN_DAMAGE_MAX: u32 = 15;
pub(crate) const STUN_STAMINA_MIN: u32 = 15;
pub(crate) const STUN_STAMINA_MAX: u32 = 25;
pub(crate) const FINISHER_HEALTH_THRESHOLD: f64 = 30.0;
pub const DEFAULT_ATTACKER_HEALTH: f64 = 100.0;
pub const DEFAULT_ATTACKER_STAMINA: f64 = 100.0;

// Distribution shaping ------------------------------------------------------
pub const DEFAULT_TOLERANCE: f64 = 0.1;
pub const DEFAULT_RETRY_CEILING: u32 = 100;
pub const DEFAULT_CATEGORY: &str = "all_spins";

// Aggregation --------------------------------------------------------------
/// Fixed-point scale used when summing wins so merges stay exact.
pub(crate) const WIN_UNITS_PER_MULTIPLIER: f64 = 1_000_000.0;
pub const DEFAULT_BUCKET_EDGES: [f64; 5] = [0.1, 0.5, 2.0, 10.0, 100.0];
pub(crate) const DEFAULT_BUCKET_LABELS: [&str; 6] =
    ["tiny", "small", "medium", "big", "huge", "mega"];

// Standard catalogue -------------------------------------------------------
pub(crate) const STANDARD_RTP: f64 = 0.98;
pub(crate) const STANDARD_POOL_SIZE: usize = 100;
