//! Per-trial seed derivation and the instrumented trial RNG.
//!
//! Every trial owns an independent stream derived from the batch seed, the
//! mode name and the trial index, so results never depend on execution order
//! or on how trials are split across workers.

use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Derive the seed of one trial from the batch seed.
#[must_use]
pub fn trial_seed(batch_seed: u64, mode: &str, index: u64) -> u64 {
    // Zero padding to the block size matches the HMAC key schedule.
    let mut key = Key::<HmacSha256>::default();
    key[..8].copy_from_slice(&batch_seed.to_le_bytes());
    let mut mac = <HmacSha256 as KeyInit>::new(&key);
    mac.update(mode.as_bytes());
    mac.update(&[0]);
    mac.update(&index.to_le_bytes());
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// RNG handed to a single trial.
pub type TrialRng = CountingRng<ChaCha8Rng>;

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha8Rng> {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self::wrap(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    pub const fn wrap(rng: R) -> Self {
        Self { rng, draws: 0 }
    }

    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, RngCore};

    #[test]
    fn trial_seed_is_stable_and_domain_separated() {
        let base = trial_seed(1337, "balanced", 0);
        assert_eq!(base, trial_seed(1337, "balanced", 0));
        assert_ne!(base, trial_seed(1337, "balanced", 1));
        assert_ne!(base, trial_seed(1337, "defensive", 0));
        assert_ne!(base, trial_seed(1338, "balanced", 0));
    }

    #[test]
    fn padded_key_matches_slice_key() {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&42_u64.to_le_bytes()).unwrap();
        mac.update(b"aggressive");
        mac.update(&[0]);
        mac.update(&7_u64.to_le_bytes());
        let digest = mac.finalize().into_bytes();
        let expected = u64::from_le_bytes(digest[..8].try_into().unwrap());
        assert_eq!(trial_seed(42, "aggressive", 7), expected);
    }

    #[test]
    fn counting_rng_tracks_draws_without_changing_stream() {
        let mut counted = TrialRng::from_seed(99);
        let mut plain = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..5 {
            assert_eq!(counted.next_u64(), plain.next_u64());
        }
        assert_eq!(counted.draws(), 5);
        let _: u32 = counted.gen_range(0..10);
        assert!(counted.draws() >= 6);
    }
}
