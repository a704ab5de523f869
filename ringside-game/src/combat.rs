//! Per-trial combat state and the symbol effect table.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::config::ModeConfig;
use crate::constants::{
    DAMAGE_PER_BASE_MULTIPLIER, FINISHER_HEALTH_THRESHOLD, HURT_DAMAGE_MAX, HURT_DAMAGE_MIN,
    STUN_DAMAGE_MAX, STUN_DAMAGE_MIN, STUN_STAMINA_MAX, STUN_STAMINA_MIN,
};
use crate::symbols::{Symbol, SymbolClass};

/// Side effect bound to a symbol when it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolEffect {
    None,
    /// Attacker loses a uniformly drawn amount of health.
    Hurt { health: RangeInclusive<u32> },
    /// Attacker loses health and stamina, drawn in that order.
    Stun {
        health: RangeInclusive<u32>,
        stamina: RangeInclusive<u32>,
    },
    /// Marks a landed finisher when the defender is already low.
    Finisher { threshold: f64 },
}

impl SymbolEffect {
    /// Effect dispatch, keyed on the symbol's class.
    #[must_use]
    pub fn for_symbol(symbol: Symbol) -> Self {
        match symbol.class() {
            SymbolClass::Damage => Self::Hurt {
                health: HURT_DAMAGE_MIN..=HURT_DAMAGE_MAX,
            },
            SymbolClass::Stun => Self::Stun {
                health: STUN_DAMAGE_MIN..=STUN_DAMAGE_MAX,
                stamina: STUN_STAMINA_MIN..=STUN_STAMINA_MAX,
            },
            SymbolClass::Finisher => Self::Finisher {
                threshold: FINISHER_HEALTH_THRESHOLD,
            },
            SymbolClass::Positioning | SymbolClass::Defensive | SymbolClass::Offensive => {
                Self::None
            }
        }
    }
}

/// Mutable state of a single trial. Built fresh for every attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    pub attacker_health: f64,
    pub defender_health: f64,
    pub stamina: f64,
    pub dodge_streak: u32,
    pub attack_streak: u32,
    pub damage_dealt: f64,
    pub damage_taken: f64,
    pub stamina_lost: f64,
    pub finisher_landed: bool,
}

impl CombatState {
    #[must_use]
    pub fn new(mode: &ModeConfig) -> Self {
        Self {
            attacker_health: mode.attacker_health,
            defender_health: mode.defender_health,
            stamina: mode.attacker_stamina,
            dodge_streak: 0,
            attack_streak: 0,
            damage_dealt: 0.0,
            damage_taken: 0.0,
            stamina_lost: 0.0,
            finisher_landed: false,
        }
    }

    /// Damage the defender in proportion to a matched base multiplier.
    pub fn strike_defender(&mut self, base_multiplier: f64) {
        let damage = base_multiplier * DAMAGE_PER_BASE_MULTIPLIER;
        self.defender_health = (self.defender_health - damage).max(0.0);
        self.damage_dealt += damage;
    }

    pub fn update_streaks(&mut self, symbol: Symbol) {
        match symbol.class() {
            SymbolClass::Defensive => {
                self.dodge_streak = self.dodge_streak.saturating_add(1);
                self.attack_streak = 0;
            }
            SymbolClass::Offensive => {
                self.attack_streak = self.attack_streak.saturating_add(1);
                self.dodge_streak = 0;
            }
            _ => {
                self.dodge_streak = 0;
                self.attack_streak = 0;
            }
        }
    }

    /// Apply the side effect bound to `symbol`, drawing any random amounts
    /// from the trial stream.
    pub fn apply_effect<R: Rng + ?Sized>(&mut self, symbol: Symbol, rng: &mut R) {
        match SymbolEffect::for_symbol(symbol) {
            SymbolEffect::None => {}
            SymbolEffect::Hurt { health } => {
                let damage = f64::from(rng.gen_range(health));
                self.hurt_attacker(damage);
            }
            SymbolEffect::Stun { health, stamina } => {
                let damage = f64::from(rng.gen_range(health));
                let drain = f64::from(rng.gen_range(stamina));
                self.hurt_attacker(damage);
                let lost = drain.min(self.stamina);
                self.stamina -= lost;
                self.stamina_lost += lost;
            }
            SymbolEffect::Finisher { threshold } => {
                if self.defender_health <= threshold {
                    self.finisher_landed = true;
                }
            }
        }
    }

    fn hurt_attacker(&mut self, damage: f64) {
        self.attacker_health = (self.attacker_health - damage).max(0.0);
        self.damage_taken += damage;
    }

    #[must_use]
    pub fn defender_down(&self) -> bool {
        self.defender_health <= 0.0
    }

    #[must_use]
    pub fn attacker_down(&self) -> bool {
        self.attacker_health <= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::TrialRng;
    use crate::symbols::SymbolPool;

    fn mode() -> ModeConfig {
        ModeConfig::new("combat", SymbolPool::new("combat", vec![Symbol::Punch]).unwrap())
            .with_health(100.0, 40.0)
    }

    #[test]
    fn streaks_follow_symbol_classes() {
        let mut state = CombatState::new(&mode());
        state.update_streaks(Symbol::Duck);
        state.update_streaks(Symbol::Backward);
        assert_eq!((state.dodge_streak, state.attack_streak), (2, 0));
        state.update_streaks(Symbol::Punch);
        assert_eq!((state.dodge_streak, state.attack_streak), (0, 1));
        state.update_streaks(Symbol::Forward);
        assert_eq!((state.dodge_streak, state.attack_streak), (0, 0));
    }

    #[test]
    fn strikes_scale_with_base_multiplier_and_clamp() {
        let mut state = CombatState::new(&mode());
        state.strike_defender(5.0);
        assert!((state.defender_health - 30.0).abs() < 1e-9);
        state.strike_defender(100.0);
        assert!(state.defender_health.abs() < f64::EPSILON);
        assert!(state.defender_down());
        assert!((state.damage_dealt - 210.0).abs() < 1e-9);
    }

    #[test]
    fn hurt_and_stun_stay_within_design_ranges() {
        let mut rng = TrialRng::from_seed(11);
        for _ in 0..200 {
            let mut state = CombatState::new(&mode());
            state.apply_effect(Symbol::Hurt, &mut rng);
            let lost = 100.0 - state.attacker_health;
            assert!((10.0..=20.0).contains(&lost), "hurt {lost}");

            let mut state = CombatState::new(&mode());
            state.apply_effect(Symbol::Dizzy, &mut rng);
            let lost = 100.0 - state.attacker_health;
            assert!((5.0..=15.0).contains(&lost), "stun {lost}");
            assert!((15.0..=25.0).contains(&state.stamina_lost));
        }
    }

    #[test]
    fn plain_moves_draw_nothing() {
        let mut rng = TrialRng::from_seed(3);
        let mut state = CombatState::new(&mode());
        for symbol in [Symbol::Punch, Symbol::Duck, Symbol::Forward, Symbol::Knockout] {
            state.apply_effect(symbol, &mut rng);
        }
        assert_eq!(rng.draws(), 0);
        assert!((state.attacker_health - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn finisher_lands_only_on_a_weakened_defender() {
        let mut rng = TrialRng::from_seed(5);
        let mut state = CombatState::new(&mode());
        state.apply_effect(Symbol::Knockout, &mut rng);
        assert!(!state.finisher_landed);
        state.strike_defender(5.0);
        state.apply_effect(Symbol::Knockout, &mut rng);
        assert!(state.finisher_landed);
    }
}
