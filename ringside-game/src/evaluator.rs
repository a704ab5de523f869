//! Outcome evaluator: the per-trial state machine.
//!
//! A trial draws symbols one at a time. After every draw the evaluator
//! matches the longest paying suffix, strikes the defender, updates streaks,
//! applies the symbol's side effect and then checks for a terminal state.
//! Only the single best scaled win of the trial is kept.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::combat::CombatState;
use crate::config::{GameConfig, ModeConfig};
use crate::constants::KNOCKOUT_BONUS_RATIO;
use crate::generator::generate_sequence;
use crate::paytable::{Paytable, Pattern, PatternMatch};
use crate::seed::TrialRng;
use crate::symbols::Symbol;

/// Why a trial stopped drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    MaxLength,
    DefenderDown,
    AttackerDown,
}

impl TerminationReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxLength => "max_length",
            Self::DefenderDown => "defender_down",
            Self::AttackerDown => "attacker_down",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TrialPhase {
    InProgress,
    Terminal(TerminationReason),
}

/// Best payable match seen so far in a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestWin {
    pub pattern: Pattern,
    pub length: usize,
    pub base_multiplier: f64,
    pub scaled_multiplier: f64,
}

/// Everything downstream tooling needs to replay or render a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub mode: String,
    pub seed: u64,
    pub symbols: Vec<Symbol>,
    pub matched_pattern: Option<Pattern>,
    pub match_length: Option<usize>,
    pub base_multiplier: f64,
    pub scaled_multiplier: f64,
    pub knockout_bonus: f64,
    pub pre_cap_win: f64,
    pub final_win: f64,
    pub termination: TerminationReason,
    pub cap_triggered: bool,
    pub matches: u32,
    pub combat: CombatState,
    pub draws: u64,
}

impl TrialRecord {
    #[must_use]
    pub fn is_win(&self) -> bool {
        self.final_win > 0.0
    }

    #[must_use]
    pub fn rendered_symbols(&self) -> String {
        self.symbols
            .iter()
            .map(|symbol| symbol.code())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Evaluates trials for one variant against a shared paytable.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeEvaluator<'a> {
    paytable: &'a Paytable,
    mode: &'a ModeConfig,
    max_len: usize,
}

impl<'a> OutcomeEvaluator<'a> {
    #[must_use]
    pub fn new(config: &'a GameConfig, mode: &'a ModeConfig) -> Self {
        Self::with_parts(&config.paytable, mode, config.max_sequence_length)
    }

    #[must_use]
    pub const fn with_parts(paytable: &'a Paytable, mode: &'a ModeConfig, max_len: usize) -> Self {
        Self {
            paytable,
            mode,
            max_len,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> &'a ModeConfig {
        self.mode
    }

    /// Fresh trial state at `IN_PROGRESS`.
    #[must_use]
    pub fn begin(&self) -> SequenceTrial<'a> {
        SequenceTrial {
            evaluator: *self,
            symbols: Vec::with_capacity(self.max_len),
            best: None,
            win: 0.0,
            knockout_bonus: 0.0,
            matches: 0,
            combat: CombatState::new(self.mode),
            phase: TrialPhase::InProgress,
        }
    }

    /// Run a full trial from its seed.
    #[must_use]
    pub fn run_trial(&self, seed: u64) -> TrialRecord {
        let mut rng = TrialRng::from_seed(seed);
        let mut trial = self.begin();
        let mut draws = generate_sequence(&self.mode.pool, &mut rng, self.max_len);
        while let Some(symbol) = draws.next() {
            if trial.step(symbol, draws.rng()).is_some() {
                break;
            }
        }
        trial.finish(seed, rng.draws())
    }
}

/// One attempt in progress. Replaced, never reused, on retry.
#[derive(Debug, Clone)]
pub struct SequenceTrial<'a> {
    evaluator: OutcomeEvaluator<'a>,
    symbols: Vec<Symbol>,
    best: Option<BestWin>,
    win: f64,
    knockout_bonus: f64,
    matches: u32,
    combat: CombatState,
    phase: TrialPhase,
}

impl SequenceTrial<'_> {
    #[must_use]
    pub const fn phase(&self) -> TrialPhase {
        self.phase
    }

    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    #[must_use]
    pub const fn combat(&self) -> &CombatState {
        &self.combat
    }

    #[must_use]
    pub const fn best(&self) -> Option<&BestWin> {
        self.best.as_ref()
    }

    /// Current win before capping.
    #[must_use]
    pub const fn current_win(&self) -> f64 {
        self.win
    }

    /// Feed one drawn symbol. Returns the termination reason once the trial
    /// reaches a terminal state; further symbols are ignored.
    pub fn step<R: rand::Rng + ?Sized>(
        &mut self,
        symbol: Symbol,
        rng: &mut R,
    ) -> Option<TerminationReason> {
        if let TrialPhase::Terminal(reason) = self.phase {
            return Some(reason);
        }
        self.symbols.push(symbol);

        if let Some(hit) = self
            .evaluator
            .paytable
            .longest_suffix_match(&self.symbols, self.evaluator.max_len)
        {
            self.record_match(hit);
        }

        self.combat.update_streaks(symbol);
        self.combat.apply_effect(symbol, rng);

        let reason = if self.combat.defender_down() {
            if self.win > 0.0 {
                self.knockout_bonus = self.win * KNOCKOUT_BONUS_RATIO;
                self.win += self.knockout_bonus;
            }
            Some(TerminationReason::DefenderDown)
        } else if self.combat.attacker_down() {
            self.win = 0.0;
            self.best = None;
            Some(TerminationReason::AttackerDown)
        } else if self.symbols.len() >= self.evaluator.max_len {
            Some(TerminationReason::MaxLength)
        } else {
            None
        };

        if let Some(reason) = reason {
            self.phase = TrialPhase::Terminal(reason);
        }
        reason
    }

    fn record_match(&mut self, hit: PatternMatch) {
        self.matches = self.matches.saturating_add(1);
        self.combat.strike_defender(hit.base_multiplier);
        let scaled = hit.base_multiplier * self.evaluator.mode.adjustment;
        if scaled > self.win {
            self.win = scaled;
            self.best = Some(BestWin {
                pattern: hit.pattern,
                length: hit.length,
                base_multiplier: hit.base_multiplier,
                scaled_multiplier: scaled,
            });
        }
    }

    /// Clamp to the variant cap and produce the trial record. A trial that
    /// never reached a terminal state is reported as `MaxLength`.
    #[must_use]
    pub fn finish(self, seed: u64, draws: u64) -> TrialRecord {
        let termination = match self.phase {
            TrialPhase::Terminal(reason) => reason,
            TrialPhase::InProgress => TerminationReason::MaxLength,
        };
        let cap = self.evaluator.mode.max_win;
        let cap_triggered = self.win > cap;
        let final_win = self.win.min(cap);
        let (matched_pattern, match_length, base_multiplier, scaled_multiplier) =
            match self.best {
                Some(best) => (
                    Some(best.pattern),
                    Some(best.length),
                    best.base_multiplier,
                    best.scaled_multiplier,
                ),
                None => (None, None, 0.0, 0.0),
            };
        TrialRecord {
            mode: self.evaluator.mode.name.clone(),
            seed,
            symbols: self.symbols,
            matched_pattern,
            match_length,
            base_multiplier,
            scaled_multiplier,
            knockout_bonus: self.knockout_bonus,
            pre_cap_win: self.win,
            final_win,
            termination,
            cap_triggered,
            matches: self.matches,
            combat: self.combat,
            draws,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paytable::PaytableEntry;
    use crate::symbols::SymbolPool;
    use rand::SeedableRng;
    use rand::rngs::mock::StepRng;

    fn table(rows: &[(usize, &str, f64)]) -> Paytable {
        Paytable::from_entries(
            rows.iter()
                .map(|&(length, pattern, multiplier)| PaytableEntry::new(length, pattern, multiplier)),
        )
        .unwrap()
    }

    fn mode(max_win: f64) -> ModeConfig {
        ModeConfig::new("unit", SymbolPool::new("unit", vec![Symbol::Punch]).unwrap())
            .with_max_win(max_win)
            .with_health(100.0, 1_000.0)
    }

    fn feed(trial: &mut SequenceTrial<'_>, symbols: &[Symbol]) -> Option<TerminationReason> {
        let mut rng = StepRng::new(0, 1);
        let mut last = None;
        for &symbol in symbols {
            last = trial.step(symbol, &mut rng);
        }
        last
    }

    #[test]
    fn longer_match_beats_richer_short_match() {
        let paytable = table(&[(4, "FWD-FWD-PUN-UPP", 0.9), (2, "PUN-UPP", 5.0)]);
        let mode = mode(100.0);
        let evaluator = OutcomeEvaluator::with_parts(&paytable, &mode, 6);
        let mut trial = evaluator.begin();
        feed(
            &mut trial,
            &[Symbol::Forward, Symbol::Forward, Symbol::Punch, Symbol::Uppercut],
        );
        let best = trial.best().unwrap();
        assert_eq!(best.length, 4);
        assert!((best.scaled_multiplier - 0.9).abs() < 1e-12);
    }

    #[test]
    fn keeps_single_best_win() {
        let paytable = table(&[(2, "PUN-PUN", 0.5), (2, "DUK-DUK", 2.0), (2, "FWD-FWD", 1.0)]);
        let mode = mode(100.0);
        let evaluator = OutcomeEvaluator::with_parts(&paytable, &mode, 6);
        let mut trial = evaluator.begin();
        let reason = feed(
            &mut trial,
            &[
                Symbol::Punch,
                Symbol::Punch,
                Symbol::Duck,
                Symbol::Duck,
                Symbol::Forward,
                Symbol::Forward,
            ],
        );
        assert_eq!(reason, Some(TerminationReason::MaxLength));
        let record = trial.finish(0, 0);
        assert_eq!(record.matches, 3);
        assert!((record.final_win - 2.0).abs() < 1e-12);
        assert_eq!(record.matched_pattern.unwrap().to_string(), "DUK-DUK");
    }

    #[test]
    fn equal_wins_keep_first_writer() {
        let paytable = table(&[(2, "PUN-PUN", 1.0), (2, "DUK-DUK", 1.0)]);
        let mode = mode(100.0);
        let evaluator = OutcomeEvaluator::with_parts(&paytable, &mode, 6);
        let mut trial = evaluator.begin();
        feed(&mut trial, &[Symbol::Punch, Symbol::Punch, Symbol::Duck, Symbol::Duck]);
        assert_eq!(trial.best().unwrap().pattern.to_string(), "PUN-PUN");
    }

    #[test]
    fn adjustment_scales_win_but_not_damage() {
        let paytable = table(&[(2, "PUN-PUN", 2.0)]);
        let mode = mode(100.0).with_adjustment(1.5);
        let evaluator = OutcomeEvaluator::with_parts(&paytable, &mode, 6);
        let mut trial = evaluator.begin();
        feed(&mut trial, &[Symbol::Punch, Symbol::Punch]);
        assert!((trial.current_win() - 3.0).abs() < 1e-12);
        assert!((trial.combat().damage_dealt - 4.0).abs() < 1e-12);
    }

    #[test]
    fn defender_down_pays_knockout_bonus_then_caps() {
        let paytable = table(&[(2, "PUN-PUN", 10.0)]);
        let mode = mode(12.0).with_health(100.0, 15.0);
        let evaluator = OutcomeEvaluator::with_parts(&paytable, &mode, 6);
        let mut trial = evaluator.begin();
        let reason = feed(&mut trial, &[Symbol::Punch, Symbol::Punch, Symbol::Punch]);
        assert_eq!(reason, Some(TerminationReason::DefenderDown));
        assert_eq!(trial.symbols().len(), 2);
        let record = trial.finish(0, 0);
        assert!((record.pre_cap_win - 15.0).abs() < 1e-12);
        assert!((record.knockout_bonus - 5.0).abs() < 1e-12);
        assert!(record.cap_triggered);
        assert!((record.final_win - 12.0).abs() < 1e-12);
    }

    #[test]
    fn win_exactly_at_cap_is_not_flagged() {
        let paytable = table(&[(2, "PUN-PUN", 10.0)]);
        let mode = mode(10.0);
        let evaluator = OutcomeEvaluator::with_parts(&paytable, &mode, 2);
        let mut trial = evaluator.begin();
        feed(&mut trial, &[Symbol::Punch, Symbol::Punch]);
        let record = trial.finish(0, 0);
        assert!(!record.cap_triggered);
        assert!((record.final_win - 10.0).abs() < 1e-12);
    }

    #[test]
    fn attacker_down_zeroes_accumulated_win() {
        let paytable = table(&[(2, "PUN-PUN", 3.0)]);
        let mode = mode(100.0).with_health(15.0, 1_000.0);
        let evaluator = OutcomeEvaluator::with_parts(&paytable, &mode, 6);
        let mut trial = evaluator.begin();
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(4);
        trial.step(Symbol::Punch, &mut rng);
        trial.step(Symbol::Punch, &mut rng);
        assert!(trial.current_win() > 0.0);
        let mut reason = None;
        while reason.is_none() {
            reason = trial.step(Symbol::Hurt, &mut rng);
        }
        assert_eq!(reason, Some(TerminationReason::AttackerDown));
        let record = trial.finish(0, 0);
        assert!(record.final_win.abs() < f64::EPSILON);
        assert!(record.combat.attacker_health.abs() < f64::EPSILON);
        assert!(record.matched_pattern.is_none());
        assert!(record.match_length.is_none());
        assert!(record.base_multiplier.abs() < f64::EPSILON);
        assert!(record.scaled_multiplier.abs() < f64::EPSILON);
        assert_eq!(record.matches, 1);
    }

    #[test]
    fn steps_after_termination_are_ignored() {
        let paytable = table(&[(2, "PUN-PUN", 1.0)]);
        let mode = mode(100.0);
        let evaluator = OutcomeEvaluator::with_parts(&paytable, &mode, 2);
        let mut trial = evaluator.begin();
        feed(&mut trial, &[Symbol::Duck, Symbol::Duck]);
        assert_eq!(
            trial.phase(),
            TrialPhase::Terminal(TerminationReason::MaxLength)
        );
        feed(&mut trial, &[Symbol::Punch, Symbol::Punch]);
        assert_eq!(trial.symbols().len(), 2);
        assert!(trial.current_win().abs() < f64::EPSILON);
    }

    #[test]
    fn run_trial_is_deterministic_per_seed() {
        let config = GameConfig::standard();
        let mode = config.mode("balanced").unwrap();
        let evaluator = OutcomeEvaluator::new(&config, mode);
        let first = evaluator.run_trial(99);
        let second = evaluator.run_trial(99);
        assert_eq!(first, second);
        assert!(first.symbols.len() <= config.max_sequence_length);
        assert!(first.draws >= first.symbols.len() as u64);
    }
}
