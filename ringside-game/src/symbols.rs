//! Move alphabet and weighted symbol pools.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// One move of the closed alphabet drawn from a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    #[serde(rename = "FWD")]
    Forward,
    #[serde(rename = "BWD")]
    Backward,
    #[serde(rename = "PUN")]
    Punch,
    #[serde(rename = "UPP")]
    Uppercut,
    #[serde(rename = "DUK")]
    Duck,
    #[serde(rename = "HRT")]
    Hurt,
    #[serde(rename = "DIZ")]
    Dizzy,
    #[serde(rename = "KO")]
    Knockout,
}

/// Behavioural grouping used for streaks and side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolClass {
    Positioning,
    Defensive,
    Offensive,
    Damage,
    Stun,
    Finisher,
}

impl Symbol {
    pub const ALL: [Symbol; 8] = [
        Symbol::Forward,
        Symbol::Backward,
        Symbol::Punch,
        Symbol::Uppercut,
        Symbol::Duck,
        Symbol::Hurt,
        Symbol::Dizzy,
        Symbol::Knockout,
    ];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Symbol::Forward => "FWD",
            Symbol::Backward => "BWD",
            Symbol::Punch => "PUN",
            Symbol::Uppercut => "UPP",
            Symbol::Duck => "DUK",
            Symbol::Hurt => "HRT",
            Symbol::Dizzy => "DIZ",
            Symbol::Knockout => "KO",
        }
    }

    #[must_use]
    pub const fn class(self) -> SymbolClass {
        match self {
            Symbol::Forward => SymbolClass::Positioning,
            Symbol::Backward | Symbol::Duck => SymbolClass::Defensive,
            Symbol::Punch | Symbol::Uppercut => SymbolClass::Offensive,
            Symbol::Hurt => SymbolClass::Damage,
            Symbol::Dizzy => SymbolClass::Stun,
            Symbol::Knockout => SymbolClass::Finisher,
        }
    }

    /// Parse a symbol identifier, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|symbol| symbol.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Symbol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| ConfigError::UnknownSymbol {
            token: s.trim().to_string(),
        })
    }
}

/// Ordered strip of symbols; each symbol's frequency is its selection weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Symbol>", into = "Vec<Symbol>")]
pub struct SymbolPool {
    symbols: Vec<Symbol>,
}

impl SymbolPool {
    /// Wrap an explicit strip.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPool`] when the strip has no symbols.
    pub fn new(name: &str, symbols: Vec<Symbol>) -> Result<Self, ConfigError> {
        if symbols.is_empty() {
            return Err(ConfigError::EmptyPool {
                pool: name.to_string(),
            });
        }
        Ok(Self { symbols })
    }

    /// Build a strip from per-symbol counts, laid out in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPool`] when every count is zero.
    pub fn from_counts(name: &str, counts: &[(Symbol, usize)]) -> Result<Self, ConfigError> {
        let total = counts.iter().map(|(_, count)| count).sum();
        let mut symbols = Vec::with_capacity(total);
        for &(symbol, count) in counts {
            symbols.extend(std::iter::repeat_n(symbol, count));
        }
        Self::new(name, symbols)
    }

    /// Parse identifiers from a reel listing. The column header `symbol` and
    /// blank tokens are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown identifiers or when nothing remains.
    pub fn parse_tokens<'a, I>(name: &str, tokens: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut symbols = Vec::new();
        for token in tokens {
            let token = token.trim();
            if token.is_empty() || token.eq_ignore_ascii_case("symbol") {
                continue;
            }
            symbols.push(token.parse()?);
        }
        Self::new(name, symbols)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Uniform draw over strip positions.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Symbol {
        let index = rng.gen_range(0..self.symbols.len());
        self.symbols[index]
    }

    #[must_use]
    pub fn profile(&self) -> PoolProfile {
        PoolProfile::from_pool(self)
    }
}

impl TryFrom<Vec<Symbol>> for SymbolPool {
    type Error = ConfigError;

    fn try_from(symbols: Vec<Symbol>) -> Result<Self, Self::Error> {
        Self::new("inline", symbols)
    }
}

impl From<SymbolPool> for Vec<Symbol> {
    fn from(pool: SymbolPool) -> Self {
        pool.symbols
    }
}

/// Share of a single symbol within a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolShare {
    pub count: usize,
    pub share: f64,
}

/// Symbol and class distribution of a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolProfile {
    pub total: usize,
    pub symbols: BTreeMap<Symbol, SymbolShare>,
    pub classes: BTreeMap<SymbolClass, SymbolShare>,
}

impl PoolProfile {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_pool(pool: &SymbolPool) -> Self {
        let total = pool.len();
        let mut symbol_counts: BTreeMap<Symbol, usize> = BTreeMap::new();
        let mut class_counts: BTreeMap<SymbolClass, usize> = BTreeMap::new();
        for &symbol in pool.symbols() {
            *symbol_counts.entry(symbol).or_insert(0) += 1;
            *class_counts.entry(symbol.class()).or_insert(0) += 1;
        }
        let share = |count: usize| SymbolShare {
            count,
            share: count as f64 / total as f64,
        };
        Self {
            total,
            symbols: symbol_counts
                .into_iter()
                .map(|(symbol, count)| (symbol, share(count)))
                .collect(),
            classes: class_counts
                .into_iter()
                .map(|(class, count)| (class, share(count)))
                .collect(),
        }
    }

    #[must_use]
    pub fn share_of(&self, symbol: Symbol) -> f64 {
        self.symbols.get(&symbol).map_or(0.0, |entry| entry.share)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn codes_roundtrip_case_insensitively() {
        for symbol in Symbol::ALL {
            assert_eq!(Symbol::from_code(symbol.code()), Some(symbol));
            assert_eq!(
                Symbol::from_code(&symbol.code().to_lowercase()),
                Some(symbol)
            );
        }
        assert!("XYZ".parse::<Symbol>().is_err());
    }

    #[test]
    fn classes_follow_move_semantics() {
        assert_eq!(Symbol::Duck.class(), SymbolClass::Defensive);
        assert_eq!(Symbol::Backward.class(), SymbolClass::Defensive);
        assert_eq!(Symbol::Uppercut.class(), SymbolClass::Offensive);
        assert_eq!(Symbol::Forward.class(), SymbolClass::Positioning);
        assert_eq!(Symbol::Knockout.class(), SymbolClass::Finisher);
    }

    #[test]
    fn empty_pool_is_rejected() {
        let err = SymbolPool::new("empty", Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPool { ref pool } if pool == "empty"));
        assert!(SymbolPool::from_counts("zero", &[(Symbol::Punch, 0)]).is_err());
    }

    #[test]
    fn parse_tokens_skips_header_and_blanks() {
        let pool =
            SymbolPool::parse_tokens("csv", ["symbol", "PUN", "", " duk ", "KO"]).unwrap();
        assert_eq!(
            pool.symbols(),
            &[Symbol::Punch, Symbol::Duck, Symbol::Knockout]
        );
        let err = SymbolPool::parse_tokens("csv", ["PUN", "JAB"]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSymbol { ref token } if token == "JAB"));
    }

    #[test]
    fn draws_follow_strip_weights() {
        let pool = SymbolPool::from_counts("weighted", &[(Symbol::Punch, 3), (Symbol::Duck, 1)])
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let draws = 20_000_u32;
        let punches = (0..draws)
            .filter(|_| pool.draw(&mut rng) == Symbol::Punch)
            .count();
        let observed = f64::from(u32::try_from(punches).unwrap()) / f64::from(draws);
        assert!((observed - 0.75).abs() < 0.02, "observed {observed:.4}");
    }

    #[test]
    fn profile_reports_symbol_and_class_shares() {
        let pool = SymbolPool::from_counts(
            "profile",
            &[(Symbol::Backward, 2), (Symbol::Duck, 2), (Symbol::Punch, 4)],
        )
        .unwrap();
        let profile = pool.profile();
        assert_eq!(profile.total, 8);
        assert!((profile.share_of(Symbol::Punch) - 0.5).abs() < f64::EPSILON);
        assert_eq!(profile.classes[&SymbolClass::Defensive].count, 4);
        assert!(profile.share_of(Symbol::Knockout).abs() < f64::EPSILON);
    }

    #[test]
    fn pool_serializes_as_code_list() {
        let pool = SymbolPool::from_counts("json", &[(Symbol::Forward, 1), (Symbol::Knockout, 1)])
            .unwrap();
        let json = serde_json::to_string(&pool).unwrap();
        assert_eq!(json, r#"["FWD","KO"]"#);
        let back: SymbolPool = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pool);
        assert!(serde_json::from_str::<SymbolPool>("[]").is_err());
    }
}
