//! Paytable and longest-suffix matching.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::config::ConfigError;
use crate::constants::MIN_MATCH_LENGTH;
use crate::symbols::Symbol;

/// Exact ordered move pattern such as `DUK-DUK-UPP`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern(SmallVec<[Symbol; 6]>);

impl Pattern {
    #[must_use]
    pub fn from_symbols(symbols: &[Symbol]) -> Self {
        Self(SmallVec::from_slice(symbols))
    }

    /// Parse the dash-separated rendering used by authored tables.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty pattern or an unknown identifier.
    pub fn parse(rendered: &str) -> Result<Self, ConfigError> {
        let rendered = rendered.trim();
        if rendered.is_empty() {
            return Err(ConfigError::ZeroLengthPattern);
        }
        rendered
            .split('-')
            .map(str::parse)
            .collect::<Result<SmallVec<_>, _>>()
            .map(Self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.0
    }

    #[must_use]
    pub fn contains(&self, symbol: Symbol) -> bool {
        self.0.contains(&symbol)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, symbol) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("-")?;
            }
            f.write_str(symbol.code())?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Pattern {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.to_string()
    }
}

/// Authored paytable row: declared length, rendered pattern, base multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaytableEntry {
    pub length: usize,
    pub pattern: String,
    pub multiplier: f64,
}

impl PaytableEntry {
    #[must_use]
    pub fn new(length: usize, pattern: &str, multiplier: f64) -> Self {
        Self {
            length,
            pattern: pattern.to_string(),
            multiplier,
        }
    }
}

/// Longest-suffix hit found by the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: Pattern,
    pub length: usize,
    pub base_multiplier: f64,
}

/// Validated lookup from exact pattern to base multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PaytableEntry>", into = "Vec<PaytableEntry>")]
pub struct Paytable {
    entries: HashMap<Pattern, f64>,
    longest: usize,
}

impl Paytable {
    /// Validate authored rows into a lookup table.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for zero-length keys, declared lengths that
    /// disagree with the pattern, duplicate keys, or negative multipliers.
    pub fn from_entries<I>(rows: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = PaytableEntry>,
    {
        let mut entries = HashMap::new();
        let mut longest = 0;
        for row in rows {
            if row.length == 0 {
                return Err(ConfigError::ZeroLengthPattern);
            }
            let pattern = Pattern::parse(&row.pattern)?;
            if pattern.len() != row.length {
                return Err(ConfigError::PatternLength {
                    pattern: row.pattern,
                    declared: row.length,
                    actual: pattern.len(),
                });
            }
            if !row.multiplier.is_finite() || row.multiplier < 0.0 {
                return Err(ConfigError::NegativeMultiplier {
                    pattern: row.pattern,
                    value: row.multiplier,
                });
            }
            longest = longest.max(pattern.len());
            if entries.insert(pattern, row.multiplier).is_some() {
                return Err(ConfigError::DuplicatePattern {
                    pattern: row.pattern,
                });
            }
        }
        Ok(Self { entries, longest })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Length of the longest authored pattern.
    #[must_use]
    pub const fn longest_pattern(&self) -> usize {
        self.longest
    }

    #[must_use]
    pub fn multiplier(&self, symbols: &[Symbol]) -> Option<f64> {
        self.entries.get(&Pattern::from_symbols(symbols)).copied()
    }

    /// Find the longest suffix of `sequence` (at most `max_len`, at least two
    /// symbols) with an exact entry. Longer hits always win over shorter ones,
    /// whatever their multipliers.
    #[must_use]
    pub fn longest_suffix_match(&self, sequence: &[Symbol], max_len: usize) -> Option<PatternMatch> {
        let upper = max_len.min(sequence.len());
        if upper < MIN_MATCH_LENGTH {
            return None;
        }
        (MIN_MATCH_LENGTH..=upper).rev().find_map(|length| {
            let suffix = &sequence[sequence.len() - length..];
            let pattern = Pattern::from_symbols(suffix);
            self.entries
                .get(&pattern)
                .map(|&base_multiplier| PatternMatch {
                    pattern,
                    length,
                    base_multiplier,
                })
        })
    }

    /// Rows sorted by length then pattern, for stable output.
    #[must_use]
    pub fn rows(&self) -> Vec<PaytableEntry> {
        let mut rows: Vec<_> = self
            .entries
            .iter()
            .map(|(pattern, &multiplier)| PaytableEntry {
                length: pattern.len(),
                pattern: pattern.to_string(),
                multiplier,
            })
            .collect();
        rows.sort_by(|a, b| a.length.cmp(&b.length).then_with(|| a.pattern.cmp(&b.pattern)));
        rows
    }

    /// Uniformly rescale every multiplier, rounding to `decimals` places.
    #[must_use]
    pub fn scaled(&self, factor: f64, decimals: u32) -> Self {
        let precision = 10_f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX).min(15));
        let entries = self
            .entries
            .iter()
            .map(|(pattern, &multiplier)| {
                let scaled = (multiplier * factor * precision).round() / precision;
                (pattern.clone(), scaled.max(0.0))
            })
            .collect();
        Self {
            entries,
            longest: self.longest,
        }
    }

    /// Version tag covering the raw rows together with the variant's
    /// adjustment factor.
    #[must_use]
    pub fn fingerprint(&self, adjustment: f64) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        for row in self.rows() {
            hasher.write_u64(row.length as u64);
            hasher.write(row.pattern.as_bytes());
            hasher.write_u64(row.multiplier.to_bits());
        }
        hasher.write_u64(adjustment.to_bits());
        hasher.finish()
    }
}

impl TryFrom<Vec<PaytableEntry>> for Paytable {
    type Error = ConfigError;

    fn try_from(rows: Vec<PaytableEntry>) -> Result<Self, Self::Error> {
        Self::from_entries(rows)
    }
}

impl From<Paytable> for Vec<PaytableEntry> {
    fn from(table: Paytable) -> Self {
        table.rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Symbol::{Duck, Forward, Knockout, Punch, Uppercut};

    fn table(rows: &[(usize, &str, f64)]) -> Paytable {
        Paytable::from_entries(
            rows.iter()
                .map(|&(length, pattern, multiplier)| PaytableEntry::new(length, pattern, multiplier)),
        )
        .unwrap()
    }

    #[test]
    fn pattern_renders_and_parses() {
        let pattern = Pattern::parse("duk-DUK-upp").unwrap();
        assert_eq!(pattern.symbols(), &[Duck, Duck, Uppercut]);
        assert_eq!(pattern.to_string(), "DUK-DUK-UPP");
        assert!(Pattern::parse("").is_err());
        assert!(Pattern::parse("DUK--UPP").is_err());
    }

    #[test]
    fn longest_match_beats_richer_short_match() {
        let paytable = table(&[
            (4, "FWD-FWD-PUN-UPP", 0.9),
            (2, "PUN-UPP", 5.0),
        ]);
        let sequence = [Duck, Forward, Forward, Punch, Uppercut];
        let hit = paytable.longest_suffix_match(&sequence, 6).unwrap();
        assert_eq!(hit.length, 4);
        assert_eq!(hit.pattern.to_string(), "FWD-FWD-PUN-UPP");
        assert!((hit.base_multiplier - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn match_respects_configured_maximum() {
        let paytable = table(&[(4, "FWD-FWD-PUN-UPP", 0.9), (2, "PUN-UPP", 5.0)]);
        let sequence = [Forward, Forward, Punch, Uppercut];
        let hit = paytable.longest_suffix_match(&sequence, 3).unwrap();
        assert_eq!(hit.length, 2);
    }

    #[test]
    fn only_suffixes_are_considered() {
        let paytable = table(&[(2, "UPP-KO", 23.0)]);
        assert!(
            paytable
                .longest_suffix_match(&[Uppercut, Knockout, Punch], 6)
                .is_none()
        );
    }

    #[test]
    fn short_sequences_never_match() {
        let paytable = table(&[(1, "PUN", 1.0), (2, "PUN-PUN", 1.0)]);
        assert!(paytable.longest_suffix_match(&[], 6).is_none());
        assert!(paytable.longest_suffix_match(&[Punch], 6).is_none());
        assert!(paytable.longest_suffix_match(&[Punch, Punch], 6).is_some());
    }

    #[test]
    fn rejects_invalid_rows() {
        let mismatch = Paytable::from_entries([PaytableEntry::new(3, "PUN-UPP", 1.0)]);
        assert!(matches!(
            mismatch,
            Err(ConfigError::PatternLength {
                declared: 3,
                actual: 2,
                ..
            })
        ));
        assert!(matches!(
            Paytable::from_entries([PaytableEntry::new(0, "PUN", 1.0)]),
            Err(ConfigError::ZeroLengthPattern)
        ));
        assert!(matches!(
            Paytable::from_entries([
                PaytableEntry::new(2, "PUN-UPP", 1.0),
                PaytableEntry::new(2, "pun-upp", 2.0),
            ]),
            Err(ConfigError::DuplicatePattern { .. })
        ));
        assert!(matches!(
            Paytable::from_entries([PaytableEntry::new(2, "PUN-UPP", -1.0)]),
            Err(ConfigError::NegativeMultiplier { .. })
        ));
    }

    #[test]
    fn scaling_rounds_and_keeps_keys() {
        let paytable = table(&[(2, "PUN-PUN", 0.05), (2, "DUK-KO", 46.7274)]);
        let scaled = paytable.scaled(1.0603, 4);
        assert_eq!(scaled.len(), 2);
        assert!((scaled.multiplier(&[Punch, Punch]).unwrap() - 0.053).abs() < 1e-9);
        assert!((scaled.multiplier(&[Duck, Knockout]).unwrap() - 49.5451).abs() < 1e-9);
    }

    #[test]
    fn fingerprint_tracks_table_and_adjustment() {
        let paytable = table(&[(2, "PUN-PUN", 0.05)]);
        let same = table(&[(2, "PUN-PUN", 0.05)]);
        assert_eq!(paytable.fingerprint(1.0), same.fingerprint(1.0));
        assert_ne!(paytable.fingerprint(1.0), paytable.fingerprint(1.04));
        assert_ne!(paytable.fingerprint(1.0), paytable.scaled(2.0, 4).fingerprint(1.0));
    }

    #[test]
    fn serde_roundtrips_rows() {
        let paytable = table(&[(2, "PUN-PUN", 0.05), (3, "DUK-DUK-UPP", 0.65)]);
        let json = serde_json::to_string(&paytable).unwrap();
        let back: Paytable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, paytable);
        assert_eq!(back.longest_pattern(), 3);
    }
}
