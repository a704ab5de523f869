use anyhow::{Result, bail};
use std::collections::HashSet;

pub const DEFAULT_SEED: u64 = 1337;

/// Batch seed plus the token it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: u64,
    pub token: Option<String>,
}

impl SeedInfo {
    #[must_use]
    pub const fn from_numeric(seed: u64) -> Self {
        Self { seed, token: None }
    }

    #[must_use]
    pub fn from_token(seed: u64, token: &str) -> Self {
        Self {
            seed,
            token: Some(token.to_string()),
        }
    }
}

/// Resolve a list of CLI seed arguments into canonical batch seeds.
///
/// Supports decimal integers (negative values use their magnitude) and
/// `0x`-prefixed hexadecimal. Duplicates keep their first position; an empty
/// list resolves to the default seed.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let seed = parse_seed(token)?;
        if seen.insert(seed) {
            resolved.push(SeedInfo::from_token(seed, token));
        }
    }

    if resolved.is_empty() {
        resolved.push(SeedInfo::from_numeric(DEFAULT_SEED));
    }

    Ok(resolved)
}

fn parse_seed(token: &str) -> Result<u64> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        if let Ok(value) = u64::from_str_radix(hex, 16) {
            return Ok(value);
        }
        bail!("Unrecognized seed token: {token}");
    }

    if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    }

    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }

    bail!("Unrecognized seed token: {token}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_decimal_negative_and_hex() {
        let raw = vec!["42".to_string(), "-7".to_string(), "0xFF".to_string()];
        let seeds = resolve_seed_inputs(&raw).unwrap();
        let values: Vec<u64> = seeds.iter().map(|s| s.seed).collect();
        assert_eq!(values, vec![42, 7, 255]);
        assert_eq!(seeds[2].token.as_deref(), Some("0xFF"));
    }

    #[test]
    fn accepts_full_u64_range() {
        let seeds = resolve_seed_inputs(&[u64::MAX.to_string()]).unwrap();
        assert_eq!(seeds[0].seed, u64::MAX);
    }

    #[test]
    fn dedupes_and_defaults() {
        let seeds = resolve_seed_inputs(&["5".to_string(), "0x5".to_string()]).unwrap();
        assert_eq!(seeds.len(), 1);
        let seeds = resolve_seed_inputs(&[]).unwrap();
        assert_eq!(seeds, vec![SeedInfo::from_numeric(DEFAULT_SEED)]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(resolve_seed_inputs(&["CL-ORANGE42".to_string()]).is_err());
        assert!(resolve_seed_inputs(&["0xZZ".to_string()]).is_err());
    }
}
