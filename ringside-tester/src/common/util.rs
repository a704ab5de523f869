use anyhow::{Context, Result};
use chrono::Utc;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// RFC 3339 timestamp stamped into reports.
pub fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse a comma-separated list of histogram edges.
pub fn parse_bucket_edges(s: &str) -> Result<Vec<f64>> {
    split_csv(s)
        .iter()
        .map(|edge| {
            edge.parse::<f64>()
                .with_context(|| format!("invalid bucket edge {edge:?}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn timestamp_is_utc() {
        let stamp = timestamp();
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.len(), 20);
    }

    #[test]
    fn bucket_edges_parse_and_reject_garbage() {
        assert_eq!(parse_bucket_edges("1, 5,20").unwrap(), vec![1.0, 5.0, 20.0]);
        assert!(parse_bucket_edges("1,big").is_err());
    }
}
