//! Coverage scoring for fetched market data
//!
//! Scores a set of payloads on a 0-100 scale by the fields a research
//! report depends on:
//!
//! | Check                                        | Points |
//! |----------------------------------------------|--------|
//! | symbol, market cap, current price (each)     | 20     |
//! | P/E, PEG, dividend yield, sector, industry   | 8 each |
//! | non-empty price history                      | 20     |
//!
//! The total is capped at 100.

use analyst_core::{DataKind, Payload};
use serde::{Deserialize, Serialize};
use std::fmt;

const ESSENTIAL_POINTS: u32 = 20;
const OPTIONAL_POINTS: u32 = 8;
const HISTORY_POINTS: u32 = 20;

/// Overview fields that add detail but are not required
const OPTIONAL_FIELDS: [(&str, &str); 5] = [
    ("PERatio", "P/E ratio"),
    ("PEGRatio", "PEG ratio"),
    ("DividendYield", "dividend yield"),
    ("Sector", "sector"),
    ("Industry", "industry"),
];

/// Coarse rating of a coverage score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Good,
    Fair,
    Poor,
}

impl CoverageStatus {
    fn from_score(score: u32) -> Self {
        match score {
            80.. => CoverageStatus::Good,
            60.. => CoverageStatus::Fair,
            _ => CoverageStatus::Poor,
        }
    }
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CoverageStatus::Good => "good",
            CoverageStatus::Fair => "fair",
            CoverageStatus::Poor => "poor",
        })
    }
}

/// How well the fetched data covers what a report needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCoverage {
    /// 0-100
    pub score: u32,
    pub issues: Vec<String>,
    pub status: CoverageStatus,
}

impl DataCoverage {
    /// Score a set of successful payloads
    pub fn assess<'a>(payloads: impl IntoIterator<Item = &'a Payload>) -> Self {
        let mut overview = None;
        let mut latest_close = None;
        let mut sessions = 0;

        for payload in payloads {
            match payload.kind {
                DataKind::Fundamentals if overview.is_none() => {
                    overview = payload.body.as_object();
                }
                DataKind::PriceHistory => {
                    let stats = &payload.body["stats"];
                    sessions = sessions.max(stats["sessions"].as_u64().unwrap_or(0));
                    latest_close = latest_close.or_else(|| stats["latest_close"].as_f64());
                }
                _ => {}
            }
        }

        let mut score = 0;
        let mut issues = Vec::new();
        let present = |field: &str| overview.is_some_and(|o| o.get(field).is_some_and(has_value));

        match overview {
            Some(_) => {
                for (field, label) in [("Symbol", "symbol"), ("MarketCapitalization", "market cap")] {
                    if present(field) {
                        score += ESSENTIAL_POINTS;
                    } else {
                        issues.push(format!("Missing {label}"));
                    }
                }
                score += OPTIONAL_FIELDS
                    .iter()
                    .filter(|(field, _)| present(field))
                    .count() as u32
                    * OPTIONAL_POINTS;
            }
            None => issues.push("Missing company overview".to_string()),
        }

        if latest_close.is_some() {
            score += ESSENTIAL_POINTS;
        } else {
            issues.push("Missing current price".to_string());
        }

        if sessions > 0 {
            score += HISTORY_POINTS;
        } else {
            issues.push("Missing price history".to_string());
        }

        let score = score.min(100);
        Self {
            score,
            issues,
            status: CoverageStatus::from_score(score),
        }
    }
}

impl fmt::Display for DataCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/100)", self.status, self.score)?;
        if !self.issues.is_empty() {
            write!(f, ": {}", self.issues.join(", "))?;
        }
        Ok(())
    }
}

/// Alpha Vantage reports absent values as "None" or "-"
fn has_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && s != "None" && s != "-"
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn overview(body: serde_json::Value) -> Payload {
        Payload::new("alpha_vantage", DataKind::Fundamentals, body, "overview")
    }

    fn prices(sessions: u64) -> Payload {
        Payload::new(
            "yahoo",
            DataKind::PriceHistory,
            json!({"symbol": "ABC", "stats": {"latest_close": 101.5, "sessions": sessions}}),
            "prices",
        )
    }

    #[test]
    fn test_full_coverage_is_capped() {
        let payloads = [
            overview(json!({
                "Symbol": "ABC",
                "MarketCapitalization": "1000000",
                "PERatio": "18.2",
                "PEGRatio": "1.4",
                "DividendYield": "0.012",
                "Sector": "TECHNOLOGY",
                "Industry": "SOFTWARE",
            })),
            prices(250),
        ];
        let coverage = DataCoverage::assess(&payloads);

        assert_eq!(coverage.score, 100);
        assert_eq!(coverage.status, CoverageStatus::Good);
        assert!(coverage.issues.is_empty());
    }

    #[test]
    fn test_placeholder_values_count_as_missing() {
        let payloads = [
            overview(json!({
                "Symbol": "ABC",
                "MarketCapitalization": "None",
                "PERatio": "-",
                "Sector": "TECHNOLOGY",
            })),
            prices(30),
        ];
        let coverage = DataCoverage::assess(&payloads);

        // symbol + price + history + sector
        assert_eq!(coverage.score, 68);
        assert_eq!(coverage.status, CoverageStatus::Fair);
        assert_eq!(coverage.issues, vec!["Missing market cap".to_string()]);
    }

    #[test]
    fn test_price_only() {
        let coverage = DataCoverage::assess(&[prices(30)]);

        assert_eq!(coverage.score, 40);
        assert_eq!(coverage.status, CoverageStatus::Poor);
        assert_eq!(coverage.issues, vec!["Missing company overview".to_string()]);
        assert_eq!(
            coverage.to_string(),
            "poor (40/100): Missing company overview"
        );
    }

    #[test]
    fn test_nothing_fetched() {
        let coverage = DataCoverage::assess(std::iter::empty());

        assert_eq!(coverage.score, 0);
        assert_eq!(coverage.issues.len(), 3);
        assert_eq!(coverage.status, CoverageStatus::Poor);
    }
}
