//! Daily price series shared by the price providers

use serde::{Deserialize, Serialize};

/// Bars kept in the payload body; older bars only feed the statistics
const RECENT_BARS: usize = 30;

/// One daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading date, `YYYY-MM-DD`
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Summary statistics over a price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub latest_close: f64,
    pub latest_date: String,
    pub period_change_pct: f64,
    pub period_high: f64,
    pub period_low: f64,
    pub average_volume: u64,
    pub sessions: usize,
}

impl PriceStats {
    /// Compute statistics over bars in ascending date order
    pub fn from_bars(bars: &[PriceBar]) -> Option<Self> {
        let first = bars.first()?;
        let last = bars.last()?;

        let period_change_pct = if first.close.abs() > f64::EPSILON {
            (last.close - first.close) / first.close * 100.0
        } else {
            0.0
        };
        let period_high = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let period_low = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let average_volume = bars.iter().map(|b| b.volume).sum::<u64>() / bars.len() as u64;

        Some(Self {
            latest_close: last.close,
            latest_date: last.date.clone(),
            period_change_pct,
            period_high,
            period_low,
            average_volume,
            sessions: bars.len(),
        })
    }

    /// One-line digest for prompts
    pub fn summary(&self, symbol: &str, currency: &str) -> String {
        format!(
            "{symbol}: close {:.2} {currency} on {}, {:+.1}% over {} sessions, range {:.2}-{:.2}, avg volume {}",
            self.latest_close,
            self.latest_date,
            self.period_change_pct,
            self.sessions,
            self.period_low,
            self.period_high,
            self.average_volume
        )
    }
}

/// Payload body for a price series: statistics plus the most recent bars
pub fn price_body(symbol: &str, currency: &str, bars: &[PriceBar], stats: &PriceStats) -> serde_json::Value {
    let recent = &bars[bars.len().saturating_sub(RECENT_BARS)..];
    serde_json::json!({
        "symbol": symbol,
        "currency": currency,
        "stats": stats,
        "recent": recent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64, volume: u64) -> PriceBar {
        PriceBar {
            date: date.to_string(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
        }
    }

    #[test]
    fn test_stats() {
        let bars = vec![
            bar("2025-01-02", 100.0, 1_000),
            bar("2025-01-03", 90.0, 2_000),
            bar("2025-01-06", 110.0, 3_000),
        ];
        let stats = PriceStats::from_bars(&bars).unwrap();

        assert_eq!(stats.latest_close, 110.0);
        assert_eq!(stats.latest_date, "2025-01-06");
        assert!((stats.period_change_pct - 10.0).abs() < 1e-9);
        assert_eq!(stats.period_high, 111.0);
        assert_eq!(stats.period_low, 89.0);
        assert_eq!(stats.average_volume, 2_000);
        assert_eq!(
            stats.summary("ABC", "USD"),
            "ABC: close 110.00 USD on 2025-01-06, +10.0% over 3 sessions, range 89.00-111.00, avg volume 2000"
        );
    }

    #[test]
    fn test_empty_series() {
        assert!(PriceStats::from_bars(&[]).is_none());
    }

    #[test]
    fn test_body_keeps_recent_bars() {
        let bars: Vec<_> = (0..40).map(|i| bar(&format!("d{i:02}"), 10.0, 1)).collect();
        let stats = PriceStats::from_bars(&bars).unwrap();
        let body = price_body("ABC", "USD", &bars, &stats);

        let recent = body["recent"].as_array().unwrap();
        assert_eq!(recent.len(), 30);
        assert_eq!(recent[0]["date"], "d10");
    }
}
