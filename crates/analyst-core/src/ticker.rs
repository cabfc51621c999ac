//! Ticker symbols and their home markets

use serde::{Deserialize, Serialize};
use std::fmt;

/// Home market of a listed symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    /// US exchanges (no suffix)
    #[default]
    Us,
    /// National Stock Exchange of India
    Nse,
    /// Bombay Stock Exchange
    Bse,
    /// London Stock Exchange
    London,
    /// Toronto Stock Exchange
    Toronto,
    /// Hong Kong Stock Exchange
    HongKong,
    /// Tokyo Stock Exchange
    Tokyo,
    /// Australian Securities Exchange
    Australia,
    /// Deutsche Börse Xetra
    Xetra,
    /// Euronext Paris
    Paris,
}

impl Market {
    /// Every market with a known exchange suffix
    pub const ALL: [Market; 10] = [
        Market::Us,
        Market::Nse,
        Market::Bse,
        Market::London,
        Market::Toronto,
        Market::HongKong,
        Market::Tokyo,
        Market::Australia,
        Market::Xetra,
        Market::Paris,
    ];

    /// Exchange suffix appended to the base symbol (Yahoo convention)
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            Market::Us => None,
            Market::Nse => Some(".NS"),
            Market::Bse => Some(".BO"),
            Market::London => Some(".L"),
            Market::Toronto => Some(".TO"),
            Market::HongKong => Some(".HK"),
            Market::Tokyo => Some(".T"),
            Market::Australia => Some(".AX"),
            Market::Xetra => Some(".DE"),
            Market::Paris => Some(".PA"),
        }
    }

    /// Resolve a suffix such as `.NS` (case-insensitive)
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let upper = suffix.to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|m| m.suffix() == Some(upper.as_str()))
    }

    /// Currency prices are quoted in
    pub fn currency(self) -> &'static str {
        match self {
            Market::Us => "USD",
            Market::Nse | Market::Bse => "INR",
            Market::London => "GBP",
            Market::Toronto => "CAD",
            Market::HongKong => "HKD",
            Market::Tokyo => "JPY",
            Market::Australia => "AUD",
            Market::Xetra | Market::Paris => "EUR",
        }
    }

    /// Display label used in prompts and reports
    pub fn label(self) -> &'static str {
        match self {
            Market::Us => "US Market",
            Market::Nse => "Indian Market (NSE)",
            Market::Bse => "Indian Market (BSE)",
            Market::London => "UK Market (LSE)",
            Market::Toronto => "Canadian Market (TSX)",
            Market::HongKong => "Hong Kong Market (HKEX)",
            Market::Tokyo => "Japanese Market (TSE)",
            Market::Australia => "Australian Market (ASX)",
            Market::Xetra => "German Market (Xetra)",
            Market::Paris => "French Market (Euronext Paris)",
        }
    }
}

/// A normalized ticker: raw user input plus its canonical form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticker {
    raw: String,
    base: String,
    market: Market,
}

impl Ticker {
    /// Create a ticker from a raw input, its bare symbol, and its home market
    pub fn new(raw: impl Into<String>, base: impl Into<String>, market: Market) -> Self {
        Self {
            raw: raw.into(),
            base: base.into(),
            market,
        }
    }

    /// The symbol as the user typed it
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Symbol without exchange suffix (e.g. `RELIANCE`)
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn market(&self) -> Market {
        self.market
    }

    /// Symbol with the market's exchange suffix applied (e.g. `RELIANCE.NS`)
    pub fn canonical(&self) -> String {
        match self.market.suffix() {
            Some(suffix) => format!("{}{}", self.base, suffix),
            None => self.base.clone(),
        }
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
