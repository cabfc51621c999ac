//! Ticker normalization
//!
//! User input arrives in many shapes: `aapl`, `TICKER: AAPL`, `NSE:RELIANCE`,
//! `RELIANCE.NSE`, `RELIANCE.NS`. [`normalize`] reduces all of them to a
//! [`Ticker`] whose canonical form carries the Yahoo-style exchange suffix of
//! its home market.

use crate::error::SymbolError;
use analyst_core::{Market, Ticker};

const MAX_SYMBOL_LEN: usize = 20;

const LABEL_PREFIXES: [&str; 3] = ["STOCK:", "TICKER:", "SYMBOL:"];

/// Exchange prefixes (`NSE:X`) and long-form suffixes (`X.NSE`)
const EXCHANGE_ALIASES: [(&str, Market); 2] = [("NSE", Market::Nse), ("BSE", Market::Bse)];

/// Normalize raw input into a ticker
///
/// Symbols without a recognised exchange marker are assigned `default_market`.
pub fn normalize(input: &str, default_market: Market) -> Result<Ticker, SymbolError> {
    let mut symbol = input.trim().to_uppercase();

    for prefix in LABEL_PREFIXES {
        if let Some(rest) = symbol.strip_prefix(prefix) {
            symbol = rest.trim().to_string();
        }
    }

    let (base, market) = split_market(&symbol).unwrap_or((symbol.as_str(), default_market));
    validate(base)?;

    Ok(Ticker::new(input.trim(), base, market))
}

fn split_market(symbol: &str) -> Option<(&str, Market)> {
    for (alias, market) in EXCHANGE_ALIASES {
        if let Some(rest) = symbol
            .strip_prefix(alias)
            .and_then(|rest| rest.strip_prefix(':'))
        {
            let rest = rest.trim();
            // NSE:RELIANCE.NS carries the marker twice
            let rest = market
                .suffix()
                .and_then(|suffix| rest.strip_suffix(suffix))
                .unwrap_or(rest);
            return Some((rest, market));
        }
        if let Some(base) = symbol
            .strip_suffix(alias)
            .and_then(|rest| rest.strip_suffix('.'))
        {
            return Some((base, market));
        }
    }

    let dot = symbol.rfind('.')?;
    let market = Market::from_suffix(&symbol[dot..])?;
    Some((&symbol[..dot], market))
}

fn validate(base: &str) -> Result<(), SymbolError> {
    if base.is_empty() {
        return Err(SymbolError::Empty);
    }
    if base.len() > MAX_SYMBOL_LEN {
        return Err(SymbolError::TooLong(base.to_string()));
    }
    if let Some(ch) = base
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '&')))
    {
        return Err(SymbolError::InvalidCharacter {
            symbol: base.to_string(),
            ch,
        });
    }
    if !base.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(SymbolError::InvalidCharacter {
            symbol: base.to_string(),
            ch: base.chars().next().unwrap_or('.'),
        });
    }
    Ok(())
}
