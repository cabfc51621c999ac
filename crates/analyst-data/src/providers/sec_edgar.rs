//! SEC EDGAR filings and reported earnings provider
//!
//! Rate limit: 10 requests per second (SEC fair access policy).
//! User-Agent requirement: must include a name and contact email.

use super::{per_second, SharedRateLimiter};
use crate::config::GatewayConfig;
use crate::error::Result;
use crate::provider::{request_error, status_error, truncate, DataProvider};
use analyst_core::{DataKind, FetchError, Market, Payload, Ticker};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

const SEC_BASE_URL: &str = "https://data.sec.gov";
const SEC_ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data";
const SEC_COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Forms worth surfacing to the analyst
const IMPORTANT_FORMS: [&str; 4] = ["10-K", "10-Q", "8-K", "DEF 14A"];

/// Filing summaries are cut to this many characters
const SUMMARY_LIMIT: usize = 500;

/// SEC EDGAR client (US listings only, no API key)
pub struct SecEdgarProvider {
    client: Client,
    filings_window: usize,
    rate_limiter: SharedRateLimiter,
    /// Ticker to CIK, loaded once per provider
    ciks: OnceCell<HashMap<String, CompanyId>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CompanyId {
    cik: u64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    cik_str: serde_json::Value,
    ticker: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct Submissions {
    name: String,
    filings: FilingsData,
}

#[derive(Debug, Deserialize)]
struct FilingsData {
    recent: RecentFilings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RecentFilings {
    accession_number: Vec<String>,
    filing_date: Vec<String>,
    report_date: Vec<String>,
    form: Vec<String>,
    primary_document: Vec<String>,
}

/// One relevant filing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filing {
    pub form: String,
    pub filing_date: String,
    pub report_date: Option<String>,
    pub accession_number: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct CompanyFacts {
    #[serde(rename = "entityName")]
    entity_name: String,
    facts: Facts,
}

#[derive(Debug, Deserialize)]
struct Facts {
    #[serde(rename = "us-gaap", default)]
    us_gaap: HashMap<String, Concept>,
}

#[derive(Debug, Deserialize)]
struct Concept {
    units: HashMap<String, Vec<Fact>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Fact {
    start: Option<String>,
    end: String,
    val: f64,
    form: String,
    filed: String,
}

/// A reported value for one fiscal period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactPoint {
    pub period_end: String,
    pub value: f64,
    pub form: String,
    pub filed: String,
}

/// Period granularity of a duration fact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Quarter,
    Year,
}

impl SecEdgarProvider {
    pub fn new(user_agent: &str, config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(config.provider_timeout)
            .build()?;
        Ok(Self {
            client,
            filings_window: config.filings_window,
            rate_limiter: per_second(config.sec_rate_limit),
            ciks: OnceCell::new(),
        })
    }

    async fn get_json(&self, url: &str, symbol: &str) -> std::result::Result<serde_json::Value, FetchError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| request_error(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, symbol));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::provider(format!("Failed to parse SEC response: {e}")))
    }

    async fn company(&self, symbol: &str) -> std::result::Result<CompanyId, FetchError> {
        let ciks = self
            .ciks
            .get_or_try_init(|| async {
                let data = self.get_json(SEC_COMPANY_TICKERS_URL, symbol).await?;
                parse_company_tickers(data)
            })
            .await?;

        ciks.get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                symbol: symbol.to_string(),
            })
    }

    async fn filings(&self, symbol: &str) -> std::result::Result<Payload, FetchError> {
        let company = self.company(symbol).await?;
        let url = format!("{SEC_BASE_URL}/submissions/CIK{:0>10}.json", company.cik);
        let data = self.get_json(&url, symbol).await?;
        let submissions: Submissions = serde_json::from_value(data)
            .map_err(|e| FetchError::provider(format!("Unexpected submissions shape: {e}")))?;

        let filings = recent_filings(&submissions.filings.recent, company.cik, self.filings_window);
        debug!(count = filings.len(), "Found relevant SEC filings");

        let name = if submissions.name.is_empty() {
            company.title
        } else {
            submissions.name
        };

        let listing = filings
            .iter()
            .map(|f| format!("{} filed {}", f.form, f.filing_date))
            .collect::<Vec<_>>()
            .join(", ");
        let summary = if filings.is_empty() {
            format!("{} (CIK {:0>10}): no 10-K/10-Q/8-K/DEF 14A among recent filings", name, company.cik)
        } else {
            format!("{} (CIK {:0>10}): {listing}", name, company.cik)
        };

        Ok(Payload::new(
            self.name(),
            DataKind::Filings,
            serde_json::json!({
                "company": name,
                "cik": format!("{:0>10}", company.cik),
                "filings": filings,
            }),
            truncate(&summary, SUMMARY_LIMIT),
        ))
    }

    async fn earnings(&self, symbol: &str) -> std::result::Result<Payload, FetchError> {
        let company = self.company(symbol).await?;
        let url = format!("{SEC_BASE_URL}/api/xbrl/companyfacts/CIK{:0>10}.json", company.cik);
        let data = self.get_json(&url, symbol).await?;
        let facts: CompanyFacts = serde_json::from_value(data)
            .map_err(|e| FetchError::provider(format!("Unexpected company facts shape: {e}")))?;

        let eps = concept_series(&facts, &["EarningsPerShareDiluted"], "USD/shares", Period::Quarter, 8);
        let net_income = concept_series(&facts, &["NetIncomeLoss"], "USD", Period::Quarter, 8);
        let revenue = concept_series(
            &facts,
            &["Revenues", "RevenueFromContractWithCustomerExcludingAssessedTax", "SalesRevenueNet"],
            "USD",
            Period::Quarter,
            8,
        );
        let annual_income = concept_series(&facts, &["NetIncomeLoss"], "USD", Period::Year, 4);

        if eps.is_empty() && net_income.is_empty() && revenue.is_empty() {
            return Err(FetchError::NotFound {
                symbol: symbol.to_string(),
            });
        }

        let summary = earnings_summary(&facts.entity_name, &eps, &net_income, &revenue);
        Ok(Payload::new(
            self.name(),
            DataKind::Earnings,
            serde_json::json!({
                "company": facts.entity_name,
                "quarterly_eps_diluted": eps,
                "quarterly_net_income": net_income,
                "quarterly_revenue": revenue,
                "annual_net_income": annual_income,
            }),
            truncate(&summary, SUMMARY_LIMIT),
        ))
    }
}

#[async_trait]
impl DataProvider for SecEdgarProvider {
    fn name(&self) -> &str {
        "sec_edgar"
    }

    fn supports(&self, kind: DataKind) -> bool {
        matches!(kind, DataKind::Filings | DataKind::Earnings)
    }

    fn supports_market(&self, market: Market) -> bool {
        market == Market::Us
    }

    #[instrument(skip(self), fields(symbol = %ticker))]
    async fn fetch(&self, ticker: &Ticker, kind: DataKind) -> std::result::Result<Payload, FetchError> {
        // EDGAR lists share classes with a dash (BRK-B)
        let symbol = ticker.base().replace('.', "-");
        match kind {
            DataKind::Filings => self.filings(&symbol).await,
            DataKind::Earnings => self.earnings(&symbol).await,
            _ => Err(FetchError::Unsupported),
        }
    }
}

fn parse_company_tickers(
    data: serde_json::Value,
) -> std::result::Result<HashMap<String, CompanyId>, FetchError> {
    let entries: HashMap<String, TickerEntry> = serde_json::from_value(data)
        .map_err(|e| FetchError::provider(format!("Unexpected company tickers shape: {e}")))?;

    Ok(entries
        .into_values()
        .filter_map(|entry| {
            // cik_str is a number in practice, despite its name
            let cik = match &entry.cik_str {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.parse().ok(),
                _ => None,
            }?;
            Some((
                entry.ticker.to_uppercase(),
                CompanyId {
                    cik,
                    title: entry.title,
                },
            ))
        })
        .collect())
}

fn recent_filings(recent: &RecentFilings, cik: u64, window: usize) -> Vec<Filing> {
    recent
        .form
        .iter()
        .enumerate()
        .take(window)
        .filter(|(_, form)| IMPORTANT_FORMS.contains(&form.as_str()))
        .filter_map(|(i, form)| {
            let accession = recent.accession_number.get(i)?;
            let document = recent.primary_document.get(i).map_or("", String::as_str);
            Some(Filing {
                form: form.clone(),
                filing_date: recent.filing_date.get(i).cloned().unwrap_or_default(),
                report_date: recent.report_date.get(i).filter(|d| !d.is_empty()).cloned(),
                accession_number: accession.clone(),
                url: format!(
                    "{SEC_ARCHIVES_URL}/{cik}/{}/{document}",
                    accession.replace('-', "")
                ),
            })
        })
        .collect()
}

fn period_of(fact: &Fact) -> Option<Period> {
    let start = NaiveDate::parse_from_str(fact.start.as_deref()?, "%Y-%m-%d").ok()?;
    let end = NaiveDate::parse_from_str(&fact.end, "%Y-%m-%d").ok()?;
    match (end - start).num_days() {
        80..=100 => Some(Period::Quarter),
        350..=380 => Some(Period::Year),
        _ => None,
    }
}

/// Most recent `limit` values of the first concept that has data, oldest first
fn concept_series(
    facts: &CompanyFacts,
    concepts: &[&str],
    unit: &str,
    period: Period,
    limit: usize,
) -> Vec<FactPoint> {
    for concept in concepts {
        let Some(values) = facts
            .facts
            .us_gaap
            .get(*concept)
            .and_then(|c| c.units.get(unit))
        else {
            continue;
        };

        // Restated periods appear once per filing; keep the latest filing
        let mut by_end: HashMap<&str, &Fact> = HashMap::new();
        for fact in values
            .iter()
            .filter(|f| matches!(f.form.as_str(), "10-Q" | "10-K"))
            .filter(|f| period_of(f) == Some(period))
        {
            let slot = by_end.entry(fact.end.as_str()).or_insert(fact);
            if fact.filed > slot.filed {
                *slot = fact;
            }
        }

        let mut points: Vec<FactPoint> = by_end
            .into_values()
            .map(|f| FactPoint {
                period_end: f.end.clone(),
                value: f.val,
                form: f.form.clone(),
                filed: f.filed.clone(),
            })
            .collect();
        if points.is_empty() {
            continue;
        }
        points.sort_by(|a, b| a.period_end.cmp(&b.period_end));
        let skip = points.len().saturating_sub(limit);
        return points.split_off(skip);
    }
    Vec::new()
}

/// Human scale for large dollar amounts (1.2B, 340.5M)
fn compact(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else {
        format!("{value:.2}")
    }
}

fn earnings_summary(
    company: &str,
    eps: &[FactPoint],
    net_income: &[FactPoint],
    revenue: &[FactPoint],
) -> String {
    let mut parts = vec![company.to_string()];
    if !eps.is_empty() {
        let recent = eps
            .iter()
            .rev()
            .take(4)
            .map(|p| format!("{:.2} ({})", p.value, p.period_end))
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("quarterly diluted EPS {recent}"));
    }
    if let Some(latest) = net_income.last() {
        parts.push(format!(
            "latest quarterly net income {} USD ({})",
            compact(latest.value),
            latest.period_end
        ));
    }
    if let Some(latest) = revenue.last() {
        parts.push(format!(
            "latest quarterly revenue {} USD ({})",
            compact(latest.value),
            latest.period_end
        ));
    }
    parts.join("; ")
}
