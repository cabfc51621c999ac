//! Rendering of reports and failures for the terminal

use analyst_agents::{Provenance, ResearchReport, SetupStatus};
use analyst_core::FaultKind;
use analyst_data::{DataCoverage, GatewayResult};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

/// Table of every source the run touched
pub fn provenance_table(provenance: &Provenance) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Source", "Status", "Detail"]);

    for key in &provenance.succeeded {
        table.add_row(vec![key.to_string(), "ok".to_string(), String::new()]);
    }
    for (key, reason) in &provenance.failed {
        table.add_row(vec![key.to_string(), "failed".to_string(), reason.clone()]);
    }
    table
}

/// Markdown report followed by the source table
pub fn render_text(report: &ResearchReport) -> String {
    format!(
        "{}\nSources:\n{}\n",
        report.to_markdown(),
        provenance_table(&report.provenance)
    )
}

pub fn render_json(report: &ResearchReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// JSON body printed when a run fails in JSON mode
pub fn failure_json(kind: FaultKind, message: &str, provenance: &Provenance) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "kind": kind,
            "message": message,
        },
        "provenance": provenance,
    })
}

/// Provider setup as a table plus a readiness line
pub fn render_status(status: &SetupStatus) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Provider", "Data", "Credential", "Status", "Rate limit"]);

    for provider in &status.providers {
        let kinds: Vec<String> = provider.kinds.iter().map(ToString::to_string).collect();
        table.add_row(vec![
            provider.name.to_string(),
            kinds.join(", "),
            provider.credential.unwrap_or("none").to_string(),
            if provider.enabled { "enabled" } else { "missing key" }.to_string(),
            provider.rate_limit.clone(),
        ]);
    }

    let llm = if status.llm_key { "key set" } else { "key missing" };
    let mut out = format!("Model: {} ({llm})\n{table}\n", status.model);
    if status.is_configured() {
        out.push_str("Ready: all required credentials are set\n");
    } else {
        out.push_str(&format!(
            "Not ready: set {}\n",
            status.missing_credentials().join(", ")
        ));
    }
    out
}

/// Per-source outcome of a live provider check
pub fn fetch_table(result: &GatewayResult) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Source", "Status", "Detail"]);

    for (key, outcome) in result.entries() {
        let (status, detail) = match outcome {
            Ok(payload) => ("ok", payload.summary.chars().take(80).collect()),
            Err(error) => ("failed", error.to_string()),
        };
        table.add_row(vec![key.to_string(), status.to_string(), detail]);
    }
    table
}

/// JSON body for `status`, with the sample fetch outcome when one ran
pub fn status_json(status: &SetupStatus, sample: Option<(&GatewayResult, &DataCoverage)>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "configured": status.is_configured(),
        "missing_credentials": status.missing_credentials(),
        "setup": status,
    });
    if let Some((result, coverage)) = sample {
        let sources: Vec<_> = result
            .entries()
            .iter()
            .map(|(key, outcome)| {
                serde_json::json!({
                    "source": key.to_string(),
                    "ok": outcome.is_ok(),
                    "error": outcome.as_ref().err().map(ToString::to_string),
                })
            })
            .collect();
        body["fetch"] = serde_json::json!({
            "sources": sources,
            "coverage": coverage,
        });
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_agents::AgentConfig;
    use analyst_core::{DataKind, FetchError, Payload, Recommendation, SourceKey, TerminalReason};
    use analyst_data::{Gateway, GatewayConfig, ProviderKeys};
    use chrono::Utc;
    use tokio_util::sync::CancellationToken;

    fn provenance() -> Provenance {
        Provenance {
            succeeded: vec![SourceKey::new(DataKind::PriceHistory, "yahoo")],
            failed: vec![(
                SourceKey::new(DataKind::News, "finnhub"),
                "rate limit exceeded".to_string(),
            )],
        }
    }

    fn report() -> ResearchReport {
        ResearchReport {
            ticker: "ABC".to_string(),
            recommendation: Recommendation::Hold,
            rationale: "Fair value.".to_string(),
            summary: "Steady.".to_string(),
            sections: vec![],
            generated_at: Utc::now(),
            quality_score: None,
            deficiencies: vec![],
            iterations: 1,
            terminal_reason: TerminalReason::TimedOut,
            provenance: provenance(),
        }
    }

    #[test]
    fn test_provenance_table() {
        let rendered = provenance_table(&provenance()).to_string();
        assert!(rendered.contains("price_history/yahoo"));
        assert!(rendered.contains("rate limit exceeded"));
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&report());
        assert!(text.contains("**Recommendation:** HOLD"));
        assert!(text.contains("Outcome: timed-out"));
        assert!(text.contains("news/finnhub"));
    }

    #[test]
    fn test_failure_json() {
        let value = failure_json(FaultKind::NoData, "all 2 data sources failed", &provenance());
        assert_eq!(value["error"]["kind"], "no_data");
        assert_eq!(value["provenance"]["failed"][0][1], "rate limit exceeded");
    }

    fn setup(llm_key: bool) -> SetupStatus {
        SetupStatus::new(
            &AgentConfig::default(),
            llm_key,
            &GatewayConfig::default(),
            &ProviderKeys::default(),
        )
    }

    #[test]
    fn test_render_status() {
        let text = render_status(&setup(false));
        assert!(text.contains("key missing"));
        assert!(text.contains("alpha_vantage"));
        assert!(text.contains("missing key"));
        assert!(text.contains("Not ready: set ANTHROPIC_API_KEY, ALPHA_VANTAGE_API_KEY, FINNHUB_API_KEY"));
    }

    #[tokio::test]
    async fn test_status_json_with_fetch() {
        // No providers: every kind comes back unsupported
        let gateway = Gateway::builder().build().unwrap();
        let ticker = gateway.normalize("ABC").unwrap();
        let result = gateway
            .fetch_all(&ticker, &[DataKind::News], &CancellationToken::new())
            .await;
        let coverage = DataCoverage::assess(std::iter::empty::<&Payload>());

        let value = status_json(&setup(true), Some((&result, &coverage)));
        assert_eq!(value["configured"], false);
        assert_eq!(value["missing_credentials"][0], "ALPHA_VANTAGE_API_KEY");
        assert_eq!(value["fetch"]["sources"][0]["source"], "news/gateway");
        assert_eq!(
            value["fetch"]["sources"][0]["error"],
            FetchError::Unsupported.to_string()
        );
        assert_eq!(value["fetch"]["coverage"]["status"], "poor");

        let table = fetch_table(&result).to_string();
        assert!(table.contains("news/gateway"));
    }
}
