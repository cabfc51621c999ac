//! Shared fixtures for the node tests

use analyst_core::{
    AnalysisState, DataKind, FetchError, Market, NodeContext, Payload, Recommendation, Report,
    ReportSection, Ticker,
};
use analyst_data::DataProvider;
use analyst_llm::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, Result, StopReason, TokenUsage,
};
use async_trait::async_trait;
use chrono::Utc;
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

mock! {
    pub Provider {}

    #[async_trait]
    impl LLMProvider for Provider {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
        fn name(&self) -> &str;
    }
}

pub fn response(text: &str) -> CompletionResponse {
    CompletionResponse {
        message: Message::assistant(text),
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage::default(),
    }
}

/// Provider answering with `replies` in order, repeating the last one
pub fn scripted(replies: Vec<&str>) -> MockProvider {
    let replies: Vec<String> = replies.into_iter().map(str::to_string).collect();
    let next = AtomicUsize::new(0);

    let mut provider = MockProvider::new();
    provider.expect_name().return_const("mock".to_string());
    provider.expect_complete().returning(move |_| {
        let index = next.fetch_add(1, Ordering::SeqCst);
        let text = replies
            .get(index)
            .or_else(|| replies.last())
            .cloned()
            .unwrap_or_default();
        Ok(response(&text))
    });
    provider
}

/// Provider choosing its reply from the request
pub fn routed<F>(route: F) -> MockProvider
where
    F: Fn(&CompletionRequest) -> String + Send + 'static,
{
    let mut provider = MockProvider::new();
    provider.expect_name().return_const("mock".to_string());
    provider
        .expect_complete()
        .returning(move |request| Ok(response(&route(&request))));
    provider
}

/// User text of a single-turn request
pub fn user_text(request: &CompletionRequest) -> String {
    request
        .messages
        .first()
        .and_then(Message::text)
        .unwrap_or_default()
}

pub fn context() -> NodeContext {
    NodeContext::new(
        7.0,
        CancellationToken::new(),
        Instant::now() + Duration::from_secs(300),
        0,
    )
}

pub fn state(symbol: &str) -> AnalysisState {
    AnalysisState::new(Ticker::new(symbol, symbol, Market::Us))
}

pub fn payload(kind: DataKind, provider: &str, summary: &str) -> Payload {
    Payload::new(provider, kind, serde_json::json!({}), summary)
}

pub fn section(title: &str, body: &str) -> ReportSection {
    ReportSection {
        title: title.to_string(),
        body: body.to_string(),
    }
}

/// A complete report that trips none of the checker's rules
pub fn full_report() -> Report {
    let filler = "Revenue grew steadily while margins held. ".repeat(8);
    Report {
        ticker: "ABC".to_string(),
        recommendation: Recommendation::Buy,
        rationale: "Earnings momentum at a reasonable multiple.".to_string(),
        summary: "ABC compounds earnings faster than peers.".to_string(),
        sections: vec![
            section("Executive Summary", &filler),
            section("Financial Health", "Net cash balance sheet."),
            section("Growth Prospects", "Double-digit subscription growth."),
            section("Valuation", "Trades at 18x forward earnings."),
            section("Risk Factors", "Customer concentration."),
            section("Data Limitations", "News coverage was unavailable."),
        ],
        generated_at: Utc::now(),
    }
}

/// Data provider returning a fixed outcome for its kinds
pub struct StaticProvider {
    name: &'static str,
    kinds: Vec<DataKind>,
    fail_with: Option<FetchError>,
    pub calls: Arc<AtomicUsize>,
}

impl StaticProvider {
    pub fn ok(name: &'static str, kinds: &[DataKind]) -> Self {
        Self {
            name,
            kinds: kinds.to_vec(),
            fail_with: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: &'static str, kinds: &[DataKind], error: FetchError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::ok(name, kinds)
        }
    }
}

#[async_trait]
impl DataProvider for StaticProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn supports(&self, kind: DataKind) -> bool {
        self.kinds.contains(&kind)
    }

    async fn fetch(&self, ticker: &Ticker, kind: DataKind) -> std::result::Result<Payload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(payload(kind, self.name, &format!("{kind} for {}", ticker.canonical()))),
        }
    }
}
