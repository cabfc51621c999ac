//! Planner node: turns a ticker into an ordered research plan

use crate::config::AgentConfig;
use crate::llm::{prompt_fault, LlmClient};
use crate::prompts::{PLANNER_SYSTEM, PLANNER_USER};
use analyst_core::{
    AgentNode, AnalysisState, DataKind, NodeContext, NodeFault, ResearchTask, Stage, StateDelta,
};
use analyst_llm::Prompt;
use async_trait::async_trait;
use minijinja::context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Asks the model for a JSON task list
pub struct PlannerNode {
    llm: LlmClient,
    config: Arc<AgentConfig>,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    task_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    priority: Option<u32>,
}

impl PlannerNode {
    pub fn new(llm: LlmClient, config: Arc<AgentConfig>) -> Self {
        Self { llm, config }
    }
}

#[async_trait]
impl AgentNode for PlannerNode {
    fn stage(&self) -> Stage {
        Stage::Planner
    }

    #[instrument(skip_all, fields(ticker = %state.ticker()))]
    async fn transform(
        &self,
        state: &AnalysisState,
        ctx: &NodeContext,
    ) -> Result<StateDelta, NodeFault> {
        let ticker = state.ticker();
        let system = PLANNER_SYSTEM
            .render(())
            .map_err(|e| prompt_fault(Stage::Planner, e))?;
        let user = PLANNER_USER
            .render(context! {
                company => ticker.canonical(),
                market => ticker.market().label(),
            })
            .map_err(|e| prompt_fault(Stage::Planner, e))?;
        let prompt = Prompt::new(system, user)
            .with_max_tokens(self.config.planner_max_tokens)
            .with_temperature(self.config.temperature);

        let text = self.llm.ask(Stage::Planner, &prompt, ctx).await?;
        let tasks = parse_plan(&text).map_err(|e| NodeFault::malformed(Stage::Planner, e))?;

        info!(tasks = tasks.len(), "Research plan created");
        Ok(StateDelta::Plan(tasks))
    }
}

/// Map a planner task type onto the data it needs
pub fn task_kind(task_type: &str) -> Option<DataKind> {
    match task_type.trim().to_ascii_lowercase().as_str() {
        "stock_data" | "price_history" => Some(DataKind::PriceHistory),
        "fundamentals" | "industry_analysis" => Some(DataKind::Fundamentals),
        "earnings" => Some(DataKind::Earnings),
        "sec_filing" | "filings" => Some(DataKind::Filings),
        "news" => Some(DataKind::News),
        _ => None,
    }
}

/// Parse the JSON array between the first `[` and the last `]`
///
/// Unknown task types are dropped, duplicate kinds keep the most urgent
/// priority, and the result is ordered by priority.
pub fn parse_plan(text: &str) -> Result<Vec<ResearchTask>, String> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err("no JSON array in planner output".to_string());
    };
    if end < start {
        return Err("no JSON array in planner output".to_string());
    }

    let raw: Vec<RawTask> = serde_json::from_str(&text[start..=end])
        .map_err(|e| format!("invalid planner JSON: {e}"))?;

    let mut by_kind: BTreeMap<DataKind, ResearchTask> = BTreeMap::new();
    for (index, task) in raw.into_iter().enumerate() {
        let Some(kind) = task_kind(&task.task_type) else {
            debug!(task_type = %task.task_type, "Skipping unknown task type");
            continue;
        };
        let fallback = u32::try_from(index + 1).unwrap_or(u32::MAX);
        let priority = u8::try_from(task.priority.unwrap_or(fallback)).unwrap_or(u8::MAX);

        let keep = by_kind.get(&kind).is_none_or(|existing| priority < existing.priority);
        if keep {
            by_kind.insert(kind, ResearchTask::new(kind, task.description, priority));
        }
    }

    let mut tasks: Vec<ResearchTask> = by_kind.into_values().collect();
    tasks.sort_by_key(|t| (t.priority, t.kind));
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context as node_ctx, scripted, state};
    use analyst_core::FaultKind;

    #[test]
    fn test_parse_plan_with_prose_around_json() {
        let text = r#"Here is the plan:
```json
[
  {"task_type": "news", "description": "Recent headlines", "priority": 3},
  {"task_type": "stock_data", "description": "Price trend", "priority": 1},
  {"task_type": "industry_analysis", "description": "Peers", "priority": 2},
  {"task_type": "macro", "description": "Rates", "priority": 1},
  {"task_type": "price_history", "description": "Longer trend", "priority": 4}
]
```"#;
        let tasks = parse_plan(text).unwrap();
        let kinds: Vec<_> = tasks.iter().map(|t| t.kind).collect();

        assert_eq!(
            kinds,
            vec![DataKind::PriceHistory, DataKind::Fundamentals, DataKind::News]
        );
        assert_eq!(tasks[0].description, "Price trend");
        assert_eq!(tasks[0].priority, 1);
    }

    #[test]
    fn test_duplicate_keeps_most_urgent() {
        let text = r#"[{"task_type": "earnings", "description": "late", "priority": 5},
                       {"task_type": "EARNINGS", "description": "early", "priority": 2}]"#;
        let tasks = parse_plan(text).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "early");
    }

    #[test]
    fn test_missing_priority_uses_position() {
        let text = r#"[{"task_type": "sec_filing"}, {"task_type": "news"}]"#;
        let tasks = parse_plan(text).unwrap();
        assert_eq!(tasks[0].kind, DataKind::Filings);
        assert_eq!(tasks[0].priority, 1);
        assert_eq!(tasks[1].priority, 2);
    }

    #[test]
    fn test_unparseable_output() {
        assert!(parse_plan("I cannot help with that").is_err());
        assert!(parse_plan("] backwards [").is_err());
        assert!(parse_plan("[not json]").is_err());
        assert_eq!(parse_plan("[]").unwrap(), vec![]);
    }

    #[tokio::test]
    async fn test_transform_emits_plan() {
        let provider = scripted(vec![r#"[{"task_type": "stock_data", "description": "Prices", "priority": 1}]"#]);
        let node = PlannerNode::new(
            LlmClient::new(Arc::new(provider), "m"),
            Arc::new(AgentConfig::default()),
        );

        let delta = node.transform(&state("ABC"), &node_ctx()).await.unwrap();
        assert_eq!(
            delta,
            StateDelta::Plan(vec![ResearchTask::new(DataKind::PriceHistory, "Prices", 1)])
        );
    }

    #[tokio::test]
    async fn test_transform_malformed() {
        let node = PlannerNode::new(
            LlmClient::new(Arc::new(scripted(vec!["no plan today"])), "m"),
            Arc::new(AgentConfig::default()),
        );
        let fault = node.transform(&state("ABC"), &node_ctx()).await.unwrap_err();
        assert_eq!(fault.kind, FaultKind::MalformedResponse);
        assert!(fault.is_retryable());
    }
}
