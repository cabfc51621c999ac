//! Research agents for analyst-rs
//!
//! This crate provides the five nodes of a research run and the
//! [`EquityResearcher`] entry point that wires them into a
//! [`WorkflowController`](analyst_workflow::WorkflowController):
//!
//! - [`PlannerNode`]: asks the model for a prioritized research plan
//! - [`FetcherNode`]: gathers raw data through the data gateway
//! - [`AnalystNode`]: turns raw data into structured findings
//! - [`WriterNode`]: drafts the report with a recommendation
//! - [`CheckerNode`]: scores the draft and lists its deficiencies
//!
//! # Example
//!
//! ```rust,ignore
//! use analyst_agents::{AgentConfig, EquityResearcher, ResearchOptions};
//! use analyst_data::GatewayConfig;
//!
//! let researcher = EquityResearcher::from_env(AgentConfig::from_env(), GatewayConfig::default())?;
//! let report = researcher.research("AAPL", ResearchOptions::default()).await?;
//! println!("{}", report.to_markdown());
//! ```

pub mod analyst;
pub mod checker;
pub mod completeness;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod llm;
pub mod parse;
pub mod planner;
pub mod prompts;
pub mod report;
pub mod researcher;
pub mod status;
pub mod writer;

#[cfg(test)]
mod testing;

pub use analyst::AnalystNode;
pub use checker::CheckerNode;
pub use completeness::{Completeness, RequiredSection};
pub use config::{AgentConfig, AgentConfigBuilder};
pub use error::{PromptError, ResearchError, Result};
pub use fetcher::FetcherNode;
pub use llm::LlmClient;
pub use planner::PlannerNode;
pub use report::{Provenance, ResearchReport, DISCLAIMER};
pub use researcher::{EquityResearcher, ResearchOptions};
pub use status::SetupStatus;
pub use writer::WriterNode;
