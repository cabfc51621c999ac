//! Error types for analyst-core
//!
//! Three layers of failure flow through a research run:
//!
//! - [`FetchError`]: a single data provider failed. Recorded in the state's
//!   raw data and never propagated past the fetcher.
//! - [`NodeFault`]: an agent node produced no usable output. Handed to the
//!   workflow controller, which owns retry and escalation.
//! - [`StateError`]: a delta would break an [`AnalysisState`](crate::AnalysisState)
//!   invariant.

use crate::node::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure of one provider call, stored alongside successful payloads
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FetchError {
    /// The provider answered with an error
    #[error("provider error: {message}")]
    Provider { message: String },

    /// The call did not settle within its time budget
    #[error("timed out after {after:?}")]
    Timeout { after: Duration },

    /// The provider refused the call because of its quota
    #[error("rate limit exceeded")]
    RateLimited,

    /// The provider has no data for the symbol
    #[error("no data for symbol {symbol}")]
    NotFound { symbol: String },

    /// No registered provider serves the requested data kind
    #[error("no provider supports this data kind")]
    Unsupported,

    /// The run was cancelled before the call started
    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    /// Shorthand for a provider-side failure
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    /// Whether this failure came from the run budget rather than the provider
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled)
    }
}

/// Classification of a node fault
///
/// The controller retries retryable kinds exactly once; everything else ends
/// the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The LLM answered with something the node could not parse
    MalformedResponse,
    /// The LLM backend call itself failed
    Backend,
    /// Every data source failed
    NoData,
    /// The planner produced no tasks
    EmptyPlan,
    /// The node observed the run's cancellation signal
    Cancelled,
    /// The node overran the run deadline
    Timeout,
    /// A node broke its contract (wrong delta, invariant violation)
    Internal,
}

impl FaultKind {
    /// Whether the controller may retry the node once
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::MalformedResponse | Self::Backend | Self::NoData)
    }

    /// Whether the fault was caused by the run budget running out
    pub fn is_interruption(self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout)
    }

    /// Stable snake_case name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedResponse => "malformed_response",
            Self::Backend => "backend",
            Self::NoData => "no_data",
            Self::EmptyPlan => "empty_plan",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node that could not produce a delta
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} fault ({kind}): {message}")]
pub struct NodeFault {
    /// Stage that raised the fault
    pub stage: Stage,
    /// Fault classification
    pub kind: FaultKind,
    /// Human readable detail
    pub message: String,
}

impl NodeFault {
    /// Create a new fault
    pub fn new(stage: Stage, kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, FaultKind::MalformedResponse, message)
    }

    pub fn backend(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, FaultKind::Backend, message)
    }

    pub fn no_data(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, FaultKind::NoData, message)
    }

    pub fn cancelled(stage: Stage) -> Self {
        Self::new(stage, FaultKind::Cancelled, "run cancelled")
    }

    pub fn internal(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, FaultKind::Internal, message)
    }

    /// Whether the controller may retry the node once
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Invariant violations on [`AnalysisState`](crate::AnalysisState)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The plan is immutable once set
    #[error("research plan already set")]
    PlanAlreadySet,

    /// A plan must contain at least one task
    #[error("research plan is empty")]
    EmptyPlan,

    /// The terminal reason is set exactly once
    #[error("run already finished")]
    AlreadyFinished,

    /// The state no longer accepts deltas
    #[error("cannot apply {0} delta to a finished run")]
    Finished(Stage),
}

impl StateError {
    /// Map to the fault kind the controller reports
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            Self::EmptyPlan => FaultKind::EmptyPlan,
            _ => FaultKind::Internal,
        }
    }
}

/// Result type alias for state operations
pub type Result<T> = std::result::Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_classification() {
        assert!(FaultKind::MalformedResponse.is_retryable());
        assert!(FaultKind::Backend.is_retryable());
        assert!(FaultKind::NoData.is_retryable());
        assert!(!FaultKind::EmptyPlan.is_retryable());
        assert!(!FaultKind::Cancelled.is_retryable());
        assert!(!FaultKind::Timeout.is_retryable());
        assert!(!FaultKind::Internal.is_retryable());

        assert!(FaultKind::Timeout.is_interruption());
        assert!(!FaultKind::Backend.is_interruption());
    }

    #[test]
    fn test_error_display() {
        let fault = NodeFault::malformed(Stage::Writer, "no recommendation");
        assert_eq!(
            fault.to_string(),
            "writer fault (malformed_response): no recommendation"
        );

        let err = FetchError::NotFound {
            symbol: "ABC".to_string(),
        };
        assert_eq!(err.to_string(), "no data for symbol ABC");
    }

    #[test]
    fn test_state_error_mapping() {
        assert_eq!(StateError::EmptyPlan.fault_kind(), FaultKind::EmptyPlan);
        assert_eq!(StateError::PlanAlreadySet.fault_kind(), FaultKind::Internal);
    }

    #[test]
    fn test_fetch_error_serde() {
        let err = FetchError::Timeout {
            after: Duration::from_secs(3),
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: FetchError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
        assert!(back.is_interruption());
    }
}
