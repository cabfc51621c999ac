//! Quality gate: maps a checker verdict and the iteration count to the next step

use analyst_core::{QualityVerdict, TerminalReason};
use serde::{Deserialize, Serialize};

/// Why the gate ended the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Passed,
    Exhausted,
}

impl From<StopReason> for TerminalReason {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::Passed => TerminalReason::QualityPassed,
            StopReason::Exhausted => TerminalReason::MaxIterationsReached,
        }
    }
}

/// Gate output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    /// No verdict yet; keep going along the first pass
    Continue,
    /// Run another revision cycle
    Revise,
    Stop(StopReason),
}

/// Decide after a checker pass
///
/// Iterations are zero based, so iteration `max_iterations - 1` is the last
/// one allowed.
pub fn decide(verdict: &QualityVerdict, iteration: u32, max_iterations: u32) -> GateDecision {
    if verdict.passed {
        GateDecision::Stop(StopReason::Passed)
    } else if iteration.saturating_add(1) < max_iterations {
        GateDecision::Revise
    } else {
        GateDecision::Stop(StopReason::Exhausted)
    }
}

/// [`decide`] for a state that may not have a verdict yet
pub fn decide_opt(
    verdict: Option<&QualityVerdict>,
    iteration: u32,
    max_iterations: u32,
) -> GateDecision {
    verdict.map_or(GateDecision::Continue, |v| {
        decide(v, iteration, max_iterations)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_core::QualityScore;

    fn verdict(passed: bool) -> QualityVerdict {
        QualityVerdict {
            score: QualityScore::new(if passed { 8.0 } else { 4.0 }),
            deficiencies: vec![],
            passed,
        }
    }

    #[test]
    fn test_boundary_table() {
        for max in 1..=5u32 {
            for iteration in 0..max + 2 {
                assert_eq!(
                    decide(&verdict(true), iteration, max),
                    GateDecision::Stop(StopReason::Passed),
                    "pass at iteration {iteration}, max {max}"
                );

                let expected = if iteration < max - 1 {
                    GateDecision::Revise
                } else {
                    GateDecision::Stop(StopReason::Exhausted)
                };
                assert_eq!(
                    decide(&verdict(false), iteration, max),
                    expected,
                    "fail at iteration {iteration}, max {max}"
                );
            }
        }
    }

    #[test]
    fn test_single_iteration_never_revises() {
        assert_eq!(
            decide(&verdict(false), 0, 1),
            GateDecision::Stop(StopReason::Exhausted)
        );
    }

    #[test]
    fn test_idempotent() {
        let v = verdict(false);
        assert_eq!(decide(&v, 1, 3), decide(&v, 1, 3));
    }

    #[test]
    fn test_no_verdict_continues() {
        assert_eq!(decide_opt(None, 0, 3), GateDecision::Continue);
        assert_eq!(
            decide_opt(Some(&verdict(true)), 0, 3),
            GateDecision::Stop(StopReason::Passed)
        );
    }

    #[test]
    fn test_terminal_reason_mapping() {
        assert_eq!(
            TerminalReason::from(StopReason::Passed),
            TerminalReason::QualityPassed
        );
        assert_eq!(
            TerminalReason::from(StopReason::Exhausted),
            TerminalReason::MaxIterationsReached
        );
    }
}
