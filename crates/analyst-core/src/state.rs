//! The analysis state threaded through every node of a run

use crate::error::{FetchError, Result, StateError};
use crate::model::{
    Analysis, FetchRecord, Payload, QualityVerdict, Report, ResearchTask, SourceKey,
    TerminalReason,
};
use crate::node::StateDelta;
use crate::ticker::Ticker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Shared record of one research run
///
/// Owned by the workflow controller. Nodes only ever see `&AnalysisState`;
/// all mutation goes through [`AnalysisState::apply`] and the controller
/// helpers, which enforce these invariants:
///
/// - `iteration` only increases, except that an unfinished revision is
///   rolled back when the run ends before its checker pass
/// - `raw_data` entries are never overwritten unless forced
/// - `report` and `quality` only exist after a writer / checker pass
/// - `terminal_reason` is set exactly once, when the run ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisState {
    run_id: Uuid,
    ticker: Ticker,
    plan: Option<Vec<ResearchTask>>,
    raw_data: BTreeMap<SourceKey, FetchRecord>,
    analysis: Option<Analysis>,
    report: Option<Report>,
    quality: Option<QualityVerdict>,
    /// Analysis and report the current verdict was given for
    checked: Option<(Option<Analysis>, Report)>,
    iteration: u32,
    checker_passes: u32,
    stalled_revisions: u32,
    terminal_reason: Option<TerminalReason>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl AnalysisState {
    /// Create a fresh state for a ticker
    pub fn new(ticker: Ticker) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            ticker,
            plan: None,
            raw_data: BTreeMap::new(),
            analysis: None,
            report: None,
            quality: None,
            checked: None,
            iteration: 0,
            checker_passes: 0,
            stalled_revisions: 0,
            terminal_reason: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn plan(&self) -> Option<&[ResearchTask]> {
        self.plan.as_deref()
    }

    pub fn raw_data(&self) -> &BTreeMap<SourceKey, FetchRecord> {
        &self.raw_data
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn quality(&self) -> Option<&QualityVerdict> {
        self.quality.as_ref()
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn checker_passes(&self) -> u32 {
        self.checker_passes
    }

    /// Revision passes whose verdict did not narrow the deficiency list
    pub fn stalled_revisions(&self) -> u32 {
        self.stalled_revisions
    }

    pub fn terminal_reason(&self) -> Option<TerminalReason> {
        self.terminal_reason
    }

    pub fn is_finished(&self) -> bool {
        self.terminal_reason.is_some()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Apply a node's delta
    pub fn apply(&mut self, delta: StateDelta) -> Result<()> {
        if self.is_finished() {
            return Err(StateError::Finished(delta.stage()));
        }

        match delta {
            StateDelta::Plan(tasks) => {
                if self.plan.is_some() {
                    return Err(StateError::PlanAlreadySet);
                }
                if tasks.is_empty() {
                    debug!(ticker = %self.ticker, "Rejecting empty plan");
                    return Err(StateError::EmptyPlan);
                }
                self.plan = Some(tasks);
            }
            StateDelta::RawData(entries) => {
                for (key, outcome) in entries {
                    self.record_fetch(key, outcome, false);
                }
            }
            StateDelta::Analysis(analysis) => self.analysis = Some(analysis),
            StateDelta::Report(report) => self.report = Some(report),
            StateDelta::Verdict(verdict) => {
                if let Some(previous) = &self.quality
                    && !verdict.passed
                    && verdict.deficiencies.len() >= previous.deficiencies.len()
                {
                    self.stalled_revisions += 1;
                }
                if let Some(report) = &self.report {
                    self.checked = Some((self.analysis.clone(), report.clone()));
                }
                self.quality = Some(verdict);
                self.checker_passes += 1;
            }
        }
        Ok(())
    }

    /// Record one fetch result
    ///
    /// Returns `false` if the key already held an entry and `force` was not
    /// set; the existing entry is kept in that case.
    pub fn record_fetch(
        &mut self,
        key: SourceKey,
        outcome: std::result::Result<Payload, FetchError>,
        force: bool,
    ) -> bool {
        if !force && self.raw_data.contains_key(&key) {
            debug!(%key, "Keeping existing fetch record");
            return false;
        }
        self.raw_data.insert(
            key,
            FetchRecord {
                outcome,
                iteration: self.iteration,
                recorded_at: Utc::now(),
            },
        );
        true
    }

    /// Start the next revision cycle, returning the new iteration
    pub fn advance_iteration(&mut self) -> Result<u32> {
        if self.is_finished() {
            return Err(StateError::AlreadyFinished);
        }
        self.iteration += 1;
        Ok(self.iteration)
    }

    /// Whether a revision cycle has started but its checker pass has not
    /// completed
    pub fn revision_pending(&self) -> bool {
        self.iteration > 0 && self.iteration >= self.checker_passes
    }

    /// Undo a revision cycle that will not reach its checker pass
    ///
    /// Restores the analysis and report the current verdict judged, so the
    /// run ends on a checked draft with `iteration == checker_passes - 1`.
    /// Returns `false` if no revision was pending.
    pub fn rollback_revision(&mut self) -> Result<bool> {
        if self.is_finished() {
            return Err(StateError::AlreadyFinished);
        }
        if !self.revision_pending() {
            return Ok(false);
        }
        if let Some((analysis, report)) = self.checked.clone() {
            self.analysis = analysis;
            self.report = Some(report);
        }
        self.iteration = self.checker_passes.saturating_sub(1);
        debug!(iteration = self.iteration, "Rolled back unfinished revision");
        Ok(true)
    }

    /// Mark the run as ended
    pub fn finish(&mut self, reason: TerminalReason) -> Result<()> {
        if self.terminal_reason.is_some() {
            return Err(StateError::AlreadyFinished);
        }
        self.terminal_reason = Some(reason);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Successful payloads in key order
    pub fn payloads(&self) -> impl Iterator<Item = (&SourceKey, &Payload)> {
        self.raw_data
            .iter()
            .filter_map(|(key, record)| record.outcome.as_ref().ok().map(|p| (key, p)))
    }

    pub fn succeeded_sources(&self) -> Vec<&SourceKey> {
        self.payloads().map(|(key, _)| key).collect()
    }

    pub fn failed_sources(&self) -> Vec<(&SourceKey, &FetchError)> {
        self.raw_data
            .iter()
            .filter_map(|(key, record)| record.outcome.as_ref().err().map(|e| (key, e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DataKind, Deficiency, DeficiencyCategory, QualityScore, Recommendation,
    };
    use crate::ticker::Market;
    use crate::FaultKind;

    fn state() -> AnalysisState {
        AnalysisState::new(Ticker::new("abc", "ABC", Market::Us))
    }

    fn payload(kind: DataKind, provider: &str, summary: &str) -> Payload {
        Payload::new(provider, kind, serde_json::json!({}), summary)
    }

    fn verdict(score: f32, deficiencies: usize) -> QualityVerdict {
        let deficiencies = (0..deficiencies)
            .map(|i| Deficiency::new("Valuation", DeficiencyCategory::Analysis, format!("gap {i}")))
            .collect();
        QualityVerdict::evaluate(QualityScore::new(score), deficiencies, 7.0)
    }

    fn report() -> Report {
        Report {
            ticker: "ABC".to_string(),
            recommendation: Recommendation::Hold,
            rationale: "balanced".to_string(),
            summary: "summary".to_string(),
            sections: vec![],
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_set_once() {
        let mut state = state();
        let tasks = vec![ResearchTask::new(DataKind::News, "news", 1)];
        state.apply(StateDelta::Plan(tasks.clone())).unwrap();
        assert_eq!(state.plan().map(<[_]>::len), Some(1));

        assert_eq!(
            state.apply(StateDelta::Plan(tasks)),
            Err(StateError::PlanAlreadySet)
        );
    }

    #[test]
    fn test_empty_plan_rejected() {
        let mut state = state();
        assert_eq!(
            state.apply(StateDelta::Plan(vec![])),
            Err(StateError::EmptyPlan)
        );
        assert!(state.plan().is_none());
    }

    #[test]
    fn test_raw_data_append_only() {
        let mut state = state();
        let key = SourceKey::new(DataKind::News, "finnhub");

        state
            .apply(StateDelta::RawData(vec![(
                key.clone(),
                Ok(payload(DataKind::News, "finnhub", "first")),
            )]))
            .unwrap();
        state.advance_iteration().unwrap();
        state
            .apply(StateDelta::RawData(vec![(
                key.clone(),
                Err(FetchError::RateLimited),
            )]))
            .unwrap();

        let record = &state.raw_data()[&key];
        assert_eq!(record.iteration, 0);
        assert_eq!(record.outcome.as_ref().unwrap().summary, "first");
    }

    #[test]
    fn test_forced_refetch_overwrites() {
        let mut state = state();
        let key = SourceKey::new(DataKind::News, "finnhub");
        assert!(state.record_fetch(key.clone(), Err(FetchError::RateLimited), false));
        assert!(!state.record_fetch(
            key.clone(),
            Ok(payload(DataKind::News, "finnhub", "second")),
            false
        ));
        assert!(state.record_fetch(
            key.clone(),
            Ok(payload(DataKind::News, "finnhub", "second")),
            true
        ));
        assert!(state.raw_data()[&key].is_success());
    }

    #[test]
    fn test_verdict_counts_checker_passes() {
        let mut state = state();
        assert!(state.quality().is_none());
        assert!(state.report().is_none());

        state.apply(StateDelta::Report(report())).unwrap();
        state.apply(StateDelta::Verdict(verdict(5.0, 2))).unwrap();
        assert_eq!(state.checker_passes(), 1);
        assert_eq!(state.iteration(), 0);

        state.advance_iteration().unwrap();
        state.apply(StateDelta::Verdict(verdict(6.0, 1))).unwrap();
        assert_eq!(state.checker_passes(), 2);
        assert_eq!(state.iteration(), state.checker_passes() - 1);
        assert_eq!(state.stalled_revisions(), 0);
    }

    #[test]
    fn test_stalled_revision_detected() {
        let mut state = state();
        state.apply(StateDelta::Verdict(verdict(5.0, 2))).unwrap();
        state.advance_iteration().unwrap();
        state.apply(StateDelta::Verdict(verdict(5.0, 2))).unwrap();
        assert_eq!(state.stalled_revisions(), 1);
    }

    #[test]
    fn test_unfinished_revision_rolled_back() {
        let mut state = state();
        state.apply(StateDelta::Report(report())).unwrap();
        state.apply(StateDelta::Verdict(verdict(5.0, 1))).unwrap();
        assert!(!state.revision_pending());
        assert_eq!(state.rollback_revision(), Ok(false));

        state.advance_iteration().unwrap();
        let mut rewrite = report();
        rewrite.rationale = "unchecked rewrite".to_string();
        state.apply(StateDelta::Report(rewrite)).unwrap();
        assert!(state.revision_pending());

        assert_eq!(state.rollback_revision(), Ok(true));
        assert_eq!(state.iteration(), 0);
        assert_eq!(state.iteration(), state.checker_passes() - 1);
        assert_eq!(state.report().map(|r| r.rationale.as_str()), Some("balanced"));
        assert!(!state.revision_pending());
    }

    #[test]
    fn test_finish_exactly_once() {
        let mut state = state();
        assert!(!state.is_finished());
        state.finish(TerminalReason::QualityPassed).unwrap();
        assert!(state.is_finished());
        assert!(state.finished_at().is_some());

        assert_eq!(
            state.finish(TerminalReason::FatalError(FaultKind::Timeout)),
            Err(StateError::AlreadyFinished)
        );
        assert_eq!(state.terminal_reason(), Some(TerminalReason::QualityPassed));
        assert_eq!(
            state.apply(StateDelta::Report(report())),
            Err(StateError::Finished(crate::Stage::Writer))
        );
        assert_eq!(state.advance_iteration(), Err(StateError::AlreadyFinished));
    }

    #[test]
    fn test_source_partitions() {
        let mut state = state();
        state
            .apply(StateDelta::RawData(vec![
                (
                    SourceKey::new(DataKind::PriceHistory, "yahoo"),
                    Ok(payload(DataKind::PriceHistory, "yahoo", "prices")),
                ),
                (
                    SourceKey::new(DataKind::Fundamentals, "alpha_vantage"),
                    Err(FetchError::RateLimited),
                ),
                (
                    SourceKey::new(DataKind::News, "finnhub"),
                    Err(FetchError::provider("502")),
                ),
            ]))
            .unwrap();

        assert_eq!(state.succeeded_sources().len(), 1);
        assert_eq!(state.failed_sources().len(), 2);
        assert_eq!(state.raw_data().len(), 3);
    }
}
