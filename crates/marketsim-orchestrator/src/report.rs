//! ---
//! msim_section: "06-orchestration"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Aggregated per-step outcome counters for one run."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use std::fmt;

use indexmap::IndexMap;

use crate::pipeline::{PipelineRun, StepKind};

/// Outcome counters for a single step kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StepTally {
    /// Completed executions.
    pub executed: u64,
    /// Executions dropped because an earlier step failed.
    pub skipped: u64,
    /// Failed executions.
    pub failed: u64,
}

/// Everything a finished run reports back to the caller.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    /// Users whose registration pass succeeded (or already existed).
    pub registered: u32,
    /// Users lost to a registration failure.
    pub registration_failures: u32,
    /// Order repetitions attempted across the population.
    pub repetitions: u64,
    tallies: IndexMap<&'static str, StepTally>,
}

impl RunReport {
    /// Record one registration outcome.
    pub fn record_registration(&mut self, succeeded: bool) {
        if succeeded {
            self.registered += 1;
        } else {
            self.registration_failures += 1;
        }
    }

    /// Fold one pipeline execution into the counters.
    pub fn record_pipeline(&mut self, run: &PipelineRun) {
        self.repetitions += 1;
        for step in &run.executed {
            self.tally(*step).executed += 1;
        }
        if let Some((step, _)) = &run.failure {
            self.tally(*step).failed += 1;
        }
        for step in &run.skipped {
            self.tally(*step).skipped += 1;
        }
    }

    /// Record a standalone step outcome (the upvote pass).
    pub fn record_step(&mut self, step: StepKind, succeeded: bool) {
        let tally = self.tally(step);
        if succeeded {
            tally.executed += 1;
        } else {
            tally.failed += 1;
        }
    }

    /// Counters for one step kind, if it ever ran.
    pub fn step(&self, step: StepKind) -> StepTally {
        self.tallies.get(step.as_str()).copied().unwrap_or_default()
    }

    /// Total failed executions across all steps.
    pub fn failures(&self) -> u64 {
        self.tallies.values().map(|tally| tally.failed).sum()
    }

    fn tally(&mut self, step: StepKind) -> &mut StepTally {
        self.tallies.entry(step.as_str()).or_default()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "registered {} user(s), {} registration failure(s), {} repetition(s)",
            self.registered, self.registration_failures, self.repetitions
        )?;
        for (name, tally) in &self.tallies {
            writeln!(
                f,
                "  {name}: {} executed, {} skipped, {} failed",
                tally.executed, tally.skipped, tally.failed
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketsim_steps::StepError;

    #[test]
    fn pipeline_outcomes_fold_into_tallies() {
        let mut report = RunReport::default();
        let run = PipelineRun {
            executed: vec![StepKind::FindItems, StepKind::AddToCart],
            failure: Some((StepKind::Checkout, StepError::EmptyCart)),
            skipped: vec![StepKind::MakeOrderUrls, StepKind::MakeComment, StepKind::MakeSell],
        };
        report.record_pipeline(&run);

        assert_eq!(report.repetitions, 1);
        assert_eq!(report.step(StepKind::FindItems).executed, 1);
        assert_eq!(report.step(StepKind::Checkout).failed, 1);
        assert_eq!(report.step(StepKind::MakeSell).skipped, 1);
        assert_eq!(report.failures(), 1);
    }

    #[test]
    fn display_lists_every_step_seen() {
        let mut report = RunReport::default();
        report.record_registration(true);
        report.record_step(StepKind::ClickUpvote, true);
        let rendered = report.to_string();
        assert!(rendered.contains("registered 1 user(s)"));
        assert!(rendered.contains("click_upvote: 1 executed"));
    }
}
