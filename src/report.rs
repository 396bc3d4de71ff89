use tracing::{debug, error, info};

use crate::{models::UpsertOutcome, processor::TaskOutcome};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ImportReport {
    pub total: usize,
    pub skipped: usize,
    pub created: usize,
    pub marked: usize,
    pub failed: usize,
    /// `(key, reason)` for every failed task.
    pub failures: Vec<(String, String)>,
}

impl ImportReport {
    pub fn from_outcomes(skipped: usize, outcomes: Vec<TaskOutcome>) -> Self {
        let mut report = Self { total: outcomes.len(), skipped, ..Default::default() };

        for outcome in outcomes {
            match outcome.result {
                Ok(UpsertOutcome::Created) => report.created += 1,
                Ok(UpsertOutcome::Marked) => report.marked += 1,
                Err(err) => {
                    report.failed += 1;
                    report.failures.push((outcome.key.to_string(), err.to_string()));
                },
            }
        }

        report
    }

    pub fn succeeded(&self) -> usize {
        self.created + self.marked
    }

    /// Process status for a finished import. Failed tasks only count against
    /// it when `fail_on_errors` is set.
    pub fn exit_status(&self, fail_on_errors: bool) -> u8 {
        if fail_on_errors && self.failed > 0 { 1 } else { 0 }
    }

    pub fn log_summary(&self) {
        info!(
            created = self.created,
            marked = self.marked,
            skipped = self.skipped,
            "{} tasks completed successfully out of {}",
            self.succeeded(),
            self.total
        );
        if self.failed > 0 {
            error!("{} tasks failed to complete successfully", self.failed);
            for (key, reason) in &self.failures {
                debug!(key = %key, "failed: {reason}");
            }
        }
    }
}
