use crate::model::{ApplicationRecord, ApplicationStatus};
use tracing::info;

pub trait StatusSink {
    fn report(&mut self, message: &str);
}

impl<F: FnMut(&str)> StatusSink for F {
    fn report(&mut self, message: &str) {
        self(message)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn report(&mut self, message: &str) {
        info!(target: "status", "{message}");
    }
}

/// Notified synchronously, exactly once, when a job reaches its terminal state.
pub trait OutcomeListener {
    fn on_outcome(&mut self, record: &ApplicationRecord);
}

impl<F: FnMut(&ApplicationRecord)> OutcomeListener for F {
    fn on_outcome(&mut self, record: &ApplicationRecord) {
        self(record)
    }
}

#[derive(Debug, Default)]
pub struct ProgressTally<S> {
    sink: S,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl<S: StatusSink> ProgressTally<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            applied: 0,
            skipped: 0,
            failed: 0,
        }
    }

    pub fn line(&self) -> String {
        format!(
            "Applied ({}) | Skipped ({}) | Failed ({})",
            self.applied, self.skipped, self.failed
        )
    }
}

impl<S: StatusSink> OutcomeListener for ProgressTally<S> {
    fn on_outcome(&mut self, record: &ApplicationRecord) {
        let verb = match record.status {
            ApplicationStatus::Applied => {
                self.applied += 1;
                "Processed"
            }
            ApplicationStatus::Skipped => {
                self.skipped += 1;
                "Skipped"
            }
            ApplicationStatus::Failed => {
                self.failed += 1;
                "Failed"
            }
        };
        let msg = format!(
            "{} | {}: {} at {}",
            self.line(),
            verb,
            record.job.title,
            record.job.company
        );
        self.sink.report(&msg);
    }
}
