use crate::{
    auth::LoginOutcome,
    model::{ApplicationRecord, ApplicationStatus},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::info;

pub const CSV_HEADER: [&str; 7] = [
    "AppliedDate",
    "Status",
    "JobTitle",
    "Company",
    "PostedDate",
    "Skills",
    "Reason",
];

const APPLIED_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");
const POSTED_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[weekday repr:short] [month repr:short] [day] [year]");

/// Append-only sequence of outcomes owned by one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationLog {
    records: Vec<ApplicationRecord>,
}

impl ApplicationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, record: ApplicationRecord) {
        if record.status == ApplicationStatus::Applied {
            info!(
                status = %record.status,
                applied_at = %format_applied(record.applied_at),
                job = %record.job.title,
                company = %record.job.company,
                posted = %format_posted(record.job.posted_date),
                skills = %record.job.skills.join(", "),
                form_filled = record.form_filled.unwrap_or(false),
                "application logged"
            );
        }
        self.records.push(record);
    }

    pub fn records(&self) -> &[ApplicationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn counts(&self) -> OutcomeCounts {
        let mut c = OutcomeCounts::default();
        for r in &self.records {
            match r.status {
                ApplicationStatus::Applied => c.applied += 1,
                ApplicationStatus::Skipped => c.skipped += 1,
                ApplicationStatus::Failed => c.failed += 1,
            }
        }
        c
    }

    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        write_csv(&self.records, out)
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).context("csv output was not UTF-8")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub fn write_csv<W: Write>(records: &[ApplicationRecord], out: W) -> Result<()> {
    let mut w = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);
    w.write_record(CSV_HEADER)?;
    for r in records {
        w.write_record([
            format_applied(r.applied_at),
            r.status.label().to_string(),
            r.job.title.clone(),
            r.job.company.clone(),
            format_posted(r.job.posted_date),
            r.job.skills.join(";"),
            r.reason.clone().unwrap_or_default(),
        ])?;
    }
    w.flush().context("flushing csv")?;
    Ok(())
}

/// UTC, millisecond precision: `2026-10-16T09:30:00.123Z`.
pub fn format_applied(at: OffsetDateTime) -> String {
    at.to_offset(time::UtcOffset::UTC)
        .format(APPLIED_DATE)
        .unwrap_or_else(|_| "1970-01-01T00:00:00.000Z".to_string())
}

/// `Fri Oct 16 2026`.
pub fn format_posted(at: OffsetDateTime) -> String {
    at.format(POSTED_DATE).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    LoginFailed,
    NoJobsFound,
    Errored(String),
}

/// Everything a run produced; serialized as `report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub started: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<LoginOutcome>,
    pub jobs_discovered: usize,
    pub counts: OutcomeCounts,
    pub records: ApplicationLog,
}

impl RunReport {
    pub fn summary(&self) -> String {
        match &self.status {
            RunStatus::Completed => format!(
                "Automation completed! Applied: {}, Skipped: {}, Failed: {}",
                self.counts.applied, self.counts.skipped, self.counts.failed
            ),
            RunStatus::LoginFailed => {
                "Login failed: browser closed or timeout reached. Please try again.".to_string()
            }
            RunStatus::NoJobsFound => {
                "No jobs found matching your criteria. Try broadening your search.".to_string()
            }
            RunStatus::Errored(msg) => format!("Error: {msg}"),
        }
    }
}
