use crate::config::Search;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub posted_date: OffsetDateTime,
    pub skills: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSearchCriteria {
    pub skills: Vec<String>,
    pub exclude_companies: Vec<String>,
    pub include_companies: Vec<String>,
    pub location: String,
    pub experience: String,
    pub current_ctc: String,
    pub expected_ctc: String,
    pub dedupe_postings: bool,
}

impl From<&Search> for JobSearchCriteria {
    fn from(s: &Search) -> Self {
        Self {
            skills: s.skills.clone(),
            exclude_companies: s.exclude_companies.clone(),
            include_companies: s.include_companies.clone(),
            location: s.location.clone(),
            experience: s.experience.clone(),
            current_ctc: s.current_ctc.clone(),
            expected_ctc: s.expected_ctc.clone(),
            dedupe_postings: s.dedupe_postings,
        }
    }
}

pub const DEFAULT_NOTICE_PERIOD: &str = "30";

/// Fields pulled out of the resume text. Every field is always present;
/// anything not found keeps its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub experience: String,
    pub skills: Vec<String>,
    pub current_ctc: String,
    pub expected_ctc: String,
    pub location: String,
    pub notice_period: String,
}

impl Default for ResumeProfile {
    fn default() -> Self {
        Self {
            experience: String::new(),
            skills: Vec::new(),
            current_ctc: String::new(),
            expected_ctc: String::new(),
            location: String::new(),
            notice_period: DEFAULT_NOTICE_PERIOD.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Skipped,
    Failed,
}

impl ApplicationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Skipped => "skipped",
            ApplicationStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal outcome for one job. Built once by the applicator and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub job: JobPosting,
    #[serde(with = "time::serde::rfc3339")]
    pub applied_at: OffsetDateTime,
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_filled: Option<bool>,
}

impl ApplicationRecord {
    pub fn applied(job: &JobPosting, at: OffsetDateTime, form_filled: bool) -> Self {
        Self {
            job: job.clone(),
            applied_at: at,
            status: ApplicationStatus::Applied,
            reason: None,
            form_filled: Some(form_filled),
        }
    }

    pub fn skipped(job: &JobPosting, at: OffsetDateTime, reason: impl Into<String>) -> Self {
        Self {
            job: job.clone(),
            applied_at: at,
            status: ApplicationStatus::Skipped,
            reason: Some(reason.into()),
            form_filled: None,
        }
    }

    pub fn failed(job: &JobPosting, at: OffsetDateTime, reason: impl Into<String>) -> Self {
        Self {
            job: job.clone(),
            applied_at: at,
            status: ApplicationStatus::Failed,
            reason: Some(reason.into()),
            form_filled: None,
        }
    }
}
