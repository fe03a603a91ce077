use crate::model::{DEFAULT_NOTICE_PERIOD, ResumeProfile};
use crate::util::compile_patterns;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Error)]
pub enum ResumeSourceError {
    #[error("resume not found: {0}")]
    NotFound(PathBuf),
    #[error("resume unreadable: {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
    #[error("unsupported resume format: {0}")]
    Unsupported(PathBuf),
}

/// Produces raw resume text from a path.
pub trait ResumeSource {
    fn read_text(&self, path: &Path) -> Result<String, ResumeSourceError>;
}

/// Reads `.pdf` through `pdf-extract` and plain text files as UTF-8.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileResumeSource;

impl ResumeSource for FileResumeSource {
    fn read_text(&self, path: &Path) -> Result<String, ResumeSourceError> {
        if !path.exists() {
            return Err(ResumeSourceError::NotFound(path.to_path_buf()));
        }
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => {
                let bytes = std::fs::read(path).map_err(|e| ResumeSourceError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
                pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
                    ResumeSourceError::Unreadable {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }
                })
            }
            "txt" | "md" | "" => {
                std::fs::read_to_string(path).map_err(|e| ResumeSourceError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
            _ => Err(ResumeSourceError::Unsupported(path.to_path_buf())),
        }
    }
}

/// Reads and extracts the resume, falling back to the all-defaults profile on
/// any source error.
pub fn load_profile<S: ResumeSource + ?Sized>(source: &S, path: &Path) -> ResumeProfile {
    match source.read_text(path) {
        Ok(text) => {
            let profile = extract_profile(&text);
            info!(
                "resume parsed: experience={:?} skills={} notice={}",
                profile.experience,
                profile.skills.len(),
                profile.notice_period
            );
            profile
        }
        Err(err) => {
            warn!("could not read resume, using defaults: {err}");
            ResumeProfile::default()
        }
    }
}

pub fn extract_profile(text: &str) -> ResumeProfile {
    let text = normalize(text);
    ResumeProfile {
        experience: first_capture(&EXPERIENCE, &text).unwrap_or_default(),
        skills: extract_skills(&text),
        current_ctc: first_capture(&CURRENT_CTC, &text).unwrap_or_default(),
        expected_ctc: first_capture(&EXPECTED_CTC, &text).unwrap_or_default(),
        location: first_capture(&LOCATION, &text)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        notice_period: first_capture(&NOTICE_PERIOD, &text)
            .unwrap_or_else(|| DEFAULT_NOTICE_PERIOD.to_string()),
    }
}

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").nfkc().collect()
}

// Candidate order is significant: earlier patterns shadow later ones.
static EXPERIENCE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)(\d+)\s*years?\s*of\s*experience",
        r"(?i)exp[erience]*:\s*(\d+)\s*y",
        r"(?i)total\s*exp[erience]*:\s*(\d+)",
        r"(?i)(\d+)\s*yrs?",
    ])
});

static SKILLS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)skills?[:\s]*([\w+\s,.]+?)(?:experience|education|\z)",
        r"(?i)technical\s*skills?[:\s]*([\w+\s,.]+?)(?:\n\n|\n[A-Z])",
    ])
});

static CURRENT_CTC: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)current\s*ctc[:\s]*₹?\s*([\d.]+)",
        r"(?i)current\s*salary[:\s]*₹?\s*([\d.]+)",
        r"(?i)ctc[:\s]*₹?\s*([\d.]+)",
    ])
});

static EXPECTED_CTC: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)expected\s*ctc[:\s]*₹?\s*([\d.]+)",
        r"(?i)expected\s*salary[:\s]*₹?\s*([\d.]+)",
        r"(?i)salary\s*expectation[:\s]*₹?\s*([\d.]+)",
    ])
});

static LOCATION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)location[:\s]*([A-Za-z\s,]+?)(?:\n|\z)",
        r"(?i)based\s*in\s*([A-Za-z\s,]+?)(?:\n|\z)",
        r"(?i)city[:\s]*([A-Za-z\s,]+?)(?:\n|\z)",
    ])
});

static NOTICE_PERIOD: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[
        r"(?i)notice\s*period[:\s]*(\d+)\s*days?",
        r"(?i)available\s*in\s*(\d+)\s*days?",
        r"(?i)notice[:\s]*(\d+)",
    ])
});

fn first_capture(candidates: &[Regex], text: &str) -> Option<String> {
    candidates.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

fn extract_skills(text: &str) -> Vec<String> {
    let Some(raw) = first_capture(&SKILLS, text) else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    for skill in raw.split([',', ';']).map(str::trim) {
        if skill.is_empty() {
            continue;
        }
        if out.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
            debug!("duplicate skill dropped: {skill}");
            continue;
        }
        out.push(skill.to_string());
    }
    out
}
