use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub account: Account,
    #[serde(default)]
    pub portal: Portal,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub search: Search,
    #[serde(default)]
    pub selectors: Selectors,
    #[serde(default)]
    pub automation: Automation,
    #[serde(default)]
    pub resume: Resume,
    #[serde(default)]
    pub field_mappings: FieldMappings,
    #[serde(default)]
    pub driver: Driver,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    pub fn login_url(&self) -> String {
        join_url(&self.portal.base_url, &self.portal.login_path)
    }

    pub fn resume_path(&self) -> Option<PathBuf> {
        if self.resume.file_name.trim().is_empty() {
            return None;
        }
        Some(PathBuf::from(&self.resume.folder).join(&self.resume.file_name))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub run_name: String,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            run_name: "default".into(),
            print_summary: true,
        }
    }
}

/// Only the username is kept; the human types the password into the browser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Portal {
    pub base_url: String,
    /// Host fragment used to decide whether a location is still on the portal.
    pub domain: String,
    pub login_path: String,
    /// Any location containing this marker is treated as part of the login flow.
    pub login_marker: String,
    /// `{base_url}` and `{skill}` are substituted.
    pub search_url_template: String,
}
impl Default for Portal {
    fn default() -> Self {
        Self {
            base_url: "https://www.naukri.com".into(),
            domain: "naukri.com".into(),
            login_path: "/nlogin/login".into(),
            login_marker: "nlogin".into(),
            search_url_template: "{base_url}/{skill}-jobs".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Auth {
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
    pub progress_every_secs: u64,
    pub login_page_timeout_secs: u64,
    pub settle_ms: u64,
    /// Checked in order; the first substring found in the location wins.
    pub success_patterns: Vec<String>,
}
impl Default for Auth {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            timeout_secs: 10 * 60,
            progress_every_secs: 30,
            login_page_timeout_secs: 30,
            settle_ms: 3000,
            success_patterns: vec![
                "/mnjuser/homepage".into(),
                "/mnjuser/profile".into(),
                "/mnjuser/jobs".into(),
                "/jobs".into(),
                "/mnjuser/appliedJobs".into(),
                "/mnjuser/myProfile".into(),
                "/myProfile".into(),
                "/mnjuser/dashboard".into(),
                "/naukri.com/jobs/".into(),
            ],
        }
    }
}
impl Auth {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
    pub fn progress_every(&self) -> Duration {
        Duration::from_secs(self.progress_every_secs)
    }
    pub fn login_page_timeout(&self) -> Duration {
        Duration::from_secs(self.login_page_timeout_secs)
    }
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Search {
    pub skills: Vec<String>,
    pub exclude_companies: Vec<String>,
    pub include_companies: Vec<String>,
    pub location: String,
    pub experience: String,
    pub current_ctc: String,
    pub expected_ctc: String,
    /// Merge postings that share an identifier across skills.
    pub dedupe_postings: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Ordered; the first selector with a present element is used.
    pub apply: Vec<String>,
    pub form_container: Vec<String>,
    pub form_inputs: String,
    pub submit: Vec<String>,
    pub listing: ListingSelectors,
}
impl Default for Selectors {
    fn default() -> Self {
        Self {
            apply: vec![
                ".applyBtn".into(),
                "button[data-apply]".into(),
                "a[data-apply]".into(),
                "[class*=\"apply\"]".into(),
                "button:contains(\"Apply\")".into(),
                ".btn-apply".into(),
                "[data-qa=\"buttonApplyJob\"]".into(),
            ],
            form_container: vec![
                ".nk-form".into(),
                "form[role=\"form\"]".into(),
                "[class*=\"modal\"]".into(),
            ],
            form_inputs: "input, select, textarea".into(),
            submit: vec![
                "button[type=\"submit\"]".into(),
                "button:contains(\"Submit\")".into(),
                "button:contains(\"Apply\")".into(),
                ".nk-btn-submit".into(),
                "[class*=\"submit\"]".into(),
            ],
            listing: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    pub card: String,
    pub id_attribute: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub posted: String,
    pub link: String,
}
impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            card: ".jobTuple".into(),
            id_attribute: "data-job-id".into(),
            title: ".jobTitle".into(),
            company: ".companyName".into(),
            location: ".location".into(),
            posted: ".postedOn".into(),
            link: "a".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Automation {
    pub headless: bool,
    pub navigation_timeout_secs: u64,
    pub settle_after_navigation_ms: u64,
    pub settle_after_apply_ms: u64,
    pub settle_after_form_ms: u64,
    pub form_appear_ms: u64,
    pub form_poll_ms: u64,
    pub form_submit_wait_ms: u64,
}
impl Default for Automation {
    fn default() -> Self {
        Self {
            headless: false,
            navigation_timeout_secs: 60,
            settle_after_navigation_ms: 1000,
            settle_after_apply_ms: 2000,
            settle_after_form_ms: 2000,
            form_appear_ms: 1000,
            form_poll_ms: 250,
            form_submit_wait_ms: 3000,
        }
    }
}
impl Automation {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
    pub fn settle_after_navigation(&self) -> Duration {
        Duration::from_millis(self.settle_after_navigation_ms)
    }
    pub fn settle_after_apply(&self) -> Duration {
        Duration::from_millis(self.settle_after_apply_ms)
    }
    pub fn settle_after_form(&self) -> Duration {
        Duration::from_millis(self.settle_after_form_ms)
    }
    pub fn form_appear(&self) -> Duration {
        Duration::from_millis(self.form_appear_ms)
    }
    pub fn form_poll(&self) -> Duration {
        Duration::from_millis(self.form_poll_ms.max(1))
    }
    pub fn form_submit_wait(&self) -> Duration {
        Duration::from_millis(self.form_submit_wait_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Resume {
    pub folder: String,
    /// Empty disables resume parsing (and therefore form filling).
    pub file_name: String,
    pub auto_fill_forms: bool,
}
impl Default for Resume {
    fn default() -> Self {
        Self {
            folder: "resume".into(),
            file_name: "resume.pdf".into(),
            auto_fill_forms: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMappings {
    pub experience: Vec<String>,
    pub current_ctc: Vec<String>,
    pub expected_ctc: Vec<String>,
    pub location: Vec<String>,
    pub notice_period: Vec<String>,
    pub skills: Vec<String>,
}
impl Default for FieldMappings {
    fn default() -> Self {
        Self {
            experience: vec![
                "experience".into(),
                "totalexp".into(),
                "workexp".into(),
                "years".into(),
            ],
            current_ctc: vec!["currentctc".into(), "current_ctc".into(), "currentsalary".into()],
            expected_ctc: vec![
                "expectedctc".into(),
                "expected_ctc".into(),
                "expectedsalary".into(),
            ],
            location: vec!["location".into(), "city".into()],
            notice_period: vec!["notice".into(), "noticeperiod".into()],
            skills: vec!["skill".into(), "keyskills".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Driver {
    /// Executable that speaks the JSON-lines bridge protocol on stdin/stdout.
    pub command: String,
    pub args: Vec<String>,
    pub request_timeout_secs: u64,
    /// Extra slack added on top of command-level timeouts (navigation).
    pub grace_secs: u64,
    pub log_stderr: bool,
    pub env: std::collections::BTreeMap<String, String>,
}
impl Default for Driver {
    fn default() -> Self {
        Self {
            command: "node".into(),
            args: vec!["scripts/browser_bridge.js".into()],
            request_timeout_secs: 30,
            grace_secs: 5,
            log_stderr: true,
            env: Default::default(),
        }
    }
}
impl Driver {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub out_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub write_csv: bool,
    pub write_report_json: bool,
    pub csv_filename: String,
    pub report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_csv: true,
            write_report_json: true,
            csv_filename: "applications.csv".into(),
            report_filename: "report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: true,
        }
    }
}
