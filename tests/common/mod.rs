#![allow(dead_code)]

use anyhow::{Result, anyhow, bail};
use auto_apply::browser::{Browser, ElementHandle, Page, RawFormField, RawListing, WaitUntil};
use auto_apply::config::{Config, ListingSelectors};
use auto_apply::resume::{ResumeSource, ResumeSourceError};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

pub const LOGIN_URL: &str = "https://www.naukri.com/nlogin/login";
pub const HOME_URL: &str = "https://www.naukri.com/mnjuser/homepage";

/// Everything the scripted page knows, shared so tests can inspect it after
/// the page has been handed to the code under test.
#[derive(Debug, Default)]
pub struct PageState {
    /// Answers to successive `current_url` calls; `None` is a read error. The
    /// last entry repeats once the script runs out.
    pub locations: Vec<Option<String>>,
    location_idx: usize,
    pub current: String,
    pub visited: Vec<String>,
    pub goto_errors: HashSet<String>,
    pub listings: HashMap<String, Vec<RawListing>>,
    pub scrape_errors: HashSet<String>,
    /// Selectors with a present element, per loaded URL.
    pub present: HashMap<String, Vec<String>>,
    pub forms: HashMap<String, Vec<RawFormField>>,
    pub actions: Vec<String>,
    /// Calls that error instead of acting, keyed like the recorded actions
    /// (`"type <selector>"`, `"query <selector>"`, `"form_fields"`, ...).
    pub failing: HashSet<String>,
    pub closed: bool,
}

impl PageState {
    fn check(&self, call: &str) -> Result<()> {
        if self.failing.contains(call) {
            bail!("{call}: element is not attached to the page");
        }
        Ok(())
    }

    fn record(&mut self, action: String) -> Result<()> {
        self.check(&action)?;
        self.actions.push(action);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub state: Rc<RefCell<PageState>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locations(locations: &[Option<&str>]) -> Self {
        let page = Self::new();
        page.state.borrow_mut().locations =
            locations.iter().map(|l| l.map(str::to_string)).collect();
        page
    }

    pub fn set_present(&self, url: &str, selectors: &[&str]) {
        self.state
            .borrow_mut()
            .present
            .insert(url.to_string(), selectors.iter().map(|s| s.to_string()).collect());
    }

    pub fn set_listings(&self, url: &str, listings: Vec<RawListing>) {
        self.state.borrow_mut().listings.insert(url.to_string(), listings);
    }

    pub fn set_form(&self, url: &str, fields: Vec<RawFormField>) {
        self.state.borrow_mut().forms.insert(url.to_string(), fields);
    }

    pub fn fail_goto(&self, url: &str) {
        self.state.borrow_mut().goto_errors.insert(url.to_string());
    }

    pub fn fail_call(&self, call: &str) {
        self.state.borrow_mut().failing.insert(call.to_string());
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.borrow().visited.clone()
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.borrow().actions.clone()
    }
}

impl Page for FakePage {
    fn goto(&mut self, url: &str, _wait: WaitUntil, _timeout: Duration) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.visited.push(url.to_string());
        if s.goto_errors.contains(url) {
            bail!("navigation timeout at {url}");
        }
        s.current = url.to_string();
        Ok(())
    }

    fn current_url(&mut self) -> Result<String> {
        let mut s = self.state.borrow_mut();
        if s.locations.is_empty() {
            return Ok(s.current.clone());
        }
        let idx = s.location_idx.min(s.locations.len() - 1);
        s.location_idx += 1;
        s.locations[idx]
            .clone()
            .ok_or_else(|| anyhow!("execution context was destroyed"))
    }

    fn query(&mut self, selector: &str) -> Result<Option<ElementHandle>> {
        let s = self.state.borrow();
        s.check(&format!("query {selector}"))?;
        let found = s
            .present
            .get(&s.current)
            .is_some_and(|list| list.iter().any(|p| p == selector));
        Ok(found.then(|| ElementHandle(format!("{selector}@{}", s.current))))
    }

    fn click(&mut self, element: &ElementHandle) -> Result<()> {
        self.state.borrow_mut().record(format!("click {}", element.0))
    }

    fn click_selector(&mut self, selector: &str) -> Result<()> {
        self.state.borrow_mut().record(format!("click_selector {selector}"))
    }

    fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.check(&format!("type {selector}"))?;
        s.record(format!("type {selector}={text}"))
    }

    fn select_option(&mut self, selector: &str, value: &str) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.check(&format!("select {selector}"))?;
        s.record(format!("select {selector}={value}"))
    }

    fn press_key(&mut self, key: &str) -> Result<()> {
        self.state.borrow_mut().record(format!("press {key}"))
    }

    fn scrape_listings(&mut self, _selectors: &ListingSelectors) -> Result<Vec<RawListing>> {
        let s = self.state.borrow();
        if s.scrape_errors.contains(&s.current) {
            bail!("listing selector timed out");
        }
        Ok(s.listings.get(&s.current).cloned().unwrap_or_default())
    }

    fn form_fields(&mut self, _selector: &str) -> Result<Vec<RawFormField>> {
        let s = self.state.borrow();
        s.check("form_fields")?;
        Ok(s.forms.get(&s.current).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct FakeBrowser {
    pub page: FakePage,
    pub fail_new_page: bool,
    pub close_calls: usize,
}

impl FakeBrowser {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            fail_new_page: false,
            close_calls: 0,
        }
    }
}

impl Browser for FakeBrowser {
    type Page = FakePage;

    fn new_page(&mut self) -> Result<FakePage> {
        if self.fail_new_page {
            bail!("browser disconnected");
        }
        Ok(self.page.clone())
    }

    fn close(&mut self) -> Result<()> {
        self.close_calls += 1;
        self.page.state.borrow_mut().closed = true;
        Ok(())
    }
}

/// Resume source that returns fixed text and remembers what it was asked for.
#[derive(Debug, Default)]
pub struct StaticResume {
    pub text: Option<String>,
    pub requested: RefCell<Vec<PathBuf>>,
}

impl StaticResume {
    pub fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            requested: RefCell::new(Vec::new()),
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }
}

impl ResumeSource for StaticResume {
    fn read_text(&self, path: &Path) -> Result<String, ResumeSourceError> {
        self.requested.borrow_mut().push(path.to_path_buf());
        self.text
            .clone()
            .ok_or_else(|| ResumeSourceError::NotFound(path.to_path_buf()))
    }
}

pub fn listing(id: &str, title: &str, company: &str, posted: &str, url: &str) -> RawListing {
    RawListing {
        id: (!id.is_empty()).then(|| id.to_string()),
        title: Some(title.to_string()),
        company: Some(company.to_string()),
        location: Some("Bangalore".to_string()),
        posted: Some(posted.to_string()),
        url: (!url.is_empty()).then(|| url.to_string()),
    }
}

pub fn field(name: &str, input_type: &str, options: &[&str]) -> RawFormField {
    RawFormField {
        name: name.to_string(),
        input_type: input_type.to_string(),
        label: String::new(),
        required: false,
        options: options.iter().map(|o| o.to_string()).collect(),
    }
}

pub fn config_with_skills(skills: &[&str]) -> Config {
    let mut cfg = Config::default();
    cfg.search.skills = skills.iter().map(|s| s.to_string()).collect();
    cfg
}

pub fn search_page(skill: &str) -> String {
    format!("https://www.naukri.com/{skill}-jobs")
}
