use crate::{
    applicator::Applicator,
    auth::{AuthWaiter, Credentials, LoginOutcome},
    browser::Browser,
    clock::Clock,
    config::Config,
    discovery::Discovery,
    model::{JobSearchCriteria, ResumeProfile},
    observer::{OutcomeListener, StatusSink},
    report::{ApplicationLog, RunReport, RunStatus},
    resume::{ResumeSource, load_profile},
};
use anyhow::{Context, Result};
use tracing::{error, info, warn};

pub struct Automation<C: Clock> {
    cfg: Config,
    clock: C,
}

#[derive(Default)]
struct Progress {
    login: Option<LoginOutcome>,
    jobs_discovered: usize,
    log: ApplicationLog,
}

impl<C: Clock> Automation<C> {
    pub fn new(cfg: &Config, clock: C) -> Self {
        Self {
            cfg: cfg.clone(),
            clock,
        }
    }

    pub fn run<B, R, S, L>(
        &self,
        browser: &mut B,
        resume: &R,
        status: &mut S,
        listener: &mut L,
    ) -> RunReport
    where
        B: Browser + ?Sized,
        R: ResumeSource + ?Sized,
        S: StatusSink + ?Sized,
        L: OutcomeListener + ?Sized,
    {
        let started = self.clock.now();
        let mut progress = Progress::default();

        let run_status = match self.phases(browser, resume, status, listener, &mut progress) {
            Ok(s) => s,
            Err(err) => {
                error!("automation error: {err:#}");
                let msg = format!("{err:#}");
                status.report(&format!("Error: {msg}"));
                RunStatus::Errored(msg)
            }
        };

        if let Err(err) = browser.close() {
            warn!("closing browser failed: {err:#}");
        }

        let report = RunReport {
            status: run_status,
            started,
            finished: self.clock.now(),
            login: progress.login,
            jobs_discovered: progress.jobs_discovered,
            counts: progress.log.counts(),
            records: progress.log,
        };
        info!("{}", report.summary());
        status.report(&report.summary());
        report
    }

    fn phases<B, R, S, L>(
        &self,
        browser: &mut B,
        resume: &R,
        status: &mut S,
        listener: &mut L,
        progress: &mut Progress,
    ) -> Result<RunStatus>
    where
        B: Browser + ?Sized,
        R: ResumeSource + ?Sized,
        S: StatusSink + ?Sized,
        L: OutcomeListener + ?Sized,
    {
        status.report("Starting automation...");
        let mut page = browser.new_page().context("opening browser page")?;

        let credentials = Credentials::from_config(&self.cfg);
        let login = AuthWaiter::new(&self.cfg, &self.clock).wait_for_login(
            &mut page,
            &credentials,
            status,
        )?;
        let logged_in = login.is_logged_in();
        progress.login = Some(login);
        if !logged_in {
            return Ok(RunStatus::LoginFailed);
        }

        status.report("Searching for jobs...");
        let criteria = JobSearchCriteria::from(&self.cfg.search);
        let jobs = Discovery::new(&self.cfg, &self.clock).discover_jobs(&mut page, &criteria);
        progress.jobs_discovered = jobs.len();
        if jobs.is_empty() {
            return Ok(RunStatus::NoJobsFound);
        }
        status.report(&format!("Found {} jobs. Starting applications...", jobs.len()));

        let profile = self.profile(resume);
        progress.log = Applicator::new(&self.cfg, &self.clock).apply_to_jobs(
            &mut page,
            &jobs,
            profile.as_ref(),
            listener,
        );
        Ok(RunStatus::Completed)
    }

    fn profile<R: ResumeSource + ?Sized>(&self, resume: &R) -> Option<ResumeProfile> {
        if !self.cfg.resume.auto_fill_forms {
            return None;
        }
        let path = self.cfg.resume_path()?;
        Some(load_profile(resume, &path))
    }
}
