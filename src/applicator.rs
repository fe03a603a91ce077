use crate::{
    browser::{Page, WaitUntil, first_present},
    clock::Clock,
    config::Config,
    form::FormFiller,
    model::{ApplicationRecord, JobPosting, ResumeProfile},
    observer::OutcomeListener,
    report::ApplicationLog,
};
use anyhow::Result;
use tracing::{debug, info, warn};

pub const APPLY_CONTROL_MISSING: &str = "apply control not found — possibly already applied";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationState {
    Navigating,
    LocatingApplyControl,
    Submitting,
    DetectingForm,
    FillingForm,
    SubmittingForm,
    Applied,
    Skipped,
    Failed,
}

impl ApplicationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationState::Applied | ApplicationState::Skipped | ApplicationState::Failed
        )
    }
}

/// Non-failed end of a single attempt.
enum Attempt {
    Applied { form_filled: bool },
    Skipped,
}

pub struct Applicator<C: Clock> {
    cfg: Config,
    clock: C,
}

impl<C: Clock> Applicator<C> {
    pub fn new(cfg: &Config, clock: C) -> Self {
        Self {
            cfg: cfg.clone(),
            clock,
        }
    }

    pub fn apply_to_jobs<P, L>(
        &self,
        page: &mut P,
        jobs: &[JobPosting],
        profile: Option<&ResumeProfile>,
        listener: &mut L,
    ) -> ApplicationLog
    where
        P: Page + ?Sized,
        L: OutcomeListener + ?Sized,
    {
        let mut log = ApplicationLog::new();
        info!("starting to apply for {} jobs", jobs.len());

        for (i, job) in jobs.iter().enumerate() {
            info!("[{}/{}] processing: {} at {}", i + 1, jobs.len(), job.title, job.company);

            let record = match self.apply_one(page, job, profile) {
                Ok(Attempt::Applied { form_filled }) => {
                    info!(
                        "applied for {}{}",
                        job.title,
                        if form_filled { " (form filled)" } else { "" }
                    );
                    ApplicationRecord::applied(job, self.clock.now(), form_filled)
                }
                Ok(Attempt::Skipped) => {
                    info!("skipped {}: apply control not found", job.title);
                    ApplicationRecord::skipped(job, self.clock.now(), APPLY_CONTROL_MISSING)
                }
                Err(err) => {
                    transition(job, ApplicationState::Failed);
                    warn!("failed to apply for {}: {err:#}", job.title);
                    ApplicationRecord::failed(job, self.clock.now(), format!("{err:#}"))
                }
            };

            listener.on_outcome(&record);
            log.append(record);
        }

        info!("application pass complete");
        log
    }

    fn apply_one<P: Page + ?Sized>(
        &self,
        page: &mut P,
        job: &JobPosting,
        profile: Option<&ResumeProfile>,
    ) -> Result<Attempt> {
        let auto = &self.cfg.automation;

        transition(job, ApplicationState::Navigating);
        page.goto(&job.url, WaitUntil::NetworkIdle2, auto.navigation_timeout())?;
        self.clock.sleep(auto.settle_after_navigation());

        transition(job, ApplicationState::LocatingApplyControl);
        let Some((selector, control)) = first_present(page, &self.cfg.selectors.apply) else {
            transition(job, ApplicationState::Skipped);
            return Ok(Attempt::Skipped);
        };
        debug!("apply control found via {selector}");

        transition(job, ApplicationState::Submitting);
        page.click(&control)?;
        self.clock.sleep(auto.settle_after_apply());

        let mut form_filled = false;
        if let (true, Some(profile)) = (self.cfg.resume.auto_fill_forms, profile) {
            match self.handle_form(page, job, profile) {
                Ok(filled) => form_filled = filled,
                Err(err) => warn!("could not fill form for {}: {err:#}", job.title),
            }
        }

        self.clock.sleep(auto.settle_after_form());
        transition(job, ApplicationState::Applied);
        Ok(Attempt::Applied { form_filled })
    }

    fn handle_form<P: Page + ?Sized>(
        &self,
        page: &mut P,
        job: &JobPosting,
        profile: &ResumeProfile,
    ) -> Result<bool> {
        let filler = FormFiller::new(&self.cfg, &self.clock);

        transition(job, ApplicationState::DetectingForm);
        let Some(fields) = filler.detect(page)? else {
            return Ok(false);
        };

        transition(job, ApplicationState::FillingForm);
        let written = filler.fill(page, &fields, profile);
        debug!("{written} of {} fields written", fields.len());

        transition(job, ApplicationState::SubmittingForm);
        filler.submit(page)?;
        Ok(true)
    }
}

fn transition(job: &JobPosting, state: ApplicationState) {
    debug!(job = %job.id, ?state, terminal = state.is_terminal(), "state");
}
