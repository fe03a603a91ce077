use crate::{
    browser::{Page, WaitUntil},
    clock::Clock,
    config::{Auth, Config, Portal},
    observer::StatusSink,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub login_url: String,
}

impl Credentials {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            username: cfg.account.username.clone(),
            login_url: cfg.login_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoginOutcome {
    LoggedIn { elapsed: Duration, location: String },
    TimedOut { elapsed: Duration },
}

impl LoginOutcome {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, LoginOutcome::LoggedIn { .. })
    }
}

/// Why a sampled location counts as signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginSignal {
    SuccessPath,
    LeftLoginPage,
}

pub struct AuthWaiter<C: Clock> {
    auth: Auth,
    portal: Portal,
    navigation_timeout: Duration,
    clock: C,
}

impl<C: Clock> AuthWaiter<C> {
    pub fn new(cfg: &Config, clock: C) -> Self {
        Self {
            auth: cfg.auth.clone(),
            portal: cfg.portal.clone(),
            navigation_timeout: cfg.auth.login_page_timeout(),
            clock,
        }
    }

    /// Only a failure to open the login page is an error.
    pub fn wait_for_login<P, S>(
        &self,
        page: &mut P,
        credentials: &Credentials,
        status: &mut S,
    ) -> Result<LoginOutcome>
    where
        P: Page + ?Sized,
        S: StatusSink + ?Sized,
    {
        status.report("Opening login portal...");
        page.goto(&credentials.login_url, WaitUntil::NetworkIdle0, self.navigation_timeout)
            .with_context(|| format!("opening login page {}", credentials.login_url))?;
        self.clock.sleep(self.auth.settle());

        self.print_instructions(credentials, status);
        let outcome = self.poll(page, status);

        match &outcome {
            LoginOutcome::LoggedIn { elapsed, location } => {
                info!("login detected after {:?} at {location}", elapsed);
                status.report("Login successful.");
                self.clock.sleep(self.auth.settle());
            }
            LoginOutcome::TimedOut { elapsed } => {
                warn!("login wait timed out after {:?}", elapsed);
                status.report(&format!(
                    "LOGIN TIMEOUT: login was not completed within {}",
                    human_duration(self.auth.timeout())
                ));
                status.report("  - check that the browser window opened on the login page");
                status.report("  - if a CAPTCHA blocked you, log in manually once and retry");
                status.report("  - start the run again to get a fresh wait");
            }
        }
        Ok(outcome)
    }

    pub fn poll<P, S>(&self, page: &mut P, status: &mut S) -> LoginOutcome
    where
        P: Page + ?Sized,
        S: StatusSink + ?Sized,
    {
        let interval = self.auth.poll_interval();
        let timeout = self.auth.timeout();
        let progress_every = self.auth.progress_every();
        let mut next_progress = progress_every;
        let mut elapsed = Duration::ZERO;
        let mut last_location: Option<String> = None;

        while elapsed < timeout {
            let step = interval.min(timeout - elapsed);
            self.clock.sleep(step);
            elapsed += step;

            match page.current_url() {
                Ok(location) => {
                    let had_previous = last_location.is_some();
                    if last_location.as_deref() != Some(location.as_str()) {
                        debug!("[{}s] location changed to {location}", elapsed.as_secs());
                        status.report(&format!(
                            "[{}s] location changed to: {location}",
                            elapsed.as_secs()
                        ));
                        last_location = Some(location.clone());
                    }

                    if let Some(signal) = self.login_signal(&location, had_previous) {
                        debug!("login signal {:?}", signal);
                        return LoginOutcome::LoggedIn { elapsed, location };
                    }
                }
                Err(err) => warn!("could not read page location: {err:#}"),
            }

            if !progress_every.is_zero() && elapsed >= next_progress && elapsed < timeout {
                status.report(&format!("Still waiting... ({}s elapsed)", elapsed.as_secs()));
                next_progress += progress_every;
            }
        }

        LoginOutcome::TimedOut { elapsed }
    }

    /// `had_previous` says whether an earlier tick already observed a location.
    pub fn login_signal(&self, location: &str, had_previous: bool) -> Option<LoginSignal> {
        if self
            .auth
            .success_patterns
            .iter()
            .any(|p| !p.is_empty() && location.contains(p.as_str()))
        {
            return Some(LoginSignal::SuccessPath);
        }

        let in_domain = location.contains(&self.portal.domain);
        let on_login = location.contains(&self.portal.login_marker)
            || location.contains(&self.portal.login_path);
        if in_domain && !on_login && had_previous {
            return Some(LoginSignal::LeftLoginPage);
        }
        None
    }

    fn print_instructions<S: StatusSink + ?Sized>(
        &self,
        credentials: &Credentials,
        status: &mut S,
    ) {
        status.report("MANUAL LOGIN REQUIRED");
        if credentials.username.is_empty() {
            status.report("In the browser window that opened:");
        } else {
            status.report(&format!(
                "In the browser window that opened, sign in as {}:",
                credentials.username
            ));
        }
        status.report("  1. enter your email/username and password");
        status.report("  2. complete the CAPTCHA or OTP if prompted");
        status.report("  3. press the Login button");
        status.report(&format!(
            "Waiting (checking every {}s, timeout {})",
            self.auth.poll_interval().as_secs(),
            human_duration(self.auth.timeout())
        ));
    }
}

fn human_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{secs}s")
    }
}
