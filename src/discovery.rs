use crate::{
    browser::{Page, RawListing, WaitUntil},
    clock::Clock,
    config::Config,
    model::{JobPosting, JobSearchCriteria},
    posted::parse_posted_date,
    util::sha256_hex,
};
use anyhow::{Context, Result};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

pub struct Discovery<C: Clock> {
    cfg: Config,
    clock: C,
}

impl<C: Clock> Discovery<C> {
    pub fn new(cfg: &Config, clock: C) -> Self {
        Self {
            cfg: cfg.clone(),
            clock,
        }
    }

    pub fn discover_jobs<P: Page + ?Sized>(
        &self,
        page: &mut P,
        criteria: &JobSearchCriteria,
    ) -> Vec<JobPosting> {
        let mut jobs = Vec::new();

        for skill in &criteria.skills {
            info!("searching for jobs with skill: {skill}");
            match self.search_skill(page, skill, criteria) {
                Ok(found) => {
                    info!("skill {skill}: {} postings kept", found.len());
                    jobs.extend(found);
                }
                Err(err) => warn!("search for skill {skill} failed: {err:#}"),
            }
        }

        if criteria.dedupe_postings {
            jobs = dedupe(jobs);
        }
        sort_by_posted_desc(&mut jobs);
        jobs
    }

    fn search_skill<P: Page + ?Sized>(
        &self,
        page: &mut P,
        skill: &str,
        criteria: &JobSearchCriteria,
    ) -> Result<Vec<JobPosting>> {
        let portal = &self.cfg.portal;
        let url = search_url(&portal.search_url_template, &portal.base_url, skill);
        page.goto(
            &url,
            WaitUntil::NetworkIdle2,
            self.cfg.automation.navigation_timeout(),
        )?;

        let listings = page
            .scrape_listings(&self.cfg.selectors.listing)
            .with_context(|| format!("scraping listings at {url}"))?;
        debug!("{} raw listings at {url}", listings.len());

        let now = self.clock.now();
        Ok(listings
            .into_iter()
            .filter_map(|raw| self.to_posting(raw, skill, criteria, now))
            .collect())
    }

    fn to_posting(
        &self,
        raw: RawListing,
        skill: &str,
        criteria: &JobSearchCriteria,
        now: OffsetDateTime,
    ) -> Option<JobPosting> {
        let Some(url) = raw.url.filter(|u| !u.trim().is_empty()) else {
            warn!("dropping listing without a link: {:?}", raw.title);
            return None;
        };
        let company = raw.company.unwrap_or_default();
        if !should_include(&company, criteria) {
            debug!("filtered out company {company:?}");
            return None;
        }

        let id = raw
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| sha256_hex(url.as_bytes())[..16].to_string());

        Some(JobPosting {
            id,
            title: raw.title.unwrap_or_default(),
            company,
            location: raw.location.unwrap_or_default(),
            posted_date: parse_posted_date(raw.posted.as_deref().unwrap_or(""), now),
            skills: vec![skill.to_string()],
            description: None,
            url,
        })
    }
}

/// Exclusion always wins over the include list.
pub fn should_include(company: &str, criteria: &JobSearchCriteria) -> bool {
    let company = company.to_lowercase();
    let contains = |frag: &String| company.contains(&frag.to_lowercase());

    if criteria.exclude_companies.iter().any(contains) {
        return false;
    }
    if !criteria.include_companies.is_empty() {
        return criteria.include_companies.iter().any(contains);
    }
    true
}

pub fn search_url(template: &str, base_url: &str, skill: &str) -> String {
    let slug = skill
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    template
        .replace("{base_url}", base_url.trim_end_matches('/'))
        .replace("{skill}", &slug)
}

/// Stable, so postings with equal dates keep discovery order.
pub fn sort_by_posted_desc(jobs: &mut [JobPosting]) {
    jobs.sort_by(|a, b| b.posted_date.cmp(&a.posted_date));
}

fn dedupe(jobs: Vec<JobPosting>) -> Vec<JobPosting> {
    let mut out: Vec<JobPosting> = Vec::with_capacity(jobs.len());
    for job in jobs {
        match out.iter_mut().find(|seen| seen.id == job.id) {
            Some(seen) => {
                for skill in job.skills {
                    if !seen.skills.contains(&skill) {
                        seen.skills.push(skill);
                    }
                }
            }
            None => out.push(job),
        }
    }
    out
}
