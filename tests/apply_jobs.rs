mod common;

use auto_apply::applicator::{APPLY_CONTROL_MISSING, Applicator};
use auto_apply::clock::ManualClock;
use auto_apply::config::Config;
use auto_apply::model::{ApplicationRecord, ApplicationStatus, JobPosting, ResumeProfile};
use common::{FakePage, field};
use time::OffsetDateTime;

fn job(id: &str) -> JobPosting {
    JobPosting {
        id: id.into(),
        title: format!("Engineer {id}"),
        company: "Acme".into(),
        location: "Bangalore".into(),
        posted_date: OffsetDateTime::UNIX_EPOCH,
        skills: vec!["java".into()],
        description: None,
        url: format!("https://www.naukri.com/job/{id}"),
    }
}

fn profile() -> ResumeProfile {
    ResumeProfile {
        experience: "5".into(),
        current_ctc: "12".into(),
        notice_period: "15".into(),
        ..Default::default()
    }
}

#[test]
fn every_job_gets_exactly_one_record_in_order() {
    let cfg = Config::default();
    let mut page = FakePage::new();
    let jobs = vec![job("ok"), job("gone"), job("broken")];
    page.set_present(&jobs[0].url, &[".applyBtn"]);
    page.fail_goto(&jobs[2].url);

    let clock = ManualClock::default();
    let mut seen: Vec<ApplicationRecord> = Vec::new();
    let mut listener = |r: &ApplicationRecord| seen.push(r.clone());
    let log = Applicator::new(&cfg, &clock).apply_to_jobs(&mut page, &jobs, None, &mut listener);

    let statuses: Vec<_> = log.records().iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ApplicationStatus::Applied,
            ApplicationStatus::Skipped,
            ApplicationStatus::Failed
        ]
    );
    let ids: Vec<_> = log.records().iter().map(|r| r.job.id.as_str()).collect();
    assert_eq!(ids, vec!["ok", "gone", "broken"]);
    assert_eq!(seen, log.records());

    let counts = log.counts();
    assert_eq!((counts.applied, counts.skipped, counts.failed), (1, 1, 1));
}

#[test]
fn missing_apply_control_is_skipped_with_a_reason() {
    let cfg = Config::default();
    let mut page = FakePage::new();
    let clock = ManualClock::default();
    let mut ignore = |_: &ApplicationRecord| {};

    let log =
        Applicator::new(&cfg, &clock).apply_to_jobs(&mut page, &[job("x")], None, &mut ignore);
    let r = &log.records()[0];
    assert_eq!(r.status, ApplicationStatus::Skipped);
    assert_eq!(r.reason.as_deref(), Some(APPLY_CONTROL_MISSING));
    assert_eq!(r.form_filled, None);
    assert!(page.actions().is_empty());
}

#[test]
fn navigation_failure_records_the_error() {
    let cfg = Config::default();
    let mut page = FakePage::new();
    let j = job("slow");
    page.fail_goto(&j.url);
    let clock = ManualClock::default();
    let mut ignore = |_: &ApplicationRecord| {};

    let log = Applicator::new(&cfg, &clock).apply_to_jobs(&mut page, &[j], None, &mut ignore);
    let r = &log.records()[0];
    assert_eq!(r.status, ApplicationStatus::Failed);
    assert!(r.reason.as_deref().unwrap_or("").contains("navigation timeout"));
    assert_eq!(r.form_filled, None);
}

#[test]
fn follow_up_form_is_filled_and_submitted() {
    let cfg = Config::default();
    let mut page = FakePage::new();
    let j = job("form");
    page.set_present(&j.url, &[".applyBtn", ".nk-form", "button[type=\"submit\"]"]);
    page.set_form(
        &j.url,
        vec![
            field("noticePeriod", "select", &["Select", "15 Days or less", "1 Month"]),
            field("currentCtc", "text", &[]),
            field("firstName", "text", &[]),
            field("", "text", &[]),
        ],
    );
    let clock = ManualClock::default();
    let mut ignore = |_: &ApplicationRecord| {};

    let p = profile();
    let jobs = [j.clone()];
    let log = Applicator::new(&cfg, &clock).apply_to_jobs(&mut page, &jobs, Some(&p), &mut ignore);
    let r = &log.records()[0];
    assert_eq!(r.status, ApplicationStatus::Applied);
    assert_eq!(r.form_filled, Some(true));
    assert_eq!(r.reason, None);

    assert_eq!(
        page.actions(),
        vec![
            format!("click .applyBtn@{}", j.url),
            "select [name=\"noticePeriod\"], [id=\"noticePeriod\"]=15 Days or less".to_string(),
            "type [name=\"currentCtc\"], [id=\"currentCtc\"]=12".to_string(),
            format!("click button[type=\"submit\"]@{}", j.url),
        ]
    );
}

#[test]
fn no_form_means_applied_without_fill() {
    let cfg = Config::default();
    let mut page = FakePage::new();
    let j = job("plain");
    page.set_present(&j.url, &[".applyBtn"]);
    let clock = ManualClock::default();
    let mut ignore = |_: &ApplicationRecord| {};

    let p = profile();
    let log = Applicator::new(&cfg, &clock).apply_to_jobs(&mut page, &[j], Some(&p), &mut ignore);
    assert_eq!(log.records()[0].form_filled, Some(false));
    assert_eq!(page.actions().len(), 1);
}

#[test]
fn auto_fill_off_leaves_forms_alone() {
    let mut cfg = Config::default();
    cfg.resume.auto_fill_forms = false;
    let mut page = FakePage::new();
    let j = job("manual");
    page.set_present(&j.url, &[".applyBtn", ".nk-form"]);
    page.set_form(&j.url, vec![field("currentCtc", "text", &[])]);
    let clock = ManualClock::default();
    let mut ignore = |_: &ApplicationRecord| {};

    let p = profile();
    let log = Applicator::new(&cfg, &clock).apply_to_jobs(&mut page, &[j], Some(&p), &mut ignore);
    assert_eq!(log.records()[0].form_filled, Some(false));
    assert!(!page.actions().iter().any(|a| a.starts_with("type ")));
}

#[test]
fn submit_falls_back_to_enter() {
    let cfg = Config::default();
    let mut page = FakePage::new();
    let j = job("enter");
    page.set_present(&j.url, &[".applyBtn", ".nk-form"]);
    page.set_form(&j.url, vec![field("expectedCtc", "number", &[])]);
    let clock = ManualClock::default();
    let mut ignore = |_: &ApplicationRecord| {};

    let p = ResumeProfile {
        expected_ctc: "20".into(),
        ..Default::default()
    };
    let log = Applicator::new(&cfg, &clock).apply_to_jobs(&mut page, &[j], Some(&p), &mut ignore);
    assert_eq!(log.records()[0].form_filled, Some(true));
    assert_eq!(page.actions().last().map(String::as_str), Some("press Enter"));
}

#[test]
fn unreadable_form_still_counts_as_applied() {
    let cfg = Config::default();
    let mut page = FakePage::new();
    let j = job("formless");
    page.set_present(&j.url, &[".applyBtn", ".nk-form"]);
    page.set_form(&j.url, vec![field("currentCtc", "text", &[])]);
    page.fail_call("form_fields");
    let clock = ManualClock::default();
    let mut ignore = |_: &ApplicationRecord| {};

    let p = profile();
    let jobs = [j.clone()];
    let log = Applicator::new(&cfg, &clock).apply_to_jobs(&mut page, &jobs, Some(&p), &mut ignore);
    let r = &log.records()[0];
    assert_eq!(r.status, ApplicationStatus::Applied);
    assert_eq!(r.form_filled, Some(false));
    assert_eq!(page.actions(), vec![format!("click .applyBtn@{}", j.url)]);
}

#[test]
fn failed_form_submit_is_applied_without_fill() {
    let cfg = Config::default();
    let mut page = FakePage::new();
    let j = job("stuck");
    page.set_present(&j.url, &[".applyBtn", ".nk-form", "button[type=\"submit\"]"]);
    page.set_form(&j.url, vec![field("currentCtc", "text", &[])]);
    page.fail_call(&format!("click button[type=\"submit\"]@{}", j.url));
    let clock = ManualClock::default();
    let mut ignore = |_: &ApplicationRecord| {};

    let p = profile();
    let jobs = [j.clone()];
    let log = Applicator::new(&cfg, &clock).apply_to_jobs(&mut page, &jobs, Some(&p), &mut ignore);
    let r = &log.records()[0];
    assert_eq!(r.status, ApplicationStatus::Applied);
    assert_eq!(r.form_filled, Some(false));
    assert_eq!(r.reason, None);
    assert!(page.actions().iter().any(|a| a.ends_with("=12")));
}

#[test]
fn one_unwritable_field_does_not_stop_the_rest() {
    let cfg = Config::default();
    let mut page = FakePage::new();
    let j = job("partial");
    page.set_present(&j.url, &[".applyBtn", ".nk-form"]);
    page.set_form(
        &j.url,
        vec![field("experience", "text", &[]), field("currentCtc", "text", &[])],
    );
    page.fail_call("type [name=\"experience\"], [id=\"experience\"]");
    let clock = ManualClock::default();
    let mut ignore = |_: &ApplicationRecord| {};

    let p = profile();
    let log = Applicator::new(&cfg, &clock).apply_to_jobs(&mut page, &[j], Some(&p), &mut ignore);
    assert_eq!(log.records()[0].form_filled, Some(true));

    let actions = page.actions();
    assert!(!actions.iter().any(|a| a.contains("experience")));
    assert!(actions.contains(&"type [name=\"currentCtc\"], [id=\"currentCtc\"]=12".to_string()));
    assert_eq!(actions.last().map(String::as_str), Some("press Enter"));
}

#[test]
fn erroring_apply_selector_falls_through_to_the_next() {
    let cfg = Config::default();
    let mut page = FakePage::new();
    let j = job("alt");
    page.set_present(&j.url, &[".applyBtn", "button[data-apply]"]);
    page.fail_call("query .applyBtn");
    let clock = ManualClock::default();
    let mut ignore = |_: &ApplicationRecord| {};

    let jobs = [j.clone()];
    let log = Applicator::new(&cfg, &clock).apply_to_jobs(&mut page, &jobs, None, &mut ignore);
    assert_eq!(log.records()[0].status, ApplicationStatus::Applied);
    assert_eq!(page.actions(), vec![format!("click button[data-apply]@{}", j.url)]);
}
