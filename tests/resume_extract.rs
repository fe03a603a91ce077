mod common;

use auto_apply::model::ResumeProfile;
use auto_apply::resume::{FileResumeSource, extract_profile, load_profile};
use common::StaticResume;
use std::path::Path;

#[test]
fn experience_ctc_and_notice_from_one_line() {
    let p = extract_profile("5 years of experience, Current CTC: 12, Notice Period: 15 days");
    assert_eq!(p.experience, "5");
    assert_eq!(p.current_ctc, "12");
    assert_eq!(p.notice_period, "15");
}

#[test]
fn empty_text_yields_the_default_profile() {
    let p = extract_profile("");
    assert_eq!(p, ResumeProfile::default());
    assert_eq!(p.notice_period, "30");
    assert!(p.skills.is_empty());
}

#[test]
fn expected_ctc_and_location() {
    let p = extract_profile("Expected Salary: 25\nBased in Hyderabad\n");
    assert_eq!(p.expected_ctc, "25");
    assert_eq!(p.current_ctc, "");
    assert_eq!(p.location, "Hyderabad");
}

#[test]
fn duplicate_skills_are_dropped() {
    let p = extract_profile("Skills: Rust, rust, Kafka\n\nEducation: B.Tech");
    assert_eq!(p.skills, vec!["Rust", "Kafka"]);
}

#[test]
fn source_errors_fall_back_to_defaults() {
    let source = StaticResume::missing();
    let p = load_profile(&source, Path::new("resume/resume.pdf"));
    assert_eq!(p, ResumeProfile::default());
    assert_eq!(source.requested.borrow().len(), 1);
}

#[test]
fn missing_file_on_disk_falls_back_to_defaults() {
    let p = load_profile(&FileResumeSource, Path::new("definitely/not/here/resume.pdf"));
    assert_eq!(p, ResumeProfile::default());
}

#[test]
fn loaded_text_is_extracted() {
    let source = StaticResume::new("Total Experience: 7\nNotice: 60");
    let p = load_profile(&source, Path::new("any.txt"));
    assert_eq!(p.experience, "7");
    assert_eq!(p.notice_period, "60");
}
