use crate::{
    browser::{Page, RawFormField, first_present},
    clock::{Clock, wait_until},
    config::{Config, FieldMappings},
    model::{DEFAULT_NOTICE_PERIOD, JobSearchCriteria, ResumeProfile},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Numeric,
    Select,
    Radio,
    Checkbox,
    LongText,
}

impl FieldKind {
    pub fn from_input_type(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "select" | "select-one" => FieldKind::Select,
            "radio" => FieldKind::Radio,
            "checkbox" | "select-multiple" => FieldKind::Checkbox,
            "textarea" => FieldKind::LongText,
            "number" | "tel" | "range" => FieldKind::Numeric,
            _ => FieldKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub kind: FieldKind,
    pub label: String,
    pub required: bool,
    pub options: Vec<String>,
}

impl FormField {
    /// Nameless controls cannot be addressed and are dropped.
    pub fn from_raw(raw: RawFormField) -> Option<Self> {
        if raw.name.trim().is_empty() {
            return None;
        }
        let label = if raw.label.trim().is_empty() {
            raw.name.clone()
        } else {
            raw.label
        };
        Some(Self {
            kind: FieldKind::from_input_type(&raw.input_type),
            name: raw.name,
            label,
            required: raw.required,
            options: raw.options,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Experience,
    CurrentCtc,
    ExpectedCtc,
    Location,
    NoticePeriod,
    Skills,
}

impl FieldCategory {
    /// Classification order; the first category with a matching keyword wins.
    pub const ORDER: [FieldCategory; 6] = [
        FieldCategory::Experience,
        FieldCategory::CurrentCtc,
        FieldCategory::ExpectedCtc,
        FieldCategory::Location,
        FieldCategory::NoticePeriod,
        FieldCategory::Skills,
    ];

    fn keywords(self, mappings: &FieldMappings) -> &[String] {
        match self {
            FieldCategory::Experience => &mappings.experience,
            FieldCategory::CurrentCtc => &mappings.current_ctc,
            FieldCategory::ExpectedCtc => &mappings.expected_ctc,
            FieldCategory::Location => &mappings.location,
            FieldCategory::NoticePeriod => &mappings.notice_period,
            FieldCategory::Skills => &mappings.skills,
        }
    }
}

pub fn classify_field(name: &str, mappings: &FieldMappings) -> Option<FieldCategory> {
    let name = name.to_lowercase();
    FieldCategory::ORDER.into_iter().find(|category| {
        category
            .keywords(mappings)
            .iter()
            .filter(|k| !k.is_empty())
            .any(|k| name.contains(&k.to_lowercase()))
    })
}

/// Resume value first, then the search criteria, then the fixed default.
pub fn resolve_value(
    category: FieldCategory,
    profile: &ResumeProfile,
    criteria: &JobSearchCriteria,
) -> String {
    let pick = |a: &str, b: &str| {
        if !a.is_empty() {
            a.to_string()
        } else {
            b.to_string()
        }
    };
    match category {
        FieldCategory::Experience => pick(&profile.experience, &criteria.experience),
        FieldCategory::CurrentCtc => pick(&profile.current_ctc, &criteria.current_ctc),
        FieldCategory::ExpectedCtc => pick(&profile.expected_ctc, &criteria.expected_ctc),
        FieldCategory::Location => pick(&profile.location, &criteria.location),
        FieldCategory::NoticePeriod => pick(&profile.notice_period, DEFAULT_NOTICE_PERIOD),
        FieldCategory::Skills => pick(&profile.skills.join(", "), &criteria.skills.join(", ")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAssignment {
    pub field: FormField,
    pub category: FieldCategory,
    pub value: String,
}

/// Maps every field to a value. Unmatched fields and fields whose value
/// resolves to empty are left out.
pub fn plan_fill(
    fields: &[FormField],
    mappings: &FieldMappings,
    profile: &ResumeProfile,
    criteria: &JobSearchCriteria,
) -> Vec<FieldAssignment> {
    fields
        .iter()
        .filter_map(|field| {
            let category = classify_field(&field.name, mappings)?;
            let value = resolve_value(category, profile, criteria);
            if value.is_empty() {
                debug!("field {} ({:?}) has no value; leaving blank", field.name, category);
                return None;
            }
            Some(FieldAssignment {
                field: field.clone(),
                category,
                value,
            })
        })
        .collect()
}

pub struct FormFiller<'a, C: Clock + ?Sized> {
    cfg: &'a Config,
    clock: &'a C,
    criteria: JobSearchCriteria,
}

impl<'a, C: Clock + ?Sized> FormFiller<'a, C> {
    pub fn new(cfg: &'a Config, clock: &'a C) -> Self {
        Self {
            cfg,
            clock,
            criteria: JobSearchCriteria::from(&cfg.search),
        }
    }

    /// Waits briefly for a form container and reads its fields. `None` when
    /// no form shows up or it has nothing addressable.
    pub fn detect<P: Page + ?Sized>(&self, page: &mut P) -> Result<Option<Vec<FormField>>> {
        let auto = &self.cfg.automation;
        let containers = &self.cfg.selectors.form_container;
        let appeared = wait_until(self.clock, auto.form_appear(), auto.form_poll(), || {
            Ok(first_present(page, containers).is_some())
        });
        if !appeared {
            debug!("no follow-up form detected");
            return Ok(None);
        }

        let fields: Vec<FormField> = page
            .form_fields(&self.cfg.selectors.form_inputs)?
            .into_iter()
            .filter_map(FormField::from_raw)
            .collect();
        if fields.is_empty() {
            debug!("form detected but it has no addressable fields");
            return Ok(None);
        }
        info!("form detected with {} fields", fields.len());
        Ok(Some(fields))
    }

    /// Returns how many writes succeeded.
    pub fn fill<P: Page + ?Sized>(
        &self,
        page: &mut P,
        fields: &[FormField],
        profile: &ResumeProfile,
    ) -> usize {
        let plan = plan_fill(fields, &self.cfg.field_mappings, profile, &self.criteria);
        let mut written = 0;
        for assignment in &plan {
            match fill_field(page, &assignment.field, &assignment.value) {
                Ok(()) => {
                    written += 1;
                    info!("filled field {} = {}", assignment.field.name, assignment.value);
                }
                Err(err) => warn!("could not fill field {}: {err:#}", assignment.field.name),
            }
        }
        written
    }

    /// Clicks the first present submit control, or presses Enter, then waits.
    pub fn submit<P: Page + ?Sized>(&self, page: &mut P) -> Result<()> {
        match first_present(page, &self.cfg.selectors.submit) {
            Some((selector, button)) => {
                debug!("submitting form via {selector}");
                page.click(&button)?;
            }
            None => {
                debug!("no submit control; pressing Enter");
                page.press_key("Enter")?;
            }
        }
        self.clock.sleep(self.cfg.automation.form_submit_wait());
        Ok(())
    }
}

fn fill_field<P: Page + ?Sized>(page: &mut P, field: &FormField, value: &str) -> Result<()> {
    let name = css_escape(&field.name);
    let by_name_or_id = format!("[name=\"{name}\"], [id=\"{name}\"]");
    match field.kind {
        FieldKind::Select => {
            let choice = match_option(&field.options, value).unwrap_or(value);
            page.select_option(&by_name_or_id, choice)
        }
        FieldKind::Radio | FieldKind::Checkbox => {
            let selector = format!("input[name=\"{name}\"][value=\"{}\"]", css_escape(value));
            page.click_selector(&selector)
        }
        FieldKind::Text | FieldKind::Numeric | FieldKind::LongText => {
            page.type_text(&by_name_or_id, value)
        }
    }
}

pub fn match_option<'o>(options: &'o [String], value: &str) -> Option<&'o str> {
    let needle = value.to_lowercase();
    options
        .iter()
        .find(|o| o.to_lowercase().contains(&needle))
        .map(String::as_str)
}

fn css_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
