use crate::util::compile_patterns;
use regex::Regex;
use std::sync::LazyLock;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};

static RELATIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_patterns(&[r"^(\d+)\+?\s*(minute|min|hour|hr|day|week|month)s?\s*ago$"])
});

/// Card text ("Today", "3 Days Ago", "30+ Days Ago", ISO dates) resolved
/// against `now`. Unparseable text, including offsets too large to represent,
/// maps to the Unix epoch so such postings sort last.
pub fn parse_posted_date(raw: &str, now: OffsetDateTime) -> OffsetDateTime {
    let text = raw.trim();
    let lower = text.to_ascii_lowercase();

    if lower.is_empty() {
        return OffsetDateTime::UNIX_EPOCH;
    }
    if matches!(
        lower.as_str(),
        "just now" | "today" | "few hours ago" | "a few hours ago" | "just posted"
    ) {
        return now;
    }
    if lower == "yesterday" {
        return now - Duration::days(1);
    }

    if let Some(caps) = RELATIVE.iter().find_map(|re| re.captures(&lower)) {
        let dt = relative_offset(&caps[1], &caps[2]).and_then(|delta| now.checked_sub(delta));
        if dt.is_none() {
            tracing::debug!("posted date out of range: {text:?}");
        }
        return dt.unwrap_or(OffsetDateTime::UNIX_EPOCH);
    }

    if let Ok(dt) = OffsetDateTime::parse(text, &Rfc3339) {
        return dt;
    }
    if let Ok(date) = Date::parse(text, format_description!("[year]-[month]-[day]")) {
        return date.midnight().assume_utc();
    }

    tracing::debug!("unrecognised posted date: {text:?}");
    OffsetDateTime::UNIX_EPOCH
}

fn relative_offset(count: &str, unit: &str) -> Option<Duration> {
    let n: i64 = count.parse().ok()?;
    let days = match unit {
        "minute" | "min" | "hour" | "hr" => return Some(Duration::ZERO),
        "day" => n,
        "week" => n.checked_mul(7)?,
        _ => n.checked_mul(30)?,
    };
    days.checked_mul(86_400).map(Duration::seconds)
}
