//! Parsing of user-supplied due dates.

use anyhow::{anyhow, Context, Result};
use chrono::{prelude::*, Duration, Months};

/// Time of day used when a specification names only a date.
const DEFAULT_HOUR: u32 = 9;

/// Resolve a date specification such as `2025-01-01`, `2025-01-01 18:30`,
/// an RFC 3339 timestamp, `now`, `today`, `tomorrow`, `+3d`, `mon` or `18:30`.
pub fn parse_date_spec(spec: &str) -> Result<DateTime<Utc>> {
    parse_date_spec_at(spec, Local::now())
}

fn parse_date_spec_at(spec: &str, now_local: DateTime<Local>) -> Result<DateTime<Utc>> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Date specification cannot be empty"));
    }

    let lower = trimmed.to_ascii_lowercase();
    match lower.as_str() {
        "now" => return Ok(now_local.with_timezone(&Utc)),
        "today" => return at_default_hour(now_local.date_naive()),
        "tomorrow" => return at_default_hour(now_local.date_naive() + Duration::days(1)),
        _ => {}
    }

    if lower.starts_with('+') {
        return parse_relative_spec(&lower, now_local);
    }

    if let Some(weekday) = parse_weekday(&lower) {
        let mut days_ahead = (weekday.num_days_from_monday() as i64
            - now_local.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        if days_ahead == 0 {
            days_ahead = 7;
        }
        return at_default_hour(now_local.date_naive() + Duration::days(days_ahead));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return local_to_utc(naive);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return at_default_hour(date);
    }

    if let Ok(time) = NaiveTime::parse_from_str(trimmed, "%H:%M") {
        return local_to_utc(now_local.date_naive().and_time(time));
    }

    Err(anyhow!(
        "Unrecognized date specification '{}'. Try YYYY-MM-DD, 'YYYY-MM-DD HH:MM', today, tomorrow, +3d, mon",
        spec
    ))
}

fn parse_relative_spec(spec: &str, now_local: DateTime<Local>) -> Result<DateTime<Utc>> {
    let body = spec.strip_prefix('+').unwrap_or(spec);
    let mut chars = body.chars();
    let unit = chars
        .next_back()
        .ok_or_else(|| anyhow!("Relative date '{}' is too short", spec))?;
    let number_part = chars.as_str();
    if number_part.is_empty() {
        return Err(anyhow!("Relative date '{}' is too short", spec));
    }
    let value: i64 = number_part.parse().context("Invalid relative offset")?;

    let target = match unit {
        'h' => Duration::try_hours(value).and_then(|d| now_local.checked_add_signed(d)),
        'd' => Duration::try_days(value).and_then(|d| now_local.checked_add_signed(d)),
        'w' => Duration::try_weeks(value).and_then(|d| now_local.checked_add_signed(d)),
        'm' => {
            let months = u32::try_from(value).context("Invalid month offset")?;
            now_local.checked_add_months(Months::new(months))
        }
        other => {
            return Err(anyhow!(
                "Unsupported relative unit '{}'. Use h, d, w, or m.",
                other
            ))
        }
    }
    .ok_or_else(|| anyhow!("Relative date '{}' is out of range", spec))?;
    Ok(target.with_timezone(&Utc))
}

fn parse_weekday(label: &str) -> Option<Weekday> {
    match label {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn at_default_hour(date: NaiveDate) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(DEFAULT_HOUR, 0, 0)
        .ok_or_else(|| anyhow!("Invalid time of day for {}", date))?;
    local_to_utc(naive)
}

fn local_to_utc(naive: NaiveDateTime) -> Result<DateTime<Utc>> {
    // earliest() picks the first instant of an ambiguous (DST fold) local time.
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("Local time {} does not exist in this time zone", naive))
}
