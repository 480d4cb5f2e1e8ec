use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

/// Asia/Kolkata has a fixed +05:30 offset and no daylight saving.
const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

const LOCAL_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

fn ist() -> anyhow::Result<FixedOffset> {
    FixedOffset::east_opt(IST_OFFSET_SECONDS).context("invalid IST offset")
}

/// Parses an ISO-8601 date-time. Strings with an offset or `Z` are taken as
/// given; local date-times without one are read as India Standard Time.
pub fn parse_iso8601(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }

    let naive = LOCAL_DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .with_context(|| format!("not an ISO-8601 date-time: {:?}", s))?;
    let local = naive
        .and_local_timezone(ist()?)
        .single()
        .context("ambiguous local time")?;
    Ok(local.with_timezone(&Utc))
}

/// Renders an instant for notification bodies, e.g. `05 MAR 25 09:30 AM`.
pub fn format_ist(at: Option<DateTime<Utc>>) -> String {
    let Some(at) = at else {
        return "N/A".to_string();
    };
    let Ok(ist) = ist() else {
        return "N/A".to_string();
    };
    at.with_timezone(&ist)
        .format("%d %b %y %I:%M %p")
        .to_string()
        .to_uppercase()
}
