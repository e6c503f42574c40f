use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Output format for dates: `dd/mm/yyyy`.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y";

/// Date-time layouts tried after RFC 3339.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Date-time layouts with a UTC offset, tried after RFC 3339.
const OFFSET_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Date-only layouts.
/// Slash-separated dates are read day first, so already formatted values parse back to themselves.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d.%m.%Y"];

/// Parse an ISO-like date or date-time string into a calendar date.
///
/// Time zone offsets are kept as written, so `2024-05-01T23:30:00-03:00` is the 1st of May.
///
/// # Errors
/// Returns an error if none of the supported layouts match.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return Err(anyhow!("Empty date string"));
    }

    if let Some(datetime) = DateTime::parse_from_rfc3339(text).ok().or_else(|| {
        OFFSET_DATETIME_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(text, format).ok())
    }) {
        return Ok(datetime.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|datetime| datetime.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        })
        .ok_or_else(|| anyhow!("Unrecognized date: '{text}'"))
}

/// Format a date string as `dd/mm/yyyy`.
///
/// Absent input stays absent. Input that cannot be parsed is returned unchanged
/// and the reason is printed as a warning.
#[must_use]
pub fn format_date(text: Option<&str>) -> Option<String> {
    let text = text?;
    match parse_date(text) {
        Ok(date) => Some(date.format(DISPLAY_FORMAT).to_string()),
        Err(error) => {
            crate::print_warning(&format!("Failed to format date: {error}"));
            Some(text.to_string())
        }
    }
}
