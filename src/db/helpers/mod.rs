use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

/// ISO-8601 in UTC with millisecond precision and a `Z` suffix,
/// e.g. `2026-10-17T08:30:00.123Z`.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Calendar date (UTC) used in export file names.
pub fn export_date(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d").to_string()
}
