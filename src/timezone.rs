//! Rendering of stored UTC timestamps in the configured display offset.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, ParseError, TimeZone, Utc};

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Parses offsets written as `+HH:MM` or `-HH:MM`, plus `Z`/`UTC` for zero.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ParseError> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    value.parse::<FixedOffset>()
}

pub fn localize(offset: &FixedOffset, utc: NaiveDateTime) -> DateTime<FixedOffset> {
    Utc.from_utc_datetime(&utc).with_timezone(offset)
}

pub fn format_local(offset: &FixedOffset, utc: NaiveDateTime, format: &str) -> String {
    localize(offset, utc).format(format).to_string()
}

pub fn today(offset: &FixedOffset) -> String {
    format_local(offset, Utc::now().naive_utc(), DATE_FORMAT)
}
