use chrono::{DateTime, Local, NaiveDateTime};

/// Display format for log entry headings and default titles.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ISO_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";
const MONTH_DIR_FORMAT: &str = "%Y-%m";

/// Current local time as ISO-8601, second precision, no offset.
pub fn now_iso() -> String {
    Local::now().format(ISO_SECONDS).to_string()
}

/// Current local time in [`DATETIME_FORMAT`].
pub fn now_display() -> String {
    Local::now().format(DATETIME_FORMAT).to_string()
}

/// Name of the month partition a session created now belongs to.
pub fn current_month_dir() -> String {
    Local::now().format(MONTH_DIR_FORMAT).to_string()
}

/// Parse a stored timestamp into local naive time.
///
/// Accepts the second-precision form we write, fractional seconds, and
/// RFC 3339 strings carrying an offset.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Local).naive_local())
        })
}
