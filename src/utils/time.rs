//! Time formatting for bake identities and timestamps

use chrono::{DateTime, FixedOffset, Local};

/// Plain date key, as used by single-day bake files
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date plus time of day, second precision
pub const IDENTITY_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// `YYYY-MM-DD` for a timestamp
pub fn date_key(ts: &DateTime<Local>) -> String {
    ts.format(DATE_FORMAT).to_string()
}

/// `YYYY-MM-DD_HH-MM-SS` for a timestamp
pub fn identity_key(ts: &DateTime<Local>) -> String {
    ts.format(IDENTITY_FORMAT).to_string()
}

/// Today's date key
pub fn today() -> String {
    date_key(&Local::now())
}

/// Parse an RFC 3339 timestamp as sent back by API clients
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
}
