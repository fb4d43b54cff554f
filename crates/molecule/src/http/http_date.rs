//! Formatting and parsing of HTTP dates.
//!
//! Dates are always sent in the RFC 1123 format. When parsing, the obsolete RFC 1036
//! and ANSI C `asctime()` formats are accepted as well.

use chrono::{DateTime, NaiveDateTime, Utc};

pub const RFC_1123: &str = "%a, %d %b %Y %H:%M:%S GMT";
pub const RFC_1036: &str = "%A, %d-%b-%y %H:%M:%S GMT";
pub const ASCTIME: &str = "%a %b %e %H:%M:%S %Y";

pub fn format(date: DateTime<Utc>) -> String {
    date.format(RFC_1123).to_string()
}

pub fn parse(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    [RFC_1123, RFC_1036, ASCTIME]
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(value, pattern).ok())
        .map(|date| date.and_utc())
}
