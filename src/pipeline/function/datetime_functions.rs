use chrono::{DateTime, Datelike, Utc};

use crate::pipeline::value::parse_datetime;
use crate::pipeline::Value;

pub fn year(dt: DateTime<Utc>) -> i32 {
    dt.year()
}

pub fn month(dt: DateTime<Utc>) -> i32 {
    dt.month() as i32
}

pub fn day(dt: DateTime<Utc>) -> i32 {
    dt.day() as i32
}

pub fn date_format(dt: DateTime<Utc>, format: String) -> String {
    dt.format(&format).to_string()
}

/// Accepts the same formats the readers accept, unparsable input becomes null.
pub fn to_timestamp(text: String) -> Option<DateTime<Utc>> {
    match parse_datetime(&text) {
        Some(Value::DateTime(dt)) => Some(dt),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_extract() {
        let dt = to_timestamp("2024-05-06 07:08:09".to_string()).unwrap();
        assert_eq!(year(dt), 2024);
        assert_eq!(month(dt), 5);
        assert_eq!(day(dt), 6);
        assert_eq!(date_format(dt, "%Y/%m".to_string()), "2024/05");
    }

    #[test]
    fn bad_input_is_none() {
        assert!(to_timestamp("not a date".to_string()).is_none());
    }
}
