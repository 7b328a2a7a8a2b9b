//! Timestamp helpers for SMS display.
//!
//! All timestamps are stored and compared in UTC; these helpers only format
//! them for outbound message bodies. Converting to a patient-facing time zone
//! is a presentation concern handled outside this service.

use chrono::{DateTime, Utc};

/// Format a slot start time for an SMS body, e.g. "Nov 1 at 2:00 PM UTC".
pub fn format_slot_time(dt: DateTime<Utc>) -> String {
    dt.format("%b %-d at %-I:%M %p UTC").to_string()
}

/// Format a hold window for an SMS body, e.g. "7 min".
pub fn format_hold_window(minutes: i64) -> String {
    format!("{} min", minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_slot_time_without_zero_padding() {
        let dt = Utc.with_ymd_and_hms(2025, 11, 1, 14, 0, 0).unwrap();
        assert_eq!(format_slot_time(dt), "Nov 1 at 2:00 PM UTC");
    }

    #[test]
    fn formats_hold_window() {
        assert_eq!(format_hold_window(7), "7 min");
    }
}
