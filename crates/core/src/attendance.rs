//! Shift tracking rules.
//!
//! A shift belongs to the calendar day it was started on. Shifts left open
//! past midnight are closed at the last second of that day.

use chrono::{NaiveDate, NaiveDateTime};

labeled_enum! {
    pub enum AttendanceStatus ("attendance status") {
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        AutoCompleted => "AUTO_COMPLETED",
    }
}

pub const AUTO_END_ACTIVITY: &str = "Automatically ended at midnight";

/// Closing instant for an open shift started on `shift_date`, or `None` while
/// the shift still belongs to `today`.
pub fn auto_end_at(shift_date: NaiveDate, today: NaiveDate) -> Option<NaiveDateTime> {
    if shift_date >= today {
        return None;
    }
    shift_date.and_hms_opt(23, 59, 59)
}

/// Whole minutes worked between `start` and `end`, never negative.
pub fn shift_minutes(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - start).num_minutes().max(0)
}

/// An open shift as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenShift {
    pub id: String,
    pub shift_date: NaiveDate,
    pub start_time: NaiveDateTime,
}

/// The update to apply to a stale shift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoEnd {
    pub id: String,
    pub end_time: NaiveDateTime,
    pub total_minutes: i64,
}

/// Select the shifts that must be auto-ended as of `now`.
pub fn plan_auto_end(open: &[OpenShift], now: NaiveDateTime) -> Vec<AutoEnd> {
    let today = now.date();
    open.iter()
        .filter_map(|shift| {
            let end_time = auto_end_at(shift.shift_date, today)?;
            Some(AutoEnd {
                id: shift.id.clone(),
                end_time,
                total_minutes: shift_minutes(shift.start_time, end_time),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_auto_end_only_for_past_days() {
        let today = at("2024-05-02", 0, 0, 0).date();
        assert_eq!(
            auto_end_at(at("2024-05-01", 0, 0, 0).date(), today),
            Some(at("2024-05-01", 23, 59, 59))
        );
        assert_eq!(auto_end_at(today, today), None);
    }

    #[test]
    fn test_shift_minutes() {
        assert_eq!(
            shift_minutes(at("2024-05-01", 9, 0, 0), at("2024-05-01", 17, 30, 59)),
            510
        );
        assert_eq!(
            shift_minutes(at("2024-05-01", 9, 0, 0), at("2024-05-01", 8, 0, 0)),
            0
        );
    }

    #[test]
    fn test_plan_auto_end_after_midnight() {
        let open = vec![
            OpenShift {
                id: "yesterday".into(),
                shift_date: at("2024-05-01", 0, 0, 0).date(),
                start_time: at("2024-05-01", 22, 0, 0),
            },
            OpenShift {
                id: "today".into(),
                shift_date: at("2024-05-02", 0, 0, 0).date(),
                start_time: at("2024-05-02", 0, 5, 0),
            },
        ];

        let plan = plan_auto_end(&open, at("2024-05-02", 0, 10, 0));
        assert_eq!(
            plan,
            vec![AutoEnd {
                id: "yesterday".into(),
                end_time: at("2024-05-01", 23, 59, 59),
                total_minutes: 119,
            }]
        );
    }
}
