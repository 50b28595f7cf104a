//! Weekly report period rules.

use chrono::NaiveDate;

use crate::time::inclusive_days;
use crate::CoreError;

/// Longest period a single weekly report may cover, in days.
pub const MAX_REPORT_DAYS: i64 = 7;

pub fn validate_period(from: NaiveDate, to: NaiveDate) -> Result<(), CoreError> {
    if from > to {
        return Err(CoreError::InvalidRange(
            "from_date must not be after to_date".into(),
        ));
    }
    if inclusive_days(from, to) > MAX_REPORT_DAYS {
        return Err(CoreError::InvalidRange(format!(
            "a weekly report covers at most {MAX_REPORT_DAYS} days"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    #[test]
    fn test_validate_period() {
        assert!(validate_period(d(1), d(7)).is_ok());
        assert!(validate_period(d(3), d(3)).is_ok());
        assert!(validate_period(d(1), d(8)).is_err());
        assert!(validate_period(d(5), d(4)).is_err());
    }
}
