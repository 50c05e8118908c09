//! Date and day-count helpers
//!
//! Invoice due dates and entry timestamps are full UTC datetimes so that
//! processing is independent of server and client time zones; interest
//! accrual works on plain dates. These helpers bridge the two.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Number of whole days from `from` to `to`, floored towards negative
/// infinity. A result of -1 means `to` is up to one day before `from`.
///
/// Used for late-day counts, which may legitimately be negative while an
/// invoice is not yet due.
pub fn floor_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().div_euclid(86_400)
}

/// Number of calendar days from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Midnight UTC at the start of the given date
pub fn start_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is valid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_days_between() {
        let due = Utc.with_ymd_and_hms(2018, 5, 1, 0, 0, 0).unwrap();

        let later = Utc.with_ymd_and_hms(2018, 5, 8, 12, 0, 0).unwrap();
        assert_eq!(floor_days_between(due, later), 7);

        let same_day = Utc.with_ymd_and_hms(2018, 5, 1, 23, 0, 0).unwrap();
        assert_eq!(floor_days_between(due, same_day), 0);
    }

    #[test]
    fn test_floor_days_between_negative() {
        let due = Utc.with_ymd_and_hms(2018, 5, 1, 0, 0, 0).unwrap();

        let just_before = Utc.with_ymd_and_hms(2018, 4, 30, 23, 0, 0).unwrap();
        assert_eq!(floor_days_between(due, just_before), -1);

        let week_before = Utc.with_ymd_and_hms(2018, 4, 24, 0, 0, 0).unwrap();
        assert_eq!(floor_days_between(due, week_before), -7);
    }

    #[test]
    fn test_days_between() {
        let a = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2017, 3, 1).unwrap();
        assert_eq!(days_between(a, b), 59);
        assert_eq!(days_between(b, a), -59);
    }

    #[test]
    fn test_start_of_day_utc() {
        let d = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let t = start_of_day_utc(d);
        assert_eq!(t, Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap());
    }
}
