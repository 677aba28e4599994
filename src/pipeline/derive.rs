//! Field derivation utilities: pure functions computing derived and
//! defaulted values resolved during schema validation.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Age in whole years completed as of `today`.
///
/// Counts `today.year - birthday.year`, minus one when today's (month, day)
/// still precedes the birthday's (month, day).
pub fn age_on(today: NaiveDate, birthday: NaiveDate) -> i32 {
    let mut age = today.year() - birthday.year();
    if (today.month(), today.day()) < (birthday.month(), birthday.day()) {
        age -= 1;
    }
    age
}

/// Default for `createdAt` when the caller omits it.
pub fn default_created_at() -> DateTime<Utc> {
    Utc::now()
}

/// Default for `startDate` when the caller omits it.
pub fn default_start_date() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn age_one_day_before_anniversary() {
        assert_eq!(age_on(d(2024, 12, 24), d(2000, 12, 25)), 23);
    }

    #[test]
    fn age_on_anniversary() {
        assert_eq!(age_on(d(2024, 12, 25), d(2000, 12, 25)), 24);
    }

    #[test]
    fn age_after_anniversary() {
        assert_eq!(age_on(d(2025, 1, 1), d(2000, 12, 25)), 24);
    }

    #[test]
    fn age_earlier_month() {
        assert_eq!(age_on(d(2024, 6, 1), d(2000, 12, 25)), 23);
    }
}
