//! Upcoming-birthday window arithmetic.
//!
//! A birthday is "upcoming" when its next anniversary, counted from `today`,
//! is at most `window_days` days away. Today itself counts, and the window
//! rolls over the year end (Dec 28 with a 7 day window reaches Jan 4).

use chrono::{Datelike, NaiveDate};

/// The birthday's anniversary in `year`. Feb 29 maps to Feb 28 in common years.
pub fn anniversary_in(birthday: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, birthday.month(), birthday.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 2, 28))
}

/// First anniversary on or after `today`.
pub fn next_occurrence(birthday: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    match anniversary_in(birthday, today.year()) {
        Some(date) if date >= today => Some(date),
        _ => anniversary_in(birthday, today.year() + 1),
    }
}

/// Days until the next anniversary, zero when it is today.
pub fn days_until(birthday: NaiveDate, today: NaiveDate) -> Option<i64> {
    next_occurrence(birthday, today).map(|next| (next - today).num_days())
}

pub fn is_upcoming(birthday: NaiveDate, today: NaiveDate, window_days: i64) -> bool {
    matches!(days_until(birthday, today), Some(days) if days <= window_days)
}
