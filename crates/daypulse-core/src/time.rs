//! Calendar-date helpers for sampling windows.
//!
//! Sampling always targets whole past days: the default date is yesterday,
//! and period runs cover every day up to but excluding today.

use chrono::{Duration, Local, NaiveDate};

/// Returns yesterday's date in local time.
///
/// This is the default sampling target: today's metrics are still being
/// written by the tracker, yesterday's are complete.
pub fn yesterday() -> NaiveDate {
    Local::now().date_naive() - Duration::days(1)
}

/// Returns every day from `start` up to (excluding) today, oldest first.
///
/// Empty when `start` is today or later.
pub fn days_until_today(start: NaiveDate) -> Vec<NaiveDate> {
    let today = Local::now().date_naive();
    let mut days = Vec::new();
    let mut day = start;
    while day < today {
        days.push(day);
        day += Duration::days(1);
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yesterday_is_one_day_back() {
        let today = Local::now().date_naive();
        assert_eq!(yesterday(), today - Duration::days(1));
    }

    #[test]
    fn days_until_today_ends_at_yesterday() {
        let start = Local::now().date_naive() - Duration::days(3);
        let days = days_until_today(start);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0], start);
        assert_eq!(*days.last().unwrap(), yesterday());
    }

    #[test]
    fn days_until_today_empty_for_today() {
        let today = Local::now().date_naive();
        assert!(days_until_today(today).is_empty());
    }

    #[test]
    fn days_until_today_empty_for_future_start() {
        let tomorrow = Local::now().date_naive() + Duration::days(1);
        assert!(days_until_today(tomorrow).is_empty());
    }
}
