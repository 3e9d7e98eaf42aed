//! Due and reminder times shared by every task in a batch.

use chrono::{Duration, NaiveDateTime};

/// Hour of the day (local wall clock) tasks are due.
pub const DUE_HOUR: u32 = 10;

/// Wall-clock format the Graph `dateTimeTimeZone` type expects.
const GRAPH_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Due and reminder times for one submission batch.
///
/// # Invariants
/// - `reminder == due - 1 hour`
/// - Computed once per batch, so every task in the batch shares it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSchedule {
    due: NaiveDateTime,
    reminder: NaiveDateTime,
}

impl ReminderSchedule {
    /// Tomorrow at 10:00, relative to the local time `now`.
    pub fn next_day(now: NaiveDateTime) -> Self {
        let next = now + Duration::days(1);
        let due = next.date().and_hms_opt(DUE_HOUR, 0, 0).unwrap_or(next);
        Self::due_at(due)
    }

    /// Schedule with an explicit due time; the reminder fires an hour earlier.
    pub fn due_at(due: NaiveDateTime) -> Self {
        Self {
            due,
            reminder: due - Duration::hours(1),
        }
    }

    #[cfg(test)]
    pub(crate) fn due(&self) -> NaiveDateTime {
        self.due
    }

    #[cfg(test)]
    pub(crate) fn reminder(&self) -> NaiveDateTime {
        self.reminder
    }

    pub fn due_string(&self) -> String {
        self.due.format(GRAPH_DATE_TIME_FORMAT).to_string()
    }

    pub fn reminder_string(&self) -> String {
        self.reminder.format(GRAPH_DATE_TIME_FORMAT).to_string()
    }
}

/// Parse a Graph wall-clock string back into a `NaiveDateTime`.
#[cfg(test)]
pub(crate) fn parse_graph_date_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, GRAPH_DATE_TIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn due_tomorrow_at_ten() {
        let schedule = ReminderSchedule::next_day(at(2026, 3, 14, 16, 42));
        assert_eq!(schedule.due_string(), "2026-03-15T10:00:00");
        assert_eq!(schedule.reminder_string(), "2026-03-15T09:00:00");
    }

    #[test]
    fn rolls_over_month_and_year() {
        let schedule = ReminderSchedule::next_day(at(2026, 12, 31, 23, 59));
        assert_eq!(schedule.due_string(), "2027-01-01T10:00:00");

        let schedule = ReminderSchedule::next_day(at(2028, 2, 28, 0, 5));
        assert_eq!(schedule.due_string(), "2028-02-29T10:00:00");
    }

    #[test]
    fn reminder_is_arithmetic_not_textual() {
        let schedule = ReminderSchedule::due_at(at(2026, 5, 1, 0, 30));
        assert_eq!(schedule.reminder_string(), "2026-04-30T23:30:00");
        assert_eq!(schedule.due() - schedule.reminder(), Duration::hours(1));
    }

    #[test]
    fn graph_strings_parse_back() {
        let schedule = ReminderSchedule::next_day(at(2026, 7, 4, 8, 0));
        assert_eq!(
            parse_graph_date_time(&schedule.due_string()),
            Some(schedule.due())
        );
        assert_eq!(parse_graph_date_time("not a date"), None);
    }
}
