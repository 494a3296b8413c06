//! Bounded history window: one calendar day in local time.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};

/// Half-open time range `[start, end)` used for history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl HistoryWindow {
    /// The current local calendar day.
    pub fn today() -> Self {
        Self::day_containing(Local::now())
    }

    /// The calendar day containing `at`, in `at`'s own time zone.
    pub fn day_containing<Tz: TimeZone>(at: DateTime<Tz>) -> Self {
        let tz = at.timezone();
        let date = at.date_naive();
        let next = date.succ_opt().unwrap_or(date);
        Self {
            start: local_midnight(&tz, date),
            end: local_midnight(&tz, next),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    if let Some(start) = tz.from_local_datetime(&naive).earliest() {
        return start.with_timezone(&Utc);
    }
    // Midnight was skipped by a DST jump; the day begins at the first valid hour.
    let shifted = naive + TimeDelta::hours(1);
    tz.from_local_datetime(&shifted)
        .earliest()
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}
