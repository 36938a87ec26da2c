//! Exchange-local trading calendar.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc, Weekday,
};

/// Maps wall-clock instants onto exchange-local trading days.
///
/// The trading day is the calendar date in the exchange's time zone, so a
/// process running in UTC still resets its daily counters at local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingCalendar {
    offset: FixedOffset,
}

impl TradingCalendar {
    /// Calendar for an exchange at the given UTC offset in hours.
    ///
    /// Out-of-range offsets fall back to UTC.
    #[must_use]
    pub fn from_utc_offset_hours(hours: i32) -> Self {
        let offset = FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    /// The exchange's UTC offset.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Trading day containing `now`.
    #[must_use]
    pub fn trading_day(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Exchange-local wall-clock time of `now`.
    #[must_use]
    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveTime {
        now.with_timezone(&self.offset).time()
    }

    /// Whether the exchange is open on `day`. Weekends only; holidays are not modelled.
    #[must_use]
    pub fn is_session_day(&self, day: NaiveDate) -> bool {
        !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Next instant strictly after `now` at which the local clock reads `at`
    /// on a session day.
    #[must_use]
    pub fn next_occurrence(&self, now: DateTime<Utc>, at: NaiveTime) -> Option<DateTime<Utc>> {
        let mut day = self.trading_day(now);
        // A week always contains a session day.
        for _ in 0..8 {
            if self.is_session_day(day) {
                let candidate = self
                    .offset
                    .from_local_datetime(&day.and_time(at))
                    .single()
                    .map(|local| local.with_timezone(&Utc));
                if let Some(candidate) = candidate
                    && candidate > now
                {
                    return Some(candidate);
                }
            }
            day = day.succ_opt()?;
        }
        None
    }
}

impl Default for TradingCalendar {
    fn default() -> Self {
        Self::from_utc_offset_hours(9)
    }
}
