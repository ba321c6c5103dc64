use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Abstraction over "current time" to make behavior deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current instant in the process-local timezone. Daily fire times are
    /// expressed in local wall-clock time.
    fn local_now(&self) -> DateTime<Local> {
        self.now().with_timezone(&Local)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new<Tz: TimeZone>(now: DateTime<Tz>) -> Self {
        Self {
            now: now.with_timezone(&Utc),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Next instant at which the wall clock reads `time`, seen from `now`.
///
/// Today's occurrence is used unless it is already in the past, in which case
/// it is pushed forward by exactly 24 hours. An occurrence equal to `now` fires
/// immediately.
pub fn next_daily_occurrence<Tz: TimeZone>(now: &DateTime<Tz>, time: NaiveTime) -> DateTime<Tz> {
    let today = now.date_naive().and_time(time);
    let candidate = resolve_local(&now.timezone(), today);

    if candidate < *now {
        candidate + Duration::hours(24)
    } else {
        candidate
    }
}

/// Map a local wall-clock time onto an instant.
///
/// Ambiguous times (clocks going back) take the earliest instant. Times that
/// fall into a gap (clocks going forward) move to the first valid minute after
/// the gap.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    let mut candidate = naive;
    for _ in 0..(24 * 60) {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(t) => return t,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => candidate += Duration::minutes(1),
        }
    }
    tz.from_utc_datetime(&naive)
}

/// Non-negative time remaining from `now` until `at`.
pub fn duration_until<Tz: TimeZone>(now: &DateTime<Tz>, at: &DateTime<Tz>) -> std::time::Duration {
    at.clone()
        .signed_duration_since(now.clone())
        .to_std()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};
    use chrono_tz::America::New_York;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn past_fire_time_rolls_to_next_day() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let next = next_daily_occurrence(&now, at(8, 30));

        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 11, 8, 30, 0).unwrap());
        assert_eq!(
            duration_until(&now, &next),
            std::time::Duration::from_secs(23 * 3600 + 30 * 60)
        );
    }

    #[test]
    fn future_fire_time_stays_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 7, 15, 0).unwrap();
        let next = next_daily_occurrence(&now, at(8, 30));

        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap());
    }

    #[test]
    fn fire_time_equal_to_now_fires_immediately() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 8, 30, 0).unwrap();
        let next = next_daily_occurrence(&now, at(8, 30));

        assert_eq!(next, now);
        assert_eq!(duration_until(&now, &next), std::time::Duration::ZERO);
    }

    #[test]
    fn fire_time_uses_the_local_offset() {
        let sofia = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = sofia.with_ymd_and_hms(2024, 1, 15, 23, 50, 0).unwrap();
        let next = next_daily_occurrence(&now, at(0, 5));

        assert_eq!(next, sofia.with_ymd_and_hms(2024, 1, 16, 0, 5, 0).unwrap());
        assert_eq!(duration_until(&now, &next), std::time::Duration::from_secs(15 * 60));
    }

    #[test]
    fn fire_time_in_dst_gap_moves_past_the_gap() {
        // 2024-03-10: New York clocks jump from 02:00 to 03:00.
        let now = New_York.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let next = next_daily_occurrence(&now, at(2, 30));

        assert_eq!(
            next.naive_local(),
            NaiveDate::from_ymd_opt(2024, 3, 10)
                .unwrap()
                .and_hms_opt(3, 0, 0)
                .unwrap()
        );
        assert_eq!(
            next.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap()
        );
    }

    #[test]
    fn ambiguous_fire_time_takes_earliest_instant() {
        // 2024-11-03: New York clocks fall back from 02:00 to 01:00, so 01:30
        // happens twice (EDT, then EST).
        let now = New_York.with_ymd_and_hms(2024, 11, 3, 0, 0, 0).unwrap();
        let next = next_daily_occurrence(&now, at(1, 30));

        assert_eq!(
            next.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap()
        );
        assert_eq!(duration_until(&now, &next), std::time::Duration::from_secs(90 * 60));
    }

    #[test]
    fn fixed_clock_reports_its_instant() {
        let fixed = Utc.with_ymd_and_hms(2026, 2, 5, 12, 34, 56).unwrap();
        let clock = FixedClock::new(fixed);
        assert_eq!(clock.now(), fixed);
        assert_eq!(clock.local_now().with_timezone(&Utc), fixed);
    }
}
