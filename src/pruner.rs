//! Pure clock math for the day-end pruner (§4.6).
//!
//! Kept separate from `orderbook` so the DST-sensitive arithmetic can be
//! unit tested without spinning up a background thread.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Local, LocalResult, NaiveTime, TimeZone};

use crate::config::EngineConfig;

/// Computes the next instant, in local civil time, at which GoodForDay
/// orders should be pruned.
///
/// Rolls forward to the next day if `now` is already at or past the
/// configured cutoff, then adds `config.cutoff_slack` so the pruner never
/// wakes fractionally before the cutoff due to clock rounding.
///
/// Handles both DST transitions explicitly: a cutoff that falls in a
/// spring-forward gap is bumped forward by an hour into the time that
/// actually exists; a cutoff that falls in a fall-back repeated hour picks
/// the earlier occurrence.
pub fn next_cutoff(now: DateTime<Local>, config: &EngineConfig) -> DateTime<Local> {
    let cutoff_time = NaiveTime::from_hms_opt(config.cutoff_hour, config.cutoff_minute, 0)
        .expect("cutoff_hour/cutoff_minute must form a valid time of day");

    let mut date = now.date_naive();
    if now.time() >= cutoff_time {
        date = date.succ_opt().expect("date arithmetic overflowed");
    }
    let naive = date.and_time(cutoff_time);

    let local = match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _latest) => earliest,
        LocalResult::None => {
            // The cutoff falls inside a spring-forward gap; there is no
            // such wall-clock instant, so prune an hour later instead.
            let bumped = naive + ChronoDuration::hours(1);
            Local
                .from_local_datetime(&bumped)
                .single()
                .expect("local time after DST gap adjustment must be unambiguous")
        }
    };

    local + ChronoDuration::from_std(config.cutoff_slack).expect("cutoff_slack is too large")
}

/// How long the pruner should block waiting for `now` to reach the next
/// cutoff. Saturates to zero rather than going negative.
pub fn wait_duration(now: DateTime<Local>, config: &EngineConfig) -> Duration {
    let next = next_cutoff(now, config);
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn utc_as_local(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        // Tests run wherever CI's TZ is set; we only assert properties that
        // hold regardless of the local offset (ordering, rollover), not
        // absolute instants.
        Local
            .with_ymd_and_hms(y, m, d, h, mi, s)
            .single()
            .expect("constructed a valid local datetime")
    }

    #[test]
    fn before_cutoff_same_day() {
        let config = EngineConfig::default();
        let now = utc_as_local(2026, 3, 10, 9, 0, 0);
        let next = next_cutoff(now, &config);
        assert_eq!(next.date_naive(), now.date_naive());
        assert_eq!(next.time().hour_minute(), (16, 0));
    }

    #[test]
    fn at_or_after_cutoff_rolls_to_next_day() {
        let config = EngineConfig::default();
        let now = utc_as_local(2026, 3, 10, 16, 0, 0);
        let next = next_cutoff(now, &config);
        assert_eq!(next.date_naive(), now.date_naive().succ_opt().unwrap());

        let now = utc_as_local(2026, 3, 10, 23, 59, 59);
        let next = next_cutoff(now, &config);
        assert_eq!(next.date_naive(), now.date_naive().succ_opt().unwrap());
    }

    #[test]
    fn slack_is_added_on_top_of_the_cutoff() {
        let config = EngineConfig::default();
        let now = utc_as_local(2026, 3, 10, 9, 0, 0);
        let next = next_cutoff(now, &config);
        let naive_cutoff = now.date_naive().and_hms_opt(16, 0, 0).unwrap();
        let cutoff_local = Local.from_local_datetime(&naive_cutoff).single().unwrap();
        assert_eq!(next, cutoff_local + ChronoDuration::milliseconds(100));
    }

    #[test]
    fn wait_duration_is_never_negative() {
        let config = EngineConfig::default();
        let now = utc_as_local(2026, 3, 10, 15, 59, 59);
        let wait = wait_duration(now, &config);
        assert!(wait > Duration::ZERO);
        assert!(wait < Duration::from_secs(2));
    }

    trait TimeParts {
        fn hour_minute(&self) -> (u32, u32);
    }

    impl TimeParts for NaiveTime {
        fn hour_minute(&self) -> (u32, u32) {
            use chrono::Timelike;
            (self.hour(), self.minute())
        }
    }
}
