//! Simulation clock
//!
//! Calendar time drives the daily forcing keys; Unix seconds drive the
//! tide and MSL interpolators. User-entered start and end times are
//! snapped down to the hour.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::{Result, SimError};

/// Fixed-step simulation clock
#[derive(Debug, Clone)]
pub struct SimClock {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub current_time: NaiveDateTime,

    /// Seconds since 1970-01-01 00:00 at `current_time`
    pub unix_time: i64,

    /// (s)
    pub timestep: u32,
}

impl SimClock {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, timestep: u32) -> Result<Self> {
        if timestep == 0 {
            return Err(SimError::Config("timestep must be positive".into()));
        }

        let start = snap_to_hour(start);
        let end = snap_to_hour(end);
        if start > end {
            return Err(SimError::StartAfterEnd { start, end });
        }

        Ok(Self {
            start_time: start,
            end_time: end,
            current_time: start,
            unix_time: start.and_utc().timestamp(),
            timestep,
        })
    }

    /// Advance one timestep
    pub fn advance(&mut self) {
        self.current_time += Duration::seconds(self.timestep as i64);
        self.unix_time += self.timestep as i64;
    }

    /// Daily key for rain, ET, salinity and runoff lookups
    pub fn day_key(&self) -> NaiveDate {
        self.current_time.date()
    }

    pub fn timesteps_per_day(&self) -> f64 {
        86_400.0 / self.timestep as f64
    }

    /// Seconds since the start of the run
    pub fn elapsed_seconds(&self) -> i64 {
        (self.current_time - self.start_time).num_seconds()
    }
}

/// Drop minutes and seconds from a user-entered time
fn snap_to_hour(time: NaiveDateTime) -> NaiveDateTime {
    let into_hour = (time.minute() * 60 + time.second()) as i64;
    time - Duration::seconds(into_hour)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn start_and_end_snap_down_to_the_hour() {
        let clock = SimClock::new(
            datetime("2010-01-01T08:43:17"),
            datetime("2010-01-02T00:59:59"),
            360,
        )
        .unwrap();

        assert_eq!(clock.start_time, datetime("2010-01-01T08:00:00"));
        assert_eq!(clock.end_time, datetime("2010-01-02T00:00:00"));
        assert_eq!(clock.current_time, clock.start_time);
    }

    #[test]
    fn unix_time_counts_from_the_epoch() {
        let clock = SimClock::new(
            datetime("2010-01-01T00:00:00"),
            datetime("2010-01-02T00:00:00"),
            60,
        )
        .unwrap();
        assert_eq!(clock.unix_time, 1_262_304_000);
    }

    #[test]
    fn advance_moves_both_clocks() {
        let mut clock = SimClock::new(
            datetime("2010-01-01T23:57:00"),
            datetime("2010-01-02T12:00:00"),
            360,
        )
        .unwrap();
        // Snapped to 23:00
        let unix_before = clock.unix_time;

        for _ in 0..12 {
            clock.advance();
        }

        assert_eq!(clock.current_time, datetime("2010-01-02T00:12:00"));
        assert_eq!(clock.unix_time, unix_before + 12 * 360);
        assert_eq!(clock.day_key(), "2010-01-02".parse().unwrap());
    }

    #[test]
    fn rejects_start_after_end() {
        let err = SimClock::new(
            datetime("2010-01-02T00:00:00"),
            datetime("2010-01-01T00:00:00"),
            360,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::StartAfterEnd { .. }));
    }

    #[test]
    fn rejects_zero_timestep() {
        let err = SimClock::new(
            datetime("2010-01-01T00:00:00"),
            datetime("2010-01-02T00:00:00"),
            0,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn timesteps_per_day() {
        let clock = SimClock::new(
            datetime("2010-01-01T00:00:00"),
            datetime("2010-01-02T00:00:00"),
            360,
        )
        .unwrap();
        assert_eq!(clock.timesteps_per_day(), 240.0);
    }
}
