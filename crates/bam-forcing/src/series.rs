//! Daily forcing series
//!
//! Daily data is keyed by calendar date. Coverage of the simulation
//! window is validated up front so a missing day inside the run is an
//! anomaly, not a routine condition.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{ForcingError, Result};

/// One value per day
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailySeries {
    values: BTreeMap<NaiveDate, f64>,
}

impl DailySeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, value: f64) {
        self.values.insert(date, value);
    }

    pub fn value(&self, date: NaiveDate) -> Option<f64> {
        self.values.get(&date).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Fail when the series does not span `[start, end]`
    pub fn check_coverage(&self, label: &str, start: NaiveDate, end: NaiveDate) -> Result<()> {
        check_range(label, self.values.keys().copied(), start, end)
    }
}

impl FromIterator<(NaiveDate, f64)> for DailySeries {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// One value per day and station
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationSeries {
    days: BTreeMap<NaiveDate, IndexMap<String, f64>>,
}

impl StationSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, station: impl Into<String>, value: f64) {
        self.days.entry(date).or_default().insert(station.into(), value);
    }

    /// The full station map for one day
    pub fn day(&self, date: NaiveDate) -> Option<&IndexMap<String, f64>> {
        self.days.get(&date)
    }

    pub fn station_value(&self, date: NaiveDate, station: &str) -> Option<f64> {
        self.days.get(&date)?.get(station).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn check_coverage(&self, label: &str, start: NaiveDate, end: NaiveDate) -> Result<()> {
        check_range(label, self.days.keys().copied(), start, end)
    }
}

/// One optionally-missing value per day and station; `None` is a gap in
/// the gauge record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GaugeSeries {
    days: BTreeMap<NaiveDate, IndexMap<String, Option<f64>>>,
}

impl GaugeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, station: impl Into<String>, value: Option<f64>) {
        self.days.entry(date).or_default().insert(station.into(), value);
    }

    pub fn day(&self, date: NaiveDate) -> Option<&IndexMap<String, Option<f64>>> {
        self.days.get(&date)
    }

    /// `None` when the day or station is absent; `Some(None)` is a gap
    pub fn station_value(&self, date: NaiveDate, station: &str) -> Option<Option<f64>> {
        self.days.get(&date)?.get(station).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn check_coverage(&self, label: &str, start: NaiveDate, end: NaiveDate) -> Result<()> {
        check_range(label, self.days.keys().copied(), start, end)
    }
}

fn check_range(
    label: &str,
    mut dates: impl Iterator<Item = NaiveDate>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<()> {
    let Some(first) = dates.next() else {
        return Err(ForcingError::Empty {
            series: label.into(),
        });
    };
    let last = dates.last().unwrap_or(first);

    if start < first || end > last {
        return Err(ForcingError::Coverage {
            series: label.into(),
            first,
            last,
            start,
            end,
        });
    }
    Ok(())
}
