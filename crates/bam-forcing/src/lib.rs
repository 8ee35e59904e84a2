//! BAM Forcing - time-indexed inputs for the Bay Assessment Model
//!
//! Holds every forcing the simulation reads during a run: daily rain,
//! ET, runoff stage and gauge salinity series, hourly tide interpolators
//! per boundary basin, the seasonal mean-sea-level spline, and fixed and
//! time-varying boundary-condition tables.
//!
//! All stores are built before the run starts and are read-only inside
//! the simulation loop.

pub mod boundary;
pub mod interp;
pub mod series;

pub use boundary::{BcKind, FixedBc, RunoffStageBinding};
pub use interp::{CubicSpline, LinearSeries};
pub use series::{DailySeries, GaugeSeries, StationSeries};

use chrono::NaiveDate;
use indexmap::IndexMap;

/// Error types for forcing construction and lookup
#[derive(Debug, thiserror::Error)]
pub enum ForcingError {
    #[error("invalid boundary condition kind '{0}', expected 'flow' or 'stage'")]
    InvalidBcKind(String),

    #[error("interpolation series needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("interpolation times must be strictly increasing")]
    UnsortedTimes,

    #[error("spline system could not be solved")]
    SplineSolve,

    #[error("time {time} is outside the {series} series")]
    OutOfRange { series: String, time: f64 },

    #[error(
        "{series} data covers {first} to {last}, which does not span the simulation window {start} to {end}"
    )]
    Coverage {
        series: String,
        first: NaiveDate,
        last: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("{series} data is empty")]
    Empty { series: String },
}

pub type Result<T> = std::result::Result<T, ForcingError>;

/// Every forcing store consumed by the simulation loop
#[derive(Debug, Clone, Default)]
pub struct ForcingData {
    /// Daily rain per station (cm/day)
    pub rain: StationSeries,

    /// Daily potential ET (mm/day)
    pub et: DailySeries,

    /// Daily EDEN stage per station, offset to MSL (m)
    pub runoff_stage: StationSeries,

    /// Daily gauge salinity per station (g/kg); gaps are `None`
    pub salinity: GaugeSeries,

    /// Demeaned tide per boundary basin number, over Unix seconds (m)
    pub tides: IndexMap<u32, LinearSeries>,

    /// Seasonal mean-sea-level anomaly over Unix seconds (m)
    pub seasonal_msl: Option<CubicSpline>,

    /// Basin number -> fixed boundary condition
    pub fixed_bcs: IndexMap<u32, FixedBc>,

    /// Basin number -> daily flow (cfs)
    pub dynamic_flow_bcs: IndexMap<u32, DailySeries>,

    /// Basin number -> daily stage (m)
    pub dynamic_head_bcs: IndexMap<u32, DailySeries>,

    /// EDEN stage stations driving runoff boundary basins
    pub runoff_bindings: Vec<RunoffStageBinding>,
}
