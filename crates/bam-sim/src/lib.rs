//! BAM Sim - simulation driver for the Bay Assessment Model
//!
//! Ties the bay network, the hydraulics passes and the forcing stores
//! together under a fixed-timestep clock. Each step applies, in order:
//! boundary conditions, gauge salinity, tides with the seasonal MSL
//! anomaly, rain, ET and runoff stage, then solves shoal velocities,
//! moves volume and salt, and updates basin stages. Selected per-basin
//! variables are sampled on an output interval and persisted as one CSV
//! file per basin plus a run-info log.
//!
//! The loop is a single logical thread of control. It may be hosted on a
//! worker thread; a [`SimControl`] handle pauses, resumes and halts it
//! from outside.

pub mod clock;
pub mod config;
pub mod driver;
pub mod log;
pub mod recorder;

pub use clock::SimClock;
pub use config::{RunConfig, SalinityInit};
pub use driver::{RunState, SimControl, Simulation};
pub use log::RunLog;
pub use recorder::{RecordVariable, Recorder};

use chrono::NaiveDateTime;

/// Error types for simulation setup and execution
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bay(#[from] bam_core::BayError),

    #[error(transparent)]
    Hydraulic(#[from] bam_hydraulics::HydraulicError),

    #[error(transparent)]
    Forcing(#[from] bam_forcing::ForcingError),

    #[error("start time {start} is after end time {end}")]
    StartAfterEnd {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("basin {number} referenced by {context} is not in the bay")]
    UnknownBasin { number: u32, context: &'static str },

    #[error("basin {name} [{number}] has no initial state")]
    MissingInitialState { name: String, number: u32 },

    #[error("basin {number} targeted by {context} must be a boundary basin")]
    BoundaryRequired { number: u32, context: &'static str },

    #[error("basin {number} targeted by {context} must be an interior basin")]
    InteriorRequired { number: u32, context: &'static str },

    #[error("the simulation has already been started")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, SimError>;
