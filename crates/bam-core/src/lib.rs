//! # BAM Core
//!
//! Core data model for the Bay Assessment Model, a lumped-parameter
//! hydrodynamic and salinity simulator for a shallow multi-basin estuary.
//! This crate knows nothing about forcing data or the simulation clock;
//! it holds the basin/shoal network and its per-step state.
//!
//! ## Modules
//!
//! - [`basin`] - Basin state (stage, volume, salt, bathymetry)
//! - [`bay`] - The bay arena: flat basin/shoal arrays addressed by ID
//! - [`id`] - Arena index types
//! - [`shoal`] - Shoal state with per-depth solver strata
//! - [`tables`] - In-memory input tables consumed by the bay builder
//! - [`units`] - Physical constants and unit conversions

pub mod basin;
pub mod bay;
pub mod id;
pub mod shoal;
pub mod tables;
pub mod units;

pub use basin::Basin;
pub use bay::{Bay, BOUNDARY_BASINS, RUNOFF_BOUNDARY_RANGE, TIDAL_BOUNDARY_RANGE};
pub use id::{BasinId, ShoalId};
pub use shoal::{FlowSign, Shoal, ShoalStratum};
pub use tables::{BasinGeometry, BasinParameters, InitialBasinState, ShoalGeometry};

/// Error types for bay construction and validation
#[derive(Debug, thiserror::Error)]
pub enum BayError {
    #[error("duplicate basin number {0}")]
    DuplicateBasinNumber(u32),

    #[error("duplicate basin name '{0}'")]
    DuplicateBasinName(String),

    #[error("basin number {0} collides with the reserved boundary range 59-82")]
    ReservedBoundaryNumber(u32),

    #[error("duplicate shoal number {0}")]
    DuplicateShoalNumber(u32),

    #[error("interior basin {0} has a non-positive total area")]
    InvalidGeometry(u32),

    #[error("basin {number} referenced by {context} is not in the bay")]
    UnknownBasin { number: u32, context: String },
}

pub type Result<T> = std::result::Result<T, BayError>;
