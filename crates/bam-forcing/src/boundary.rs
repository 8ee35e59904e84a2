//! Boundary-condition tables
//!
//! Fixed boundary conditions hold one (kind, value) pair per basin and
//! apply every step. Dynamic boundary conditions reference daily series
//! kept in [`ForcingData`](crate::ForcingData). Runoff-stage bindings map
//! EDEN stage stations onto Everglades boundary basins and name the
//! shoals whose transport is reported as runoff.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ForcingError;

/// Boundary condition kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BcKind {
    /// Adds `value * timestep` cubic meters per step
    Flow,
    /// Overwrites the basin stage
    Stage,
}

impl FromStr for BcKind {
    type Err = ForcingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "flow" => Ok(BcKind::Flow),
            "stage" => Ok(BcKind::Stage),
            other => Err(ForcingError::InvalidBcKind(other.into())),
        }
    }
}

/// A boundary condition applied with the same value every step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedBc {
    pub kind: BcKind,
    /// m^3/s for flow, m for stage
    pub value: f64,
}

/// An EDEN stage station driving a runoff boundary basin
///
/// The destination basin must be the B endpoint of every listed shoal;
/// the runoff total is reported with outflow positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunoffStageBinding {
    /// Everglades boundary basin whose stage is driven (69-82)
    pub source_basin: u32,

    pub eden_station: String,

    /// Interior basin whose runoff total is reported
    pub dest_basin: u32,

    /// Shoal numbers between the source and destination basins
    pub shoals: Vec<u32>,
}
