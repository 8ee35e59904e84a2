//! In-memory input tables
//!
//! The core never parses files; a collaborator decodes CSV/shapefile
//! sources into these tables and hands them to the bay builder and the
//! simulation initializer.

use serde::{Deserialize, Serialize};

use crate::units::DEPTH_BINS;

/// Per-basin geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasinGeometry {
    pub number: u32,
    pub name: String,
    /// (m^2)
    pub total_area: f64,
    /// (m)
    pub perimeter: f64,
    /// Wet area per depth stratum (m^2)
    pub wet_area: [f64; DEPTH_BINS],
    /// (m^2)
    pub land_area: f64,
}

/// Per-basin station bindings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasinParameters {
    pub number: u32,
    /// Rain station IDs, parallel to `rain_scales`
    pub rain_stations: Vec<String>,
    pub rain_scales: Vec<f64>,
    /// Salinity/stage gauge bound to this basin
    pub salinity_station: Option<String>,
    /// Carried from the parameter table; not applied by the model
    pub salt_factor: f64,
}

/// Per-shoal geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoalGeometry {
    pub number: u32,
    /// Endpoint basin numbers; a zero endpoint discards the shoal
    pub basin_a: u32,
    pub basin_b: u32,
    /// (m); zero width marks a land barrier
    pub width: f64,
    /// (m)
    pub land_length: f64,
    pub manning_coefficient: f64,
    /// Wet length per depth stratum (m)
    pub wet_length: [f64; DEPTH_BINS],
}

/// Initial per-basin state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialBasinState {
    pub number: u32,
    /// Stage anomaly (m)
    pub water_level: f64,
    /// (g/kg)
    pub salinity: f64,
    /// (C); read but unused
    #[serde(default)]
    pub temperature: Option<f64>,
}
