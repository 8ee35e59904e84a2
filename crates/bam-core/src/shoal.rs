//! Shoal state
//!
//! A shoal is a broad, shallow passage between two basins. Flow is
//! modelled per depth stratum as Manning open-channel flow over a wide
//! rectangular cross-section. Fluxes are signed: positive means water
//! moves from basin A to basin B.

use serde::{Deserialize, Serialize};

use crate::id::BasinId;
use crate::units::DEPTH_BINS;

/// Flow direction across a shoal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlowSign {
    /// Water moves from basin A to basin B
    AToB,
    /// Water moves from basin B to basin A
    BToA,
    /// No head difference drives flow
    #[default]
    None,
}

impl FlowSign {
    /// Sign convention used in the velocity and transport equations
    pub fn signum(self) -> f64 {
        match self {
            FlowSign::AToB => 1.0,
            FlowSign::BToA => -1.0,
            FlowSign::None => 0.0,
        }
    }
}

/// Mutable solver state for one depth stratum of a shoal
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ShoalStratum {
    /// Wet length at this depth (m); strata under 1 m are skipped
    pub wet_length: f64,

    /// (m/s)
    pub velocity: f64,

    /// Mean-depth approximation of the hydraulic radius (m)
    pub hydraulic_radius: f64,

    /// 2 g n^2 W R^(-4/3); a large sentinel when the stratum is dry
    pub friction_factor: f64,

    /// Upstream head above the shoal top at this stratum (m)
    pub h_upstream: f64,

    /// Downstream head above the shoal top at this stratum (m)
    pub h_downstream: f64,

    /// Flow cross-section (m^2)
    pub cross_section: f64,

    /// Discharge (m^3/s)
    pub q: f64,
}

/// A passage between two basins with per-depth solver state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shoal {
    /// Shoal number from the geometry table
    pub number: u32,

    pub basin_a: BasinId,
    pub basin_b: BasinId,

    /// (m); zero width marks a land barrier
    pub width: f64,

    /// Length of the land portion of the boundary (m)
    pub land_length: f64,

    pub manning_coefficient: f64,

    /// Land barrier: nothing is ever transported
    pub no_flow: bool,

    /// Per-depth solver state, stratum 0 at the shoal top
    pub strata: [ShoalStratum; DEPTH_BINS],

    /// Direction of the most recently solved stratum
    pub flow_sign: FlowSign,

    /// Total discharge over all strata (m^3/s)
    pub q_total: f64,

    /// Total flow cross-section over all strata (m^2)
    pub cross_section_total: f64,

    /// Volume moved from A to B this step (m^3/step)
    pub volume_a_b: f64,

    /// Volume moved from B to A this step; always `-volume_a_b`
    pub volume_b_a: f64,

    /// Set once the first velocity estimate has been seeded
    pub initial_velocity: bool,
}

impl Shoal {
    pub fn new(
        number: u32,
        basin_a: BasinId,
        basin_b: BasinId,
        width: f64,
        land_length: f64,
        manning_coefficient: f64,
    ) -> Self {
        Self {
            number,
            basin_a,
            basin_b,
            width,
            land_length,
            manning_coefficient,
            no_flow: width == 0.0,
            strata: [ShoalStratum::default(); DEPTH_BINS],
            flow_sign: FlowSign::None,
            q_total: 0.0,
            cross_section_total: 0.0,
            volume_a_b: 0.0,
            volume_b_a: 0.0,
            initial_velocity: false,
        }
    }
}
