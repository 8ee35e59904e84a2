//! Basin state
//!
//! A basin is a lumped water body with a single stage and salinity.
//! Interior basins carry bathymetry (wet area per depth stratum); boundary
//! basins have no geometry and their stage is set exogenously each step.

use serde::{Deserialize, Serialize};

use crate::id::ShoalId;
use crate::units::{stratum_depth_m, DEPTH_BINS, RHO};

/// Lumped water body state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Basin {
    /// Basin number (5-58 interior, 59-68 tidal, 69-82 runoff boundary)
    pub number: u32,

    /// Human-readable name, also the output file stem
    pub name: String,

    /// Total planform area (m^2); zero for boundary basins
    pub total_area: f64,

    /// Land area (m^2)
    pub land_area: f64,

    /// Wet area per depth stratum (m^2)
    pub wet_area: [f64; DEPTH_BINS],

    /// Surface area at the current stage (m^2)
    pub area: f64,

    /// Stage anomaly from the shoal-top datum (m)
    pub water_level: f64,

    /// (m^3)
    pub water_volume: f64,

    /// Volume at the end of the previous depth update (m^3)
    pub previous_volume: f64,

    /// (g)
    pub salt_mass: f64,

    /// (g/kg)
    pub salinity: f64,

    /// Net shoal exchange this step (m^3/step)
    pub shoal_transport: Option<f64>,

    /// Rain volume added this step (m^3/step)
    pub rainfall: Option<f64>,

    /// ET volume removed this step (m^3/step)
    pub evaporation: Option<f64>,

    /// Everglades runoff total reported from stage-driven shoals (m^3/step)
    pub runoff_ever: Option<f64>,

    /// Volume added by a dynamic flow boundary condition (m^3/step)
    pub runoff_bc: Option<f64>,

    /// Incident shoals in attachment order
    pub shoals: Vec<ShoalId>,

    /// Stage is set exogenously (tide or upland stage) each step
    pub boundary_basin: bool,

    /// Rain stations feeding this basin, each with a scale factor
    pub rain_stations: Vec<(String, f64)>,

    /// Gauge bound to this basin for salinity data
    pub salinity_station: Option<String>,

    /// Salinity is driven from gauge data instead of simulated
    pub salinity_from_data: bool,
}

impl Basin {
    pub fn new(number: u32, name: impl Into<String>, total_area: f64, boundary: bool) -> Self {
        Self {
            number,
            name: name.into(),
            total_area,
            land_area: 0.0,
            wet_area: [0.0; DEPTH_BINS],
            area: 0.0,
            water_level: 0.0,
            water_volume: 0.0,
            previous_volume: 0.0,
            salt_mass: 0.0,
            salinity: 0.0,
            shoal_transport: None,
            rainfall: None,
            evaporation: None,
            runoff_ever: None,
            runoff_bc: None,
            shoals: Vec::new(),
            boundary_basin: boundary,
            rain_stations: Vec::new(),
            salinity_station: None,
            salinity_from_data: false,
        }
    }

    pub fn is_interior(&self) -> bool {
        !self.boundary_basin
    }

    /// Recompute the surface area at the current stage: the sum of wet
    /// areas over every stratum the water reaches.
    pub fn update_surface_area(&mut self) {
        self.area = 0.0;
        for (bin, wet) in self.wet_area.iter().enumerate() {
            if self.water_level + stratum_depth_m(bin) >= 0.0 {
                self.area += wet;
            }
        }
    }

    /// Compute the initial volume, surface area and salt mass from the
    /// initial stage and the bathymetric table.
    pub fn init_volume(&mut self) {
        self.update_surface_area();

        self.water_volume = 0.0;
        for (bin, wet) in self.wet_area.iter().enumerate() {
            let h = self.water_level + stratum_depth_m(bin);
            self.water_volume += wet * h;
        }

        // Dry and boundary basins still need a nonzero volume so the
        // salinity division stays defined.
        if self.water_volume <= 0.0 {
            self.water_volume = 1.0;
        }

        self.previous_volume = self.water_volume;

        // salt_mass (g) = salinity (g/kg) * volume (m^3) * rho (kg/m^3)
        self.salt_mass = self.salinity * self.water_volume * RHO;
    }
}
