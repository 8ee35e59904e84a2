//! Run configuration
//!
//! All knobs for one simulation run, loadable from JSON. Defaults match
//! the model's operational settings: a 360 s timestep, 1e-4 m/s velocity
//! tolerance, a 3000-iteration cap, ET scale 2, hourly output, every
//! forcing provider enabled, fixed boundary conditions off.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// How initial basin salinity is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SalinityInit {
    /// Override the initial-state file with the day-0 gauge value
    Gauge,
    /// Keep the salinity from the initial-state file
    File,
}

/// Run parameters for a simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Simulation start; snapped down to the hour
    pub start: NaiveDateTime,

    /// Simulation end; snapped down to the hour
    pub end: NaiveDateTime,

    /// (s)
    #[serde(default = "default_timestep")]
    pub timestep: u32,

    /// Convergence tolerance on shoal velocities (m/s)
    #[serde(default = "default_velocity_tol")]
    pub velocity_tol: f64,

    /// Manning iteration cap per shoal stratum
    #[serde(default = "default_max_iteration")]
    pub max_iteration: usize,

    /// Multiplier on potential ET
    #[serde(default = "default_et_scale")]
    pub et_scale: f64,

    /// Hours between output samples
    #[serde(default = "default_output_interval")]
    pub output_interval_hours: u32,

    /// Appended to each basin output file name
    #[serde(default)]
    pub run_id: String,

    /// Directory receiving the per-basin CSV files and the run-info log
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_run_info_file")]
    pub run_info_file: String,

    /// Apply daily rain volumes
    #[serde(default = "default_true")]
    pub rain: bool,

    /// Apply daily ET volumes
    #[serde(default = "default_true")]
    pub et: bool,

    /// Drive tidal boundary basins from their interpolators
    #[serde(default = "default_true")]
    pub tides: bool,

    /// Add the seasonal mean-sea-level anomaly to tidal stages
    #[serde(default = "default_true")]
    pub seasonal_msl: bool,

    /// Drive runoff boundary basins from EDEN stage data
    #[serde(default = "default_true")]
    pub stage_runoff: bool,

    /// Apply dynamic (daily) flow and head boundary conditions
    #[serde(default = "default_true")]
    pub dynamic_bcs: bool,

    /// Apply the fixed boundary-condition table
    #[serde(default)]
    pub fixed_bcs: bool,

    /// Drive flagged basin salinities from gauge data each step
    #[serde(default)]
    pub gauge_salinity: bool,

    #[serde(default = "default_salinity_init")]
    pub salinity_init: SalinityInit,

    /// Halve the salt mass of a basin whose salinity spikes past
    /// 90 g/kg (outside the known shallow-bank exemptions)
    #[serde(default = "default_true")]
    pub halve_salinity_spikes: bool,
}

impl RunConfig {
    /// A configuration with every knob at its default
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end,
            timestep: default_timestep(),
            velocity_tol: default_velocity_tol(),
            max_iteration: default_max_iteration(),
            et_scale: default_et_scale(),
            output_interval_hours: default_output_interval(),
            run_id: String::new(),
            output_dir: default_output_dir(),
            run_info_file: default_run_info_file(),
            rain: true,
            et: true,
            tides: true,
            seasonal_msl: true,
            stage_runoff: true,
            dynamic_bcs: true,
            fixed_bcs: false,
            gauge_salinity: false,
            salinity_init: default_salinity_init(),
            halve_salinity_spikes: true,
        }
    }
}

fn default_timestep() -> u32 {
    360
}

fn default_velocity_tol() -> f64 {
    1e-4
}

fn default_max_iteration() -> usize {
    3000
}

fn default_et_scale() -> f64 {
    2.0
}

fn default_output_interval() -> u32 {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("BAM.out")
}

fn default_run_info_file() -> String {
    "RunInfo.txt".to_string()
}

fn default_salinity_init() -> SalinityInit {
    SalinityInit::Gauge
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_fills_in_defaults() {
        let config: RunConfig = serde_json::from_str(
            r#"{ "start": "1999-09-01T00:00:00", "end": "2000-09-01T00:00:00" }"#,
        )
        .unwrap();

        assert_eq!(config.timestep, 360);
        assert_eq!(config.velocity_tol, 1e-4);
        assert_eq!(config.max_iteration, 3000);
        assert_eq!(config.et_scale, 2.0);
        assert_eq!(config.output_interval_hours, 1);
        assert!(config.rain && config.et && config.tides);
        assert!(!config.fixed_bcs);
        assert!(!config.gauge_salinity);
        assert_eq!(config.salinity_init, SalinityInit::Gauge);
        assert!(config.halve_salinity_spikes);
    }

    #[test]
    fn flags_can_be_overridden() {
        let config: RunConfig = serde_json::from_str(
            r#"{
                "start": "2010-01-01T00:00:00",
                "end": "2010-01-01T08:00:00",
                "timestep": 60,
                "rain": false,
                "fixedBcs": true,
                "salinityInit": "file"
            }"#,
        )
        .unwrap();

        assert_eq!(config.timestep, 60);
        assert!(!config.rain);
        assert!(config.fixed_bcs);
        assert_eq!(config.salinity_init, SalinityInit::File);
    }

    #[test]
    fn config_round_trips_through_json() {
        let start = "2010-01-01T00:00:00".parse().unwrap();
        let end = "2010-01-02T00:00:00".parse().unwrap();
        let config = RunConfig::new(start, end);

        let json = serde_json::to_string(&config).unwrap();
        let back: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.start, config.start);
        assert_eq!(back.timestep, config.timestep);
    }
}
