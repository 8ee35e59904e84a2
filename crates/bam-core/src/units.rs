//! Physical constants and unit conversions
//!
//! All internal calculations use meters, cubic meters, seconds, grams and
//! g/kg. Depth bins are historical imperial feet and are converted on use.

/// WGS ellipsoidal gravity at 25.1 N (m/s^2)
pub const G: f64 = 9.7896248;

/// Feet to meters
pub const FT_TO_M: f64 = 0.3048;

/// Cubic feet per second to cubic meters per second
pub const CFS_TO_M3S: f64 = 0.028316846592;

/// Density of water at 25 C (kg/m^3)
pub const RHO: f64 = 997.0;

/// Number of discrete depth strata on basins and shoals (0-9 ft)
pub const DEPTH_BINS: usize = 10;

/// Shoal strata narrower than this wet length carry no flow (m)
pub const MIN_WET_LENGTH: f64 = 1.0;

/// Friction sentinel assigned to dry strata
pub const DRY_FRICTION: f64 = 1e9;

/// Salinity above this is treated as a shallow-bank spike (g/kg)
pub const SALINITY_SPIKE: f64 = 90.0;

/// Depth of stratum `bin` below the shoal-top datum (m)
pub fn stratum_depth_m(bin: usize) -> f64 {
    bin as f64 * FT_TO_M
}

/// Convert a flow rate from cfs to m^3/s
pub fn cfs_to_m3s(cfs: f64) -> f64 {
    cfs * CFS_TO_M3S
}
