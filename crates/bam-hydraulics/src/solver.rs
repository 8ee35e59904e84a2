//! Shoal velocity solver
//!
//! At the beginning of each step the water velocity for each depth
//! stratum of each shoal is found from the stages of the adjacent basins
//! and Manning's equation (Cosby 2010, eqs. 1.10-1.15).
//!
//! The upstream stage sets the critical head above the shoal top. When
//! the downstream stage sits below it there is enough head difference to
//! drive critical flow and the downstream control is pinned at the
//! critical head. Velocity and hydraulic radius depend on each other, so
//! both are found by fixed-point iteration: a velocity estimate updates
//! the hydraulic radius, which updates the friction term, until two
//! successive velocities agree within tolerance. For a wide shallow
//! rectangle the hydraulic radius is approximated by the mean flow depth.

use bam_core::units::{stratum_depth_m, DEPTH_BINS, DRY_FRICTION, G, MIN_WET_LENGTH};
use bam_core::{Bay, FlowSign, Shoal};

/// Knobs for the velocity iteration
#[derive(Debug, Clone, Copy)]
pub struct SolverSettings {
    /// Convergence tolerance on successive velocity estimates (m/s)
    pub velocity_tol: f64,

    /// Iteration cap per stratum
    pub max_iteration: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            velocity_tol: 1e-4,
            max_iteration: 3000,
        }
    }
}

/// Stage both basin levels onto a stratum and derive the flow direction.
///
/// Heads are elevations relative to the shoal top at this stratum, so
/// `h = water_level + depth`. When both basins sit below the shoal top
/// the stratum is dry: velocity and hydraulic radius are zeroed and the
/// friction factor is pinned at the dry sentinel.
pub fn shoal_basin_levels(shoal: &mut Shoal, stratum: usize, level_a: f64, level_b: f64) {
    let depth = stratum_depth_m(stratum);
    let h_basin_a = level_a + depth;
    let h_basin_b = level_b + depth;
    let s = &mut shoal.strata[stratum];

    if h_basin_a < 0.0 && h_basin_b < 0.0 {
        s.h_upstream = h_basin_a;
        s.h_downstream = h_basin_b;
        s.friction_factor = DRY_FRICTION;
        s.velocity = 0.0;
        s.hydraulic_radius = 0.0;
        shoal.flow_sign = FlowSign::None;
    } else if h_basin_a > h_basin_b {
        s.h_upstream = h_basin_a;
        s.h_downstream = h_basin_b;
        shoal.flow_sign = FlowSign::AToB;
    } else {
        s.h_upstream = h_basin_b;
        s.h_downstream = h_basin_a;
        shoal.flow_sign = FlowSign::BToA;
    }
}

/// One fixed-point evaluation of velocity and hydraulic radius from the
/// staged heads and the current friction factor.
fn velocity_hydraulic_radius(shoal: &mut Shoal, stratum: usize) {
    let sign = shoal.flow_sign.signum();
    let s = &mut shoal.strata[stratum];

    // Critical head above the shoal top; the downstream control cannot
    // drop below it once the flow goes critical.
    let h_critical = (2.0 * s.h_upstream) / (3.0 + s.friction_factor);
    if s.h_downstream < h_critical {
        s.h_downstream = h_critical;
    }

    let level_difference = s.h_upstream - s.h_downstream;

    // Velocity head
    let h_velocity = level_difference / (1.0 + s.friction_factor);

    // sqrt[ (m/s^2) * (m) ] = (m/s)
    s.velocity = sign * (2.0 * G * h_velocity).sqrt();

    // Mean depth stands in for the hydraulic radius of a wide, shallow
    // rectangular cross-section.
    s.hydraulic_radius = (s.h_upstream - h_velocity + s.h_downstream).max(0.0) / 2.0;
}

/// Solve velocity and hydraulic radius for every stratum of every
/// flowing shoal from the current basin stages.
///
/// Strata narrower than 1 m of wet length are skipped. An exhausted
/// iteration keeps the last velocity estimate and reports a warning line
/// instead of failing the step. Returns the warning lines for the
/// caller's run log.
pub fn solve_shoal_velocities(bay: &mut Bay, settings: &SolverSettings) -> Vec<String> {
    let mut warnings = Vec::new();

    for shoal_idx in 0..bay.shoals.len() {
        let (level_a, level_b) = {
            let shoal = &bay.shoals[shoal_idx];
            if shoal.no_flow {
                continue;
            }
            (
                bay.basins[shoal.basin_a.index()].water_level,
                bay.basins[shoal.basin_b.index()].water_level,
            )
        };
        let shoal = &mut bay.shoals[shoal_idx];

        for stratum in 0..DEPTH_BINS {
            if shoal.strata[stratum].wet_length < MIN_WET_LENGTH {
                continue;
            }

            shoal_basin_levels(shoal, stratum, level_a, level_b);
            if shoal.flow_sign == FlowSign::None {
                continue;
            }

            // Seed velocity and hydraulic radius on the very first pass
            if !shoal.initial_velocity {
                velocity_hydraulic_radius(shoal, stratum);
            }

            let mut previous_velocity = shoal.strata[stratum].velocity;

            // Refresh friction from the last hydraulic radius:
            // f = 2 g n^2 W R^(-4/3)
            let radius = shoal.strata[stratum].hydraulic_radius;
            shoal.strata[stratum].friction_factor = if radius > 0.0 {
                2.0 * G
                    * shoal.manning_coefficient.powi(2)
                    * shoal.width
                    * radius.powf(-4.0 / 3.0)
            } else {
                DRY_FRICTION
            };

            let mut converged = false;
            for _ in 1..settings.max_iteration {
                velocity_hydraulic_radius(shoal, stratum);

                let velocity = shoal.strata[stratum].velocity;
                if (previous_velocity - velocity).abs() <= settings.velocity_tol {
                    converged = true;
                    break;
                }
                previous_velocity = velocity;
            }

            if !converged {
                warnings.push(format!(
                    "Manning iterations exceeded for shoal {} at depth {} ft, keeping last estimate",
                    shoal.number, stratum
                ));
            }
        }

        shoal.initial_velocity = true;
    }

    warnings
}
