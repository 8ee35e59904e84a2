//! Mass transport
//!
//! Converts the solved shoal velocities into volume and salt transfers
//! between adjacent basins. The flux of water across a shoal is
//! `Q = sum(v_i * A_i)` over its strata; the cross-section of a stratum
//! uses the downstream depth where the water lands, falling back to the
//! hydraulic radius when the downstream side is dry. Salt moves with the
//! upstream basin's salinity only; concentrations equilibrate instantly
//! within a basin.

use bam_core::units::{DEPTH_BINS, MIN_WET_LENGTH, RHO, SALINITY_SPIKE};
use bam_core::{BasinId, Bay, FlowSign, ShoalId};

use crate::solver::shoal_basin_levels;
use crate::{HydraulicError, Result};

/// Shallow banks where a low stage is expected to spike the salinity
const SALINITY_EXEMPT_BASINS: &[&str] = &[
    "First National Bank",
    "Ninemile Bank",
    "Conchie Channel",
    "Johnson Key",
    "Sandy Key",
    "Dildo Key Bank",
    "Snake Bight",
    "Rankin Bight",
    "Rankin Lake",
    "Deer Key",
    "Swash Keys",
];

/// Knobs for the transport pass
#[derive(Debug, Clone, Copy)]
pub struct TransportSettings {
    /// (s)
    pub timestep: f64,

    /// Halve the salt mass of a non-exempt basin whose salinity spikes
    /// past 90 g/kg
    pub halve_salinity_spikes: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timestep: 360.0,
            halve_salinity_spikes: true,
        }
    }
}

/// Move water and salt across every flowing shoal, then refresh each
/// interior basin's net transport and salinity.
///
/// `runoff_shoals` maps each runoff destination basin to the shoals that
/// report into it; every such basin must be the B endpoint of its
/// shoals. Returns warning lines for the caller's run log.
pub fn mass_transport(
    bay: &mut Bay,
    settings: &TransportSettings,
    runoff_shoals: Option<&[(BasinId, Vec<ShoalId>)]>,
) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    // Shoal fluxes and the volume/salt exchange
    for shoal_idx in 0..bay.shoals.len() {
        let (basin_a, basin_b, level_a, level_b) = {
            let shoal = &bay.shoals[shoal_idx];
            if shoal.no_flow {
                continue;
            }
            (
                shoal.basin_a,
                shoal.basin_b,
                bay.basins[shoal.basin_a.index()].water_level,
                bay.basins[shoal.basin_b.index()].water_level,
            )
        };

        let shoal = &mut bay.shoals[shoal_idx];
        for stratum in 0..DEPTH_BINS {
            if shoal.strata[stratum].wet_length < MIN_WET_LENGTH {
                continue;
            }

            // Re-derive heads and flow direction; stages have not moved
            // since the velocity solve.
            shoal_basin_levels(shoal, stratum, level_a, level_b);
            if shoal.flow_sign == FlowSign::None {
                shoal.strata[stratum].cross_section = 0.0;
                shoal.strata[stratum].q = 0.0;
                continue;
            }

            let s = &mut shoal.strata[stratum];

            // Downstream depth is where the water lands; a dry downstream
            // side falls back to the hydraulic radius so the area stays
            // non-negative.
            let h_flow = if s.h_downstream > 0.0 {
                s.h_downstream
            } else {
                s.hydraulic_radius
            };

            let cross_section = h_flow * s.wet_length;
            if cross_section < 0.0 {
                return Err(HydraulicError::NegativeCrossSection {
                    shoal: shoal.number,
                    stratum,
                });
            }
            s.cross_section = cross_section;

            // Q (m^3/s) = v (m/s) * A (m^2)
            s.q = s.velocity * cross_section;
        }

        shoal.q_total = shoal.strata.iter().map(|s| s.q).sum();
        shoal.cross_section_total = shoal.strata.iter().map(|s| s.cross_section).sum();

        // Volume over the timestep; the sign of Q carries the direction
        let delta_volume = shoal.q_total * settings.timestep;
        shoal.volume_a_b = delta_volume;
        shoal.volume_b_a = -delta_volume;
        let flow_sign = shoal.flow_sign;

        let a_boundary = bay.basins[basin_a.index()].boundary_basin;
        let b_boundary = bay.basins[basin_b.index()].boundary_basin;

        if !a_boundary {
            bay.basins[basin_a.index()].water_volume -= delta_volume;
        }
        if !b_boundary {
            bay.basins[basin_b.index()].water_volume += delta_volume;
        }

        // Shallow banks can run empty at low stage
        if bay.basins[basin_a.index()].water_volume < 0.0 {
            bay.basins[basin_a.index()].water_volume = 0.0;
        }
        if bay.basins[basin_b.index()].water_volume < 0.0 {
            bay.basins[basin_b.index()].water_volume = 0.0;
        }
        if bay.basins[basin_a.index()].water_volume == 0.0
            || bay.basins[basin_b.index()].water_volume == 0.0
        {
            // An emptied bank transfers no salt
            continue;
        }

        let source_salinity = match flow_sign {
            FlowSign::AToB => bay.basins[basin_a.index()].salinity,
            FlowSign::BToA => bay.basins[basin_b.index()].salinity,
            FlowSign::None => 0.0,
        };

        // delta salt_mass (g) = salinity (g/kg) * volume (m^3) * rho (kg/m^3)
        let delta_salt_mass = source_salinity * delta_volume * RHO;

        if !a_boundary {
            bay.basins[basin_a.index()].salt_mass -= delta_salt_mass;
        }
        if !b_boundary {
            bay.basins[basin_b.index()].salt_mass += delta_salt_mass;
        }
        if bay.basins[basin_a.index()].salt_mass < 0.0 {
            bay.basins[basin_a.index()].salt_mass = 0.0;
        }
        if bay.basins[basin_b.index()].salt_mass < 0.0 {
            bay.basins[basin_b.index()].salt_mass = 0.0;
        }
    }

    // Net transport per interior basin
    for basin in bay.basins.iter_mut().filter(|b| b.is_interior()) {
        basin.shoal_transport = Some(0.0);
    }
    for shoal_idx in 0..bay.shoals.len() {
        let (basin_a, basin_b, volume_a_b, volume_b_a) = {
            let shoal = &bay.shoals[shoal_idx];
            (shoal.basin_a, shoal.basin_b, shoal.volume_a_b, shoal.volume_b_a)
        };
        for (id, volume) in [(basin_a, volume_a_b), (basin_b, volume_b_a)] {
            let basin = &mut bay.basins[id.index()];
            if basin.is_interior() {
                if let Some(transport) = basin.shoal_transport.as_mut() {
                    *transport += volume;
                }
            }
        }
    }

    // Salinity from the new salt mass and volume
    for basin in bay.basins.iter_mut().filter(|b| b.is_interior()) {
        if basin.salinity_from_data || basin.water_volume <= 0.0 {
            continue;
        }

        // g/kg = g / ( m^3 * kg/m^3 )
        let new_salinity = basin.salt_mass / (basin.water_volume * RHO);

        if new_salinity > SALINITY_SPIKE
            && !SALINITY_EXEMPT_BASINS.contains(&basin.name.as_str())
        {
            if settings.halve_salinity_spikes {
                warnings.push(format!(
                    "Basin {} salinity spiked from {:.1} to {:.1} (volume {:.0} m^3, salt {:.0} g), halving salt mass",
                    basin.name, basin.salinity, new_salinity, basin.water_volume, basin.salt_mass
                ));
                basin.salt_mass *= 0.5;
            } else {
                basin.salinity = new_salinity;
            }
        } else {
            basin.salinity = new_salinity;
        }
    }

    // Runoff totals reported from stage-driven shoals; destination
    // basins must be the B endpoint (flow out positive, in negative)
    if let Some(bindings) = runoff_shoals {
        for (basin_id, shoal_ids) in bindings {
            let mut total = 0.0;
            for shoal_id in shoal_ids {
                let shoal = bay.shoal(*shoal_id);
                if shoal.basin_b != *basin_id {
                    return Err(HydraulicError::InvalidRunoffEndpoint {
                        basin: bay.basin(*basin_id).number,
                        shoal: shoal.number,
                    });
                }
                total -= shoal.volume_a_b;
            }
            bay.basin_mut(*basin_id).runoff_ever = Some(total);
        }
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{solve_shoal_velocities, SolverSettings};
    use bam_core::{BasinGeometry, ShoalGeometry};
    use pretty_assertions::assert_eq;

    fn two_basin_bay() -> Bay {
        let geometry = |number: u32, name: &str| BasinGeometry {
            number,
            name: name.into(),
            total_area: 1e7,
            perimeter: 2e4,
            wet_area: [1e6; DEPTH_BINS],
            land_area: 0.0,
        };
        Bay::build(
            vec![geometry(5, "Barnes Sound"), geometry(6, "Blackwater Sound")],
            vec![],
            vec![ShoalGeometry {
                number: 1,
                basin_a: 5,
                basin_b: 6,
                width: 100.0,
                land_length: 0.0,
                manning_coefficient: 0.1,
                wet_length: [500.0; DEPTH_BINS],
            }],
        )
        .unwrap()
    }

    fn init(bay: &mut Bay, level_a: f64, level_b: f64, salinity: f64) {
        let a = bay.basin_by_number(5).unwrap();
        let b = bay.basin_by_number(6).unwrap();
        for (id, level) in [(a, level_a), (b, level_b)] {
            let basin = bay.basin_mut(id);
            basin.water_level = level;
            basin.salinity = salinity;
            basin.init_volume();
        }
        solve_shoal_velocities(bay, &SolverSettings::default());
    }

    #[test]
    fn shoal_exchange_is_symmetric() {
        let mut bay = two_basin_bay();
        init(&mut bay, 0.5, 0.0, 30.0);

        mass_transport(&mut bay, &TransportSettings::default(), None).unwrap();

        let shoal = &bay.shoals[0];
        assert!(shoal.volume_a_b > 0.0);
        assert_eq!(shoal.volume_a_b + shoal.volume_b_a, 0.0);
    }

    #[test]
    fn transport_conserves_volume_between_interior_basins() {
        let mut bay = two_basin_bay();
        init(&mut bay, 0.5, 0.0, 30.0);

        let a = bay.basin_by_number(5).unwrap();
        let b = bay.basin_by_number(6).unwrap();
        let total_before = bay.basin(a).water_volume + bay.basin(b).water_volume;

        mass_transport(&mut bay, &TransportSettings::default(), None).unwrap();

        let total_after = bay.basin(a).water_volume + bay.basin(b).water_volume;
        assert!((total_before - total_after).abs() < 1e-6 * total_before);
    }

    #[test]
    fn salt_moves_with_the_upstream_salinity() {
        let mut bay = two_basin_bay();
        init(&mut bay, 0.5, 0.0, 0.0);

        let a = bay.basin_by_number(5).unwrap();
        let b = bay.basin_by_number(6).unwrap();
        bay.basin_mut(a).salinity = 30.0;
        let volume_a = bay.basin(a).water_volume;
        bay.basin_mut(a).salt_mass = 30.0 * volume_a * RHO;

        let salt_before = bay.basin(a).salt_mass + bay.basin(b).salt_mass;

        mass_transport(&mut bay, &TransportSettings::default(), None).unwrap();

        let salt_after = bay.basin(a).salt_mass + bay.basin(b).salt_mass;
        assert!(
            salt_after <= salt_before * (1.0 + 1e-12),
            "salt must not be created: {} -> {}",
            salt_before,
            salt_after
        );
        assert!(bay.basin(b).salt_mass > 0.0, "downstream basin gained salt");
    }

    #[test]
    fn volumes_and_salt_never_go_negative() {
        let mut bay = two_basin_bay();
        init(&mut bay, 0.5, 0.0, 30.0);

        // Drain the upstream basin almost dry so the transfer overdraws it
        let a = bay.basin_by_number(5).unwrap();
        bay.basin_mut(a).water_volume = 10.0;
        bay.basin_mut(a).salt_mass = 10.0;

        mass_transport(&mut bay, &TransportSettings::default(), None).unwrap();

        for basin in &bay.basins {
            assert!(basin.water_volume >= 0.0);
            assert!(basin.salt_mass >= 0.0);
        }
    }

    #[test]
    fn no_salt_transfer_when_a_bank_runs_dry() {
        let mut bay = two_basin_bay();
        init(&mut bay, 0.5, 0.0, 30.0);

        let a = bay.basin_by_number(5).unwrap();
        let b = bay.basin_by_number(6).unwrap();
        bay.basin_mut(a).water_volume = 1.0;
        let salt_b_before = bay.basin(b).salt_mass;

        mass_transport(&mut bay, &TransportSettings::default(), None).unwrap();

        assert_eq!(bay.basin(a).water_volume, 0.0);
        assert_eq!(bay.basin(b).salt_mass, salt_b_before);
    }

    #[test]
    fn barrier_shoals_transport_nothing() {
        let mut bay = two_basin_bay();
        bay.shoals[0].width = 0.0;
        bay.shoals[0].no_flow = true;
        init(&mut bay, 0.5, 0.0, 30.0);

        let a = bay.basin_by_number(5).unwrap();
        let volume_before = bay.basin(a).water_volume;

        mass_transport(&mut bay, &TransportSettings::default(), None).unwrap();

        assert_eq!(bay.basin(a).water_volume, volume_before);
        assert_eq!(bay.shoals[0].q_total, 0.0);
        assert_eq!(bay.shoals[0].volume_a_b, 0.0);
    }

    #[test]
    fn net_transport_sums_signed_shoal_volumes() {
        let mut bay = two_basin_bay();
        init(&mut bay, 0.5, 0.0, 30.0);

        mass_transport(&mut bay, &TransportSettings::default(), None).unwrap();

        let a = bay.basin_by_number(5).unwrap();
        let b = bay.basin_by_number(6).unwrap();
        let shoal = &bay.shoals[0];
        assert_eq!(bay.basin(a).shoal_transport, Some(shoal.volume_a_b));
        assert_eq!(bay.basin(b).shoal_transport, Some(shoal.volume_b_a));
    }

    #[test]
    fn salinity_spike_is_halved_with_a_warning() {
        let mut bay = two_basin_bay();
        init(&mut bay, 0.5, 0.0, 30.0);

        let a = bay.basin_by_number(5).unwrap();
        let volume = bay.basin(a).water_volume;
        bay.basin_mut(a).salt_mass = 120.0 * volume * RHO;
        let spiked_mass = bay.basin(a).salt_mass;

        let warnings = mass_transport(&mut bay, &TransportSettings::default(), None).unwrap();

        assert!(warnings.iter().any(|w| w.contains("Barnes Sound")));
        assert!(bay.basin(a).salt_mass < spiked_mass);
        // The spiked value is not committed
        assert!((bay.basin(a).salinity - 30.0).abs() < 1.0);
    }

    #[test]
    fn exempt_banks_commit_spiked_salinity() {
        let geometry = |number: u32, name: &str| BasinGeometry {
            number,
            name: name.into(),
            total_area: 1e7,
            perimeter: 2e4,
            wet_area: [1e6; DEPTH_BINS],
            land_area: 0.0,
        };
        let mut bay = Bay::build(
            vec![geometry(5, "Ninemile Bank"), geometry(6, "Blackwater Sound")],
            vec![],
            vec![ShoalGeometry {
                number: 1,
                basin_a: 5,
                basin_b: 6,
                width: 100.0,
                land_length: 0.0,
                manning_coefficient: 0.1,
                wet_length: [500.0; DEPTH_BINS],
            }],
        )
        .unwrap();
        init(&mut bay, 0.5, 0.0, 30.0);

        let a = bay.basin_by_number(5).unwrap();
        let volume = bay.basin(a).water_volume;
        bay.basin_mut(a).salt_mass = 120.0 * volume * RHO;

        let warnings = mass_transport(&mut bay, &TransportSettings::default(), None).unwrap();

        assert!(warnings.is_empty());
        assert!(bay.basin(a).salinity > SALINITY_SPIKE);
    }

    #[test]
    fn spike_halving_can_be_disabled() {
        let mut bay = two_basin_bay();
        init(&mut bay, 0.5, 0.0, 30.0);

        let a = bay.basin_by_number(5).unwrap();
        let volume = bay.basin(a).water_volume;
        bay.basin_mut(a).salt_mass = 120.0 * volume * RHO;
        let spiked_mass = bay.basin(a).salt_mass;

        let settings = TransportSettings {
            halve_salinity_spikes: false,
            ..TransportSettings::default()
        };
        mass_transport(&mut bay, &settings, None).unwrap();

        // The shoal still moves some salt out, but nothing is halved
        assert!(bay.basin(a).salt_mass > 0.9 * spiked_mass);
        assert!(bay.basin(a).salinity > SALINITY_SPIKE);
    }

    #[test]
    fn runoff_totals_report_outflow_positive() {
        let mut bay = two_basin_bay();
        // A is higher, so volume_a_b > 0 flows into B; for destination B
        // that is inflow, reported negative.
        init(&mut bay, 0.5, 0.0, 30.0);

        let b = bay.basin_by_number(6).unwrap();
        let shoal_id = bay.basin(b).shoals[0];
        let bindings = vec![(b, vec![shoal_id])];

        mass_transport(&mut bay, &TransportSettings::default(), Some(&bindings)).unwrap();

        let runoff = bay.basin(b).runoff_ever.unwrap();
        assert!(runoff < 0.0, "inflow must be reported negative");
        assert_eq!(runoff, -bay.shoals[0].volume_a_b);
    }

    #[test]
    fn runoff_destination_must_be_the_b_endpoint() {
        let mut bay = two_basin_bay();
        init(&mut bay, 0.5, 0.0, 30.0);

        let a = bay.basin_by_number(5).unwrap();
        let shoal_id = bay.basin(a).shoals[0];
        let bindings = vec![(a, vec![shoal_id])];

        let err =
            mass_transport(&mut bay, &TransportSettings::default(), Some(&bindings)).unwrap_err();
        assert!(matches!(
            err,
            HydraulicError::InvalidRunoffEndpoint { basin: 5, shoal: 1 }
        ));
    }

    #[test]
    fn high_but_unspiked_salinity_is_committed() {
        let mut bay = two_basin_bay();
        init(&mut bay, 0.5, 0.0, 85.0);

        // Outflow at the basin's own concentration leaves it unchanged
        let warnings = mass_transport(&mut bay, &TransportSettings::default(), None).unwrap();
        assert!(warnings.is_empty());

        let a = bay.basin_by_number(5).unwrap();
        assert!((bay.basin(a).salinity - 85.0).abs() < 0.5);
    }
}
