//! The bay arena
//!
//! Basins and shoals live in two flat vectors owned by the [`Bay`];
//! everything else refers to them through [`BasinId`]/[`ShoalId`]. Domain
//! numbers from the input tables are mapped to IDs through order-preserving
//! maps so iteration is deterministic.

use std::ops::RangeInclusive;

use indexmap::IndexMap;
use tracing::warn;

use crate::basin::Basin;
use crate::id::{BasinId, ShoalId};
use crate::shoal::Shoal;
use crate::tables::{BasinGeometry, BasinParameters, ShoalGeometry};
use crate::{BayError, Result};

/// Basin numbers reserved for tidal boundary basins
pub const TIDAL_BOUNDARY_RANGE: RangeInclusive<u32> = 59..=68;

/// Basin numbers reserved for Everglades runoff boundary basins
pub const RUNOFF_BOUNDARY_RANGE: RangeInclusive<u32> = 69..=82;

/// The fixed boundary-basin roster appended to every bay
pub const BOUNDARY_BASINS: &[(u32, &str)] = &[
    (59, "Gulf Tide 1"),
    (60, "Gulf Tide 2"),
    (61, "Gulf Tide 3"),
    (62, "Gulf Tide 4"),
    (63, "Ocean Tide 5"),
    (64, "Ocean Tide 6"),
    (65, "Ocean Tide 7"),
    (66, "Ocean Tide 8"),
    (67, "Ocean Tide 9"),
    (68, "Card Sound Tide 10"),
    (69, "EVER to Snake Bight"),
    (70, "EVER to Rankin Lake"),
    (71, "EVER to Rankin Bight"),
    (72, "EVER to North Whipray"),
    (73, "EVER to Terrapin Bay"),
    (74, "EVER to Madeira Bay"),
    (75, "EVER to Little Madeira Bay"),
    (76, "EVER to Eagle Key"),
    (77, "EVER to Joe Bay"),
    (78, "EVER to Deer Key"),
    (79, "EVER to Long Sound"),
    (80, "EVER to Manatee Bay"),
    (81, "EVER to Conchie Channel"),
    (82, "EVER to Barnes Sound"),
];

/// The basin/shoal network and its per-step state
#[derive(Debug, Clone)]
pub struct Bay {
    pub basins: Vec<Basin>,
    pub shoals: Vec<Shoal>,
    basin_numbers: IndexMap<u32, BasinId>,
    shoal_numbers: IndexMap<u32, ShoalId>,
}

impl Bay {
    /// Build the bay from decoded input tables.
    ///
    /// Interior basins come from `geometry`; the fixed boundary roster
    /// (numbers 59-82) is appended afterwards with no geometry. Shoals
    /// with a zero endpoint are discarded. Station bindings from
    /// `parameters` are attached to interior basins.
    pub fn build(
        geometry: Vec<BasinGeometry>,
        parameters: Vec<BasinParameters>,
        shoals: Vec<ShoalGeometry>,
    ) -> Result<Bay> {
        let mut bay = Bay {
            basins: Vec::with_capacity(geometry.len() + BOUNDARY_BASINS.len()),
            shoals: Vec::with_capacity(shoals.len()),
            basin_numbers: IndexMap::new(),
            shoal_numbers: IndexMap::new(),
        };

        // Interior basins
        for geo in geometry {
            if TIDAL_BOUNDARY_RANGE.contains(&geo.number)
                || RUNOFF_BOUNDARY_RANGE.contains(&geo.number)
            {
                return Err(BayError::ReservedBoundaryNumber(geo.number));
            }
            if bay.basin_numbers.contains_key(&geo.number) {
                return Err(BayError::DuplicateBasinNumber(geo.number));
            }
            if bay.basins.iter().any(|b| b.name == geo.name) {
                return Err(BayError::DuplicateBasinName(geo.name));
            }
            if geo.total_area <= 0.0 {
                return Err(BayError::InvalidGeometry(geo.number));
            }

            let mut basin = Basin::new(geo.number, geo.name, geo.total_area, false);
            basin.wet_area = geo.wet_area;
            basin.land_area = geo.land_area;

            let id = BasinId(bay.basins.len());
            bay.basin_numbers.insert(geo.number, id);
            bay.basins.push(basin);
        }

        // Boundary basins carry no geometry
        for &(number, name) in BOUNDARY_BASINS {
            let id = BasinId(bay.basins.len());
            bay.basin_numbers.insert(number, id);
            bay.basins.push(Basin::new(number, name, 0.0, true));
        }

        // Station bindings
        for params in parameters {
            let id = bay.basin_by_number(params.number).ok_or_else(|| {
                BayError::UnknownBasin {
                    number: params.number,
                    context: "the basin parameter table".into(),
                }
            })?;
            let basin = &mut bay.basins[id.0];

            if basin.is_interior() {
                basin.rain_stations = params
                    .rain_stations
                    .into_iter()
                    .zip(params.rain_scales)
                    .collect();
            }
            basin.salinity_station = params.salinity_station;
        }

        // Shoals and adjacency
        for geo in shoals {
            if geo.basin_a == 0 || geo.basin_b == 0 {
                if geo.basin_a != geo.basin_b {
                    warn!(
                        shoal = geo.number,
                        "shoal has a single zero endpoint, discarding"
                    );
                }
                continue;
            }
            if bay.shoal_numbers.contains_key(&geo.number) {
                return Err(BayError::DuplicateShoalNumber(geo.number));
            }

            let basin_a = bay.basin_by_number(geo.basin_a).ok_or_else(|| {
                BayError::UnknownBasin {
                    number: geo.basin_a,
                    context: format!("shoal {}", geo.number),
                }
            })?;
            let basin_b = bay.basin_by_number(geo.basin_b).ok_or_else(|| {
                BayError::UnknownBasin {
                    number: geo.basin_b,
                    context: format!("shoal {}", geo.number),
                }
            })?;

            let mut shoal = Shoal::new(
                geo.number,
                basin_a,
                basin_b,
                geo.width,
                geo.land_length,
                geo.manning_coefficient,
            );
            for (stratum, length) in geo.wet_length.iter().enumerate() {
                shoal.strata[stratum].wet_length = *length;
            }

            let id = ShoalId(bay.shoals.len());
            bay.shoal_numbers.insert(geo.number, id);
            bay.basins[basin_a.0].shoals.push(id);
            bay.basins[basin_b.0].shoals.push(id);
            bay.shoals.push(shoal);
        }

        Ok(bay)
    }

    pub fn basin(&self, id: BasinId) -> &Basin {
        &self.basins[id.0]
    }

    pub fn basin_mut(&mut self, id: BasinId) -> &mut Basin {
        &mut self.basins[id.0]
    }

    pub fn shoal(&self, id: ShoalId) -> &Shoal {
        &self.shoals[id.0]
    }

    pub fn shoal_mut(&mut self, id: ShoalId) -> &mut Shoal {
        &mut self.shoals[id.0]
    }

    /// Look up a basin by its domain number
    pub fn basin_by_number(&self, number: u32) -> Option<BasinId> {
        self.basin_numbers.get(&number).copied()
    }

    /// Look up a shoal by its domain number
    pub fn shoal_by_number(&self, number: u32) -> Option<ShoalId> {
        self.shoal_numbers.get(&number).copied()
    }

    pub fn basin_ids(&self) -> impl Iterator<Item = BasinId> {
        (0..self.basins.len()).map(BasinId)
    }

    pub fn shoal_ids(&self) -> impl Iterator<Item = ShoalId> {
        (0..self.shoals.len()).map(ShoalId)
    }
}
