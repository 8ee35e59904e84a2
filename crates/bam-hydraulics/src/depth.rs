//! Depth update
//!
//! After forcing volumes and shoal transfers have been applied, each
//! basin's stage moves by the volume change divided by the surface area
//! at the current stage. Boundary basins carry no geometry and are
//! skipped.

use bam_core::Bay;

/// Convert each basin's volume change into a stage change through the
/// current surface area, and commit the volume as the baseline for the
/// next step. Returns warning lines for the caller's run log.
pub fn update_depths(bay: &mut Bay) -> Vec<String> {
    let mut warnings = Vec::new();

    for basin in bay.basins.iter_mut() {
        // Boundary basins have no area
        if basin.area == 0.0 {
            continue;
        }

        basin.update_surface_area();
        if basin.area <= 0.0 {
            warnings.push(format!(
                "Basin {} has no wet area at stage {:.3} m, stage left unchanged",
                basin.name, basin.water_level
            ));
            continue;
        }

        let volume_difference = basin.water_volume - basin.previous_volume;
        basin.water_level += volume_difference / basin.area;

        basin.previous_volume = basin.water_volume;
    }

    warnings
}
