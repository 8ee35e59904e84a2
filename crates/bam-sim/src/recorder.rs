//! Per-basin time-series recorder
//!
//! Snapshots selected basin variables on every output boundary and
//! writes one CSV file per basin at the end of the run, named
//! `<basin_name><run_id>.csv`. Values are rounded to 3 decimals;
//! variables with no value yet (flux accumulators before the first
//! step) are written as `NA`.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use indexmap::IndexMap;

use bam_core::{Basin, Bay};

use crate::log::RunLog;
use crate::Result;

/// Basin variable recorded into the output time series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordVariable {
    Stage,
    Salinity,
    Volume,
    Flow,
    Rain,
    Evaporation,
    Runoff,
}

impl RecordVariable {
    pub fn all() -> &'static [RecordVariable] {
        &[
            RecordVariable::Stage,
            RecordVariable::Salinity,
            RecordVariable::Volume,
            RecordVariable::Flow,
            RecordVariable::Rain,
            RecordVariable::Evaporation,
            RecordVariable::Runoff,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordVariable::Stage => "Stage",
            RecordVariable::Salinity => "Salinity",
            RecordVariable::Volume => "Volume",
            RecordVariable::Flow => "Flow",
            RecordVariable::Rain => "Rain",
            RecordVariable::Evaporation => "Evaporation",
            RecordVariable::Runoff => "Runoff",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            RecordVariable::Stage => "(m)",
            RecordVariable::Salinity => "(ppt)",
            RecordVariable::Volume => "(m^3)",
            RecordVariable::Flow => "(m^3/s)",
            RecordVariable::Rain => "(m^3/s)",
            RecordVariable::Evaporation => "(m^3/s)",
            RecordVariable::Runoff => "(m^3/s)",
        }
    }

    fn sample(self, basin: &Basin) -> Option<f64> {
        match self {
            RecordVariable::Stage => Some(basin.water_level),
            RecordVariable::Salinity => Some(basin.salinity),
            RecordVariable::Volume => Some(basin.water_volume),
            RecordVariable::Flow => basin.shoal_transport,
            RecordVariable::Rain => basin.rainfall,
            RecordVariable::Evaporation => basin.evaporation,
            RecordVariable::Runoff => basin.runoff_ever,
        }
    }
}

/// Accumulated per-basin samples, shared across the run
#[derive(Debug)]
pub struct Recorder {
    variables: Vec<RecordVariable>,
    times: Vec<NaiveDateTime>,
    /// Basin number -> one value column per variable
    buffers: IndexMap<u32, Vec<Vec<Option<f64>>>>,
}

impl Recorder {
    pub fn new(bay: &Bay, variables: Vec<RecordVariable>) -> Self {
        let buffers = bay
            .basins
            .iter()
            .map(|basin| (basin.number, vec![Vec::new(); variables.len()]))
            .collect();
        Self {
            variables,
            times: Vec::new(),
            buffers,
        }
    }

    /// Snapshot every basin at `time`
    pub fn sample(&mut self, bay: &Bay, time: NaiveDateTime) {
        self.times.push(time);
        for basin in &bay.basins {
            if let Some(columns) = self.buffers.get_mut(&basin.number) {
                for (variable, column) in self.variables.iter().zip(columns.iter_mut()) {
                    column.push(variable.sample(basin));
                }
            }
        }
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn variables(&self) -> &[RecordVariable] {
        &self.variables
    }

    /// One basin's sampled column for a variable
    pub fn series(&self, basin_number: u32, variable: RecordVariable) -> Option<&[Option<f64>]> {
        let index = self.variables.iter().position(|v| *v == variable)?;
        Some(&self.buffers.get(&basin_number)?[index])
    }

    /// Write one CSV file per basin into `dir`.
    ///
    /// A file that cannot be opened is skipped with a warning; the
    /// output directory itself must be creatable.
    pub fn write(&self, bay: &Bay, dir: &Path, run_id: &str, log: &mut RunLog) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        for basin in &bay.basins {
            let Some(columns) = self.buffers.get(&basin.number) else {
                continue;
            };

            let file_name = format!("{}{}.csv", basin.name, run_id);
            let path = dir.join(&file_name);
            let mut file = match std::fs::File::create(&path) {
                Ok(file) => file,
                Err(err) => {
                    log.warn(format!("failed to open output file {file_name}: {err}"));
                    continue;
                }
            };

            if let Err(err) = self.write_basin(&mut file, columns) {
                log.warn(format!("failed writing output file {file_name}: {err}"));
            }
        }

        Ok(())
    }

    fn write_basin(
        &self,
        file: &mut std::fs::File,
        columns: &[Vec<Option<f64>>],
    ) -> std::io::Result<()> {
        let mut header = String::from("Time");
        for variable in &self.variables {
            header.push(',');
            header.push_str(variable.label());
            header.push(' ');
            header.push_str(variable.unit());
        }
        writeln!(file, "{header}")?;

        for (row, time) in self.times.iter().enumerate() {
            let mut line = time.format("%Y-%m-%d %H:%M:%S").to_string();
            for column in columns {
                line.push(',');
                match column.get(row).copied().flatten() {
                    Some(value) => line.push_str(&format!("{value:.3}")),
                    None => line.push_str("NA"),
                }
            }
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bam_core::units::DEPTH_BINS;
    use bam_core::BasinGeometry;
    use pretty_assertions::assert_eq;

    fn small_bay() -> Bay {
        Bay::build(
            vec![BasinGeometry {
                number: 5,
                name: "Barnes Sound".into(),
                total_area: 1e7,
                perimeter: 2e4,
                wet_area: [1e6; DEPTH_BINS],
                land_area: 0.0,
            }],
            vec![],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn samples_accumulate_per_basin() {
        let mut bay = small_bay();
        let id = bay.basin_by_number(5).unwrap();
        bay.basin_mut(id).water_level = 0.25;

        let mut recorder = Recorder::new(&bay, RecordVariable::all().to_vec());
        recorder.sample(&bay, "2010-01-01T00:00:00".parse().unwrap());

        bay.basin_mut(id).water_level = 0.5;
        recorder.sample(&bay, "2010-01-01T01:00:00".parse().unwrap());

        let stages = recorder.series(5, RecordVariable::Stage).unwrap();
        assert_eq!(stages, [Some(0.25), Some(0.5)]);

        // Flux accumulators have no value before the first step
        let flows = recorder.series(5, RecordVariable::Flow).unwrap();
        assert_eq!(flows, [None, None]);
    }

    #[test]
    fn csv_has_units_header_rounding_and_na() {
        let mut bay = small_bay();
        let id = bay.basin_by_number(5).unwrap();
        bay.basin_mut(id).water_level = 0.123456;
        bay.basin_mut(id).salinity = 35.5;
        bay.basin_mut(id).water_volume = 1.9e7;

        let mut recorder = Recorder::new(&bay, RecordVariable::all().to_vec());
        recorder.sample(&bay, "2010-01-01T00:00:00".parse().unwrap());

        let dir = tempfile::tempdir().unwrap();
        let mut log = RunLog::new();
        recorder.write(&bay, dir.path(), "_run1", &mut log).unwrap();

        let contents =
            std::fs::read_to_string(dir.path().join("Barnes Sound_run1.csv")).unwrap();
        let mut lines = contents.lines();

        let header = lines.next().unwrap();
        assert_eq!(
            header,
            "Time,Stage (m),Salinity (ppt),Volume (m^3),Flow (m^3/s),\
             Rain (m^3/s),Evaporation (m^3/s),Runoff (m^3/s)"
        );

        let row = lines.next().unwrap();
        assert!(row.starts_with("2010-01-01 00:00:00,"));
        assert!(row.contains("0.123"), "stage must round to 3 decimals");
        assert!(row.contains("NA"), "unset accumulators must be NA");
    }

    #[test]
    fn boundary_basins_are_recorded_too() {
        let bay = small_bay();
        let mut recorder = Recorder::new(&bay, RecordVariable::all().to_vec());
        recorder.sample(&bay, "2010-01-01T00:00:00".parse().unwrap());

        assert!(recorder.series(59, RecordVariable::Stage).is_some());
    }
}
