//! Simulation driver
//!
//! Owns the bay, the forcing stores and the clock, and advances the run
//! one fixed timestep at a time. The application order inside a step is
//! part of the model contract: boundary conditions, gauge salinity,
//! tides, rain, ET and runoff stage all run before the shoal solver,
//! because BCs and runoff overwrite basin stages that the flux
//! computation reads.
//!
//! The loop itself is serial. A [`SimControl`] handle shared with other
//! threads can pause, resume or halt it; the only blocking point is the
//! pause wait at the top of each step.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use parking_lot::{Condvar, Mutex};
use tracing::debug;

use bam_core::units::cfs_to_m3s;
use bam_core::{BasinId, Bay, InitialBasinState, ShoalId};
use bam_forcing::{BcKind, FixedBc, ForcingData};
use bam_hydraulics::{
    mass_transport, solve_shoal_velocities, update_depths, SolverSettings, TransportSettings,
};
use indexmap::IndexMap;

use crate::clock::SimClock;
use crate::config::{RunConfig, SalinityInit};
use crate::log::RunLog;
use crate::recorder::{RecordVariable, Recorder};
use crate::{Result, SimError};

/// Run lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Running,
    Paused,
    Halted,
    Finished,
}

#[derive(Debug)]
struct ControlInner {
    state: Mutex<RunState>,
    resumed: Condvar,
}

/// Shared control surface for pausing, resuming and halting a run
#[derive(Debug, Clone)]
pub struct SimControl {
    inner: Arc<ControlInner>,
}

impl SimControl {
    fn new() -> Self {
        Self {
            inner: Arc::new(ControlInner {
                state: Mutex::new(RunState::Init),
                resumed: Condvar::new(),
            }),
        }
    }

    pub fn state(&self) -> RunState {
        *self.inner.state.lock()
    }

    /// Pause a running simulation; the loop blocks at the top of the
    /// next step until resumed or halted.
    pub fn pause(&self) {
        let mut state = self.inner.state.lock();
        if *state == RunState::Running {
            *state = RunState::Paused;
        }
    }

    /// Resume a paused simulation
    pub fn resume(&self) {
        let mut state = self.inner.state.lock();
        if *state == RunState::Paused {
            *state = RunState::Running;
            self.inner.resumed.notify_all();
        }
    }

    /// Halt the run; observed at the top of the next step, or at the
    /// pause-wait exit when the loop is paused.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        if matches!(*state, RunState::Running | RunState::Paused) {
            *state = RunState::Halted;
            self.inner.resumed.notify_all();
        }
    }

    fn set(&self, new_state: RunState) {
        *self.inner.state.lock() = new_state;
    }

    /// Block while paused; returns the state that ended the wait
    fn wait_if_paused(&self) -> RunState {
        let mut state = self.inner.state.lock();
        while *state == RunState::Paused {
            self.inner.resumed.wait(&mut state);
        }
        *state
    }
}

/// A configured simulation, ready to run
#[derive(Debug)]
pub struct Simulation {
    bay: Bay,
    forcing: ForcingData,
    config: RunConfig,
    clock: SimClock,
    control: SimControl,
    recorder: Recorder,
    log: RunLog,
    solver: SolverSettings,
    transport: TransportSettings,

    // Targets resolved from basin numbers to arena IDs at build time
    fixed_bc_targets: Vec<(BasinId, FixedBc)>,
    dynamic_flow_targets: Vec<(BasinId, u32)>,
    dynamic_head_targets: Vec<(BasinId, u32)>,
    tide_targets: Vec<(BasinId, u32)>,
    runoff_basins: Vec<(BasinId, String)>,
    runoff_shoals: Vec<(BasinId, Vec<ShoalId>)>,
}

impl Simulation {
    /// Validate the configuration against the bay and forcing stores,
    /// apply the initial basin state, and resolve every boundary-condition
    /// target. Initialization errors surface here so a run never starts
    /// on inconsistent inputs.
    pub fn new(
        mut bay: Bay,
        forcing: ForcingData,
        initial: Vec<InitialBasinState>,
        config: RunConfig,
    ) -> Result<Self> {
        let clock = SimClock::new(config.start, config.end, config.timestep)?;
        if config.output_interval_hours == 0 {
            return Err(SimError::Config(
                "output interval must be at least one hour".into(),
            ));
        }

        let mut log = RunLog::new();
        let start_day = clock.start_time.date();
        let end_day = clock.end_time.date();

        // Initial basin state
        let by_number: IndexMap<u32, &InitialBasinState> =
            initial.iter().map(|state| (state.number, state)).collect();
        for state in &initial {
            if bay.basin_by_number(state.number).is_none() {
                log.warn(format!(
                    "initial state for basin {} which is not in the bay, ignoring",
                    state.number
                ));
            }
        }
        for basin in bay.basins.iter_mut() {
            match by_number.get(&basin.number) {
                Some(state) => {
                    basin.water_level = state.water_level;
                    basin.salinity = state.salinity;
                }
                None if basin.is_interior() => {
                    return Err(SimError::MissingInitialState {
                        name: basin.name.clone(),
                        number: basin.number,
                    });
                }
                // Boundary stages are overwritten every step anyway
                None => {
                    basin.water_level = 0.0;
                    basin.salinity = 0.0;
                }
            }
            basin.init_volume();
        }

        // Gauge-driven salinity flags
        if config.gauge_salinity {
            for basin in bay.basins.iter_mut() {
                if basin.is_interior() && basin.salinity_station.is_some() {
                    basin.salinity_from_data = true;
                }
            }
        }

        // Initial salinity from the day-0 gauges
        if config.salinity_init == SalinityInit::Gauge {
            let day_map = forcing.salinity.day(start_day);
            for basin in bay.basins.iter_mut() {
                let Some(station) = basin.salinity_station.clone() else {
                    continue;
                };
                let gauge = day_map.and_then(|map| map.get(station.as_str()).copied().flatten());
                basin.salinity = match gauge {
                    Some(value) => value,
                    None => {
                        log.warn(format!(
                            "basin {} has no gauge salinity at {}, initializing to 0",
                            basin.name, start_day
                        ));
                        0.0
                    }
                };
            }
            // Recompute salt mass from the overridden salinities
            for basin in bay.basins.iter_mut() {
                basin.salt_mass = basin.salinity * basin.water_volume * bam_core::units::RHO;
            }
        }

        // Forcing coverage, checked before the loop so a missing day
        // inside the run is an anomaly rather than a routine condition
        if config.rain {
            forcing.rain.check_coverage("rain", start_day, end_day)?;
            if let Some(day_map) = forcing.rain.day(start_day) {
                for basin in bay.basins.iter().filter(|b| b.is_interior()) {
                    for (station, _scale) in &basin.rain_stations {
                        if !day_map.contains_key(station.as_str()) {
                            return Err(SimError::Config(format!(
                                "rain station {station} bound to basin {} is not in the rain data",
                                basin.name
                            )));
                        }
                    }
                }
            }
        }
        if config.et {
            forcing.et.check_coverage("ET", start_day, end_day)?;
        }
        if config.gauge_salinity {
            forcing
                .salinity
                .check_coverage("gauge salinity", start_day, end_day)?;
        }

        // Tide targets must be boundary basins whose series span the run
        let mut tide_targets = Vec::new();
        for (number, series) in &forcing.tides {
            let id = bay
                .basin_by_number(*number)
                .ok_or(SimError::UnknownBasin {
                    number: *number,
                    context: "the tide table",
                })?;
            if bay.basin(id).is_interior() {
                return Err(SimError::BoundaryRequired {
                    number: *number,
                    context: "the tide table",
                });
            }
            if config.tides {
                let start_unix = clock.start_time.and_utc().timestamp() as f64;
                let end_unix = clock.end_time.and_utc().timestamp() as f64;
                if start_unix < series.start() || end_unix > series.end() {
                    return Err(SimError::Config(format!(
                        "tide series for basin {number} does not cover the simulation window"
                    )));
                }
            }
            tide_targets.push((id, *number));
        }

        // Fixed boundary conditions target interior basins
        let mut fixed_bc_targets = Vec::new();
        if config.fixed_bcs {
            for (number, bc) in &forcing.fixed_bcs {
                let id = bay
                    .basin_by_number(*number)
                    .ok_or(SimError::UnknownBasin {
                        number: *number,
                        context: "the fixed boundary-condition table",
                    })?;
                if bay.basin(id).boundary_basin {
                    return Err(SimError::InteriorRequired {
                        number: *number,
                        context: "the fixed boundary-condition table",
                    });
                }
                fixed_bc_targets.push((id, *bc));
            }
        }

        // Dynamic boundary conditions
        let mut dynamic_flow_targets = Vec::new();
        let mut dynamic_head_targets = Vec::new();
        if config.dynamic_bcs {
            for (targets, table, context) in [
                (
                    &mut dynamic_flow_targets,
                    &forcing.dynamic_flow_bcs,
                    "the dynamic flow boundary-condition table",
                ),
                (
                    &mut dynamic_head_targets,
                    &forcing.dynamic_head_bcs,
                    "the dynamic head boundary-condition table",
                ),
            ] {
                for (number, series) in table {
                    let id = bay
                        .basin_by_number(*number)
                        .ok_or(SimError::UnknownBasin {
                            number: *number,
                            context,
                        })?;
                    series.check_coverage(context, start_day, end_day)?;
                    targets.push((id, *number));
                }
            }
        }

        // Runoff-stage bindings: the driven boundary basin, and the
        // destination basin that must be the B endpoint of every shoal
        let mut runoff_basins = Vec::new();
        let mut runoff_shoals = Vec::new();
        if config.stage_runoff {
            forcing
                .runoff_stage
                .check_coverage("runoff stage", start_day, end_day)?;

            for binding in &forcing.runoff_bindings {
                let source = bay
                    .basin_by_number(binding.source_basin)
                    .ok_or(SimError::UnknownBasin {
                        number: binding.source_basin,
                        context: "the runoff-stage map",
                    })?;
                if bay.basin(source).is_interior() {
                    return Err(SimError::BoundaryRequired {
                        number: binding.source_basin,
                        context: "the runoff-stage map",
                    });
                }
                if forcing
                    .runoff_stage
                    .station_value(start_day, &binding.eden_station)
                    .is_none()
                {
                    return Err(SimError::Config(format!(
                        "EDEN station {} bound to basin {} is not in the runoff stage data",
                        binding.eden_station, binding.source_basin
                    )));
                }

                let dest = bay
                    .basin_by_number(binding.dest_basin)
                    .ok_or(SimError::UnknownBasin {
                        number: binding.dest_basin,
                        context: "the runoff-stage map",
                    })?;
                let mut shoal_ids = Vec::with_capacity(binding.shoals.len());
                for shoal_number in &binding.shoals {
                    let shoal_id = bay.shoal_by_number(*shoal_number).ok_or_else(|| {
                        SimError::Config(format!(
                            "runoff binding for basin {} names unknown shoal {shoal_number}",
                            binding.dest_basin
                        ))
                    })?;
                    if bay.shoal(shoal_id).basin_b != dest {
                        return Err(SimError::Config(format!(
                            "runoff destination basin {} must be the B endpoint of shoal {shoal_number}",
                            binding.dest_basin
                        )));
                    }
                    shoal_ids.push(shoal_id);
                }

                runoff_basins.push((source, binding.eden_station.clone()));
                runoff_shoals.push((dest, shoal_ids));
            }
        }

        let solver = SolverSettings {
            velocity_tol: config.velocity_tol,
            max_iteration: config.max_iteration,
        };
        let transport = TransportSettings {
            timestep: config.timestep as f64,
            halve_salinity_spikes: config.halve_salinity_spikes,
        };
        let recorder = Recorder::new(&bay, RecordVariable::all().to_vec());

        Ok(Self {
            bay,
            forcing,
            config,
            clock,
            control: SimControl::new(),
            recorder,
            log,
            solver,
            transport,
            fixed_bc_targets,
            dynamic_flow_targets,
            dynamic_head_targets,
            tide_targets,
            runoff_basins,
            runoff_shoals,
        })
    }

    /// Handle for pausing, resuming and halting the run from another
    /// thread
    pub fn control(&self) -> SimControl {
        self.control.clone()
    }

    pub fn bay(&self) -> &Bay {
        &self.bay
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Execute the full simulation loop on the calling thread and
    /// persist the output. Blocks while paused; a halt breaks cleanly
    /// with output flushed.
    pub fn run(&mut self) -> Result<()> {
        if self.control.state() != RunState::Init {
            return Err(SimError::AlreadyStarted);
        }
        self.control.set(RunState::Running);

        let run_started = Instant::now();
        self.log.info(format!(
            "Start simulation from {} to {}, timestep {} s, output every {} h",
            self.clock.start_time,
            self.clock.end_time,
            self.clock.timestep,
            self.config.output_interval_hours
        ));

        // Record the initial state
        self.recorder.sample(&self.bay, self.clock.current_time);

        let mut halted = false;
        while self.clock.current_time <= self.clock.end_time {
            if self.control.wait_if_paused() == RunState::Halted {
                halted = true;
                break;
            }
            self.step()?;
        }

        if halted {
            self.log.info("Simulation halted".to_string());
        } else {
            self.control.set(RunState::Finished);
        }

        let elapsed = run_started.elapsed().as_secs_f64();
        self.log.info(format!(
            "Simulation complete. Elapsed time: {}",
            format_elapsed(elapsed)
        ));

        self.write_output()
    }

    /// Advance one timestep: apply the forcings in contract order, solve
    /// shoal velocities, move volume and salt, update stages, and sample
    /// the recorder on output boundaries.
    pub fn step(&mut self) -> Result<()> {
        self.clock.advance();
        let day = self.clock.day_key();

        self.apply_boundary_conditions(day);
        self.apply_gauge_salinity(day);
        self.apply_tides();
        self.apply_rain(day);
        self.apply_et(day);
        self.apply_runoff_stage(day);

        for line in solve_shoal_velocities(&mut self.bay, &self.solver) {
            self.log.warn(line);
        }

        let runoff = if self.config.stage_runoff {
            Some(self.runoff_shoals.as_slice())
        } else {
            None
        };
        for line in mass_transport(&mut self.bay, &self.transport, runoff)? {
            self.log.warn(line);
        }

        for line in update_depths(&mut self.bay) {
            self.log.warn(line);
        }

        if self.on_output_boundary() {
            self.recorder.sample(&self.bay, self.clock.current_time);
        }
        Ok(())
    }

    /// Write the per-basin CSV files and the run-info log
    pub fn write_output(&mut self) -> Result<()> {
        let dir = self.config.output_dir.clone();
        self.recorder
            .write(&self.bay, &dir, &self.config.run_id, &mut self.log)?;

        let info_path = dir.join(&self.config.run_info_file);
        if let Err(err) = self.log.write_to(&info_path) {
            self.log
                .warn(format!("failed to write {}: {err}", info_path.display()));
        }
        Ok(())
    }

    fn on_output_boundary(&self) -> bool {
        let interval = self.config.output_interval_hours as i64 * 3600;
        self.clock.elapsed_seconds() % interval == 0
            || self.clock.current_time == self.clock.end_time
    }

    /// Fixed head/flow values, then the daily boundary-condition series
    fn apply_boundary_conditions(&mut self, day: NaiveDate) {
        let timestep = self.clock.timestep as f64;

        if self.config.fixed_bcs {
            for (id, bc) in &self.fixed_bc_targets {
                let basin = self.bay.basin_mut(*id);
                match bc.kind {
                    // V = Q * dt
                    BcKind::Flow => basin.water_volume += bc.value * timestep,
                    BcKind::Stage => basin.water_level = bc.value,
                }
            }
        }

        if self.config.dynamic_bcs {
            for (id, number) in &self.dynamic_flow_targets {
                let value = self
                    .forcing
                    .dynamic_flow_bcs
                    .get(number)
                    .and_then(|series| series.value(day));
                match value {
                    Some(cfs) => {
                        let volume = cfs_to_m3s(cfs) * timestep;
                        let basin = self.bay.basin_mut(*id);
                        basin.runoff_bc = Some(volume);
                        basin.water_volume += volume;
                    }
                    None => self.log.warn(format!(
                        "no dynamic flow boundary value for basin {number} on {day}"
                    )),
                }
            }

            for (id, number) in &self.dynamic_head_targets {
                let value = self
                    .forcing
                    .dynamic_head_bcs
                    .get(number)
                    .and_then(|series| series.value(day));
                match value {
                    Some(stage) => self.bay.basin_mut(*id).water_level = stage,
                    None => self.log.warn(format!(
                        "no dynamic head boundary value for basin {number} on {day}"
                    )),
                }
            }
        }
    }

    /// Gauge salinity overwrites boundary basins with a station and
    /// interior basins flagged as data-driven
    fn apply_gauge_salinity(&mut self, day: NaiveDate) {
        if self.forcing.salinity.is_empty() {
            return;
        }
        let Some(day_map) = self.forcing.salinity.day(day) else {
            self.log
                .warn(format!("no gauge salinity data for {day}, keeping values"));
            return;
        };

        for basin in self.bay.basins.iter_mut() {
            let driven = if basin.boundary_basin {
                basin.salinity_station.is_some()
            } else {
                basin.salinity_from_data
            };
            if !driven {
                continue;
            }
            let Some(station) = basin.salinity_station.as_deref() else {
                continue;
            };
            match day_map.get(station).copied() {
                Some(Some(value)) => basin.salinity = value,
                // A gap in the gauge record keeps the previous value
                Some(None) => debug!(basin = %basin.name, %day, "gauge salinity gap"),
                None => debug!(basin = %basin.name, station, "station missing from salinity data"),
            }
        }
    }

    /// Tidal stage plus the seasonal mean-sea-level anomaly
    fn apply_tides(&mut self) {
        let unix_time = self.clock.unix_time as f64;

        let seasonal_msl = if !self.config.seasonal_msl {
            0.0
        } else {
            match &self.forcing.seasonal_msl {
                Some(spline) => match spline.eval(unix_time) {
                    Ok(value) => (value * 1000.0).round() / 1000.0,
                    Err(_) => {
                        self.log.warn(format!(
                            "seasonal MSL interpolation out of range at {}, using 0",
                            self.clock.current_time
                        ));
                        0.0
                    }
                },
                None => 0.0,
            }
        };

        for (id, number) in &self.tide_targets {
            let tide = if !self.config.tides {
                0.0
            } else {
                match self.forcing.tides.get(number).map(|s| s.eval(unix_time)) {
                    Some(Ok(value)) => value,
                    _ => {
                        self.log.warn(format!(
                            "tide interpolation out of range for basin {number} at {}, using 0",
                            self.clock.current_time
                        ));
                        0.0
                    }
                }
            };
            self.bay.basin_mut(*id).water_level = tide + seasonal_msl;
        }
    }

    /// Daily rain volume: scaled station sum, spread over the day's steps
    fn apply_rain(&mut self, day: NaiveDate) {
        if !self.config.rain {
            return;
        }
        let Some(station_rain) = self.forcing.rain.day(day) else {
            self.log
                .warn(format!("no rain data for {day}, skipping rain"));
            return;
        };
        let timesteps_per_day = self.clock.timesteps_per_day();

        for basin in self.bay.basins.iter_mut() {
            if basin.boundary_basin {
                continue;
            }

            let mut rain_cm_day = 0.0;
            for (station, scale) in &basin.rain_stations {
                if let Some(rain) = station_rain.get(station.as_str()) {
                    rain_cm_day += rain * scale;
                }
            }

            let rain_volume_day = (rain_cm_day / 100.0) * basin.area;
            let rain_volume = rain_volume_day / timesteps_per_day;

            basin.rainfall = Some(rain_volume);
            basin.water_volume += rain_volume;
        }
    }

    /// Daily ET volume, scaled and spread over the day's steps
    fn apply_et(&mut self, day: NaiveDate) {
        if !self.config.et {
            return;
        }
        let Some(et_mm_day) = self.forcing.et.value(day) else {
            self.log.warn(format!("no ET data for {day}, skipping ET"));
            return;
        };
        let timesteps_per_day = self.clock.timesteps_per_day();

        for basin in self.bay.basins.iter_mut() {
            if basin.boundary_basin {
                continue;
            }

            let et_volume_day = (et_mm_day / 1000.0) * basin.area * self.config.et_scale;
            let et_volume = et_volume_day / timesteps_per_day;

            basin.evaporation = Some(et_volume);
            basin.water_volume -= et_volume;
        }
    }

    /// EDEN stage overwrites the driven runoff boundary basins
    fn apply_runoff_stage(&mut self, day: NaiveDate) {
        if !self.config.stage_runoff {
            return;
        }
        let Some(stage_map) = self.forcing.runoff_stage.day(day) else {
            self.log
                .warn(format!("no runoff stage data for {day}, keeping stages"));
            return;
        };

        for (id, station) in &self.runoff_basins {
            match stage_map.get(station.as_str()) {
                Some(stage) => self.bay.basin_mut(*id).water_level = *stage,
                None => self
                    .log
                    .warn(format!("EDEN station {station} missing on {day}")),
            }
        }
    }
}

fn format_elapsed(seconds: f64) -> String {
    if seconds <= 60.0 {
        format!("{} (s)", seconds.round())
    } else if seconds <= 3600.0 {
        format!("{:.1} (min)", seconds / 60.0)
    } else {
        format!("{:.2} (hr)", seconds / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_pause_resume_halt_transitions() {
        let control = SimControl::new();
        assert_eq!(control.state(), RunState::Init);

        // Pause only applies to a running simulation
        control.pause();
        assert_eq!(control.state(), RunState::Init);

        control.set(RunState::Running);
        control.pause();
        assert_eq!(control.state(), RunState::Paused);

        control.resume();
        assert_eq!(control.state(), RunState::Running);

        control.stop();
        assert_eq!(control.state(), RunState::Halted);

        // Terminal states ignore further control
        control.pause();
        control.resume();
        assert_eq!(control.state(), RunState::Halted);
    }

    #[test]
    fn elapsed_time_buckets() {
        assert_eq!(format_elapsed(42.4), "42 (s)");
        assert_eq!(format_elapsed(90.0), "1.5 (min)");
        assert_eq!(format_elapsed(5400.0), "1.50 (hr)");
    }
}
