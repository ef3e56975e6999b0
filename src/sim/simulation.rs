use crate::dynamics::{build_dynamics, Dynamics, DynamicsKind};
use crate::error::{SimError, SimResult};
use crate::lattice::{Boundary, Lattice};
use crate::random_source::RandomSource;
use crate::sim::cascade::{Advance, CascadeScheduler, CascadeState};
use crate::sim::config::{DrivingMode, SimConfig};
use crate::sim::schedule::GrainSchedule;
use crate::sim::sim_op::{SimOp, SimOpHandle};
use crate::stats::TimeSeriesPoint;
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase {
    Ready,
    WarmUp,
    Measuring,
    Finished,
}

/// Totals reported once a run completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub name: String,
    pub dynamics: DynamicsKind,
    pub boundary: Boundary,
    pub mode: DrivingMode,
    pub grid_size: usize,
    pub seed: u64,
    pub elapsed_steps: u64,
    pub steps_recorded: u64,
    pub grains_added: u64,
    pub grains_forced: u64,
    pub grains_lost: u64,
    pub total_grains: i64,
    pub density: f64,
    pub generations: u64,
    pub topples: u64,
    pub final_critical_cells: usize,
}

/// Owns the lattice, the toppling rule, the random source and the cascade
/// for the lifetime of one run, and drives them in the configured mode.
pub struct Simulation {
    pub name: String,
    pub config: SimConfig,
    pub lattice: Lattice,
    mode: DrivingMode,
    dynamics: Box<dyn Dynamics>,
    rng: RandomSource,
    scheduler: CascadeScheduler,
    ops: Vec<Box<dyn SimOp>>,
    phase: RunPhase,
    elapsed: u64,
    recording: bool,
    steps_recorded: u64,
    grains_added: u64,
    grains_forced: u64,
}

pub struct SimProps {
    pub name: &'static str,
    pub config: SimConfig,
    pub ops: Vec<SimOpHandle>,
}

impl Simulation {
    /// Validates the configuration and builds the initial lattice, either
    /// from `input_map` or from the strategy's random fill.
    /// Nothing is written until [`Simulation::run`].
    pub fn new(props: SimProps) -> SimResult<Simulation> {
        let mut config = props.config;
        let mode = config.validate()?;
        let dynamics = build_dynamics(config.dynamics, config.fill_bias)?;
        let mut rng = RandomSource::new(config.seed);
        let lattice = match &config.input_map {
            Some(path) => {
                let lattice = Lattice::from_rendered(&fs::read_to_string(path)?, config.boundary)?;
                if lattice.size() != config.grid_size {
                    info!(
                        map = %path.display(),
                        grid_size = lattice.size(),
                        "grid size taken from input map"
                    );
                    config.grid_size = lattice.size();
                }
                lattice
            }
            None => Lattice::initialize(config.grid_size, config.boundary, dynamics.as_ref(), &mut rng)?,
        };
        let scheduler = CascadeScheduler::from_lattice(&lattice);
        debug!(
            sim = props.name,
            grid_size = config.grid_size,
            total_grains = lattice.total_grains(),
            seed = rng.seed(),
            "initialized lattice"
        );

        Ok(Simulation {
            name: props.name.to_string(),
            lattice,
            mode,
            dynamics,
            rng,
            scheduler,
            ops: props.ops.into_iter().map(|handle| handle.op).collect(),
            phase: RunPhase::Ready,
            elapsed: 0,
            recording: false,
            steps_recorded: 0,
            grains_added: 0,
            grains_forced: 0,
            config,
        })
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn dynamics_kind(&self) -> DynamicsKind {
        self.dynamics.kind()
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Time units completed across warm-up and measurement.
    pub fn elapsed_steps(&self) -> u64 {
        self.elapsed
    }

    pub fn planned_steps(&self) -> u64 {
        self.config.pre_steps + self.config.steps
    }

    /// Whether the time unit just completed belongs to the recorded series.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn cascade_state(&self) -> CascadeState {
        self.scheduler.state()
    }

    pub fn critical_count(&self) -> usize {
        self.scheduler.critical_count()
    }

    pub fn total_grains(&self) -> i64 {
        self.lattice.total_grains()
    }

    pub fn density(&self) -> f64 {
        self.lattice.density()
    }

    pub fn time_series_point(&self) -> TimeSeriesPoint {
        TimeSeriesPoint {
            critical_cells: self.critical_count(),
            total_grains: self.total_grains(),
        }
    }

    /// Runs warm-up and measurement once, notifying every operator after each
    /// time unit.
    pub fn run(&mut self) -> SimResult<RunSummary> {
        if self.phase != RunPhase::Ready {
            return Err(SimError::AlreadyRun(self.name.clone()));
        }
        info!(
            sim = %self.name,
            dynamics = %self.dynamics.kind(),
            boundary = %self.lattice.boundary(),
            grid_size = self.lattice.size(),
            mode = ?self.mode,
            seed = self.rng.seed(),
            "running"
        );

        if self.lattice.boundary() == Boundary::Periodic {
            warn!(sim = %self.name, "periodic boundary loses no grains; the lattice will keep filling");
        }

        self.simulate_init()?;
        match self.mode {
            DrivingMode::SlowlyDriven => {
                self.run_slowly_driven(self.config.pre_steps, self.config.steps)?;
            }
            DrivingMode::ContinuouslyDriven { frequency } => {
                self.run_slowly_driven(self.config.pre_steps, 0)?;
                self.run_continuously_driven(frequency)?;
            }
        }
        self.phase = RunPhase::Finished;
        self.recording = false;
        self.simulate_end()?;

        let summary = self.summary();
        info!(
            sim = %summary.name,
            steps_recorded = summary.steps_recorded,
            grains_lost = summary.grains_lost,
            topples = summary.topples,
            "finished"
        );
        Ok(summary)
    }

    /// One recorded, slowly driven time unit with caller-supplied operators;
    /// the configured operators are not notified. A simulation stepped by hand
    /// can no longer [`run`](Simulation::run).
    pub fn step_with_ops(&mut self, ops: &mut [&mut dyn SimOp]) -> SimResult<Advance> {
        if self.phase == RunPhase::Finished {
            return Err(SimError::AlreadyRun(self.name.clone()));
        }
        self.phase = RunPhase::Measuring;
        self.recording = true;

        let advance = self.scheduler.advance(&mut self.lattice, self.dynamics.as_ref(), &mut self.rng);
        if advance == Advance::GrainAdded {
            self.grains_added += 1;
        }
        self.elapsed += 1;
        self.steps_recorded += 1;
        for op in ops.iter_mut() {
            op.update_sim(self)?;
        }
        Ok(advance)
    }

    fn run_slowly_driven(&mut self, pre_steps: u64, steps: u64) -> SimResult<()> {
        for t in 0..pre_steps + steps {
            self.recording = t > pre_steps;
            self.phase = if self.recording { RunPhase::Measuring } else { RunPhase::WarmUp };

            let advance = self.scheduler.advance(&mut self.lattice, self.dynamics.as_ref(), &mut self.rng);
            if advance == Advance::GrainAdded {
                self.grains_added += 1;
            }
            self.finish_step()?;
        }
        Ok(())
    }

    fn run_continuously_driven(&mut self, frequency: f64) -> SimResult<()> {
        let steps = self.config.steps;
        let mut schedule = GrainSchedule::build(steps, frequency, &mut self.rng);
        info!(frequency, grains = schedule.len(), "scheduled forced grains");

        self.phase = RunPhase::Measuring;
        self.recording = true;
        for t in 0..steps {
            self.inject_due(&mut schedule, t);
            self.scheduler
                .relax_generation(&mut self.lattice, self.dynamics.as_ref(), &mut self.rng);
            self.finish_step()?;
        }
        // grains scheduled for the final instant land after the last recorded unit
        self.inject_due(&mut schedule, steps);
        Ok(())
    }

    fn inject_due(&mut self, schedule: &mut GrainSchedule, t: u64) {
        for _ in 0..schedule.due(t) {
            self.scheduler
                .inject_grain(&mut self.lattice, self.dynamics.as_ref(), &mut self.rng);
            self.grains_added += 1;
            self.grains_forced += 1;
        }
    }

    fn finish_step(&mut self) -> SimResult<()> {
        self.elapsed += 1;
        if self.recording {
            self.steps_recorded += 1;
        }
        self.simulate_step()
    }

    fn simulate_init(&mut self) -> SimResult<()> {
        let mut ops = std::mem::take(&mut self.ops);
        let result = ops.iter_mut().try_for_each(|op| op.init_sim(self));
        self.ops = ops;
        result
    }

    fn simulate_step(&mut self) -> SimResult<()> {
        let mut ops = std::mem::take(&mut self.ops);
        let result = ops.iter_mut().try_for_each(|op| op.update_sim(self));
        self.ops = ops;
        result
    }

    fn simulate_end(&mut self) -> SimResult<()> {
        let mut ops = std::mem::take(&mut self.ops);
        let result = ops.iter_mut().try_for_each(|op| op.after_sim(self));
        self.ops = ops;
        result
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            name: self.name.clone(),
            dynamics: self.dynamics_kind(),
            boundary: self.lattice.boundary(),
            mode: self.mode,
            grid_size: self.lattice.size(),
            seed: self.rng.seed(),
            elapsed_steps: self.elapsed,
            steps_recorded: self.steps_recorded,
            grains_added: self.grains_added,
            grains_forced: self.grains_forced,
            grains_lost: self.lattice.lost_grains(),
            total_grains: self.lattice.total_grains(),
            density: self.lattice.density(),
            generations: self.scheduler.generations(),
            topples: self.scheduler.topples(),
            final_critical_cells: self.scheduler.critical_count(),
        }
    }
}
