use crate::constants::CRITICAL_DENSITY;
use crate::error::SimResult;
use crate::sim::sim_op::{SimOp, SimOpHandle};
use crate::sim::Simulation;
use tracing::info;

/// Progress Reporter Operator
///
/// Logs the completed percentage every `report_interval` time units and a
/// one-time notice when the average grain density first exceeds the
/// critical density.
#[derive(Debug, Clone)]
pub struct ProgressReporterOp {
    pub name: String,
    pub report_interval: u64,
    critical_density_step: Option<u64>,
}

impl ProgressReporterOp {
    pub fn new(report_interval: u64) -> Self {
        Self {
            name: "ProgressReporterOp".to_string(),
            report_interval: report_interval.max(1),
            critical_density_step: None,
        }
    }

    pub fn handle(report_interval: u64) -> SimOpHandle {
        SimOpHandle::new(Box::new(Self::new(report_interval)))
    }

    /// Time unit at which the critical density was first exceeded.
    pub fn critical_density_step(&self) -> Option<u64> {
        self.critical_density_step
    }

    fn percent_done(sim: &Simulation) -> f64 {
        if sim.planned_steps() == 0 {
            100.0
        } else {
            sim.elapsed_steps() as f64 / sim.planned_steps() as f64 * 100.0
        }
    }

    fn check_critical_density(&mut self, sim: &Simulation) {
        if self.critical_density_step.is_none() && sim.density() > CRITICAL_DENSITY {
            self.critical_density_step = Some(sim.elapsed_steps());
            info!(
                step = sim.elapsed_steps(),
                "arrived at critical density {}", CRITICAL_DENSITY
            );
        }
    }
}

impl SimOp for ProgressReporterOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn init_sim(&mut self, sim: &Simulation) -> SimResult<()> {
        info!(
            sim = %sim.name,
            density = sim.density(),
            total_grains = sim.total_grains(),
            "starting sandpile run"
        );
        self.check_critical_density(sim);
        Ok(())
    }

    fn update_sim(&mut self, sim: &Simulation) -> SimResult<()> {
        self.check_critical_density(sim);
        if sim.elapsed_steps() % self.report_interval == 0 {
            info!(
                total_grains = sim.total_grains(),
                "Done {:.1}%",
                Self::percent_done(sim)
            );
        }
        Ok(())
    }

    fn after_sim(&mut self, sim: &Simulation) -> SimResult<()> {
        info!(
            sim = %sim.name,
            steps = sim.elapsed_steps(),
            density = sim.density(),
            lost_grains = sim.lattice.lost_grains(),
            "sandpile run complete"
        );
        Ok(())
    }
}
