mod sim_op_avalanche_stats;
mod sim_op_map_writer;
mod sim_op_progress_reporter;
mod sim_op_time_series_writer;

pub use sim_op_avalanche_stats::AvalancheStatsOp;
pub use sim_op_map_writer::MapWriterOp;
pub use sim_op_progress_reporter::ProgressReporterOp;
pub use sim_op_time_series_writer::TimeSeriesWriterOp;

use crate::error::SimResult;
use crate::sim::Simulation;

/// Observer run by the simulation after every time unit.
pub trait SimOp {
    /// The name of this operator (for identification and lookup)
    fn name(&self) -> &str;

    /// Called once before the first time unit
    fn init_sim(&mut self, _sim: &Simulation) -> SimResult<()> {
        Ok(())
    }

    /// Called after every time unit, warm-up included
    fn update_sim(&mut self, _sim: &Simulation) -> SimResult<()> {
        Ok(())
    }

    /// Called once after the last time unit
    fn after_sim(&mut self, _sim: &Simulation) -> SimResult<()> {
        Ok(())
    }
}

pub struct SimOpHandle {
    pub op: Box<dyn SimOp>,
}

impl SimOpHandle {
    /// Create a new SimOpHandle with the given operation
    pub fn new(op: Box<dyn SimOp>) -> Self {
        SimOpHandle { op }
    }
}
