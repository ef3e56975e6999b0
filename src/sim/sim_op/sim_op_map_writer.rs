use crate::error::SimResult;
use crate::sim::sim_op::{SimOp, SimOpHandle};
use crate::sim::Simulation;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Map Writer Operator
///
/// Writes the final grain map once the run ends, in the format
/// [`Lattice::from_rendered`](crate::lattice::Lattice::from_rendered) reads
/// back, so a later run can continue from it. The file is only touched at
/// the end, so it may also be the map the run started from.
#[derive(Debug, Clone)]
pub struct MapWriterOp {
    pub name: String,
    pub path: PathBuf,
}

impl MapWriterOp {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            name: "MapWriterOp".to_string(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn handle<P: AsRef<Path>>(path: P) -> SimOpHandle {
        SimOpHandle::new(Box::new(Self::new(path)))
    }
}

impl SimOp for MapWriterOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn after_sim(&mut self, sim: &Simulation) -> SimResult<()> {
        fs::write(&self.path, sim.lattice.render())?;
        debug!(
            map = %self.path.display(),
            grid_size = sim.lattice.size(),
            total_grains = sim.total_grains(),
            "saved grain map"
        );
        Ok(())
    }
}
