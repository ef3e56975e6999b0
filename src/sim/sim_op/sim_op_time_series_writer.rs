use crate::constants::TIME_SERIES_HEADER;
use crate::error::SimResult;
use crate::sim::sim_op::{SimOp, SimOpHandle};
use crate::sim::Simulation;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Time Series Writer Operator
///
/// Appends one `critical_cells,total_grains` row per recorded time unit.
/// Warm-up units are skipped.
pub struct TimeSeriesWriterOp {
    pub name: String,
    writer: BufWriter<Box<dyn Write>>,
    header_written: bool,
    rows_written: u64,
}

impl TimeSeriesWriterOp {
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            name: "TimeSeriesWriterOp".to_string(),
            writer: BufWriter::new(writer),
            header_written: false,
            rows_written: 0,
        }
    }

    /// Creates (or truncates) the output file.
    pub fn to_path<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let file = File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    pub fn handle<P: AsRef<Path>>(path: P) -> SimResult<SimOpHandle> {
        Ok(SimOpHandle::new(Box::new(Self::to_path(path)?)))
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn write_header(&mut self) -> SimResult<()> {
        if self.header_written {
            return Ok(());
        }
        writeln!(self.writer, "{}", TIME_SERIES_HEADER)?;
        self.header_written = true;
        Ok(())
    }
}

impl SimOp for TimeSeriesWriterOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn init_sim(&mut self, _sim: &Simulation) -> SimResult<()> {
        self.write_header()
    }

    fn update_sim(&mut self, sim: &Simulation) -> SimResult<()> {
        if !sim.is_recording() {
            return Ok(());
        }
        writeln!(self.writer, "{}", sim.time_series_point().csv_row())?;
        self.rows_written += 1;
        Ok(())
    }

    fn after_sim(&mut self, _sim: &Simulation) -> SimResult<()> {
        self.writer.flush()?;
        debug!(rows = self.rows_written, "time series closed");
        Ok(())
    }
}
