use crate::constants::AVALANCHE_REPORT_THRESHOLD;
use serde::{Deserialize, Serialize};

/// One completed avalanche paired with the quiet interval that followed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvalancheRecord {
    /// Steps the critical count stayed above the threshold.
    pub duration: u64,
    /// Sum of critical counts over those steps.
    pub area: u64,
    /// Sub-threshold steps before the next avalanche began.
    pub quiet: u64,
}

impl AvalancheRecord {
    pub fn csv_row(&self) -> String {
        format!("{},{},{}", self.duration, self.area, self.quiet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub critical_cells: usize,
    pub total_grains: i64,
}

impl TimeSeriesPoint {
    pub fn csv_row(&self) -> String {
        format!("{},{}", self.critical_cells, self.total_grains)
    }
}

/// Turns the per-step critical-site count into avalanche records.
///
/// A record is emitted when an avalanche begins and describes the previous
/// avalanche together with the quiet gap after it, so output lags the
/// activity by one event. Quiet steps seen before any avalanche are dropped.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    threshold: u64,
    durations: u64,
    area: u64,
    quiet: u64,
    emitted: u64,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new(AVALANCHE_REPORT_THRESHOLD)
    }
}

impl StatsAggregator {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            durations: 0,
            area: 0,
            quiet: 0,
            emitted: 0,
        }
    }

    /// True once an avalanche has been seen; its record is still pending.
    pub fn is_active(&self) -> bool {
        self.durations > 0
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Feeds one step's critical count; returns a record when one completes.
    pub fn observe(&mut self, critical: u64) -> Option<AvalancheRecord> {
        let mut record = None;
        if critical > self.threshold {
            if self.quiet != 0 {
                // A quiet run with no avalanche before it is not a record:
                // [0,0,70,70,0,0,0,70] must yield only (2,140,3), never a
                // leading (0,0,2).
                if self.durations != 0 {
                    record = Some(self.pending());
                    self.emitted += 1;
                }
                self.durations = 0;
                self.area = 0;
                self.quiet = 0;
            }
            self.durations += 1;
            self.area += critical;
        } else {
            self.quiet += 1;
        }
        record
    }

    /// Emits the trailing avalanche (and whatever quiet followed it), if any.
    pub fn flush(&mut self) -> Option<AvalancheRecord> {
        if self.durations == 0 {
            return None;
        }
        let record = self.pending();
        self.durations = 0;
        self.area = 0;
        self.quiet = 0;
        self.emitted += 1;
        Some(record)
    }

    fn pending(&self) -> AvalancheRecord {
        AvalancheRecord {
            duration: self.durations,
            area: self.area,
            quiet: self.quiet,
        }
    }
}
