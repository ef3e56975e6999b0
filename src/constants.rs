// Lattice rules
pub const TOPPLE_THRESHOLD: u32 = 4;
pub const CLASSICAL_TOPPLE_AMOUNT: u32 = 4;
pub const RANDOM2_TOPPLE_AMOUNT: u32 = 2;

// Initial fill skew toward the threshold (chance of bumping a value below 3)
pub const CLASSICAL_FILL_BIAS: f64 = 0.0;
pub const RANDOM2_FILL_BIAS: f64 = 0.75;

// Avalanche statistics
pub const AVALANCHE_REPORT_THRESHOLD: u64 = 63; // critical sites per step (T)

// Average grains per cell at which the slowly driven lattice is considered critical
pub const CRITICAL_DENSITY: f64 = 2.125;

// default run settings:
pub const DEFAULT_GRID_SIZE: usize = 1024;
pub const DEFAULT_PRE_STEPS: u64 = 0;
pub const DEFAULT_STEPS: u64 = 10_000;
pub const SLOWLY_DRIVEN_FREQUENCY: f64 = -1.0;
pub const DEFAULT_REPORT_INTERVAL: u64 = 1_000_000;
pub const DEFAULT_OUTPUT_FILE: &str = "output.txt";
pub const DEFAULT_STATS_FILE: &str = "stats.txt";

// CSV headers
pub const TIME_SERIES_HEADER: &str = "critical_cells,total_grains";
pub const AVALANCHE_STATS_HEADER: &str = "duration,area,quiet";
