//! Command line runner.
//!
//! Examples:
//!   sandpile -L 256 -p 2000000 -s 10000000
//!   sandpile -L 512 -s 5000000 -f 0.0001 -d random2 --boundary periodic
//!   sandpile --config run.json --summary summary.json
//!   sandpile -s 100000 --input-map settled.map --save-map settled.map
//!
//! Flags override values read from `--config`.

use btw_sandpile::constants::{DEFAULT_OUTPUT_FILE, DEFAULT_STATS_FILE};
use btw_sandpile::dynamics::DynamicsKind;
use btw_sandpile::lattice::Boundary;
use btw_sandpile::sim::sim_op::{AvalancheStatsOp, MapWriterOp, ProgressReporterOp, TimeSeriesWriterOp};
use btw_sandpile::sim::{RunSummary, SimConfig, SimProps, Simulation};
use btw_sandpile::SimResult;
use clap::Parser;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "sandpile", about = "Run a BTW sandpile and record avalanche statistics")]
struct Cli {
    /// JSON run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Size of the grid
    #[arg(short = 'L', long)]
    grid_size: Option<usize>,

    /// Steps run before writing output
    #[arg(short = 'p', long)]
    pre_steps: Option<u64>,

    /// Steps run writing output
    #[arg(short = 's', long)]
    steps: Option<u64>,

    /// Driving frequency in [0, 1]; negative runs the slowly driven model
    #[arg(short = 'f', long, allow_negative_numbers = true)]
    frequency: Option<f64>,

    /// Toppling rule: classical or random2
    #[arg(short = 'd', long)]
    dynamics: Option<DynamicsKind>,

    /// Edge policy: open or periodic
    #[arg(long)]
    boundary: Option<Boundary>,

    #[arg(long)]
    seed: Option<u64>,

    /// Chance of bumping an initial cell value below 3
    #[arg(long)]
    fill_bias: Option<f64>,

    /// Write the avalanche still open when the run ends
    #[arg(long)]
    flush_trailing: bool,

    /// Time series output file
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    /// Avalanche statistics output file
    #[arg(long, default_value = DEFAULT_STATS_FILE)]
    stats: PathBuf,

    /// Write the run summary as JSON
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Start from a saved grain map instead of a random fill
    #[arg(long)]
    input_map: Option<PathBuf>,

    /// Save the final grain map
    #[arg(long)]
    save_map: Option<PathBuf>,
}

impl Cli {
    fn to_config(&self) -> SimResult<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_json_file(path)?,
            None => SimConfig::default(),
        };
        if let Some(grid_size) = self.grid_size {
            config.grid_size = grid_size;
        }
        if let Some(pre_steps) = self.pre_steps {
            config.pre_steps = pre_steps;
        }
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        if let Some(frequency) = self.frequency {
            config.frequency_grains = frequency;
        }
        if let Some(dynamics) = self.dynamics {
            config.dynamics = dynamics;
        }
        if let Some(boundary) = self.boundary {
            config.boundary = boundary;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.fill_bias.is_some() {
            config.fill_bias = self.fill_bias;
        }
        if self.flush_trailing {
            config.flush_trailing_avalanche = true;
        }
        if self.input_map.is_some() {
            config.input_map = self.input_map.clone();
        }
        if self.save_map.is_some() {
            config.save_map = self.save_map.clone();
        }
        Ok(config)
    }
}

fn run(cli: &Cli) -> SimResult<RunSummary> {
    let config = cli.to_config()?;
    config.validate()?;

    let mut ops = vec![
        TimeSeriesWriterOp::handle(&cli.output)?,
        AvalancheStatsOp::handle(&cli.stats, &config)?,
        ProgressReporterOp::handle(config.report_interval),
    ];
    if let Some(path) = &config.save_map {
        ops.push(MapWriterOp::handle(path));
    }
    let mut sim = Simulation::new(SimProps {
        name: "sandpile",
        config,
        ops,
    })?;
    let summary = sim.run()?;

    if let Some(path) = &cli.summary {
        fs::write(path, serde_json::to_string_pretty(&summary)?)?;
    }
    Ok(summary)
}

fn print_summary(summary: &RunSummary, elapsed_us: u128) {
    println!("\n{}", "=== SANDPILE RUN ===".bold());
    println!("  dynamics:        {} ({} boundary)", summary.dynamics, summary.boundary);
    println!("  grid:            {}x{}", summary.grid_size, summary.grid_size);
    println!("  seed:            {}", summary.seed);
    println!("  steps recorded:  {}", summary.steps_recorded);
    println!(
        "  grains:          {} added, {} forced, {} lost",
        summary.grains_added, summary.grains_forced, summary.grains_lost
    );
    println!("  final density:   {:.4}", summary.density);
    println!("  topples:         {} over {} generations", summary.topples, summary.generations);
    println!("{} {} us", "Total time:".green(), elapsed_us);
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "btw_sandpile=info,sandpile=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let start = Instant::now();

    match run(&cli) {
        Ok(summary) => print_summary(&summary, start.elapsed().as_micros()),
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            process::exit(1);
        }
    }
}
