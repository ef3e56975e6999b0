pub mod cascade;
pub mod config;
pub mod schedule;
pub mod sim_op;
pub mod simulation;

pub use cascade::{Advance, CascadeScheduler, CascadeState};
pub use config::{DrivingMode, SimConfig};
pub use schedule::GrainSchedule;
pub use simulation::{RunPhase, RunSummary, SimProps, Simulation};
