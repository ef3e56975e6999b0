//! Bak-Tang-Wiesenfeld sandpile simulator.
//!
//! Grains are dropped on an N×N lattice; sites holding four or more grains
//! topple onto their neighbours, and the resulting avalanches are recorded as
//! a time series of critical-site counts plus per-avalanche statistics.

pub mod constants;
pub mod dynamics;
pub mod error;
pub mod lattice;
pub mod random_source;
pub mod sim;
pub mod stats;

pub use error::{SimError, SimResult};
