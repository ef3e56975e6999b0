//! Toppling rules.
//!
//! A strategy decides how a freshly built grid is filled, where driving grains
//! land, and where the grains of a toppling site go. The generation mechanics
//! (skip sites that are no longer critical, subtract, shed, re-append the
//! source if it is still critical) are shared by every strategy through
//! [`Dynamics::relax`].

mod classical;
mod random2;

pub use classical::ClassicalDynamics;
pub use random2::Random2Dynamics;

use crate::constants::{CLASSICAL_FILL_BIAS, RANDOM2_FILL_BIAS, TOPPLE_THRESHOLD};
use crate::error::{SimError, SimResult};
use crate::lattice::{CriticalSet, Lattice, Shed, Site};
use crate::random_source::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Registered toppling rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DynamicsKind {
    /// Four neighbours, one grain each.
    #[default]
    Classical,
    /// One random horizontal and one random vertical neighbour.
    Random2,
}

impl FromStr for DynamicsKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect();
        match key.as_str() {
            "classical" => Ok(DynamicsKind::Classical),
            "random2" => Ok(DynamicsKind::Random2),
            "forestfire" => Err(SimError::UnsupportedDynamics(
                "forest-fire has no toppling strategy".to_string(),
            )),
            _ => Err(SimError::UnsupportedDynamics(s.to_string())),
        }
    }
}

impl TryFrom<String> for DynamicsKind {
    type Error = SimError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DynamicsKind> for String {
    fn from(kind: DynamicsKind) -> String {
        kind.to_string()
    }
}

impl fmt::Display for DynamicsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicsKind::Classical => write!(f, "classical"),
            DynamicsKind::Random2 => write!(f, "random2"),
        }
    }
}

/// Result of relaxing one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relaxation {
    /// Sites critical after this generation, in the order they became critical.
    pub next: CriticalSet,
    /// Change to the grain total (zero or negative; already applied to the lattice).
    pub grains_delta: i64,
    /// Sites that actually toppled.
    pub toppled: usize,
}

pub trait Dynamics {
    fn kind(&self) -> DynamicsKind;

    /// Grains removed from a site each time it topples.
    fn topple_amount(&self) -> u32;

    /// Chance that an initial cell value below 3 is bumped by one.
    fn fill_bias(&self) -> f64;

    /// Distributes the grains of `source`, which has already been toppled.
    /// Neighbours reaching the threshold are appended to `next`.
    /// Returns the number of grains that left the grid.
    fn shed(
        &self,
        source: Site,
        lattice: &mut Lattice,
        rng: &mut RandomSource,
        next: &mut CriticalSet,
    ) -> u32;

    /// Fills every cell and returns the resulting grain total.
    fn initialize_map(&self, lattice: &mut Lattice, rng: &mut RandomSource) -> i64 {
        let bias = self.fill_bias();
        let size = lattice.size();
        for i in 0..size {
            for j in 0..size {
                let mut amount = rng.index(4) as u32;
                if amount < 3 && bias > 0.0 && rng.chance(bias) {
                    amount += 1;
                }
                lattice.set(Site::new(i, j), amount);
            }
        }
        lattice.total_grains()
    }

    /// Drops one grain on a uniformly random cell. Returns grains added.
    fn add_grain(&self, lattice: &mut Lattice, rng: &mut RandomSource, critical: &mut CriticalSet) -> i64 {
        let size = lattice.size();
        let target = Site::new(rng.index(size), rng.index(size));
        let (site, count) = lattice.add_grain_at(target);
        if count == TOPPLE_THRESHOLD {
            critical.push(site);
        }
        1
    }

    /// Topples every site of `critical` as one generation.
    fn relax(&self, critical: &[Site], lattice: &mut Lattice, rng: &mut RandomSource) -> Relaxation {
        let mut next = CriticalSet::new();
        let mut lost: i64 = 0;
        let mut toppled = 0;

        for &site in critical {
            // already relaxed earlier in this generation
            if lattice.get(site) < TOPPLE_THRESHOLD {
                continue;
            }
            lattice.topple(site, self.topple_amount());
            lost += self.shed(site, lattice, rng, &mut next) as i64;
            toppled += 1;

            if lattice.get(site) >= TOPPLE_THRESHOLD {
                next.push(site);
            }
        }

        Relaxation {
            next,
            grains_delta: -lost,
            toppled,
        }
    }
}

/// Moves one grain from `source` toward `(di, dj)`. Returns 1 if it left the grid.
///
/// A grain that wraps back onto the source itself never queues it; the source
/// is re-checked once all of its grains are out.
pub(crate) fn push_grain(
    lattice: &mut Lattice,
    source: Site,
    di: isize,
    dj: isize,
    next: &mut CriticalSet,
) -> u32 {
    match lattice.increment_neighbor(source, di, dj) {
        Shed::Landed { site, count } => {
            if count == TOPPLE_THRESHOLD && site != source {
                next.push(site);
            }
            0
        }
        Shed::Lost => 1,
    }
}

/// Builds the strategy for `kind`. `fill_bias` overrides the variant's default skew.
pub fn build_dynamics(kind: DynamicsKind, fill_bias: Option<f64>) -> SimResult<Box<dyn Dynamics>> {
    if let Some(bias) = fill_bias {
        if !(0.0..=1.0).contains(&bias) {
            return Err(SimError::InvalidFillBias(bias));
        }
    }

    let dynamics: Box<dyn Dynamics> = match kind {
        DynamicsKind::Classical => Box::new(ClassicalDynamics::new(fill_bias.unwrap_or(CLASSICAL_FILL_BIAS))),
        DynamicsKind::Random2 => Box::new(Random2Dynamics::new(fill_bias.unwrap_or(RANDOM2_FILL_BIAS))),
    };
    debug!(
        dynamics = %kind,
        fill_bias = dynamics.fill_bias(),
        topple_amount = dynamics.topple_amount(),
        "built dynamics"
    );
    Ok(dynamics)
}

/// Parses a dynamics name and builds it.
pub fn build_dynamics_named(name: &str, fill_bias: Option<f64>) -> SimResult<Box<dyn Dynamics>> {
    build_dynamics(name.parse()?, fill_bias)
}
