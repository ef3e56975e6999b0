use crate::dynamics::Dynamics;
use crate::lattice::{CriticalSet, Lattice, Site};
use crate::random_source::RandomSource;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CascadeState {
    /// No critical sites; waiting for a grain.
    Quiescent,
    /// A wavefront is pending relaxation.
    Active,
}

/// What one time unit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    GrainAdded,
    Relaxed { toppled: usize, grains_delta: i64 },
    Idle,
}

/// Drives the lattice through avalanches one generation at a time.
///
/// The wavefront being consumed and the one being built are separate
/// vectors; the pending set is swapped out before relaxation and replaced by
/// the strategy's output.
#[derive(Debug, Clone, Default)]
pub struct CascadeScheduler {
    critical: CriticalSet,
    generations: u64,
    topples: u64,
}

impl CascadeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with every critical site of `lattice` pending, as when a saved
    /// map is loaded mid-avalanche.
    pub fn from_lattice(lattice: &Lattice) -> Self {
        Self {
            critical: lattice.critical_sites(),
            ..Self::default()
        }
    }

    pub fn state(&self) -> CascadeState {
        if self.critical.is_empty() {
            CascadeState::Quiescent
        } else {
            CascadeState::Active
        }
    }

    pub fn critical_count(&self) -> usize {
        self.critical.len()
    }

    pub fn critical_sites(&self) -> &[Site] {
        &self.critical
    }

    /// Generations relaxed so far.
    pub fn generations(&self) -> u64 {
        self.generations
    }

    /// Individual site topples so far.
    pub fn topples(&self) -> u64 {
        self.topples
    }

    /// One slowly driven time unit: relax if active, otherwise add a grain.
    pub fn advance(&mut self, lattice: &mut Lattice, dynamics: &dyn Dynamics, rng: &mut RandomSource) -> Advance {
        match self.state() {
            CascadeState::Quiescent => {
                dynamics.add_grain(lattice, rng, &mut self.critical);
                Advance::GrainAdded
            }
            CascadeState::Active => self.relax_generation(lattice, dynamics, rng),
        }
    }

    /// Relaxes the pending wavefront; idle when quiescent.
    pub fn relax_generation(
        &mut self,
        lattice: &mut Lattice,
        dynamics: &dyn Dynamics,
        rng: &mut RandomSource,
    ) -> Advance {
        if self.critical.is_empty() {
            return Advance::Idle;
        }
        let current = std::mem::take(&mut self.critical);
        let relaxation = dynamics.relax(&current, lattice, rng);
        self.critical = relaxation.next;
        self.generations += 1;
        self.topples += relaxation.toppled as u64;
        Advance::Relaxed {
            toppled: relaxation.toppled,
            grains_delta: relaxation.grains_delta,
        }
    }

    /// Adds a grain regardless of state; a newly critical site joins the
    /// pending wavefront.
    pub fn inject_grain(&mut self, lattice: &mut Lattice, dynamics: &dyn Dynamics, rng: &mut RandomSource) -> i64 {
        dynamics.add_grain(lattice, rng, &mut self.critical)
    }
}
