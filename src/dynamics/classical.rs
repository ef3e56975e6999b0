use super::{push_grain, Dynamics, DynamicsKind};
use crate::constants::CLASSICAL_TOPPLE_AMOUNT;
use crate::lattice::{CriticalSet, Lattice, Site};
use crate::random_source::RandomSource;

const NEIGHBOR_OFFSETS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Bak-Tang-Wiesenfeld rule: a toppling site gives one grain to each of its
/// four nearest neighbours.
#[derive(Debug, Clone)]
pub struct ClassicalDynamics {
    fill_bias: f64,
}

impl ClassicalDynamics {
    pub fn new(fill_bias: f64) -> Self {
        Self { fill_bias }
    }
}

impl Dynamics for ClassicalDynamics {
    fn kind(&self) -> DynamicsKind {
        DynamicsKind::Classical
    }

    fn topple_amount(&self) -> u32 {
        CLASSICAL_TOPPLE_AMOUNT
    }

    fn fill_bias(&self) -> f64 {
        self.fill_bias
    }

    fn shed(
        &self,
        source: Site,
        lattice: &mut Lattice,
        _rng: &mut RandomSource,
        next: &mut CriticalSet,
    ) -> u32 {
        NEIGHBOR_OFFSETS
            .iter()
            .map(|&(di, dj)| push_grain(lattice, source, di, dj, next))
            .sum()
    }
}
