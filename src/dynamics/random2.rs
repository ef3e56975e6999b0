use super::{push_grain, Dynamics, DynamicsKind};
use crate::constants::RANDOM2_TOPPLE_AMOUNT;
use crate::lattice::{CriticalSet, Lattice, Site};
use crate::random_source::RandomSource;

/// Stochastic two-grain rule: a toppling site loses two grains, one to a
/// random neighbour along each axis.
#[derive(Debug, Clone)]
pub struct Random2Dynamics {
    fill_bias: f64,
}

impl Random2Dynamics {
    pub fn new(fill_bias: f64) -> Self {
        Self { fill_bias }
    }
}

impl Dynamics for Random2Dynamics {
    fn kind(&self) -> DynamicsKind {
        DynamicsKind::Random2
    }

    fn topple_amount(&self) -> u32 {
        RANDOM2_TOPPLE_AMOUNT
    }

    fn fill_bias(&self) -> f64 {
        self.fill_bias
    }

    fn shed(
        &self,
        source: Site,
        lattice: &mut Lattice,
        rng: &mut RandomSource,
        next: &mut CriticalSet,
    ) -> u32 {
        let di = rng.unit_step();
        let dj = rng.unit_step();
        push_grain(lattice, source, di, 0, next) + push_grain(lattice, source, 0, dj, next)
    }
}
