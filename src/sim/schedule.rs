use crate::random_source::RandomSource;

/// Sorted times at which the continuously driven run forces a grain in.
///
/// Times are drawn independently and uniformly from `[0, steps]`, so several
/// grains may share a time unit.
#[derive(Debug, Clone)]
pub struct GrainSchedule {
    times: Vec<u64>,
    cursor: usize,
}

impl GrainSchedule {
    pub fn build(steps: u64, frequency: f64, rng: &mut RandomSource) -> GrainSchedule {
        let count = (steps as f64 * frequency).floor() as u64;
        let mut times: Vec<u64> = (0..count).map(|_| rng.inclusive(0, steps)).collect();
        times.sort_unstable();
        GrainSchedule { times, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[u64] {
        &self.times
    }

    pub fn remaining(&self) -> usize {
        self.times.len() - self.cursor
    }

    /// Consumes every grain scheduled at or before `t`; returns how many.
    pub fn due(&mut self, t: u64) -> usize {
        let start = self.cursor;
        while self.cursor < self.times.len() && self.times[self.cursor] <= t {
            self.cursor += 1;
        }
        self.cursor - start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::assert_le;

    #[test]
    fn count_and_bounds() {
        let mut rng = RandomSource::new(Some(21));
        for (steps, frequency) in [(1000, 0.5), (999, 0.333), (10, 1.0), (10, 0.0), (7, 0.99)] {
            let schedule = GrainSchedule::build(steps, frequency, &mut rng);
            assert_eq!(schedule.len() as u64, (steps as f64 * frequency).floor() as u64);
            for &t in schedule.times() {
                assert_le!(t, steps);
            }
            assert!(schedule.times().windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn due_drains_in_order() {
        let mut schedule = GrainSchedule { times: vec![0, 2, 2, 5], cursor: 0 };
        assert_eq!(schedule.due(0), 1);
        assert_eq!(schedule.due(1), 0);
        assert_eq!(schedule.due(2), 2);
        assert_eq!(schedule.remaining(), 1);
        assert_eq!(schedule.due(10), 1);
        assert_eq!(schedule.due(10), 0);
        assert_eq!(schedule.remaining(), 0);
    }
}
