use crate::constants::TOPPLE_THRESHOLD;
use crate::dynamics::Dynamics;
use crate::error::{SimError, SimResult};
use crate::random_source::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Site {
    pub i: usize,
    pub j: usize,
}

impl Site {
    pub fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }
}

/// Wavefront of sites due to topple in the current generation, in insertion order.
pub type CriticalSet = Vec<Site>;

/// What happens to grains pushed across the edge of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    /// Off-grid grains are dropped and counted as lost.
    #[default]
    Open,
    /// Coordinates wrap modulo the grid size; nothing is lost.
    Periodic,
}

impl FromStr for Boundary {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Boundary::Open),
            "periodic" | "wrap" => Ok(Boundary::Periodic),
            other => Err(SimError::InvalidBoundary(other.to_string())),
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Open => write!(f, "open"),
            Boundary::Periodic => write!(f, "periodic"),
        }
    }
}

/// Outcome of pushing one grain toward a neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shed {
    Landed { site: Site, count: u32 },
    Lost,
}

/// N×N grid of grain counts plus the running grain total.
///
/// `total_grains` always equals the sum of all cells: grains leaving through
/// an open edge are subtracted at the moment they leave.
#[derive(Debug, Clone)]
pub struct Lattice {
    size: usize,
    boundary: Boundary,
    cells: Vec<u32>,
    total_grains: i64,
    lost_grains: u64,
}

impl Lattice {
    pub fn new(size: usize, boundary: Boundary) -> SimResult<Lattice> {
        if size == 0 {
            return Err(SimError::InvalidGridSize(size));
        }
        Ok(Lattice {
            size,
            boundary,
            cells: vec![0; size * size],
            total_grains: 0,
            lost_grains: 0,
        })
    }

    /// Builds a grid and fills it with the strategy's randomized initial state.
    pub fn initialize(
        size: usize,
        boundary: Boundary,
        dynamics: &dyn Dynamics,
        rng: &mut RandomSource,
    ) -> SimResult<Lattice> {
        let mut lattice = Lattice::new(size, boundary)?;
        dynamics.initialize_map(&mut lattice, rng);
        Ok(lattice)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn total_grains(&self) -> i64 {
        self.total_grains
    }

    /// Grains that have left through an open edge since construction.
    pub fn lost_grains(&self) -> u64 {
        self.lost_grains
    }

    fn offset(&self, site: Site) -> usize {
        site.i * self.size + site.j
    }

    pub fn get(&self, site: Site) -> u32 {
        self.cells[self.offset(site)]
    }

    /// Overwrites one cell, keeping the grain total in step.
    pub fn set(&mut self, site: Site, value: u32) {
        let idx = self.offset(site);
        self.total_grains += value as i64 - self.cells[idx] as i64;
        self.cells[idx] = value;
    }

    pub fn add_grain_at(&mut self, site: Site) -> (Site, u32) {
        let idx = self.offset(site);
        self.cells[idx] += 1;
        self.total_grains += 1;
        (site, self.cells[idx])
    }

    /// Removes `amount` grains from a site that is about to redistribute them.
    /// The total is untouched: the grains are still on (or leaving) the grid.
    pub fn topple(&mut self, site: Site, amount: u32) -> u32 {
        let idx = self.offset(site);
        self.cells[idx] -= amount;
        self.cells[idx]
    }

    /// Resolves the cell at offset `(di, dj)` from `site` under the boundary policy.
    pub fn neighbor(&self, site: Site, di: isize, dj: isize) -> Option<Site> {
        let n = self.size as isize;
        let a = site.i as isize + di;
        let b = site.j as isize + dj;
        match self.boundary {
            Boundary::Open => {
                if (0..n).contains(&a) && (0..n).contains(&b) {
                    Some(Site::new(a as usize, b as usize))
                } else {
                    None
                }
            }
            Boundary::Periodic => Some(Site::new(a.rem_euclid(n) as usize, b.rem_euclid(n) as usize)),
        }
    }

    pub fn neighbor_value(&self, site: Site, di: isize, dj: isize) -> Option<u32> {
        self.neighbor(site, di, dj).map(|n| self.get(n))
    }

    /// Moves one grain from `site`'s redistribution pool onto a neighbour.
    pub fn increment_neighbor(&mut self, site: Site, di: isize, dj: isize) -> Shed {
        match self.neighbor(site, di, dj) {
            Some(target) => {
                let idx = self.offset(target);
                self.cells[idx] += 1;
                Shed::Landed {
                    site: target,
                    count: self.cells[idx],
                }
            }
            None => {
                self.total_grains -= 1;
                self.lost_grains += 1;
                Shed::Lost
            }
        }
    }

    pub fn grid_sum(&self) -> i64 {
        self.cells.iter().map(|&c| c as i64).sum()
    }

    /// Average grains per cell.
    pub fn density(&self) -> f64 {
        self.total_grains as f64 / (self.size * self.size) as f64
    }

    /// Every site at or above the topple threshold, in row-major order.
    pub fn critical_sites(&self) -> CriticalSet {
        self.sites()
            .filter(|&site| self.get(site) >= TOPPLE_THRESHOLD)
            .collect()
    }

    pub fn sites(&self) -> impl Iterator<Item = Site> + '_ {
        (0..self.size).flat_map(move |i| (0..self.size).map(move |j| Site::new(i, j)))
    }

    /// Rebuilds a grid from a grain map: one line per row, counts separated by
    /// whitespace or `;` (a trailing separator is allowed). Accepts the output
    /// of [`Lattice::render`]. The map must be square.
    pub fn from_rendered(text: &str, boundary: Boundary) -> SimResult<Lattice> {
        let rows = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(r, line)| parse_map_row(r, line))
            .collect::<SimResult<Vec<Vec<u32>>>>()?;
        if rows.is_empty() {
            return Err(SimError::InvalidMap("map has no rows".to_string()));
        }

        let size = rows.len();
        let mut lattice = Lattice::new(size, boundary)?;
        for (i, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(SimError::InvalidMap(format!(
                    "row {} has {} cells, expected {}",
                    i + 1,
                    row.len(),
                    size
                )));
            }
            for (j, &count) in row.iter().enumerate() {
                lattice.set(Site::new(i, j), count);
            }
        }
        Ok(lattice)
    }

    /// Space separated rows, one line per row.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() * 2);
        for row in self.cells.chunks(self.size) {
            let line: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }
}

fn parse_map_row(index: usize, line: &str) -> SimResult<Vec<u32>> {
    line.split(|c: char| c == ';' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<u32>()
                .map_err(|_| SimError::InvalidMap(format!("row {}: {:?} is not a grain count", index + 1, token)))
        })
        .collect()
}
