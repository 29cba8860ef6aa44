//! Search problem definition and the common strategy contract.
//!
//! A [`SearchProblem`] bundles everything a strategy needs: the required
//! load, the operating context, per-variable bounds, and termination
//! criteria. It is immutable for the duration of one search. Every strategy
//! implements [`SearchStrategy`]; strategy-internal state (populations,
//! swarms, surrogates, multipliers) is private to each implementation and
//! discarded when `optimize` returns.

use std::time::Duration;

use rand::Rng;

use crate::error::ConfigError;
use crate::feasibility::TireDesign;
use crate::tire::Construction;

/// Number of design variables.
pub const NUM_VARIABLES: usize = 5;

/// Design vector ordering used throughout the crate.
pub const VARIABLE_NAMES: [&str; NUM_VARIABLES] = ["PR", "Dm", "Wm", "D", "DF"];

/// Per-variable `(min, max)` bounds in design vector order.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableBounds {
    pub pr: (f64, f64),
    pub dm: (f64, f64),
    pub wm: (f64, f64),
    pub d: (f64, f64),
    pub df: (f64, f64),
}

impl VariableBounds {
    /// The manufacturer-databook reference domain used by the upstream
    /// evaluation runs: `PR 4–38, Dm 12–56, Wm 4–21, D 4–24, DF 5–33`.
    pub fn databook() -> Self {
        Self {
            pr: (4.0, 38.0),
            dm: (12.0, 56.0),
            wm: (4.0, 21.0),
            d: (4.0, 24.0),
            df: (5.0, 33.0),
        }
    }

    /// Bounds as `[(min, max); 5]` in design vector order.
    pub fn pairs(&self) -> [(f64, f64); NUM_VARIABLES] {
        [self.pr, self.dm, self.wm, self.d, self.df]
    }

    /// Draw a uniform random design vector within bounds.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> [f64; NUM_VARIABLES] {
        let mut x = [0.0; NUM_VARIABLES];
        for (xi, (lo, hi)) in x.iter_mut().zip(self.pairs()) {
            *xi = lo + rng.gen::<f64>() * (hi - lo);
        }
        x
    }

    /// Clamp a design vector into bounds, component-wise.
    pub fn clamp(&self, x: &[f64; NUM_VARIABLES]) -> [f64; NUM_VARIABLES] {
        let mut out = *x;
        for (xi, (lo, hi)) in out.iter_mut().zip(self.pairs()) {
            *xi = xi.clamp(lo, hi);
        }
        out
    }

    pub fn contains(&self, x: &[f64; NUM_VARIABLES]) -> bool {
        x.iter()
            .zip(self.pairs())
            .all(|(xi, (lo, hi))| (lo..=hi).contains(xi))
    }

    /// Midpoint of every variable range.
    pub fn midpoint(&self) -> [f64; NUM_VARIABLES] {
        self.pairs().map(|(lo, hi)| (lo + hi) / 2.0)
    }

    /// Per-variable range widths.
    pub fn widths(&self) -> [f64; NUM_VARIABLES] {
        self.pairs().map(|(lo, hi)| hi - lo)
    }
}

/// Explicit per-variable value grids for the discrete random search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscreteBounds {
    /// Ascending candidate values per variable, design vector order.
    pub values: [Vec<f64>; NUM_VARIABLES],
}

impl DiscreteBounds {
    /// Discretize continuous bounds with a fixed step per variable.
    ///
    /// Each grid always includes the lower bound and stops at the last step
    /// that does not exceed the upper bound.
    pub fn from_steps(bounds: &VariableBounds, steps: [f64; NUM_VARIABLES]) -> Self {
        let values = std::array::from_fn(|i| {
            let (lo, hi) = bounds.pairs()[i];
            let step = steps[i];
            let mut grid = Vec::new();
            let mut k = 0usize;
            loop {
                let v = lo + step * k as f64;
                if v > hi {
                    break;
                }
                grid.push(v);
                k += 1;
            }
            grid
        });
        Self { values }
    }

    /// The design vector addressed by a grid index tuple.
    pub fn design(&self, idx: &[usize; NUM_VARIABLES]) -> [f64; NUM_VARIABLES] {
        std::array::from_fn(|i| self.values[i][idx[i]])
    }

    /// Grid indices of the value closest to `x` in each variable.
    pub fn nearest_indices(&self, x: &[f64; NUM_VARIABLES]) -> [usize; NUM_VARIABLES] {
        std::array::from_fn(|i| {
            self.values[i]
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    (*a - x[i])
                        .abs()
                        .partial_cmp(&(*b - x[i]).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(k, _)| k)
                .unwrap_or(0)
        })
    }

    /// Draw a random grid index tuple.
    pub fn sample_indices<R: Rng>(&self, rng: &mut R) -> [usize; NUM_VARIABLES] {
        std::array::from_fn(|i| rng.gen_range(0..self.values[i].len()))
    }
}

/// Termination criteria shared by every strategy.
///
/// A search stops at whichever comes first: the iteration cap, the wall-clock
/// budget (checked cooperatively at iteration boundaries), or convergence
/// (strategy-specific, parameterized by `convergence_tol` as a relative
/// improvement threshold).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Termination {
    pub max_iterations: usize,
    pub max_runtime: Duration,
    pub convergence_tol: f64,
}

impl Default for Termination {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            max_runtime: Duration::from_secs(15 * 60),
            convergence_tol: 1e-3,
        }
    }
}

/// One immutable sizing problem instance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchProblem {
    /// Minimum required load capacity (lbf).
    pub required_load: f64,
    /// Speed rating of the target aircraft (mph); 0 means unrated.
    pub speed_index: f64,
    pub construction: Construction,
    pub bounds: VariableBounds,
    /// Cord breaking load (N); when set, mechanical feasibility becomes a
    /// hard constraint of the predicate.
    pub cord_break_load: Option<f64>,
    pub termination: Termination,
}

impl SearchProblem {
    pub fn new(required_load: f64, bounds: VariableBounds) -> Self {
        Self {
            required_load,
            speed_index: 0.0,
            construction: Construction::default(),
            bounds,
            cord_break_load: None,
            termination: Termination::default(),
        }
    }

    pub fn with_speed_index(mut self, speed_index: f64) -> Self {
        self.speed_index = speed_index;
        self
    }

    pub fn with_construction(mut self, construction: Construction) -> Self {
        self.construction = construction;
        self
    }

    pub fn with_cord_break_load(mut self, break_load: f64) -> Self {
        self.cord_break_load = Some(break_load);
        self
    }

    pub fn with_termination(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }
}

/// The contract every search strategy implements.
///
/// `Ok(None)` means the strategy exhausted its budget without finding any
/// feasible design (an infeasible problem, not a tool failure);
/// configuration errors are reported before any iteration runs. All
/// randomness is drawn from the caller's generator, so a fixed seed
/// reproduces the run exactly.
pub trait SearchStrategy {
    fn optimize<R: Rng>(
        &self,
        problem: &SearchProblem,
        rng: &mut R,
    ) -> Result<Option<TireDesign>, ConfigError>;
}
