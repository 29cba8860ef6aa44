//! Local neighborhood random search.
//!
//! Starts from a random (or caller-supplied) feasible design, then
//! repeatedly evaluates the full ±1-step combinatorial neighborhood around
//! the incumbent — `3⁵ − 1 = 242` moves — and adopts the best improving
//! feasible neighbor. Terminates when no neighbor improves, when the
//! relative mass improvement drops below the convergence tolerance, or when
//! the iteration/runtime budget runs out.
//!
//! Two variants share the descent loop: the continuous variant steps by a
//! fixed fraction of each variable's range, the discrete variant steps
//! through explicit per-variable value grids by index.

use std::time::Instant;

use rand::Rng;
use tracing::debug;

use crate::error::ConfigError;
use crate::feasibility::{evaluate_design, TireDesign};
use crate::problem::{DiscreteBounds, SearchProblem, SearchStrategy, NUM_VARIABLES};

/// All ±1 offsets of the 5-dimensional neighborhood, excluding the origin.
fn neighbor_offsets() -> Vec<[i32; NUM_VARIABLES]> {
    let mut offsets = Vec::with_capacity(242);
    for code in 0..3usize.pow(NUM_VARIABLES as u32) {
        let mut ofs = [0i32; NUM_VARIABLES];
        let mut c = code;
        for slot in ofs.iter_mut() {
            *slot = (c % 3) as i32 - 1;
            c /= 3;
        }
        if ofs != [0; NUM_VARIABLES] {
            offsets.push(ofs);
        }
    }
    offsets
}

/// Find a feasible starting design by uniform sampling, bounded by attempt
/// count and the problem's runtime budget.
fn find_feasible_start<R: Rng>(
    problem: &SearchProblem,
    seed_design: Option<&[f64; NUM_VARIABLES]>,
    max_attempts: usize,
    started: Instant,
    rng: &mut R,
) -> Option<([f64; NUM_VARIABLES], TireDesign)> {
    if let Some(seed) = seed_design {
        let clamped = problem.bounds.clamp(seed);
        if let Some(design) = evaluate_design(&clamped, problem) {
            return Some((clamped, design));
        }
    }

    for _ in 0..max_attempts {
        if started.elapsed() >= problem.termination.max_runtime {
            return None;
        }
        let x = problem.bounds.sample(rng);
        if let Some(design) = evaluate_design(&x, problem) {
            return Some((x, design));
        }
    }
    None
}

/// Continuous-variable local random search.
///
/// Steps each variable by `step_fraction` of its bound range.
#[derive(Debug, Clone)]
pub struct ContinuousRandomSearch {
    /// Neighborhood step as a fraction of each variable's range.
    pub step_fraction: f64,
    /// Attempt budget for the feasible-start initialization.
    pub init_attempts: usize,
    /// Optional starting design; clamped into bounds before use.
    pub seed_design: Option<[f64; NUM_VARIABLES]>,
}

impl Default for ContinuousRandomSearch {
    fn default() -> Self {
        Self {
            step_fraction: 0.02,
            init_attempts: 5_000,
            seed_design: None,
        }
    }
}

impl ContinuousRandomSearch {
    pub fn with_seed_design(mut self, seed: [f64; NUM_VARIABLES]) -> Self {
        self.seed_design = Some(seed);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step_fraction > 0.0 && self.step_fraction <= 1.0) {
            return Err(ConfigError::ProbabilityOutOfRange {
                name: "step_fraction",
                got: self.step_fraction,
            });
        }
        if self.init_attempts == 0 {
            return Err(ConfigError::BelowMinimum {
                name: "init_attempts",
                min: 1,
                got: 0,
            });
        }
        Ok(())
    }
}

impl SearchStrategy for ContinuousRandomSearch {
    fn optimize<R: Rng>(
        &self,
        problem: &SearchProblem,
        rng: &mut R,
    ) -> Result<Option<TireDesign>, ConfigError> {
        self.validate()?;
        let started = Instant::now();

        let Some((mut current, mut best)) = find_feasible_start(
            problem,
            self.seed_design.as_ref(),
            self.init_attempts,
            started,
            rng,
        ) else {
            return Ok(None);
        };

        let steps = problem.bounds.widths().map(|w| w * self.step_fraction);
        let offsets = neighbor_offsets();
        let tol = problem.termination.convergence_tol;

        for iteration in 0..problem.termination.max_iterations {
            if started.elapsed() >= problem.termination.max_runtime {
                break;
            }

            let mut best_neighbor: Option<([f64; NUM_VARIABLES], TireDesign)> = None;
            for ofs in &offsets {
                let mut candidate = current;
                for (xi, (o, step)) in candidate.iter_mut().zip(ofs.iter().zip(steps)) {
                    *xi += *o as f64 * step;
                }
                let candidate = problem.bounds.clamp(&candidate);
                if let Some(design) = evaluate_design(&candidate, problem) {
                    let improves = match &best_neighbor {
                        Some((_, incumbent)) => design.mass < incumbent.mass,
                        None => true,
                    };
                    if improves {
                        best_neighbor = Some((candidate, design));
                    }
                }
            }

            match best_neighbor {
                Some((x, design)) if design.mass < best.mass => {
                    let improvement = (best.mass - design.mass) / best.mass;
                    current = x;
                    best = design;
                    if improvement <= tol {
                        debug!(iteration, mass = best.mass, "random search converged");
                        break;
                    }
                }
                // No improving feasible neighbor: local optimum reached.
                _ => break,
            }
        }

        Ok(Some(best))
    }
}

/// Discrete-variable local random search over explicit value grids.
#[derive(Debug, Clone)]
pub struct DiscreteRandomSearch {
    /// Grid resolution per variable, `[PR, Dm, Wm, D, DF]`.
    pub steps: [f64; NUM_VARIABLES],
    /// Attempt budget for the feasible-start initialization.
    pub init_attempts: usize,
    /// Optional starting design; snapped to the nearest grid point.
    pub seed_design: Option<[f64; NUM_VARIABLES]>,
}

impl Default for DiscreteRandomSearch {
    fn default() -> Self {
        Self {
            steps: [1.0, 0.5, 0.25, 0.5, 0.5],
            init_attempts: 5_000,
            seed_design: None,
        }
    }
}

impl DiscreteRandomSearch {
    pub fn with_seed_design(mut self, seed: [f64; NUM_VARIABLES]) -> Self {
        self.seed_design = Some(seed);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for step in self.steps {
            if step <= 0.0 {
                return Err(ConfigError::NonPositive {
                    name: "grid step",
                    got: step,
                });
            }
        }
        if self.init_attempts == 0 {
            return Err(ConfigError::BelowMinimum {
                name: "init_attempts",
                min: 1,
                got: 0,
            });
        }
        Ok(())
    }
}

impl SearchStrategy for DiscreteRandomSearch {
    fn optimize<R: Rng>(
        &self,
        problem: &SearchProblem,
        rng: &mut R,
    ) -> Result<Option<TireDesign>, ConfigError> {
        self.validate()?;
        let started = Instant::now();
        let grid = DiscreteBounds::from_steps(&problem.bounds, self.steps);

        // Feasible start on the grid.
        let mut state: Option<([usize; NUM_VARIABLES], TireDesign)> = None;
        if let Some(seed) = &self.seed_design {
            let idx = grid.nearest_indices(seed);
            if let Some(design) = evaluate_design(&grid.design(&idx), problem) {
                state = Some((idx, design));
            }
        }
        if state.is_none() {
            for _ in 0..self.init_attempts {
                if started.elapsed() >= problem.termination.max_runtime {
                    return Ok(None);
                }
                let idx = grid.sample_indices(rng);
                if let Some(design) = evaluate_design(&grid.design(&idx), problem) {
                    state = Some((idx, design));
                    break;
                }
            }
        }
        let Some((mut current, mut best)) = state else {
            return Ok(None);
        };

        let offsets = neighbor_offsets();
        let tol = problem.termination.convergence_tol;

        for iteration in 0..problem.termination.max_iterations {
            if started.elapsed() >= problem.termination.max_runtime {
                break;
            }

            let mut best_neighbor: Option<([usize; NUM_VARIABLES], TireDesign)> = None;
            for ofs in &offsets {
                let mut idx = current;
                let mut in_grid = true;
                for (slot, (o, values)) in idx.iter_mut().zip(ofs.iter().zip(&grid.values)) {
                    let moved = *slot as i64 + *o as i64;
                    if moved < 0 || moved >= values.len() as i64 {
                        in_grid = false;
                        break;
                    }
                    *slot = moved as usize;
                }
                if !in_grid {
                    continue;
                }
                if let Some(design) = evaluate_design(&grid.design(&idx), problem) {
                    let improves = match &best_neighbor {
                        Some((_, incumbent)) => design.mass < incumbent.mass,
                        None => true,
                    };
                    if improves {
                        best_neighbor = Some((idx, design));
                    }
                }
            }

            match best_neighbor {
                Some((idx, design)) if design.mass < best.mass => {
                    let improvement = (best.mass - design.mass) / best.mass;
                    current = idx;
                    best = design;
                    if improvement <= tol {
                        debug!(iteration, mass = best.mass, "grid search converged");
                        break;
                    }
                }
                _ => break,
            }
        }

        Ok(Some(best))
    }
}
