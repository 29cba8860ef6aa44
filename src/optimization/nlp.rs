//! Gradient-based nonlinear-program formulation.
//!
//! The sizing problem is posed as a coupled analysis: response components
//! compute load capacity, inflation-medium mass, and (optionally) cord
//! tension from the design vector; the mass response is the objective and
//! the remaining responses feed inequality constraints (`Dm > DF`,
//! `DF > D`, the aspect-ratio band, `Lm ≥ required_load`, cord tension
//! within the breaking load), all expressed as `c(x) ≥ 0`.
//!
//! The constrained solve is an augmented-Lagrangian method with
//! finite-difference gradients and projected backtracking descent — the
//! sequential least-squares role of the upstream formulation, implemented
//! in-crate. A solve that ends without satisfying the constraints is
//! retried from a jittered start with the required load incremented, at
//! most [`GradientSearch::max_retries`] attempts, after which the search
//! reports no solution.

use std::time::Instant;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::error::{ConfigError, DomainError};
use crate::feasibility::{evaluate_design, TireDesign, ASPECT_RATIO_MAX, ASPECT_RATIO_MIN};
use crate::problem::{SearchProblem, SearchStrategy, NUM_VARIABLES};
use crate::tire::{CordModel, GasConditions, Tire};

/// Penalized-objective value substituted when a response fails on a domain
/// error, steering the line search away from degenerate geometry.
const DOMAIN_FAILURE_VALUE: f64 = 1.0e9;

/// Geometric ordering margin, matching the upstream constraint lower bound.
const ORDERING_MARGIN: f64 = 1e-4;

/// Length scale (in) used to normalize the ordering constraints.
const GEOMETRY_SCALE: f64 = 10.0;

/// A response of the coupled analysis: one scalar output of the physics
/// model evaluated at a design vector.
trait Response {
    fn evaluate(&self, x: &[f64; NUM_VARIABLES]) -> Result<f64, DomainError>;
}

/// Exact load capacity response.
struct LoadCapacity {
    speed_index: f64,
    construction: crate::tire::Construction,
}

impl Response for LoadCapacity {
    fn evaluate(&self, x: &[f64; NUM_VARIABLES]) -> Result<f64, DomainError> {
        Tire::from_design(x)
            .with_speed_index(self.speed_index)
            .with_construction(self.construction)
            .max_load_capacity(true)
    }
}

/// Inflation-medium mass response, the objective.
struct GasMass {
    speed_index: f64,
    construction: crate::tire::Construction,
}

impl Response for GasMass {
    fn evaluate(&self, x: &[f64; NUM_VARIABLES]) -> Result<f64, DomainError> {
        Tire::from_design(x)
            .with_speed_index(self.speed_index)
            .with_construction(self.construction)
            .inflation_medium_mass(&GasConditions::default())
    }
}

/// Walter cord tension response for the mechanical feasibility constraint.
struct CordTension {
    speed_index: f64,
    construction: crate::tire::Construction,
}

impl Response for CordTension {
    fn evaluate(&self, x: &[f64; NUM_VARIABLES]) -> Result<f64, DomainError> {
        Tire::from_design(x)
            .with_speed_index(self.speed_index)
            .with_construction(self.construction)
            .cord_tension(CordModel::Walter)
    }
}

/// Gradient-based NLP configuration.
#[derive(Debug, Clone)]
pub struct GradientSearch {
    /// Convergence tolerance on the normalized constraint violation; `None`
    /// uses the problem's `convergence_tol`.
    pub tol: Option<f64>,
    /// Perturb-and-retry budget after solver failures.
    pub max_retries: usize,
    /// Projected-descent steps per augmented-Lagrangian round.
    pub inner_iterations: usize,
    /// Multiplier/penalty update rounds per attempt.
    pub outer_iterations: usize,
    /// Relative finite-difference step.
    pub fd_step: f64,
    /// Optional initial guess; out-of-bounds guesses fall back to the
    /// bounds midpoint, as does `None`.
    pub initial_guess: Option<[f64; NUM_VARIABLES]>,
}

impl Default for GradientSearch {
    fn default() -> Self {
        Self {
            tol: None,
            max_retries: 10,
            inner_iterations: 150,
            outer_iterations: 25,
            fd_step: 1e-6,
            initial_guess: None,
        }
    }
}

impl GradientSearch {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(tol) = self.tol {
            if tol <= 0.0 {
                return Err(ConfigError::NonPositive {
                    name: "tol",
                    got: tol,
                });
            }
        }
        if self.max_retries == 0 {
            return Err(ConfigError::BelowMinimum {
                name: "max_retries",
                min: 1,
                got: 0,
            });
        }
        if self.inner_iterations == 0 || self.outer_iterations == 0 {
            return Err(ConfigError::BelowMinimum {
                name: "solver iterations",
                min: 1,
                got: 0,
            });
        }
        if self.fd_step <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "fd_step",
                got: self.fd_step,
            });
        }
        Ok(())
    }
}

/// The assembled NLP: objective, constraints, and bounds.
struct NlpProblem<'a> {
    objective: GasMass,
    load: LoadCapacity,
    tension: Option<(CordTension, f64)>,
    required_load: f64,
    problem: &'a SearchProblem,
}

impl NlpProblem<'_> {
    fn objective_value(&self, x: &[f64; NUM_VARIABLES]) -> f64 {
        self.objective
            .evaluate(x)
            .unwrap_or(DOMAIN_FAILURE_VALUE)
    }

    /// All inequality constraints as `c(x) ≥ 0`, normalized to comparable
    /// magnitudes. Domain failures read as strongly violated.
    fn constraints(&self, x: &[f64; NUM_VARIABLES]) -> Vec<f64> {
        let [_, dm, wm, d, df] = *x;
        let mut c = vec![
            (dm - df - ORDERING_MARGIN) / GEOMETRY_SCALE,
            (df - d - ORDERING_MARGIN) / GEOMETRY_SCALE,
        ];
        if wm > 0.0 {
            let aspect = (dm - d) / (2.0 * wm);
            c.push(aspect - ASPECT_RATIO_MIN);
            c.push(ASPECT_RATIO_MAX - aspect);
        } else {
            c.push(-1.0);
            c.push(-1.0);
        }
        c.push(match self.load.evaluate(x) {
            Ok(lm) => (lm - self.required_load) / self.required_load,
            Err(_) => -1.0,
        });
        if let Some((tension, break_load)) = &self.tension {
            c.push(match tension.evaluate(x) {
                Ok(t) => (break_load - t) / break_load,
                Err(_) => -1.0,
            });
        }
        c
    }

    fn num_constraints(&self) -> usize {
        if self.tension.is_some() {
            6
        } else {
            5
        }
    }

    /// Augmented Lagrangian for inequality constraints `c(x) ≥ 0`:
    /// `f(x) + Σᵢ (max(0, λᵢ − ρ cᵢ)² − λᵢ²) / (2ρ)`.
    fn augmented_lagrangian(
        &self,
        x: &[f64; NUM_VARIABLES],
        multipliers: &[f64],
        penalty: f64,
    ) -> f64 {
        let mut value = self.objective_value(x);
        for (c, lambda) in self.constraints(x).iter().zip(multipliers) {
            let shifted = (lambda - penalty * c).max(0.0);
            value += (shifted * shifted - lambda * lambda) / (2.0 * penalty);
        }
        value
    }

    fn max_violation(&self, x: &[f64; NUM_VARIABLES]) -> f64 {
        self.constraints(x)
            .iter()
            .fold(0.0f64, |worst, c| worst.max(-c))
    }
}

/// Forward finite-difference gradient of the augmented Lagrangian.
fn fd_gradient(
    nlp: &NlpProblem<'_>,
    x: &[f64; NUM_VARIABLES],
    multipliers: &[f64],
    penalty: f64,
    fd_step: f64,
) -> [f64; NUM_VARIABLES] {
    let base = nlp.augmented_lagrangian(x, multipliers, penalty);
    std::array::from_fn(|i| {
        let h = fd_step * (1.0 + x[i].abs());
        let mut forward = *x;
        forward[i] += h;
        let forward = nlp.problem.bounds.clamp(&forward);
        if forward[i] == x[i] {
            // Variable pinned at its upper bound; probe backward instead.
            let mut backward = *x;
            backward[i] -= h;
            (base - nlp.augmented_lagrangian(&backward, multipliers, penalty)) / h
        } else {
            (nlp.augmented_lagrangian(&forward, multipliers, penalty) - base) / h
        }
    })
}

/// One augmented-Lagrangian attempt from a fixed start. Returns the final
/// iterate and whether the constraint violation converged below `tol`.
fn solve_attempt(
    nlp: &NlpProblem<'_>,
    start: [f64; NUM_VARIABLES],
    tol: f64,
    config: &GradientSearch,
    started: Instant,
) -> ([f64; NUM_VARIABLES], bool) {
    let mut x = nlp.problem.bounds.clamp(&start);
    let mut multipliers = vec![0.0; nlp.num_constraints()];
    let mut penalty = 10.0;

    for _ in 0..config.outer_iterations {
        if started.elapsed() >= nlp.problem.termination.max_runtime {
            break;
        }

        // Inner minimization: projected backtracking descent.
        for _ in 0..config.inner_iterations {
            let gradient = fd_gradient(nlp, &x, &multipliers, penalty, config.fd_step);
            let norm = gradient.iter().map(|g| g * g).sum::<f64>().sqrt();
            if norm < 1e-12 {
                break;
            }

            let current = nlp.augmented_lagrangian(&x, &multipliers, penalty);
            let mut step = 1.0;
            let mut moved = false;
            while step > 1e-10 {
                let trial: [f64; NUM_VARIABLES] =
                    std::array::from_fn(|i| x[i] - step * gradient[i]);
                let trial = nlp.problem.bounds.clamp(&trial);
                let value = nlp.augmented_lagrangian(&trial, &multipliers, penalty);
                if value < current - 1e-4 * step * norm * norm {
                    let displacement: f64 = trial
                        .iter()
                        .zip(x.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum::<f64>()
                        .sqrt();
                    x = trial;
                    moved = displacement > 1e-12;
                    break;
                }
                step *= 0.5;
            }
            if !moved {
                break;
            }
        }

        // Multiplier update and convergence check.
        let constraints = nlp.constraints(&x);
        for (lambda, c) in multipliers.iter_mut().zip(&constraints) {
            *lambda = (*lambda - penalty * c).max(0.0);
        }
        if nlp.max_violation(&x) < tol {
            return (x, true);
        }
        penalty = (penalty * 4.0).min(1.0e8);
    }

    let converged = nlp.max_violation(&x) < tol;
    (x, converged)
}

impl SearchStrategy for GradientSearch {
    fn optimize<R: Rng>(
        &self,
        problem: &SearchProblem,
        rng: &mut R,
    ) -> Result<Option<TireDesign>, ConfigError> {
        self.validate()?;
        let started = Instant::now();
        let tol = self.tol.unwrap_or(problem.termination.convergence_tol);

        let base_start = match self.initial_guess {
            Some(guess) if problem.bounds.contains(&guess) => guess,
            _ => problem.bounds.midpoint(),
        };
        let widths = problem.bounds.widths();
        let jitter = Normal::new(0.0, 0.05).expect("valid normal distribution");

        // Retry ladder: each failed attempt restarts from a jittered point
        // with the required load nudged upward, a heuristic escape from
        // degenerate starting regions.
        let load_step = (2.0 * tol * problem.required_load).max(1.0);
        for attempt in 0..self.max_retries {
            if attempt > 0 && started.elapsed() >= problem.termination.max_runtime {
                break;
            }

            let nlp = NlpProblem {
                objective: GasMass {
                    speed_index: problem.speed_index,
                    construction: problem.construction,
                },
                load: LoadCapacity {
                    speed_index: problem.speed_index,
                    construction: problem.construction,
                },
                tension: problem.cord_break_load.map(|break_load| {
                    (
                        CordTension {
                            speed_index: problem.speed_index,
                            construction: problem.construction,
                        },
                        break_load,
                    )
                }),
                required_load: problem.required_load + attempt as f64 * load_step,
                problem,
            };

            let start: [f64; NUM_VARIABLES] = if attempt == 0 {
                base_start
            } else {
                std::array::from_fn(|i| base_start[i] + jitter.sample(rng) * widths[i])
            };

            let (solution, converged) = solve_attempt(&nlp, start, tol, self, started);
            if converged {
                // The solver works against its own (possibly nudged) load
                // target; acceptance is always against the original problem.
                if let Some(design) = evaluate_design(&solution, problem) {
                    debug!(attempt, mass = design.mass, "gradient solve accepted");
                    return Ok(Some(design));
                }
            }
            debug!(attempt, "gradient solve failed, retrying with nudged load");
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Termination, VariableBounds};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    fn quick_problem(required_load: f64) -> SearchProblem {
        SearchProblem::new(required_load, VariableBounds::databook()).with_termination(
            Termination {
                max_iterations: 100,
                max_runtime: Duration::from_secs(30),
                convergence_tol: 1e-3,
            },
        )
    }

    #[test]
    fn constraints_are_satisfied_at_a_known_feasible_point() {
        let problem = quick_problem(5000.0);
        let nlp = NlpProblem {
            objective: GasMass {
                speed_index: 0.0,
                construction: Default::default(),
            },
            load: LoadCapacity {
                speed_index: 0.0,
                construction: Default::default(),
            },
            tension: None,
            required_load: 5000.0,
            problem: &problem,
        };
        // The reference design carries 5202 lbf.
        let x = [10.0, 21.0, 7.0, 10.0, 12.0];
        assert!(nlp.constraints(&x).iter().all(|&c| c >= 0.0));
        assert_eq!(nlp.max_violation(&x), 0.0);
    }

    #[test]
    fn violated_geometry_shows_up_in_constraints() {
        let problem = quick_problem(5000.0);
        let nlp = NlpProblem {
            objective: GasMass {
                speed_index: 0.0,
                construction: Default::default(),
            },
            load: LoadCapacity {
                speed_index: 0.0,
                construction: Default::default(),
            },
            tension: None,
            required_load: 5000.0,
            problem: &problem,
        };
        // DF above Dm violates the first ordering constraint.
        let x = [10.0, 21.0, 7.0, 10.0, 25.0];
        assert!(nlp.constraints(&x)[0] < 0.0);
        assert!(nlp.max_violation(&x) > 0.0);
    }

    #[test]
    fn solves_a_moderate_load_from_the_midpoint() {
        let problem = quick_problem(5000.0);
        let mut rng = StdRng::seed_from_u64(19);
        let design = GradientSearch::default()
            .optimize(&problem, &mut rng)
            .unwrap()
            .expect("midpoint start dominates 5000 lbf");
        assert!(design.load_capacity_exact >= 5000.0);
        assert!(design.tire.d < design.tire.df && design.tire.df < design.tire.dm);
    }

    #[test]
    fn descent_reduces_mass_relative_to_the_start() {
        let problem = quick_problem(5000.0);
        let start = problem.bounds.midpoint();
        let start_mass = evaluate_design(&start, &problem).unwrap().mass;

        let mut rng = StdRng::seed_from_u64(23);
        let design = GradientSearch::default()
            .optimize(&problem, &mut rng)
            .unwrap()
            .unwrap();
        assert!(design.mass <= start_mass);
    }

    #[test]
    fn unreachable_load_exhausts_the_retry_budget() {
        let mut problem = quick_problem(200_000.0);
        problem.termination.max_runtime = Duration::from_secs(20);
        let search = GradientSearch {
            inner_iterations: 40,
            outer_iterations: 8,
            max_retries: 3,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        assert!(search.optimize(&problem, &mut rng).unwrap().is_none());
    }

    #[test]
    fn zero_retries_is_a_config_error() {
        let problem = quick_problem(5000.0);
        let mut rng = StdRng::seed_from_u64(1);
        let bad = GradientSearch {
            max_retries: 0,
            ..Default::default()
        };
        assert!(matches!(
            bad.optimize(&problem, &mut rng),
            Err(ConfigError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn honors_an_in_bounds_initial_guess() {
        let problem = quick_problem(5000.0);
        let mut rng = StdRng::seed_from_u64(29);
        let seeded = GradientSearch {
            initial_guess: Some([10.0, 21.0, 7.0, 10.0, 12.0]),
            ..Default::default()
        };
        let design = seeded.optimize(&problem, &mut rng).unwrap().unwrap();
        assert!(design.load_capacity_exact >= 5000.0);
    }
}
