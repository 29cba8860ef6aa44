//! Bayesian optimization with a radial-basis-function surrogate.
//!
//! The feasibility-gated objective (negated mass, so this strategy
//! maximizes; infeasible designs map to a large negative fitness) is wrapped
//! in an RBF interpolation surrogate over all observed `(design, fitness)`
//! pairs. An acquisition function — upper confidence bound with optional
//! exploration decay, expected improvement, or probability of improvement —
//! balances exploration and exploitation; each iteration it is maximized
//! over a random candidate pool and the winner is evaluated for real and
//! registered into the surrogate.
//!
//! Because infeasibility is soft-penalized rather than hard-rejected, the
//! final candidate is re-validated against the predicate; when that fails
//! the whole optimization restarts with a fresh surrogate, bounded by an
//! explicit retry cap.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use tracing::debug;

use std::time::Instant;

use crate::error::ConfigError;
use crate::feasibility::{evaluate_design, TireDesign};
use crate::optimization::sampling::latin_hypercube_sample;
use crate::problem::{SearchProblem, SearchStrategy, NUM_VARIABLES};

/// Fitness assigned to designs that violate any hard constraint.
const INFEASIBLE_FITNESS: f64 = -1.0e6;

/// Two observations closer than this are treated as duplicates and the
/// later registration is skipped to keep the interpolation system
/// well-conditioned.
const DUPLICATE_DISTANCE: f64 = 1e-8;

/// Acquisition function used to pick the next design to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Acquisition {
    /// `μ(x) + κ σ(x)`; κ optionally decays per iteration.
    #[default]
    UpperConfidenceBound,
    ExpectedImprovement,
    ProbabilityOfImprovement,
}

/// Bayesian optimization configuration.
#[derive(Debug, Clone)]
pub struct BayesianSearch {
    /// Latin-hypercube observations before the surrogate loop starts.
    pub initial_samples: usize,
    pub acquisition: Acquisition,
    /// Exploration weight for the upper confidence bound.
    pub kappa: f64,
    /// Per-iteration multiplier on κ, within `(0, 1]`. 1 disables decay.
    pub kappa_decay: f64,
    /// Improvement margin for EI and PI.
    pub xi: f64,
    /// Random candidates scored by the acquisition per iteration.
    pub candidate_pool: usize,
    /// Full-restart budget when the final candidate fails re-validation.
    pub max_retries: usize,
}

impl Default for BayesianSearch {
    fn default() -> Self {
        Self {
            initial_samples: 15,
            acquisition: Acquisition::default(),
            kappa: 2.5,
            kappa_decay: 0.97,
            xi: 0.01,
            candidate_pool: 2_000,
            max_retries: 3,
        }
    }
}

impl BayesianSearch {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_samples < 2 {
            return Err(ConfigError::BelowMinimum {
                name: "initial_samples",
                min: 2,
                got: self.initial_samples,
            });
        }
        if self.candidate_pool == 0 {
            return Err(ConfigError::BelowMinimum {
                name: "candidate_pool",
                min: 1,
                got: 0,
            });
        }
        if self.max_retries == 0 {
            return Err(ConfigError::BelowMinimum {
                name: "max_retries",
                min: 1,
                got: 0,
            });
        }
        if !(self.kappa_decay > 0.0 && self.kappa_decay <= 1.0) {
            return Err(ConfigError::ProbabilityOutOfRange {
                name: "kappa_decay",
                got: self.kappa_decay,
            });
        }
        if self.kappa < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "kappa",
                got: self.kappa,
            });
        }
        Ok(())
    }
}

/// RBF interpolation surrogate with a cubic kernel.
///
/// Mean prediction is `s(x) = Σᵢ βᵢ ‖x − xᵢ‖³` with coefficients from the
/// interpolation system `Φβ = f`; the uncertainty proxy scales the distance
/// to the nearest observation by the observed fitness range.
struct Surrogate {
    samples: Vec<[f64; NUM_VARIABLES]>,
    values: Vec<f64>,
    coefficients: DVector<f64>,
    /// Diagonal of the bounds box, for distance normalization.
    diagonal: f64,
    regularization: f64,
}

impl Surrogate {
    fn new(bounds: &[(f64, f64)]) -> Self {
        let diagonal = bounds
            .iter()
            .map(|(lo, hi)| (hi - lo) * (hi - lo))
            .sum::<f64>()
            .sqrt();
        Self {
            samples: Vec::new(),
            values: Vec::new(),
            coefficients: DVector::zeros(0),
            diagonal,
            regularization: 1e-10,
        }
    }

    fn min_distance(&self, x: &[f64; NUM_VARIABLES]) -> f64 {
        self.samples
            .iter()
            .map(|s| distance(x, s))
            .fold(f64::INFINITY, f64::min)
    }

    /// Register an observation and refit. Near-duplicate points are skipped.
    fn register(&mut self, x: [f64; NUM_VARIABLES], value: f64) {
        if self.min_distance(&x) < DUPLICATE_DISTANCE {
            return;
        }
        self.samples.push(x);
        self.values.push(value);
        self.refit();
    }

    /// Solve `Φβ = f`, falling back from LU to SVD for ill-conditioned
    /// systems; a system that still fails leaves zero coefficients, which
    /// degrades prediction but keeps the search running.
    fn refit(&mut self) {
        let m = self.samples.len();
        let mut phi = DMatrix::zeros(m, m);
        for i in 0..m {
            for j in 0..m {
                phi[(i, j)] = kernel(distance(&self.samples[i], &self.samples[j]));
            }
            phi[(i, i)] += self.regularization;
        }
        let f = DVector::from_vec(self.values.clone());

        if let Some(solution) = phi.clone().lu().solve(&f) {
            self.coefficients = solution;
        } else if let Ok(solution) = phi.svd(true, true).solve(&f, 1e-10) {
            self.coefficients = solution;
        } else {
            self.coefficients = DVector::zeros(m);
        }
    }

    fn predict(&self, x: &[f64; NUM_VARIABLES]) -> f64 {
        self.samples
            .iter()
            .enumerate()
            .map(|(i, s)| self.coefficients[i] * kernel(distance(x, s)))
            .sum()
    }

    /// Distance-based uncertainty proxy: zero at observed points, growing
    /// toward the observed fitness range far from them.
    fn uncertainty(&self, x: &[f64; NUM_VARIABLES]) -> f64 {
        if self.diagonal == 0.0 {
            return 0.0;
        }
        let spread = match (
            self.values
                .iter()
                .cloned()
                .fold(f64::INFINITY, f64::min),
            self.values
                .iter()
                .cloned()
                .fold(f64::NEG_INFINITY, f64::max),
        ) {
            (min, max) if max > min => max - min,
            _ => 1.0,
        };
        (self.min_distance(x) / self.diagonal).min(1.0) * spread
    }

    fn best_observed(&self) -> Option<(&[f64; NUM_VARIABLES], f64)> {
        self.values
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, &v)| (&self.samples[i], v))
    }
}

fn kernel(r: f64) -> f64 {
    r * r * r
}

fn distance(a: &[f64; NUM_VARIABLES], b: &[f64; NUM_VARIABLES]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn standard_normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Abramowitz & Stegun 7.1.26 rational approximation of erf.
fn standard_normal_cdf(z: f64) -> f64 {
    let x = z / std::f64::consts::SQRT_2;
    let t = 1.0 / (1.0 + 0.327_591_1 * x.abs());
    let poly = ((((1.061_405_429 * t - 1.453_152_027) * t + 1.421_413_741) * t
        - 0.284_496_736)
        * t
        + 0.254_829_592)
        * t;
    let erf = 1.0 - poly * (-x * x).exp();
    let erf = if x < 0.0 { -erf } else { erf };
    0.5 * (1.0 + erf)
}

fn acquisition_score(
    acquisition: Acquisition,
    surrogate: &Surrogate,
    x: &[f64; NUM_VARIABLES],
    best: f64,
    kappa: f64,
    xi: f64,
) -> f64 {
    let mu = surrogate.predict(x);
    let sigma = surrogate.uncertainty(x);
    match acquisition {
        Acquisition::UpperConfidenceBound => mu + kappa * sigma,
        Acquisition::ExpectedImprovement => {
            let gain = mu - best - xi;
            if sigma <= 0.0 {
                gain.max(0.0)
            } else {
                let z = gain / sigma;
                gain * standard_normal_cdf(z) + sigma * standard_normal_pdf(z)
            }
        }
        Acquisition::ProbabilityOfImprovement => {
            let gain = mu - best - xi;
            if sigma <= 0.0 {
                if gain > 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else {
                standard_normal_cdf(gain / sigma)
            }
        }
    }
}

fn fitness(x: &[f64; NUM_VARIABLES], problem: &SearchProblem) -> f64 {
    match evaluate_design(x, problem) {
        Some(design) => -design.mass,
        None => INFEASIBLE_FITNESS,
    }
}

impl BayesianSearch {
    /// One full surrogate run; returns the best observed design vector.
    fn run_once<R: Rng>(
        &self,
        problem: &SearchProblem,
        started: Instant,
        rng: &mut R,
    ) -> Option<[f64; NUM_VARIABLES]> {
        let bounds = problem.bounds.pairs();
        let mut surrogate = Surrogate::new(&bounds);

        for point in latin_hypercube_sample(&bounds, self.initial_samples, rng) {
            let x: [f64; NUM_VARIABLES] = std::array::from_fn(|i| point[i]);
            surrogate.register(x, fitness(&x, problem));
        }

        let mut kappa = self.kappa;
        for iteration in 0..problem.termination.max_iterations {
            if started.elapsed() >= problem.termination.max_runtime {
                debug!(iteration, "surrogate loop hit the runtime budget");
                break;
            }
            let best = surrogate
                .best_observed()
                .map(|(_, v)| v)
                .unwrap_or(INFEASIBLE_FITNESS);

            let mut winner = problem.bounds.sample(rng);
            let mut winner_score = acquisition_score(
                self.acquisition,
                &surrogate,
                &winner,
                best,
                kappa,
                self.xi,
            );
            for _ in 1..self.candidate_pool {
                let candidate = problem.bounds.sample(rng);
                let score = acquisition_score(
                    self.acquisition,
                    &surrogate,
                    &candidate,
                    best,
                    kappa,
                    self.xi,
                );
                if score > winner_score {
                    winner_score = score;
                    winner = candidate;
                }
            }

            surrogate.register(winner, fitness(&winner, problem));
            kappa *= self.kappa_decay;
        }

        surrogate.best_observed().map(|(x, _)| *x)
    }
}

impl SearchStrategy for BayesianSearch {
    fn optimize<R: Rng>(
        &self,
        problem: &SearchProblem,
        rng: &mut R,
    ) -> Result<Option<TireDesign>, ConfigError> {
        self.validate()?;
        let started = Instant::now();

        // The surrogate optimum is soft-penalized, so it can land on an
        // infeasible point; re-validate and restart with a fresh surrogate,
        // at most `max_retries` attempts.
        for attempt in 0..self.max_retries {
            let Some(candidate) = self.run_once(problem, started, rng) else {
                continue;
            };
            if let Some(design) = evaluate_design(&candidate, problem) {
                return Ok(Some(design));
            }
            debug!(attempt, "surrogate optimum failed re-validation, restarting");
            if started.elapsed() >= problem.termination.max_runtime {
                break;
            }
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
                max_iterations: 40,
                max_runtime: Duration::from_secs(20),
                convergence_tol: 1e-3,
            },
        )
    }

    #[test]
    fn surrogate_interpolates_observed_points() {
        let bounds = [(0.0, 1.0); NUM_VARIABLES];
        let mut surrogate = Surrogate::new(&bounds);
        surrogate.register([0.0, 0.0, 0.0, 0.0, 0.0], 1.0);
        surrogate.register([1.0, 1.0, 1.0, 1.0, 1.0], 3.0);
        surrogate.register([0.5, 0.5, 0.5, 0.5, 0.5], -2.0);

        assert!((surrogate.predict(&[0.5; NUM_VARIABLES]) - -2.0).abs() < 0.1);
        assert!((surrogate.predict(&[0.0; NUM_VARIABLES]) - 1.0).abs() < 0.1);
    }

    #[test]
    fn duplicate_registrations_are_skipped() {
        let bounds = [(0.0, 1.0); NUM_VARIABLES];
        let mut surrogate = Surrogate::new(&bounds);
        surrogate.register([0.5; NUM_VARIABLES], 1.0);
        surrogate.register([0.5; NUM_VARIABLES], 2.0);
        assert_eq!(surrogate.samples.len(), 1);
        assert_eq!(surrogate.values[0], 1.0);
    }

    #[test]
    fn uncertainty_vanishes_at_observed_points() {
        let bounds = [(0.0, 1.0); NUM_VARIABLES];
        let mut surrogate = Surrogate::new(&bounds);
        surrogate.register([0.2; NUM_VARIABLES], 0.0);
        surrogate.register([0.8; NUM_VARIABLES], 5.0);

        assert_eq!(surrogate.uncertainty(&[0.2; NUM_VARIABLES]), 0.0);
        assert!(surrogate.uncertainty(&[0.5; NUM_VARIABLES]) > 0.0);
    }

    #[test]
    fn normal_cdf_brackets_the_median() {
        assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!(standard_normal_cdf(3.0) > 0.99);
        assert!(standard_normal_cdf(-3.0) < 0.01);
    }

    #[test]
    fn finds_a_feasible_design_for_a_moderate_load() {
        let problem = quick_problem(5000.0);
        let mut rng = StdRng::seed_from_u64(31);
        let design = BayesianSearch::default()
            .optimize(&problem, &mut rng)
            .unwrap()
            .expect("5000 lbf is achievable in the databook domain");
        assert!(design.load_capacity_exact >= 5000.0);
    }

    #[test]
    fn each_acquisition_function_solves_the_smoke_problem() {
        let problem = quick_problem(2000.0);
        for acquisition in [
            Acquisition::UpperConfidenceBound,
            Acquisition::ExpectedImprovement,
            Acquisition::ProbabilityOfImprovement,
        ] {
            let search = BayesianSearch {
                acquisition,
                ..Default::default()
            };
            let mut rng = StdRng::seed_from_u64(61);
            let design = search.optimize(&problem, &mut rng).unwrap();
            assert!(design.is_some(), "{acquisition:?} found no design");
        }
    }

    #[test]
    fn unreachable_load_returns_no_solution_within_the_retry_cap() {
        let problem = quick_problem(200_000.0);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(BayesianSearch::default()
            .optimize(&problem, &mut rng)
            .unwrap()
            .is_none());
    }

    #[test]
    fn zero_retries_is_a_config_error() {
        let problem = quick_problem(5000.0);
        let mut rng = StdRng::seed_from_u64(1);
        let unbounded = BayesianSearch {
            max_retries: 0,
            ..Default::default()
        };
        assert!(matches!(
            unbounded.optimize(&problem, &mut rng),
            Err(ConfigError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn fixed_seed_reproduces_the_run() {
        let problem = quick_problem(9000.0);
        let a = BayesianSearch::default()
            .optimize(&problem, &mut StdRng::seed_from_u64(77))
            .unwrap();
        let b = BayesianSearch::default()
            .optimize(&problem, &mut StdRng::seed_from_u64(77))
            .unwrap();
        assert_eq!(a.map(|d| d.tire.design()), b.map(|d| d.tire.design()));
    }
}
