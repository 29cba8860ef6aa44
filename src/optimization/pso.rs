//! Particle swarm optimization.
//!
//! A swarm of agents navigates the design space together: each particle
//! blends its own momentum, the pull of its personal best, and the pull of
//! the swarm's global best. The objective is the feasibility-gated
//! inflation-medium mass, `+∞` when infeasible, evaluated through the same
//! predicate as every other strategy. The global best updates immediately
//! when any particle improves on it.

use std::time::Instant;

use rand::Rng;
use tracing::debug;

use crate::error::ConfigError;
use crate::feasibility::{evaluate_design, TireDesign};
use crate::problem::{SearchProblem, SearchStrategy, NUM_VARIABLES};

struct Particle {
    position: [f64; NUM_VARIABLES],
    velocity: [f64; NUM_VARIABLES],
    best_position: [f64; NUM_VARIABLES],
    best_objective: f64,
}

/// Particle swarm configuration.
#[derive(Debug, Clone)]
pub struct ParticleSwarm {
    /// Number of particles. Must be at least 2.
    pub swarm_size: usize,
    /// Cognitive coefficient `c1` (pull toward the personal best).
    pub cognitive: f64,
    /// Social coefficient `c2` (pull toward the global best).
    pub social: f64,
    /// Inertia weight `w`, within `[0, 1]`.
    pub inertia: f64,
    /// Attempt budget per particle for feasible initialization.
    pub init_attempts: usize,
}

impl Default for ParticleSwarm {
    fn default() -> Self {
        Self {
            swarm_size: 20,
            cognitive: 0.1,
            social: 0.1,
            inertia: 0.8,
            init_attempts: 5_000,
        }
    }
}

impl ParticleSwarm {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.swarm_size < 2 {
            return Err(ConfigError::BelowMinimum {
                name: "swarm_size",
                min: 2,
                got: self.swarm_size,
            });
        }
        if !(0.0..=1.0).contains(&self.inertia) {
            return Err(ConfigError::ProbabilityOutOfRange {
                name: "inertia",
                got: self.inertia,
            });
        }
        if self.cognitive <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "cognitive",
                got: self.cognitive,
            });
        }
        if self.social <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "social",
                got: self.social,
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

fn objective(x: &[f64; NUM_VARIABLES], problem: &SearchProblem) -> f64 {
    match evaluate_design(x, problem) {
        Some(design) => design.mass,
        None => f64::INFINITY,
    }
}

impl SearchStrategy for ParticleSwarm {
    fn optimize<R: Rng>(
        &self,
        problem: &SearchProblem,
        rng: &mut R,
    ) -> Result<Option<TireDesign>, ConfigError> {
        self.validate()?;
        let started = Instant::now();
        let tol = problem.termination.convergence_tol;

        // Every particle starts from a feasible position; initialization is
        // a bounded retry loop so an unsatisfiable problem terminates
        // instead of spinning.
        let mut particles: Vec<Particle> = Vec::with_capacity(self.swarm_size);
        'swarm: for _ in 0..self.swarm_size {
            for _ in 0..self.init_attempts {
                if started.elapsed() >= problem.termination.max_runtime {
                    break 'swarm;
                }
                let position = problem.bounds.sample(rng);
                let obj = objective(&position, problem);
                if obj.is_finite() {
                    let velocity = std::array::from_fn(|_| rng.gen::<f64>());
                    particles.push(Particle {
                        position,
                        velocity,
                        best_position: position,
                        best_objective: obj,
                    });
                    continue 'swarm;
                }
            }
            break;
        }
        if particles.len() < self.swarm_size {
            return Ok(None);
        }

        let mut global_best = particles
            .iter()
            .map(|p| (p.best_position, p.best_objective))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .expect("swarm is non-empty");

        for iteration in 0..problem.termination.max_iterations {
            if started.elapsed() >= problem.termination.max_runtime {
                debug!(iteration, "swarm hit the runtime budget");
                break;
            }

            for p in particles.iter_mut() {
                let r1 = rng.gen::<f64>();
                let r2 = rng.gen::<f64>();
                for i in 0..NUM_VARIABLES {
                    p.velocity[i] = self.inertia * p.velocity[i]
                        + self.cognitive * r1 * (p.best_position[i] - p.position[i])
                        + self.social * r2 * (global_best.0[i] - p.position[i]);
                    p.position[i] += p.velocity[i];
                }
                p.position = problem.bounds.clamp(&p.position);

                let obj = objective(&p.position, problem);
                if obj <= p.best_objective {
                    p.best_objective = obj;
                    p.best_position = p.position;
                }

                if obj < global_best.1 {
                    let improvement = (global_best.1 - obj) / global_best.1;
                    if improvement <= tol {
                        debug!(iteration, mass = obj, "swarm converged");
                        return Ok(evaluate_design(&p.position, problem));
                    }
                    global_best = (p.position, obj);
                }
            }
        }

        Ok(evaluate_design(&global_best.0, problem))
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
                max_iterations: 150,
                max_runtime: Duration::from_secs(10),
                convergence_tol: 1e-3,
            },
        )
    }

    #[test]
    fn finds_a_feasible_design_for_a_moderate_load() {
        let problem = quick_problem(5000.0);
        let mut rng = StdRng::seed_from_u64(8);
        let design = ParticleSwarm::default()
            .optimize(&problem, &mut rng)
            .unwrap()
            .expect("5000 lbf is achievable in the databook domain");
        assert!(design.load_capacity_exact >= 5000.0);
    }

    #[test]
    fn swarm_below_minimum_is_a_config_error() {
        let problem = quick_problem(5000.0);
        let mut rng = StdRng::seed_from_u64(1);
        let lonely = ParticleSwarm {
            swarm_size: 1,
            ..Default::default()
        };
        assert!(matches!(
            lonely.optimize(&problem, &mut rng),
            Err(ConfigError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn inertia_outside_unit_interval_is_a_config_error() {
        let problem = quick_problem(5000.0);
        let mut rng = StdRng::seed_from_u64(1);
        let unstable = ParticleSwarm {
            inertia: 1.2,
            ..Default::default()
        };
        assert!(matches!(
            unstable.optimize(&problem, &mut rng),
            Err(ConfigError::ProbabilityOutOfRange { .. })
        ));
    }

    #[test]
    fn unreachable_load_returns_no_solution() {
        let mut problem = quick_problem(200_000.0);
        // Keep the bounded init loop short; no feasible particle exists.
        problem.termination.max_runtime = Duration::from_secs(5);
        let swarm = ParticleSwarm {
            init_attempts: 300,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        assert!(swarm.optimize(&problem, &mut rng).unwrap().is_none());
    }

    #[test]
    fn fixed_seed_reproduces_the_run() {
        let problem = quick_problem(10_000.0);
        let a = ParticleSwarm::default()
            .optimize(&problem, &mut StdRng::seed_from_u64(55))
            .unwrap();
        let b = ParticleSwarm::default()
            .optimize(&problem, &mut StdRng::seed_from_u64(55))
            .unwrap();
        assert_eq!(a.map(|d| d.tire.design()), b.map(|d| d.tire.design()));
    }

    #[test]
    fn returned_design_satisfies_the_problem() {
        let problem = quick_problem(20_000.0);
        let mut rng = StdRng::seed_from_u64(14);
        if let Some(design) = ParticleSwarm::default().optimize(&problem, &mut rng).unwrap() {
            assert!(design.load_capacity_exact >= problem.required_load);
            assert!(design.tire.d < design.tire.df && design.tire.df < design.tire.dm);
        }
    }
}
