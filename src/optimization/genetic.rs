//! Genetic algorithm over the continuous design space.
//!
//! Fitness is the inflation-medium mass for feasible designs and `+∞` for
//! infeasible ones, so infeasible individuals are never selected to
//! survive. Each generation keeps the top 10% unchanged (elitism, at least
//! one individual); the remaining slots are filled by mating two parents
//! drawn uniformly from the fittest half. Mating copies each gene from
//! parent 1 or parent 2 with equal probability, or freshly mutates it with
//! the configured mutation probability.

use std::time::Instant;

use rand::Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

use crate::error::ConfigError;
use crate::feasibility::{evaluate_design, TireDesign};
use crate::problem::{SearchProblem, SearchStrategy, NUM_VARIABLES};

/// One chromosome: a design vector with its cached fitness.
#[derive(Debug, Clone)]
struct Individual {
    genes: [f64; NUM_VARIABLES],
    fitness: f64,
}

/// Per-generation progress report.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressUpdate {
    pub generation: usize,
    pub best_fitness: f64,
    pub average_fitness: f64,
}

/// Genetic algorithm configuration.
#[derive(Debug, Clone)]
pub struct GeneticSearch {
    /// Number of individuals kept each generation. Must be at least 3.
    pub population_size: usize,
    /// Per-gene probability of a fresh random mutation during mating.
    pub mutation_probability: f64,
    /// Optional initial design injected into the starting population.
    pub seed_design: Option<[f64; NUM_VARIABLES]>,
}

impl Default for GeneticSearch {
    fn default() -> Self {
        Self {
            population_size: 20,
            mutation_probability: 0.10,
            seed_design: None,
        }
    }
}

impl GeneticSearch {
    pub fn with_seed_design(mut self, seed: [f64; NUM_VARIABLES]) -> Self {
        self.seed_design = Some(seed);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 3 {
            return Err(ConfigError::BelowMinimum {
                name: "population_size",
                min: 3,
                got: self.population_size,
            });
        }
        if !(0.0..=1.0).contains(&self.mutation_probability) {
            return Err(ConfigError::ProbabilityOutOfRange {
                name: "mutation_probability",
                got: self.mutation_probability,
            });
        }
        Ok(())
    }

    /// Run the search, reporting per-generation progress through `on_progress`.
    pub fn optimize_with_progress<R, F>(
        &self,
        problem: &SearchProblem,
        rng: &mut R,
        mut on_progress: Option<F>,
    ) -> Result<Option<TireDesign>, ConfigError>
    where
        R: Rng,
        F: FnMut(ProgressUpdate),
    {
        self.validate()?;
        let started = Instant::now();
        let pop_size = self.population_size;
        let tol = problem.termination.convergence_tol;

        // Initial population: optional seed first, then random chromosomes.
        let mut genes: Vec<[f64; NUM_VARIABLES]> = Vec::with_capacity(pop_size);
        if let Some(seed) = &self.seed_design {
            genes.push(problem.bounds.clamp(seed));
        }
        while genes.len() < pop_size {
            genes.push(problem.bounds.sample(rng));
        }
        let mut population = batch_evaluate(genes, problem);
        sort_by_fitness(&mut population);

        let elite = if pop_size <= 10 { 1 } else { pop_size / 10 };
        let parent_pool = (pop_size / 2).max(1);
        let mut current_best = f64::INFINITY;

        for generation in 0..problem.termination.max_iterations {
            // Elites survive unchanged; the rest are offspring of the
            // fittest half.
            let mut offspring: Vec<[f64; NUM_VARIABLES]> =
                Vec::with_capacity(pop_size - elite);
            for _ in 0..pop_size - elite {
                let p1 = &population[rng.gen_range(0..parent_pool)];
                let p2 = &population[rng.gen_range(0..parent_pool)];
                offspring.push(self.mate(p1, p2, problem, rng));
            }

            let mut next_generation: Vec<Individual> =
                population.iter().take(elite).cloned().collect();
            next_generation.extend(batch_evaluate(offspring, problem));
            population = next_generation;
            sort_by_fitness(&mut population);

            let best = &population[0];
            if let Some(progress) = on_progress.as_mut() {
                let finite: Vec<f64> = population
                    .iter()
                    .map(|ind| ind.fitness)
                    .filter(|f| f.is_finite())
                    .collect();
                let average = if finite.is_empty() {
                    f64::INFINITY
                } else {
                    finite.iter().sum::<f64>() / finite.len() as f64
                };
                progress(ProgressUpdate {
                    generation,
                    best_fitness: best.fitness,
                    average_fitness: average,
                });
            }

            if best.fitness < current_best {
                let improvement = (current_best - best.fitness) / current_best;
                if current_best.is_finite() && improvement <= tol {
                    debug!(generation, mass = best.fitness, "genetic search converged");
                    return Ok(evaluate_design(&best.genes, problem));
                }
                current_best = best.fitness;
            }

            if started.elapsed() >= problem.termination.max_runtime {
                debug!(generation, "genetic search hit the runtime budget");
                break;
            }
        }

        let best = &population[0];
        if best.fitness.is_finite() {
            Ok(evaluate_design(&best.genes, problem))
        } else {
            Ok(None)
        }
    }

    /// Per-gene mating: copy from either parent with equal probability, or
    /// mutate to a fresh uniform draw within bounds.
    fn mate<R: Rng>(
        &self,
        p1: &Individual,
        p2: &Individual,
        problem: &SearchProblem,
        rng: &mut R,
    ) -> [f64; NUM_VARIABLES] {
        let pairs = problem.bounds.pairs();
        let inherit = 1.0 - self.mutation_probability;
        std::array::from_fn(|i| {
            let draw = rng.gen::<f64>();
            if draw < inherit / 2.0 {
                p1.genes[i]
            } else if draw < inherit {
                p2.genes[i]
            } else {
                let (lo, hi) = pairs[i];
                lo + rng.gen::<f64>() * (hi - lo)
            }
        })
    }
}

impl SearchStrategy for GeneticSearch {
    fn optimize<R: Rng>(
        &self,
        problem: &SearchProblem,
        rng: &mut R,
    ) -> Result<Option<TireDesign>, ConfigError> {
        self.optimize_with_progress(problem, rng, None::<fn(ProgressUpdate)>)
    }
}

fn fitness_of(genes: &[f64; NUM_VARIABLES], problem: &SearchProblem) -> f64 {
    match evaluate_design(genes, problem) {
        Some(design) => design.mass,
        None => f64::INFINITY,
    }
}

/// Evaluate a batch of chromosomes. Oracle calls are independent, so the
/// `parallel` feature fans them out; randomness stays on the caller's
/// sequential path either way.
#[cfg(feature = "parallel")]
fn batch_evaluate(genes: Vec<[f64; NUM_VARIABLES]>, problem: &SearchProblem) -> Vec<Individual> {
    genes
        .into_par_iter()
        .map(|g| Individual {
            fitness: fitness_of(&g, problem),
            genes: g,
        })
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn batch_evaluate(genes: Vec<[f64; NUM_VARIABLES]>, problem: &SearchProblem) -> Vec<Individual> {
    genes
        .into_iter()
        .map(|g| Individual {
            fitness: fitness_of(&g, problem),
            genes: g,
        })
        .collect()
}

fn sort_by_fitness(population: &mut [Individual]) {
    population.sort_by(|a, b| {
        a.fitness
            .partial_cmp(&b.fitness)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
