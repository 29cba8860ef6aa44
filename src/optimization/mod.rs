//! Search strategies for the tire sizing problem.
//!
//! Five structurally different strategies solve the same constrained
//! minimization — inflation-medium mass subject to geometry, aspect-ratio,
//! and load-capacity constraints — through one contract
//! ([`crate::problem::SearchStrategy`]) and one feasibility predicate, so
//! their results are directly comparable:
//!
//! - [`random_search`] — local ±1-step neighborhood descent, in a
//!   continuous and a discrete-grid variant
//! - [`genetic`] — generational evolution with elitism and per-gene mating
//! - [`pso`] — cooperative particle swarm
//! - [`bayesian`] — RBF-surrogate-guided sequential search with a
//!   selectable acquisition function
//! - [`nlp`] — coupled-analysis nonlinear program with finite-difference
//!   gradients
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng;
//! use tireopt::optimization::GeneticSearch;
//! use tireopt::{SearchProblem, SearchStrategy, Termination, VariableBounds};
//!
//! let problem = SearchProblem::new(5000.0, VariableBounds::databook())
//!     .with_termination(Termination {
//!         max_iterations: 60,
//!         ..Termination::default()
//!     });
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//!
//! let best = GeneticSearch::default().optimize(&problem, &mut rng).unwrap();
//! if let Some(design) = best {
//!     assert!(design.load_capacity_exact >= 5000.0);
//! }
//! ```

pub mod bayesian;
pub mod genetic;
pub mod nlp;
pub mod pso;
pub mod random_search;
pub mod sampling;

pub use bayesian::{Acquisition, BayesianSearch};
pub use genetic::{GeneticSearch, ProgressUpdate};
pub use nlp::GradientSearch;
pub use pso::ParticleSwarm;
pub use random_search::{ContinuousRandomSearch, DiscreteRandomSearch};
pub use sampling::{latin_hypercube_sample, random_sample};
