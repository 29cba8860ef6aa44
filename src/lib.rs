//! Minimum-mass aircraft tire sizing.
//!
//! Given a required load capacity (and optionally a speed rating), this
//! crate searches a five-variable tire geometry — ply rating, mean
//! diameter, mean width, rim diameter, flange diameter — for the lightest
//! design that satisfies geometric ordering, the industry aspect-ratio
//! band, the load requirement, and (optionally) reinforcement cord
//! strength.
//!
//! The [`tire`] module is the physics oracle: pure empirical formulas for
//! load capacity, inflation pressure, inflation-medium mass, and cord
//! tension. The [`feasibility`] predicate wraps the oracle into the single
//! validation path every search uses. The [`optimization`] module provides
//! five interchangeable strategies behind the [`SearchStrategy`] contract;
//! see its documentation for a usage example.
//!
//! Searches are deterministic under a fixed RNG seed: all randomness flows
//! through a caller-supplied generator, and wall-clock budgets are checked
//! cooperatively at iteration boundaries.

pub mod error;
pub mod feasibility;
pub mod optimization;
pub mod problem;
pub mod tire;

pub use error::{ConfigError, DomainError};
pub use feasibility::{evaluate_design, TireDesign};
pub use problem::{
    DiscreteBounds, SearchProblem, SearchStrategy, Termination, VariableBounds,
};
pub use tire::{Construction, CordModel, GasConditions, Tire};
