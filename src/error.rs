//! Error taxonomy for the tire model and the search strategies.

use thiserror::Error;

/// An oracle computation received inputs outside its mathematical domain.
///
/// Domain errors are raised by the physics model, caught at the feasibility
/// predicate boundary, and converted into "infeasible" outcomes there. They
/// never escape a running search.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DomainError {
    #[error("square root of negative value ({value}) in {context}")]
    NegativeSqrt { context: &'static str, value: f64 },

    #[error("division by zero in {context}")]
    DivisionByZero { context: &'static str },

    #[error("inverse trigonometric argument {value} outside [-1, 1] in {context}")]
    InverseTrigRange { context: &'static str, value: f64 },
}

/// A search strategy was configured with invalid hyperparameters.
///
/// Raised at call time, before any search iteration begins, and propagated
/// to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be at least {min}, got {got}")]
    BelowMinimum {
        name: &'static str,
        min: usize,
        got: usize,
    },

    #[error("{name} must be within [0, 1], got {got}")]
    ProbabilityOutOfRange { name: &'static str, got: f64 },

    #[error("{name} must be positive, got {got}")]
    NonPositive { name: &'static str, got: f64 },
}
