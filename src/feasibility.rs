//! Feasibility predicate: geometric, load, and structural screening.
//!
//! The predicate is the only way the search strategies produce or validate a
//! candidate. Cheap geometric checks (ordering, aspect ratio, ply rating)
//! run before any oracle call; oracle domain errors are converted into
//! "infeasible" here and never escape to a search loop.

use crate::error::DomainError;
use crate::problem::SearchProblem;
use crate::tire::{GasConditions, Tire};

/// Industry-standard aspect ratio band for aircraft tires.
pub const ASPECT_RATIO_MIN: f64 = 0.5;
pub const ASPECT_RATIO_MAX: f64 = 1.0;

/// A validated design together with its oracle-derived quantities.
///
/// Every derived field is a pure function of the design vector; rebuilding
/// a `TireDesign` from the same [`Tire`] reproduces identical values.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TireDesign {
    pub tire: Tire,
    pub lift_ratio: f64,
    pub aspect_ratio: f64,
    /// Rated load capacity (lbf), rounded to the 25 lbf increment.
    pub load_capacity: f64,
    /// Exact (unrounded) load capacity (lbf).
    pub load_capacity_exact: f64,
    /// Rated inflation pressure (psi, gauge).
    pub inflation_pressure: f64,
    /// Inflation-medium mass (kg) at default gas conditions, the
    /// minimization objective.
    pub mass: f64,
}

impl TireDesign {
    /// Derive all oracle quantities for a tire.
    pub fn from_tire(tire: Tire) -> Result<Self, DomainError> {
        let gas = GasConditions::default();
        Ok(Self {
            tire,
            lift_ratio: tire.lift_ratio()?,
            aspect_ratio: tire.aspect_ratio()?,
            load_capacity: tire.max_load_capacity(false)?,
            load_capacity_exact: tire.max_load_capacity(true)?,
            inflation_pressure: tire.inflation_pressure()?,
            mass: tire.inflation_medium_mass(&gas)?,
        })
    }
}

/// Evaluate a raw design vector against a problem instance.
///
/// Returns a fully populated [`TireDesign`] when the candidate satisfies the
/// geometric ordering `D < DF < Dm`, the aspect ratio band, a positive ply
/// rating, the required load, and (when configured) the cord breaking load.
/// Returns `None` otherwise, including when an oracle computation fails on a
/// domain error.
pub fn evaluate_design(x: &[f64; 5], problem: &SearchProblem) -> Option<TireDesign> {
    let [pr, dm, wm, d, df] = *x;

    // Geometric screening first; no oracle calls for obviously bad vectors.
    // The negated comparisons also reject NaN components.
    if !(pr > 0.0) || !(wm > 0.0) {
        return None;
    }
    if !(d < df && df < dm) {
        return None;
    }
    let aspect = (dm - d) / (2.0 * wm);
    if !(ASPECT_RATIO_MIN..=ASPECT_RATIO_MAX).contains(&aspect) {
        return None;
    }

    let tire = Tire::from_design(x)
        .with_speed_index(problem.speed_index)
        .with_construction(problem.construction);

    let design = match TireDesign::from_tire(tire) {
        Ok(design) => design,
        // Domain failures are infeasible outcomes, not errors.
        Err(_) => return None,
    };

    if design.load_capacity_exact < problem.required_load {
        return None;
    }

    if let Some(break_load) = problem.cord_break_load {
        match tire.is_mechanically_feasible(break_load) {
            Ok(true) => {}
            Ok(false) | Err(_) => return None,
        }
    }

    Some(design)
}
