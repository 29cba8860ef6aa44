//! Empirical aircraft tire model.
//!
//! Pure functions mapping a five-variable tire geometry (ply rating, mean
//! diameter, mean width, rim diameter, flange diameter) to rated load
//! capacity, inflation pressure, inflation-medium mass, and reinforcement
//! cord tension. The load-rating formulas are empirical fits against
//! manufacturer databook entries for bias-ply aircraft tires; all lengths
//! are in inches, loads in lbf, pressures in psi unless noted.
//!
//! Every function here is deterministic and side-effect free. Inputs outside
//! a formula's mathematical domain raise a typed [`DomainError`] rather than
//! producing NaN.

use crate::error::DomainError;

const PSI_TO_PA: f64 = 6_894.757_293_168_361;
const CUBIC_IN_TO_M3: f64 = 1.638_706_4e-5;
const IN_TO_M: f64 = 0.0254;
const MPH_TO_MPS: f64 = 0.447_04;
const GAS_CONSTANT: f64 = 8.314_462_618;

/// Rated loads are quoted in 25 lbf increments.
const LOAD_INCREMENT: f64 = 25.0;

/// Carcass cord ends per inch per ply at unit ends ratio.
const ENDS_PER_INCH_PER_PLY: f64 = 16.0;

/// Linear density of one reinforcement cord (kg/m), nylon carcass cord.
const CORD_LINEAR_DENSITY: f64 = 1.15e-3;

/// Fractional tire deflection assumed by the load rating.
const RATED_DEFLECTION: f64 = 0.32;

/// Fractional deflection assumed when solving rated pressure for bias
/// construction or low speed ratings.
const LOADED_DEFLECTION: f64 = 0.35;

/// Speed rating (mph) at or below which the loaded-deflection pressure
/// formulation applies regardless of construction.
const LOW_SPEED_INDEX: f64 = 160.0;

/// Tire carcass construction, the `Pre` category of the databook.
///
/// Bias construction changes the deflection assumption used when solving
/// for inflation pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Construction {
    #[default]
    Bias,
    Radial,
}

/// Structural model used for reinforcement cord tension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CordModel {
    /// Netting equilibrium of inflation pressure against hoop tension.
    #[default]
    Netting,
    /// Netting tension plus a centrifugal correction driven by the
    /// rotational speed implied by the speed rating.
    Walter,
}

/// Inflation medium state used for the ideal-gas mass calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GasConditions {
    /// Ambient pressure (Pa).
    pub ambient_pressure: f64,
    /// Gas temperature (K).
    pub temperature: f64,
    /// Molar mass of the inflation medium (kg/mol).
    pub molar_mass: f64,
}

impl Default for GasConditions {
    /// ISA sea level, nitrogen fill.
    fn default() -> Self {
        Self {
            ambient_pressure: 101_325.0,
            temperature: 288.15,
            molar_mass: 0.028_013_4,
        }
    }
}

/// A tire geometry with its operating context.
///
/// The five geometric fields are the design variables of the sizing problem;
/// `speed_index` and `construction` select deflection assumptions and the
/// centrifugal correction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tire {
    /// Ply rating.
    pub pr: f64,
    /// Mean inflated overall diameter (in).
    pub dm: f64,
    /// Mean inflated section width (in).
    pub wm: f64,
    /// Rim diameter (in).
    pub d: f64,
    /// Outer flange diameter (in).
    pub df: f64,
    /// Speed rating (mph); 0 means unrated.
    pub speed_index: f64,
    pub construction: Construction,
}

/// Operating factor of the rated pressure fit (psi per ply at unit ends
/// ratio), a cubic in rim diameter fitted over the 4–24 in databook range.
pub fn operating_factor(rim_diameter: f64) -> f64 {
    8.76 + 0.798 * rim_diameter - 0.0248 * rim_diameter * rim_diameter
        + 3.06e-4 * rim_diameter * rim_diameter * rim_diameter
}

/// Carcass cord ends-per-inch ratio as a function of lift ratio `Lr = Dm/D`.
///
/// Piecewise empirical fit: linear on `[1.5, 2.2)`, a degree-5 polynomial on
/// `[2.2, 5.0]`. Outside `[1.5, 5.0]` the argument is clamped to the nearest
/// boundary and the boundary branch is evaluated there; the fit is never
/// extrapolated past its validated domain.
pub fn ratio_of_ends_per_inch(lift_ratio: f64) -> f64 {
    let lr = lift_ratio.clamp(1.5, 5.0);
    if lr < 2.2 {
        1.835 - 0.475 * lr
    } else {
        let t = lr - 2.2;
        0.79 - 0.34 * t + 0.27 * t * t - 0.114 * t.powi(3) + 0.0226 * t.powi(4)
            - 0.0017 * t.powi(5)
    }
}

/// Round an exact load to the nearest rating increment (25 lbf).
///
/// Ties round half away from zero, so 5162.5 rates as 5175.
pub fn round_to_rating(load: f64) -> f64 {
    (load / LOAD_INCREMENT).round() * LOAD_INCREMENT
}

impl Tire {
    pub fn new(pr: f64, dm: f64, wm: f64, d: f64, df: f64) -> Self {
        Self {
            pr,
            dm,
            wm,
            d,
            df,
            speed_index: 0.0,
            construction: Construction::default(),
        }
    }

    /// Build a tire from a `[PR, Dm, Wm, D, DF]` design vector.
    pub fn from_design(x: &[f64; 5]) -> Self {
        Self::new(x[0], x[1], x[2], x[3], x[4])
    }

    pub fn with_speed_index(mut self, speed_index: f64) -> Self {
        self.speed_index = speed_index;
        self
    }

    pub fn with_construction(mut self, construction: Construction) -> Self {
        self.construction = construction;
        self
    }

    /// The design vector `[PR, Dm, Wm, D, DF]`.
    pub fn design(&self) -> [f64; 5] {
        [self.pr, self.dm, self.wm, self.d, self.df]
    }

    /// Lift ratio `Lr = Dm / D`.
    pub fn lift_ratio(&self) -> Result<f64, DomainError> {
        if self.d == 0.0 {
            return Err(DomainError::DivisionByZero {
                context: "lift ratio Dm/D",
            });
        }
        Ok(self.dm / self.d)
    }

    /// Aspect ratio `(Dm - D) / (2 Wm)`.
    pub fn aspect_ratio(&self) -> Result<f64, DomainError> {
        if self.wm == 0.0 {
            return Err(DomainError::DivisionByZero {
                context: "aspect ratio (Dm-D)/(2 Wm)",
            });
        }
        Ok((self.dm - self.d) / (2.0 * self.wm))
    }

    /// Ground contact area (in²) at fractional deflection `b`.
    ///
    /// Deflection is `d = b (Dm - DF) / 2`; the footprint is the empirical
    /// elliptical patch `0.77 π d √((Dm - d)(Wm - d))`.
    pub fn ground_contact_area(&self, b: f64) -> Result<f64, DomainError> {
        let defl = b * (self.dm - self.df) / 2.0;
        let radicand = (self.dm - defl) * (self.wm - defl);
        if radicand < 0.0 {
            return Err(DomainError::NegativeSqrt {
                context: "ground contact area",
                value: radicand,
            });
        }
        Ok(0.77 * std::f64::consts::PI * defl * radicand.sqrt())
    }

    /// Carcass pressure index (psi): operating factor × ends ratio × PR.
    pub fn pressure_index(&self) -> Result<f64, DomainError> {
        let lr = self.lift_ratio()?;
        Ok(operating_factor(self.d) * ratio_of_ends_per_inch(lr) * self.pr)
    }

    /// Load the carcass itself supports (psi-equivalent): `PR` for narrow
    /// sections, `10.4 PR² / Wm²` for sections 5.5 in and wider.
    pub fn load_supporting_capability(&self) -> f64 {
        if self.wm < 5.5 {
            self.pr
        } else {
            10.4 * self.pr * self.pr / (self.wm * self.wm)
        }
    }

    /// Maximum rated load capacity (lbf).
    ///
    /// `Lm = A(0.32) (pressure_index + load_supporting_capability)`; unless
    /// `exact`, the result is rounded to the nearest 25 lbf rating increment.
    pub fn max_load_capacity(&self, exact: bool) -> Result<f64, DomainError> {
        let area = self.ground_contact_area(RATED_DEFLECTION)?;
        let lm = area * (self.pressure_index()? + self.load_supporting_capability());
        Ok(if exact { lm } else { round_to_rating(lm) })
    }

    /// Rated inflation pressure (psi, gauge).
    ///
    /// Bias tires and speed ratings at or below 160 mph use the
    /// 35%-deflection formulation solved back from the rated load; otherwise
    /// the pressure index applies directly. A service correction
    /// `X p + 3` is added, with `X = 0.07` above 100 psi and `0.04` below.
    pub fn inflation_pressure(&self) -> Result<f64, DomainError> {
        let p = if self.construction == Construction::Bias || self.speed_index <= LOW_SPEED_INDEX
        {
            let lm = self.max_load_capacity(true)?;
            lm / self.ground_contact_area(LOADED_DEFLECTION)? - self.load_supporting_capability()
        } else {
            self.pressure_index()?
        };
        let x = if p > 100.0 { 0.07 } else { 0.04 };
        Ok(p + x * p + 3.0)
    }

    /// Mass of the inflation medium (kg) at the rated inflation pressure.
    pub fn inflation_medium_mass(&self, gas: &GasConditions) -> Result<f64, DomainError> {
        let gauge = self.inflation_pressure()?;
        self.inflation_medium_mass_at(gauge, gas)
    }

    /// Mass of the inflation medium (kg) at an explicit gauge pressure (psi).
    ///
    /// Ideal-gas mass over the approximate toroidal internal volume
    /// `V = π² Wm H (D + H) / 4`, `H = (Dm - D) / 2`.
    pub fn inflation_medium_mass_at(
        &self,
        gauge_pressure: f64,
        gas: &GasConditions,
    ) -> Result<f64, DomainError> {
        if gas.temperature == 0.0 {
            return Err(DomainError::DivisionByZero {
                context: "ideal gas law temperature",
            });
        }
        let h = (self.dm - self.d) / 2.0;
        let volume =
            std::f64::consts::PI * std::f64::consts::PI * self.wm * h * (self.d + h) / 4.0
                * CUBIC_IN_TO_M3;
        let absolute = gauge_pressure * PSI_TO_PA + gas.ambient_pressure;
        Ok(absolute * volume * gas.molar_mass / (GAS_CONSTANT * gas.temperature))
    }

    /// Tension carried by one reinforcement cord (N).
    ///
    /// The netting model balances inflation pressure against hoop tension
    /// across the cord count, resolved through the crown angle
    /// `α = acos(1/Lr)`. The Walter model adds the centrifugal term `μ v²`
    /// at the tread speed implied by the speed rating.
    pub fn cord_tension(&self, model: CordModel) -> Result<f64, DomainError> {
        let lr = self.lift_ratio()?;
        if lr == 0.0 {
            return Err(DomainError::DivisionByZero {
                context: "crown angle 1/Lr",
            });
        }
        let cos_arg = 1.0 / lr;
        if !(-1.0..=1.0).contains(&cos_arg) {
            return Err(DomainError::InverseTrigRange {
                context: "crown angle acos(1/Lr)",
                value: cos_arg,
            });
        }
        let cos_a = cos_arg.acos().cos();

        let pressure = self.inflation_pressure()? * PSI_TO_PA;
        let section_radius = (self.dm - self.d) / 4.0 * IN_TO_M;
        let cords_per_m = ENDS_PER_INCH_PER_PLY * ratio_of_ends_per_inch(lr) * self.pr / IN_TO_M;
        if cords_per_m == 0.0 || cos_a == 0.0 {
            return Err(DomainError::DivisionByZero {
                context: "cord tension denominator",
            });
        }

        let netting = pressure * section_radius / (cords_per_m * cos_a * cos_a);
        match model {
            CordModel::Netting => Ok(netting),
            CordModel::Walter => {
                let v = self.speed_index * MPH_TO_MPS;
                Ok(netting + CORD_LINEAR_DENSITY * v * v)
            }
        }
    }

    /// Whether the Walter cord tension stays within the cord breaking load (N).
    pub fn is_mechanically_feasible(&self, break_load: f64) -> Result<bool, DomainError> {
        Ok(self.cord_tension(CordModel::Walter)? <= break_load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scenario() -> Tire {
        Tire::new(10.0, 21.0, 7.0, 10.0, 12.0)
    }

    #[test]
    fn load_capacity_matches_reference_value() {
        let tire = scenario();
        assert_relative_eq!(
            tire.max_load_capacity(true).unwrap(),
            5202.506473136066,
            max_relative = 1e-9
        );
        assert_eq!(tire.max_load_capacity(false).unwrap(), 5200.0);
    }

    #[test]
    fn oracle_is_deterministic() {
        let tire = scenario().with_speed_index(210.0);
        let gas = GasConditions::default();
        // Bit-identical across repeated calls.
        assert_eq!(
            tire.max_load_capacity(true).unwrap(),
            tire.max_load_capacity(true).unwrap()
        );
        assert_eq!(
            tire.inflation_medium_mass(&gas).unwrap(),
            tire.inflation_medium_mass(&gas).unwrap()
        );
        assert_eq!(
            tire.cord_tension(CordModel::Walter).unwrap(),
            tire.cord_tension(CordModel::Walter).unwrap()
        );
    }

    #[test]
    fn inflation_pressure_matches_reference_value() {
        let tire = scenario();
        assert_relative_eq!(
            tire.inflation_pressure().unwrap(),
            122.61927699285229,
            max_relative = 1e-9
        );

        // Radial construction above the low-speed index uses the pressure
        // index directly.
        let fast_radial = scenario()
            .with_speed_index(210.0)
            .with_construction(Construction::Radial);
        assert_relative_eq!(
            fast_radial.inflation_pressure().unwrap(),
            133.52956750000004,
            max_relative = 1e-9
        );
    }

    #[test]
    fn inflation_medium_mass_matches_reference_value() {
        let tire = scenario();
        assert_relative_eq!(
            tire.inflation_medium_mass(&GasConditions::default()).unwrap(),
            0.2671062335191968,
            max_relative = 1e-6
        );
    }

    #[test]
    fn cord_tension_matches_reference_values() {
        let tire = scenario();
        assert_relative_eq!(
            tire.cord_tension(CordModel::Netting).unwrap(),
            49.36414872760044,
            max_relative = 1e-6
        );
        let rated = scenario().with_speed_index(210.0);
        assert_relative_eq!(
            rated.cord_tension(CordModel::Walter).unwrap(),
            59.49927581214443,
            max_relative = 1e-6
        );
        // Without a speed rating the centrifugal term vanishes.
        assert_eq!(
            tire.cord_tension(CordModel::Walter).unwrap(),
            tire.cord_tension(CordModel::Netting).unwrap()
        );
    }

    #[test]
    fn ends_ratio_clamps_below_linear_domain() {
        // At and below Lr = 1.5 the same linear branch value applies.
        assert_eq!(ratio_of_ends_per_inch(1.5), ratio_of_ends_per_inch(1.4));
        assert_relative_eq!(ratio_of_ends_per_inch(1.5), 1.1225, max_relative = 1e-12);
    }

    #[test]
    fn ends_ratio_clamps_above_polynomial_domain() {
        // At and above Lr = 5 the clamped value is identical, never
        // extrapolated.
        assert_eq!(ratio_of_ends_per_inch(5.0), ratio_of_ends_per_inch(5.3));
        assert_eq!(ratio_of_ends_per_inch(5.0), ratio_of_ends_per_inch(100.0));
    }

    #[test]
    fn ends_ratio_branches_meet_at_transition() {
        let linear_at_boundary = 1.835 - 0.475 * 2.2;
        assert_relative_eq!(
            ratio_of_ends_per_inch(2.2),
            linear_at_boundary,
            max_relative = 1e-12
        );
    }

    #[test]
    fn rating_rounds_to_nearest_25_half_away_from_zero() {
        assert_eq!(round_to_rating(5162.5), 5175.0);
        assert_eq!(round_to_rating(5162.4), 5150.0);
        assert_eq!(round_to_rating(5150.0), 5150.0);
        assert_eq!(round_to_rating(5187.6), 5200.0);
    }

    #[test]
    fn rounded_capacity_is_nearest_increment_of_exact() {
        for tire in [
            scenario(),
            Tire::new(24.0, 40.0, 14.0, 16.0, 20.0),
            Tire::new(6.0, 14.0, 5.0, 6.0, 7.0),
        ] {
            let exact = tire.max_load_capacity(true).unwrap();
            let rounded = tire.max_load_capacity(false).unwrap();
            assert!((exact - rounded).abs() <= 12.5);
            assert_eq!(rounded % 25.0, 0.0);
        }
    }

    #[test]
    fn narrow_sections_use_ply_rating_directly() {
        let narrow = Tire::new(8.0, 14.0, 5.0, 6.0, 7.0);
        assert_eq!(narrow.load_supporting_capability(), 8.0);

        let wide = Tire::new(8.0, 21.0, 8.0, 10.0, 12.0);
        assert_relative_eq!(
            wide.load_supporting_capability(),
            10.4 * 64.0 / 64.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn zero_rim_diameter_is_a_domain_error() {
        let bad = Tire::new(10.0, 21.0, 7.0, 0.0, 12.0);
        assert!(matches!(
            bad.lift_ratio(),
            Err(DomainError::DivisionByZero { .. })
        ));
        assert!(bad.max_load_capacity(true).is_err());
    }

    #[test]
    fn degenerate_footprint_is_a_negative_sqrt_error() {
        // Full deflection on a wide flange gap exceeds the section width.
        let thin = Tire::new(10.0, 40.0, 2.0, 10.0, 12.0);
        assert!(matches!(
            thin.ground_contact_area(1.0),
            Err(DomainError::NegativeSqrt { .. })
        ));
    }

    #[test]
    fn inverted_geometry_is_an_inverse_trig_error() {
        // Dm < D puts the crown angle argument outside [-1, 1].
        let inverted = Tire::new(10.0, 8.0, 7.0, 10.0, 12.0);
        assert!(matches!(
            inverted.cord_tension(CordModel::Netting),
            Err(DomainError::InverseTrigRange { .. })
        ));
    }

    #[test]
    fn mechanical_feasibility_compares_against_break_load() {
        let tire = scenario().with_speed_index(210.0);
        assert!(tire.is_mechanically_feasible(260.0).unwrap());
        assert!(!tire.is_mechanically_feasible(10.0).unwrap());
    }
}
