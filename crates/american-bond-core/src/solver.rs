//! Safeguarded Newton-Raphson root finding.
//!
//! The solver keeps a sign-changing bracket and takes a Newton step whenever
//! it lands strictly inside the bracket, falling back to bisection otherwise.
//! It knows nothing about bonds: callers hand it a closure.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::BondError;
use crate::rates::{effective_annual_to_period, period_to_effective_annual};
use crate::time_value::{npv, npv_derivative};
use crate::types::{Money, Rate};
use crate::BondResult;

/// Step used for finite-difference slopes.
const SLOPE_STEP: Decimal = dec!(0.0000000001);
/// Bracket width below which further refinement is meaningless.
const MIN_BRACKET_WIDTH: Decimal = dec!(0.0000000000000000000001);
/// Attempts to pull an unevaluable bracket endpoint toward the interior.
const MAX_ENDPOINT_RETRIES: u32 = 64;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Root-finding settings. Bounds and guess are annual effective rates when
/// used through [`solve_effective_rate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Absolute residual accepted as a root
    pub tolerance: Decimal,
    pub max_iterations: u32,
    pub lower_bound: Rate,
    pub upper_bound: Rate,
    pub initial_guess: Rate,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: dec!(0.00000001),
            max_iterations: 200,
            lower_bound: dec!(-0.99),
            upper_bound: dec!(10.0),
            initial_guess: dec!(0.10),
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> BondResult<()> {
        if self.tolerance <= Decimal::ZERO {
            return Err(BondError::invalid_input("solver.tolerance", "Tolerance must be positive."));
        }
        if self.max_iterations == 0 {
            return Err(BondError::invalid_input(
                "solver.max_iterations",
                "At least one iteration is required.",
            ));
        }
        if self.lower_bound >= self.upper_bound {
            return Err(BondError::invalid_input(
                "solver.lower_bound",
                "Lower bound must be below upper bound.",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Generic solver
// ---------------------------------------------------------------------------

/// Find `x` in `[lower_bound, upper_bound]` with `|f(x)| < tolerance`,
/// estimating slopes by forward differences.
pub fn find_root<F>(name: &str, f: F, config: &SolverConfig) -> BondResult<Decimal>
where
    F: Fn(Decimal) -> BondResult<Decimal>,
{
    let slope = |x: Decimal, fx: Decimal| -> BondResult<Decimal> { Ok((f(x + SLOPE_STEP)? - fx) / SLOPE_STEP) };
    solve(name, &f, slope, config)
}

/// As [`find_root`] with an analytic derivative `df`.
pub fn find_root_with_derivative<F, D>(name: &str, f: F, df: D, config: &SolverConfig) -> BondResult<Decimal>
where
    F: Fn(Decimal) -> BondResult<Decimal>,
    D: Fn(Decimal) -> BondResult<Decimal>,
{
    solve(name, &f, |x, _| df(x), config)
}

fn solve<F, S>(name: &str, f: &F, slope: S, config: &SolverConfig) -> BondResult<Decimal>
where
    F: Fn(Decimal) -> BondResult<Decimal>,
    S: Fn(Decimal, Decimal) -> BondResult<Decimal>,
{
    config.validate()?;

    let interior = if config.initial_guess > config.lower_bound && config.initial_guess < config.upper_bound {
        config.initial_guess
    } else {
        (config.lower_bound + config.upper_bound) / dec!(2)
    };

    let (mut lo, mut f_lo) = evaluate_endpoint(name, f, config.lower_bound, interior)?;
    let (mut hi, f_hi) = evaluate_endpoint(name, f, config.upper_bound, interior)?;

    if f_lo.abs() < config.tolerance {
        return Ok(lo);
    }
    if f_hi.abs() < config.tolerance {
        return Ok(hi);
    }
    if same_sign(f_lo, f_hi) {
        return Err(BondError::Convergence {
            function: format!("{name} (no sign change on [{lo}, {hi}])"),
            iterations: 0,
            last_delta: f_lo,
        });
    }

    let mut x = interior;
    let mut fx = f_lo;
    for i in 0..config.max_iterations {
        fx = f(x)?;
        trace!(solver = name, iteration = i, x = %x, residual = %fx);

        if fx.abs() < config.tolerance {
            return Ok(x);
        }

        if same_sign(fx, f_lo) {
            lo = x;
            f_lo = fx;
        } else {
            hi = x;
        }

        if hi - lo < MIN_BRACKET_WIDTH {
            break;
        }

        let newton = match slope(x, fx) {
            Ok(d) if !d.is_zero() => fx.checked_div(d).and_then(|step| x.checked_sub(step)),
            _ => None,
        };
        x = match newton {
            Some(candidate) if candidate > lo && candidate < hi => candidate,
            _ => (lo + hi) / dec!(2),
        };
    }

    Err(BondError::Convergence {
        function: name.to_string(),
        iterations: config.max_iterations,
        last_delta: fx,
    })
}

/// Evaluate `f` at `x`, pulling `x` halfway toward `interior` while the
/// evaluation fails (e.g. decimal overflow at extreme rates).
fn evaluate_endpoint<F>(name: &str, f: &F, x: Decimal, interior: Decimal) -> BondResult<(Decimal, Decimal)>
where
    F: Fn(Decimal) -> BondResult<Decimal>,
{
    let mut point = x;
    for _ in 0..MAX_ENDPOINT_RETRIES {
        match f(point) {
            Ok(value) => return Ok((point, value)),
            Err(_) => point = (point + interior) / dec!(2),
        }
    }
    Err(BondError::Convergence {
        function: format!("{name} (bracket endpoint {x} cannot be evaluated)"),
        iterations: MAX_ENDPOINT_RETRIES,
        last_delta: Decimal::ZERO,
    })
}

fn same_sign(a: Decimal, b: Decimal) -> bool {
    a.is_sign_negative() == b.is_sign_negative()
}

// ---------------------------------------------------------------------------
// Cash-flow yields
// ---------------------------------------------------------------------------

/// Per-period internal rate of return of evenly spaced flows. The annual
/// bounds and guess in `config` are converted to the period basis first.
pub fn solve_period_rate(flows: &[Money], periods_per_year: Decimal, config: &SolverConfig) -> BondResult<Rate> {
    if flows.len() < 2 {
        return Err(BondError::invalid_input(
            "flows",
            "At least two cash flows are required to solve a yield.",
        ));
    }
    config.validate()?;

    let period_config = SolverConfig {
        lower_bound: effective_annual_to_period(config.lower_bound, periods_per_year)?,
        upper_bound: effective_annual_to_period(config.upper_bound, periods_per_year)?,
        initial_guess: effective_annual_to_period(config.initial_guess, periods_per_year)?,
        ..*config
    };

    find_root_with_derivative(
        "IRR",
        |r| npv(r, flows),
        |r| npv_derivative(r, flows),
        &period_config,
    )
}

/// Annual effective rate that zeroes the NPV of `flows`, discounting on an
/// annualized time basis (`t = p / periods_per_year`).
pub fn solve_effective_rate(flows: &[Money], periods_per_year: Decimal, config: &SolverConfig) -> BondResult<Rate> {
    let period_rate = solve_period_rate(flows, periods_per_year, config)?;
    period_to_effective_annual(period_rate, periods_per_year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_find_root_quadratic() {
        // x^2 - 2 on [0, 2]
        let cfg = SolverConfig {
            lower_bound: dec!(0),
            upper_bound: dec!(2),
            initial_guess: dec!(1),
            ..Default::default()
        };
        let root = find_root("sqrt2", |x| Ok(x * x - dec!(2)), &cfg).unwrap();
        assert!((root - dec!(1.41421356237)).abs() < dec!(0.00000001), "got {root}");
    }

    #[test]
    fn test_find_root_with_derivative_cubic() {
        let cfg = SolverConfig {
            lower_bound: dec!(-3),
            upper_bound: dec!(0),
            initial_guess: dec!(-1),
            ..Default::default()
        };
        let root = find_root_with_derivative(
            "cubic",
            |x| Ok(x * x * x + dec!(8)),
            |x| Ok(dec!(3) * x * x),
            &cfg,
        )
        .unwrap();
        assert!((root + dec!(2)).abs() < dec!(0.000000001), "got {root}");
    }

    #[test]
    fn test_irr_of_par_bond_equals_coupon() {
        let flows = vec![dec!(-1000), dec!(50), dec!(50), dec!(50), dec!(1050)];
        let r = solve_period_rate(&flows, Decimal::ONE, &SolverConfig::default()).unwrap();
        assert!((r - dec!(0.05)).abs() < dec!(0.000000001), "got {r}");
        assert!(npv(r, &flows).unwrap().abs() < dec!(0.00000001));
    }

    #[test]
    fn test_effective_rate_annualizes_semiannual_irr() {
        // 4% per half-year → 1.04^2 - 1 = 0.0816
        let flows = vec![dec!(-1000), dec!(40), dec!(40), dec!(40), dec!(1040)];
        let r = solve_effective_rate(&flows, dec!(2), &SolverConfig::default()).unwrap();
        assert!((r - dec!(0.0816)).abs() < dec!(0.0000001), "got {r}");
    }

    #[test]
    fn test_same_sign_flows_fail() {
        let flows = vec![dec!(100), dec!(50), dec!(50)];
        let err = solve_effective_rate(&flows, dec!(2), &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, BondError::Convergence { .. }));
    }

    #[test]
    fn test_iteration_budget_exhausted() {
        let cfg = SolverConfig {
            lower_bound: dec!(0),
            upper_bound: dec!(2),
            tolerance: dec!(0.00000001),
            max_iterations: 1,
            initial_guess: dec!(0.1),
        };
        let err = find_root("slow", |x| Ok(x - dec!(1.5)), &cfg);
        // A linear function is solved by the first Newton step but the
        // residual is only checked on the next iteration.
        assert!(matches!(err, Err(BondError::Convergence { iterations: 1, .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = SolverConfig {
            lower_bound: dec!(1),
            upper_bound: dec!(0),
            ..Default::default()
        };
        assert!(matches!(
            find_root("bad", |x| Ok(x), &cfg),
            Err(BondError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_deterministic() {
        let flows = vec![dec!(-987.65), dec!(41.2), dec!(41.2), dec!(41.2), dec!(1041.2)];
        let a = solve_effective_rate(&flows, dec!(4), &SolverConfig::default()).unwrap();
        let b = solve_effective_rate(&flows, dec!(4), &SolverConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_long_monthly_schedule_survives_extreme_bracket() {
        // 30-year monthly bond; the -99% endpoint overflows and is pulled in
        let mut flows = vec![dec!(-1000)];
        flows.extend(std::iter::repeat(dec!(5)).take(359));
        flows.push(dec!(1005));
        let r = solve_period_rate(&flows, dec!(12), &SolverConfig::default()).unwrap();
        assert!((r - dec!(0.005)).abs() < dec!(0.000000001), "got {r}");
    }
}
