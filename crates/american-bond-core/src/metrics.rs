use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BondError;
use crate::rates::effective_annual_to_period;
use crate::schedule::{investor_flows, issuer_flows, CashFlowPeriod};
use crate::solver::{solve_effective_rate, SolverConfig};
use crate::time_value::{npv, present_value_of_future};
use crate::types::{Money, Rate, Years};
use crate::BondResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Valuation metrics for one schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    /// PV of investor flows 1..N at the investor's discount rate
    pub current_price: Money,
    /// Investor utility: issuance outflow plus current price
    pub investor_npv: Money,
    /// NPV of the issuer's gross flows at the issuer's cost of capital
    pub issuer_npv: Money,
    /// Issuer effective annual cost (TCEA) before tax shield
    pub issuer_tcea: Rate,
    /// Issuer effective annual cost net of the interest tax shield
    pub issuer_tcea_with_shield: Rate,
    /// Investor effective annual yield (TREA)
    pub investor_trea: Rate,
    pub macaulay_duration: Years,
    pub modified_duration: Decimal,
    pub convexity: Decimal,
    /// Macaulay duration plus convexity
    pub decision_ratio: Decimal,
    pub computed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Return a new schedule with the investor flows discounted at
/// `investor_rate` (annual effective). Period 0 is left undiscounted.
///
/// - discounted flow = flow / (1 + r_p)^p
/// - time-weighted flow = discounted × p / f
/// - convexity factor = discounted × p × (p + 1)
pub fn discount_schedule(
    schedule: &[CashFlowPeriod],
    investor_rate: Rate,
    periods_per_year: Decimal,
) -> BondResult<Vec<CashFlowPeriod>> {
    let period_rate = effective_annual_to_period(investor_rate, periods_per_year)
        .map_err(|_| BondError::invalid_rate("investor_discount_rate", "Must be greater than -100%."))?;
    let one_plus_r = Decimal::ONE + period_rate;

    let mut discount = Decimal::ONE;
    let mut out = Vec::with_capacity(schedule.len());
    for row in schedule {
        let mut row = row.clone();
        if row.period > 0 {
            let period = row.period;
            discount = discount
                .checked_mul(one_plus_r)
                .filter(|d| !d.is_zero())
                .ok_or_else(|| discount_overflow(period))?;
            let p = Decimal::from(period);
            let discounted = row
                .investor_flow
                .checked_div(discount)
                .ok_or_else(|| discount_overflow(period))?;
            let time_weighted = discounted
                .checked_mul(p)
                .and_then(|v| v.checked_div(periods_per_year))
                .ok_or_else(|| discount_overflow(period))?;
            let convexity_factor = discounted
                .checked_mul(p * (p + Decimal::ONE))
                .ok_or_else(|| discount_overflow(period))?;
            row.discounted_flow = Some(discounted);
            row.time_weighted_flow = Some(time_weighted);
            row.convexity_factor = Some(convexity_factor);
        }
        out.push(row);
    }
    Ok(out)
}

/// Metrics stamped with the current time.
pub fn compute_metrics(
    schedule: &[CashFlowPeriod],
    issuer_rate: Rate,
    investor_rate: Rate,
    periods_per_year: Decimal,
    solver: &SolverConfig,
) -> BondResult<MetricsResult> {
    compute_metrics_at(
        schedule,
        issuer_rate,
        investor_rate,
        periods_per_year,
        solver,
        Utc::now(),
    )
}

/// Metrics with an explicit timestamp, for reproducible output.
pub fn compute_metrics_at(
    schedule: &[CashFlowPeriod],
    issuer_rate: Rate,
    investor_rate: Rate,
    periods_per_year: Decimal,
    solver: &SolverConfig,
    computed_at: DateTime<Utc>,
) -> BondResult<MetricsResult> {
    let discounted = discount_schedule(schedule, investor_rate, periods_per_year)?;
    metrics_from_discounted(
        &discounted,
        issuer_rate,
        investor_rate,
        periods_per_year,
        solver,
        computed_at,
    )
}

/// Metrics from a schedule already passed through [`discount_schedule`] at
/// `investor_rate`.
pub fn metrics_from_discounted(
    discounted: &[CashFlowPeriod],
    issuer_rate: Rate,
    investor_rate: Rate,
    periods_per_year: Decimal,
    solver: &SolverConfig,
    computed_at: DateTime<Utc>,
) -> BondResult<MetricsResult> {
    validate_schedule(discounted)?;

    let issuer_period_rate = effective_annual_to_period(issuer_rate, periods_per_year)
        .map_err(|_| BondError::invalid_rate("issuer_discount_rate", "Must be greater than -100%."))?;
    let investor_period_rate = effective_annual_to_period(investor_rate, periods_per_year)
        .map_err(|_| BondError::invalid_rate("investor_discount_rate", "Must be greater than -100%."))?;

    let investor = investor_flows(discounted);
    let issuer_gross = issuer_flows(discounted, false);
    let issuer_net = issuer_flows(discounted, true);

    let current_price = present_value_of_future(investor_period_rate, &investor)
        .map_err(|e| BondError::invalid_rate("investor_discount_rate", e.to_string()))?;
    if current_price.is_zero() {
        return Err(BondError::DivisionByZero {
            context: "duration: present value of future flows is zero".into(),
        });
    }

    let mut time_weighted = Decimal::ZERO;
    let mut convexity_sum = Decimal::ZERO;
    for row in discounted.iter().skip(1) {
        let (Some(tw), Some(cf)) = (row.time_weighted_flow, row.convexity_factor) else {
            return Err(BondError::InvalidSchedule {
                period: row.period,
                reason: "row has not been discounted".into(),
            });
        };
        time_weighted = time_weighted
            .checked_add(tw)
            .ok_or_else(|| discount_overflow(row.period))?;
        convexity_sum = convexity_sum
            .checked_add(cf)
            .ok_or_else(|| discount_overflow(row.period))?;
    }

    let one_plus_r = Decimal::ONE + investor_period_rate;
    let macaulay_duration = time_weighted
        .checked_div(current_price)
        .ok_or_else(|| sensitivity_overflow("duration"))?;
    let modified_duration = macaulay_duration
        .checked_div(one_plus_r)
        .ok_or_else(|| sensitivity_overflow("modified duration"))?;
    let convexity = current_price
        .checked_mul(one_plus_r * one_plus_r)
        .and_then(|d| d.checked_mul(periods_per_year * periods_per_year))
        .filter(|d| !d.is_zero())
        .and_then(|d| convexity_sum.checked_div(d))
        .ok_or_else(|| sensitivity_overflow("convexity"))?;
    let decision_ratio = macaulay_duration
        .checked_add(convexity)
        .ok_or_else(|| sensitivity_overflow("decision ratio"))?;

    let investor_npv = investor[0] + current_price;
    let issuer_npv = npv(issuer_period_rate, &issuer_gross)
        .map_err(|e| BondError::invalid_rate("issuer_discount_rate", e.to_string()))?;

    let issuer_tcea = solve_effective_rate(&issuer_gross, periods_per_year, solver)?;
    let issuer_tcea_with_shield = solve_effective_rate(&issuer_net, periods_per_year, solver)?;
    let investor_trea = solve_effective_rate(&investor, periods_per_year, solver)?;

    debug!(
        price = %current_price,
        tcea = %issuer_tcea,
        trea = %investor_trea,
        duration = %macaulay_duration,
        "computed bond metrics"
    );

    Ok(MetricsResult {
        current_price,
        investor_npv,
        issuer_npv,
        issuer_tcea,
        issuer_tcea_with_shield,
        investor_trea,
        macaulay_duration,
        modified_duration,
        convexity,
        decision_ratio,
        computed_at,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_schedule(schedule: &[CashFlowPeriod]) -> BondResult<()> {
    if schedule.len() < 2 {
        return Err(BondError::invalid_input(
            "schedule",
            "Schedule must contain issuance and at least one coupon period.",
        ));
    }
    for (idx, row) in schedule.iter().enumerate() {
        if row.period as usize != idx {
            return Err(BondError::InvalidSchedule {
                period: row.period,
                reason: format!("expected period {idx} at position {idx}"),
            });
        }
    }
    Ok(())
}

fn discount_overflow(period: u32) -> BondError {
    BondError::invalid_rate(
        "investor_discount_rate",
        format!("Discounting overflowed decimal range at period {period}."),
    )
}

fn sensitivity_overflow(measure: &str) -> BondError {
    BondError::invalid_rate(
        "investor_discount_rate",
        format!("{measure} overflowed decimal range."),
    )
}
