use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::bond::{BondTerms, CostStructure, CostTotals};
use crate::grace::GraceType;
use crate::metrics::{discount_schedule, metrics_from_discounted, MetricsResult};
use crate::rates::{annual_effective_rate, coupon_period_rate};
use crate::schedule::{generate_schedule, CashFlowPeriod};
use crate::solver::SolverConfig;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::BondResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything needed to value one bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondValuationInput {
    /// Caller-supplied identifier, echoed back and attached to errors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bond_id: Option<String>,
    pub terms: BondTerms,
    #[serde(default)]
    pub costs: CostStructure,
    /// Issuer's annual effective cost of capital
    pub issuer_discount_rate: Rate,
    /// Investor's annual effective required return (COK)
    pub investor_discount_rate: Rate,
    #[serde(default)]
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondValuationOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bond_id: Option<String>,
    /// Effective annual coupon rate after any nominal conversion
    pub annual_effective_rate: Rate,
    /// Effective coupon rate per period
    pub period_rate: Rate,
    pub periods_per_year: Decimal,
    pub total_periods: u32,
    pub costs: CostTotals,
    pub metrics: MetricsResult,
    pub schedule: Vec<CashFlowPeriod>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate the schedule and metrics for one bond.
pub fn value_bond(input: &BondValuationInput) -> BondResult<ComputationOutput<BondValuationOutput>> {
    value_bond_at(input, Utc::now())
}

/// As [`value_bond`] with a fixed metrics timestamp.
pub fn value_bond_at(
    input: &BondValuationInput,
    computed_at: DateTime<Utc>,
) -> BondResult<ComputationOutput<BondValuationOutput>> {
    let bond_id = input.bond_id.as_deref();
    run(input, computed_at).map_err(|e| e.with_bond_id(bond_id))
}

fn run(
    input: &BondValuationInput,
    computed_at: DateTime<Utc>,
) -> BondResult<ComputationOutput<BondValuationOutput>> {
    let start = Instant::now();
    let terms = &input.terms;

    let schedule = generate_schedule(terms, &input.costs)?;
    let periods_per_year = terms.periods_per_year()?;
    let period_rate = coupon_period_rate(
        terms.annual_rate,
        terms.rate_type,
        terms.day_count_basis,
        terms.coupon_frequency,
    )?;
    let annual_effective = annual_effective_rate(terms.annual_rate, terms.rate_type, terms.day_count_basis)?;

    let schedule = discount_schedule(&schedule, input.investor_discount_rate, periods_per_year)?;
    let metrics = metrics_from_discounted(
        &schedule,
        input.issuer_discount_rate,
        input.investor_discount_rate,
        periods_per_year,
        &input.solver,
        computed_at,
    )?;

    let warnings = collect_warnings(input, &metrics);

    let output = BondValuationOutput {
        bond_id: input.bond_id.clone(),
        annual_effective_rate: annual_effective,
        period_rate,
        periods_per_year,
        total_periods: terms.total_periods(),
        costs: input.costs.totals(terms.commercial_value),
        metrics,
        schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "amortization": "American (bullet): full indexed principal repaid in the final period",
        "coupon_frequency": terms.coupon_frequency,
        "day_count_basis": terms.day_count_basis,
        "rate_type": terms.rate_type,
        "inflation_indexed": terms.inflation_indexed,
        "issuer_discount_rate": input.issuer_discount_rate.to_string(),
        "investor_discount_rate": input.investor_discount_rate.to_string(),
        "solver_tolerance": input.solver.tolerance.to_string(),
    });

    Ok(with_metadata(
        "American-method bond schedule with TCEA/TREA, duration and convexity",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

fn collect_warnings(input: &BondValuationInput, metrics: &MetricsResult) -> Vec<String> {
    let mut warnings = Vec::new();
    let terms = &input.terms;

    let total_grace_years = terms
        .grace_series
        .iter()
        .filter(|g| **g == GraceType::Total)
        .count();
    if total_grace_years > 0 {
        warnings.push(format!(
            "{total_grace_years} year(s) of total grace: interest is capitalized into principal."
        ));
    }
    if terms.annual_rate.is_zero() {
        warnings.push("Zero coupon rate: the bond pays principal and premium only.".into());
    }
    if terms.inflation_indexed && terms.inflation_series.iter().any(|i| *i < Decimal::ZERO) {
        warnings.push("Negative inflation reduces the indexed principal.".into());
    }
    if !terms.inflation_indexed && terms.inflation_series.iter().any(|i| !i.is_zero()) {
        warnings.push("Inflation series supplied but indexation is disabled; series is reported only.".into());
    }
    if metrics.investor_npv < Decimal::ZERO {
        warnings.push(format!(
            "Investor NPV is negative ({}): the price exceeds the value at the required return.",
            metrics.investor_npv.round_dp(4)
        ));
    }
    warnings
}
