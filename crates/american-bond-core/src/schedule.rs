//! American-method cash-flow schedule.
//!
//! The bond pays interest on its (optionally inflation-indexed) outstanding
//! principal every period and repays the whole principal in the final
//! period. Grace periods defer nothing but interest under partial grace and
//! capitalize interest under total grace. Each period's opening principal
//! depends on the previous period's outcome, so the schedule is built as a
//! fold over an explicit accumulator.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bond::{BondTerms, CostStructure};
use crate::error::BondError;
use crate::grace::{grace_for_period, GraceType};
use crate::inflation::InflationIndexer;
use crate::rates::coupon_period_rate;
use crate::types::{Money, Rate};
use crate::BondResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One row of the schedule. Period 0 is issuance.
///
/// Issuer flows are negative when the issuer pays; investor flows are the
/// mirror image. The three discounting columns stay `None` until the
/// schedule is passed through [`crate::metrics::discount_schedule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowPeriod {
    pub period: u32,
    pub date: NaiveDate,
    pub annual_inflation: Rate,
    pub period_inflation: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace: Option<GraceType>,
    /// Nominal (unindexed) principal outstanding at the start of the period
    pub bond_principal: Money,
    pub indexed_principal: Money,
    /// Interest accrued on the indexed principal
    pub coupon: Money,
    /// Interest added to principal instead of being paid (total grace)
    pub capitalized_interest: Money,
    /// Principal repaid, in indexed money
    pub amortization: Money,
    /// Principal repaid, in nominal (unindexed) terms
    pub nominal_amortization: Money,
    pub installment: Money,
    pub premium: Money,
    pub tax_shield: Money,
    pub issuer_flow: Money,
    pub issuer_flow_with_shield: Money,
    pub investor_flow: Money,
    /// Nominal principal outstanding after the period
    pub closing_principal: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounted_flow: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_weighted_flow: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convexity_factor: Option<Decimal>,
}

/// Nominal principal carried between periods.
#[derive(Debug, Clone, Copy)]
struct Carry {
    principal: Money,
}

struct PeriodContext<'a> {
    terms: &'a BondTerms,
    indexer: &'a InflationIndexer,
    period_rate: Rate,
    total_periods: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the full schedule, periods `0..=term_years * coupons_per_year`.
pub fn generate_schedule(terms: &BondTerms, costs: &CostStructure) -> BondResult<Vec<CashFlowPeriod>> {
    terms.validate()?;
    costs.validate()?;

    let period_rate = coupon_period_rate(
        terms.annual_rate,
        terms.rate_type,
        terms.day_count_basis,
        terms.coupon_frequency,
    )?;
    let indexer = InflationIndexer::new(
        &terms.inflation_series,
        terms.inflation_indexed,
        terms.coupon_frequency,
        terms.day_count_basis,
    )?;

    let ctx = PeriodContext {
        terms,
        indexer: &indexer,
        period_rate,
        total_periods: terms.total_periods(),
    };

    let mut schedule = Vec::with_capacity(ctx.total_periods as usize + 1);
    schedule.push(issuance_period(terms, costs)?);

    let start = Carry {
        principal: terms.nominal_value,
    };
    let end = (1..=ctx.total_periods).try_fold(start, |carry, p| {
        let (row, next) = coupon_period(&ctx, carry, p)?;
        schedule.push(row);
        Ok::<_, BondError>(next)
    })?;

    if !end.principal.is_zero() {
        return Err(BondError::InvalidSchedule {
            period: ctx.total_periods,
            reason: format!("{} of principal remains outstanding at maturity", end.principal),
        });
    }

    debug!(
        periods = ctx.total_periods,
        period_rate = %period_rate,
        indexed = terms.inflation_indexed,
        "generated American-method schedule"
    );

    Ok(schedule)
}

/// Issuer and investor flows only, in period order.
pub fn issuer_flows(schedule: &[CashFlowPeriod], with_shield: bool) -> Vec<Money> {
    schedule
        .iter()
        .map(|row| {
            if with_shield {
                row.issuer_flow_with_shield
            } else {
                row.issuer_flow
            }
        })
        .collect()
}

pub fn investor_flows(schedule: &[CashFlowPeriod]) -> Vec<Money> {
    schedule.iter().map(|row| row.investor_flow).collect()
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn issuance_period(terms: &BondTerms, costs: &CostStructure) -> BondResult<CashFlowPeriod> {
    let totals = costs.totals(terms.commercial_value);
    let issuer_flow = terms.commercial_value - totals.issuer;
    Ok(CashFlowPeriod {
        period: 0,
        date: terms.issuance_date,
        annual_inflation: Decimal::ZERO,
        period_inflation: Decimal::ZERO,
        grace: None,
        bond_principal: Decimal::ZERO,
        indexed_principal: Decimal::ZERO,
        coupon: Decimal::ZERO,
        capitalized_interest: Decimal::ZERO,
        amortization: Decimal::ZERO,
        nominal_amortization: Decimal::ZERO,
        installment: Decimal::ZERO,
        premium: Decimal::ZERO,
        tax_shield: Decimal::ZERO,
        issuer_flow,
        issuer_flow_with_shield: issuer_flow,
        investor_flow: -terms.commercial_value - totals.investor,
        closing_principal: terms.nominal_value,
        discounted_flow: None,
        time_weighted_flow: None,
        convexity_factor: None,
    })
}

fn coupon_period(ctx: &PeriodContext<'_>, carry: Carry, p: u32) -> BondResult<(CashFlowPeriod, Carry)> {
    let terms = ctx.terms;
    let grace = grace_for_period(&terms.grace_series, p, terms.coupons_per_year()).ok_or_else(|| {
        BondError::SeriesLengthMismatch {
            field: "grace_series".into(),
            expected: terms.term_years as usize,
            actual: terms.grace_series.len(),
        }
    })?;
    let treatment = grace.treatment();
    let is_final = p == ctx.total_periods;

    let factor = ctx.indexer.factor(p);
    let indexed_principal = ctx.indexer.index(carry.principal, p)?;
    let coupon = checked(indexed_principal.checked_mul(ctx.period_rate), p, "coupon")?;

    let paid_coupon = if treatment.interest_paid { coupon } else { Decimal::ZERO };
    let capitalized_interest = if treatment.interest_capitalizes {
        coupon
    } else {
        Decimal::ZERO
    };

    // Bullet repayment: the whole indexed principal falls due at maturity.
    let (amortization, nominal_amortization) = if is_final {
        if !treatment.amortizes {
            return Err(BondError::InvalidSchedule {
                period: p,
                reason: format!(
                    "final period is under {grace:?} grace so principal cannot be repaid"
                ),
            });
        }
        (indexed_principal, carry.principal)
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    let installment = checked(paid_coupon.checked_add(amortization), p, "installment")?;
    let premium = if is_final {
        checked(indexed_principal.checked_mul(terms.premium_pct), p, "premium")?
    } else {
        Decimal::ZERO
    };
    let tax_shield = checked(paid_coupon.checked_mul(terms.income_tax_rate), p, "tax shield")?;

    let investor_flow = checked(installment.checked_add(premium), p, "investor flow")?;
    let issuer_flow = -investor_flow;

    let capitalized_nominal = if capitalized_interest.is_zero() {
        Decimal::ZERO
    } else {
        capitalized_interest
            .checked_div(factor)
            .ok_or_else(|| BondError::DivisionByZero {
                context: format!("indexation factor at period {p}"),
            })?
    };
    let closing_principal = checked(
        (carry.principal - nominal_amortization).checked_add(capitalized_nominal),
        p,
        "closing principal",
    )?;

    let row = CashFlowPeriod {
        period: p,
        date: terms.period_date(p)?,
        annual_inflation: ctx.indexer.annual_rate(p),
        period_inflation: ctx.indexer.period_rate(p),
        grace: Some(grace),
        bond_principal: carry.principal,
        indexed_principal,
        coupon,
        capitalized_interest,
        amortization,
        nominal_amortization,
        installment,
        premium,
        tax_shield,
        issuer_flow,
        issuer_flow_with_shield: issuer_flow + tax_shield,
        investor_flow,
        closing_principal,
        discounted_flow: None,
        time_weighted_flow: None,
        convexity_factor: None,
    };

    Ok((
        row,
        Carry {
            principal: closing_principal,
        },
    ))
}

fn checked(value: Option<Decimal>, period: u32, what: &str) -> BondResult<Money> {
    value.ok_or_else(|| BondError::invalid_input("terms", format!("{what} overflowed at period {period}.")))
}
