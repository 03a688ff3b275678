use american_bond_core::bond::{BondTerms, CostStructure};
use american_bond_core::grace::GraceType;
use american_bond_core::metrics::compute_metrics_at;
use american_bond_core::rates::{Capitalization, CouponFrequency, DayCountBasis, RateType};
use american_bond_core::schedule::{generate_schedule, investor_flows, issuer_flows};
use american_bond_core::solver::{solve_effective_rate, solve_period_rate, SolverConfig};
use american_bond_core::time_value::{npv, npv_annualized};
use american_bond_core::valuation::{value_bond_at, BondValuationInput};
use american_bond_core::ErrorKind;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn sample_input() -> BondValuationInput {
    BondValuationInput {
        bond_id: Some("BOND-001".into()),
        terms: BondTerms {
            nominal_value: dec!(1000),
            commercial_value: dec!(1050),
            term_years: 5,
            coupon_frequency: CouponFrequency::Semiannual,
            day_count_basis: DayCountBasis::Days360,
            rate_type: RateType::Effective,
            annual_rate: dec!(0.08),
            issuance_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            premium_pct: dec!(0.01),
            income_tax_rate: dec!(0.30),
            inflation_indexed: true,
            inflation_series: vec![dec!(0.10); 5],
            grace_series: vec![GraceType::None; 5],
        },
        costs: CostStructure {
            structuring_pct: dec!(0.0045),
            placement_pct: dec!(0.0025),
            issuer_flotation_pct: dec!(0.0015),
            issuer_settlement_pct: dec!(0.005),
            investor_flotation_pct: dec!(0.0015),
            investor_settlement_pct: dec!(0.005),
        },
        issuer_discount_rate: dec!(0.09),
        investor_discount_rate: dec!(0.045),
        solver: SolverConfig::default(),
    }
}

fn stamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()
}

// ===========================================================================
// Solver properties
// ===========================================================================

#[test]
fn test_solved_rates_zero_the_npv() {
    let cfg = SolverConfig::default();
    for basis in [DayCountBasis::Days360, DayCountBasis::Days365] {
        for frequency in [
            CouponFrequency::Monthly,
            CouponFrequency::Quarterly,
            CouponFrequency::Semiannual,
            CouponFrequency::Annual,
        ] {
            let mut input = sample_input();
            input.terms.day_count_basis = basis;
            input.terms.coupon_frequency = frequency;
            let schedule = generate_schedule(&input.terms, &input.costs).unwrap();
            let f = input.terms.periods_per_year().unwrap();

            for flows in [
                issuer_flows(&schedule, false),
                issuer_flows(&schedule, true),
                investor_flows(&schedule),
            ] {
                let period_rate = solve_period_rate(&flows, f, &cfg).unwrap();
                assert!(npv(period_rate, &flows).unwrap().abs() < dec!(0.00000001));

                let annual = solve_effective_rate(&flows, f, &cfg).unwrap();
                let residual = npv_annualized(annual, &flows, f).unwrap();
                assert!(residual.abs() < dec!(0.00000001), "{basis:?} {frequency:?}: {residual}");
            }
        }
    }
}

#[test]
fn test_tax_shield_lowers_issuer_cost() {
    let out = value_bond_at(&sample_input(), stamp()).unwrap();
    let m = &out.result.metrics;
    assert!(m.issuer_tcea_with_shield < m.issuer_tcea);
}

#[test]
fn test_costs_separate_tcea_and_trea() {
    let out = value_bond_at(&sample_input(), stamp()).unwrap();
    let m = &out.result.metrics;
    // Issuer receives less than the investor pays, so its cost exceeds the
    // investor's yield.
    assert!(m.issuer_tcea > m.investor_trea);
}

// ===========================================================================
// Metrics properties
// ===========================================================================

#[test]
fn test_duration_and_convexity_non_negative() {
    let mut input = sample_input();
    for grace in [GraceType::None, GraceType::Partial, GraceType::Total] {
        input.terms.grace_series = vec![grace, GraceType::None, GraceType::None, GraceType::None, GraceType::None];
        let out = value_bond_at(&input, stamp()).unwrap();
        let m = &out.result.metrics;
        assert!(m.macaulay_duration >= Decimal::ZERO);
        assert!(m.modified_duration >= Decimal::ZERO);
        assert!(m.convexity >= Decimal::ZERO);
        assert!(m.modified_duration < m.macaulay_duration);
        // A bullet bond's duration cannot exceed its term
        assert!(m.macaulay_duration <= dec!(5));
    }
}

#[test]
fn test_current_price_matches_discounted_rows() {
    let out = value_bond_at(&sample_input(), stamp()).unwrap();
    let r = &out.result;
    let sum: Decimal = r.schedule[1..].iter().map(|row| row.discounted_flow.unwrap()).sum();
    assert_eq!(sum, r.metrics.current_price);
    assert_eq!(r.metrics.investor_npv, r.schedule[0].investor_flow + r.metrics.current_price);
}

#[test]
fn test_metrics_direct_call_matches_facade() {
    let input = sample_input();
    let schedule = generate_schedule(&input.terms, &input.costs).unwrap();
    let m = compute_metrics_at(
        &schedule,
        input.issuer_discount_rate,
        input.investor_discount_rate,
        input.terms.periods_per_year().unwrap(),
        &input.solver,
        stamp(),
    )
    .unwrap();
    let out = value_bond_at(&input, stamp()).unwrap();
    assert_eq!(m, out.result.metrics);
}

#[test]
fn test_recomputation_is_byte_identical() {
    let a = value_bond_at(&sample_input(), stamp()).unwrap();
    let b = value_bond_at(&sample_input(), stamp()).unwrap();
    assert_eq!(
        serde_json::to_string(&a.result).unwrap(),
        serde_json::to_string(&b.result).unwrap()
    );
}

#[test]
fn test_higher_discount_rate_lowers_price() {
    let low = value_bond_at(&sample_input(), stamp()).unwrap();
    let mut input = sample_input();
    input.investor_discount_rate = dec!(0.09);
    let high = value_bond_at(&input, stamp()).unwrap();
    assert!(high.result.metrics.current_price < low.result.metrics.current_price);
}

// ===========================================================================
// Rate bases
// ===========================================================================

#[test]
fn test_nominal_rate_input() {
    let mut input = sample_input();
    input.terms.rate_type = RateType::Nominal {
        capitalization: Capitalization::Daily,
    };
    let out = value_bond_at(&input, stamp()).unwrap();
    // Daily capitalization lifts the effective rate above the quote
    assert!(out.result.annual_effective_rate > dec!(0.08));
    assert!(out.result.annual_effective_rate < dec!(0.084));
}

#[test]
fn test_365_basis_stretches_time() {
    let mut input = sample_input();
    input.terms.day_count_basis = DayCountBasis::Days365;
    let out = value_bond_at(&input, stamp()).unwrap();
    assert_eq!(out.result.total_periods, 10);
    assert_eq!(out.result.periods_per_year, dec!(365) / dec!(180));
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn test_mismatched_series_fails_deterministically() {
    let mut input = sample_input();
    input.terms.grace_series.truncate(3);
    for _ in 0..3 {
        let err = value_bond_at(&input, stamp()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("BOND-001"));
        assert!(err.to_string().contains("grace_series"));
    }
}

#[test]
fn test_unknown_grace_code_rejected_at_boundary() {
    let mut value = serde_json::to_value(sample_input()).unwrap();
    value["terms"]["grace_series"][2] = serde_json::json!("X");
    assert!(serde_json::from_value::<BondValuationInput>(value).is_err());
}
