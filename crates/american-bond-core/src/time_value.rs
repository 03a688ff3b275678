use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::BondError;
use crate::rates::effective_annual_to_period;
use crate::types::{Money, Rate};
use crate::BondResult;

/// Net Present Value of evenly spaced cash flows, `flows[0]` undiscounted.
///
/// Discount factors are accumulated by repeated multiplication so integral
/// periods stay exact. Overflow of the factor is reported, never wrapped.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> BondResult<Money> {
    if rate <= dec!(-1) {
        return Err(BondError::invalid_rate(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r).ok_or_else(|| overflow(t))?;
        }
        if discount.is_zero() {
            return Err(BondError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        let term = cf.checked_div(discount).ok_or_else(|| overflow(t))?;
        result = result.checked_add(term).ok_or_else(|| overflow(t))?;
    }

    Ok(result)
}

/// Slope of [`npv`] with respect to the period rate.
pub fn npv_derivative(rate: Rate, cash_flows: &[Money]) -> BondResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(BondError::invalid_rate(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut discount = one_plus_r;
    let mut result = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate().skip(1) {
        discount = discount.checked_mul(one_plus_r).ok_or_else(|| overflow(t))?;
        if discount.is_zero() {
            return Err(BondError::DivisionByZero {
                context: format!("NPV derivative discount factor at period {t}"),
            });
        }
        let term = (Decimal::from(t as u64) * cf)
            .checked_div(discount)
            .ok_or_else(|| overflow(t))?;
        result = result.checked_sub(term).ok_or_else(|| overflow(t))?;
    }

    Ok(result)
}

/// `Σ flow[p] / (1 + r)^(p / f)` with `r` an annual effective rate.
pub fn npv_annualized(annual_rate: Rate, cash_flows: &[Money], periods_per_year: Decimal) -> BondResult<Money> {
    let period_rate = effective_annual_to_period(annual_rate, periods_per_year)?;
    npv(period_rate, cash_flows)
}

/// Present value of flows `1..`, i.e. [`npv`] with the first flow dropped.
pub fn present_value_of_future(rate: Rate, cash_flows: &[Money]) -> BondResult<Money> {
    if cash_flows.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let mut shifted = Vec::with_capacity(cash_flows.len());
    shifted.push(Decimal::ZERO);
    shifted.extend_from_slice(&cash_flows[1..]);
    npv(rate, &shifted)
}

fn overflow(period: usize) -> BondError {
    BondError::invalid_rate("rate", format!("Discounting overflowed decimal range at period {period}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_npv_rejects_total_loss_rate() {
        assert!(npv(dec!(-1), &[dec!(1)]).is_err());
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let cfs = vec![dec!(-1000), dec!(80), dec!(80), dec!(1080)];
        let r = dec!(0.07);
        let h = dec!(0.0000001);
        let fd = (npv(r + h, &cfs).unwrap() - npv(r - h, &cfs).unwrap()) / (dec!(2) * h);
        let analytic = npv_derivative(r, &cfs).unwrap();
        assert!((fd - analytic).abs() < dec!(0.0001), "fd {fd} analytic {analytic}");
    }

    #[test]
    fn test_annualized_matches_periodic_for_annual_flows() {
        let cfs = vec![dec!(-100), dec!(60), dec!(60)];
        let a = npv_annualized(dec!(0.1), &cfs, Decimal::ONE).unwrap();
        let b = npv(dec!(0.1), &cfs).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_present_value_of_future_skips_first() {
        let cfs = vec![dec!(-1000), dec!(110)];
        assert_eq!(present_value_of_future(dec!(0.1), &cfs).unwrap(), dec!(100));
    }
}
