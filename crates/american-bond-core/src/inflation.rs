use rust_decimal::Decimal;

use crate::error::BondError;
use crate::grace::year_of_period;
use crate::rates::{effective_annual_to_period, periods_per_year, CouponFrequency, DayCountBasis};
use crate::types::{Money, Rate};
use crate::BondResult;

/// Per-period indexation factors built from an annual inflation series.
///
/// `factors[p]` is the cumulative product of `(1 + i_k)` for `k = 1..=p`, so
/// `factors[0] == 1`. When indexation is disabled every factor is exactly one
/// and the per-period rates are zero, while the stated annual series is kept
/// for reporting.
#[derive(Debug, Clone)]
pub struct InflationIndexer {
    annual_rates: Vec<Rate>,
    period_rates: Vec<Rate>,
    factors: Vec<Decimal>,
}

impl InflationIndexer {
    pub fn new(
        annual_series: &[Rate],
        enabled: bool,
        frequency: CouponFrequency,
        basis: DayCountBasis,
    ) -> BondResult<Self> {
        for (year, rate) in annual_series.iter().enumerate() {
            if *rate <= -Decimal::ONE {
                return Err(BondError::invalid_input(
                    "inflation_series",
                    format!("Year {} inflation must be greater than -100%.", year + 1),
                ));
            }
        }

        let coupons_per_year = frequency.coupons_per_year();
        let total_periods = annual_series.len() as u32 * coupons_per_year;
        let f = periods_per_year(basis, frequency.days())?;

        let mut yearly_period_rates = Vec::with_capacity(annual_series.len());
        for rate in annual_series {
            let period_rate = if enabled {
                effective_annual_to_period(*rate, f)?
            } else {
                Decimal::ZERO
            };
            yearly_period_rates.push(period_rate);
        }

        let mut annual_rates = Vec::with_capacity(total_periods as usize);
        let mut period_rates = Vec::with_capacity(total_periods as usize);
        let mut factors = Vec::with_capacity(total_periods as usize + 1);
        factors.push(Decimal::ONE);

        let mut cumulative = Decimal::ONE;
        for p in 1..=total_periods {
            let year_idx = (year_of_period(p, coupons_per_year) - 1) as usize;
            let period_rate = yearly_period_rates[year_idx];
            cumulative = cumulative.checked_mul(Decimal::ONE + period_rate).ok_or_else(|| {
                BondError::invalid_input(
                    "inflation_series",
                    format!("Cumulative indexation factor overflowed at period {p}."),
                )
            })?;
            annual_rates.push(annual_series[year_idx]);
            period_rates.push(period_rate);
            factors.push(cumulative);
        }

        Ok(Self {
            annual_rates,
            period_rates,
            factors,
        })
    }

    pub fn total_periods(&self) -> u32 {
        self.period_rates.len() as u32
    }

    /// Stated annual inflation for the year containing `period`.
    pub fn annual_rate(&self, period: u32) -> Rate {
        self.lookup(&self.annual_rates, period)
    }

    /// Inflation applied over `period` alone.
    pub fn period_rate(&self, period: u32) -> Rate {
        self.lookup(&self.period_rates, period)
    }

    /// Cumulative indexation factor through `period` (1 at issuance).
    pub fn factor(&self, period: u32) -> Decimal {
        self.factors
            .get(period as usize)
            .copied()
            .unwrap_or_else(|| self.factors[self.factors.len() - 1])
    }

    /// Nominal principal restated in period money.
    pub fn index(&self, nominal: Money, period: u32) -> BondResult<Money> {
        nominal.checked_mul(self.factor(period)).ok_or_else(|| {
            BondError::invalid_input(
                "nominal_value",
                format!("Indexed principal overflowed at period {period}."),
            )
        })
    }

    fn lookup(&self, values: &[Rate], period: u32) -> Rate {
        if period == 0 {
            return Decimal::ZERO;
        }
        values
            .get(period as usize - 1)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_disabled_factor_is_one() {
        let idx = InflationIndexer::new(
            &[dec!(0.10), dec!(0.05)],
            false,
            CouponFrequency::Semiannual,
            DayCountBasis::Days360,
        )
        .unwrap();
        assert_eq!(idx.total_periods(), 4);
        for p in 0..=4 {
            assert_eq!(idx.factor(p), Decimal::ONE);
            assert_eq!(idx.period_rate(p), Decimal::ZERO);
        }
        assert_eq!(idx.annual_rate(3), dec!(0.05));
    }

    #[test]
    fn test_annual_frequency_factor_matches_compounding() {
        let idx = InflationIndexer::new(
            &[dec!(0.10), dec!(0.05)],
            true,
            CouponFrequency::Annual,
            DayCountBasis::Days360,
        )
        .unwrap();
        assert_eq!(idx.factor(1), dec!(1.10));
        assert_eq!(idx.factor(2), dec!(1.155));
        assert_eq!(idx.index(dec!(1000), 2).unwrap(), dec!(1155));
    }

    #[test]
    fn test_semiannual_full_year_recovers_annual_rate() {
        let idx = InflationIndexer::new(
            &[dec!(0.10)],
            true,
            CouponFrequency::Semiannual,
            DayCountBasis::Days360,
        )
        .unwrap();
        assert!(idx.period_rate(1) > dec!(0.0488) && idx.period_rate(1) < dec!(0.0489));
        assert!((idx.factor(2) - dec!(1.10)).abs() < dec!(0.000000001));
    }

    #[test]
    fn test_period_rates_follow_year() {
        let idx = InflationIndexer::new(
            &[dec!(0.02), dec!(0.08)],
            true,
            CouponFrequency::Quarterly,
            DayCountBasis::Days360,
        )
        .unwrap();
        assert_eq!(idx.annual_rate(4), dec!(0.02));
        assert_eq!(idx.annual_rate(5), dec!(0.08));
        assert!(idx.period_rate(5) > idx.period_rate(4));
    }

    #[test]
    fn test_runaway_inflation_is_an_error() {
        let err = InflationIndexer::new(
            &[dec!(9); 30],
            true,
            CouponFrequency::Monthly,
            DayCountBasis::Days360,
        )
        .unwrap_err();
        assert!(matches!(err, BondError::InvalidInput { ref field, .. } if field == "inflation_series"));
        assert!(err.to_string().contains("period"));
    }

    #[test]
    fn test_index_overflow_is_an_error() {
        let idx = InflationIndexer::new(
            &[dec!(9); 27],
            true,
            CouponFrequency::Annual,
            DayCountBasis::Days360,
        )
        .unwrap();
        assert!(idx.index(dec!(1000), 26).is_err());
        assert!(idx.index(Decimal::ONE, 26).is_ok());
    }

    #[test]
    fn test_rejects_total_deflation() {
        let err = InflationIndexer::new(
            &[dec!(-1)],
            true,
            CouponFrequency::Annual,
            DayCountBasis::Days360,
        )
        .unwrap_err();
        assert!(matches!(err, BondError::InvalidInput { .. }));
    }
}
