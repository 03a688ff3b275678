//! Rate basis conversions.
//!
//! Every conversion uses effective (compound) arithmetic. Period counts per
//! year are derived from the day-count basis and the period length in days,
//! so a semiannual coupon on a 365-day basis has `365 / 180` periods per
//! year when annualizing, even though the schedule still has two coupons
//! per calendar year.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::error::BondError;
use crate::types::Rate;
use crate::BondResult;

// ---------------------------------------------------------------------------
// Periodicity types
// ---------------------------------------------------------------------------

/// Coupon payment frequency. Periods are measured in 30-day months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponFrequency {
    Monthly,
    Bimonthly,
    Quarterly,
    FourMonthly,
    Semiannual,
    Annual,
}

impl CouponFrequency {
    /// Length of one coupon period in days.
    pub fn days(self) -> u32 {
        match self {
            CouponFrequency::Monthly => 30,
            CouponFrequency::Bimonthly => 60,
            CouponFrequency::Quarterly => 90,
            CouponFrequency::FourMonthly => 120,
            CouponFrequency::Semiannual => 180,
            CouponFrequency::Annual => 360,
        }
    }

    /// Number of coupon dates per calendar year of term.
    pub fn coupons_per_year(self) -> u32 {
        360 / self.days()
    }
}

/// Capitalization periodicity of a nominal rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capitalization {
    Daily,
    Biweekly,
    Monthly,
    Bimonthly,
    Quarterly,
    FourMonthly,
    Semiannual,
    Annual,
}

impl Capitalization {
    pub fn days(self) -> u32 {
        match self {
            Capitalization::Daily => 1,
            Capitalization::Biweekly => 15,
            Capitalization::Monthly => 30,
            Capitalization::Bimonthly => 60,
            Capitalization::Quarterly => 90,
            Capitalization::FourMonthly => 120,
            Capitalization::Semiannual => 180,
            Capitalization::Annual => 360,
        }
    }
}

/// Days-per-year convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DayCountBasis {
    #[default]
    Days360,
    Days365,
}

impl DayCountBasis {
    pub fn days(self) -> u32 {
        match self {
            DayCountBasis::Days360 => 360,
            DayCountBasis::Days365 => 365,
        }
    }
}

impl TryFrom<u32> for DayCountBasis {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            360 => Ok(DayCountBasis::Days360),
            365 => Ok(DayCountBasis::Days365),
            other => Err(format!("day count basis must be 360 or 365, got {other}")),
        }
    }
}

impl From<DayCountBasis> for u32 {
    fn from(basis: DayCountBasis) -> u32 {
        basis.days()
    }
}

/// How the quoted annual rate compounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateType {
    Effective,
    Nominal { capitalization: Capitalization },
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Periods per year for a period of `period_days` under `basis`.
pub fn periods_per_year(basis: DayCountBasis, period_days: u32) -> BondResult<Decimal> {
    if period_days == 0 {
        return Err(BondError::invalid_rate(
            "period_days",
            "Period length must be positive.",
        ));
    }
    Ok(Decimal::from(basis.days()) / Decimal::from(period_days))
}

/// `(1 + j/m)^m - 1`
pub fn nominal_to_effective_annual(nominal: Rate, capitalizations_per_year: Decimal) -> BondResult<Rate> {
    if nominal < Decimal::ZERO {
        return Err(BondError::invalid_rate(
            "annual_rate",
            "Nominal rate must be non-negative.",
        ));
    }
    if capitalizations_per_year <= Decimal::ZERO {
        return Err(BondError::invalid_rate(
            "capitalization",
            "Capitalizations per year must be positive.",
        ));
    }
    let base = Decimal::ONE + nominal / capitalizations_per_year;
    Ok(compound(base, capitalizations_per_year, "nominal to effective")? - Decimal::ONE)
}

/// `(1 + TEA)^(1/f) - 1`. Accepts any annual rate above -100%, so it also
/// serves deflationary inflation prints and discount rates.
pub fn effective_annual_to_period(annual: Rate, periods_per_year: Decimal) -> BondResult<Rate> {
    if annual <= -Decimal::ONE {
        return Err(BondError::invalid_rate(
            "annual_rate",
            "Annual effective rate must be greater than -100%.",
        ));
    }
    if periods_per_year <= Decimal::ZERO {
        return Err(BondError::invalid_rate(
            "periods_per_year",
            "Coupon periods per year must be positive.",
        ));
    }
    let exponent = Decimal::ONE / periods_per_year;
    Ok(compound(Decimal::ONE + annual, exponent, "annual to period")? - Decimal::ONE)
}

/// `(1 + r)^f - 1`
pub fn period_to_effective_annual(period_rate: Rate, periods_per_year: Decimal) -> BondResult<Rate> {
    if period_rate <= -Decimal::ONE {
        return Err(BondError::invalid_rate(
            "period_rate",
            "Period rate must be greater than -100%.",
        ));
    }
    if periods_per_year <= Decimal::ZERO {
        return Err(BondError::invalid_rate(
            "periods_per_year",
            "Periods per year must be positive.",
        ));
    }
    Ok(compound(Decimal::ONE + period_rate, periods_per_year, "period to annual")? - Decimal::ONE)
}

/// Effective rate for one coupon period from a quoted annual rate.
///
/// `capitalizations_per_year` is `None` for effective quotes.
pub fn period_effective_rate(
    annual_rate: Rate,
    capitalizations_per_year: Option<Decimal>,
    coupon_periods_per_year: Decimal,
) -> BondResult<Rate> {
    if annual_rate < Decimal::ZERO {
        return Err(BondError::invalid_rate(
            "annual_rate",
            "Annual rate must be non-negative.",
        ));
    }
    let effective_annual = match capitalizations_per_year {
        Some(m) => nominal_to_effective_annual(annual_rate, m)?,
        None => annual_rate,
    };
    effective_annual_to_period(effective_annual, coupon_periods_per_year)
}

/// Effective annual rate implied by a quote under the given basis.
pub fn annual_effective_rate(
    annual_rate: Rate,
    rate_type: RateType,
    basis: DayCountBasis,
) -> BondResult<Rate> {
    if annual_rate < Decimal::ZERO {
        return Err(BondError::invalid_rate(
            "annual_rate",
            "Annual rate must be non-negative.",
        ));
    }
    match rate_type {
        RateType::Effective => Ok(annual_rate),
        RateType::Nominal { capitalization } => {
            let m = periods_per_year(basis, capitalization.days())?;
            nominal_to_effective_annual(annual_rate, m)
        }
    }
}

/// Convenience wrapper over [`period_effective_rate`] for bond terms.
pub fn coupon_period_rate(
    annual_rate: Rate,
    rate_type: RateType,
    basis: DayCountBasis,
    frequency: CouponFrequency,
) -> BondResult<Rate> {
    let capitalizations = match rate_type {
        RateType::Effective => None,
        RateType::Nominal { capitalization } => {
            Some(periods_per_year(basis, capitalization.days())?)
        }
    };
    let f = periods_per_year(basis, frequency.days())?;
    period_effective_rate(annual_rate, capitalizations, f)
}

/// `base^exponent`, exact for integral exponents.
pub(crate) fn compound(base: Decimal, exponent: Decimal, context: &str) -> BondResult<Decimal> {
    let result = if exponent.fract().is_zero() {
        exponent.to_i64().and_then(|n| base.checked_powi(n))
    } else {
        base.checked_powd(exponent)
    };
    result.ok_or_else(|| BondError::invalid_rate(context, "Compounding overflowed decimal range."))
}
