use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BondError;
use crate::grace::GraceType;
use crate::rates::{periods_per_year, CouponFrequency, DayCountBasis, RateType};
use crate::types::{Money, Rate};
use crate::BondResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Issuance terms of an American-method bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondTerms {
    /// Face value repaid at maturity (before indexation)
    pub nominal_value: Money,
    /// Price paid by the investor at issuance
    pub commercial_value: Money,
    /// Term in whole years
    pub term_years: u32,
    pub coupon_frequency: CouponFrequency,
    #[serde(default)]
    pub day_count_basis: DayCountBasis,
    pub rate_type: RateType,
    /// Quoted annual coupon rate as a decimal
    pub annual_rate: Rate,
    pub issuance_date: NaiveDate,
    /// Redemption premium as a fraction of the final indexed principal
    #[serde(default)]
    pub premium_pct: Rate,
    #[serde(default)]
    pub income_tax_rate: Rate,
    #[serde(default)]
    pub inflation_indexed: bool,
    /// Annual inflation, one entry per year of term
    pub inflation_series: Vec<Rate>,
    /// Grace classification, one entry per year of term
    pub grace_series: Vec<GraceType>,
}

/// Issuance costs as fractions of the commercial value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostStructure {
    #[serde(default)]
    pub structuring_pct: Rate,
    #[serde(default)]
    pub placement_pct: Rate,
    /// Flotation cost borne by the issuer
    #[serde(default)]
    pub issuer_flotation_pct: Rate,
    /// Settlement (clearing house) cost borne by the issuer
    #[serde(default)]
    pub issuer_settlement_pct: Rate,
    #[serde(default)]
    pub investor_flotation_pct: Rate,
    #[serde(default)]
    pub investor_settlement_pct: Rate,
}

/// Absolute cost amounts at issuance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostTotals {
    pub issuer: Money,
    pub investor: Money,
    pub combined: Money,
}

// ---------------------------------------------------------------------------
// Derived quantities
// ---------------------------------------------------------------------------

impl BondTerms {
    /// Coupon dates per calendar year of term.
    pub fn coupons_per_year(&self) -> u32 {
        self.coupon_frequency.coupons_per_year()
    }

    /// Number of coupon periods, excluding issuance.
    pub fn total_periods(&self) -> u32 {
        self.term_years * self.coupons_per_year()
    }

    /// Coupon periods per year under the day-count basis, used for every
    /// rate conversion and time weighting.
    pub fn periods_per_year(&self) -> BondResult<Decimal> {
        periods_per_year(self.day_count_basis, self.coupon_frequency.days())
    }

    /// Scheduled date of coupon `period`.
    pub fn period_date(&self, period: u32) -> BondResult<NaiveDate> {
        let days = u64::from(period) * u64::from(self.coupon_frequency.days());
        self.issuance_date
            .checked_add_days(chrono::Days::new(days))
            .ok_or_else(|| {
                BondError::invalid_input(
                    "issuance_date",
                    format!("Coupon date for period {period} is out of range."),
                )
            })
    }

    /// Reject malformed terms. Nothing is defaulted or repaired here.
    pub fn validate(&self) -> BondResult<()> {
        if self.nominal_value <= Decimal::ZERO {
            return Err(BondError::invalid_input(
                "nominal_value",
                "Nominal value must be positive.",
            ));
        }
        if self.commercial_value <= Decimal::ZERO {
            return Err(BondError::invalid_input(
                "commercial_value",
                "Commercial value must be positive.",
            ));
        }
        if self.term_years == 0 {
            return Err(BondError::invalid_input(
                "term_years",
                "Term must be at least one year.",
            ));
        }
        if self.annual_rate < Decimal::ZERO {
            return Err(BondError::invalid_rate(
                "annual_rate",
                "Annual rate must be non-negative.",
            ));
        }
        if self.premium_pct < Decimal::ZERO {
            return Err(BondError::invalid_input(
                "premium_pct",
                "Premium must be non-negative.",
            ));
        }
        if self.income_tax_rate < Decimal::ZERO || self.income_tax_rate >= Decimal::ONE {
            return Err(BondError::invalid_input(
                "income_tax_rate",
                "Income tax rate must be in [0, 1).",
            ));
        }
        let expected = self.term_years as usize;
        if self.inflation_series.len() != expected {
            return Err(BondError::SeriesLengthMismatch {
                field: "inflation_series".into(),
                expected,
                actual: self.inflation_series.len(),
            });
        }
        if self.grace_series.len() != expected {
            return Err(BondError::SeriesLengthMismatch {
                field: "grace_series".into(),
                expected,
                actual: self.grace_series.len(),
            });
        }
        Ok(())
    }
}

impl CostStructure {
    pub fn issuer_pct(&self) -> Rate {
        self.structuring_pct + self.placement_pct + self.issuer_flotation_pct + self.issuer_settlement_pct
    }

    pub fn investor_pct(&self) -> Rate {
        self.investor_flotation_pct + self.investor_settlement_pct
    }

    pub fn validate(&self) -> BondResult<()> {
        let fields = [
            ("structuring_pct", self.structuring_pct),
            ("placement_pct", self.placement_pct),
            ("issuer_flotation_pct", self.issuer_flotation_pct),
            ("issuer_settlement_pct", self.issuer_settlement_pct),
            ("investor_flotation_pct", self.investor_flotation_pct),
            ("investor_settlement_pct", self.investor_settlement_pct),
        ];
        for (field, value) in fields {
            if value < Decimal::ZERO || value >= Decimal::ONE {
                return Err(BondError::invalid_input(
                    field,
                    "Cost percentage must be in [0, 1).",
                ));
            }
        }
        Ok(())
    }

    pub fn totals(&self, commercial_value: Money) -> CostTotals {
        let issuer = self.issuer_pct() * commercial_value;
        let investor = self.investor_pct() * commercial_value;
        CostTotals {
            issuer,
            investor,
            combined: issuer + investor,
        }
    }
}
