use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BondError;

/// Grace classification of a coupon period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraceType {
    #[default]
    #[serde(alias = "S", alias = "s")]
    None,
    #[serde(alias = "P", alias = "p")]
    Partial,
    #[serde(alias = "T", alias = "t")]
    Total,
}

/// What a grace classification means for one period's cash flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraceTreatment {
    /// Scheduled principal repayment happens this period.
    pub amortizes: bool,
    /// Interest is paid out as a cash coupon.
    pub interest_paid: bool,
    /// Unpaid interest is added to the outstanding principal.
    pub interest_capitalizes: bool,
}

impl GraceType {
    pub fn treatment(self) -> GraceTreatment {
        match self {
            GraceType::None => GraceTreatment {
                amortizes: true,
                interest_paid: true,
                interest_capitalizes: false,
            },
            GraceType::Partial => GraceTreatment {
                amortizes: false,
                interest_paid: true,
                interest_capitalizes: false,
            },
            GraceType::Total => GraceTreatment {
                amortizes: false,
                interest_paid: false,
                interest_capitalizes: true,
            },
        }
    }

    /// Single-letter code used by spreadsheet exports.
    pub fn code(self) -> &'static str {
        match self {
            GraceType::None => "S",
            GraceType::Partial => "P",
            GraceType::Total => "T",
        }
    }
}

impl fmt::Display for GraceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for GraceType {
    type Err = BondError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "none" => Ok(GraceType::None),
            "p" | "partial" => Ok(GraceType::Partial),
            "t" | "total" => Ok(GraceType::Total),
            _ => Err(BondError::invalid_input(
                "grace_series",
                format!("Unrecognized grace code '{s}' (expected S, P or T)."),
            )),
        }
    }
}

/// Year (1-based) of the term that coupon period `period` falls in.
pub fn year_of_period(period: u32, coupons_per_year: u32) -> u32 {
    if period == 0 || coupons_per_year == 0 {
        return 0;
    }
    (period - 1) / coupons_per_year + 1
}

/// Grace type in force for `period` given the per-year series.
pub fn grace_for_period(
    grace_series: &[GraceType],
    period: u32,
    coupons_per_year: u32,
) -> Option<GraceType> {
    let year = year_of_period(period, coupons_per_year);
    if year == 0 {
        return None;
    }
    grace_series.get(year as usize - 1).copied()
}
