use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use american_bond_core::rates::{self, Capitalization, CouponFrequency, DayCountBasis, RateType};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FrequencyArg {
    Monthly,
    Bimonthly,
    Quarterly,
    FourMonthly,
    Semiannual,
    Annual,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CapitalizationArg {
    Daily,
    Biweekly,
    Monthly,
    Bimonthly,
    Quarterly,
    FourMonthly,
    Semiannual,
    Annual,
}

impl From<FrequencyArg> for CouponFrequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Monthly => CouponFrequency::Monthly,
            FrequencyArg::Bimonthly => CouponFrequency::Bimonthly,
            FrequencyArg::Quarterly => CouponFrequency::Quarterly,
            FrequencyArg::FourMonthly => CouponFrequency::FourMonthly,
            FrequencyArg::Semiannual => CouponFrequency::Semiannual,
            FrequencyArg::Annual => CouponFrequency::Annual,
        }
    }
}

impl From<CapitalizationArg> for Capitalization {
    fn from(arg: CapitalizationArg) -> Self {
        match arg {
            CapitalizationArg::Daily => Capitalization::Daily,
            CapitalizationArg::Biweekly => Capitalization::Biweekly,
            CapitalizationArg::Monthly => Capitalization::Monthly,
            CapitalizationArg::Bimonthly => Capitalization::Bimonthly,
            CapitalizationArg::Quarterly => Capitalization::Quarterly,
            CapitalizationArg::FourMonthly => Capitalization::FourMonthly,
            CapitalizationArg::Semiannual => Capitalization::Semiannual,
            CapitalizationArg::Annual => Capitalization::Annual,
        }
    }
}

/// Arguments for converting a quoted annual rate to a coupon-period rate
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct PeriodRateArgs {
    /// Quoted annual rate (e.g. 0.08 for 8%)
    #[arg(long)]
    pub annual_rate: Decimal,

    /// Capitalization of a nominal quote; omit for an effective rate
    #[arg(long, value_enum)]
    pub capitalization: Option<CapitalizationArg>,

    /// Coupon frequency
    #[arg(long, value_enum, default_value = "semiannual")]
    pub frequency: FrequencyArg,

    /// Day-count basis (360 or 365)
    #[arg(long, default_value_t = 360)]
    pub basis: u32,
}

pub fn run_period_rate(args: PeriodRateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let basis = DayCountBasis::try_from(args.basis)?;
    let rate_type = match args.capitalization {
        Some(c) => RateType::Nominal {
            capitalization: c.into(),
        },
        None => RateType::Effective,
    };
    let frequency: CouponFrequency = args.frequency.into();

    let annual_effective = rates::annual_effective_rate(args.annual_rate, rate_type, basis)?;
    let period_rate = rates::coupon_period_rate(args.annual_rate, rate_type, basis, frequency)?;
    let periods_per_year = rates::periods_per_year(basis, frequency.days())?;

    Ok(serde_json::json!({
        "result": {
            "period_rate": period_rate,
            "annual_effective_rate": annual_effective,
            "periods_per_year": periods_per_year,
            "period_days": frequency.days(),
        }
    }))
}
