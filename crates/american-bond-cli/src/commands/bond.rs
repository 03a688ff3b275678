use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;
use tracing::info;

use american_bond_core::batch::{self, DEFAULT_MAX_CONCURRENCY};
use american_bond_core::bond::{BondTerms, CostStructure};
use american_bond_core::schedule;
use american_bond_core::types::with_metadata;
use american_bond_core::valuation::{self, BondValuationInput};

use crate::input;

/// Arguments for a full bond valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ValueArgs {
    /// Path to JSON input file (terms, costs, discount rates)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the issuer's annual cost of capital
    #[arg(long)]
    pub issuer_rate: Option<Decimal>,

    /// Override the investor's annual required return (COK)
    #[arg(long)]
    pub investor_rate: Option<Decimal>,
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let mut valuation_input: BondValuationInput = input::read_input(args.input.as_deref(), "bond valuation")?;
    if let Some(rate) = args.issuer_rate {
        valuation_input.issuer_discount_rate = rate;
    }
    if let Some(rate) = args.investor_rate {
        valuation_input.investor_discount_rate = rate;
    }
    let result = valuation::value_bond(&valuation_input)?;
    info!(
        source = input::source_name(args.input.as_deref()),
        bond_id = ?valuation_input.bond_id,
        elapsed_us = start.elapsed().as_micros() as u64,
        "valued bond"
    );
    Ok(serde_json::to_value(result)?)
}

/// Terms and costs only; no discounting.
#[derive(Deserialize)]
struct ScheduleInput {
    terms: BondTerms,
    #[serde(default)]
    costs: CostStructure,
}

/// Arguments for schedule generation
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON input file with `terms` and optional `costs`
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let schedule_input: ScheduleInput = input::read_input(args.input.as_deref(), "schedule generation")?;
    let rows = schedule::generate_schedule(&schedule_input.terms, &schedule_input.costs)?;
    info!(
        source = input::source_name(args.input.as_deref()),
        periods = rows.len() - 1,
        "generated schedule"
    );
    let assumptions = serde_json::json!({
        "amortization": "American (bullet)",
        "coupon_frequency": schedule_input.terms.coupon_frequency,
        "inflation_indexed": schedule_input.terms.inflation_indexed,
    });
    let output = with_metadata(
        "American-method cash-flow schedule",
        &assumptions,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        serde_json::json!({ "schedule": rows }),
    );
    Ok(serde_json::to_value(output)?)
}

/// Arguments for batch valuation
#[derive(Args)]
pub struct BatchArgs {
    /// Path to a JSON array of valuation inputs
    #[arg(long)]
    pub input: Option<String>,

    /// Maximum number of bonds valued concurrently
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,
}

pub fn run_batch(args: BatchArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let inputs: Vec<BondValuationInput> = input::read_input(args.input.as_deref(), "batch valuation")?;
    info!(
        source = input::source_name(args.input.as_deref()),
        bonds = inputs.len(),
        max_concurrency = args.max_concurrency,
        "starting batch"
    );
    let result = batch::value_batch(&inputs, args.max_concurrency)?;
    info!(
        succeeded = result.succeeded,
        failed = result.failed,
        elapsed_us = start.elapsed().as_micros() as u64,
        "batch finished"
    );
    Ok(serde_json::to_value(result)?)
}
