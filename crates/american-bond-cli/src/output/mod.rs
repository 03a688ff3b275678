pub mod csv_out;
pub mod minimal;
pub mod table;

use american_bond_core::types::round_half_up;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::OutputFormat;

/// Decimal places shown by the human-facing formatters.
pub(crate) const DISPLAY_DP: u32 = 6;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Pretty-print JSON to stdout.
fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

/// Columns shown for each schedule row in table and CSV output.
pub(crate) const SCHEDULE_COLUMNS: &[&str] = &[
    "period",
    "date",
    "grace",
    "period_inflation",
    "bond_principal",
    "indexed_principal",
    "coupon",
    "amortization",
    "installment",
    "premium",
    "tax_shield",
    "issuer_flow",
    "issuer_flow_with_shield",
    "investor_flow",
    "discounted_flow",
    "time_weighted_flow",
    "convexity_factor",
];

/// Columns summarising one batch item.
pub(crate) const BATCH_COLUMNS: &[&str] = &[
    "index",
    "status",
    "bond_id",
    "current_price",
    "issuer_tcea",
    "investor_trea",
    "macaulay_duration",
    "error",
];

/// Flatten a batch item into `BATCH_COLUMNS` order.
pub(crate) fn batch_row(item: &Value) -> Vec<Value> {
    let output = item.get("output").and_then(|o| o.get("result"));
    let metrics = output.and_then(|r| r.get("metrics"));
    BATCH_COLUMNS
        .iter()
        .map(|col| match *col {
            "index" | "status" => item.get(*col).cloned().unwrap_or(Value::Null),
            "bond_id" => item
                .get("bond_id")
                .or_else(|| output.and_then(|r| r.get("bond_id")))
                .cloned()
                .unwrap_or(Value::Null),
            "error" => item.get("message").cloned().unwrap_or(Value::Null),
            metric => metrics
                .and_then(|m| m.get(metric))
                .cloned()
                .unwrap_or(Value::Null),
        })
        .collect()
}

/// As [`format_value`], with decimal strings rounded half-up to
/// [`DISPLAY_DP`] places. CSV and JSON keep full precision.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => match s.parse::<Decimal>() {
            Ok(d) => round_half_up(d, DISPLAY_DP).normalize().to_string(),
            Err(_) => s.clone(),
        },
        Value::Array(arr) => arr.iter().map(display_value).collect::<Vec<_>>().join(", "),
        other => format_value(other),
    }
}

pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
