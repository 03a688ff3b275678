//! Bounded, best-effort batch valuation.
//!
//! Each bond is valued independently on a dedicated rayon pool. A failure is
//! recorded against its item and never aborts the rest of the batch.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BondError, ErrorKind};
use crate::types::ComputationOutput;
use crate::valuation::{value_bond, BondValuationInput, BondValuationOutput};
use crate::BondResult;

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of one item, in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchItem {
    Valued {
        index: usize,
        output: ComputationOutput<BondValuationOutput>,
    },
    Failed {
        index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        bond_id: Option<String>,
        kind: ErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItem>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Value every input with at most `max_concurrency` worker threads.
pub fn value_batch(inputs: &[BondValuationInput], max_concurrency: usize) -> BondResult<BatchOutput> {
    if max_concurrency == 0 {
        return Err(BondError::invalid_input(
            "max_concurrency",
            "At least one worker is required.",
        ));
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(max_concurrency)
        .build()
        .map_err(|e| BondError::invalid_input("max_concurrency", e.to_string()))?;

    let results: Vec<BatchItem> = pool.install(|| {
        inputs
            .par_iter()
            .enumerate()
            .map(|(index, input)| value_item(index, input))
            .collect()
    });

    let failed = results
        .iter()
        .filter(|r| matches!(r, BatchItem::Failed { .. }))
        .count();
    let succeeded = results.len() - failed;
    info!(succeeded, failed, "batch valuation finished");

    Ok(BatchOutput {
        succeeded,
        failed,
        results,
    })
}

/// Value one item, turning both errors and panics into `Failed`.
fn value_item(index: usize, input: &BondValuationInput) -> BatchItem {
    let (kind, message) = match panic::catch_unwind(AssertUnwindSafe(|| value_bond(input))) {
        Ok(Ok(output)) => return BatchItem::Valued { index, output },
        Ok(Err(e)) => (e.kind(), e.to_string()),
        Err(payload) => (ErrorKind::Internal, panic_message(payload.as_ref())),
    };
    warn!(index, bond_id = ?input.bond_id, error = %message, "bond valuation failed");
    BatchItem::Failed {
        index,
        bond_id: input.bond_id.clone(),
        kind,
        message,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("Internal error: valuation panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::{BondTerms, CostStructure};
    use crate::grace::GraceType;
    use crate::rates::{CouponFrequency, DayCountBasis, RateType};
    use crate::solver::SolverConfig;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn input(id: &str, years: u32) -> BondValuationInput {
        BondValuationInput {
            bond_id: Some(id.into()),
            terms: BondTerms {
                nominal_value: dec!(1000),
                commercial_value: dec!(990),
                term_years: years,
                coupon_frequency: CouponFrequency::Quarterly,
                day_count_basis: DayCountBasis::Days360,
                rate_type: RateType::Effective,
                annual_rate: dec!(0.07),
                issuance_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                premium_pct: Decimal::ZERO,
                income_tax_rate: dec!(0.295),
                inflation_indexed: false,
                inflation_series: vec![Decimal::ZERO; years as usize],
                grace_series: vec![GraceType::None; years as usize],
            },
            costs: CostStructure::default(),
            issuer_discount_rate: dec!(0.08),
            investor_discount_rate: dec!(0.06),
            solver: SolverConfig::default(),
        }
    }

    #[test]
    fn test_partial_success_keeps_order() {
        let mut broken = input("B", 3);
        broken.terms.grace_series.pop();
        let inputs = vec![input("A", 2), broken, input("C", 4)];

        let out = value_batch(&inputs, 2).unwrap();
        assert_eq!(out.succeeded, 2);
        assert_eq!(out.failed, 1);
        assert!(matches!(out.results[0], BatchItem::Valued { index: 0, .. }));
        match &out.results[1] {
            BatchItem::Failed { index, bond_id, kind, .. } => {
                assert_eq!(*index, 1);
                assert_eq!(bond_id.as_deref(), Some("B"));
                assert_eq!(*kind, ErrorKind::InvalidInput);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(matches!(out.results[2], BatchItem::Valued { index: 2, .. }));
    }

    #[test]
    fn test_extreme_bond_does_not_sink_the_batch() {
        let mut deep = input("DEEP", 30);
        deep.terms.coupon_frequency = CouponFrequency::Monthly;
        deep.investor_discount_rate = dec!(-0.9);
        let inputs = vec![input("A", 2), deep, input("C", 3)];

        let out = value_batch(&inputs, 2).unwrap();
        assert_eq!(out.succeeded, 2);
        assert_eq!(out.failed, 1);
        assert!(matches!(out.results[0], BatchItem::Valued { index: 0, .. }));
        assert!(matches!(
            out.results[1],
            BatchItem::Failed { index: 1, kind: ErrorKind::InvalidRate, .. }
        ));
        assert!(matches!(out.results[2], BatchItem::Valued { index: 2, .. }));
    }

    #[test]
    fn test_panic_payload_becomes_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "Internal error: valuation panicked: boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert!(panic_message(payload.as_ref()).ends_with("owned"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(value_batch(&[], 0).is_err());
    }

    #[test]
    fn test_empty_batch() {
        let out = value_batch(&[], DEFAULT_MAX_CONCURRENCY).unwrap();
        assert_eq!(out.succeeded, 0);
        assert!(out.results.is_empty());
    }
}
