//! American-method bond valuation.
//!
//! Turns issuance terms and a cost structure into a period-by-period
//! cash-flow schedule, then derives issuer and investor metrics from it:
//! price, NPV, TCEA/TREA, Macaulay and modified duration, and convexity.
//! All arithmetic is `rust_decimal::Decimal`; nothing here performs I/O or
//! holds global state.

pub mod bond;
pub mod error;
pub mod grace;
pub mod inflation;
pub mod metrics;
pub mod rates;
pub mod schedule;
pub mod solver;
pub mod time_value;
pub mod types;
pub mod valuation;

#[cfg(feature = "batch")]
pub mod batch;

pub use bond::{BondTerms, CostStructure, CostTotals};
pub use error::{BondError, ErrorKind};
pub use grace::GraceType;
pub use metrics::{compute_metrics, MetricsResult};
pub use rates::{Capitalization, CouponFrequency, DayCountBasis, RateType};
pub use schedule::{generate_schedule, CashFlowPeriod};
pub use solver::{solve_effective_rate, SolverConfig};
pub use types::*;
pub use valuation::{value_bond, BondValuationInput, BondValuationOutput};

/// Standard result type for all bond valuation operations
pub type BondResult<T> = Result<T, BondError>;
