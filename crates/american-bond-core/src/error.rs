use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BondError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Series length mismatch: {field} has {actual} entries, expected {expected} (one per year of term)")]
    SeriesLengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid rate: {field} — {reason}")]
    InvalidRate { field: String, reason: String },

    #[error("Invalid schedule at period {period}: {reason}")]
    InvalidSchedule { period: u32, reason: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    Convergence {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Bond {bond_id}: {source}")]
    Bond {
        bond_id: String,
        #[source]
        source: Box<BondError>,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse error taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    InvalidRate,
    InvalidSchedule,
    Convergence,
    Internal,
}

impl BondError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BondError::InvalidInput { .. } | BondError::SeriesLengthMismatch { .. } => {
                ErrorKind::InvalidInput
            }
            BondError::InvalidRate { .. } => ErrorKind::InvalidRate,
            BondError::InvalidSchedule { .. } => ErrorKind::InvalidSchedule,
            BondError::Convergence { .. } => ErrorKind::Convergence,
            BondError::Bond { source, .. } => source.kind(),
            BondError::DivisionByZero { .. } | BondError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Attach the caller-supplied bond identifier. Already-tagged errors are
    /// left untouched.
    pub fn with_bond_id(self, bond_id: Option<&str>) -> Self {
        match (bond_id, self) {
            (_, tagged @ BondError::Bond { .. }) => tagged,
            (Some(id), err) => BondError::Bond {
                bond_id: id.to_string(),
                source: Box::new(err),
            },
            (None, err) => err,
        }
    }

    pub(crate) fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        BondError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_rate(field: &str, reason: impl Into<String>) -> Self {
        BondError::InvalidRate {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for BondError {
    fn from(e: serde_json::Error) -> Self {
        BondError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_mismatch_is_invalid_input() {
        let err = BondError::SeriesLengthMismatch {
            field: "grace_series".into(),
            expected: 5,
            actual: 4,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_bond_context_preserves_kind() {
        let err = BondError::InvalidSchedule {
            period: 10,
            reason: "final period is in grace".into(),
        }
        .with_bond_id(Some("BOND-7"));
        assert_eq!(err.kind(), ErrorKind::InvalidSchedule);
        let msg = err.to_string();
        assert!(msg.contains("BOND-7"));
        assert!(msg.contains("period 10"));
    }

    #[test]
    fn test_with_bond_id_is_idempotent() {
        let err = BondError::invalid_input("nominal_value", "must be positive")
            .with_bond_id(Some("A"))
            .with_bond_id(Some("B"));
        match err {
            BondError::Bond { bond_id, .. } => assert_eq!(bond_id, "A"),
            other => panic!("expected Bond wrapper, got {other:?}"),
        }
    }
}
