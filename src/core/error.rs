//! Error types shared by the valuation core and the analysis pipeline.

use thiserror::Error;

/// Errors produced by the valuation formula and the recommendation classifier.
///
/// Both variants are deterministic functions of the input: the caller can
/// recover by supplying corrected values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValuationError {
    /// A denominator that must be strictly positive was zero or negative.
    #[error("degenerate division: {what} must be strictly positive, got {value}")]
    DivisionDegenerate { what: &'static str, value: f64 },

    /// A required numeric field was non-finite or had the wrong sign.
    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl ValuationError {
    pub(crate) fn degenerate(what: &'static str, value: f64) -> Self {
        ValuationError::DivisionDegenerate { what, value }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ValuationError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

/// Rejects NaN and infinities for the named field.
pub(crate) fn ensure_finite(field: &'static str, value: f64) -> Result<(), ValuationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValuationError::invalid(
            field,
            format!("expected a finite number, got {value}"),
        ))
    }
}

/// Errors surfaced by [`crate::core::analyzer::Analyzer`].
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Invalid ticker: {0:?}")]
    InvalidTicker(String),

    #[error(transparent)]
    Valuation(#[from] ValuationError),

    #[error("Failed to fetch financial data for {ticker}: {source}")]
    Fetch {
        ticker: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Analysis store error: {0}")]
    Store(#[source] anyhow::Error),
}
