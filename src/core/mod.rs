//! Core business logic: the valuation model and the pipeline around it

pub mod analysis;
pub mod analyzer;
pub mod assumptions;
pub mod cache;
pub mod config;
pub mod error;
pub mod financials;
pub mod log;
pub mod recommendation;
pub mod valuation;

// Re-export main types for cleaner imports
pub use analysis::{Analysis, AnalysisStore, AnalysisSummary};
pub use analyzer::{AnalysisReport, Analyzer};
pub use assumptions::{AssumptionOverrides, CapmParams};
pub use cache::Cache;
pub use error::{AnalyzeError, ValuationError};
pub use financials::{CompanyFinancials, FinancialsProvider};
pub use recommendation::{Recommendation, classify, upside_percent};
pub use valuation::{Assumptions, FinancialInputs, ValuationResult, calculate};
