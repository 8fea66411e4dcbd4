//! Persisted analysis records and the store they live in.
use crate::core::recommendation::Recommendation;
use crate::core::valuation::Assumptions;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Unsaved analyses older than this are purged.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Valuation outcome as stored with an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcfSummary {
    pub intrinsic_value: f64,
    /// Percentage with one decimal.
    pub upside: f64,
    pub recommendation: Recommendation,
    pub enterprise_value: f64,
    pub equity_value: f64,
    #[serde(rename = "pvFcf5Year")]
    pub pv_fcf_5_year: f64,
    pub pv_terminal_value: f64,
}

/// Fundamentals snapshot in millions, kept for later reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialsSnapshot {
    #[serde(rename = "revenueLTM")]
    pub revenue_ltm: f64,
    #[serde(rename = "ebitLTM")]
    pub ebit_ltm: f64,
    pub operating_margin: f64,
    pub market_cap: f64,
    pub beta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: String,
    pub ticker: String,
    pub company_name: String,
    pub current_price: f64,
    pub dcf_analysis: DcfSummary,
    pub assumptions: Assumptions,
    pub financials: FinancialsSnapshot,
    pub analysis_date: DateTime<Utc>,
    #[serde(default)]
    pub saved: bool,
}

impl Analysis {
    /// Whether retention applies: only unsaved analyses ever expire.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        !self.saved && now - self.analysis_date >= retention
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            id: self.id.clone(),
            ticker: self.ticker.clone(),
            company_name: self.company_name.clone(),
            current_price: self.current_price,
            intrinsic_value: self.dcf_analysis.intrinsic_value,
            recommendation: self.dcf_analysis.recommendation,
            analysis_date: self.analysis_date,
            saved: self.saved,
        }
    }
}

/// Projection of [`Analysis`] used for history listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub id: String,
    pub ticker: String,
    pub company_name: String,
    pub current_price: f64,
    pub intrinsic_value: f64,
    pub recommendation: Recommendation,
    pub analysis_date: DateTime<Utc>,
    pub saved: bool,
}

/// Sorts newest first and keeps at most `limit` entries.
pub(crate) fn newest_first(mut analyses: Vec<Analysis>, limit: usize) -> Vec<Analysis> {
    analyses.sort_by(|a, b| b.analysis_date.cmp(&a.analysis_date));
    analyses.truncate(limit);
    analyses
}

#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn insert(&self, analysis: &Analysis) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Analysis>>;
    /// Most recent analyses first.
    async fn recent(&self, limit: usize) -> Result<Vec<Analysis>>;
    /// Marks an analysis as saved, returning the updated record if it exists.
    async fn mark_saved(&self, id: &str) -> Result<Option<Analysis>>;
    /// Returns whether a record was removed.
    async fn delete(&self, id: &str) -> Result<bool>;
    /// Removes unsaved analyses older than `retention`, returning how many.
    async fn purge_expired(&self, now: DateTime<Utc>, retention: Duration) -> Result<usize>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::core::assumptions::CapmParams;

    pub fn analysis(ticker: &str, analysis_date: DateTime<Utc>) -> Analysis {
        Analysis {
            id: uuid::Uuid::new_v4().to_string(),
            ticker: ticker.to_string(),
            company_name: format!("{ticker} Inc."),
            current_price: 150.0,
            dcf_analysis: DcfSummary {
                intrinsic_value: 199.01,
                upside: 32.7,
                recommendation: Recommendation::StrongBuy,
                enterprise_value: 202015.0,
                equity_value: 199015.0,
                pv_fcf_5_year: 38314.0,
                pv_terminal_value: 163700.0,
            },
            assumptions: CapmParams::default().default_assumptions(1.0),
            financials: FinancialsSnapshot {
                revenue_ltm: 100_000.0,
                ebit_ltm: 15_000.0,
                operating_margin: 0.15,
                market_cap: 150_000.0,
                beta: 1.0,
            },
            analysis_date,
            saved: false,
        }
    }
}
