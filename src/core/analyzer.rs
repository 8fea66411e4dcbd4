//! Runs the full analysis pipeline: fetch, value, classify, persist.
use crate::core::analysis::{
    Analysis, AnalysisStore, AnalysisSummary, DEFAULT_RETENTION_DAYS, DcfSummary,
    FinancialsSnapshot,
};
use crate::core::assumptions::{AssumptionOverrides, CapmParams};
use crate::core::error::AnalyzeError;
use crate::core::financials::{FinancialsProvider, MILLION};
use crate::core::recommendation::{Recommendation, classify, upside_percent};
use crate::core::valuation::{self, Assumptions};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default number of analyses returned by [`Analyzer::history`].
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationBlock {
    pub intrinsic_value: f64,
    pub upside: f64,
    pub recommendation: Recommendation,
    pub signal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcfBlock {
    pub enterprise_value: f64,
    pub equity_value: f64,
    #[serde(rename = "pvFcf5Year")]
    pub pv_fcf_5_year: f64,
    pub pv_terminal_value: f64,
    pub terminal_value: f64,
    pub fcf_projections: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialsBlock {
    #[serde(rename = "revenueLTM")]
    pub revenue_ltm: f64,
    pub operating_margin: f64,
    pub beta: f64,
    pub market_cap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub ticker: String,
    pub company_name: String,
    pub current_price: f64,
    pub valuation: ValuationBlock,
    pub dcf: DcfBlock,
    pub assumptions: Assumptions,
    pub financials: FinancialsBlock,
}

/// What a caller gets back from [`Analyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub analysis_id: String,
    pub data: ReportData,
}

/// Accepts letters, digits and the punctuation used by exchange suffixes
/// (`BRK.B`, `^GSPC`, `EURUSD=X`, `RDS-A`).
pub fn normalize_ticker(ticker: &str) -> Result<String, AnalyzeError> {
    let trimmed = ticker.trim();
    let valid = !trimmed.is_empty()
        && trimmed.len() <= 16
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if !valid {
        return Err(AnalyzeError::InvalidTicker(ticker.to_string()));
    }
    Ok(trimmed.to_uppercase())
}

pub struct Analyzer {
    provider: Arc<dyn FinancialsProvider>,
    store: Arc<dyn AnalysisStore>,
    capm: CapmParams,
    retention: Duration,
}

impl Analyzer {
    pub fn new(provider: Arc<dyn FinancialsProvider>, store: Arc<dyn AnalysisStore>) -> Self {
        Self {
            provider,
            store,
            capm: CapmParams::default(),
            retention: Duration::days(DEFAULT_RETENTION_DAYS),
        }
    }

    pub fn with_capm(mut self, capm: CapmParams) -> Self {
        self.capm = capm;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    #[instrument(name = "Analyze", skip(self, overrides), fields(ticker = %ticker))]
    pub async fn analyze(
        &self,
        ticker: &str,
        overrides: Option<&AssumptionOverrides>,
    ) -> Result<AnalysisReport, AnalyzeError> {
        let ticker = normalize_ticker(ticker)?;

        let financials = self
            .provider
            .fetch_financials(&ticker)
            .await
            .map_err(|source| AnalyzeError::Fetch {
                ticker: ticker.clone(),
                source,
            })?;
        debug!(?financials, "Fetched financials");

        let mut assumptions = self.capm.default_assumptions(financials.beta);
        if let Some(overrides) = overrides {
            assumptions = overrides.apply(assumptions);
        }

        let result = valuation::calculate(&financials.to_inputs(), &assumptions)?;
        let recommendation = classify(result.intrinsic_value, financials.current_price)?;
        let upside = upside_percent(result.intrinsic_value, financials.current_price)?;
        info!(
            intrinsic_value = result.intrinsic_value,
            upside,
            %recommendation,
            "Valuation complete"
        );

        let analysis = Analysis {
            id: uuid::Uuid::new_v4().to_string(),
            ticker: ticker.clone(),
            company_name: financials.company_name.clone(),
            current_price: financials.current_price,
            dcf_analysis: DcfSummary {
                intrinsic_value: result.intrinsic_value,
                upside,
                recommendation,
                enterprise_value: result.enterprise_value,
                equity_value: result.equity_value,
                pv_fcf_5_year: result.pv_fcf_5_year,
                pv_terminal_value: result.pv_terminal_value,
            },
            assumptions,
            financials: FinancialsSnapshot {
                revenue_ltm: financials.revenue / MILLION,
                ebit_ltm: financials.operating_income / MILLION,
                operating_margin: assumptions.operating_margin,
                market_cap: financials.market_cap / MILLION,
                beta: financials.beta,
            },
            analysis_date: Utc::now(),
            saved: false,
        };
        self.store
            .insert(&analysis)
            .await
            .map_err(AnalyzeError::Store)?;

        Ok(AnalysisReport {
            analysis_id: analysis.id,
            data: ReportData {
                ticker,
                company_name: financials.company_name,
                current_price: financials.current_price,
                valuation: ValuationBlock {
                    intrinsic_value: result.intrinsic_value,
                    upside,
                    recommendation,
                    signal: recommendation.signal(),
                },
                dcf: DcfBlock {
                    enterprise_value: result.enterprise_value,
                    equity_value: result.equity_value,
                    pv_fcf_5_year: result.pv_fcf_5_year,
                    pv_terminal_value: result.pv_terminal_value,
                    terminal_value: result.terminal_value,
                    fcf_projections: result.fcf_projections,
                },
                assumptions,
                financials: FinancialsBlock {
                    revenue_ltm: financials.revenue / MILLION,
                    operating_margin: assumptions.operating_margin,
                    beta: financials.beta,
                    market_cap: financials.market_cap / MILLION,
                },
            },
        })
    }

    /// Recent analyses, newest first, after dropping expired ones.
    pub async fn history(&self, limit: usize) -> Result<Vec<AnalysisSummary>, AnalyzeError> {
        if let Err(e) = self.purge().await {
            warn!(error = %e, "Failed to purge expired analyses");
        }
        let analyses = self.store.recent(limit).await.map_err(AnalyzeError::Store)?;
        Ok(analyses.iter().map(Analysis::summary).collect())
    }

    pub async fn save(&self, id: &str) -> Result<Option<Analysis>, AnalyzeError> {
        self.store.mark_saved(id).await.map_err(AnalyzeError::Store)
    }

    pub async fn delete(&self, id: &str) -> Result<bool, AnalyzeError> {
        self.store.delete(id).await.map_err(AnalyzeError::Store)
    }

    pub async fn purge(&self) -> Result<usize, AnalyzeError> {
        let purged = self
            .store
            .purge_expired(Utc::now(), self.retention)
            .await
            .map_err(AnalyzeError::Store)?;
        if purged > 0 {
            info!(purged, "Purged expired analyses");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::fixtures;
    use crate::core::error::ValuationError;
    use crate::core::financials::CompanyFinancials;
    use crate::store::memory::MemoryAnalysisStore;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;

    struct StaticProvider {
        financials: CompanyFinancials,
    }

    #[async_trait]
    impl FinancialsProvider for StaticProvider {
        async fn fetch_financials(&self, ticker: &str) -> Result<CompanyFinancials> {
            if ticker == "AAPL" {
                Ok(self.financials.clone())
            } else {
                Err(anyhow!("No data found for ticker {}", ticker))
            }
        }
    }

    fn example_financials() -> CompanyFinancials {
        CompanyFinancials {
            company_name: "Apple Inc.".to_string(),
            current_price: 150.0,
            market_cap: 150_000_000_000.0,
            shares_outstanding: 1_000_000_000.0,
            beta: 1.0,
            total_debt: 5_000_000_000.0,
            total_cash: 2_000_000_000.0,
            revenue: 100_000_000_000.0,
            operating_income: 15_000_000_000.0,
            net_income: 11_000_000_000.0,
        }
    }

    fn analyzer_with(financials: CompanyFinancials) -> (Analyzer, Arc<MemoryAnalysisStore>) {
        let store = Arc::new(MemoryAnalysisStore::new());
        let analyzer = Analyzer::new(Arc::new(StaticProvider { financials }), store.clone());
        (analyzer, store)
    }

    fn reference_overrides() -> AssumptionOverrides {
        AssumptionOverrides {
            wacc: Some(0.08),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_analyze_reference_company() {
        let (analyzer, store) = analyzer_with(example_financials());

        let report = analyzer
            .analyze(" aapl ", Some(&reference_overrides()))
            .await
            .unwrap();

        assert_eq!(report.data.ticker, "AAPL");
        assert_eq!(report.data.valuation.intrinsic_value, 199.01);
        assert_eq!(report.data.valuation.upside, 32.7);
        assert_eq!(report.data.valuation.recommendation, Recommendation::StrongBuy);
        assert_eq!(report.data.valuation.signal, "strong_buy");
        assert_eq!(report.data.dcf.enterprise_value, 202015.0);
        assert_eq!(report.data.financials.revenue_ltm, 100_000.0);
        assert_eq!(report.data.assumptions.wacc, 0.08);

        let stored = store.get(&report.analysis_id).await.unwrap().unwrap();
        assert_eq!(stored.ticker, "AAPL");
        assert_eq!(stored.financials.ebit_ltm, 15_000.0);
        assert!(!stored.saved);
    }

    #[tokio::test]
    async fn test_analyze_uses_beta_for_default_wacc() {
        let (analyzer, _) = analyzer_with(CompanyFinancials {
            beta: 1.5,
            ..example_financials()
        });

        let report = analyzer.analyze("AAPL", None).await.unwrap();
        assert_eq!(
            report.data.assumptions.wacc,
            CapmParams::default().wacc(1.5)
        );
    }

    #[tokio::test]
    async fn test_analyze_rejects_invalid_ticker() {
        let (analyzer, _) = analyzer_with(example_financials());
        for ticker in ["", "   ", "AA PL", "<script>"] {
            assert!(matches!(
                analyzer.analyze(ticker, None).await,
                Err(AnalyzeError::InvalidTicker(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_analyze_surfaces_fetch_errors() {
        let (analyzer, store) = analyzer_with(example_financials());
        let err = analyzer.analyze("MSFT", None).await.unwrap_err();
        assert!(matches!(err, AnalyzeError::Fetch { .. }));
        assert!(err.to_string().contains("No data found for ticker MSFT"));
        assert!(store.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_zero_price_is_degenerate() {
        let (analyzer, store) = analyzer_with(CompanyFinancials {
            current_price: 0.0,
            ..example_financials()
        });
        let err = analyzer.analyze("AAPL", None).await.unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::Valuation(ValuationError::DivisionDegenerate {
                what: "current_price",
                ..
            })
        ));
        assert!(store.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_degenerate_override() {
        let (analyzer, _) = analyzer_with(example_financials());
        let overrides = AssumptionOverrides {
            wacc: Some(0.03),
            terminal_growth: Some(0.03),
            ..Default::default()
        };
        assert!(matches!(
            analyzer.analyze("AAPL", Some(&overrides)).await,
            Err(AnalyzeError::Valuation(
                ValuationError::DivisionDegenerate { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_history_save_and_delete() {
        let (analyzer, store) = analyzer_with(example_financials());
        let first = analyzer.analyze("AAPL", None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = analyzer.analyze("AAPL", None).await.unwrap();

        let history = analyzer.history(DEFAULT_HISTORY_LIMIT).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.analysis_id);

        let saved = analyzer.save(&first.analysis_id).await.unwrap().unwrap();
        assert!(saved.saved);
        assert!(analyzer.save("missing").await.unwrap().is_none());

        assert!(analyzer.delete(&second.analysis_id).await.unwrap());
        assert!(!analyzer.delete(&second.analysis_id).await.unwrap());
        assert_eq!(store.recent(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_history_purges_expired_unsaved() {
        let (analyzer, store) = analyzer_with(example_financials());
        let old = fixtures::analysis("OLD", Utc::now() - Duration::days(45));
        let mut kept = fixtures::analysis("KEPT", Utc::now() - Duration::days(45));
        kept.saved = true;
        store.insert(&old).await.unwrap();
        store.insert(&kept).await.unwrap();

        let history = analyzer.history(DEFAULT_HISTORY_LIMIT).await.unwrap();
        let tickers: Vec<_> = history.iter().map(|s| s.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["KEPT"]);
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker("brk.b").unwrap(), "BRK.B");
        assert_eq!(normalize_ticker("^gspc").unwrap(), "^GSPC");
        assert!(normalize_ticker("A/B").is_err());
    }
}
