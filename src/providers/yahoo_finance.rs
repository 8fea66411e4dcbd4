use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::with_retry;
use crate::core::config::YahooProviderConfig;
use crate::core::financials::{CompanyFinancials, FinancialsProvider};

const QUOTE_SUMMARY_MODULES: &str =
    "price,summaryDetail,financialData,defaultKeyStatistics,incomeStatementHistory";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Fetches fundamentals from the Yahoo Finance `quoteSummary` endpoint.
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl YahooFinanceProvider {
    pub fn new(config: &YahooProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(YahooFinanceProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummary,
}

#[derive(Deserialize, Debug)]
struct QuoteSummary {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryItem>>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`, or `{}` when absent.
#[derive(Deserialize, Debug)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw)
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryItem {
    price: Option<PriceModule>,
    summary_detail: Option<SummaryDetailModule>,
    financial_data: Option<FinancialDataModule>,
    default_key_statistics: Option<KeyStatisticsModule>,
    income_statement_history: Option<IncomeStatementHistoryModule>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    regular_market_price: Option<RawValue>,
    long_name: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SummaryDetailModule {
    market_cap: Option<RawValue>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct FinancialDataModule {
    total_debt: Option<RawValue>,
    total_cash: Option<RawValue>,
}

#[derive(Deserialize, Debug)]
struct KeyStatisticsModule {
    beta: Option<RawValue>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct IncomeStatementHistoryModule {
    #[serde(default)]
    income_statement_history: Vec<IncomeStatement>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct IncomeStatement {
    total_revenue: Option<RawValue>,
    operating_income: Option<RawValue>,
    net_income: Option<RawValue>,
}

/// Missing figures become zero, except beta (1.0, also used when reported
/// as zero) and the company name (the ticker). Shares outstanding are implied from market cap and price.
fn to_company_financials(ticker: &str, item: &QuoteSummaryItem) -> CompanyFinancials {
    let current_price = item
        .price
        .as_ref()
        .and_then(|p| raw(&p.regular_market_price))
        .unwrap_or(0.0);
    let market_cap = item
        .summary_detail
        .as_ref()
        .and_then(|s| raw(&s.market_cap))
        .unwrap_or(0.0);
    let price_divisor = if current_price != 0.0 { current_price } else { 1.0 };
    let latest_statement = item
        .income_statement_history
        .as_ref()
        .and_then(|h| h.income_statement_history.first());

    CompanyFinancials {
        company_name: item
            .price
            .as_ref()
            .and_then(|p| p.long_name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ticker.to_string()),
        current_price,
        market_cap,
        shares_outstanding: market_cap / price_divisor,
        beta: item
            .default_key_statistics
            .as_ref()
            .and_then(|k| raw(&k.beta))
            .filter(|beta| *beta != 0.0)
            .unwrap_or(1.0),
        total_debt: item
            .financial_data
            .as_ref()
            .and_then(|f| raw(&f.total_debt))
            .unwrap_or(0.0),
        total_cash: item
            .financial_data
            .as_ref()
            .and_then(|f| raw(&f.total_cash))
            .unwrap_or(0.0),
        revenue: latest_statement
            .and_then(|s| raw(&s.total_revenue))
            .unwrap_or(0.0),
        operating_income: latest_statement
            .and_then(|s| raw(&s.operating_income))
            .unwrap_or(0.0),
        net_income: latest_statement
            .and_then(|s| raw(&s.net_income))
            .unwrap_or(0.0),
    }
}

#[async_trait]
impl FinancialsProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooFinancialsFetch",
        skip(self),
        fields(ticker = %ticker)
    )]
    async fn fetch_financials(&self, ticker: &str) -> Result<CompanyFinancials> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules={}",
            self.base_url, ticker, QUOTE_SUMMARY_MODULES
        );
        debug!("Requesting financial data from {}", url);

        let response = with_retry(
            || self.client.get(&url).send(),
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for ticker: {} URL: {}", e, ticker, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for ticker: {}",
                response.status(),
                ticker
            ));
        }

        let text = response.text().await?;
        let data: QuoteSummaryResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", ticker, e))?;

        let item = data
            .quote_summary
            .result
            .as_ref()
            .and_then(|result| result.first())
            .ok_or_else(|| anyhow!("No data found for ticker {}", ticker))?;

        Ok(to_company_financials(ticker, item))
    }
}
