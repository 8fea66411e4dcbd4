//! Company fundamentals as reported by a market data provider.

use crate::core::valuation::FinancialInputs;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Scale used for every monetary figure handed to the valuation model.
pub const MILLION: f64 = 1_000_000.0;

/// Raw facts for a ticker, in whole currency units and whole shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyFinancials {
    pub company_name: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub shares_outstanding: f64,
    pub beta: f64,
    pub total_debt: f64,
    pub total_cash: f64,
    pub revenue: f64,
    pub operating_income: f64,
    pub net_income: f64,
}

impl CompanyFinancials {
    /// Normalizes to the model's scale: millions of currency, millions of shares.
    pub fn to_inputs(&self) -> FinancialInputs {
        FinancialInputs {
            revenue_ltm: self.revenue / MILLION,
            shares_outstanding: self.shares_outstanding / MILLION,
            debt: self.total_debt / MILLION,
            cash: self.total_cash / MILLION,
        }
    }
}

#[async_trait]
pub trait FinancialsProvider: Send + Sync {
    async fn fetch_financials(&self, ticker: &str) -> Result<CompanyFinancials>;
}
