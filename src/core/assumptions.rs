//! Default valuation assumptions and user overrides.
use crate::core::valuation::Assumptions;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.045;
pub const DEFAULT_MARKET_RISK_PREMIUM: f64 = 0.08;
pub const DEFAULT_BETA: f64 = 1.0;

const EQUITY_WEIGHT: f64 = 0.7;
const DEBT_WEIGHT: f64 = 0.3;
const PRE_TAX_COST_OF_DEBT: f64 = 0.05;
const DEBT_TAX_SHIELD: f64 = 0.75;
const WACC_FLOOR: f64 = 0.06;

/// Inputs to the capital asset pricing model used for the default WACC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapmParams {
    pub risk_free_rate: f64,
    pub market_risk_premium: f64,
}

impl Default for CapmParams {
    fn default() -> Self {
        CapmParams {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            market_risk_premium: DEFAULT_MARKET_RISK_PREMIUM,
        }
    }
}

impl CapmParams {
    pub fn cost_of_equity(&self, beta: f64) -> f64 {
        self.risk_free_rate + beta * self.market_risk_premium
    }

    /// Simplified 70/30 equity/debt blend, floored at 6%.
    pub fn wacc(&self, beta: f64) -> f64 {
        let wacc = self.cost_of_equity(beta) * EQUITY_WEIGHT
            + PRE_TAX_COST_OF_DEBT * DEBT_WEIGHT * DEBT_TAX_SHIELD;
        wacc.max(WACC_FLOOR)
    }

    pub fn default_assumptions(&self, beta: f64) -> Assumptions {
        Assumptions {
            revenue_growth: 0.10,
            terminal_growth: 0.03,
            operating_margin: 0.15,
            tax_rate: 0.25,
            capex_pct: 0.05,
            nwc_pct: 0.02,
            wacc: self.wacc(beta),
        }
    }
}

/// Partial [`Assumptions`]; present fields replace the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumptionOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_growth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_growth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capex_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nwc_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wacc: Option<f64>,
}

impl AssumptionOverrides {
    pub fn is_empty(&self) -> bool {
        *self == AssumptionOverrides::default()
    }

    pub fn apply(&self, base: Assumptions) -> Assumptions {
        Assumptions {
            revenue_growth: self.revenue_growth.unwrap_or(base.revenue_growth),
            terminal_growth: self.terminal_growth.unwrap_or(base.terminal_growth),
            operating_margin: self.operating_margin.unwrap_or(base.operating_margin),
            tax_rate: self.tax_rate.unwrap_or(base.tax_rate),
            capex_pct: self.capex_pct.unwrap_or(base.capex_pct),
            nwc_pct: self.nwc_pct.unwrap_or(base.nwc_pct),
            wacc: self.wacc.unwrap_or(base.wacc),
        }
    }
}
