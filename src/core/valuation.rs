//! Discounted cash flow valuation.
//!
//! [`calculate`] is a pure function: it projects free cash flow for five
//! years, adds a Gordon growth terminal value and discounts everything back
//! at the WACC. Monetary inputs and outputs share one unit scale, the
//! orchestrator uses millions.
use crate::core::error::{ValuationError, ensure_finite};
use serde::{Deserialize, Serialize};

/// Number of explicitly projected years.
pub const PROJECTION_YEARS: usize = 5;

/// Depreciation and amortization add-back as a fraction of revenue.
pub const DA_PCT: f64 = 0.03;

/// Valuation assumptions. Every field is a fraction, `0.10` means 10%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumptions {
    pub revenue_growth: f64,
    pub terminal_growth: f64,
    pub operating_margin: f64,
    pub tax_rate: f64,
    pub capex_pct: f64,
    pub nwc_pct: f64,
    pub wacc: f64,
}

impl Assumptions {
    pub fn validate(&self) -> Result<(), ValuationError> {
        ensure_finite("revenue_growth", self.revenue_growth)?;
        ensure_finite("terminal_growth", self.terminal_growth)?;
        ensure_finite("operating_margin", self.operating_margin)?;
        ensure_finite("tax_rate", self.tax_rate)?;
        ensure_finite("capex_pct", self.capex_pct)?;
        ensure_finite("nwc_pct", self.nwc_pct)?;
        ensure_finite("wacc", self.wacc)?;
        if self.wacc <= -1.0 {
            return Err(ValuationError::invalid(
                "wacc",
                format!("must be greater than -1, got {}", self.wacc),
            ));
        }

        let spread = self.wacc - self.terminal_growth;
        if spread <= 0.0 {
            return Err(ValuationError::degenerate("wacc - terminal_growth", spread));
        }
        Ok(())
    }
}

/// Company financials fed into the model, all in one monetary scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialInputs {
    #[serde(rename = "revenueLTM")]
    pub revenue_ltm: f64,
    pub shares_outstanding: f64,
    pub debt: f64,
    pub cash: f64,
}

impl FinancialInputs {
    pub fn validate(&self) -> Result<(), ValuationError> {
        for (field, value) in [
            ("revenue_ltm", self.revenue_ltm),
            ("shares_outstanding", self.shares_outstanding),
            ("debt", self.debt),
            ("cash", self.cash),
        ] {
            ensure_finite(field, value)?;
            if value < 0.0 {
                return Err(ValuationError::invalid(
                    field,
                    format!("must not be negative, got {value}"),
                ));
            }
        }

        if self.shares_outstanding == 0.0 {
            return Err(ValuationError::degenerate(
                "shares_outstanding",
                self.shares_outstanding,
            ));
        }
        Ok(())
    }
}

/// Output of [`calculate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    /// Per-share value, rounded to cents.
    pub intrinsic_value: f64,
    pub enterprise_value: f64,
    pub equity_value: f64,
    #[serde(rename = "pvFcf5Year")]
    pub pv_fcf_5_year: f64,
    pub pv_terminal_value: f64,
    /// Free cash flow for years 1 through 5.
    pub fcf_projections: Vec<f64>,
    /// Terminal value as of the end of year 5, undiscounted.
    pub terminal_value: f64,
}

/// Rounds halves towards positive infinity, so `-2.5` becomes `-2`.
pub fn round_half_up(value: f64) -> f64 {
    let rounded = value.round();
    if value - rounded == 0.5 {
        rounded + 1.0
    } else {
        rounded
    }
}

/// Rounds to a fixed number of decimal places using [`round_half_up`].
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    round_half_up(value * factor) / factor
}

fn discount_factor(wacc: f64, period: usize) -> f64 {
    1.0 / (1.0 + wacc).powf(period as f64)
}

/// Projects free cash flow for each of the [`PROJECTION_YEARS`], unrounded.
fn project_free_cash_flows(revenue_ltm: f64, assumptions: &Assumptions) -> Vec<f64> {
    let mut revenue = revenue_ltm;
    (0..PROJECTION_YEARS)
        .map(|_| {
            revenue *= 1.0 + assumptions.revenue_growth;
            let ebit = revenue * assumptions.operating_margin;
            let nopat = ebit * (1.0 - assumptions.tax_rate);
            let da = revenue * DA_PCT;
            let capex = revenue * assumptions.capex_pct;
            let nwc_change = revenue * assumptions.nwc_pct;
            nopat + da - capex - nwc_change
        })
        .collect()
}

/// Runs the DCF model.
///
/// Fails with [`ValuationError::DivisionDegenerate`] when `wacc` does not
/// exceed `terminal_growth` or shares outstanding is zero, and with
/// [`ValuationError::InvalidInput`] for non-finite or negative inputs.
pub fn calculate(
    financials: &FinancialInputs,
    assumptions: &Assumptions,
) -> Result<ValuationResult, ValuationError> {
    financials.validate()?;
    assumptions.validate()?;

    let fcf_projections = project_free_cash_flows(financials.revenue_ltm, assumptions);
    let final_fcf = fcf_projections[PROJECTION_YEARS - 1];

    let terminal_fcf = final_fcf * (1.0 + assumptions.terminal_growth);
    let terminal_value = terminal_fcf / (assumptions.wacc - assumptions.terminal_growth);

    let pv_fcf_5_year: f64 = fcf_projections
        .iter()
        .enumerate()
        .map(|(i, fcf)| fcf * discount_factor(assumptions.wacc, i + 1))
        .sum();
    let pv_terminal_value = terminal_value * discount_factor(assumptions.wacc, PROJECTION_YEARS);

    let enterprise_value = pv_fcf_5_year + pv_terminal_value;
    let equity_value = enterprise_value - financials.debt + financials.cash;
    let intrinsic_value = equity_value / financials.shares_outstanding;

    Ok(ValuationResult {
        intrinsic_value: round_to(intrinsic_value, 2),
        enterprise_value: round_half_up(enterprise_value),
        equity_value: round_half_up(equity_value),
        pv_fcf_5_year: round_half_up(pv_fcf_5_year),
        pv_terminal_value: round_half_up(pv_terminal_value),
        fcf_projections: fcf_projections.into_iter().map(round_half_up).collect(),
        terminal_value: round_half_up(terminal_value),
    })
}
