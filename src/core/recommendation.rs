//! Buy/sell signal derived from intrinsic value against market price.
use crate::core::error::{ValuationError, ensure_finite};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Discrete signals ordered from most bullish to most bearish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    WeakHold,
    Sell,
}

impl Recommendation {
    /// Upper-case wire name, e.g. `STRONG_BUY`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "STRONG_BUY",
            Recommendation::Buy => "BUY",
            Recommendation::Hold => "HOLD",
            Recommendation::WeakHold => "WEAK_HOLD",
            Recommendation::Sell => "SELL",
        }
    }

    /// Lower-case form of [`Recommendation::as_str`], e.g. `strong_buy`.
    pub fn signal(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fractional upside of `intrinsic_value` over `current_price`.
pub fn upside(intrinsic_value: f64, current_price: f64) -> Result<f64, ValuationError> {
    ensure_finite("intrinsic_value", intrinsic_value)?;
    ensure_finite("current_price", current_price)?;
    if current_price <= 0.0 {
        return Err(ValuationError::degenerate("current_price", current_price));
    }
    Ok((intrinsic_value - current_price) / current_price)
}

/// Upside as a percentage with one decimal, `0.12345` becomes `12.3`.
pub fn upside_percent(intrinsic_value: f64, current_price: f64) -> Result<f64, ValuationError> {
    let upside = upside(intrinsic_value, current_price)?;
    Ok(super::valuation::round_half_up(upside * 1000.0) / 10.0)
}

/// Maps the unrounded upside to a [`Recommendation`].
///
/// The checks run top to bottom: SELL is only reached once HOLD has failed,
/// which leaves `-0.25 <= upside < -0.10` as WEAK_HOLD.
pub fn classify(intrinsic_value: f64, current_price: f64) -> Result<Recommendation, ValuationError> {
    let upside = upside(intrinsic_value, current_price)?;

    let recommendation = if upside >= 0.30 {
        Recommendation::StrongBuy
    } else if upside >= 0.15 {
        Recommendation::Buy
    } else if upside >= -0.10 {
        Recommendation::Hold
    } else if upside < -0.25 {
        Recommendation::Sell
    } else {
        Recommendation::WeakHold
    };
    Ok(recommendation)
}
