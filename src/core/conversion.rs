//! Conversion of native currency amounts into the reference unit (USD).

use anyhow::anyhow;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

/// Rates at or above this magnitude are read as "units per 1 USD" when a
/// currency carries no explicit [`RateDirection`].
pub const INVERSE_RATE_THRESHOLD: Decimal = Decimal::TEN;

/// How a currency's stored exchange rate should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RateDirection {
    /// The rate is the value of 1 unit of the currency in USD.
    UsdPerUnit,
    /// The rate is how many units of the currency buy 1 USD.
    UnitsPerUsd,
}

impl RateDirection {
    /// Magnitude heuristic used for currencies stored without a direction.
    pub fn infer(rate: Decimal) -> Self {
        if rate >= INVERSE_RATE_THRESHOLD {
            RateDirection::UnitsPerUsd
        } else {
            RateDirection::UsdPerUnit
        }
    }

    fn apply(self, amount: Decimal, rate: Decimal) -> Option<Decimal> {
        match self {
            RateDirection::UsdPerUnit => amount.checked_mul(rate),
            RateDirection::UnitsPerUsd => amount.checked_div(rate),
        }
    }
}

impl Display for RateDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RateDirection::UsdPerUnit => "usd-per-unit",
                RateDirection::UnitsPerUsd => "units-per-usd",
            }
        )
    }
}

impl FromStr for RateDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usd-per-unit" | "usdperunit" => Ok(RateDirection::UsdPerUnit),
            "units-per-usd" | "unitsperusd" => Ok(RateDirection::UnitsPerUsd),
            _ => Err(anyhow!("Invalid rate direction: {}", s)),
        }
    }
}

/// Converts `amount` to the reference unit using the magnitude heuristic.
///
/// Non-positive rates contribute nothing.
pub fn to_reference_unit(amount: Decimal, rate: Decimal) -> Decimal {
    convert(amount, rate, None)
}

/// Converts `amount` to the reference unit. An explicit `direction` wins over
/// the magnitude heuristic.
pub fn convert(amount: Decimal, rate: Decimal, direction: Option<RateDirection>) -> Decimal {
    if rate <= Decimal::ZERO {
        debug!("Skipping conversion of {amount} at non-positive rate {rate}");
        return Decimal::ZERO;
    }

    let direction = direction.unwrap_or_else(|| RateDirection::infer(rate));
    match direction.apply(amount, rate) {
        Some(converted) => converted,
        None => {
            debug!("Conversion of {amount} at rate {rate} ({direction}) overflowed");
            Decimal::ZERO
        }
    }
}

/// Parses a decimal transmitted as text. Scientific notation is accepted;
/// `NaN`, infinities and garbage are not.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
        .map(|d| d.normalize())
}

/// Parses an exchange rate, rejecting anything that is not strictly positive.
pub fn parse_rate(raw: &str) -> Option<Decimal> {
    parse_decimal(raw).filter(|rate| *rate > Decimal::ZERO)
}
