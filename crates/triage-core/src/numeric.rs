//! Decimal coercion and half-up rounding.
//!
//! Policy documents arrive as parsed JSON/YAML values, where fractional
//! numbers are binary doubles. Converting them through their shortest textual
//! form keeps `2.345` as exactly `2.345`, so midpoint rounding behaves the
//! same way a human reading the policy file would expect.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::error::{PlanError, Result};

/// Decimal places kept on `final_minutes`.
pub const MINUTES_DP: u32 = 2;

/// Decimal places kept on `priority_score`.
pub const PRIORITY_DP: u32 = 3;

/// Round to `places` decimal places; exact midpoints round away from zero.
pub fn round_half_up(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Coerce a document value into a [`Decimal`].
///
/// Integers convert exactly, floats go through their shortest round-trip
/// text, and numeric strings are parsed. Anything else is rejected with the
/// document `path` for context. Real numbers that `Decimal` cannot hold
/// (too large, or more than 28 fractional digits) are reported as
/// [`PlanError::OutOfRange`] rather than as non-numbers.
pub fn coerce_decimal(value: &Value, path: &str) -> Result<Decimal> {
    let text = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Decimal::from(i));
            }
            if let Some(u) = n.as_u64() {
                return Ok(Decimal::from(u));
            }
            n.to_string()
        }
        Value::String(s) => s.trim().to_string(),
        _ => return Err(invalid_number(value, path)),
    };

    if let Some(parsed) = parse_decimal(&text) {
        return Ok(parsed);
    }
    if text.parse::<f64>().is_ok_and(f64::is_finite) {
        return Err(PlanError::OutOfRange {
            path: path.to_string(),
            value: value.to_string(),
        });
    }
    Err(invalid_number(value, path))
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn invalid_number(value: &Value, path: &str) -> PlanError {
    PlanError::InvalidNumber {
        path: path.to_string(),
        value: value.to_string(),
    }
}
