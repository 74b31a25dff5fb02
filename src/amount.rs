// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversion between minor-unit integers and canonical decimal amounts.
//!
//! Every amount that crosses the public interfaces is a [`BigDecimal`] in
//! human units (`1.5` BTC, `0.1` USDT). Chains speak minor units (satoshi,
//! wei, sun). Conversion happens here, once, at the adapter boundary.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Deserializer};

use crate::error::ChainError;

/// Convert a minor-unit integer into a decimal amount.
///
/// `from_minor_units(100000, 6)` is `0.1`.
pub fn from_minor_units(units: &BigInt, subunits: u32) -> BigDecimal {
    BigDecimal::new(units.clone(), i64::from(subunits))
}

pub fn from_minor_units_u64(units: u64, subunits: u32) -> BigDecimal {
    from_minor_units(&BigInt::from(units), subunits)
}

/// Convert a decimal amount into its minor-unit integer.
///
/// Fails on negative amounts and on amounts with more fractional digits than
/// the currency supports; rounding money silently is never acceptable.
pub fn to_minor_units(amount: &BigDecimal, subunits: u32) -> Result<BigInt, ChainError> {
    if amount.sign() == Sign::Minus {
        return Err(ChainError::Decode(format!("Negative amount: {amount}")));
    }

    // scale -n means "times 10^n"
    let scaled = amount * BigDecimal::new(BigInt::from(1u8), -i64::from(subunits));

    if !scaled.is_integer() {
        return Err(ChainError::Decode(format!(
            "Too many decimal places in {amount} (max {subunits})"
        )));
    }

    let (units, _) = scaled.with_scale(0).into_bigint_and_exponent();
    Ok(units)
}

/// Parse a decimal from its textual representation.
pub fn parse_decimal(raw: &str) -> Result<BigDecimal, ChainError> {
    BigDecimal::from_str(raw.trim())
        .map_err(|e| ChainError::Decode(format!("Invalid decimal {raw:?}: {e}")))
}

/// Parse a big-endian hex quantity (`0x1a`, `1a`, `0x`) into an integer.
pub fn parse_hex_quantity(raw: &str) -> Result<BigInt, ChainError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    if digits.is_empty() {
        return Ok(BigInt::from(0u8));
    }
    BigInt::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| ChainError::Decode(format!("Invalid hex quantity {raw:?}")))
}

/// Deserialize a decimal from a JSON number or string without going through
/// binary floating point, so `0.4` stays exactly `0.4`.
pub fn deserialize_decimal<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(serde_json::Number),
        Text(String),
    }

    let text = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    };
    BigDecimal::from_str(&text).map_err(serde::de::Error::custom)
}
