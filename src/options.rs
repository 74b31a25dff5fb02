// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Layered resolution of transfer fee parameters.
//!
//! Effective parameters for a transfer come from three layers, applied in
//! order: engine defaults, currency-level configuration, then call-site
//! overrides. A later layer replaces an earlier one key by key; keys a layer
//! leaves unset fall through to whatever was resolved before it.

use serde::{Deserialize, Serialize};

/// Qualitative gas price tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasPriceRate {
    #[default]
    Standard,
    Fast,
}

impl GasPriceRate {
    /// Apply this tier to a node-suggested gas price.
    ///
    /// `fast` bids 10% above the suggestion. Integer arithmetic keeps the
    /// result deterministic.
    pub fn apply(self, suggested: u64) -> u64 {
        match self {
            GasPriceRate::Standard => suggested,
            GasPriceRate::Fast => suggested.saturating_add(suggested / 10),
        }
    }
}

/// Transfer cost parameters. Every key is optional so that a layer can leave
/// it unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeOptions {
    /// Ceiling on gas consumed (EVM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    /// Fixed gas price in native minor units (EVM). Unset means "ask the node".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_rate: Option<GasPriceRate>,
    /// Fee ceiling in native minor units (TRON).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_limit: Option<u64>,
}

impl FeeOptions {
    pub fn is_empty(&self) -> bool {
        *self == FeeOptions::default()
    }

    /// Overlay `other` on top of `self`: keys set in `other` win.
    pub fn overlay(self, other: &FeeOptions) -> FeeOptions {
        FeeOptions {
            gas_limit: other.gas_limit.or(self.gas_limit),
            gas_price: other.gas_price.or(self.gas_price),
            gas_rate: other.gas_rate.or(self.gas_rate),
            fee_limit: other.fee_limit.or(self.fee_limit),
        }
    }
}

/// Merge layers in order; later layers override earlier ones key by key.
pub fn resolve<'a, I>(layers: I) -> FeeOptions
where
    I: IntoIterator<Item = &'a FeeOptions>,
{
    layers
        .into_iter()
        .fold(FeeOptions::default(), |acc, layer| acc.overlay(layer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_override_key_by_key() {
        let defaults = FeeOptions {
            gas_limit: Some(1),
            gas_price: Some(2),
            ..Default::default()
        };
        let currency = FeeOptions {
            gas_price: Some(3),
            ..Default::default()
        };
        let call_site = FeeOptions::default();

        let merged = resolve([&defaults, &currency, &call_site]);
        assert_eq!(merged.gas_limit, Some(1));
        assert_eq!(merged.gas_price, Some(3));
        assert_eq!(merged.gas_rate, None);
        assert_eq!(merged.fee_limit, None);
    }

    #[test]
    fn unset_override_keeps_prior_values() {
        let defaults = FeeOptions {
            gas_limit: Some(21_000),
            gas_rate: Some(GasPriceRate::Fast),
            fee_limit: Some(1_000_000),
            ..Default::default()
        };
        let merged = resolve([&defaults, &FeeOptions::default()]);
        assert_eq!(merged, defaults);
    }

    #[test]
    fn empty_layer_list_resolves_to_nothing() {
        assert!(resolve(std::iter::empty()).is_empty());
    }

    #[test]
    fn fast_rate_bids_above_suggestion() {
        assert_eq!(GasPriceRate::Standard.apply(20_000_000_000), 20_000_000_000);
        assert_eq!(GasPriceRate::Fast.apply(20_000_000_000), 22_000_000_000);
        assert_eq!(GasPriceRate::Fast.apply(u64::MAX), u64::MAX);
        let near_max = u64::MAX - 5;
        assert!(GasPriceRate::Fast.apply(near_max) >= GasPriceRate::Standard.apply(near_max));
    }

    #[test]
    fn deserializes_from_flat_option_keys() {
        let opts: FeeOptions =
            serde_json::from_str(r#"{"gas_limit": 90000, "gas_rate": "fast"}"#).unwrap();
        assert_eq!(opts.gas_limit, Some(90_000));
        assert_eq!(opts.gas_rate, Some(GasPriceRate::Fast));
        assert_eq!(opts.gas_price, None);
    }
}
