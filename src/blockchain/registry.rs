// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-adapter currency partition: one native asset, any number of tokens.

use crate::error::{ChainError, ChainResult};
use crate::models::Currency;

/// Currencies configured on one adapter, validated once at construction.
#[derive(Debug, Clone)]
pub struct CurrencyRegistry {
    native: Currency,
    tokens: Vec<Currency>,
}

impl CurrencyRegistry {
    /// Partition `currencies`. Exactly one must be native and ids must be
    /// unique.
    pub fn new(currencies: Vec<Currency>) -> ChainResult<Self> {
        let mut native: Option<Currency> = None;
        let mut tokens = Vec::new();

        for currency in currencies {
            let duplicate = native.iter().chain(tokens.iter()).any(|c| c.id == currency.id);
            if duplicate {
                return Err(ChainError::Config(format!(
                    "Currency {} configured twice",
                    currency.id
                )));
            }

            if currency.is_native() {
                if let Some(existing) = &native {
                    return Err(ChainError::Config(format!(
                        "Two native currencies configured: {} and {}",
                        existing.id, currency.id
                    )));
                }
                native = Some(currency);
            } else {
                tokens.push(currency);
            }
        }

        let native = native
            .ok_or_else(|| ChainError::Config("No native currency configured".to_string()))?;
        Ok(Self { native, tokens })
    }

    pub fn native(&self) -> &Currency {
        &self.native
    }

    pub fn tokens(&self) -> &[Currency] {
        &self.tokens
    }

    /// Look up any configured currency by id.
    pub fn get(&self, id: &str) -> ChainResult<&Currency> {
        std::iter::once(&self.native)
            .chain(self.tokens.iter())
            .find(|c| c.id == id)
            .ok_or_else(|| ChainError::CurrencyNotFound(id.to_string()))
    }
}
