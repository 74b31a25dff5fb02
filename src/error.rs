// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy shared by every chain adapter.
//!
//! Callers need to tell apart "the node could not be reached", "the node said
//! no", "we could not parse what the node said" and "the chain data describes
//! something that is not a valid transfer". Each of those is a distinct
//! variant here; [`ChainError::is_semantic`] and [`ChainError::is_decode`]
//! group them for callers that only care about the class.

/// Errors that can occur while observing or moving funds on a chain.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Network failure or a malformed response envelope.
    #[error("Transport error calling {method}: {message}")]
    Transport { method: String, message: String },

    /// The node answered with an explicit error payload.
    #[error("RPC error from {method}: {message}")]
    Rpc { method: String, message: String },

    /// Well-formed RPC output that could not be decoded (numbers, ABI words).
    #[error("Decode error: {0}")]
    Decode(String),

    /// An address that failed codec conversion.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The requested currency (or asset id / contract) is not registered.
    #[error("Currency not found: {0}")]
    CurrencyNotFound(String),

    /// Chain data that does not describe a valid transfer.
    #[error("Invalid transaction {tx_hash}: {reason}")]
    InvalidTransaction { tx_hash: String, reason: String },

    /// The node rejected a broadcast.
    #[error("Broadcast rejected: {0}")]
    BroadcastRejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid settings detected while building an adapter.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ChainError {
    pub fn transport(method: &str, message: impl ToString) -> Self {
        Self::Transport {
            method: method.to_string(),
            message: message.to_string(),
        }
    }

    pub fn rpc(method: &str, message: impl ToString) -> Self {
        Self::Rpc {
            method: method.to_string(),
            message: message.to_string(),
        }
    }

    pub fn invalid_transaction(tx_hash: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTransaction {
            tx_hash: tx_hash.into(),
            reason: reason.into(),
        }
    }

    /// Chain data was read correctly but does not describe a usable transfer.
    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            ChainError::InvalidTransaction { .. } | ChainError::CurrencyNotFound(_)
        )
    }

    /// The node answered but the answer could not be interpreted.
    pub fn is_decode(&self) -> bool {
        matches!(self, ChainError::Decode(_) | ChainError::InvalidAddress(_))
    }
}

pub type ChainResult<T> = Result<T, ChainError>;
