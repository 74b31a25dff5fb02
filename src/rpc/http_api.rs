// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! java-tron HTTP API: `POST {uri}/{method}` with the parameters as body.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{http_client, split_credentials, RpcTransport};
use crate::error::{ChainError, ChainResult};

#[derive(Debug)]
pub struct TronHttpApi {
    http: reqwest::Client,
    base_url: String,
}

impl TronHttpApi {
    pub fn new(uri: &str, timeout: Duration) -> ChainResult<Self> {
        let (url, credentials) = split_credentials(uri)?;
        if credentials.is_some() {
            return Err(ChainError::Config(
                "TRON node URI must not embed credentials".to_string(),
            ));
        }
        Ok(Self {
            http: http_client(timeout)?,
            base_url: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method.trim_start_matches('/'))
    }
}

#[async_trait]
impl RpcTransport for TronHttpApi {
    async fn call(&self, method: &str, params: Value) -> ChainResult<Value> {
        let body = if params.is_null() {
            Value::Object(Default::default())
        } else {
            params
        };

        let response = self
            .http
            .post(self.endpoint(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::transport(method, format!("POST failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::transport(method, format!("returned {status}: {body}")));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ChainError::transport(method, format!("invalid JSON: {e}")))?;

        check_error(method, value)
    }
}

/// The node signals failures with a top-level `Error` string and a 200 status.
fn check_error(method: &str, value: Value) -> ChainResult<Value> {
    match value.get("Error") {
        Some(Value::String(message)) => Err(ChainError::rpc(method, message)),
        Some(other) if !other.is_null() => Err(ChainError::rpc(method, other)),
        _ => Ok(value),
    }
}
