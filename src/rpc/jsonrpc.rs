// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC 2.0 over HTTP (bitcoind, EVM execution clients).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{http_client, split_credentials, RpcTransport};
use crate::error::{ChainError, ChainResult};

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<Value>,
}

/// JSON-RPC 2.0 transport. Basic-auth credentials embedded in the node URI
/// are sent as an `Authorization` header.
#[derive(Debug)]
pub struct JsonRpcHttp {
    http: reqwest::Client,
    url: url::Url,
    credentials: Option<(String, Option<String>)>,
    next_id: AtomicU64,
}

impl JsonRpcHttp {
    pub fn new(uri: &str, timeout: Duration) -> ChainResult<Self> {
        let (url, credentials) = split_credentials(uri)?;
        Ok(Self {
            http: http_client(timeout)?,
            url,
            credentials,
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl RpcTransport for JsonRpcHttp {
    async fn call(&self, method: &str, params: Value) -> ChainResult<Value> {
        let request = Request {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let mut builder = self.http.post(self.url.clone()).json(&request);
        if let Some((user, password)) = &self.credentials {
            builder = builder.basic_auth(user, password.as_deref());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ChainError::transport(method, format!("request failed: {e}")))?;

        // bitcoind reports RPC errors with a 500 status and a JSON body, so
        // the body is inspected before the status code
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChainError::transport(method, format!("reading body failed: {e}")))?;

        let envelope: Response = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(ChainError::transport(method, format!("invalid JSON-RPC envelope: {e}")))
            }
            Err(_) => return Err(ChainError::transport(method, format!("returned {status}: {body}"))),
        };

        if let Some(error) = envelope.error.filter(|e| !e.is_null()) {
            return Err(ChainError::rpc(method, error_message(&error)));
        }

        Ok(envelope.result)
    }
}

/// Extract `error.message` when the node follows JSON-RPC 2.0, else the raw JSON.
fn error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}
