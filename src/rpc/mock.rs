// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scripted transport for adapter tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::RpcTransport;
use crate::error::{ChainError, ChainResult};

#[derive(Debug, Clone)]
enum Reply {
    Result(Value),
    RpcError(String),
    Hang,
}

#[derive(Debug)]
struct Rule {
    method: String,
    params: Option<Value>,
    reply: Reply,
}

/// Replays canned responses. Rules with explicit params win over
/// method-only rules; replies are reusable so a payload can be normalized
/// more than once. Unscripted calls fail with a transport error.
#[derive(Debug, Default)]
pub struct MockTransport {
    rules: Vec<Rule>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `method` with `result`.
    pub fn on(mut self, method: &str, result: Value) -> Self {
        self.push(method, None, Reply::Result(result));
        self
    }

    /// Answer calls to `method` with exactly `params`.
    pub fn on_params(mut self, method: &str, params: Value, result: Value) -> Self {
        self.push(method, Some(params), Reply::Result(result));
        self
    }

    pub fn fail(mut self, method: &str, message: &str) -> Self {
        self.push(method, None, Reply::RpcError(message.to_string()));
        self
    }

    /// Never answer `method`.
    pub fn hang(mut self, method: &str) -> Self {
        self.push(method, None, Reply::Hang);
        self
    }

    /// Calls recorded so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p)
            .collect()
    }

    fn push(&mut self, method: &str, params: Option<Value>, reply: Reply) {
        self.rules.push(Rule {
            method: method.to_string(),
            params,
            reply,
        });
    }

    fn lookup(&self, method: &str, params: &Value) -> Option<Reply> {
        let exact = self
            .rules
            .iter()
            .find(|r| r.method == method && r.params.as_ref() == Some(params));
        let any = || {
            self.rules
                .iter()
                .find(|r| r.method == method && r.params.is_none())
        };
        exact.or_else(any).map(|r| r.reply.clone())
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn call(&self, method: &str, params: Value) -> ChainResult<Value> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((method.to_string(), params.clone()));
        }

        match self.lookup(method, &params) {
            Some(Reply::Result(value)) => Ok(value),
            Some(Reply::RpcError(message)) => Err(ChainError::rpc(method, message)),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(ChainError::transport(
                method,
                format!("no scripted reply for params {params}"),
            )),
        }
    }
}
