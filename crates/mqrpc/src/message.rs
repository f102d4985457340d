// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire messages exchanged with the transport.
//!
//! # Wire format
//!
//! ```text
//! request:  { "from": <sender>, "to": <service>, "method": <name>, "args": [...] }
//! response: { "to": <correlation id>, "data"?: <value>, "error"?: <value> }
//! ```
//!
//! A response's `to` field carries the correlation id of the request it
//! answers, not a service address. Field names are part of the contract with
//! existing counterparts and must not change.

use crate::delay::DelaySpec;
use crate::error::RpcResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque token assigned by the transport when a request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Request form of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Transport name of the calling client.
    pub from: String,
    /// Service name.
    pub to: String,
    pub method: String,
    pub args: Vec<Value>,
}

/// Response form of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Correlation id of the answered request.
    pub to: CorrelationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Response {
    pub fn success(to: impl Into<CorrelationId>, data: Value) -> Self {
        Self {
            to: to.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(to: impl Into<CorrelationId>, error: Value) -> Self {
        Self {
            to: to.into(),
            data: None,
            error: Some(error),
        }
    }

    /// True when an error payload is present (it wins over `data`).
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Any message handed to or received from the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn to_json(&self) -> RpcResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> RpcResult<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// One argument of an outgoing call.
///
/// A trailing [`CallArg::Delay`] is popped by the correlation engine and
/// turned into a transport delay; a delay anywhere else travels as a plain
/// value.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    Value(Value),
    Delay(DelaySpec),
}

impl CallArg {
    /// Serialize any value into an argument.
    pub fn value<T: Serialize + ?Sized>(value: &T) -> RpcResult<Self> {
        Ok(Self::Value(serde_json::to_value(value)?))
    }

    pub fn is_delay(&self) -> bool {
        matches!(self, Self::Delay(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Value(v) => v,
            // DelaySpec serialization cannot fail; NaN/inf become null.
            Self::Delay(d) => serde_json::to_value(d).unwrap_or(Value::Null),
        }
    }
}

impl From<Value> for CallArg {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<DelaySpec> for CallArg {
    fn from(d: DelaySpec) -> Self {
        Self::Delay(d)
    }
}

/// Split call arguments into wire values and a delivery delay.
///
/// Only a trailing delay is consumed; the delay defaults to 0.
pub fn split_delay(mut args: Vec<CallArg>) -> (Vec<Value>, u64) {
    let delay_ms = match args.last() {
        Some(CallArg::Delay(spec)) => {
            let ms = spec.milliseconds();
            args.pop();
            ms
        }
        _ => 0,
    };
    (args.into_iter().map(CallArg::into_value).collect(), delay_ms)
}
