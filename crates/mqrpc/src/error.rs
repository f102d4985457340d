// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for mqrpc operations.

use thiserror::Error;

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors that can occur while constructing clients, dispatching calls or
/// synthesizing stubs.
///
/// Orphaned responses are not errors: they are routed to the
/// [`EventRelay`](crate::EventRelay) instead.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Client could not be constructed (invalid base name, identity
    /// exhaustion, transport refused the endpoint).
    #[error("cannot construct client: {0}")]
    Construction(String),

    /// Description fetch exceeded its bound.
    #[error("service unreachable: is `{service}` running?")]
    Timeout { service: String },

    /// Remote peer reported an application-level error. The payload is
    /// carried unmodified.
    #[error("remote error: {0}")]
    Remote(serde_json::Value),

    /// The transport failed to send or deliver this call.
    #[error("transport error: {0}")]
    Transport(String),

    /// Client was destroyed before the operation could complete.
    #[error("client destroyed")]
    Shutdown,

    /// Method is not part of the loaded method table.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// Call arguments do not fit the method signature.
    #[error("invalid arguments for `{method}`: {reason}")]
    InvalidArguments { method: String, reason: String },

    /// JSON encode/decode failure on call arguments or results.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Synthesized source could not be rendered.
    #[error("codegen error: {0}")]
    Codegen(String),

    /// Synthesized source could not be loaded.
    #[error("load error: {0}")]
    Load(String),

    /// Filesystem error (artifact persistence, identity bookkeeping).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read or is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RpcError {
    /// Remote error payload, if this is a [`RpcError::Remote`].
    pub fn remote_payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Remote(payload) => Some(payload),
            _ => None,
        }
    }

    /// True for description-fetch timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<serde_yaml::Error> for RpcError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<tera::Error> for RpcError {
    fn from(e: tera::Error) -> Self {
        Self::Codegen(e.to_string())
    }
}
