// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client and synthesis options.
//!
//! Supports both programmatic and file-based configuration (YAML or JSON,
//! chosen by file extension):
//!
//! ```yaml
//! path: .mqrpc
//! write: true
//! compile: true
//! timeout: 2000   # milliseconds
//! ```

use crate::error::{RpcError, RpcResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default directory for generated artifacts and identity bookkeeping.
pub const DEFAULT_PATH: &str = ".mqrpc";

/// Default description fetch bound, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Recognized options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// Directory for generated artifacts and identity bookkeeping.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Persist generated source and the compiled method table.
    #[serde(default)]
    pub write: bool,

    /// Produce and return a loaded client.
    #[serde(default = "default_true")]
    pub compile: bool,

    /// Description fetch bound (milliseconds).
    #[serde(default = "default_timeout_ms", rename = "timeout")]
    pub timeout_ms: u64,

    /// Structured log sink. Operations run under this dispatcher when set;
    /// otherwise the global subscriber is used.
    #[serde(skip)]
    pub logger: Option<tracing::Dispatch>,
}

fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_PATH)
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for Options {
    fn default() -> Self {
        Self {
            path: default_path(),
            write: false,
            compile: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            logger: None,
        }
    }
}

impl Options {
    /// Load options from a `.yaml`/`.yml` or `.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> RpcResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(RpcError::Config(format!(
                "unsupported options file extension {:?} ({})",
                other,
                path.display()
            ))),
        }
    }

    pub fn from_yaml_str(s: &str) -> RpcResult<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> RpcResult<Self> {
        serde_json::from_str(s).map_err(|e| RpcError::Config(e.to_string()))
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    #[must_use]
    pub fn compile(mut self, compile: bool) -> Self {
        self.compile = compile;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: tracing::Dispatch) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
