// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service description (the schema a service publishes about itself).
//!
//! ```json
//! {
//!   "serviceName": "CalculatorService",
//!   "types": {
//!     "Point": { "properties": { "x": { "type": "number", "optional": false } } }
//!   },
//!   "methods": {
//!     "add": {
//!       "arguments": [{ "name": "a", "type": "number", "optional": false }],
//!       "returnType": "Promise<number>",
//!       "docs": "Adds two numbers."
//!     }
//!   }
//! }
//! ```
//!
//! Maps are ordered by key so synthesis output is stable.

use crate::error::{RpcError, RpcResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Introspection method every service answers with its description.
pub const DESCRIBE_METHOD: &str = "describe";

/// Full description of a remote service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescription {
    pub service_name: String,
    #[serde(default)]
    pub types: BTreeMap<String, TypeDescription>,
    #[serde(default)]
    pub methods: BTreeMap<String, MethodDescription>,
}

/// A named structured type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescription {
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    /// Index signature text, e.g. `[key: string]: number`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescription {
    #[serde(rename = "type")]
    pub type_expr: String,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescription {
    #[serde(default)]
    pub arguments: Vec<ArgumentDescription>,
    #[serde(default = "default_return_type")]
    pub return_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub type_expr: String,
    #[serde(default)]
    pub optional: bool,
}

fn default_return_type() -> String {
    "void".to_string()
}

impl ServiceDescription {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_type(mut self, name: impl Into<String>, ty: TypeDescription) -> Self {
        self.types.insert(name.into(), ty);
        self
    }

    #[must_use]
    pub fn with_method(mut self, name: impl Into<String>, method: MethodDescription) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    pub fn from_json(s: &str) -> RpcResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a description from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> RpcResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| {
            RpcError::Config(format!("invalid description {}: {}", path.display(), e))
        })
    }

    pub fn to_json_pretty(&self) -> RpcResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl TypeDescription {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn property(mut self, name: impl Into<String>, type_expr: impl Into<String>, optional: bool) -> Self {
        self.properties.insert(
            name.into(),
            PropertyDescription {
                type_expr: type_expr.into(),
                optional,
            },
        );
        self
    }

    #[must_use]
    pub fn inherits(mut self, parent: impl Into<String>) -> Self {
        self.inherits_from = Some(parent.into());
        self
    }

    #[must_use]
    pub fn index_signature(mut self, signature: impl Into<String>) -> Self {
        self.index_signature = Some(signature.into());
        self
    }
}

impl MethodDescription {
    pub fn new(return_type: impl Into<String>) -> Self {
        Self {
            arguments: Vec::new(),
            return_type: return_type.into(),
            docs: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, name: impl Into<String>, type_expr: impl Into<String>) -> Self {
        self.arguments.push(ArgumentDescription {
            name: name.into(),
            type_expr: type_expr.into(),
            optional: false,
        });
        self
    }

    #[must_use]
    pub fn optional_arg(mut self, name: impl Into<String>, type_expr: impl Into<String>) -> Self {
        self.arguments.push(ArgumentDescription {
            name: name.into(),
            type_expr: type_expr.into(),
            optional: true,
        });
        self
    }

    #[must_use]
    pub fn docs(mut self, docs: impl Into<String>) -> Self {
        self.docs = Some(docs.into());
        self
    }
}
