// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Loading synthesized clients.
//!
//! Generated source is checked with `syn` and paired with a method table
//! derived from the same IR. The table drives [`DynamicClient`], which
//! validates arity before dispatching through its [`RpcClient`].
//!
//! With `write` enabled, two files land under `options.path`:
//!
//! ```text
//! <name>.rs    generated source
//! <name>.json  method table
//! ```

use crate::client::RpcClient;
use crate::codegen::naming::rust_ident;
use crate::codegen::rust::method_idents;
use crate::codegen::{ClientIr, DelayParam};
use crate::config::Options;
use crate::error::{RpcError, RpcResult};
use crate::message::CallArg;
use crate::schema::{ServiceDescription, DESCRIBE_METHOD};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syn::{ImplItem, Item, Type};

/// Arity of one remote method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Value parameter names, in order (a declared delay excluded).
    pub params: Vec<String>,
    /// Leading parameters that must be supplied.
    pub required: usize,
    pub delay: DelayParam,
}

/// Every callable method of a generated client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodTable {
    pub service_name: String,
    pub client_type: String,
    pub methods: BTreeMap<String, MethodSignature>,
}

impl MethodTable {
    pub fn from_ir(ir: &ClientIr) -> Self {
        let methods = ir
            .methods
            .iter()
            .map(|m| {
                let params = m.value_params();
                let signature = MethodSignature {
                    params: params.iter().map(|p| p.name.clone()).collect(),
                    required: params.iter().filter(|p| !p.optional).count(),
                    delay: m.delay,
                };
                (m.name.clone(), signature)
            })
            .collect();
        Self {
            service_name: ir.service_name.clone(),
            client_type: ir.client_type.clone(),
            methods,
        }
    }

    /// Load a table persisted by [`load`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> RpcResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RpcError::Load(format!("{}: {}", path.display(), e)))
    }

    pub fn signature(&self, method: &str) -> RpcResult<&MethodSignature> {
        self.methods
            .get(method)
            .ok_or_else(|| RpcError::MethodNotFound(method.to_string()))
    }
}

/// Result of synthesis and loading.
#[derive(Debug, Clone)]
pub struct GeneratedClientArtifact {
    pub source_text: String,
    /// Present when compilation was requested.
    pub compiled_module: Option<ClientConstructor>,
    /// Where the source was persisted, when `write` was set.
    pub source_path: Option<PathBuf>,
    pub table_path: Option<PathBuf>,
}

/// Produces [`DynamicClient`]s for one service.
#[derive(Debug, Clone)]
pub struct ClientConstructor {
    table: Arc<MethodTable>,
}

impl ClientConstructor {
    pub fn new(table: MethodTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    pub fn table(&self) -> &MethodTable {
        &self.table
    }

    pub fn service_name(&self) -> &str {
        &self.table.service_name
    }

    /// Bind a client to this method table.
    pub fn construct(&self, client: RpcClient) -> DynamicClient {
        DynamicClient {
            table: Arc::clone(&self.table),
            client,
        }
    }
}

/// Client driven by a method table instead of compiled methods.
///
/// Owns only its table and its [`RpcClient`].
#[derive(Debug, Clone)]
pub struct DynamicClient {
    table: Arc<MethodTable>,
    client: RpcClient,
}

impl DynamicClient {
    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    pub fn service_name(&self) -> &str {
        &self.table.service_name
    }

    /// Method names, sorted.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.table.methods.keys().map(String::as_str)
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.table.methods.contains_key(method)
    }

    fn check_arity(&self, method: &str, args: &[CallArg]) -> RpcResult<()> {
        let signature = self.table.signature(method)?;
        let values = match args.last() {
            Some(CallArg::Delay(_)) => args.len() - 1,
            _ => args.len(),
        };
        if values < signature.required || values > signature.params.len() {
            return Err(RpcError::InvalidArguments {
                method: method.to_string(),
                reason: if signature.required == signature.params.len() {
                    format!("expected {} arguments, got {}", signature.required, values)
                } else {
                    format!(
                        "expected {} to {} arguments, got {}",
                        signature.required,
                        signature.params.len(),
                        values
                    )
                },
            });
        }
        Ok(())
    }

    /// Call `method` after checking `args` against its signature.
    pub async fn invoke(&self, method: &str, args: Vec<CallArg>) -> RpcResult<Value> {
        self.check_arity(method, &args)?;
        self.client
            .call(&self.table.service_name, method, args)
            .await
    }

    pub async fn invoke_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        args: Vec<CallArg>,
    ) -> RpcResult<T> {
        self.check_arity(method, &args)?;
        self.client
            .call_typed(&self.table.service_name, method, args)
            .await
    }

    /// Fetch the service's own description.
    pub async fn describe(&self) -> RpcResult<ServiceDescription> {
        self.client
            .call_typed(&self.table.service_name, DESCRIBE_METHOD, Vec::new())
            .await
    }
}

/// Persist and/or compile generated `source`.
///
/// `write` and `compile` are independent: files are written before the
/// source is checked, so a rejected source is still on disk for inspection.
pub fn load(
    name: &str,
    source: String,
    ir: &ClientIr,
    options: &Options,
) -> RpcResult<GeneratedClientArtifact> {
    let table = MethodTable::from_ir(ir);

    let (source_path, table_path) = if options.write {
        fs::create_dir_all(&options.path)?;
        let source_path = options.path.join(format!("{}.rs", name));
        let table_path = options.path.join(format!("{}.json", name));
        fs::write(&source_path, &source)?;
        fs::write(&table_path, serde_json::to_string_pretty(&table)?)?;
        tracing::info!(
            client = name,
            source = %source_path.display(),
            table = %table_path.display(),
            "generated client written"
        );
        (Some(source_path), Some(table_path))
    } else {
        (None, None)
    };

    let compiled_module = if options.compile {
        verify_source(&source, ir)
            .map_err(|reason| RpcError::Load(format!("{}: {}", name, reason)))?;
        tracing::debug!(client = name, methods = table.methods.len(), "generated client loaded");
        Some(ClientConstructor::new(table))
    } else {
        None
    };

    Ok(GeneratedClientArtifact {
        source_text: source,
        compiled_module,
        source_path,
        table_path,
    })
}

/// Check that `source` parses and declares the client and every method of
/// `ir` under its generated identifier.
fn verify_source(source: &str, ir: &ClientIr) -> Result<(), String> {
    let file = syn::parse_file(source).map_err(|e| e.to_string())?;
    let client = rust_ident(&ir.client_type);

    let mut declared = false;
    let mut methods = BTreeSet::new();
    scan(&file.items, &client, &mut declared, &mut methods);

    if !declared {
        return Err(format!("source does not declare `{}`", client));
    }
    for ident in method_idents(ir) {
        if !methods.contains(&ident) {
            return Err(format!("`{}` has no method `{}`", client, ident));
        }
    }
    Ok(())
}

fn scan(items: &[Item], client: &str, declared: &mut bool, methods: &mut BTreeSet<String>) {
    for item in items {
        match item {
            Item::Mod(module) => {
                if let Some((_, nested)) = &module.content {
                    scan(nested, client, declared, methods);
                }
            }
            Item::Struct(s) if s.ident == client => *declared = true,
            Item::Impl(imp) if imp.trait_.is_none() => {
                let Type::Path(path) = imp.self_ty.as_ref() else {
                    continue;
                };
                if !path.path.segments.last().is_some_and(|s| s.ident == client) {
                    continue;
                }
                for item in &imp.items {
                    if let ImplItem::Fn(f) = item {
                        methods.insert(f.sig.ident.to_string());
                    }
                }
            }
            _ => {}
        }
    }
}
