// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rust stub emitter.
//!
//! Output is one self-contained module named after the client
//! (`calculatorClient`), depending only on `::mqrpc` (serde and serde_json
//! are reached through its re-exports).

use super::ir::{ClientIr, DelayParam, FieldIr, MethodIr, TypeIr};
use super::naming::{field_ident, rust_ident, type_ident, unraw};
use super::types::TypeExpr;
use super::Emitter;
use crate::error::RpcResult;
use std::collections::BTreeMap;

const VALUE: &str = "::mqrpc::serde_json::Value";
const STRING: &str = "::std::string::String";
const SERDE_CRATE: &str = "::mqrpc::serde";

/// Name of the flattened field holding the parent type.
pub const BASE_FIELD: &str = "base";

/// Name of the flattened field holding index-signature entries.
pub const EXTRA_FIELD: &str = "extra";

/// Doc line prefix carrying the verbatim index signature.
pub const INDEX_SIGNATURE_DOC: &str = "Index signature: ";

/// Local holding the call arguments in generated method bodies.
const ARGS_LOCAL: &str = "args";

/// Emits a Rust module per client.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustEmitter;

impl Emitter for RustEmitter {
    fn extension(&self) -> &'static str {
        "rs"
    }

    fn emit(&self, ir: &ClientIr) -> RpcResult<String> {
        Ok(self.render(ir))
    }
}

struct Writer {
    out: String,
    indent: usize,
}

impl Writer {
    fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    fn docs(&mut self, docs: &str) {
        for line in docs.lines() {
            if line.trim().is_empty() {
                self.line("///");
            } else {
                self.line(format!("/// {}", line.trim_end()));
            }
        }
    }
}

fn literal(s: &str) -> String {
    format!("{:?}", s)
}

/// Take `ident`, or the first free `ident_`, `ident__`, ... out of `taken`.
fn claim(ident: String, taken: &mut Vec<String>) -> String {
    let mut ident = ident;
    while taken.contains(&ident) {
        ident = format!("{}_", unraw(&ident));
    }
    taken.push(ident.clone());
    ident
}

/// Method identifiers of the generated client, in `ir.methods` order.
/// Distinct even when several wire names share a snake-case form.
pub fn method_idents(ir: &ClientIr) -> Vec<String> {
    let mut taken = Vec::new();
    ir.methods
        .iter()
        .map(|m| claim(field_ident(&m.name), &mut taken))
        .collect()
}

/// Struct identifier per declared type name. The client type's own name is
/// reserved first.
fn type_idents(ir: &ClientIr) -> BTreeMap<String, String> {
    let mut taken = vec![rust_ident(&ir.client_type)];
    ir.types
        .iter()
        .map(|t| (t.name.clone(), claim(type_ident(&t.name), &mut taken)))
        .collect()
}

impl RustEmitter {
    /// Render `ir` to Rust source. Deterministic for a given IR.
    pub fn render(&self, ir: &ClientIr) -> String {
        let types = type_idents(ir);
        let mut w = Writer {
            out: String::new(),
            indent: 0,
        };
        w.line(format!(
            "// Generated by mqrpc from the `{}` description. Do not edit.",
            ir.service_name
        ));
        w.line("");
        w.line("#[allow(non_snake_case)]");
        w.line(format!("pub mod {} {{", rust_ident(&ir.module_name)));
        w.indent += 1;
        w.line("#![allow(non_camel_case_types, dead_code, unused_imports, clippy::all)]");
        w.line("");
        w.line(format!(
            "pub const SERVICE_NAME: &str = {};",
            literal(&ir.service_name)
        ));

        for ty in &ir.types {
            w.line("");
            self.render_type(&mut w, &types, ty);
        }

        w.line("");
        self.render_client(&mut w, ir, &types);

        w.indent -= 1;
        w.line("}");
        w.out
    }

    fn rust_type(
        &self,
        types: &BTreeMap<String, String>,
        expr: &TypeExpr,
        boxed: bool,
    ) -> String {
        match expr {
            TypeExpr::Number => "f64".to_string(),
            TypeExpr::String => STRING.to_string(),
            TypeExpr::Boolean => "bool".to_string(),
            TypeExpr::Void | TypeExpr::Null => "()".to_string(),
            TypeExpr::Delay => "::mqrpc::DelaySpec".to_string(),
            TypeExpr::Any | TypeExpr::Object | TypeExpr::Union(_) | TypeExpr::Opaque(_) => {
                VALUE.to_string()
            }
            TypeExpr::Array(inner) => {
                format!("::std::vec::Vec<{}>", self.rust_type(types, inner, false))
            }
            TypeExpr::Map(inner) => format!(
                "::std::collections::HashMap<{}, {}>",
                STRING,
                self.rust_type(types, inner, false)
            ),
            TypeExpr::Promise(inner) => self.rust_type(types, inner, boxed),
            TypeExpr::Nullable(inner) => format!(
                "::std::option::Option<{}>",
                self.rust_type(types, inner, boxed)
            ),
            TypeExpr::Named(name) => match types.get(name) {
                Some(ident) if boxed => format!("::std::boxed::Box<{}>", ident),
                Some(ident) => ident.clone(),
                None => VALUE.to_string(),
            },
        }
    }

    fn field_type(&self, types: &BTreeMap<String, String>, field: &FieldIr) -> String {
        let ty = self.rust_type(types, &field.ty.expr, field.boxed);
        if field.optional && !matches!(field.ty.expr, TypeExpr::Nullable(_)) {
            format!("::std::option::Option<{}>", ty)
        } else {
            ty
        }
    }

    fn render_type(&self, w: &mut Writer, types: &BTreeMap<String, String>, ty: &TypeIr) {
        let ident = types.get(&ty.name).cloned().unwrap_or_else(|| type_ident(&ty.name));
        w.line(format!(
            "#[derive(Debug, Clone, PartialEq, {c}::Serialize, {c}::Deserialize)]",
            c = SERDE_CRATE
        ));
        if ident == ty.name {
            w.line(format!("#[serde(crate = {})]", literal(SERDE_CRATE)));
        } else {
            w.line(format!(
                "#[serde(crate = {}, rename = {})]",
                literal(SERDE_CRATE),
                literal(&ty.name)
            ));
        }
        w.line(format!("pub struct {} {{", ident));
        w.indent += 1;

        let mut taken = Vec::new();
        let fields: Vec<String> = ty
            .fields
            .iter()
            .map(|f| claim(field_ident(&f.name), &mut taken))
            .collect();
        let base = ty
            .parent
            .as_ref()
            .map(|parent| (claim(BASE_FIELD.to_string(), &mut taken), parent));
        let extra = ty
            .index_signature
            .as_ref()
            .map(|sig| (claim(EXTRA_FIELD.to_string(), &mut taken), sig));

        if let Some((name, parent)) = base {
            w.line("#[serde(flatten)]");
            let parent = types.get(parent).cloned().unwrap_or_else(|| type_ident(parent));
            w.line(format!("pub {}: {},", name, parent));
        }

        for (field, name) in ty.fields.iter().zip(&fields) {
            let mut attrs = Vec::new();
            if unraw(name) != field.name {
                attrs.push(format!("rename = {}", literal(&field.name)));
            }
            if field.optional {
                attrs.push("default".to_string());
                attrs.push(format!(
                    "skip_serializing_if = {}",
                    literal("::std::option::Option::is_none")
                ));
            }
            if !attrs.is_empty() {
                w.line(format!("#[serde({})]", attrs.join(", ")));
            }
            w.line(format!("pub {}: {},", name, self.field_type(types, field)));
        }

        if let Some((name, sig)) = extra {
            w.line(format!("/// {}`{}`", INDEX_SIGNATURE_DOC, sig.raw));
            w.line("#[serde(flatten)]");
            w.line(format!(
                "pub {}: ::std::collections::HashMap<{}, {}>,",
                name,
                STRING,
                self.rust_type(types, &sig.value.expr, false)
            ));
        }

        w.indent -= 1;
        w.line("}");
    }

    fn render_client(&self, w: &mut Writer, ir: &ClientIr, types: &BTreeMap<String, String>) {
        let client = rust_ident(&ir.client_type);
        w.line(format!("/// Typed client for `{}`.", ir.service_name));
        w.line("#[derive(Debug, Clone)]");
        w.line(format!("pub struct {} {{", client));
        w.line("    client: ::mqrpc::RpcClient,");
        w.line("}");

        if !ir.methods.is_empty() {
            w.line("");
            w.line(format!("impl {} {{", client));
            w.indent += 1;
            for (i, (method, ident)) in ir.methods.iter().zip(method_idents(ir)).enumerate() {
                if i > 0 {
                    w.line("");
                }
                self.render_method(w, types, method, &ident);
            }
            w.indent -= 1;
            w.line("}");
        }

        w.line("");
        w.line(format!("impl ::mqrpc::StubClient for {} {{", client));
        w.indent += 1;
        w.line("const SERVICE_NAME: &'static str = SERVICE_NAME;");
        w.line("");
        w.line("fn from_client(client: ::mqrpc::RpcClient) -> Self {");
        w.line("    Self { client }");
        w.line("}");
        w.line("");
        w.line("fn client(&self) -> &::mqrpc::RpcClient {");
        w.line("    &self.client");
        w.line("}");
        w.indent -= 1;
        w.line("}");
    }

    fn param_type(
        &self,
        types: &BTreeMap<String, String>,
        optional: bool,
        expr: &TypeExpr,
    ) -> String {
        let ty = self.rust_type(types, expr, false);
        if optional && !matches!(expr, TypeExpr::Nullable(_)) {
            format!("::std::option::Option<{}>", ty)
        } else {
            ty
        }
    }

    fn render_method(
        &self,
        w: &mut Writer,
        types: &BTreeMap<String, String>,
        method: &MethodIr,
        ident: &str,
    ) {
        let mut taken = Vec::new();
        let mut signature = vec!["&self".to_string()];
        let mut values = Vec::new();

        for param in method.value_params() {
            let name = claim(field_ident(&param.name), &mut taken);
            signature.push(format!(
                "{}: {}",
                name,
                self.param_type(types, param.optional, &param.ty.expr)
            ));
            values.push(name);
        }

        let delay_ident = claim(field_ident(&method.delay_param_name()), &mut taken);
        let delay_optional = match method.delay {
            DelayParam::Appended => true,
            DelayParam::Declared => method.params.last().is_some_and(|p| {
                p.optional || matches!(p.ty.expr, TypeExpr::Nullable(_))
            }),
        };
        signature.push(format!(
            "{}: {}",
            delay_ident,
            if delay_optional {
                "::std::option::Option<::mqrpc::DelaySpec>"
            } else {
                "::mqrpc::DelaySpec"
            }
        ));
        let args = claim(ARGS_LOCAL.to_string(), &mut taken);

        let returns_unit = matches!(method.returns.expr, TypeExpr::Void | TypeExpr::Null);
        let returns = self.rust_type(types, &method.returns.expr, false);

        if let Some(docs) = &method.docs {
            w.docs(docs);
        }
        w.line(format!(
            "pub async fn {}({}) -> ::mqrpc::RpcResult<{}> {{",
            ident,
            signature.join(", "),
            returns
        ));
        w.indent += 1;
        w.line(format!(
            "let mut {} = ::std::vec::Vec::with_capacity({});",
            args,
            values.len() + 1
        ));
        for value in &values {
            w.line(format!("{}.push(::mqrpc::CallArg::value(&{})?);", args, value));
        }
        if delay_optional {
            w.line(format!(
                "if let ::std::option::Option::Some(delay) = {} {{",
                delay_ident
            ));
            w.line(format!("    {}.push(::mqrpc::CallArg::from(delay));", args));
            w.line("}");
        } else {
            w.line(format!("{}.push(::mqrpc::CallArg::from({}));", args, delay_ident));
        }

        let call = if returns_unit { "call" } else { "call_typed" };
        w.line("self.client");
        w.indent += 1;
        w.line(format!(
            ".{}(SERVICE_NAME, {}, {})",
            call,
            literal(&method.name),
            args
        ));
        w.line(".await");
        if returns_unit {
            w.line(".map(|_| ())");
        }
        w.indent -= 2;
        w.line("}");
    }
}
