// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TypeScript declaration emitter (`.d.ts`), for non-Rust consumers.

use super::ir::{ClientIr, DelayParam, MethodIr};
use super::Emitter;
use crate::error::RpcResult;
use serde::Serialize;
use tera::{Context, Tera};

const TEMPLATE_NAME: &str = "client.d.ts";

const TEMPLATE: &str = r#"// Generated by mqrpc from the `{{ service_name }}` description. Do not edit.

import type { DelaySpec, RpcClient } from "mqrpc";
{% for t in types %}
export interface {{ t.name }}{% if t.parent %} extends {{ t.parent }}{% endif %} {
{%- for f in t.fields %}
  {{ f.name }}{% if f.optional %}?{% endif %}: {{ f.ty }};
{%- endfor %}
{%- if t.index_signature %}
  {{ t.index_signature }};
{%- endif %}
}
{% endfor %}
export declare class {{ client_type }} {
  static readonly serviceName: "{{ service_name }}";
  constructor(client: RpcClient);
{%- for m in methods %}
{%- if m.docs %}
  /** {{ m.docs }} */
{%- endif %}
  {{ m.name }}({{ m.params | join(sep=", ") }}): Promise<{{ m.returns }}>;
{%- endfor %}
}
"#;

#[derive(Serialize)]
struct FieldView {
    name: String,
    ty: String,
    optional: bool,
}

#[derive(Serialize)]
struct TypeView {
    name: String,
    parent: Option<String>,
    fields: Vec<FieldView>,
    index_signature: Option<String>,
}

#[derive(Serialize)]
struct MethodView {
    name: String,
    params: Vec<String>,
    returns: String,
    docs: Option<String>,
}

/// Emits a TypeScript declaration file per client.
pub struct TypeScriptEmitter {
    tera: Tera,
}

impl TypeScriptEmitter {
    pub fn new() -> RpcResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)?;
        Ok(Self { tera })
    }
}

fn property_name(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if plain {
        name.to_string()
    } else {
        format!("{:?}", name)
    }
}

fn method_view(method: &MethodIr) -> MethodView {
    let mut params: Vec<String> = method
        .params
        .iter()
        .map(|p| {
            format!(
                "{}{}: {}",
                p.name,
                if p.optional { "?" } else { "" },
                p.ty.raw
            )
        })
        .collect();
    if method.delay == DelayParam::Appended {
        params.push(format!("{}?: DelaySpec", method.delay_param_name()));
    }
    MethodView {
        name: property_name(&method.name),
        params,
        returns: method.returns.raw.clone(),
        docs: method.docs.as_ref().map(|d| d.replace("*/", "*\\/")),
    }
}

impl Emitter for TypeScriptEmitter {
    fn extension(&self) -> &'static str {
        "d.ts"
    }

    fn emit(&self, ir: &ClientIr) -> RpcResult<String> {
        let types: Vec<TypeView> = ir
            .types
            .iter()
            .map(|t| TypeView {
                name: t.name.clone(),
                parent: t.parent.clone(),
                fields: t
                    .fields
                    .iter()
                    .map(|f| FieldView {
                        name: property_name(&f.name),
                        ty: f.ty.raw.clone(),
                        optional: f.optional,
                    })
                    .collect(),
                index_signature: t.index_signature.as_ref().map(|s| s.raw.clone()),
            })
            .collect();
        let methods: Vec<MethodView> = ir.methods.iter().map(method_view).collect();

        let mut ctx = Context::new();
        ctx.insert("service_name", &ir.service_name);
        ctx.insert("client_type", &ir.client_type);
        ctx.insert("types", &types);
        ctx.insert("methods", &methods);
        Ok(self.tera.render(TEMPLATE_NAME, &ctx)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MethodDescription, ServiceDescription, TypeDescription};

    fn emit(desc: &ServiceDescription) -> String {
        TypeScriptEmitter::new()
            .unwrap()
            .emit(&ClientIr::from_description(desc))
            .unwrap()
    }

    #[test]
    fn interfaces_and_client() {
        let desc = ServiceDescription::new("CalculatorService")
            .with_type("Shape", TypeDescription::new().property("name", "string", false))
            .with_type(
                "Circle",
                TypeDescription::new()
                    .property("radius", "number", true)
                    .property("fill-color", "string", false)
                    .inherits("Shape")
                    .index_signature("[key: string]: any"),
            )
            .with_method(
                "add",
                MethodDescription::new("Promise<number>")
                    .arg("a", "number")
                    .arg("b", "number")
                    .docs("Adds two numbers."),
            );
        let out = emit(&desc);

        assert!(out.contains("export interface Circle extends Shape {"));
        assert!(out.contains("  radius?: number;"));
        assert!(out.contains("  \"fill-color\": string;"));
        assert!(out.contains("  [key: string]: any;"));
        assert!(out.contains("export declare class CalculatorClient {"));
        assert!(out.contains("  /** Adds two numbers. */"));
        assert!(out.contains("  add(a: number, b: number, delay?: DelaySpec): Promise<number>;"));
        assert!(!out.contains("Promise<Promise"));
        assert!(!out.contains("&quot;"));
    }

    #[test]
    fn declared_delay_is_kept_as_is() {
        let desc = ServiceDescription::new("Timer").with_method(
            "schedule",
            MethodDescription::new("void")
                .arg("label", "string")
                .optional_arg("after", "Delay"),
        );
        let out = emit(&desc);
        assert!(out.contains("  schedule(label: string, after?: Delay): Promise<void>;"));
    }
}
