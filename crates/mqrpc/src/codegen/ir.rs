// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Emitter-independent client model.
//!
//! Built once from a [`ServiceDescription`]; every decision that does not
//! depend on the target language (inheritance resolution, return type
//! normalization, delay parameter placement, method filtering, indirection
//! for recursive types) is made here.

use super::naming::{client_type_name, module_name};
use super::types::{strip_promise, TypeExpr};
use crate::schema::{ServiceDescription, DESCRIBE_METHOD};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Name of the appended delay parameter.
pub const DELAY_PARAM: &str = "delay";

/// A type expression with its original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRef {
    pub raw: String,
    #[serde(skip)]
    pub expr: TypeExpr,
}

impl TypeRef {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.trim().to_string(),
            expr: TypeExpr::parse(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIr {
    pub name: String,
    pub ty: TypeRef,
    pub optional: bool,
    /// The field holds a type that contains this one; it must sit behind a
    /// pointer.
    pub boxed: bool,
}

/// `[key: string]: T`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSignature {
    /// Verbatim text from the description.
    pub raw: String,
    pub value: TypeRef,
}

impl IndexSignature {
    /// Parse the value type out of `raw`. Unrecognized forms keep the raw
    /// text with a dynamic value type.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().trim_end_matches(';').trim().to_string();
        let value = raw
            .strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
            .and_then(|(_, rest)| rest.trim_start().strip_prefix(':'))
            .map_or_else(|| TypeRef::parse("any"), TypeRef::parse);
        Self { raw, value }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeIr {
    pub name: String,
    pub fields: Vec<FieldIr>,
    /// Parent type, kept only when it is declared in the same description.
    pub parent: Option<String>,
    pub index_signature: Option<IndexSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamIr {
    pub name: String,
    pub ty: TypeRef,
    pub optional: bool,
}

/// Where a method's delay parameter comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayParam {
    /// Synthesized as a trailing optional parameter.
    Appended,
    /// The last declared argument already is a delay.
    Declared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodIr {
    pub name: String,
    /// Declared parameters, in order.
    pub params: Vec<ParamIr>,
    /// Return type with one `Promise<..>` layer removed.
    pub returns: TypeRef,
    pub docs: Option<String>,
    pub delay: DelayParam,
}

impl MethodIr {
    /// Declared parameters that carry values (the declared delay excluded).
    pub fn value_params(&self) -> &[ParamIr] {
        match self.delay {
            DelayParam::Declared => &self.params[..self.params.len().saturating_sub(1)],
            DelayParam::Appended => &self.params,
        }
    }

    /// Name of the delay parameter in generated signatures.
    pub fn delay_param_name(&self) -> String {
        match self.delay {
            DelayParam::Declared => self
                .params
                .last()
                .map_or_else(|| DELAY_PARAM.to_string(), |p| p.name.clone()),
            DelayParam::Appended => {
                let mut name = DELAY_PARAM.to_string();
                while self.params.iter().any(|p| p.name == name) {
                    name.push('_');
                }
                name
            }
        }
    }
}

/// Client model for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientIr {
    pub service_name: String,
    pub client_type: String,
    pub module_name: String,
    pub types: Vec<TypeIr>,
    pub methods: Vec<MethodIr>,
}

impl ClientIr {
    pub fn from_description(desc: &ServiceDescription) -> Self {
        let parents = resolve_parents(desc);

        let mut types: Vec<TypeIr> = desc
            .types
            .iter()
            .map(|(name, ty)| TypeIr {
                name: name.clone(),
                fields: ty
                    .properties
                    .iter()
                    .map(|(prop, p)| FieldIr {
                        name: prop.clone(),
                        ty: TypeRef::parse(&p.type_expr),
                        optional: p.optional,
                        boxed: false,
                    })
                    .collect(),
                parent: parents.get(name).cloned(),
                index_signature: ty.index_signature.as_deref().map(IndexSignature::parse),
            })
            .collect();
        mark_recursive_fields(&mut types);

        let methods = desc
            .methods
            .iter()
            .filter(|(name, _)| name.as_str() != DESCRIBE_METHOD)
            .map(|(name, m)| {
                let params: Vec<ParamIr> = m
                    .arguments
                    .iter()
                    .map(|a| ParamIr {
                        name: a.name.clone(),
                        ty: TypeRef::parse(&a.type_expr),
                        optional: a.optional,
                    })
                    .collect();
                let delay = if params.last().is_some_and(|p| p.ty.expr.is_delay()) {
                    DelayParam::Declared
                } else {
                    DelayParam::Appended
                };
                MethodIr {
                    name: name.clone(),
                    params,
                    returns: TypeRef::parse(strip_promise(&m.return_type)),
                    docs: m.docs.clone(),
                    delay,
                }
            })
            .collect();

        Self {
            service_name: desc.service_name.clone(),
            client_type: client_type_name(&desc.service_name),
            module_name: module_name(&desc.service_name),
            types,
            methods,
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodIr> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Parent links that resolve inside the description and do not close an
/// inheritance cycle. Types are visited in name order; the link that would
/// close a cycle is the one dropped.
fn resolve_parents(desc: &ServiceDescription) -> BTreeMap<String, String> {
    let mut parents: BTreeMap<String, String> = BTreeMap::new();
    for (name, ty) in &desc.types {
        let Some(parent) = &ty.inherits_from else {
            continue;
        };
        if !desc.types.contains_key(parent.as_str()) {
            tracing::debug!(ty = %name, parent = %parent, "dropping unresolved parent type");
            continue;
        }
        let mut cursor = Some(parent.as_str());
        let mut cyclic = false;
        while let Some(current) = cursor {
            if current == name {
                cyclic = true;
                break;
            }
            cursor = parents.get(current).map(String::as_str);
        }
        if cyclic {
            tracing::debug!(ty = %name, parent = %parent, "dropping cyclic parent type");
            continue;
        }
        parents.insert(name.clone(), parent.clone());
    }
    parents
}

/// Named types held inline by `expr` (not behind a sequence or map).
fn inline_refs<'a>(expr: &'a TypeExpr, out: &mut Vec<&'a str>) {
    match expr {
        TypeExpr::Named(name) => out.push(name),
        TypeExpr::Nullable(inner) | TypeExpr::Promise(inner) => inline_refs(inner, out),
        _ => {}
    }
}

/// Box every field whose inline type can reach back to its owner through
/// fields or parents.
fn mark_recursive_fields(types: &mut [TypeIr]) {
    let mut edges: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for ty in types.iter() {
        let mut refs = Vec::new();
        for field in &ty.fields {
            inline_refs(&field.ty.expr, &mut refs);
        }
        let targets = edges.entry(ty.name.clone()).or_default();
        targets.extend(refs.into_iter().map(str::to_string));
        targets.extend(ty.parent.iter().cloned());
    }

    let reaches = |from: &str, to: &str| -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![from.to_string()];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if seen.insert(current.clone()) {
                if let Some(next) = edges.get(&current) {
                    stack.extend(next.iter().cloned());
                }
            }
        }
        false
    };

    for ty in types.iter_mut() {
        let owner = ty.name.clone();
        for field in &mut ty.fields {
            let mut refs = Vec::new();
            inline_refs(&field.ty.expr, &mut refs);
            field.boxed = refs
                .iter()
                .any(|target| edges.contains_key(*target) && reaches(*target, owner.as_str()));
        }
    }
}
