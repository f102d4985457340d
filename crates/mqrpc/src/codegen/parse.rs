// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read type declarations back out of generated Rust source.
//!
//! Recovers, for every serde-derived struct: its wire name, properties with
//! their optional flags, the flattened parent and the index signature.
//! Property types are reported in canonical description form (`number`,
//! `Point[]`, `Record<string, boolean>`, ...).

use super::naming::unraw;
use super::rust::INDEX_SIGNATURE_DOC;
use crate::error::{RpcError, RpcResult};
use crate::schema::{PropertyDescription, TypeDescription};
use std::collections::BTreeMap;
use syn::{Attribute, Fields, GenericArgument, Item, ItemStruct, LitStr, PathArguments, Type};

/// Parse `source` and collect its type declarations by wire name.
pub fn parse_types(source: &str) -> RpcResult<BTreeMap<String, TypeDescription>> {
    let file = syn::parse_file(source).map_err(|e| RpcError::Load(e.to_string()))?;
    let mut structs = Vec::new();
    collect(&file.items, &mut structs);

    // Struct ident -> wire name, for parents and property types.
    let mut names = BTreeMap::new();
    for item in &structs {
        names.insert(item.ident.to_string(), wire_name(item)?);
    }

    let mut types = BTreeMap::new();
    for item in structs {
        let (name, ty) = read_struct(item, &names)?;
        types.insert(name, ty);
    }
    Ok(types)
}

fn collect<'a>(items: &'a [Item], structs: &mut Vec<&'a ItemStruct>) {
    for item in items {
        match item {
            Item::Mod(module) => {
                if let Some((_, nested)) = &module.content {
                    collect(nested, structs);
                }
            }
            Item::Struct(item) if derives_deserialize(&item.attrs) => structs.push(item),
            _ => {}
        }
    }
}

fn derives_deserialize(attrs: &[Attribute]) -> bool {
    let mut found = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta
                .path
                .segments
                .last()
                .is_some_and(|s| s.ident == "Deserialize")
            {
                found = true;
            }
            Ok(())
        });
    }
    found
}

#[derive(Default)]
struct SerdeAttrs {
    rename: Option<String>,
    default: bool,
    flatten: bool,
}

fn serde_attrs(attrs: &[Attribute]) -> RpcResult<SerdeAttrs> {
    let mut out = SerdeAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                out.rename = Some(lit.value());
            } else if meta.path.is_ident("default") {
                out.default = true;
                if meta.input.peek(syn::Token![=]) {
                    let _: LitStr = meta.value()?.parse()?;
                }
            } else if meta.path.is_ident("flatten") {
                out.flatten = true;
            } else if meta.input.peek(syn::Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            }
            Ok(())
        })
        .map_err(|e| RpcError::Load(e.to_string()))?;
    }
    Ok(out)
}

fn doc_lines(attrs: &[Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn wire_name(item: &ItemStruct) -> RpcResult<String> {
    Ok(serde_attrs(&item.attrs)?
        .rename
        .unwrap_or_else(|| item.ident.to_string()))
}

fn read_struct(
    item: &ItemStruct,
    names: &BTreeMap<String, String>,
) -> RpcResult<(String, TypeDescription)> {
    let name = wire_name(item)?;
    let mut ty = TypeDescription::new();

    let Fields::Named(fields) = &item.fields else {
        return Ok((name, ty));
    };

    for field in &fields.named {
        let Some(ident) = &field.ident else { continue };
        let attrs = serde_attrs(&field.attrs)?;

        if attrs.flatten {
            if let Some(signature) = doc_lines(&field.attrs)
                .iter()
                .find_map(|l| l.strip_prefix(INDEX_SIGNATURE_DOC))
            {
                ty.index_signature = Some(signature.trim_matches('`').to_string());
            } else if let Some((parent, _)) = last_segment(&field.ty) {
                ty.inherits_from = Some(names.get(&parent).cloned().unwrap_or(parent));
            }
            continue;
        }

        let wire = attrs
            .rename
            .unwrap_or_else(|| unraw(&ident.to_string()).to_string());
        let type_expr = if attrs.default {
            // Optional properties wrap their declared type in one `Option`.
            let inner = option_inner(&field.ty).unwrap_or(&field.ty);
            describe_type(inner, names)
        } else {
            describe_type(&field.ty, names)
        };
        ty.properties.insert(
            wire,
            PropertyDescription {
                type_expr,
                optional: attrs.default,
            },
        );
    }
    Ok((name, ty))
}

fn last_segment(ty: &Type) -> Option<(String, Vec<&Type>)> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    let args = match &segment.arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|a| match a {
                GenericArgument::Type(t) => Some(t),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Some((segment.ident.to_string(), args))
}

fn option_inner(ty: &Type) -> Option<&Type> {
    match last_segment(ty)? {
        (name, args) if name == "Option" && args.len() == 1 => Some(args[0]),
        _ => None,
    }
}

/// Canonical description form of a generated Rust type.
fn describe_type(ty: &Type, names: &BTreeMap<String, String>) -> String {
    if let Type::Tuple(t) = ty {
        if t.elems.is_empty() {
            return "null".to_string();
        }
    }
    let Some((name, args)) = last_segment(ty) else {
        return "any".to_string();
    };
    match (name.as_str(), args.as_slice()) {
        ("f64" | "f32" | "i64" | "i32" | "u64" | "u32", []) => "number".to_string(),
        ("String", []) => "string".to_string(),
        ("bool", []) => "boolean".to_string(),
        ("Value", []) => "any".to_string(),
        ("DelaySpec", []) => "DelaySpec".to_string(),
        ("Vec", [inner]) => {
            let inner = describe_type(inner, names);
            if inner.contains(" | ") {
                format!("({})[]", inner)
            } else {
                format!("{}[]", inner)
            }
        }
        ("HashMap" | "BTreeMap", [_, value]) => {
            format!("Record<string, {}>", describe_type(value, names))
        }
        ("Option", [inner]) => format!("{} | null", describe_type(inner, names)),
        ("Box", [inner]) => describe_type(inner, names),
        (other, _) => names.get(other).cloned().unwrap_or_else(|| other.to_string()),
    }
}
