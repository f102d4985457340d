// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Identifier derivation for generated clients.

const SERVICE_SUFFIX: &str = "Service";
const CLIENT_SUFFIX: &str = "Client";

/// `CalculatorService` -> `CalculatorClient`, `Calc` -> `CalcClient`.
pub fn client_type_name(service: &str) -> String {
    match service.strip_suffix(SERVICE_SUFFIX) {
        Some(stem) => format!("{}{}", stem, CLIENT_SUFFIX),
        None => format!("{}{}", service, CLIENT_SUFFIX),
    }
}

/// Client type name with its first character lower-cased
/// (`CalculatorService` -> `calculatorClient`).
pub fn module_name(service: &str) -> String {
    let client = client_type_name(service);
    let mut chars = client.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => client,
    }
}

/// `firstName` -> `first_name`, `HTTPServer` -> `http_server`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            out.push('_');
            continue;
        }
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

const STRICT_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
    "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where", "while",
    "abstract", "become", "box", "do", "final", "macro", "override", "priv", "try", "typeof",
    "unsized", "virtual", "yield", "gen",
];

// Cannot be raw identifiers.
const RESERVED: &[&str] = &["self", "Self", "super", "crate", "_"];

/// Make `name` a valid Rust identifier, escaping keywords.
pub fn rust_ident(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if RESERVED.contains(&ident.as_str()) {
        ident.push('_');
        ident
    } else if STRICT_KEYWORDS.contains(&ident.as_str()) {
        format!("r#{}", ident)
    } else {
        ident
    }
}

/// Field or parameter identifier for a description name.
pub fn field_ident(name: &str) -> String {
    rust_ident(&snake_case(name))
}

/// Type identifier for a description type name.
pub fn type_ident(name: &str) -> String {
    let ident = rust_ident(name);
    if ident.starts_with("r#") {
        return format!("{}_", &ident[2..]);
    }
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => ident,
    }
}

/// Name as written on the wire, for an identifier produced by this module.
pub fn unraw(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}
