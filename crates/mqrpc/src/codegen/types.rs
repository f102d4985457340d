// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type expressions found in service descriptions.
//!
//! Grammar (TypeScript-like):
//!
//! ```text
//! union   := postfix ('|' postfix)*
//! postfix := primary ('[' ']')*
//! primary := ident ('<' union (',' union)* '>')?
//!          | string-literal | number-literal
//!          | '(' union ')'
//! ```
//!
//! Anything outside the grammar (object literals, function types, unknown
//! generics) is kept as [`TypeExpr::Opaque`] and maps to a dynamic value.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Number,
    String,
    Boolean,
    /// `any`, `unknown`
    Any,
    /// `void`, `undefined`
    Void,
    Null,
    Object,
    /// `Delay` / `DelaySpec`
    Delay,
    Array(Box<TypeExpr>),
    /// `Record<string, T>`
    Map(Box<TypeExpr>),
    Promise(Box<TypeExpr>),
    /// `T | null` / `T | undefined`
    Nullable(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Named(String),
    Opaque(String),
}

impl TypeExpr {
    /// Parse `raw`, falling back to [`TypeExpr::Opaque`] on anything the
    /// grammar does not cover.
    pub fn parse(raw: &str) -> Self {
        let tokens = match tokenize(raw) {
            Some(tokens) if !tokens.is_empty() => tokens,
            _ => return Self::Opaque(raw.trim().to_string()),
        };
        let mut parser = Parser { tokens, pos: 0 };
        match parser.union() {
            Some(expr) if parser.pos == parser.tokens.len() => expr,
            _ => Self::Opaque(raw.trim().to_string()),
        }
    }

    /// True for a delay, optional or not.
    pub fn is_delay(&self) -> bool {
        match self {
            Self::Delay => true,
            Self::Nullable(inner) => inner.is_delay(),
            _ => false,
        }
    }

    /// Drop one outer `Promise<..>`.
    pub fn without_promise(self) -> Self {
        match self {
            Self::Promise(inner) => *inner,
            other => other,
        }
    }
}

/// Strip one outer `Promise<...>` from a raw type expression.
pub fn strip_promise(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed
        .strip_prefix("Promise")
        .map(str::trim_start)
        .and_then(|s| s.strip_prefix('<'))
        .and_then(|s| s.strip_suffix('>'))
    else {
        return trimmed;
    };

    // `Promise<A> | Promise<B>` must stay intact.
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth < 0 {
                    return trimmed;
                }
            }
            _ => {}
        }
    }
    if depth == 0 {
        inner.trim()
    } else {
        trimmed
    }
}

fn needs_parens(expr: &TypeExpr) -> bool {
    matches!(expr, TypeExpr::Union(_) | TypeExpr::Nullable(_))
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => f.write_str("number"),
            Self::String => f.write_str("string"),
            Self::Boolean => f.write_str("boolean"),
            Self::Any => f.write_str("any"),
            Self::Void => f.write_str("void"),
            Self::Null => f.write_str("null"),
            Self::Object => f.write_str("object"),
            Self::Delay => f.write_str("DelaySpec"),
            Self::Array(inner) if needs_parens(inner) => write!(f, "({})[]", inner),
            Self::Array(inner) => write!(f, "{}[]", inner),
            Self::Map(inner) => write!(f, "Record<string, {}>", inner),
            Self::Promise(inner) => write!(f, "Promise<{}>", inner),
            Self::Nullable(inner) => write!(f, "{} | null", inner),
            Self::Union(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", m)?;
                }
                Ok(())
            }
            Self::Named(name) => f.write_str(name),
            Self::Opaque(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str,
    Num,
    Punct(char),
}

fn tokenize(raw: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = raw.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let mut ident = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' || c == '$' || c == '.' {
                    ident.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(ident));
        } else if c.is_ascii_digit() || c == '-' {
            chars.next();
            while chars
                .peek()
                .is_some_and(|c| c.is_ascii_digit() || *c == '.')
            {
                chars.next();
            }
            tokens.push(Token::Num);
        } else if c == '"' || c == '\'' || c == '`' {
            chars.next();
            let mut closed = false;
            while let Some(n) = chars.next() {
                if n == '\\' {
                    chars.next();
                } else if n == c {
                    closed = true;
                    break;
                }
            }
            if !closed {
                return None;
            }
            tokens.push(Token::Str);
        } else if "<>[](),|".contains(c) {
            chars.next();
            tokens.push(Token::Punct(c));
        } else {
            return None;
        }
    }
    Some(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn union(&mut self) -> Option<TypeExpr> {
        // Leading `|` is legal in TypeScript.
        self.eat('|');
        let mut members = vec![self.postfix()?];
        while self.eat('|') {
            members.push(self.postfix()?);
        }
        Some(normalize_union(members))
    }

    fn postfix(&mut self) -> Option<TypeExpr> {
        let mut expr = self.primary()?;
        while self.peek() == Some(&Token::Punct('[')) {
            self.pos += 1;
            if !self.eat(']') {
                return None;
            }
            expr = TypeExpr::Array(Box::new(expr));
        }
        Some(expr)
    }

    fn primary(&mut self) -> Option<TypeExpr> {
        let token = self.peek()?.clone();
        self.pos += 1;
        match token {
            Token::Str => Some(TypeExpr::String),
            Token::Num => Some(TypeExpr::Number),
            Token::Punct('(') => {
                let inner = self.union()?;
                self.eat(')').then_some(inner)
            }
            Token::Ident(name) => {
                let args = if self.eat('<') {
                    let mut args = vec![self.union()?];
                    while self.eat(',') {
                        args.push(self.union()?);
                    }
                    if !self.eat('>') {
                        return None;
                    }
                    args
                } else {
                    Vec::new()
                };
                Some(resolve_ident(&name, args))
            }
            Token::Punct(_) => None,
        }
    }
}

fn resolve_ident(name: &str, mut args: Vec<TypeExpr>) -> TypeExpr {
    match (name, args.len()) {
        ("number" | "bigint", 0) => TypeExpr::Number,
        ("string", 0) => TypeExpr::String,
        ("boolean" | "true" | "false", 0) => TypeExpr::Boolean,
        ("any" | "unknown", 0) => TypeExpr::Any,
        ("void" | "undefined" | "never", 0) => TypeExpr::Void,
        ("null", 0) => TypeExpr::Null,
        ("object" | "Object", 0) => TypeExpr::Object,
        ("Delay" | "DelaySpec", 0) => TypeExpr::Delay,
        ("Array" | "ReadonlyArray", 1) => TypeExpr::Array(Box::new(args.remove(0))),
        ("Promise", 1) => TypeExpr::Promise(Box::new(args.remove(0))),
        ("Record", 2) if matches!(args[0], TypeExpr::String | TypeExpr::Number) => {
            TypeExpr::Map(Box::new(args.remove(1)))
        }
        (_, 0) => TypeExpr::Named(name.to_string()),
        _ => {
            let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
            TypeExpr::Opaque(format!("{}<{}>", name, rendered.join(", ")))
        }
    }
}

fn normalize_union(members: Vec<TypeExpr>) -> TypeExpr {
    if members.len() == 1 {
        return members.into_iter().next().unwrap_or(TypeExpr::Any);
    }

    let total = members.len();
    let mut kept: Vec<TypeExpr> = Vec::with_capacity(total);
    for m in members {
        if !matches!(m, TypeExpr::Null | TypeExpr::Void) && !kept.contains(&m) {
            kept.push(m);
        }
    }
    let nullable = kept.len() < total;

    let core = match kept.len() {
        0 => return TypeExpr::Null,
        1 => kept.remove(0),
        _ => TypeExpr::Union(kept),
    };
    if nullable {
        TypeExpr::Nullable(Box::new(core))
    } else {
        core
    }
}
