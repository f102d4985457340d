// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stub synthesis.
//!
//! ```text
//! ServiceDescription ──► ClientIr ──► Emitter ──► source text
//!                                       ├─ RustEmitter        (.rs)
//!                                       └─ TypeScriptEmitter  (.d.ts)
//! ```

pub mod ir;
pub mod naming;
pub mod parse;
pub mod rust;
pub mod types;
pub mod typescript;

pub use ir::{ClientIr, DelayParam, FieldIr, IndexSignature, MethodIr, ParamIr, TypeIr, TypeRef};
pub use parse::parse_types;
pub use rust::RustEmitter;
pub use types::{strip_promise, TypeExpr};
pub use typescript::TypeScriptEmitter;

use crate::error::RpcResult;
use crate::schema::ServiceDescription;

/// Renders a [`ClientIr`] into source text for one target language.
pub trait Emitter {
    /// File extension of emitted sources, without the leading dot.
    fn extension(&self) -> &'static str;

    fn emit(&self, ir: &ClientIr) -> RpcResult<String>;
}

/// Rust client source for `desc`. Pure and deterministic.
pub fn synthesize(desc: &ServiceDescription) -> String {
    RustEmitter.render(&ClientIr::from_description(desc))
}
