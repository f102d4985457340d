// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! mqrpc: request/response calls over message-queue transports.
//!
//! Turns fire-and-forget queue messages into correlated, awaitable remote
//! calls, and builds typed clients for remote services from the description
//! they publish about themselves.
//!
//! # Features
//!
//! - **Correlation** -- every call is matched to its response by the id the
//!   transport assigns; unmatched responses reach observers by method name
//! - **Deferred delivery** -- a trailing [`DelaySpec`] argument delays a call
//! - **Lifecycle** -- start/stop/destroy with explicit process shutdown
//!   supervision
//! - **Stub synthesis** -- service description to Rust (or TypeScript) client
//!   source, plus an in-process [`DynamicClient`]
//!
//! # Architecture
//!
//! ```text
//! RpcClient
//! +-- CorrelationEngine   (pending calls keyed by correlation id)
//! +-- EventRelay          (observers for orphaned responses)
//! +-- TransportHandle     (pluggable queue endpoint)
//!
//! create_client(name)
//! +-- fetch        (transient `<name>.describe` probe)
//! +-- codegen      (ClientIr -> Emitter)
//! +-- loader       (persist, verify, method table)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use mqrpc::{create_client, Connector, MemoryBroker};
//! use serde_json::json;
//!
//! # async fn example() -> mqrpc::RpcResult<()> {
//! let connector = Connector::in_process(MemoryBroker::new());
//! let created = create_client(&connector, "CalculatorService").await?;
//! if let Some(calc) = created.client {
//!     let sum = calc.invoke("add", vec![json!(1).into(), json!(2).into()]).await?;
//!     println!("{}", sum);
//!     calc.client().destroy().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codegen;
pub mod config;
pub mod create;
pub mod delay;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod identity;
pub mod loader;
pub mod message;
pub mod relay;
pub mod schema;
pub mod shutdown;
pub mod transport;

pub use client::{Connector, LifecycleState, RpcClient, StubClient, WeakClient};
pub use codegen::{synthesize, ClientIr, Emitter, RustEmitter, TypeScriptEmitter};
pub use config::Options;
pub use create::{create_client, CreatedClient};
pub use delay::{to_milliseconds, DelaySpec, DelayUnit};
pub use engine::{CorrelationEngine, ORPHAN_EVENT};
pub use error::{RpcError, RpcResult};
pub use fetcher::fetch;
pub use identity::{ClientIdentity, FileIds, IdRegistry, InProcessIds};
pub use loader::{load, ClientConstructor, DynamicClient, GeneratedClientArtifact, MethodTable};
pub use message::{CallArg, CorrelationId, Message, Request, Response};
pub use relay::{EventRelay, ObserverId};
pub use schema::{ServiceDescription, DESCRIBE_METHOD};
pub use shutdown::{ShutdownSignal, ShutdownSupervisor};
pub use transport::{MemoryBroker, TransportFactory, TransportHandle};

// Generated clients reach serde through these.
pub use serde;
pub use serde_json;
