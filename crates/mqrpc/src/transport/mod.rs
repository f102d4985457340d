// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport abstraction.
//!
//! The message-queue transport is an external collaborator: it owns
//! delivery, persistence and pub/sub semantics. This module only fixes the
//! contract the client runtime relies on, so any queue can be plugged in by
//! implementing [`TransportFactory`] and [`TransportHandle`].
//!
//! # Integration
//!
//! ```ignore
//! impl TransportFactory for MyQueue {
//!     fn create(&self, identity: &ClientIdentity, options: &Options)
//!         -> RpcResult<Arc<dyn TransportHandle>> {
//!         // open a consumer for identity.transport_name() ...
//!     }
//! }
//! ```
//!
//! # Callback discipline
//!
//! Implementations must never invoke the inbound callback or a
//! delivery-failure callback synchronously from inside [`TransportHandle::send`]:
//! the correlation engine holds its dispatch gate across `send`.

pub mod memory;

pub use memory::{Delivery, MemoryBroker};

use crate::config::Options;
use crate::error::RpcResult;
use crate::identity::ClientIdentity;
use crate::message::{CorrelationId, Message, Request, Response};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Inbound response frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub response: Response,
    /// Original request echoed by the transport, when it kept one. Used to
    /// key orphaned responses by method name.
    pub request: Option<Request>,
}

impl InboundFrame {
    pub fn new(response: Response, request: Option<Request>) -> Self {
        Self { response, request }
    }
}

/// Callback receiving inbound frames.
pub type InboundHandler = Arc<dyn Fn(InboundFrame) + Send + Sync>;

/// Callback receiving broadcast payloads.
pub type BroadcastHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Called at most once when a sent message turns out to be undeliverable.
pub type DeliveryFailure = Box<dyn FnOnce(CorrelationId, String) + Send>;

/// Per-client transport handle.
#[async_trait]
pub trait TransportHandle: Send + Sync {
    /// Hand `message` to the transport for delivery to `destination` after
    /// `delay_ms`. Returns the correlation id assigned to it.
    fn send(
        &self,
        destination: &str,
        message: Message,
        delay_ms: u64,
        on_delivery_failure: DeliveryFailure,
    ) -> RpcResult<CorrelationId>;

    /// Install the inbound frame callback (replaces any previous one).
    fn on_message(&self, callback: InboundHandler);

    /// Subscribe to a broadcast channel.
    fn subscribe(&self, channel: &str, handler: BroadcastHandler) -> RpcResult<()>;

    /// Drop every broadcast subscription of this handle.
    fn unsubscribe(&self);

    /// Begin (or resume) consuming inbound frames.
    async fn start(&self) -> RpcResult<()>;

    /// Suspend consumption. Undelivered frames stay queued.
    async fn stop(&self) -> RpcResult<()>;

    /// Release the endpoint. Idempotent.
    async fn destroy(&self) -> RpcResult<()>;
}

/// Creates transport handles for client identities.
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        identity: &ClientIdentity,
        options: &Options,
    ) -> RpcResult<Arc<dyn TransportHandle>>;
}
