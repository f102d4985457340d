// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Call-correlation engine.
//!
//! Turns fire-and-forget queue messages into awaitable remote calls:
//!
//! ```text
//! call() ──► split trailing delay ──► transport.send() ──► pending[id]
//!                                                             │
//! inbound response ──► pending.remove(to) ──► settle caller ◄─┘
//!                              │
//!                              └─ no entry ──► EventRelay.emit(method)
//! ```
//!
//! Each pending entry is settled exactly once: by its response, by a
//! delivery failure reported by the transport, or by [`CorrelationEngine::abandon_all`].
//! Calls carry no timeout of their own; wrap them in
//! `tokio::time::timeout` when a bound is needed.
//!
//! # Thread Safety
//!
//! `send` and the pending insert happen under the dispatch gate. The
//! receive path takes the same gate before its lookup, so a response that
//! arrives before registration completes waits instead of being treated as
//! an orphan.

use crate::error::{RpcError, RpcResult};
use crate::message::{split_delay, CallArg, CorrelationId, Message, Request};
use crate::relay::EventRelay;
use crate::transport::{DeliveryFailure, InboundFrame, TransportHandle};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;

/// Event name for orphaned responses whose request was not echoed.
pub const ORPHAN_EVENT: &str = "orphan";

type Completion = oneshot::Sender<RpcResult<Value>>;

/// Outstanding remote call.
struct PendingCall {
    service: String,
    method: String,
    created_at: Instant,
    completion: Completion,
}

/// Pending-call registry bound to one client's transport handle.
pub struct CorrelationEngine {
    /// Transport name of the owning client
    from: String,

    transport: Arc<dyn TransportHandle>,

    /// Receives responses that match no pending call
    relay: Arc<EventRelay>,

    pending: Arc<DashMap<CorrelationId, PendingCall>>,

    gate: Arc<Mutex<()>>,

    closed: AtomicBool,
}

impl CorrelationEngine {
    pub fn new(
        from: impl Into<String>,
        transport: Arc<dyn TransportHandle>,
        relay: Arc<EventRelay>,
    ) -> Self {
        Self {
            from: from.into(),
            transport,
            relay,
            pending: Arc::new(DashMap::new()),
            gate: Arc::new(Mutex::new(())),
            closed: AtomicBool::new(false),
        }
    }

    /// Call `method` on `service` and wait for its response.
    ///
    /// A trailing [`CallArg::Delay`] becomes the delivery delay. Resolves
    /// with the response `data` (JSON `null` when absent) or fails with
    /// [`RpcError::Remote`] carrying the response `error`.
    pub async fn call(&self, service: &str, method: &str, args: Vec<CallArg>) -> RpcResult<Value> {
        let completion = self.dispatch(service, method, args)?;
        completion.await.unwrap_or(Err(RpcError::Shutdown))
    }

    /// Like [`call`](Self::call), deserializing the result into `T`.
    pub async fn call_typed<T: DeserializeOwned>(
        &self,
        service: &str,
        method: &str,
        args: Vec<CallArg>,
    ) -> RpcResult<T> {
        let value = self.call(service, method, args).await?;
        Ok(serde_json::from_value(value)?)
    }

    fn dispatch(
        &self,
        service: &str,
        method: &str,
        args: Vec<CallArg>,
    ) -> RpcResult<oneshot::Receiver<RpcResult<Value>>> {
        let (args, delay_ms) = split_delay(args);
        let request = Request {
            from: self.from.clone(),
            to: service.to_string(),
            method: method.to_string(),
            args,
        };
        let (tx, rx) = oneshot::channel();

        let _gate = self.gate.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(RpcError::Shutdown);
        }

        let id = self.transport.send(
            service,
            Message::Request(request),
            delay_ms,
            self.failure_hook(),
        )?;
        tracing::debug!(
            client = %self.from,
            service,
            method,
            correlation_id = %id,
            delay_ms,
            "call dispatched"
        );
        self.pending.insert(
            id,
            PendingCall {
                service: service.to_string(),
                method: method.to_string(),
                created_at: Instant::now(),
                completion: tx,
            },
        );
        Ok(rx)
    }

    fn failure_hook(&self) -> DeliveryFailure {
        let pending = Arc::clone(&self.pending);
        let gate = Arc::clone(&self.gate);
        Box::new(move |id, reason| {
            let entry = {
                let _gate = gate.lock();
                pending.remove(&id)
            };
            if let Some((_, call)) = entry {
                tracing::warn!(
                    service = %call.service,
                    method = %call.method,
                    correlation_id = %id,
                    %reason,
                    "delivery failed"
                );
                let _ = call.completion.send(Err(RpcError::Transport(reason)));
            }
        })
    }

    /// Match an inbound frame against the pending registry.
    ///
    /// Unmatched responses go to the event relay under the echoed request's
    /// method name, or [`ORPHAN_EVENT`] when the transport kept no request.
    pub fn on_message(&self, frame: InboundFrame) {
        let InboundFrame { response, request } = frame;
        let entry = {
            let _gate = self.gate.lock();
            self.pending.remove(&response.to)
        };

        match entry {
            Some((id, call)) => {
                let outcome = match response.error {
                    Some(error) => Err(RpcError::Remote(error)),
                    None => Ok(response.data.unwrap_or(Value::Null)),
                };
                tracing::debug!(
                    client = %self.from,
                    method = %call.method,
                    correlation_id = %id,
                    ok = outcome.is_ok(),
                    elapsed_ms = call.created_at.elapsed().as_millis() as u64,
                    "call settled"
                );
                if call.completion.send(outcome).is_err() {
                    tracing::trace!(correlation_id = %id, "caller stopped waiting");
                }
            }
            None => {
                let event = request
                    .as_ref()
                    .map_or(ORPHAN_EVENT, |r| r.method.as_str());
                let observers = self.relay.emit(event, &response);
                tracing::debug!(
                    client = %self.from,
                    event,
                    correlation_id = %response.to,
                    observers,
                    "orphaned response relayed"
                );
            }
        }
    }

    /// Reject every pending call with [`RpcError::Shutdown`] and refuse new
    /// ones. Returns the number of calls rejected.
    pub fn abandon_all(&self) -> usize {
        let _gate = self.gate.lock();
        self.closed.store(true, Ordering::Release);

        let ids: Vec<CorrelationId> = self.pending.iter().map(|e| e.key().clone()).collect();
        let mut abandoned = 0;
        for id in ids {
            if let Some((_, call)) = self.pending.remove(&id) {
                let _ = call.completion.send(Err(RpcError::Shutdown));
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            tracing::info!(client = %self.from, abandoned, "pending calls abandoned");
        }
        abandoned
    }

    /// Number of calls awaiting settlement.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Transport name used as the `from` field of outgoing requests.
    pub fn from(&self) -> &str {
        &self.from
    }
}

impl std::fmt::Debug for CorrelationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationEngine")
            .field("from", &self.from)
            .field("pending", &self.pending.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
