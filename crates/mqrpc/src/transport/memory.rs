// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process memory broker.
//!
//! Routes requests to attached services and responses back to the caller
//! that sent the matching request. It is a single-process stand-in for a
//! real message queue: nothing is persisted and queues die with the broker.
//!
//! # Architecture
//!
//! ```text
//! MemoryBroker (cheap to clone)
//! +-- endpoints: DashMap<name, Endpoint>     client inboxes and service queues
//! +-- requests:  DashMap<CorrelationId, Request>  in-flight, echoed on reply
//! +-- channels:  DashMap<channel, Vec<Subscription>>
//! ```
//!
//! Correlation ids are decimal sequence numbers, unique per broker.

use super::{
    BroadcastHandler, DeliveryFailure, InboundFrame, InboundHandler, TransportFactory,
    TransportHandle,
};
use crate::config::Options;
use crate::error::{RpcError, RpcResult};
use crate::identity::ClientIdentity;
use crate::message::{CorrelationId, Message, Request, Response};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A request as seen by an attached service.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Correlation id to answer with.
    pub id: CorrelationId,
    pub request: Request,
}

enum Sink {
    Client(mpsc::UnboundedSender<InboundFrame>),
    Service(mpsc::UnboundedSender<Delivery>),
}

struct Endpoint {
    owner: u64,
    sink: Sink,
}

struct Subscription {
    owner: u64,
    handler: BroadcastHandler,
}

#[derive(Default)]
struct BrokerState {
    endpoints: DashMap<String, Endpoint>,
    requests: DashMap<CorrelationId, Request>,
    channels: DashMap<String, Vec<Subscription>>,
    next_id: AtomicU64,
    next_owner: AtomicU64,
}

impl BrokerState {
    fn next_correlation_id(&self) -> CorrelationId {
        CorrelationId::new((self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string())
    }

    fn next_owner(&self) -> u64 {
        self.next_owner.fetch_add(1, Ordering::Relaxed)
    }

    fn route(&self, id: &CorrelationId, destination: &str, message: Message) -> Result<(), String> {
        let endpoint = self
            .endpoints
            .get(destination)
            .ok_or_else(|| format!("no route to `{}`", destination))?;

        match (message, &endpoint.sink) {
            (Message::Request(request), Sink::Service(tx)) => {
                self.requests.insert(id.clone(), request.clone());
                let delivery = Delivery {
                    id: id.clone(),
                    request,
                };
                tx.send(delivery).map_err(|_| {
                    self.requests.remove(id);
                    format!("service `{}` stopped consuming", destination)
                })
            }
            (Message::Response(response), Sink::Client(tx)) => tx
                .send(InboundFrame::new(response, None))
                .map_err(|_| format!("client `{}` stopped consuming", destination)),
            (Message::Request(_), Sink::Client(_)) => {
                Err(format!("`{}` is a client endpoint, not a service", destination))
            }
            (Message::Response(_), Sink::Service(_)) => {
                Err(format!("`{}` is a service endpoint, not a client", destination))
            }
        }
    }

    fn remove_endpoint(&self, name: &str, owner: u64) {
        self.endpoints.remove_if(name, |_, ep| ep.owner == owner);
    }

    fn unsubscribe(&self, owner: u64) {
        self.channels.retain(|_, subs| {
            subs.retain(|s| s.owner != owner);
            !subs.is_empty()
        });
    }
}

/// In-process message broker implementing [`TransportFactory`].
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<BrokerState>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service queue and return its receiving end.
    pub fn attach(&self, service: &str) -> RpcResult<mpsc::UnboundedReceiver<Delivery>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let owner = self.state.next_owner();
        match self.state.endpoints.entry(service.to_string()) {
            Entry::Occupied(_) => Err(RpcError::Transport(format!(
                "endpoint `{}` already registered",
                service
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Endpoint {
                    owner,
                    sink: Sink::Service(tx),
                });
                tracing::debug!(service, "service attached to memory broker");
                Ok(rx)
            }
        }
    }

    /// Remove an endpoint by name. Returns false if none was registered.
    pub fn detach(&self, name: &str) -> bool {
        self.state.endpoints.remove(name).is_some()
    }

    /// Attach `service` and answer every request with `handler`.
    ///
    /// `Ok` becomes the response `data`, `Err` the response `error`. The
    /// returned task runs until the service is detached.
    pub fn serve<F>(&self, service: &str, handler: F) -> RpcResult<JoinHandle<()>>
    where
        F: Fn(&Request) -> Result<Value, Value> + Send + Sync + 'static,
    {
        let mut rx = self.attach(service)?;
        let broker = self.clone();
        Ok(tokio::spawn(async move {
            while let Some(delivery) = rx.recv().await {
                let response = match handler(&delivery.request) {
                    Ok(data) => Response::success(delivery.id, data),
                    Err(error) => Response::failure(delivery.id, error),
                };
                if let Err(e) = broker.respond(response) {
                    tracing::debug!(error = %e, "response not routed");
                }
            }
        }))
    }

    /// Route a response to the client that sent the request it answers.
    ///
    /// The original request is echoed alongside the response.
    pub fn respond(&self, response: Response) -> RpcResult<()> {
        let (_, request) = self.state.requests.remove(&response.to).ok_or_else(|| {
            RpcError::Transport(format!("no in-flight request `{}`", response.to))
        })?;
        let from = request.from.clone();
        self.deliver(&from, InboundFrame::new(response, Some(request)))
    }

    /// Push a raw frame into a client inbox.
    pub fn deliver(&self, endpoint: &str, frame: InboundFrame) -> RpcResult<()> {
        let target = self
            .state
            .endpoints
            .get(endpoint)
            .ok_or_else(|| RpcError::Transport(format!("no route to `{}`", endpoint)))?;
        match &target.sink {
            Sink::Client(tx) => tx
                .send(frame)
                .map_err(|_| RpcError::Transport(format!("client `{}` is gone", endpoint))),
            Sink::Service(_) => Err(RpcError::Transport(format!(
                "`{}` is a service endpoint, not a client",
                endpoint
            ))),
        }
    }

    /// Broadcast `payload` on `channel`. Returns the number of handlers run.
    pub fn publish(&self, channel: &str, payload: &Value) -> usize {
        let handlers: Vec<BroadcastHandler> = self
            .state
            .channels
            .get(channel)
            .map(|subs| subs.iter().map(|s| Arc::clone(&s.handler)).collect())
            .unwrap_or_default();
        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    pub fn has_endpoint(&self, name: &str) -> bool {
        self.state.endpoints.contains_key(name)
    }

    /// Registered endpoint names, sorted.
    pub fn endpoint_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .endpoints
            .iter()
            .map(|e| e.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Total broadcast subscriptions across all channels.
    pub fn subscription_count(&self) -> usize {
        self.state.channels.iter().map(|c| c.value().len()).sum()
    }

    /// Requests delivered to a service and not answered yet.
    pub fn in_flight(&self) -> usize {
        self.state.requests.len()
    }
}

impl TransportFactory for MemoryBroker {
    fn create(
        &self,
        identity: &ClientIdentity,
        _options: &Options,
    ) -> RpcResult<Arc<dyn TransportHandle>> {
        let name = identity.transport_name().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let owner = self.state.next_owner();

        match self.state.endpoints.entry(name.clone()) {
            Entry::Occupied(_) => {
                return Err(RpcError::Transport(format!(
                    "endpoint `{}` already registered",
                    name
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(Endpoint {
                    owner,
                    sink: Sink::Client(tx),
                });
            }
        }

        Ok(Arc::new(MemoryHandle {
            state: Arc::clone(&self.state),
            name,
            owner,
            inbox: Arc::new(tokio::sync::Mutex::new(rx)),
            callback: Arc::new(RwLock::new(None)),
            pump: Mutex::new(None),
            destroyed: AtomicBool::new(false),
        }))
    }
}

/// Client-side handle on a [`MemoryBroker`].
struct MemoryHandle {
    state: Arc<BrokerState>,
    name: String,
    owner: u64,
    inbox: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<InboundFrame>>>,
    callback: Arc<RwLock<Option<InboundHandler>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl MemoryHandle {
    fn ensure_alive(&self) -> RpcResult<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(RpcError::Transport(format!(
                "endpoint `{}` is destroyed",
                self.name
            )));
        }
        Ok(())
    }

    async fn halt_pump(&self) {
        let pump = self.pump.lock().take();
        if let Some(pump) = pump {
            pump.abort();
            let _ = pump.await;
        }
    }
}

#[async_trait]
impl TransportHandle for MemoryHandle {
    fn send(
        &self,
        destination: &str,
        message: Message,
        delay_ms: u64,
        on_delivery_failure: DeliveryFailure,
    ) -> RpcResult<CorrelationId> {
        self.ensure_alive()?;
        let id = self.state.next_correlation_id();

        if delay_ms == 0 {
            if let Err(reason) = self.state.route(&id, destination, message) {
                let failed = id.clone();
                tokio::spawn(async move { on_delivery_failure(failed, reason) });
            }
        } else {
            let state = Arc::clone(&self.state);
            let destination = destination.to_string();
            let delayed = id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                if let Err(reason) = state.route(&delayed, &destination, message) {
                    on_delivery_failure(delayed, reason);
                }
            });
        }

        tracing::trace!(endpoint = %self.name, destination, correlation_id = %id, delay_ms, "queued");
        Ok(id)
    }

    fn on_message(&self, callback: InboundHandler) {
        *self.callback.write() = Some(callback);
    }

    fn subscribe(&self, channel: &str, handler: BroadcastHandler) -> RpcResult<()> {
        self.ensure_alive()?;
        self.state
            .channels
            .entry(channel.to_string())
            .or_default()
            .push(Subscription {
                owner: self.owner,
                handler,
            });
        Ok(())
    }

    fn unsubscribe(&self) {
        self.state.unsubscribe(self.owner);
    }

    async fn start(&self) -> RpcResult<()> {
        self.ensure_alive()?;
        let mut pump = self.pump.lock();
        if pump.as_ref().is_some_and(|p| !p.is_finished()) {
            return Ok(());
        }

        let inbox = Arc::clone(&self.inbox);
        let callback = Arc::clone(&self.callback);
        let name = self.name.clone();
        *pump = Some(tokio::spawn(async move {
            let mut inbox = inbox.lock().await;
            while let Some(frame) = inbox.recv().await {
                let handler = callback.read().clone();
                match handler {
                    Some(handler) => handler(frame),
                    None => tracing::warn!(endpoint = %name, "inbound frame dropped: no handler"),
                }
            }
        }));
        Ok(())
    }

    async fn stop(&self) -> RpcResult<()> {
        self.ensure_alive()?;
        self.halt_pump().await;
        Ok(())
    }

    async fn destroy(&self) -> RpcResult<()> {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.halt_pump().await;
        self.state.unsubscribe(self.owner);
        self.state.remove_endpoint(&self.name, self.owner);
        *self.callback.write() = None;
        Ok(())
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        if !self.destroyed.load(Ordering::Acquire) {
            if let Some(pump) = self.pump.get_mut().take() {
                pump.abort();
            }
            self.state.unsubscribe(self.owner);
            self.state.remove_endpoint(&self.name, self.owner);
        }
    }
}
