// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RPC client and its lifecycle.
//!
//! ```text
//! Created ──start──► Started ◄──start── Stopped
//!                       └──────stop───────►┘
//!   any state ──destroy──► Destroyed (absorbing)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use mqrpc::{Connector, MemoryBroker};
//! use serde_json::json;
//!
//! # async fn example() -> mqrpc::RpcResult<()> {
//! let connector = Connector::in_process(MemoryBroker::new());
//! let client = connector.client("calculator")?;
//! client.start().await?;
//!
//! let sum: f64 = client
//!     .call_typed("CalculatorService", "add", vec![json!(1).into(), json!(2).into()])
//!     .await?;
//!
//! client.destroy().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::Options;
use crate::engine::CorrelationEngine;
use crate::error::{RpcError, RpcResult};
use crate::identity::{host_suffix, validate_base_name, ClientIdentity, IdRegistry, InProcessIds};
use crate::message::{CallArg, Response};
use crate::relay::{EventRelay, ObserverId};
use crate::schema::{ServiceDescription, DESCRIBE_METHOD};
use crate::transport::{TransportFactory, TransportHandle};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Lifecycle state of an [`RpcClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LifecycleState {
    Created,
    Started,
    Stopped,
    Destroyed,
}

/// Everything needed to build clients: a transport, an id registry and
/// options.
#[derive(Clone)]
pub struct Connector {
    transport: Arc<dyn TransportFactory>,
    ids: Arc<dyn IdRegistry>,
    options: Options,
}

impl Connector {
    pub fn new(
        transport: Arc<dyn TransportFactory>,
        ids: Arc<dyn IdRegistry>,
        options: Options,
    ) -> Self {
        Self {
            transport,
            ids,
            options,
        }
    }

    /// Connector using the process-global id table and default options.
    pub fn in_process(transport: impl TransportFactory + 'static) -> Self {
        Self::new(
            Arc::new(transport),
            Arc::new(InProcessIds::global()),
            Options::default(),
        )
    }

    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Construct a client in the `Created` state.
    ///
    /// Fails with [`RpcError::Construction`] on an invalid base name, when
    /// no process-local id is left, or when the transport refuses the
    /// endpoint. The id is given back in the latter case.
    pub fn client(&self, base_name: &str) -> RpcResult<RpcClient> {
        validate_base_name(base_name)?;
        let id = self
            .ids
            .acquire_id(base_name)
            .map_err(|e| RpcError::Construction(e.to_string()))?;
        let identity = ClientIdentity::new(base_name, id, host_suffix());

        let transport = match self.transport.create(&identity, &self.options) {
            Ok(transport) => transport,
            Err(e) => {
                if let Err(release) = self.ids.release_id(base_name, id) {
                    tracing::warn!(base_name, id, error = %release, "id release failed");
                }
                return Err(RpcError::Construction(e.to_string()));
            }
        };

        let relay = Arc::new(EventRelay::new());
        let engine = Arc::new(CorrelationEngine::new(
            identity.transport_name(),
            Arc::clone(&transport),
            Arc::clone(&relay),
        ));
        tracing::debug!(client = %identity.transport_name(), "client created");

        Ok(RpcClient {
            inner: Arc::new(ClientInner {
                identity,
                ids: Arc::clone(&self.ids),
                transport,
                engine,
                relay,
                state: Mutex::new(LifecycleState::Created),
                hooked: AtomicBool::new(false),
                ops: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// Construct and start a client wrapped in a typed stub.
    pub async fn stub<S: StubClient>(&self, base_name: &str) -> RpcResult<S> {
        let client = self.client(base_name)?;
        client.start().await?;
        Ok(S::from_client(client))
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

struct ClientInner {
    identity: ClientIdentity,
    ids: Arc<dyn IdRegistry>,
    transport: Arc<dyn TransportHandle>,
    engine: Arc<CorrelationEngine>,
    relay: Arc<EventRelay>,
    state: Mutex<LifecycleState>,
    /// Inbound callback installed (first start only)
    hooked: AtomicBool,
    /// Serializes start/stop/destroy
    ops: tokio::sync::Mutex<()>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if *self.state.get_mut() == LifecycleState::Destroyed {
            return;
        }
        tracing::debug!(client = %self.identity.transport_name(), "client dropped without destroy");
        self.transport.unsubscribe();
        self.engine.abandon_all();
        self.relay.clear();
        let _ = self
            .ids
            .release_id(self.identity.base_name(), self.identity.process_local_id());
    }
}

/// Client bound to one transport endpoint.
///
/// Cloning is cheap; clones share the same endpoint and lifecycle.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<ClientInner>,
}

impl RpcClient {
    pub fn identity(&self) -> &ClientIdentity {
        &self.inner.identity
    }

    /// Transport name of this client.
    pub fn name(&self) -> &str {
        self.inner.identity.transport_name()
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.lock()
    }

    fn ensure_alive(&self) -> RpcResult<()> {
        if self.state() == LifecycleState::Destroyed {
            return Err(RpcError::Shutdown);
        }
        Ok(())
    }

    /// Subscribe the correlation engine to inbound messages (first start
    /// only) and start the transport.
    pub async fn start(&self) -> RpcResult<()> {
        let _op = self.inner.ops.lock().await;
        match self.state() {
            LifecycleState::Destroyed => return Err(RpcError::Shutdown),
            LifecycleState::Started => return Ok(()),
            LifecycleState::Created | LifecycleState::Stopped => {}
        }

        if !self.inner.hooked.swap(true, Ordering::AcqRel) {
            let engine = Arc::downgrade(&self.inner.engine);
            self.inner.transport.on_message(Arc::new(move |frame| {
                if let Some(engine) = engine.upgrade() {
                    engine.on_message(frame);
                }
            }));
        }

        self.inner.transport.start().await?;
        *self.inner.state.lock() = LifecycleState::Started;
        tracing::info!(client = %self.name(), "client started");
        Ok(())
    }

    /// Suspend inbound consumption. Identity and pending calls are kept.
    pub async fn stop(&self) -> RpcResult<()> {
        let _op = self.inner.ops.lock().await;
        match self.state() {
            LifecycleState::Destroyed => return Err(RpcError::Shutdown),
            LifecycleState::Started => {}
            LifecycleState::Created | LifecycleState::Stopped => return Ok(()),
        }

        self.inner.transport.stop().await?;
        *self.inner.state.lock() = LifecycleState::Stopped;
        tracing::info!(client = %self.name(), "client stopped");
        Ok(())
    }

    /// Release everything the client holds. Idempotent.
    ///
    /// Broadcast subscriptions are dropped, pending calls are rejected with
    /// [`RpcError::Shutdown`], observers are cleared, the process-local id
    /// is released and the transport endpoint destroyed.
    pub async fn destroy(&self) -> RpcResult<()> {
        let _op = self.inner.ops.lock().await;
        {
            let mut state = self.inner.state.lock();
            if *state == LifecycleState::Destroyed {
                return Ok(());
            }
            *state = LifecycleState::Destroyed;
        }

        let inner = &self.inner;
        inner.transport.unsubscribe();
        let abandoned = inner.engine.abandon_all();
        inner.relay.clear();
        let released = inner
            .ids
            .release_id(inner.identity.base_name(), inner.identity.process_local_id());
        let destroyed = inner.transport.destroy().await;

        tracing::info!(client = %self.name(), abandoned, "client destroyed");
        released.and(destroyed)
    }

    /// Call `method` on `service`. See [`CorrelationEngine::call`].
    pub async fn call(&self, service: &str, method: &str, args: Vec<CallArg>) -> RpcResult<Value> {
        self.ensure_alive()?;
        self.inner.engine.call(service, method, args).await
    }

    pub async fn call_typed<T: DeserializeOwned>(
        &self,
        service: &str,
        method: &str,
        args: Vec<CallArg>,
    ) -> RpcResult<T> {
        self.ensure_alive()?;
        self.inner.engine.call_typed(service, method, args).await
    }

    /// Observe orphaned responses produced by `method`.
    pub fn on<F>(&self, method: &str, observer: F) -> RpcResult<ObserverId>
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        self.ensure_alive()?;
        Ok(self.inner.relay.on(method, observer))
    }

    pub fn off(&self, id: ObserverId) -> bool {
        self.inner.relay.off(id)
    }

    /// Subscribe to a broadcast channel. Dropped on destroy.
    pub fn subscribe<F>(&self, channel: &str, handler: F) -> RpcResult<()>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.ensure_alive()?;
        self.inner.transport.subscribe(channel, Arc::new(handler))
    }

    /// Calls awaiting a response.
    pub fn pending_calls(&self) -> usize {
        self.inner.engine.pending_count()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.relay.observer_count()
    }

    pub fn downgrade(&self) -> WeakClient {
        WeakClient {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("pending", &self.pending_calls())
            .finish()
    }
}

/// Non-owning client reference.
#[derive(Clone)]
pub struct WeakClient {
    inner: Weak<ClientInner>,
}

impl WeakClient {
    pub fn upgrade(&self) -> Option<RpcClient> {
        self.inner.upgrade().map(|inner| RpcClient { inner })
    }
}

/// Fixed interface of every typed client stub.
pub trait StubClient: Sized + Send + Sync {
    /// Service the stub talks to.
    const SERVICE_NAME: &'static str;

    fn from_client(client: RpcClient) -> Self;

    fn client(&self) -> &RpcClient;

    /// Fetch the service's own description.
    fn describe(&self) -> impl Future<Output = RpcResult<ServiceDescription>> + Send {
        async move {
            self.client()
                .call_typed(Self::SERVICE_NAME, DESCRIBE_METHOD, Vec::new())
                .await
        }
    }
}
