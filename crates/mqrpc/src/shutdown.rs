// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process shutdown supervision.
//!
//! Clients do not install signal handlers themselves. The application owns
//! one [`ShutdownSupervisor`], registers its clients with it, and either
//! calls [`ShutdownSupervisor::shutdown`] on normal exit or lets
//! [`ShutdownSupervisor::run`] wait for a termination signal.

use crate::client::{RpcClient, WeakClient};
use crate::error::RpcResult;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Time allowed between a termination signal and process exit.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(500);

/// Termination signal that triggered a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT / Ctrl-C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGHUP
    Hangup,
    /// Windows Ctrl-Break
    Break,
}

impl ShutdownSignal {
    /// Conventional `128 + signo` exit status.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Interrupt | Self::Break => 130,
            Self::Terminate => 143,
            Self::Hangup => 129,
        }
    }
}

/// Destroys registered clients on shutdown.
pub struct ShutdownSupervisor {
    clients: Mutex<Vec<WeakClient>>,
    grace: Duration,
}

impl Default for ShutdownSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSupervisor {
    pub fn new() -> Self {
        Self::with_grace(DEFAULT_GRACE)
    }

    pub fn with_grace(grace: Duration) -> Self {
        Self {
            clients: Mutex::new(Vec::new()),
            grace,
        }
    }

    /// Track `client`. The supervisor does not keep it alive.
    pub fn register(&self, client: &RpcClient) {
        let mut clients = self.clients.lock();
        clients.retain(|c| c.upgrade().is_some());
        clients.push(client.downgrade());
    }

    /// Registered clients that are still alive.
    pub fn registered(&self) -> usize {
        self.clients
            .lock()
            .iter()
            .filter(|c| c.upgrade().is_some())
            .count()
    }

    /// Destroy every registered client. Returns how many were destroyed.
    pub async fn shutdown(&self) -> usize {
        let clients: Vec<RpcClient> = std::mem::take(&mut *self.clients.lock())
            .iter()
            .filter_map(WeakClient::upgrade)
            .collect();

        let mut destroyed = 0;
        for client in &clients {
            match client.destroy().await {
                Ok(()) => destroyed += 1,
                Err(e) => tracing::warn!(client = %client.name(), error = %e, "destroy failed"),
            }
        }
        tracing::info!(destroyed, "shutdown complete");
        destroyed
    }

    /// Wait for a termination signal, then destroy every client within the
    /// grace window. Returns once the window has elapsed.
    pub async fn run_until_signal(&self) -> RpcResult<ShutdownSignal> {
        let signal = wait_for_signal().await?;
        tracing::info!(?signal, grace_ms = self.grace.as_millis() as u64, "termination signal received");

        let deadline = Instant::now() + self.grace;
        if tokio::time::timeout_at(deadline, self.shutdown()).await.is_err() {
            tracing::warn!("shutdown did not finish within the grace window");
        }
        tokio::time::sleep_until(deadline).await;
        Ok(signal)
    }

    /// Like [`run_until_signal`](Self::run_until_signal), then exit the process.
    pub async fn run(&self) -> ! {
        match self.run_until_signal().await {
            Ok(signal) => std::process::exit(signal.exit_code()),
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for termination signals");
                std::process::exit(1)
            }
        }
    }
}

/// Wait for the first termination signal.
#[cfg(unix)]
pub async fn wait_for_signal() -> RpcResult<ShutdownSignal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    let received = tokio::select! {
        _ = interrupt.recv() => ShutdownSignal::Interrupt,
        _ = terminate.recv() => ShutdownSignal::Terminate,
        _ = hangup.recv() => ShutdownSignal::Hangup,
    };
    Ok(received)
}

/// Wait for the first termination signal.
#[cfg(windows)]
pub async fn wait_for_signal() -> RpcResult<ShutdownSignal> {
    use tokio::signal::windows;

    let mut ctrl_c = windows::ctrl_c()?;
    let mut ctrl_break = windows::ctrl_break()?;
    let mut close = windows::ctrl_close()?;

    let received = tokio::select! {
        _ = ctrl_c.recv() => ShutdownSignal::Interrupt,
        _ = ctrl_break.recv() => ShutdownSignal::Break,
        _ = close.recv() => ShutdownSignal::Hangup,
    };
    Ok(received)
}

/// Wait for the first termination signal.
#[cfg(not(any(unix, windows)))]
pub async fn wait_for_signal() -> RpcResult<ShutdownSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}
