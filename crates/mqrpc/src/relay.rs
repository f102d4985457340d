// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Event relay for orphaned responses.
//!
//! Responses that match no pending call (typically after a restart, when
//! the calling context is gone) are republished here under the name of the
//! method that produced them, so long-lived observers still see the result.
//!
//! # Thread Safety
//!
//! Observers are invoked outside the registry lock: an observer may
//! register or remove observers, including itself.

use crate::message::Response;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Observer callback.
pub type Observer = Arc<dyn Fn(&Response) + Send + Sync>;

/// Handle returned by [`EventRelay::on`], used to remove the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Observer registry keyed by event (method) name.
#[derive(Default)]
pub struct EventRelay {
    observers: RwLock<HashMap<String, Vec<(ObserverId, Observer)>>>,
    next_id: AtomicU64,
}

impl EventRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for `event`.
    pub fn on<F>(&self, event: &str, observer: F) -> ObserverId
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(observer)));
        id
    }

    /// Remove one observer. Returns false if it was not registered.
    pub fn off(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let mut removed = false;
        observers.retain(|_, list| {
            let before = list.len();
            list.retain(|(oid, _)| *oid != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    /// Invoke every observer registered for `event`.
    ///
    /// Returns the number of observers invoked.
    pub fn emit(&self, event: &str, payload: &Response) -> usize {
        let targets: Vec<Observer> = match self.observers.read().get(event) {
            Some(list) => list.iter().map(|(_, o)| Arc::clone(o)).collect(),
            None => return 0,
        };
        for observer in &targets {
            observer(payload);
        }
        targets.len()
    }

    /// Remove every observer.
    pub fn clear(&self) {
        self.observers.write().clear();
    }

    /// Total number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.read().values().map(Vec::len).sum()
    }

    /// Number of observers registered for `event`.
    pub fn listeners(&self, event: &str) -> usize {
        self.observers.read().get(event).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRelay")
            .field("observers", &self.observer_count())
            .finish()
    }
}
