// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed async pub/sub event bus. Handlers run concurrently per emit and
//! their failures are swallowed, matching §4.A: the bus never fails its
//! caller and gives no ordering guarantee across subscribers.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

/// A bus event. Value type: handlers must not mutate it.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub data: Value,
    pub timestamp_ms: u64,
}

impl Event {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            data,
            timestamp_ms: now_ms(),
        }
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub type Handler = Arc<dyn Fn(Event) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Opaque token returned by `subscribe`/`subscribe_all`; pass to
/// `unsubscribe` to remove the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    handler: Handler,
}

#[derive(Default)]
struct Subscribers {
    by_type: HashMap<String, Vec<Subscriber>>,
    wildcard: Vec<Subscriber>,
}

/// Decoupling layer between the scheduler, the transport, and observers
/// (dashboard, reporters). See §4.A.
pub struct EventBus {
    subscribers: RwLock<Subscribers>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self { subscribers: RwLock::new(Subscribers::default()), next_id: AtomicU64::new(1) }
    }

    fn alloc_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Subscribe a handler to a single dotted event type (e.g. `test.completed`).
    pub async fn subscribe<F, Fut>(&self, event_type: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.alloc_id();
        let wrapped: Handler = Arc::new(move |event| Box::pin(handler(event)));
        let mut subs = self.subscribers.write().await;
        subs.by_type.entry(event_type.into()).or_default().push(Subscriber { id, handler: wrapped });
        id
    }

    /// Subscribe a handler to every event type.
    pub async fn subscribe_all<F, Fut>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.alloc_id();
        let wrapped: Handler = Arc::new(move |event| Box::pin(handler(event)));
        let mut subs = self.subscribers.write().await;
        subs.wildcard.push(Subscriber { id, handler: wrapped });
        id
    }

    /// Remove a previously registered subscription, wherever it lives.
    pub async fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscribers.write().await;
        for handlers in subs.by_type.values_mut() {
            handlers.retain(|s| s.id != id);
        }
        subs.wildcard.retain(|s| s.id != id);
    }

    /// Remove every handler, optionally scoped to one event type.
    pub async fn clear(&self, event_type: Option<&str>) {
        let mut subs = self.subscribers.write().await;
        match event_type {
            Some(t) => {
                subs.by_type.remove(t);
            }
            None => {
                subs.by_type.clear();
                subs.wildcard.clear();
            }
        }
    }

    /// Dispatch `event` to every matching subscriber concurrently and
    /// await all of them before returning. Handler panics/errors never
    /// propagate to the caller.
    pub async fn emit(&self, event: Event) {
        let snapshot: Vec<Handler> = {
            let subs = self.subscribers.read().await;
            let mut handlers: Vec<Handler> = subs.wildcard.iter().map(|s| s.handler.clone()).collect();
            if let Some(typed) = subs.by_type.get(&event.event_type) {
                handlers.extend(typed.iter().map(|s| s.handler.clone()));
            }
            handlers
        };

        let mut joins = Vec::with_capacity(snapshot.len());
        for handler in snapshot {
            let event = event.clone();
            joins.push(tokio::spawn(async move {
                // A handler that panics is an untrusted observer's fault,
                // not the emitter's; swallow it like any other failure.
                let _ = std::panic::AssertUnwindSafe(handler(event)).await;
            }));
        }
        for join in joins {
            let _ = join.await;
        }
    }
}

impl SubscriptionId {
    #[cfg(test)]
    fn raw(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use serde_json::json;

    #[tokio::test]
    async fn delivers_to_typed_and_wildcard_subscribers() {
        let bus = EventBus::new();
        let typed_hits = Arc::new(AtomicUsize::new(0));
        let wildcard_hits = Arc::new(AtomicUsize::new(0));

        let t = typed_hits.clone();
        bus.subscribe("test.completed", move |_e| {
            let t = t.clone();
            async move {
                t.fetch_add(1, AtomicOrdering::SeqCst);
            }
        })
        .await;

        let w = wildcard_hits.clone();
        bus.subscribe_all(move |_e| {
            let w = w.clone();
            async move {
                w.fetch_add(1, AtomicOrdering::SeqCst);
            }
        })
        .await;

        bus.emit(Event::new("test.completed", "runner", json!({}))).await;
        bus.emit(Event::new("test.started", "runner", json!({}))).await;

        assert_eq!(typed_hits.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(wildcard_hits.load(AtomicOrdering::SeqCst), 2);
    }

    #[tokio::test]
    async fn handler_panic_does_not_propagate() {
        let bus = EventBus::new();
        bus.subscribe_all(|_e| async move {
            panic!("untrusted observer exploded");
        })
        .await;

        // emit must still return normally.
        bus.emit(Event::new("any", "src", json!(null))).await;
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = bus
            .subscribe("x", move |_e| {
                let h = h.clone();
                async move {
                    h.fetch_add(1, AtomicOrdering::SeqCst);
                }
            })
            .await;
        assert!(id.raw() > 0);

        bus.unsubscribe(id).await;
        bus.emit(Event::new("x", "src", json!(null))).await;
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn clear_by_type_leaves_others_intact() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        bus.subscribe("y", move |_e| {
            let h = h.clone();
            async move {
                h.fetch_add(1, AtomicOrdering::SeqCst);
            }
        })
        .await;

        bus.clear(Some("x")).await;
        bus.emit(Event::new("y", "src", json!(null))).await;
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 1);
    }
}
