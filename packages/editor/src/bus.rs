//! # Event Bus
//!
//! Publish/subscribe registry shared by the sync engine and the editors
//! around it. Listeners are kept per event kind, sorted by descending
//! priority; ties keep subscription order.
//!
//! A failing or panicking listener is logged and skipped, it never stops
//! delivery to the listeners after it.

use crate::errors::BusError;
use crate::events::{EventKind, SyncEvent};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;

pub type Listener = Arc<dyn Fn(&SyncEvent) -> anyhow::Result<()> + Send + Sync>;
pub type Filter = Arc<dyn Fn(&SyncEvent) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct SubscribeOptions {
    /// Listener is skipped for events this returns false for
    pub filter: Option<Filter>,
    /// Higher runs first; defaults to 0
    pub priority: i32,
}

impl SubscribeOptions {
    pub fn priority(priority: i32) -> Self {
        Self {
            priority,
            ..Default::default()
        }
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&SyncEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }
}

struct Registration {
    id: u64,
    priority: i32,
    filter: Option<Filter>,
    listener: Listener,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<EventKind, Vec<Arc<Registration>>>,
}

type SharedRegistry = Arc<Mutex<Registry>>;

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event bus handle; clones share the same registry
#[derive(Clone, Default)]
pub struct EventBus {
    registry: SharedRegistry,
}

/// Handle returned by [`EventBus::subscribe`]
///
/// Dropping it keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = lock(&registry);
        let Some(listeners) = registry.listeners.get_mut(&self.kind) else {
            return false;
        };

        let before = listeners.len();
        listeners.retain(|registration| registration.id != self.id);
        before != listeners.len()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, callback: F, options: SubscribeOptions) -> Subscription
    where
        F: Fn(&SyncEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;

        let listeners = registry.listeners.entry(kind).or_default();
        listeners.push(Arc::new(Registration {
            id,
            priority: options.priority,
            filter: options.filter,
            listener: Arc::new(callback),
        }));
        // Stable sort keeps subscription order among equal priorities
        listeners.sort_by(|a, b| b.priority.cmp(&a.priority));

        tracing::trace!(event = %kind, id, priority = options.priority, "listener subscribed");

        Subscription {
            registry: Arc::downgrade(&self.registry),
            kind,
            id,
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        lock(&self.registry)
            .listeners
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Deliver immediately, in priority order
    pub fn publish_sync(&self, event: &SyncEvent) {
        for registration in self.snapshot(event.kind()) {
            dispatch(&registration, event);
        }
    }

    /// Deliver on the Tokio runtime. The spawned task yields before each
    /// listener, so separate publishes may interleave.
    pub fn publish(&self, event: SyncEvent) -> Result<JoinHandle<()>, BusError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| BusError::NoRuntime)?;
        let listeners = self.snapshot(event.kind());

        Ok(runtime.spawn(async move {
            for registration in listeners {
                tokio::task::yield_now().await;
                dispatch(&registration, &event);
            }
        }))
    }

    /// Listener list at this moment, so listeners may subscribe or publish
    /// while being invoked
    fn snapshot(&self, kind: EventKind) -> Vec<Arc<Registration>> {
        lock(&self.registry)
            .listeners
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}

fn dispatch(registration: &Registration, event: &SyncEvent) {
    if let Some(filter) = &registration.filter {
        if !filter(event) {
            return;
        }
    }

    match catch_unwind(AssertUnwindSafe(|| (registration.listener)(event))) {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            tracing::error!(event = %event.kind(), listener = registration.id, "listener failed: {:#}", error);
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(event = %event.kind(), listener = registration.id, "listener panicked: {}", message);
        }
    }
}
