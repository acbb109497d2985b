//! # Tandem Editor
//!
//! Keeps a visual component tree and its source text in sync.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: source ⇄ component tree             │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: sync cycles                         │
//! │  - Structural diff of trees and sources     │
//! │  - Conflict resolution between both sides   │
//! │  - Baseline bookkeeping, single-flight      │
//! │  - Event bus for inbound/outbound changes   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tandem_editor::{EventBus, EventKind, SubscribeOptions, SyncEngine, SyncEvent};
//!
//! let bus = EventBus::new();
//! bus.subscribe(
//!     EventKind::SourceUpdated,
//!     |event| {
//!         if let SyncEvent::SourceUpdated { code, .. } = event {
//!             write_back(code)?;
//!         }
//!         Ok(())
//!     },
//!     SubscribeOptions::default(),
//! );
//!
//! let engine = SyncEngine::new(bus.clone());
//! engine.attach();
//! bus.publish_sync(&SyncEvent::TreeChanged { tree });
//! ```

mod bus;
mod config;
mod differ;
mod errors;
mod events;
mod resolver;
mod session;

pub use bus::{EventBus, Filter, Listener, SubscribeOptions, Subscription};
pub use config::{ConfigPatch, ConflictStrategy, SyncConfig, SyncMode};
pub use differ::{diff, diff_source, diff_trees};
pub use errors::{BusError, SyncError};
pub use events::{EventKind, SyncEvent};
pub use resolver::{find_conflicts, resolve};
pub use session::{
    Baseline, EngineOptions, PendingConflict, SyncEngine, SyncOutcome, SyncState, DEFAULT_SOURCE_PATH,
};

// Re-export common types for convenience
pub use tandem_common::{ChangeOperation, Side, VisualComponent};
