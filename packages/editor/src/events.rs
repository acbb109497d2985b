//! Events exchanged between the sync engine and its collaborators

use crate::errors::SyncError;
use std::collections::BTreeMap;
use std::fmt;
use tandem_common::{ChangeOperation, PropValue, Side, VisualComponent};

/// Channel an event is published on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TreeChanged,
    SourceChanged,
    SourceUpdated,
    TreeUpdated,
    SyncConflict,
    SyncError,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::TreeChanged => "tree:changed",
            EventKind::SourceChanged => "source:changed",
            EventKind::SourceUpdated => "source:updated",
            EventKind::TreeUpdated => "tree:updated",
            EventKind::SyncConflict => "sync:conflict",
            EventKind::SyncError => "sync:error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The visual tree was edited
    TreeChanged { tree: VisualComponent },

    /// The source text was edited
    SourceChanged { content: String },

    /// Source regenerated from the tree
    SourceUpdated {
        code: String,
        stylesheet: String,
        handlers: BTreeMap<String, PropValue>,
        operations: Vec<ChangeOperation>,
    },

    /// Tree rebuilt from the source
    TreeUpdated {
        component_tree: VisualComponent,
        operations: Vec<ChangeOperation>,
    },

    /// Cycle aborted under the manual strategy
    SyncConflict {
        source: Side,
        tree_changes: Vec<ChangeOperation>,
        source_changes: Vec<ChangeOperation>,
    },

    /// Cycle failed; the baseline was left untouched
    SyncError { source: Side, error: SyncError },
}

impl SyncEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SyncEvent::TreeChanged { .. } => EventKind::TreeChanged,
            SyncEvent::SourceChanged { .. } => EventKind::SourceChanged,
            SyncEvent::SourceUpdated { .. } => EventKind::SourceUpdated,
            SyncEvent::TreeUpdated { .. } => EventKind::TreeUpdated,
            SyncEvent::SyncConflict { .. } => EventKind::SyncConflict,
            SyncEvent::SyncError { .. } => EventKind::SyncError,
        }
    }

    /// Operations carried by update events
    pub fn operations(&self) -> &[ChangeOperation] {
        match self {
            SyncEvent::SourceUpdated { operations, .. } | SyncEvent::TreeUpdated { operations, .. } => {
                operations
            }
            _ => &[],
        }
    }
}
