//! # Change Operations
//!
//! Value objects describing one structural difference between a current
//! tree and the baseline. Operations carry which side produced them so
//! the conflict resolver can compare tree-side and source-side edits.

use crate::component::{Placement, VisualComponent};
use crate::value::Props;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the synchronization an operation was detected on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Tree,
    Source,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Tree => write!(f, "tree"),
            Side::Source => write!(f, "source"),
        }
    }
}

/// One structural change relative to the baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChangeOperation {
    /// A component that did not exist in the baseline. `component` holds
    /// the node without its children; new descendants get their own Add.
    #[serde(rename_all = "camelCase")]
    Add {
        target: Side,
        component: VisualComponent,
        parent_id: Option<String>,
        index: usize,
    },

    /// Changed props of an existing component
    #[serde(rename_all = "camelCase")]
    Update {
        target: Side,
        id: String,
        /// New values for added or changed keys only
        changes: Props,
        /// Keys present in the baseline but gone now
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        removed: Vec<String>,
        /// New canvas placement, when it changed
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placement: Option<Placement>,
        /// New component type, when it changed
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },

    /// A baseline component that no longer exists
    Delete { target: Side, id: String },

    /// Component moved to another parent or sibling position
    #[serde(rename_all = "camelCase")]
    Move {
        target: Side,
        id: String,
        parent_id: Option<String>,
        index: usize,
    },
}

impl ChangeOperation {
    pub fn target(&self) -> Side {
        match self {
            ChangeOperation::Add { target, .. }
            | ChangeOperation::Update { target, .. }
            | ChangeOperation::Delete { target, .. }
            | ChangeOperation::Move { target, .. } => *target,
        }
    }

    /// Id of the affected component; `None` when the payload carries no
    /// usable id
    pub fn target_id(&self) -> Option<&str> {
        let id = match self {
            ChangeOperation::Add { component, .. } => component.id.as_str(),
            ChangeOperation::Update { id, .. }
            | ChangeOperation::Delete { id, .. }
            | ChangeOperation::Move { id, .. } => id.as_str(),
        };
        (!id.is_empty()).then_some(id)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ChangeOperation::Add { .. } => "add",
            ChangeOperation::Update { .. } => "update",
            ChangeOperation::Delete { .. } => "delete",
            ChangeOperation::Move { .. } => "move",
        }
    }

    pub fn is_add(&self) -> bool {
        matches!(self, ChangeOperation::Add { .. })
    }

    pub fn is_update(&self) -> bool {
        matches!(self, ChangeOperation::Update { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, ChangeOperation::Delete { .. })
    }

    pub fn is_move(&self) -> bool {
        matches!(self, ChangeOperation::Move { .. })
    }
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parent = |p: &Option<String>| p.clone().unwrap_or_else(|| "<root>".to_string());

        match self {
            ChangeOperation::Add {
                target,
                component,
                parent_id,
                index,
            } => write!(
                f,
                "[{}] add {} <{}> under {} at {}",
                target,
                component.id,
                component.kind,
                parent(parent_id),
                index
            ),
            ChangeOperation::Update {
                target,
                id,
                changes,
                removed,
                placement,
                kind,
            } => {
                write!(f, "[{}] update {}", target, id)?;
                if let Some(kind) = kind {
                    write!(f, " <{}>", kind)?;
                }
                for (key, value) in changes.iter() {
                    write!(f, " {}={:?}", key, value)?;
                }
                for key in removed {
                    write!(f, " -{}", key)?;
                }
                if placement.is_some() {
                    write!(f, " (placement)")?;
                }
                Ok(())
            }
            ChangeOperation::Delete { target, id } => write!(f, "[{}] delete {}", target, id),
            ChangeOperation::Move {
                target,
                id,
                parent_id,
                index,
            } => write!(
                f,
                "[{}] move {} to {} at {}",
                target,
                id,
                parent(parent_id),
                index
            ),
        }
    }
}
