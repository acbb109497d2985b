//! # Conflict Resolution
//!
//! A conflict is a component id touched by both tree-side and source-side
//! operations in the same cycle. Everything else passes through.

use crate::config::ConflictStrategy;
use crate::errors::SyncError;
use std::collections::BTreeSet;
use tandem_common::ChangeOperation;

/// Ids touched on both sides
pub fn find_conflicts(tree_ops: &[ChangeOperation], source_ops: &[ChangeOperation]) -> BTreeSet<String> {
    let tree_ids: BTreeSet<&str> = tree_ops.iter().filter_map(ChangeOperation::target_id).collect();

    source_ops
        .iter()
        .filter_map(ChangeOperation::target_id)
        .filter(|id| tree_ids.contains(id))
        .map(str::to_string)
        .collect()
}

/// Merge both operation lists, settling conflicts with `strategy`
///
/// Non-conflicting tree operations come first, then source operations,
/// each in their original order. `Manual` never resolves anything.
pub fn resolve(
    tree_ops: Vec<ChangeOperation>,
    source_ops: Vec<ChangeOperation>,
    strategy: ConflictStrategy,
) -> Result<Vec<ChangeOperation>, SyncError> {
    let keep_conflicting_tree = match strategy {
        ConflictStrategy::PreferTree => true,
        ConflictStrategy::PreferSource => false,
        ConflictStrategy::Manual => return Err(SyncError::ManualStrategy),
    };

    let conflicts = find_conflicts(&tree_ops, &source_ops);
    if !conflicts.is_empty() {
        tracing::debug!(count = conflicts.len(), %strategy, "resolving conflicts");
    }

    let keep = |op: &ChangeOperation, prefer_this_side: bool| match op.target_id() {
        Some(id) => prefer_this_side || !conflicts.contains(id),
        None => {
            tracing::warn!(operation = %op, "operation has no target id, passing through");
            true
        }
    };

    let mut resolved: Vec<ChangeOperation> = tree_ops
        .into_iter()
        .filter(|op| keep(op, keep_conflicting_tree))
        .collect();
    resolved.extend(source_ops.into_iter().filter(|op| keep(op, !keep_conflicting_tree)));

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_common::{Props, PropValue, Side};

    fn update(target: Side, id: &str, label: &str) -> ChangeOperation {
        let mut changes = Props::new();
        changes.insert("label", PropValue::string(label));
        ChangeOperation::Update {
            target,
            id: id.to_string(),
            changes,
            removed: vec![],
            placement: None,
            kind: None,
        }
    }

    fn delete(target: Side, id: &str) -> ChangeOperation {
        ChangeOperation::Delete {
            target,
            id: id.to_string(),
        }
    }

    #[test]
    fn test_find_conflicts() {
        let tree = vec![update(Side::Tree, "a", "x"), delete(Side::Tree, "b")];
        let source = vec![update(Side::Source, "b", "y"), update(Side::Source, "c", "z")];

        let conflicts = find_conflicts(&tree, &source);
        assert_eq!(conflicts.into_iter().collect::<Vec<_>>(), vec!["b".to_string()]);
    }

    #[test]
    fn test_prefer_tree_keeps_tree_side() {
        let resolved = resolve(
            vec![update(Side::Tree, "a", "tree")],
            vec![update(Side::Source, "a", "source"), delete(Side::Source, "z")],
            ConflictStrategy::PreferTree,
        )
        .unwrap();

        assert_eq!(resolved, vec![update(Side::Tree, "a", "tree"), delete(Side::Source, "z")]);
    }

    #[test]
    fn test_prefer_source_keeps_source_side() {
        let resolved = resolve(
            vec![update(Side::Tree, "a", "tree"), delete(Side::Tree, "y")],
            vec![update(Side::Source, "a", "source")],
            ConflictStrategy::PreferSource,
        )
        .unwrap();

        assert_eq!(resolved, vec![delete(Side::Tree, "y"), update(Side::Source, "a", "source")]);
    }

    #[test]
    fn test_manual_is_an_error() {
        let result = resolve(vec![], vec![], ConflictStrategy::Manual);
        assert_eq!(result, Err(SyncError::ManualStrategy));
    }

    #[test]
    fn test_operations_without_id_pass_through() {
        let resolved = resolve(
            vec![delete(Side::Tree, "")],
            vec![delete(Side::Source, "")],
            ConflictStrategy::PreferTree,
        )
        .unwrap();
        assert_eq!(resolved.len(), 2);
    }
}
