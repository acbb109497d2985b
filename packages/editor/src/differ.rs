//! # Structural Differ
//!
//! Compares two component trees by id and reports the adds, updates,
//! moves and deletes that turn the baseline into the current tree.
//!
//! Both trees are flattened into an `id → {parent, index, component}`
//! index with a single depth-first walk, so a diff is linear in the size
//! of the trees. A synthetic fragment root is never indexed; its children
//! are top-level components, same as a bare root.
//!
//! Props are compared the way they read back from generated source: a
//! behavior prop matches its handler-table lookup, and style values
//! match by declaration text.

use crate::errors::SyncError;
use std::collections::HashMap;
use tandem_common::{
    is_behavior_prop, walk_component, walk_tree, ChangeOperation, PropValue, Props, Side, Visitor,
    VisualComponent, ID_ATTRIBUTE, STYLE_PROP,
};
use tandem_parser::{declaration_value, handler_expression, handler_id, SourceMapper};

struct IndexEntry<'a> {
    parent_id: Option<&'a str>,
    index: usize,
    component: &'a VisualComponent,
}

/// Flat index of a tree in depth-first order
struct TreeIndex<'a> {
    entries: HashMap<&'a str, IndexEntry<'a>>,
    order: Vec<&'a str>,
}

impl<'a> TreeIndex<'a> {
    fn build(root: &'a VisualComponent) -> Self {
        let mut index = Self {
            entries: HashMap::new(),
            order: Vec::new(),
        };
        walk_tree(&mut index, root.top_level());
        index
    }
}

impl<'a> Visitor<'a> for TreeIndex<'a> {
    fn visit_component(
        &mut self,
        component: &'a VisualComponent,
        parent: Option<&'a VisualComponent>,
        index: usize,
    ) {
        let id = component.id.as_str();
        if self.entries.contains_key(id) {
            tracing::warn!(id = %id, "duplicate component id in tree, keeping first occurrence");
        } else {
            self.entries.insert(
                id,
                IndexEntry {
                    parent_id: parent.map(|p| p.id.as_str()),
                    index,
                    component,
                },
            );
            self.order.push(id);
        }
        walk_component(self, component);
    }
}

/// Tree-side diff of `current` against `baseline`
pub fn diff(baseline: &VisualComponent, current: &VisualComponent) -> Vec<ChangeOperation> {
    diff_trees(baseline, current, Side::Tree)
}

/// Diff two trees, tagging every operation with `target`
///
/// Operations are ordered by the current tree's depth-first order, with
/// deletes last in the baseline's depth-first order.
pub fn diff_trees(baseline: &VisualComponent, current: &VisualComponent, target: Side) -> Vec<ChangeOperation> {
    let before = TreeIndex::build(baseline);
    let after = TreeIndex::build(current);
    let mut operations = Vec::new();

    for id in &after.order {
        let now = &after.entries[id];

        let Some(was) = before.entries.get(id) else {
            operations.push(ChangeOperation::Add {
                target,
                component: now.component.shallow(),
                parent_id: now.parent_id.map(str::to_string),
                index: now.index,
            });
            continue;
        };

        if let Some(update) = diff_component(was.component, now.component, target) {
            operations.push(update);
        }

        if was.parent_id != now.parent_id || was.index != now.index {
            operations.push(ChangeOperation::Move {
                target,
                id: id.to_string(),
                parent_id: now.parent_id.map(str::to_string),
                index: now.index,
            });
        }
    }

    for id in &before.order {
        if !after.entries.contains_key(id) {
            operations.push(ChangeOperation::Delete {
                target,
                id: id.to_string(),
            });
        }
    }

    operations
}

/// Shallow prop and placement diff of one component
fn diff_component(was: &VisualComponent, now: &VisualComponent, target: Side) -> Option<ChangeOperation> {
    let mut changes = Props::new();
    for (key, value) in now.props.iter() {
        if key == ID_ATTRIBUTE {
            continue;
        }
        let same = was
            .props
            .get(key)
            .is_some_and(|old| equivalent(&now.id, key, old, value));
        if !same {
            changes.insert(key, value.clone());
        }
    }

    let removed: Vec<String> = was
        .props
        .keys()
        .filter(|key| *key != ID_ATTRIBUTE && !now.props.contains_key(key))
        .map(str::to_string)
        .collect();

    let placement = (was.placement() != now.placement()).then(|| now.placement());

    let kind = (was.kind != now.kind).then(|| now.kind.clone());

    if changes.is_empty() && removed.is_empty() && placement.is_none() && kind.is_none() {
        return None;
    }

    Some(ChangeOperation::Update {
        target,
        id: now.id.clone(),
        changes,
        removed,
        placement,
        kind,
    })
}

/// Whether two values of prop `key` on component `id` say the same thing
fn equivalent(id: &str, key: &str, was: &PropValue, now: &PropValue) -> bool {
    if was == now {
        return true;
    }

    if is_behavior_prop(key) {
        let slot = PropValue::expression(handler_expression(&handler_id(id, key)));
        return *was == slot || *now == slot;
    }

    if key == STYLE_PROP {
        if let (Some(was), Some(now)) = (was.as_object(), now.as_object()) {
            return was.len() == now.len()
                && was.iter().all(|(name, value)| {
                    now.get(name)
                        .is_some_and(|other| declaration_value(value) == declaration_value(other))
                });
        }
    }

    false
}

/// Source-side diff: parse both texts and diff the resulting trees
///
/// Identical texts produce no operations without parsing.
pub fn diff_source(
    mapper: &SourceMapper,
    path: &str,
    baseline: &str,
    current: &str,
) -> Result<Vec<ChangeOperation>, SyncError> {
    if baseline == current {
        return Ok(Vec::new());
    }

    let before = mapper.parse_markup_tree(path, baseline)?;
    let after = mapper.parse_markup_tree(path, current)?;
    Ok(diff_trees(&before, &after, Side::Source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_common::PropValue;

    fn base() -> VisualComponent {
        VisualComponent::new("root", "div")
            .with_child(VisualComponent::new("a", "span").with_prop("label", "A"))
            .with_child(
                VisualComponent::new("b", "ul")
                    .with_child(VisualComponent::new("b1", "li"))
                    .with_child(VisualComponent::new("b2", "li")),
            )
    }

    #[test]
    fn test_identical_trees_have_no_operations() {
        assert!(diff(&base(), &base()).is_empty());
    }

    #[test]
    fn test_update_contains_only_changed_keys() {
        let mut current = base();
        current.children[0].props.insert("label", PropValue::string("B"));
        current.children[0].props.insert("title", PropValue::string("new"));

        let ops = diff(&base(), &current);
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            ChangeOperation::Update { id, changes, removed, placement, .. } => {
                assert_eq!(id, "a");
                assert_eq!(changes.keys().collect::<Vec<_>>(), vec!["label", "title"]);
                assert!(removed.is_empty());
                assert!(placement.is_none());
            }
            other => panic!("expected update, got {}", other),
        }
    }

    #[test]
    fn test_removed_keys_and_placement() {
        let mut current = base();
        current.children[0].props.remove("label");
        current.children[0].x = Some(5.0);

        let ops = diff(&base(), &current);
        match &ops[0] {
            ChangeOperation::Update { changes, removed, placement, .. } => {
                assert!(changes.is_empty());
                assert_eq!(removed, &vec!["label".to_string()]);
                assert_eq!(placement.and_then(|p| p.x), Some(5.0));
            }
            other => panic!("expected update, got {}", other),
        }
    }

    #[test]
    fn test_identity_attribute_is_ignored() {
        let mut current = base();
        current.children[0].props.insert(ID_ATTRIBUTE, PropValue::string("a"));
        assert!(diff(&base(), &current).is_empty());
    }

    #[test]
    fn test_move_is_reported_without_update() {
        let mut current = base();
        current.children[1].children.swap(0, 1);

        let ops = diff(&base(), &current);
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(ChangeOperation::is_move));
        assert_eq!(ops[0].target_id(), Some("b2"));
    }

    #[test]
    fn test_reparent_is_a_move() {
        let mut current = base();
        let b1 = current.children[1].children.remove(0);
        current.children[0].children.push(b1);

        let ops = diff(&base(), &current);
        let moves: Vec<_> = ops.iter().filter(|op| op.is_move()).collect();
        assert!(moves.iter().any(|op| matches!(
            op,
            ChangeOperation::Move { id, parent_id: Some(parent), index: 0, .. } if id == "b1" && parent == "a"
        )));
        assert!(!ops.iter().any(ChangeOperation::is_update));
    }

    #[test]
    fn test_adds_and_deletes() {
        let mut current = base();
        current.children.remove(0);
        current.children.push(VisualComponent::new("c", "p").with_child(VisualComponent::new("c1", "em")));

        let ops = diff(&base(), &current);
        let adds: Vec<_> = ops.iter().filter(|op| op.is_add()).filter_map(|op| op.target_id()).collect();
        let deletes: Vec<_> = ops.iter().filter(|op| op.is_delete()).filter_map(|op| op.target_id()).collect();

        assert_eq!(adds, vec!["c", "c1"]);
        assert_eq!(deletes, vec!["a"]);
        assert!(ops.last().is_some_and(ChangeOperation::is_delete));

        // Added components carry no children; each descendant has its own add
        match &ops.iter().find(|op| op.is_add()) {
            Some(ChangeOperation::Add { component, parent_id, .. }) => {
                assert!(component.children.is_empty());
                assert_eq!(parent_id.as_deref(), Some("root"));
            }
            other => panic!("expected add, got {:?}", other),
        }
    }

    #[test]
    fn test_fragment_root_is_not_a_component() {
        let a = VisualComponent::new("a", "div");

        let ops = diff(&VisualComponent::fragment(vec![]), &a);
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            ChangeOperation::Add { component, parent_id: None, index: 0, .. } if component.id == "a"
        ));

        // A one-root fragment and the bare root are the same tree
        assert!(diff(&VisualComponent::fragment(vec![a.clone()]), &a).is_empty());
        assert!(diff(&a, &VisualComponent::fragment(vec![a.clone()])).is_empty());

        let ops = diff(&a, &VisualComponent::fragment(vec![]));
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].target_id(), Some("a"));
        assert!(ops[0].is_delete());
    }

    #[test]
    fn test_type_change_is_reported() {
        let was = VisualComponent::new("k", "div").with_prop("label", "A");
        let now = VisualComponent::new("k", "p").with_prop("label", "A");

        let ops = diff(&was, &now);
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            ChangeOperation::Update { kind, changes, .. } => {
                assert_eq!(kind.as_deref(), Some("p"));
                assert!(changes.is_empty());
            }
            other => panic!("expected update, got {}", other),
        }
    }

    #[test]
    fn test_values_compare_as_written_to_source() {
        let mut numeric = Props::new();
        numeric.insert("padding", PropValue::number(4.0));
        let mut text = Props::new();
        text.insert("padding", PropValue::string("4"));

        let was = VisualComponent::new("b", "button")
            .with_prop("onClick", PropValue::reference("save"))
            .with_prop(STYLE_PROP, numeric);
        let now = VisualComponent::new("b", "button")
            .with_prop("onClick", PropValue::expression("__handlers[\"handler:b:onClick\"]"))
            .with_prop(STYLE_PROP, text);
        assert!(diff(&was, &now).is_empty());
        assert!(diff(&now, &was).is_empty());

        // A different handler slot or a real style change still counts
        let mut wider = Props::new();
        wider.insert("padding", PropValue::string("8"));
        let changed = VisualComponent::new("b", "button")
            .with_prop("onClick", PropValue::expression("__handlers[\"handler:other:onClick\"]"))
            .with_prop(STYLE_PROP, wider);
        match &diff(&was, &changed)[0] {
            ChangeOperation::Update { changes, .. } => {
                assert_eq!(changes.keys().collect::<Vec<_>>(), vec!["onClick", "style"]);
            }
            other => panic!("expected update, got {}", other),
        }
    }

    #[test]
    fn test_source_diff_of_equal_texts_is_empty() {
        let mapper = SourceMapper::default();
        // Not even parsed, so invalid markup is fine here
        assert!(diff_source(&mapper, "s.html", "<div>", "<div>").unwrap().is_empty());
    }

    #[test]
    fn test_source_diff_is_tagged_source() {
        let mapper = SourceMapper::default();
        let ops = diff_source(
            &mapper,
            "s.html",
            r#"<p data-tandem-id="p">old</p>"#,
            r#"<p data-tandem-id="p">new</p>"#,
        )
        .unwrap();

        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].target(), Side::Source);
        assert!(ops[0].is_update());
    }

    #[test]
    fn test_source_diff_parse_failure() {
        let mapper = SourceMapper::default();
        let result = diff_source(&mapper, "s.html", "", "<div><p></div>");
        assert!(matches!(result, Err(SyncError::Parse(_))));
    }
}
