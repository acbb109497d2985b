use crate::component::VisualComponent;

/// Visitor pattern for traversing the component tree immutably
///
/// The default implementation walks the entire tree depth-first. Override
/// `visit_component` to act on each node; call `walk_component` to keep
/// descending into its children.
pub trait Visitor<'a>: Sized {
    fn visit_component(
        &mut self,
        component: &'a VisualComponent,
        _parent: Option<&'a VisualComponent>,
        _index: usize,
    ) {
        walk_component(self, component);
    }
}

/// Visit every root in order
pub fn walk_tree<'a, V: Visitor<'a>>(visitor: &mut V, roots: &'a [VisualComponent]) {
    for (index, root) in roots.iter().enumerate() {
        visitor.visit_component(root, None, index);
    }
}

/// Visit the children of a component in order
pub fn walk_component<'a, V: Visitor<'a>>(visitor: &mut V, component: &'a VisualComponent) {
    for (index, child) in component.children.iter().enumerate() {
        visitor.visit_component(child, Some(component), index);
    }
}
