use crate::error::{CommonError, CommonResult};
use crate::value::{PropValue, Props};
use crate::visitor::{walk_component, walk_tree, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Attribute carrying a component's identity through source text
pub const ID_ATTRIBUTE: &str = "data-tandem-id";

/// Attributes carrying canvas placement through source text. Props
/// may not use these names.
pub const X_ATTRIBUTE: &str = "data-x";
pub const Y_ATTRIBUTE: &str = "data-y";
pub const Z_ATTRIBUTE: &str = "data-z";

pub fn is_placement_attribute(name: &str) -> bool {
    matches!(name, X_ATTRIBUTE | Y_ATTRIBUTE | Z_ATTRIBUTE)
}

/// Prop holding inline style declarations
pub const STYLE_PROP: &str = "style";

/// Prop holding text content of a leaf component
pub const CHILDREN_PROP: &str = "children";

/// Type of the synthetic root wrapping a list of top-level components
pub const FRAGMENT_TYPE: &str = "fragment";

/// Type used for tags that are not in the component catalog
pub const PLACEHOLDER_TYPE: &str = "unknown";

/// Prop on a placeholder naming the tag it stands in for
pub const SOURCE_TYPE_PROP: &str = "sourceType";

/// Id of the synthetic fragment root
pub const FRAGMENT_ID: &str = "__fragment__";

/// Whether a prop attaches behavior (`onClick`, `onChange`, ...)
pub fn is_behavior_prop(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('o')
        && chars.next() == Some('n')
        && chars.next().is_some_and(|c| c.is_ascii_uppercase())
}

/// Node of the visual component tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualComponent {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Props::is_empty")]
    pub props: Props,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<VisualComponent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

/// Absolute canvas placement of a component
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z_index: Option<i32>,
}

impl VisualComponent {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            props: Props::new(),
            children: Vec::new(),
            x: None,
            y: None,
            z_index: None,
        }
    }

    /// Synthetic root wrapping a list of top-level components
    pub fn fragment(children: Vec<VisualComponent>) -> Self {
        Self {
            children,
            ..Self::new(FRAGMENT_ID, FRAGMENT_TYPE)
        }
    }

    pub fn is_fragment(&self) -> bool {
        self.kind == FRAGMENT_TYPE
    }

    /// Top-level components: the children of a fragment, otherwise the
    /// component itself
    pub fn top_level(&self) -> &[VisualComponent] {
        if self.is_fragment() {
            &self.children
        } else {
            std::slice::from_ref(self)
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(key, value.into());
        self
    }

    pub fn with_child(mut self, child: VisualComponent) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: Vec<VisualComponent>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn placement(&self) -> Placement {
        Placement {
            x: self.x,
            y: self.y,
            z_index: self.z_index,
        }
    }

    pub fn set_placement(&mut self, placement: Placement) {
        self.x = placement.x;
        self.y = placement.y;
        self.z_index = placement.z_index;
    }

    /// Identifier emitted into source: an explicit attribute prop wins
    /// over the component's own id
    pub fn source_identifier(&self) -> &str {
        self.props
            .get(ID_ATTRIBUTE)
            .and_then(PropValue::as_str)
            .unwrap_or(&self.id)
    }

    /// Copy of this component without its children
    pub fn shallow(&self) -> Self {
        Self {
            children: Vec::new(),
            ..self.clone()
        }
    }

    /// Find a component by id in this subtree
    pub fn find(&self, id: &str) -> Option<&VisualComponent> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Number of components in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(VisualComponent::count).sum::<usize>()
    }
}

/// Find a component by id across a list of roots
pub fn find_in_tree<'a>(roots: &'a [VisualComponent], id: &str) -> Option<&'a VisualComponent> {
    roots.iter().find_map(|root| root.find(id))
}

struct TreeValidator<'a> {
    seen: HashSet<&'a str>,
    error: Option<CommonError>,
}

impl<'a> Visitor<'a> for TreeValidator<'a> {
    fn visit_component(
        &mut self,
        component: &'a VisualComponent,
        _parent: Option<&'a VisualComponent>,
        _index: usize,
    ) {
        if self.error.is_some() {
            return;
        }
        if !self.seen.insert(component.id.as_str()) {
            self.error = Some(CommonError::DuplicateId(component.id.clone()));
            return;
        }
        if let Some(name) = component.props.keys().find(|name| is_placement_attribute(name)) {
            self.error = Some(CommonError::ReservedProp {
                id: component.id.clone(),
                name: name.to_string(),
            });
            return;
        }
        walk_component(self, component);
    }
}

/// Check that every id is unique across the whole tree and that no prop
/// shadows a placement attribute
pub fn validate_tree(roots: &[VisualComponent]) -> CommonResult<()> {
    let mut validator = TreeValidator {
        seen: HashSet::new(),
        error: None,
    };
    walk_tree(&mut validator, roots);

    match validator.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
