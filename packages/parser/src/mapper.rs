//! Source → component tree mapping.
//!
//! Each front-end produces an intermediate structure; markup (including
//! markup embedded in scripts) is walked depth-first with a
//! [`MarkupVisitor`] and turned into [`VisualComponent`]s by a stack-based
//! [`TreeBuilder`].

use crate::error::{ParseError, ParseResult};
use crate::id_generator::IDGenerator;
use crate::markup::{parse_markup, AttrValue, Attribute, MarkupElement, MarkupNode};
use crate::script::{parse_script, ScriptModule};
use crate::style::{parse_declarations, parse_stylesheet, StyleSheet};
use std::collections::HashSet;
use tandem_common::{
    Language, PropValue, Props, SourceDocument, VisualComponent, CHILDREN_PROP, ID_ATTRIBUTE,
    PLACEHOLDER_TYPE, SOURCE_TYPE_PROP, STYLE_PROP, X_ATTRIBUTE, Y_ATTRIBUTE, Z_ATTRIBUTE,
};

/// Options controlling how markup is mapped onto components
#[derive(Debug, Clone, Default)]
pub struct MapperOptions {
    /// Known component types (lower-case). `None` accepts every tag.
    pub catalog: Option<HashSet<String>>,
}

impl MapperOptions {
    pub fn with_catalog<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            catalog: Some(
                types
                    .into_iter()
                    .map(|t| t.as_ref().to_ascii_lowercase())
                    .collect(),
            ),
        }
    }

    fn is_known(&self, tag: &str) -> bool {
        match &self.catalog {
            Some(catalog) => catalog.contains(&tag.to_ascii_lowercase()),
            None => true,
        }
    }
}

/// A document that could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFailure {
    pub path: String,
    pub error: ParseError,
}

/// Result of mapping a batch of documents
#[derive(Debug, Clone, Default)]
pub struct ParsedSources {
    /// Root components of every markup document and embedded fragment,
    /// in document order
    pub components: Vec<VisualComponent>,
    pub stylesheets: Vec<(String, StyleSheet)>,
    pub scripts: Vec<(String, ScriptModule)>,
    pub failures: Vec<DocumentFailure>,
}

impl ParsedSources {
    /// Single root for the mapped components
    pub fn into_root(self) -> VisualComponent {
        tree_root(self.components)
    }
}

/// Wrap a list of roots in a fragment unless there is exactly one
pub fn tree_root(mut roots: Vec<VisualComponent>) -> VisualComponent {
    if roots.len() == 1 {
        if let Some(root) = roots.pop() {
            return root;
        }
    }
    VisualComponent::fragment(roots)
}

/// Maps source documents onto the component tree
#[derive(Debug, Clone, Default)]
pub struct SourceMapper {
    options: MapperOptions,
}

impl SourceMapper {
    pub fn new(options: MapperOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    /// Parse a batch of documents. A document that fails to parse is
    /// logged, reported in `failures` and skipped.
    pub fn parse_documents(&self, documents: &[SourceDocument]) -> ParsedSources {
        let mut parsed = ParsedSources::default();

        for document in documents {
            if let Err(error) = self.parse_document(document, &mut parsed) {
                tracing::warn!(
                    path = %document.path,
                    language = %document.language,
                    "skipping document that failed to parse: {}",
                    error
                );
                parsed.failures.push(DocumentFailure {
                    path: document.path.clone(),
                    error,
                });
            }
        }

        parsed
    }

    fn parse_document(&self, document: &SourceDocument, parsed: &mut ParsedSources) -> ParseResult<()> {
        match document.language {
            Language::Markup => {
                let nodes = parse_markup(&document.content)?;
                let mut builder = TreeBuilder::new(&document.path, &self.options);
                walk_markup(&mut builder, &nodes);
                parsed.components.extend(builder.finish());
            }
            Language::Style => {
                let sheet = parse_stylesheet(&document.content)?;
                parsed.stylesheets.push((document.path.clone(), sheet));
            }
            Language::Script => {
                let module = parse_script(&document.content)?;
                let mut builder = TreeBuilder::new(&document.path, &self.options);
                for fragment in &module.fragments {
                    walk_markup(&mut builder, &fragment.nodes);
                }
                parsed.components.extend(builder.finish());
                parsed.scripts.push((document.path.clone(), module));
            }
        }
        Ok(())
    }

    /// Parse one markup document into a single root, failing on any error
    pub fn parse_markup_tree(&self, path: &str, text: &str) -> ParseResult<VisualComponent> {
        let nodes = parse_markup(text)?;
        let mut builder = TreeBuilder::new(path, &self.options);
        walk_markup(&mut builder, &nodes);
        Ok(tree_root(builder.finish()))
    }
}

/// Parse a batch of documents with default options
pub fn parse_documents(documents: &[SourceDocument]) -> ParsedSources {
    SourceMapper::default().parse_documents(documents)
}

/// Strictly parse one markup document with default options
pub fn parse_markup_tree(path: &str, text: &str) -> ParseResult<VisualComponent> {
    SourceMapper::default().parse_markup_tree(path, text)
}

/// Depth-first visitor over markup nodes
pub trait MarkupVisitor {
    fn enter(&mut self, element: &MarkupElement);
    fn exit(&mut self, element: &MarkupElement);
}

pub fn walk_markup<V: MarkupVisitor>(visitor: &mut V, nodes: &[MarkupNode]) {
    for node in nodes {
        if let MarkupNode::Element(element) = node {
            visitor.enter(element);
            walk_markup(visitor, &element.children);
            visitor.exit(element);
        }
    }
}

struct Frame {
    key: usize,
    component: VisualComponent,
}

/// Builds components from markup with a parent stack
pub struct TreeBuilder<'a> {
    options: &'a MapperOptions,
    ids: IDGenerator,
    seen: HashSet<String>,
    stack: Vec<Frame>,
    roots: Vec<VisualComponent>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(path: &str, options: &'a MapperOptions) -> Self {
        Self {
            options,
            ids: IDGenerator::new(path),
            seen: HashSet::new(),
            stack: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Root components built so far. Frames still open (unbalanced
    /// enter/exit) are closed onto their parents.
    pub fn finish(mut self) -> Vec<VisualComponent> {
        while let Some(frame) = self.stack.pop() {
            tracing::error!(id = %frame.component.id, "component left open at end of walk");
            self.attach(frame.component);
        }
        self.roots
    }

    fn attach(&mut self, component: VisualComponent) {
        match self.stack.last_mut() {
            Some(parent) => parent.component.children.push(component),
            None => self.roots.push(component),
        }
    }

    fn build_component(&mut self, element: &MarkupElement, path_id: String) -> VisualComponent {
        let mut props = Props::new();
        let mut explicit_id = None;

        for attribute in &element.attributes {
            if attribute.name == ID_ATTRIBUTE {
                if let AttrValue::Quoted(value) = &attribute.value {
                    explicit_id = Some(value.clone());
                    continue;
                }
            }
            props.insert(attribute.name.clone(), classify_attribute(attribute));
        }

        let id = match explicit_id {
            Some(id) if !id.is_empty() && self.seen.insert(id.clone()) => id,
            Some(id) => {
                tracing::warn!(id = %id, fallback = %path_id, "duplicate component id, using structural id");
                self.seen.insert(path_id.clone());
                path_id
            }
            None => {
                self.seen.insert(path_id.clone());
                path_id
            }
        };

        let kind = if self.options.is_known(&element.tag) {
            element.tag.to_ascii_lowercase()
        } else {
            tracing::debug!(tag = %element.tag, "unknown component type, using placeholder");
            props.insert(SOURCE_TYPE_PROP, PropValue::string(element.tag.clone()));
            PLACEHOLDER_TYPE.to_string()
        };

        let mut component = VisualComponent::new(id, kind);
        component.x = take_number(&mut props, X_ATTRIBUTE);
        component.y = take_number(&mut props, Y_ATTRIBUTE);
        component.z_index = take_number(&mut props, Z_ATTRIBUTE).map(|z| z as i32);

        if element.has_element_children() {
            for child in &element.children {
                if !matches!(child, MarkupNode::Element(_)) {
                    tracing::trace!(parent = %component.id, "dropping text mixed with elements");
                }
            }
        } else if let Some(content) = content_prop(&element.children) {
            props.insert(CHILDREN_PROP, content);
        }

        component.props = props;
        component
    }
}

impl MarkupVisitor for TreeBuilder<'_> {
    fn enter(&mut self, element: &MarkupElement) {
        let path_id = self.ids.enter();
        let component = self.build_component(element, path_id);
        self.stack.push(Frame {
            key: element.span.start,
            component,
        });
    }

    fn exit(&mut self, element: &MarkupElement) {
        self.ids.exit();

        match self.stack.last() {
            Some(frame) if frame.key == element.span.start => {
                if let Some(frame) = self.stack.pop() {
                    self.attach(frame.component);
                }
            }
            Some(frame) => {
                tracing::error!(
                    tag = %element.tag,
                    expected = %frame.component.id,
                    "walker exited a node that is not on top of the stack"
                );
            }
            None => {
                tracing::error!(tag = %element.tag, "walker exited with an empty stack");
            }
        }
    }
}

fn take_number(props: &mut Props, key: &str) -> Option<f64> {
    let value = props.get(key)?.as_number()?;
    props.remove(key);
    Some(value)
}

/// Text-only content of a leaf element
fn content_prop(children: &[MarkupNode]) -> Option<PropValue> {
    match children {
        [] => None,
        [MarkupNode::Text(text)] => Some(PropValue::string(text.clone())),
        [MarkupNode::Expression(raw)] => Some(classify_expression(raw)),
        nodes => {
            let text = nodes
                .iter()
                .filter_map(|node| match node {
                    MarkupNode::Text(text) => Some(text.clone()),
                    MarkupNode::Expression(raw) => Some(format!("{{{}}}", raw)),
                    MarkupNode::Element(_) => None,
                })
                .collect::<Vec<_>>()
                .join(" ");
            Some(PropValue::string(text))
        }
    }
}

/// Map an attribute onto a prop value
pub fn classify_attribute(attribute: &Attribute) -> PropValue {
    match &attribute.value {
        AttrValue::Flag => PropValue::bool(true),
        AttrValue::Quoted(text) if attribute.name == STYLE_PROP => PropValue::Object(
            parse_declarations(text)
                .into_iter()
                .map(|(name, value)| (name, PropValue::string(value)))
                .collect(),
        ),
        AttrValue::Quoted(text) => PropValue::string(text.clone()),
        AttrValue::Braced(raw) => classify_expression(raw),
    }
}

/// Map the source of a `{...}` expression onto a prop value
pub fn classify_expression(raw: &str) -> PropValue {
    let raw = raw.trim();

    match raw {
        "true" => return PropValue::bool(true),
        "false" => return PropValue::bool(false),
        "null" => return PropValue::null(),
        _ => {}
    }

    let first = raw.chars().next().unwrap_or(' ');

    if first.is_ascii_digit() || first == '-' || first == '.' {
        if let Ok(n) = raw.parse::<f64>() {
            if n.is_finite() {
                return PropValue::number(n);
            }
        }
    }

    if first == '"' {
        if let Ok(text) = serde_json::from_str::<String>(raw) {
            return PropValue::string(text);
        }
    }

    if first == '\'' && raw.len() >= 2 && raw.ends_with('\'') {
        let inner = &raw[1..raw.len() - 1];
        if !inner.contains('\'') && !inner.contains('\\') {
            return PropValue::string(inner);
        }
    }

    if first == '[' || first == '{' {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
            return PropValue::from_json(value);
        }
    }

    if is_reference_path(raw) {
        return PropValue::reference(raw);
    }

    PropValue::expression(raw)
}

fn is_reference_path(raw: &str) -> bool {
    !raw.is_empty()
        && raw.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}
