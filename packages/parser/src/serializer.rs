//! Component tree → source serialization.
//!
//! Emits markup with a `data-tandem-id` attribute on every element so
//! identity survives a reparse. Style props are also collected into a
//! stylesheet keyed by that attribute, and behavior props are replaced by
//! synthetic handler ids.

use crate::markup::is_void_element;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tandem_common::{
    format_number, is_behavior_prop, is_placement_attribute, Literal, PropValue, Props, VisualComponent,
    CHILDREN_PROP, ID_ATTRIBUTE, PLACEHOLDER_TYPE, SOURCE_TYPE_PROP, STYLE_PROP, X_ATTRIBUTE,
    Y_ATTRIBUTE, Z_ATTRIBUTE,
};

/// Name of the runtime table handler ids are looked up in
pub const HANDLER_TABLE: &str = "__handlers";

/// Synthetic id a behavior prop is registered under
pub fn handler_id(component_id: &str, prop: &str) -> String {
    format!("handler:{}:{}", component_id, prop)
}

/// Expression that looks `handler_id` up in the handler table. This is
/// what a behavior prop reads back as after a reparse.
pub fn handler_expression(handler_id: &str) -> String {
    format!(
        "{}[{}]",
        HANDLER_TABLE,
        serde_json::to_string(handler_id).unwrap_or_default()
    )
}

#[derive(Debug, Clone)]
pub struct SerializeOptions {
    pub indent: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
        }
    }
}

/// The three artifacts of one serialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedSource {
    pub markup: String,
    pub stylesheet: String,
    /// Synthetic handler id → the behavior reference it replaced
    pub handlers: BTreeMap<String, PropValue>,
}

/// Serialize a single root
pub fn serialize(root: &VisualComponent) -> SerializedSource {
    Serializer::new(SerializeOptions::default()).serialize(root)
}

/// Serialize a list of roots under a synthetic fragment root
pub fn serialize_tree(roots: &[VisualComponent]) -> SerializedSource {
    serialize(&VisualComponent::fragment(roots.to_vec()))
}

pub struct Serializer {
    options: SerializeOptions,
    depth: usize,
    buffer: String,
    styles: StyleCollector,
    handlers: HandlerCollector,
}

impl Serializer {
    pub fn new(options: SerializeOptions) -> Self {
        Self {
            options,
            depth: 0,
            buffer: String::new(),
            styles: StyleCollector::default(),
            handlers: HandlerCollector::default(),
        }
    }

    pub fn serialize(mut self, root: &VisualComponent) -> SerializedSource {
        self.serialize_component(root);

        SerializedSource {
            markup: self.buffer,
            stylesheet: self.styles.render(&self.options.indent),
            handlers: self.handlers.finish(),
        }
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_line(&mut self, text: &str) {
        self.add_indent();
        self.add(text);
        self.add("\n");
    }

    fn add_indent(&mut self) {
        for _ in 0..self.depth {
            self.buffer.push_str(&self.options.indent);
        }
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn dedent(&mut self) {
        if self.depth > 0 {
            self.depth -= 1;
        }
    }

    fn serialize_component(&mut self, component: &VisualComponent) {
        // A fragment only contributes its children
        if component.is_fragment() {
            for child in &component.children {
                self.serialize_component(child);
            }
            return;
        }

        let tag = tag_name(component);
        let identifier = component.source_identifier().to_string();
        let mut open = format!("<{} {}=\"{}\"", tag, ID_ATTRIBUTE, escape_attribute(&identifier));

        for (name, value) in component.props.iter() {
            if name == ID_ATTRIBUTE || name == CHILDREN_PROP {
                continue;
            }
            if name == SOURCE_TYPE_PROP && component.kind == PLACEHOLDER_TYPE {
                continue;
            }
            if is_placement_attribute(name) {
                tracing::warn!(id = %component.id, prop = %name, "skipping prop that shadows a placement attribute");
                continue;
            }
            open.push(' ');
            open.push_str(&self.attribute(component, &identifier, name, value));
        }

        for (name, value) in [
            (X_ATTRIBUTE, component.x),
            (Y_ATTRIBUTE, component.y),
            (Z_ATTRIBUTE, component.z_index.map(f64::from)),
        ] {
            if let Some(value) = value {
                open.push_str(&format!(" {}={{{}}}", name, format_number(value)));
            }
        }

        if is_void_element(&tag) {
            if !component.children.is_empty() {
                tracing::warn!(id = %component.id, tag = %tag, "dropping children of void element");
            }
            self.add_line(&format!("{} />", open));
            return;
        }

        let text = component.props.get(CHILDREN_PROP).map(body_text);

        if component.children.is_empty() {
            let body = text.unwrap_or_default();
            self.add_line(&format!("{}>{}</{}>", open, body, tag));
            return;
        }

        if text.is_some() {
            tracing::trace!(id = %component.id, "text content ignored on component with children");
        }

        self.add_line(&format!("{}>", open));
        self.indent();
        for child in &component.children {
            self.serialize_component(child);
        }
        self.dedent();
        self.add_line(&format!("</{}>", tag));
    }

    fn attribute(&mut self, component: &VisualComponent, identifier: &str, name: &str, value: &PropValue) -> String {
        if is_behavior_prop(name) {
            let handler_id = self.handlers.register(&component.id, name, value);
            return format!("{}={{{}}}", name, handler_expression(&handler_id));
        }

        match value {
            PropValue::Object(style) if name == STYLE_PROP => {
                self.styles.add(identifier, style);
                format!("{}=\"{}\"", name, escape_attribute(&inline_declarations(style)))
            }
            // Quoted style text would read back as declarations
            PropValue::Literal(Literal::String(_)) if name == STYLE_PROP => {
                format!("{}={{{}}}", name, expression_text(value))
            }
            PropValue::Literal(Literal::Bool(true)) => name.to_string(),
            PropValue::Literal(Literal::String(s)) => format!("{}=\"{}\"", name, escape_attribute(s)),
            other => format!("{}={{{}}}", name, expression_text(other)),
        }
    }
}

fn tag_name(component: &VisualComponent) -> String {
    if component.kind == PLACEHOLDER_TYPE {
        if let Some(source_type) = component.props.get(SOURCE_TYPE_PROP).and_then(PropValue::as_str) {
            return source_type.to_string();
        }
    }
    component.kind.to_lowercase()
}

/// Source text of a value in `{...}` position
fn expression_text(value: &PropValue) -> String {
    match value {
        PropValue::Literal(Literal::String(s)) => serde_json::to_string(s).unwrap_or_default(),
        PropValue::Literal(Literal::Number(n)) if n.is_finite() => format_number(*n),
        PropValue::Literal(Literal::Number(_)) | PropValue::Literal(Literal::Null) => "null".to_string(),
        PropValue::Literal(Literal::Bool(b)) => b.to_string(),
        PropValue::Reference(name) => name.clone(),
        PropValue::Expression(raw) => raw.clone(),
        PropValue::List(items) => {
            let items: Vec<_> = items.iter().map(expression_text).collect();
            format!("[{}]", items.join(", "))
        }
        PropValue::Object(props) => match value.to_json() {
            Some(json) => json.to_string(),
            None => {
                let entries: Vec<_> = props
                    .iter()
                    .map(|(k, v)| format!("{}: {}", serde_json::to_string(k).unwrap_or_default(), expression_text(v)))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
        },
    }
}

/// Text body of a leaf component
fn body_text(value: &PropValue) -> String {
    match value {
        PropValue::Literal(Literal::String(s)) => escape_text(s),
        other => format!("{{{}}}", expression_text(other)),
    }
}

/// Plain value of a style declaration
pub fn declaration_value(value: &PropValue) -> String {
    match value {
        PropValue::Literal(Literal::String(s)) => s.clone(),
        PropValue::Literal(Literal::Number(n)) => format_number(*n),
        other => expression_text(other),
    }
}

fn inline_declarations(style: &Props) -> String {
    style
        .iter()
        .map(|(k, v)| format!("{}: {}", k, declaration_value(v)))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Escape leaf text. Whitespace the parser would collapse or trim is
/// written as character references.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut after_space = true;

    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            ' ' if !after_space && chars.peek().is_some() => {
                out.push(' ');
                after_space = true;
                continue;
            }
            c if c.is_whitespace() => out.push_str(&format!("&#{};", c as u32)),
            c => out.push(c),
        }
        after_space = false;
    }

    out
}

pub fn escape_attribute(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Collects style props into attribute-selector rules, in tree order
#[derive(Debug, Default)]
pub struct StyleCollector {
    rules: Vec<(String, Props)>,
}

impl StyleCollector {
    pub fn add(&mut self, identifier: &str, style: &Props) {
        if !style.is_empty() {
            self.rules.push((identifier.to_string(), style.clone()));
        }
    }

    pub fn render(&self, indent: &str) -> String {
        let mut out = String::new();
        for (identifier, style) in &self.rules {
            out.push_str(&format!(
                "[{}=\"{}\"] {{\n",
                ID_ATTRIBUTE,
                escape_attribute(identifier)
            ));
            for (name, value) in style.iter() {
                out.push_str(&format!("{}{}: {};\n", indent, name, declaration_value(value)));
            }
            out.push_str("}\n");
        }
        out
    }
}

/// Replaces behavior props with synthetic handler ids
#[derive(Debug, Default)]
pub struct HandlerCollector {
    handlers: BTreeMap<String, PropValue>,
}

impl HandlerCollector {
    /// Record the behavior and return its synthetic id
    pub fn register(&mut self, component_id: &str, prop: &str, behavior: &PropValue) -> String {
        let id = handler_id(component_id, prop);
        self.handlers.insert(id.clone(), behavior.clone());
        id
    }

    pub fn finish(self) -> BTreeMap<String, PropValue> {
        self.handlers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button() -> VisualComponent {
        VisualComponent::new("btn", "Button")
            .with_prop("label", "Save & exit")
            .with_prop("disabled", true)
            .with_prop("primary", false)
            .with_prop("count", 2.0)
            .with_prop("onClick", PropValue::reference("save"))
    }

    #[test]
    fn test_serialize_attributes() {
        let out = serialize(&button());

        assert_eq!(
            out.markup,
            "<button data-tandem-id=\"btn\" label=\"Save &amp; exit\" disabled primary={false} count={2} onClick={__handlers[\"handler:btn:onClick\"]}></button>\n"
        );
        assert_eq!(
            out.handlers.get("handler:btn:onClick"),
            Some(&PropValue::reference("save"))
        );
    }

    #[test]
    fn test_serialize_nested_with_indentation() {
        let root = VisualComponent::new("root", "div")
            .with_child(VisualComponent::new("t", "p").with_prop(CHILDREN_PROP, "a < b"))
            .with_child(VisualComponent::new("i", "img").with_prop("src", "x.png"));

        let out = serialize(&root);
        assert_eq!(
            out.markup,
            "<div data-tandem-id=\"root\">\n  <p data-tandem-id=\"t\">a &lt; b</p>\n  <img data-tandem-id=\"i\" src=\"x.png\" />\n</div>\n"
        );
    }

    #[test]
    fn test_style_is_inlined_and_collected() {
        let mut style = Props::new();
        style.insert("color", PropValue::string("red"));
        style.insert("padding", PropValue::number(4.0));
        let root = VisualComponent::new("card", "div").with_prop(STYLE_PROP, style);

        let out = serialize(&root);
        assert!(out.markup.contains("style=\"color: red; padding: 4\""));
        assert_eq!(
            out.stylesheet,
            "[data-tandem-id=\"card\"] {\n  color: red;\n  padding: 4;\n}\n"
        );
    }

    #[test]
    fn test_explicit_identifier_and_placement() {
        let mut component = VisualComponent::new("n1", "div")
            .with_prop(ID_ATTRIBUTE, "hero")
            .at(10.0, 20.5);
        component.z_index = Some(3);

        let out = serialize(&component);
        assert_eq!(
            out.markup,
            "<div data-tandem-id=\"hero\" data-x={10} data-y={20.5} data-z={3}></div>\n"
        );
    }

    #[test]
    fn test_fragment_emits_only_children() {
        let out = serialize_tree(&[VisualComponent::new("a", "span"), VisualComponent::new("b", "span")]);
        assert_eq!(
            out.markup,
            "<span data-tandem-id=\"a\"></span>\n<span data-tandem-id=\"b\"></span>\n"
        );
    }

    #[test]
    fn test_placeholder_restores_source_tag() {
        let component = VisualComponent::new("c", PLACEHOLDER_TYPE).with_prop(SOURCE_TYPE_PROP, "Chart");
        let out = serialize(&component);
        assert_eq!(out.markup, "<Chart data-tandem-id=\"c\"></Chart>\n");
    }

    #[test]
    fn test_non_literal_values() {
        let component = VisualComponent::new("l", "list")
            .with_prop("items", PropValue::List(vec![PropValue::number(1.0), PropValue::reference("x")]))
            .with_prop("title", PropValue::reference("props.title"))
            .with_prop("total", PropValue::expression("a + b"))
            .with_prop("empty", PropValue::null())
            .with_prop(CHILDREN_PROP, PropValue::string("{braces}"));

        let out = serialize(&component);
        assert!(out.markup.contains("items={[1, x]}"));
        assert!(out.markup.contains("title={props.title}"));
        assert!(out.markup.contains("total={a + b}"));
        assert!(out.markup.contains("empty={null}"));
        assert!(out.markup.contains(">&#123;braces&#125;</list>"));
    }

    #[test]
    fn test_escape_text_protects_whitespace() {
        assert_eq!(escape_text("a b"), "a b");
        assert_eq!(escape_text("a  b"), "a &#32;b");
        assert_eq!(escape_text(" a\n"), "&#32;a&#10;");
        assert_eq!(escape_text("x < y"), "x &lt; y");
    }

    #[test]
    fn test_handler_expression_matches_markup() {
        let out = serialize(&button());
        let expected = handler_expression(&handler_id("btn", "onClick"));
        assert_eq!(expected, "__handlers[\"handler:btn:onClick\"]");
        assert!(out.markup.contains(&format!("onClick={{{}}}", expected)));
    }
}
