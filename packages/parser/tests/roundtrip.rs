use tandem_common::{
    validate_tree, CommonError, PropValue, Props, VisualComponent, CHILDREN_PROP, STYLE_PROP, X_ATTRIBUTE,
};
use tandem_parser::{parse_markup_tree, parse_stylesheet, serialize, serialize_tree};

fn literal_tree() -> VisualComponent {
    VisualComponent::new("page", "Section")
        .with_prop("title", "Pricing plans")
        .with_prop("columns", 3.0)
        .with_prop("ratio", 0.75)
        .with_prop("visible", true)
        .with_prop("collapsed", false)
        .with_prop("footer", PropValue::null())
        .with_child(
            VisualComponent::new("plan-basic", "Card")
                .with_prop("price", 9.0)
                .with_child(VisualComponent::new("plan-basic-title", "h2").with_prop(CHILDREN_PROP, "Basic"))
                .with_child(VisualComponent::new("plan-basic-cta", "button").with_prop("label", "Buy \"now\"")),
        )
        .with_child(VisualComponent::new("divider", "hr"))
        .with_child(
            VisualComponent::new("plan-pro", "Card")
                .with_prop("price", 29.0)
                .at(120.0, 48.0),
        )
}

fn assert_same_shape(expected: &VisualComponent, actual: &VisualComponent) {
    assert_eq!(actual.id, expected.id);
    assert_eq!(actual.kind, expected.kind.to_lowercase());
    assert_eq!(actual.props, expected.props, "props of {}", expected.id);
    assert_eq!(actual.placement(), expected.placement());
    assert_eq!(actual.children.len(), expected.children.len());

    for (e, a) in expected.children.iter().zip(&actual.children) {
        assert_same_shape(e, a);
    }
}

#[test]
fn test_literal_tree_survives_serialize_and_parse() {
    let tree = literal_tree();
    let source = serialize(&tree);
    let parsed = parse_markup_tree("page.html", &source.markup).unwrap();

    assert_same_shape(&tree, &parsed);
}

#[test]
fn test_serialization_is_stable_after_one_round() {
    let first = serialize(&literal_tree());
    let parsed = parse_markup_tree("page.html", &first.markup).unwrap();
    let second = serialize(&parsed);

    assert_eq!(first.markup, second.markup);
}

#[test]
fn test_multiple_roots_round_trip_through_fragment() {
    let roots = vec![
        VisualComponent::new("a", "header").with_prop(CHILDREN_PROP, "Top"),
        VisualComponent::new("b", "footer").with_prop(CHILDREN_PROP, "Bottom"),
    ];
    let source = serialize_tree(&roots);
    let parsed = parse_markup_tree("page.html", &source.markup).unwrap();

    assert!(parsed.is_fragment());
    assert_eq!(parsed.children.len(), 2);
    assert_eq!(parsed.children[1].id, "b");
}

#[test]
fn test_style_prop_round_trips_and_stylesheet_parses() {
    let mut style = Props::new();
    style.insert("color", PropValue::string("rebeccapurple"));
    style.insert("margin", PropValue::string("0 auto"));
    let tree = VisualComponent::new("hero", "div").with_prop(STYLE_PROP, style.clone());

    let source = serialize(&tree);
    let parsed = parse_markup_tree("page.html", &source.markup).unwrap();
    assert_eq!(parsed.props.get(STYLE_PROP), Some(&PropValue::Object(style)));

    let sheet = parse_stylesheet(&source.stylesheet).unwrap();
    assert_eq!(sheet.rules.len(), 1);
    assert_eq!(sheet.rules[0].selector, "[data-tandem-id=\"hero\"]");
    assert_eq!(sheet.rules[0].declaration("margin"), Some("0 auto"));
}

#[test]
fn test_handlers_are_extracted_not_emitted() {
    let tree = VisualComponent::new("save", "button")
        .with_prop("onClick", PropValue::reference("handleSave"))
        .with_prop(CHILDREN_PROP, "Save");

    let source = serialize(&tree);
    assert!(!source.markup.contains("handleSave"));
    assert_eq!(source.handlers.len(), 1);

    let parsed = parse_markup_tree("page.html", &source.markup).unwrap();
    assert_eq!(
        parsed.props.get("onClick"),
        Some(&PropValue::expression("__handlers[\"handler:save:onClick\"]"))
    );

    // Reserializing keeps the same synthetic id
    let again = serialize(&parsed);
    assert_eq!(again.markup, source.markup);
}

#[test]
fn test_text_whitespace_is_kept() {
    for text in ["a  b", " leading", "trailing ", "line\nbreak", "tab\tstop", "  "] {
        let tree = VisualComponent::new("p", "p").with_prop(CHILDREN_PROP, text);
        let source = serialize(&tree);
        let parsed = parse_markup_tree("page.html", &source.markup).unwrap();
        assert_eq!(
            parsed.props.get(CHILDREN_PROP),
            Some(&PropValue::string(text)),
            "text {:?} from {}",
            text,
            source.markup
        );
    }
}

#[test]
fn test_string_style_stays_a_string() {
    let tree = VisualComponent::new("p", "p").with_prop(STYLE_PROP, "color: red");
    let source = serialize(&tree);
    let parsed = parse_markup_tree("page.html", &source.markup).unwrap();

    assert_eq!(parsed.props.get(STYLE_PROP), Some(&PropValue::string("color: red")));
    assert!(source.stylesheet.is_empty());
}

#[test]
fn test_placement_names_are_reserved() {
    let tree = VisualComponent::new("p", "p").with_prop(X_ATTRIBUTE, 3.0).at(1.0, 2.0);
    assert!(matches!(
        validate_tree(std::slice::from_ref(&tree)),
        Err(CommonError::ReservedProp { .. })
    ));

    // The shadowing prop is never written, so placement reads back intact
    let parsed = parse_markup_tree("page.html", &serialize(&tree).markup).unwrap();
    assert_eq!(parsed.placement(), tree.placement());
    assert!(parsed.props.is_empty());
}

#[test]
fn test_mixed_case_void_tag() {
    let parsed = parse_markup_tree("page.html", r#"<div><IMG src="a.png"><p>after</p></div>"#).unwrap();

    assert_eq!(parsed.children.len(), 2);
    assert_eq!(parsed.children[0].kind, "img");
    assert_eq!(parsed.children[1].kind, "p");
}
