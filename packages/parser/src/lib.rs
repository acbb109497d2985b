pub mod error;
pub mod id_generator;
pub mod mapper;
pub mod markup;
pub mod script;
pub mod serializer;
pub mod style;

pub use error::{ParseError, ParseResult};
#[cfg(feature = "pretty-errors")]
pub use error::format_error;
pub use id_generator::{get_document_id, IDGenerator};
pub use mapper::{
    classify_attribute, classify_expression, parse_documents, parse_markup_tree, tree_root,
    walk_markup, DocumentFailure, MapperOptions, MarkupVisitor, ParsedSources, SourceMapper,
    TreeBuilder,
};
pub use markup::{parse_markup, AttrValue, Attribute, MarkupElement, MarkupNode, MarkupParser};
pub use script::{parse_script, EmbeddedFragment, FunctionDecl, ScriptModule};
pub use serializer::{
    declaration_value, escape_attribute, escape_text, handler_expression, handler_id, serialize,
    serialize_tree, HandlerCollector, SerializeOptions, SerializedSource, Serializer, StyleCollector,
    HANDLER_TABLE,
};
pub use style::{parse_declarations, parse_stylesheet, StyleRule, StyleSheet};
