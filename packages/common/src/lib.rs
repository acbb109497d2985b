//! # Tandem Common
//!
//! Data model shared by the parser, the serializer and the sync engine:
//! the visual component tree, tagged prop values, source documents and
//! the change operations produced by structural diffing.

pub mod component;
pub mod document;
pub mod error;
pub mod operation;
pub mod value;
pub mod visitor;

pub use component::*;
pub use document::*;
pub use error::*;
pub use operation::*;
pub use value::*;
pub use visitor::*;
