use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Which front-end understands a source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Language {
    /// Structural markup (tags, attributes, text)
    Markup,
    /// Style declarations
    Style,
    /// Behavior script, possibly embedding markup fragments
    Script,
}

impl Language {
    /// Infer the language from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" | "xml" | "markup" => Some(Language::Markup),
            "css" => Some(Language::Style),
            "js" | "jsx" | "ts" | "tsx" | "mjs" => Some(Language::Script),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Markup => write!(f, "markup"),
            Language::Style => write!(f, "style"),
            Language::Script => write!(f, "script"),
        }
    }
}

/// A named, language-tagged block of source text
///
/// Treated as immutable for the duration of a sync cycle; edits replace
/// the document wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub path: String,
    pub content: String,
    pub language: Language,
}

impl SourceDocument {
    pub fn new(path: impl Into<String>, content: impl Into<String>, language: Language) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            language,
        }
    }

    pub fn markup(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(path, content, Language::Markup)
    }

    /// Build a document, inferring the language from the path
    pub fn infer(path: impl Into<String>, content: impl Into<String>) -> Option<Self> {
        let path = path.into();
        let language = Language::from_path(Path::new(&path))?;
        Some(Self::new(path, content, language))
    }
}
