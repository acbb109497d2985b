pub mod diff;
pub mod init;
pub mod parse;
pub mod serialize;
pub mod sync;

pub use diff::{diff, DiffArgs};
pub use init::{init, InitArgs};
pub use parse::{parse, ParseArgs};
pub use serialize::{serialize, SerializeArgs};
pub use sync::{sync, SyncArgs};

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tandem_common::{Language, SourceDocument, VisualComponent};
use tandem_parser::{format_error, tree_root, SourceMapper};
use walkdir::WalkDir;

/// Expand files and directories into source documents of known languages
pub(crate) fn collect_documents(paths: &[PathBuf]) -> Result<Vec<SourceDocument>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let file = entry.path();
                if file.is_file() && Language::from_path(file).is_some() {
                    files.push(file.to_path_buf());
                }
            }
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(anyhow!("Path does not exist: {}", path.display()));
        }
    }

    files
        .into_iter()
        .map(|file| {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            SourceDocument::infer(file.display().to_string(), content)
                .ok_or_else(|| anyhow!("Unknown source language: {}", file.display()))
        })
        .collect()
}

/// Load a tree from component JSON (`.json`) or strictly parsed markup
pub(crate) fn read_tree(path: &Path, mapper: &SourceMapper) -> Result<VisualComponent> {
    let source = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    if path.extension().and_then(|s| s.to_str()) == Some("json") {
        return tree_from_json(&source).with_context(|| format!("Invalid tree JSON in {}", path.display()));
    }

    parse_markup(path, &source, mapper)
}

/// Strictly parse markup, rendering errors with source context
pub(crate) fn parse_markup(path: &Path, source: &str, mapper: &SourceMapper) -> Result<VisualComponent> {
    mapper.parse_markup_tree(&path.display().to_string(), source).map_err(|e| {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown");
        anyhow!("\n{}", format_error(source, file_name, &e))
    })
}

/// A single component object, or an array of roots
pub(crate) fn tree_from_json(source: &str) -> Result<VisualComponent> {
    let value: serde_json::Value = serde_json::from_str(source)?;
    if value.is_array() {
        let roots: Vec<VisualComponent> = serde_json::from_value(value)?;
        Ok(tree_root(roots))
    } else {
        Ok(serde_json::from_value(value)?)
    }
}
