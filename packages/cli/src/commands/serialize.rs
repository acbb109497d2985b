use super::read_tree;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tandem_parser::{SerializedSource, Serializer, SourceMapper};

#[derive(Debug, Args)]
pub struct SerializeArgs {
    /// Component tree JSON (markup files are parsed first)
    pub tree: PathBuf,

    /// Also print the collected stylesheet
    #[arg(long)]
    pub stylesheet: bool,

    /// Also print the handler table
    #[arg(long)]
    pub handlers: bool,
}

pub fn serialize(args: SerializeArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let mapper = SourceMapper::new(config.mapper_options());

    let root = read_tree(&args.tree, &mapper)?;
    tracing::debug!(components = root.count(), "serializing tree");

    let output = Serializer::new(config.serialize_options()).serialize(&root);
    print!("{}", render(&output, args.stylesheet, args.handlers)?);
    Ok(())
}

fn render(output: &SerializedSource, stylesheet: bool, handlers: bool) -> Result<String> {
    let mut out = output.markup.clone();

    if stylesheet && !output.stylesheet.is_empty() {
        out.push_str(&format!("\n{}\n", "/* stylesheet */".dimmed()));
        out.push_str(&output.stylesheet);
    }

    if handlers && !output.handlers.is_empty() {
        out.push_str(&format!("\n{}\n", "// handlers".dimmed()));
        let table: serde_json::Map<String, serde_json::Value> = output
            .handlers
            .iter()
            .map(|(id, behavior)| Ok((id.clone(), serde_json::to_value(behavior)?)))
            .collect::<Result<_>>()?;
        out.push_str(&serde_json::to_string_pretty(&table)?);
        out.push('\n');
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_common::{PropValue, VisualComponent};

    #[test]
    fn test_render_sections() {
        colored::control::set_override(false);
        let mut style = tandem_common::Props::new();
        style.insert("color", PropValue::string("red"));

        let root = VisualComponent::new("cta", "button")
            .with_prop("style", PropValue::Object(style))
            .with_prop("onClick", PropValue::reference("go"));
        let output = tandem_parser::serialize(&root);

        let plain = render(&output, false, false).unwrap();
        assert_eq!(plain, output.markup);

        let full = render(&output, true, true).unwrap();
        assert!(full.contains("/* stylesheet */"));
        assert!(full.contains("handler:cta:onClick"));
    }

    #[test]
    fn test_serialize_tree_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(&path, r#"{"id":"a","type":"div","children":[{"id":"b","type":"p"}]}"#).unwrap();

        let args = SerializeArgs {
            tree: path,
            stylesheet: true,
            handlers: true,
        };
        assert!(serialize(args, dir.path()).is_ok());
    }
}
