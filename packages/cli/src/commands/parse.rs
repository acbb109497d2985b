use super::collect_documents;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tandem_common::{SourceDocument, VisualComponent};
use tandem_parser::{format_error, SourceMapper};

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Source files or directories to map
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Print the component tree as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn parse(args: ParseArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let mapper = SourceMapper::new(config.mapper_options());

    let documents = collect_documents(&args.paths)?;
    let parsed = mapper.parse_documents(&documents);

    for failure in &parsed.failures {
        let source = documents
            .iter()
            .find(|d| d.path == failure.path)
            .map(|d| d.content.as_str())
            .unwrap_or_default();
        eprintln!("{} Skipped {}", "⚠️".yellow(), failure.path.bright_white());
        eprintln!("{}", format_error(source, &failure.path, &failure.error));
    }

    if !args.json {
        print_summary(&documents, parsed.stylesheets.len(), parsed.scripts.len(), parsed.failures.len());
        for (path, sheet) in &parsed.stylesheets {
            println!(
                "  {} {} ({} rules)",
                "style".magenta(),
                path,
                sheet.rules.len()
            );
        }
        for (path, module) in &parsed.scripts {
            let exported: Vec<&str> = module
                .functions
                .iter()
                .filter(|f| f.exported)
                .map(|f| f.name.as_str())
                .collect();
            println!(
                "  {} {} ({} functions, {} embedded fragments{})",
                "script".blue(),
                path,
                module.functions.len(),
                module.fragments.len(),
                if exported.is_empty() {
                    String::new()
                } else {
                    format!(", exports {}", exported.join(", "))
                }
            );
        }
        println!();
    }

    let root = parsed.into_root();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&root)?);
    } else {
        print!("{}", outline(&root));
    }

    Ok(())
}

fn print_summary(documents: &[SourceDocument], stylesheets: usize, scripts: usize, failures: usize) {
    println!(
        "🔍 {} {} documents ({} stylesheets, {} scripts)",
        "Parsed".green().bold(),
        documents.len(),
        stylesheets,
        scripts
    );
    if failures > 0 {
        println!("   {} {}", "Skipped:".yellow(), failures);
    }
}

/// Indented tree listing: type, id, then prop names
pub(crate) fn outline(root: &VisualComponent) -> String {
    let mut out = String::new();
    write_outline(&mut out, root, 0);
    out
}

fn write_outline(out: &mut String, component: &VisualComponent, depth: usize) {
    let props: Vec<&str> = component.props.keys().collect();
    let _ = write!(
        out,
        "{}<{}> {}",
        "  ".repeat(depth),
        component.kind.cyan(),
        component.id.dimmed()
    );
    if !props.is_empty() {
        let _ = write!(out, " [{}]", props.join(", "));
    }
    if let (Some(x), Some(y)) = (component.x, component.y) {
        let _ = write!(out, " @({}, {})", x, y);
    }
    out.push('\n');

    for child in &component.children {
        write_outline(out, child, depth + 1);
    }
}
