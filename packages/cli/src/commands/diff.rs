use super::read_tree;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::{ColoredString, Colorize};
use std::path::{Path, PathBuf};
use tandem_common::ChangeOperation;
use tandem_parser::SourceMapper;

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Baseline markup or tree JSON
    pub baseline: PathBuf,

    /// Current markup or tree JSON
    pub current: PathBuf,

    /// Print operations as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn diff(args: DiffArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let mapper = SourceMapper::new(config.mapper_options());

    let baseline = read_tree(&args.baseline, &mapper)?;
    let current = read_tree(&args.current, &mapper)?;
    let operations = tandem_editor::diff(&baseline, &current);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&operations)?);
        return Ok(());
    }

    if operations.is_empty() {
        println!("{} No structural changes", "✓".green());
        return Ok(());
    }

    for operation in &operations {
        println!("{} {}", marker(operation), operation);
    }
    println!();
    println!("   {} {}", "Operations:".bold(), operations.len());

    Ok(())
}

fn marker(operation: &ChangeOperation) -> ColoredString {
    match operation {
        ChangeOperation::Add { .. } => "+".green().bold(),
        ChangeOperation::Update { .. } => "~".yellow().bold(),
        ChangeOperation::Delete { .. } => "-".red().bold(),
        ChangeOperation::Move { .. } => ">".blue().bold(),
    }
}
