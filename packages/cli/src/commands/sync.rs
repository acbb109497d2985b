use super::{parse_markup, tree_from_json};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tandem_editor::{
    ConflictStrategy, EngineOptions, EventBus, EventKind, SubscribeOptions, SyncEngine, SyncEvent,
    SyncOutcome,
};
use tandem_parser::{Serializer, SourceMapper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    PreferTree,
    PreferSource,
    Manual,
}

impl From<StrategyArg> for ConflictStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::PreferTree => ConflictStrategy::PreferTree,
            StrategyArg::PreferSource => ConflictStrategy::PreferSource,
            StrategyArg::Manual => ConflictStrategy::Manual,
        }
    }
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Last agreed state: markup or tree JSON
    #[arg(long)]
    pub baseline: PathBuf,

    /// Edited markup to propagate
    #[arg(long)]
    pub source: PathBuf,

    /// Override the configured conflict strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,
}

pub fn sync(args: SyncArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let events = run(&args, &config)?;

    for event in &events {
        print_event(event);
    }

    match events.iter().find_map(|event| match event {
        SyncEvent::SyncError { error, .. } => Some(error.clone()),
        _ => None,
    }) {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

/// Seed an engine with the baseline, run one source cycle and return
/// everything it published
fn run(args: &SyncArgs, config: &Config) -> Result<Vec<SyncEvent>> {
    let mut sync_config = config.sync_config();
    if let Some(strategy) = args.strategy {
        sync_config.conflict_strategy = strategy.into();
    }

    // Path ids derive from the document path, so both sides share one
    let source_path = args.source.display().to_string();
    let mapper = SourceMapper::new(config.mapper_options());

    let baseline_text = fs::read_to_string(&args.baseline)
        .with_context(|| format!("Failed to read {}", args.baseline.display()))?;
    let (tree, baseline_source) = if args.baseline.extension().and_then(|s| s.to_str()) == Some("json") {
        let tree = tree_from_json(&baseline_text)
            .with_context(|| format!("Invalid tree JSON in {}", args.baseline.display()))?;
        let markup = Serializer::new(config.serialize_options()).serialize(&tree).markup;
        (tree, markup)
    } else {
        let tree = parse_markup(Path::new(&source_path), &baseline_text, &mapper)?;
        (tree, baseline_text)
    };

    let edited = fs::read_to_string(&args.source)
        .with_context(|| format!("Failed to read {}", args.source.display()))?;

    let bus = EventBus::new();
    let engine = SyncEngine::with_options(
        bus.clone(),
        EngineOptions {
            config: sync_config,
            mapper: config.mapper_options(),
            serializer: config.serialize_options(),
            source_path,
        },
    );
    engine.reset_baseline(tree, baseline_source);

    let published = Arc::new(Mutex::new(Vec::new()));
    for kind in [EventKind::TreeUpdated, EventKind::SyncConflict, EventKind::SyncError] {
        let published = published.clone();
        bus.subscribe(
            kind,
            move |event| {
                published
                    .lock()
                    .map_err(|_| anyhow::anyhow!("event log poisoned"))?
                    .push(event.clone());
                Ok(())
            },
            SubscribeOptions::default(),
        );
    }

    let outcome = engine.sync_from_source(edited);
    tracing::debug!(?outcome, "sync finished");

    let events = published
        .lock()
        .map_err(|_| anyhow::anyhow!("event log poisoned"))?
        .clone();
    Ok(events)
}

fn print_event(event: &SyncEvent) {
    println!("{} {}", "▸".cyan(), event.kind().name().bold());

    match event {
        SyncEvent::TreeUpdated { component_tree, operations } => {
            for operation in operations {
                println!("    {}", operation);
            }
            println!(
                "   {} {} components",
                "Tree:".dimmed(),
                component_tree.count()
            );
        }
        SyncEvent::SyncConflict {
            tree_changes,
            source_changes,
            ..
        } => {
            for operation in tree_changes.iter().chain(source_changes) {
                println!("    {} {}", "!".yellow().bold(), operation);
            }
            println!("   Rerun with --strategy prefer-tree or prefer-source to settle");
        }
        SyncEvent::SyncError { error, .. } => {
            println!("    {} {}", "✗".red(), error);
        }
        _ => {}
    }
}
