mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    diff, init, parse, serialize, sync, DiffArgs, InitArgs, ParseArgs, SerializeArgs, SyncArgs,
};
use tracing_subscriber::EnvFilter;

/// Tandem CLI - keep a visual component tree and its source in step
#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log sync steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default tandem.config.json
    Init(InitArgs),

    /// Map source documents to a component tree
    Parse(ParseArgs),

    /// Generate markup from a component tree
    Serialize(SerializeArgs),

    /// Structural diff of two trees
    Diff(DiffArgs),

    /// Run one source-to-tree sync cycle against a baseline
    Sync(SyncArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = std::env::current_dir()
        .map_err(|e| anyhow::anyhow!("Cannot get current directory: {}", e))
        .and_then(|cwd| match cli.command {
            Command::Init(args) => init(args, &cwd),
            Command::Parse(args) => parse(args, &cwd),
            Command::Serialize(args) => serialize(args, &cwd),
            Command::Diff(args) => diff(args, &cwd),
            Command::Sync(args) => sync(args, &cwd),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
