//! Repotree CLI - Command line interface for repotree
//!
//! Discovers git repositories under configured roots and shows them grouped
//! by remote domain and owner.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use repotree_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{ListArgs, ScanArgs, TreeArgs};

/// Repotree: find your repositories and group them by where they live
#[derive(Parser, Debug)]
#[command(name = "repotree")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root directory to scan (repeatable; overrides config and env)
    #[arg(long = "root", global = true)]
    roots: Vec<PathBuf>,

    /// Path to git executable (overrides config and env)
    #[arg(long, global = true, env = "REPOTREE_GIT_PATH")]
    git_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Scan configured roots and store the repository list
    #[command(visible_alias = "s")]
    Scan(ScanArgs),

    /// List stored repositories
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Show repositories grouped by domain and owner
    #[command(visible_alias = "t")]
    Tree(TreeArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Load configuration with overrides
    let config = Config::load_with_overrides(
        cli.config.as_deref(),
        cli.roots.clone(),
        cli.git_path.clone(),
    )?;

    if cli.verbose {
        tracing::info!(
            roots = ?config.scan.roots,
            git_path = %config.git.git_path,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("repotree {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Scan(args)) => {
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::List(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Tree(args)) => {
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::Config) => {
            println!("Repotree Configuration");
            println!("======================");
            println!();
            println!("Scan Settings:");
            if config.scan.roots.is_empty() {
                println!("  roots: (none)");
            } else {
                println!("  roots:");
                for root in &config.scan.roots {
                    println!("    {}", root.display());
                }
            }
            println!("  ignore_patterns:");
            for pattern in &config.scan.ignore_patterns {
                println!("    {}", pattern);
            }
            println!("  max_parallel: {}", config.scan.max_parallel);
            println!();
            println!("Git Settings:");
            println!("  git_path: {}", config.git.git_path);
            println!();
            match config.store.resolved_path() {
                Ok(path) => println!("Store file: {}", path.display()),
                Err(e) => println!("Store file: unavailable ({})", e),
            }
            if let Some(path) = cli.config.clone().or_else(Config::default_config_path) {
                println!("Config file: {}", path.display());
                if path.exists() {
                    println!("  (exists)");
                } else {
                    println!("  (not found - using defaults)");
                }
            }
        }
        None => {
            println!("Repotree - repository discovery and grouping");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
