//! Scan command - discover repositories and store them

use clap::Args;
use repotree_core::{Config, RepositoryStore};

use super::{open_store, run_scan};

/// Scan configured roots and store the repository list
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Print the scan report as JSON
    #[arg(long)]
    json: bool,
}

impl ScanArgs {
    /// Execute the scan command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let report = run_scan(config).await?;

        let store = open_store(config)?;
        store.save_repositories(report.records.clone()).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!(
            "Found {} repositories in {} roots",
            report.records.len(),
            config.scan.roots.len()
        );

        if verbose {
            for record in &report.records {
                let worktrees = record.worktrees.len();
                println!(
                    "  {} ({} worktree{})",
                    record.path.display(),
                    worktrees,
                    if worktrees == 1 { "" } else { "s" }
                );
            }
        }

        if !report.failures.is_empty() {
            println!("{} roots could not be scanned", report.failures.len());
        }

        Ok(())
    }
}
