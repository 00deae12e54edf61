//! List command - show stored repositories

use clap::Args;
use repotree_core::{Config, RepositoryStore};

use super::open_store;

/// List stored repositories
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

impl ListArgs {
    /// Execute the list command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = open_store(config)?;
        let records = store.get_repositories().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }

        if records.is_empty() {
            println!("No repositories stored. Run 'repotree scan' first.");
            return Ok(());
        }

        for record in &records {
            let branch = record.current_branch.as_deref().unwrap_or("(detached)");
            let remote = record.primary_fetch_url().unwrap_or("(no remote)");
            println!("{:<30} {:<20} {}", record.name, branch, remote);
            println!("  {}", record.path.display());
        }

        Ok(())
    }
}
