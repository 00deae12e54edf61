//! CLI command implementations

pub mod list;
pub mod scan;
pub mod tree;

pub use list::ListArgs;
pub use scan::ScanArgs;
pub use tree::TreeArgs;

use repotree_core::{Config, JsonFileStore, ScanReport, Scanner};

/// Open the configured repository store
pub fn open_store(config: &Config) -> anyhow::Result<JsonFileStore> {
    Ok(JsonFileStore::new(config.store.resolved_path()?))
}

/// Scan all configured roots, printing one warning per failed root
pub async fn run_scan(config: &Config) -> anyhow::Result<ScanReport> {
    if config.scan.roots.is_empty() {
        anyhow::bail!(
            "No scan roots configured. Pass --root <dir>, set REPOTREE_ROOTS, \
             or add [scan] roots to the config file."
        );
    }

    let scanner = Scanner::new(config)?;
    let report = scanner.scan().await?;

    for failure in &report.failures {
        eprintln!(
            "Warning: could not scan {}: {}",
            failure.root.display(),
            failure.message
        );
    }

    Ok(report)
}
