//! Scan orchestration across configured roots
//!
//! A scan walks every configured root with one shared duplicate-suppression
//! set, folds linked worktrees into their main repository, then extracts
//! metadata for the remaining repositories concurrently.
//! Scans are single-flight: a request that arrives while another scan is
//! running waits for it to finish and then performs its own fresh scan.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::git::{extract_repository, linked_worktree_main, normalize_path, DirectoryWalker};
use crate::model::RepositoryRecord;
use crate::{Error, Result};

/// Cooperative cancellation flag for an in-flight scan
#[derive(Debug, Clone, Default)]
pub struct ScanCancel(Arc<AtomicBool>);

impl ScanCancel {
    /// Create a flag that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A configured root that could not be scanned at all
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootFailure {
    /// The root that failed
    pub root: PathBuf,
    /// Why it failed
    pub message: String,
}

/// Outcome of scanning all configured roots
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Discovered repositories, sorted by path
    pub records: Vec<RepositoryRecord>,
    /// Roots that contributed nothing because they could not be read
    pub failures: Vec<RootFailure>,
}

/// Repository scanner for a fixed configuration
#[derive(Debug)]
pub struct Scanner {
    roots: Vec<PathBuf>,
    walker: DirectoryWalker,
    git_path: String,
    max_parallel: usize,
    gate: Mutex<()>,
}

impl Scanner {
    /// Create a scanner, compiling the configured ignore patterns
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            roots: config.scan.roots.clone(),
            walker: DirectoryWalker::new(&config.scan.ignore_patterns)?,
            git_path: config.git.git_path.clone(),
            max_parallel: config.scan.max_parallel.max(1),
            gate: Mutex::new(()),
        })
    }

    /// The configured scan roots
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Scan all configured roots
    pub async fn scan(&self) -> Result<ScanReport> {
        self.scan_with_cancel(&ScanCancel::new()).await
    }

    /// Scan all configured roots, stopping early if `cancel` fires
    pub async fn scan_with_cancel(&self, cancel: &ScanCancel) -> Result<ScanReport> {
        let _guard = self.gate.lock().await;

        info!("Starting repository scan with {} roots", self.roots.len());

        let (discovered, failures) = self.discover(self.roots.clone(), cancel).await?;
        for failure in &failures {
            warn!("Error scanning {}: {}", failure.root.display(), failure.message);
        }

        let records = self.extract_all(discovered, cancel).await?;

        info!(
            "Repository scan complete: found {} repositories, {} failed roots",
            records.len(),
            failures.len()
        );

        Ok(ScanReport { records, failures })
    }

    /// Scan a single root
    ///
    /// Unlike [`Scanner::scan`], an unreadable root is returned as an error.
    pub async fn scan_root(&self, root: &Path) -> Result<Vec<RepositoryRecord>> {
        let _guard = self.gate.lock().await;
        let cancel = ScanCancel::new();

        let (discovered, failures) = self.discover(vec![root.to_path_buf()], &cancel).await?;
        if let Some(failure) = failures.into_iter().next() {
            return Err(Error::Unreadable {
                root: failure.root,
                message: failure.message,
            });
        }

        self.extract_all(discovered, &cancel).await
    }

    /// Walk every root on the blocking pool with one shared seen-set
    async fn discover(
        &self,
        roots: Vec<PathBuf>,
        cancel: &ScanCancel,
    ) -> Result<(Vec<PathBuf>, Vec<RootFailure>)> {
        let walker = self.walker.clone();
        let cancel = cancel.clone();

        tokio::task::spawn_blocking(move || {
            let mut seen = HashSet::new();
            let mut discovered = Vec::new();
            let mut failures = Vec::new();

            for root in roots {
                debug!("Scanning path: {}", root.display());
                match walker.walk(&root, &mut seen, &cancel) {
                    Ok(found) => {
                        info!("Found {} repositories in {}", found.len(), root.display());
                        discovered.extend(found);
                    }
                    Err(Error::Cancelled) => return Err(Error::Cancelled),
                    Err(e) => failures.push(RootFailure {
                        message: e.to_string(),
                        root,
                    }),
                }
            }

            Ok((fold_linked_worktrees(discovered), failures))
        })
        .await
        .map_err(|e| Error::Other(format!("Directory walk task failed: {}", e)))?
    }

    /// Extract metadata for each root, at most `max_parallel` at a time
    async fn extract_all(
        &self,
        roots: Vec<PathBuf>,
        cancel: &ScanCancel,
    ) -> Result<Vec<RepositoryRecord>> {
        let permits = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();

        for root in roots {
            let permits = Arc::clone(&permits);
            let git_path = self.git_path.clone();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Other(e.to_string()))?;
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }

                match extract_repository(&git_path, &root).await {
                    Ok(record) => Ok(Some(record)),
                    Err(e) => {
                        warn!("Dropping repository {}: {}", root.display(), e);
                        Ok(None)
                    }
                }
            });
        }

        let mut records = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(Some(record))) => records.push(record),
                Ok(Ok(None)) => {}
                Ok(Err(Error::Cancelled)) => {
                    tasks.abort_all();
                    return Err(Error::Cancelled);
                }
                Ok(Err(e)) => warn!("Repository extraction failed: {}", e),
                Err(e) => warn!("Repository extraction task panicked: {}", e),
            }
        }

        records.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(records)
    }
}

/// Drop linked worktree roots that would duplicate a repository record
///
/// A linked worktree is listed by its main repository, so it is dropped when
/// the main repository was discovered too. Linked worktrees whose main
/// repository lies outside every scan root are kept once per main
/// repository, using the first root in path order.
fn fold_linked_worktrees(discovered: Vec<PathBuf>) -> Vec<PathBuf> {
    let roots: HashSet<PathBuf> = discovered.iter().map(|p| normalize_path(p)).collect();
    let mut orphans: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    let mut kept = Vec::with_capacity(discovered.len());

    for root in discovered {
        let Some(main) = linked_worktree_main(&root) else {
            kept.push(root);
            continue;
        };

        if roots.contains(&main) {
            debug!(
                "Folding linked worktree {} into {}",
                root.display(),
                main.display()
            );
            continue;
        }

        match orphans.get_mut(&main) {
            Some(existing) if *existing <= root => {
                debug!("Linked worktree {} already represented", root.display());
            }
            Some(existing) => *existing = root,
            None => {
                orphans.insert(main, root);
            }
        }
    }

    kept.extend(orphans.into_values());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::normalize_path;
    use std::fs;
    use std::process::Command;
    use tempfile::TempDir;

    fn config_for(roots: Vec<PathBuf>) -> Config {
        let mut config = Config::default();
        config.scan.roots = roots;
        config.scan.max_parallel = 2;
        // keep tests independent of an installed git
        config.git.git_path = "git-binary-that-does-not-exist".to_string();
        config
    }

    fn make_repo(path: &Path) {
        fs::create_dir_all(path.join(".git")).unwrap();
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "git {:?} failed", args);
    }

    /// `dir` as a repository with one commit, plus linked worktrees next to it
    fn make_repo_with_worktrees(dir: &Path, worktrees: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        git(dir, &["init", "-q"]);
        git(dir, &["commit", "-q", "--allow-empty", "-m", "init"]);
        for wt in worktrees {
            git(dir, &["worktree", "add", "-q", "--detach", wt]);
        }
    }

    #[tokio::test]
    async fn test_scan_overlapping_roots_yields_one_record() {
        let temp = TempDir::new().unwrap();
        let projects = temp.path().join("projects");
        make_repo(&projects.join("widgets"));
        make_repo(&projects.join("gadgets"));

        let scanner = Scanner::new(&config_for(vec![
            temp.path().to_path_buf(),
            projects.clone(),
        ]))
        .unwrap();
        let report = scanner.scan().await.unwrap();

        assert!(report.failures.is_empty());
        let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["gadgets", "widgets"]);
    }

    #[tokio::test]
    async fn test_unreadable_root_does_not_abort_siblings() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good");
        make_repo(&good.join("repo"));
        let missing = temp.path().join("missing");

        let scanner = Scanner::new(&config_for(vec![missing.clone(), good])).unwrap();
        let report = scanner.scan().await.unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].root, missing);
    }

    #[tokio::test]
    async fn test_scan_root_contract() {
        let temp = TempDir::new().unwrap();
        make_repo(&temp.path().join("a"));

        let scanner = Scanner::new(&config_for(vec![])).unwrap();
        let records = scanner.scan_root(temp.path()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, normalize_path(&temp.path().join("a")));

        assert!(scanner
            .scan_root(&temp.path().join("missing"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_concurrent_scans_are_serialized() {
        let temp = TempDir::new().unwrap();
        for i in 0..5 {
            make_repo(&temp.path().join(format!("repo{}", i)));
        }

        let scanner = Arc::new(
            Scanner::new(&config_for(vec![temp.path().to_path_buf()])).unwrap(),
        );
        let first = tokio::spawn({
            let scanner = Arc::clone(&scanner);
            async move { scanner.scan().await }
        });
        let second = tokio::spawn({
            let scanner = Arc::clone(&scanner);
            async move { scanner.scan().await }
        });

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!(first.records.len(), 5);
        assert_eq!(second.records.len(), 5);

        let paths = |r: &ScanReport| {
            r.records
                .iter()
                .map(|x| x.path.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(paths(&first), paths(&second));
    }

    #[tokio::test]
    async fn test_cancelled_scan() {
        let temp = TempDir::new().unwrap();
        make_repo(&temp.path().join("a"));

        let scanner = Scanner::new(&config_for(vec![temp.path().to_path_buf()])).unwrap();
        let cancel = ScanCancel::new();
        cancel.cancel();

        let result = scanner.scan_with_cancel(&cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_invalid_pattern_fails_construction() {
        let mut config = config_for(vec![]);
        config.scan.ignore_patterns = vec!["[".to_string()];
        assert!(Scanner::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_linked_worktree_folds_into_main_repository() {
        let temp = TempDir::new().unwrap();
        let code = temp.path().join("code");
        make_repo_with_worktrees(&code.join("r"), &["../r-wt"]);

        let mut config = config_for(vec![code.clone()]);
        config.git.git_path = "git".to_string();
        let report = Scanner::new(&config).unwrap().scan().await.unwrap();

        assert_eq!(report.records.len(), 1);
        let record = &report.records[0];
        assert_eq!(record.path, normalize_path(&code.join("r")));

        let paths: Vec<PathBuf> = record.worktrees.iter().map(|wt| wt.path.clone()).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&normalize_path(&code.join("r-wt"))));
    }

    #[tokio::test]
    async fn test_linked_worktrees_outside_main_keep_one_record() {
        let temp = TempDir::new().unwrap();
        let main = temp.path().join("main").join("r");
        make_repo_with_worktrees(&main, &["../../wts/b", "../../wts/a"]);
        let wts = temp.path().join("wts");

        let report = Scanner::new(&config_for(vec![wts.clone()]))
            .unwrap()
            .scan()
            .await
            .unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].path, normalize_path(&wts.join("a")));
    }

    #[test]
    fn test_fold_keeps_plain_repositories() {
        let temp = TempDir::new().unwrap();
        make_repo(&temp.path().join("a"));
        make_repo(&temp.path().join("b"));

        let roots = vec![
            normalize_path(&temp.path().join("a")),
            normalize_path(&temp.path().join("b")),
        ];
        assert_eq!(fold_linked_worktrees(roots.clone()), roots);
    }
}
