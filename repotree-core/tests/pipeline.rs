//! Scan → group → expand pipeline over real directories

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use git2::Repository;
use repotree_core::{
    build_tree, compute_expansion, normalize_path, Config, GroupNode, MemoryStore,
    RepositoryStore, Scanner,
};
use tempfile::TempDir;

fn init_repo(path: &Path, remote: Option<&str>) {
    fs::create_dir_all(path).unwrap();
    let repo = Repository::init(path).unwrap();
    if let Some(url) = remote {
        repo.remote("origin", url).unwrap();
    }
}

fn scanner(roots: Vec<PathBuf>) -> Scanner {
    let mut config = Config::default();
    config.scan.roots = roots;
    // worktree and log lookups fail; records fall back to the main worktree
    config.git.git_path = "git-binary-that-does-not-exist".to_string();
    Scanner::new(&config).unwrap()
}

fn fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let code = temp.path().join("code");
    init_repo(&code.join("widgets"), Some("git@github.com:acme/widgets.git"));
    init_repo(&code.join("proj"), Some("https://gitlab.com/org/team/proj.git"));
    init_repo(&code.join("notes"), None);
    fs::create_dir_all(code.join("node_modules").join("dep").join(".git")).unwrap();
    temp
}

#[tokio::test]
async fn scan_group_and_expand() {
    let temp = fixture();
    let code = temp.path().join("code");

    let report = scanner(vec![code.clone()]).scan().await.unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.records.len(), 3);

    for record in &report.records {
        let mains: Vec<_> = record.worktrees.iter().filter(|wt| wt.is_main).collect();
        assert_eq!(mains.len(), 1);
        assert_eq!(mains[0].path, record.path);
    }

    let tree = build_tree(&report.records);
    let labels: Vec<&str> = tree.roots().iter().map(GroupNode::label).collect();
    assert_eq!(labels, vec!["github.com", "gitlab.com", "Local"]);

    let team = tree.find("owner:gitlab.com:org/team").unwrap();
    assert_eq!(team.children()[0].label(), "proj");

    let widgets = normalize_path(&code.join("widgets"));
    let state = compute_expansion(&tree, Some(&widgets));
    assert!(state.is_expanded("domain:github.com"));
    assert!(state.is_expanded("owner:github.com:acme"));
    assert!(!state.is_expanded("domain:gitlab.com"));
    assert_eq!(
        state.current_ids(),
        vec![format!("repo:{}", widgets.display()).as_str()]
    );
}

#[tokio::test]
async fn overlapping_roots_yield_one_record_each() {
    let temp = fixture();
    let code = temp.path().join("code");

    let report = scanner(vec![temp.path().to_path_buf(), code.clone(), code.join("widgets")])
        .scan()
        .await
        .unwrap();

    assert_eq!(report.records.len(), 3);
}

#[tokio::test]
async fn pipeline_is_idempotent_and_order_independent() {
    let temp = fixture();
    let scanner = scanner(vec![temp.path().join("code")]);

    let records = scanner.scan().await.unwrap().records;
    let mut shuffled = records.clone();
    shuffled.reverse();

    let tree = build_tree(&records);
    assert_eq!(build_tree(&shuffled), tree);

    let active = normalize_path(&temp.path().join("code").join("proj"));
    let first = compute_expansion(&tree, Some(&active));
    let second = compute_expansion(&build_tree(&shuffled), Some(&active));
    assert_eq!(first, second);

    assert_eq!(
        serde_json::to_string(&tree).unwrap(),
        serde_json::to_string(&build_tree(&shuffled)).unwrap()
    );
}

#[tokio::test]
async fn store_round_trip_feeds_tree() {
    let temp = fixture();
    let report = scanner(vec![temp.path().join("code")]).scan().await.unwrap();

    let store = MemoryStore::new();
    let mut changes = store.subscribe();
    store.save_repositories(report.records.clone()).await.unwrap();

    let delivered = changes.recv().await.unwrap();
    assert_eq!(build_tree(&delivered), build_tree(&report.records));
    assert_eq!(store.get_repositories().await.unwrap().len(), 3);
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

#[tokio::test]
async fn linked_worktree_under_root_has_unique_ids() {
    let temp = TempDir::new().unwrap();
    let code = temp.path().join("code");
    let main = code.join("r");
    fs::create_dir_all(&main).unwrap();
    git(&main, &["init", "-q"]);
    git(&main, &["remote", "add", "origin", "git@github.com:acme/r.git"]);
    git(&main, &["commit", "-q", "--allow-empty", "-m", "init"]);
    git(&main, &["worktree", "add", "-q", "--detach", "../r-wt"]);

    let mut config = Config::default();
    config.scan.roots = vec![code.clone()];
    let report = Scanner::new(&config).unwrap().scan().await.unwrap();
    assert_eq!(report.records.len(), 1);

    let tree = build_tree(&report.records);
    let mut ids = Vec::new();
    for node in tree.walk() {
        ids.push(node.id());
        if let Some(leaf) = node.as_repository() {
            ids.extend(leaf.worktree_children().iter().map(|wt| wt.id()));
        }
    }
    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate ids: {:?}", ids);

    let linked = normalize_path(&code.join("r-wt"));
    let state = compute_expansion(&tree, Some(&linked));
    assert_eq!(
        state.current_ids(),
        vec![format!("worktree:{}", linked.display()).as_str()]
    );
    let main_id = format!("repo:{}", normalize_path(&main).display());
    assert!(state.is_expanded(&main_id));
    assert_eq!(
        state
            .expanded_ids()
            .iter()
            .filter(|id| id.starts_with("repo:"))
            .count(),
        1
    );
}
