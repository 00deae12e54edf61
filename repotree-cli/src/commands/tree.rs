//! Tree command - show repositories grouped by domain and owner

use std::path::PathBuf;

use clap::Args;
use repotree_core::{
    build_tree, compute_expansion, normalize_path, Config, ExpansionState, GroupNode,
    GroupingTree, RepositoryStore,
};
use serde_json::json;

use super::{open_store, run_scan};

/// Show repositories grouped by domain and owner
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Active location to highlight (defaults to the current directory)
    #[arg(short, long)]
    active: Option<PathBuf>,

    /// Rescan before grouping instead of using the stored list
    #[arg(long)]
    scan: bool,

    /// Show every node, not only those on the way to the active location
    #[arg(long)]
    all: bool,

    /// Print the tree and flags as JSON
    #[arg(long)]
    json: bool,
}

impl TreeArgs {
    /// Execute the tree command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let store = open_store(config)?;

        let mut records = if self.scan {
            Vec::new()
        } else {
            store.get_repositories().await?
        };

        if records.is_empty() {
            if verbose {
                println!("Scanning {} roots...", config.scan.roots.len());
            }
            records = run_scan(config).await?.records;
            store.save_repositories(records.clone()).await?;
        }

        let active = match &self.active {
            Some(path) => Some(normalize_path(path)),
            None => std::env::current_dir().ok().map(|cwd| normalize_path(&cwd)),
        };

        let tree = build_tree(&records);
        let state = compute_expansion(&tree, active.as_deref());

        if self.json {
            let output = json!({ "tree": tree, "flags": state });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        if tree.is_empty() {
            println!("No repositories found.");
            return Ok(());
        }

        print_tree(&tree, &state, self.all);
        Ok(())
    }
}

fn print_tree(tree: &GroupingTree, state: &ExpansionState, show_all: bool) {
    for node in tree.roots() {
        print_node(node, state, show_all, 0);
    }
}

fn print_node(node: &GroupNode, state: &ExpansionState, show_all: bool, depth: usize) {
    let id = node.id();
    let flags = state.get(&id);
    let indent = "  ".repeat(depth);
    let current = if flags.is_current { " *" } else { "" };

    match node {
        GroupNode::Repository(leaf) => {
            let worktrees = leaf.worktree_children();
            let marker = if worktrees.is_empty() {
                "-"
            } else if flags.is_expanded || show_all {
                "▾"
            } else {
                "▸"
            };
            let branch = leaf
                .record()
                .current_branch
                .as_deref()
                .map(|b| format!(" [{}]", b))
                .unwrap_or_default();
            println!("{}{} {}{}{}", indent, marker, node.label(), branch, current);

            if flags.is_expanded || show_all {
                for item in worktrees {
                    let current = if state.is_current(&item.id()) { " *" } else { "" };
                    println!("{}    {}{}", indent, item.label(), current);
                }
            }
        }
        _ => {
            let open = flags.is_expanded || show_all;
            let marker = if open { "▾" } else { "▸" };
            println!(
                "{}{} {} ({}){}",
                indent,
                marker,
                node.label(),
                node.repository_count(),
                current
            );

            if open {
                for child in node.children() {
                    print_node(child, state, show_all, depth + 1);
                }
            }
        }
    }
}
