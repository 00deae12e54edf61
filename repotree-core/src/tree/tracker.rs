//! Expansion and current-location flags for the grouping tree
//!
//! Flags are derived from a tree and an active path and are never stored
//! on the nodes themselves.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{GroupNode, GroupingTree};
use crate::git::lexical_normalize;

/// Presentation flags for one node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeFlags {
    /// The node contains the active location somewhere below it
    pub is_expanded: bool,
    /// The node is the active location
    pub is_current: bool,
}

/// Flags for every node of a tree, keyed by node id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExpansionState {
    flags: BTreeMap<String, NodeFlags>,
}

impl ExpansionState {
    /// Flags for a node id (collapsed and not current when unknown)
    pub fn get(&self, id: &str) -> NodeFlags {
        self.flags.get(id).copied().unwrap_or_default()
    }

    /// Whether the node should be expanded
    pub fn is_expanded(&self, id: &str) -> bool {
        self.get(id).is_expanded
    }

    /// Whether the node is the active location
    pub fn is_current(&self, id: &str) -> bool {
        self.get(id).is_current
    }

    /// Ids of current nodes
    pub fn current_ids(&self) -> Vec<&str> {
        self.flags
            .iter()
            .filter(|(_, f)| f.is_current)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Ids of expanded nodes, in id order
    pub fn expanded_ids(&self) -> Vec<&str> {
        self.flags
            .iter()
            .filter(|(_, f)| f.is_expanded)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Number of tracked ids
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Whether no ids are tracked
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Iterate over `(id, flags)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeFlags)> {
        self.flags.iter().map(|(id, f)| (id.as_str(), *f))
    }
}

/// Compute expansion and current flags for `tree` given the active path
///
/// A group is expanded when any repository below it has the active path as
/// its root or as one of its worktree paths. A repository without secondary
/// worktrees is current when the active path is its root; otherwise the
/// matching worktree entry is current and the repository is expanded.
/// Without an active path every node is collapsed and not current.
///
/// The active path is compared lexically against the recorded paths, which
/// are canonical. Callers holding a path from the environment should pass it
/// through [`normalize_path`](crate::git::normalize_path) first.
pub fn compute_expansion(tree: &GroupingTree, active_path: Option<&Path>) -> ExpansionState {
    let active: Option<PathBuf> = active_path.map(lexical_normalize);
    let mut flags = BTreeMap::new();

    for node in tree.roots() {
        visit(node, active.as_deref(), &mut flags);
    }

    ExpansionState { flags }
}

/// Record flags for `node` and its descendants, returning whether it contains `active`
fn visit(node: &GroupNode, active: Option<&Path>, flags: &mut BTreeMap<String, NodeFlags>) -> bool {
    if let GroupNode::Repository(leaf) = node {
        let record = leaf.record();
        let contains = active.is_some_and(|path| record.contains_path(path));
        let worktrees = leaf.worktree_children();

        if worktrees.is_empty() {
            flags.insert(
                node.id(),
                NodeFlags {
                    is_expanded: false,
                    is_current: active == Some(record.path.as_path()),
                },
            );
        } else {
            flags.insert(
                node.id(),
                NodeFlags {
                    is_expanded: contains,
                    is_current: false,
                },
            );
            for item in worktrees {
                flags.insert(
                    item.id(),
                    NodeFlags {
                        is_expanded: false,
                        is_current: active == Some(item.path()),
                    },
                );
            }
        }

        return contains;
    }

    // every child is visited so each gets its own flags
    let mut contains = false;
    for child in node.children() {
        contains |= visit(child, active, flags);
    }

    flags.insert(
        node.id(),
        NodeFlags {
            is_expanded: contains,
            is_current: false,
        },
    );

    contains
}
