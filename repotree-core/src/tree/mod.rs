//! Hierarchical grouping of repositories
//!
//! Repositories with a remote are grouped by remote domain and then by the
//! owner path segments of their first remote URL. Repositories without a
//! remote are collected in a single local group. The tree is rebuilt from
//! the flat repository list on every request and is read-only once built.

mod builder;
mod tracker;

use std::path::Path;

use serde::Serialize;

use crate::model::{RepositoryRecord, WorktreeRecord};

pub use builder::build_tree;
pub use tracker::{compute_expansion, ExpansionState, NodeFlags};

/// Label of the group holding repositories without a remote
pub const LOCAL_GROUP_LABEL: &str = "Local";

/// Id of the group holding repositories without a remote
pub const LOCAL_GROUP_ID: &str = "local";

/// A remote domain such as `github.com`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainNode {
    domain: String,
    repository_count: usize,
    children: Vec<GroupNode>,
}

impl DomainNode {
    /// The domain name
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// One owner path segment under a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerNode {
    domain: String,
    segment: String,
    full_path: String,
    repository_count: usize,
    children: Vec<GroupNode>,
}

impl OwnerNode {
    /// Domain this owner belongs to
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// This node's own segment
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Segments from the domain down to this node, joined with `/`
    pub fn full_path(&self) -> &str {
        &self.full_path
    }
}

/// Repositories that have no usable remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalGroupNode {
    repository_count: usize,
    children: Vec<GroupNode>,
}

/// A single repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryLeaf {
    record: RepositoryRecord,
}

impl RepositoryLeaf {
    /// The repository record
    pub fn record(&self) -> &RepositoryRecord {
        &self.record
    }

    /// Worktrees listed under this repository
    ///
    /// All worktrees (main included) are listed when the repository has at
    /// least one secondary worktree; otherwise the repository stands for its
    /// main worktree and nothing is listed.
    pub fn worktree_children(&self) -> Vec<WorktreeItem<'_>> {
        if !self.record.has_secondary_worktrees() {
            return Vec::new();
        }

        self.record
            .worktrees
            .iter()
            .map(|worktree| WorktreeItem {
                repository: &self.record,
                worktree,
            })
            .collect()
    }
}

/// A worktree shown beneath its repository
#[derive(Debug, Clone, Copy)]
pub struct WorktreeItem<'a> {
    /// Owning repository
    pub repository: &'a RepositoryRecord,
    /// The worktree itself
    pub worktree: &'a WorktreeRecord,
}

impl WorktreeItem<'_> {
    /// Stable identity string
    pub fn id(&self) -> String {
        format!("worktree:{}", self.worktree.path.display())
    }

    /// Worktree path
    pub fn path(&self) -> &Path {
        &self.worktree.path
    }

    /// Display label with branch or detached commit
    pub fn label(&self) -> String {
        match (&self.worktree.branch, &self.worktree.commit_hash) {
            (Some(branch), _) => format!("{} ({})", self.worktree.name, branch),
            (None, Some(hash)) => format!("{} (detached at {})", self.worktree.name, hash),
            (None, None) => format!("{} (detached)", self.worktree.name),
        }
    }
}

/// A node of the grouping tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupNode {
    /// Remote domain
    Domain(DomainNode),
    /// Owner path segment
    Owner(OwnerNode),
    /// Repositories without a remote
    Local(LocalGroupNode),
    /// A repository
    Repository(RepositoryLeaf),
}

impl GroupNode {
    /// Stable identity string used for diffing between refreshes
    pub fn id(&self) -> String {
        match self {
            GroupNode::Domain(node) => format!("domain:{}", node.domain),
            GroupNode::Owner(node) => format!("owner:{}:{}", node.domain, node.full_path),
            GroupNode::Local(_) => LOCAL_GROUP_ID.to_string(),
            GroupNode::Repository(leaf) => format!("repo:{}", leaf.record.path.display()),
        }
    }

    /// Display label
    pub fn label(&self) -> &str {
        match self {
            GroupNode::Domain(node) => &node.domain,
            GroupNode::Owner(node) => &node.segment,
            GroupNode::Local(_) => LOCAL_GROUP_LABEL,
            GroupNode::Repository(leaf) => &leaf.record.name,
        }
    }

    /// Child nodes in display order
    pub fn children(&self) -> &[GroupNode] {
        match self {
            GroupNode::Domain(node) => &node.children,
            GroupNode::Owner(node) => &node.children,
            GroupNode::Local(node) => &node.children,
            GroupNode::Repository(_) => &[],
        }
    }

    /// Number of repositories at or below this node
    pub fn repository_count(&self) -> usize {
        match self {
            GroupNode::Domain(node) => node.repository_count,
            GroupNode::Owner(node) => node.repository_count,
            GroupNode::Local(node) => node.repository_count,
            GroupNode::Repository(_) => 1,
        }
    }

    /// The repository leaf, if this is one
    pub fn as_repository(&self) -> Option<&RepositoryLeaf> {
        match self {
            GroupNode::Repository(leaf) => Some(leaf),
            _ => None,
        }
    }
}

/// The grouping forest: domains in order, then the local group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupingTree {
    roots: Vec<GroupNode>,
}

impl GroupingTree {
    /// Top-level nodes
    pub fn roots(&self) -> &[GroupNode] {
        &self.roots
    }

    /// Whether no repositories were grouped
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of repositories in the tree
    pub fn repository_count(&self) -> usize {
        self.roots.iter().map(GroupNode::repository_count).sum()
    }

    /// All nodes in pre-order
    pub fn walk(&self) -> Vec<&GroupNode> {
        let mut nodes = Vec::new();
        let mut stack: Vec<&GroupNode> = self.roots.iter().rev().collect();
        while let Some(node) = stack.pop() {
            nodes.push(node);
            stack.extend(node.children().iter().rev());
        }
        nodes
    }

    /// Find a node by id
    pub fn find(&self, id: &str) -> Option<&GroupNode> {
        self.walk().into_iter().find(|node| node.id() == id)
    }
}
