//! Repotree Core - repository discovery and hierarchical grouping
//!
//! This crate locates git repositories under a set of scan roots, extracts
//! their remote and worktree metadata, groups them into a
//! domain → owner → repository tree, and computes which tree nodes contain
//! an externally supplied active location.

pub mod config;
pub mod error;
pub mod git;
pub mod model;
pub mod scan;
pub mod store;
pub mod tree;

pub use config::{Config, GitConfig, ScanConfig, StoreConfig};
pub use error::{Error, Result};
pub use git::{
    classify, extract_repository, lexical_normalize, linked_worktree_main, normalize_path,
    parse_worktrees, DirectoryWalker, OwnerHierarchy, RemoteLocation, MAX_SCAN_DEPTH,
};
pub use model::{RemoteRecord, RepositoryRecord, WorktreeRecord};
pub use scan::{RootFailure, ScanCancel, ScanReport, Scanner};
pub use store::{JsonFileStore, MemoryStore, RepositoryStore};
pub use tree::{
    build_tree, compute_expansion, DomainNode, ExpansionState, GroupNode, GroupingTree,
    LocalGroupNode, NodeFlags, OwnerNode, RepositoryLeaf, WorktreeItem,
};
