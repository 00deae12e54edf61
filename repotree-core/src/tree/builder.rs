//! Grouping tree construction

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use super::{DomainNode, GroupNode, GroupingTree, LocalGroupNode, OwnerNode, RepositoryLeaf};
use crate::git::classify;
use crate::model::RepositoryRecord;

/// Repositories and child owners collected for one prefix during a build
#[derive(Debug, Default)]
struct Bucket {
    repositories: Vec<RepositoryRecord>,
    children: BTreeMap<String, Bucket>,
}

impl Bucket {
    fn insert(&mut self, owners: &[String], record: RepositoryRecord) {
        let mut bucket = self;
        for segment in owners {
            bucket = bucket.children.entry(segment.clone()).or_default();
        }
        bucket.repositories.push(record);
    }

    /// Convert into ordered child nodes, returning them with their total count
    ///
    /// Owners come first (BTreeMap order), then repository leaves.
    fn into_children(self, domain: &str, prefix: Option<&str>) -> (Vec<GroupNode>, usize) {
        let mut children = Vec::with_capacity(self.children.len() + self.repositories.len());
        let mut count = 0;

        for (segment, bucket) in self.children {
            let full_path = match prefix {
                Some(prefix) => format!("{}/{}", prefix, segment),
                None => segment.clone(),
            };
            let (grandchildren, repository_count) = bucket.into_children(domain, Some(&full_path));
            count += repository_count;
            children.push(GroupNode::Owner(OwnerNode {
                domain: domain.to_string(),
                segment,
                full_path,
                repository_count,
                children: grandchildren,
            }));
        }

        count += self.repositories.len();
        children.extend(into_leaves(self.repositories));

        (children, count)
    }
}

fn leaf_order(a: &RepositoryRecord, b: &RepositoryRecord) -> Ordering {
    a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path))
}

fn into_leaves(mut repositories: Vec<RepositoryRecord>) -> impl Iterator<Item = GroupNode> {
    repositories.sort_by(leaf_order);
    repositories
        .into_iter()
        .map(|record| GroupNode::Repository(RepositoryLeaf { record }))
}

/// Build the grouping tree from a flat repository list
///
/// The result depends only on the set of records, not their order. Only the
/// first remote of each repository is used for grouping.
pub fn build_tree(records: &[RepositoryRecord]) -> GroupingTree {
    let mut domains: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut local = Vec::new();

    for record in records {
        match record.primary_fetch_url() {
            Some(url) => {
                let location = classify(url);
                let hierarchy = location.hierarchy();
                debug!(
                    repository = %record.path.display(),
                    domain = %location.domain,
                    owner = %hierarchy.owner_path(),
                    "Grouping repository"
                );
                domains
                    .entry(location.domain)
                    .or_default()
                    .insert(&hierarchy.owners, record.clone());
            }
            None => local.push(record.clone()),
        }
    }

    let mut roots = Vec::with_capacity(domains.len() + 1);
    for (domain, bucket) in domains {
        let (children, repository_count) = bucket.into_children(&domain, None);
        roots.push(GroupNode::Domain(DomainNode {
            domain,
            repository_count,
            children,
        }));
    }

    if !local.is_empty() {
        let repository_count = local.len();
        roots.push(GroupNode::Local(LocalGroupNode {
            repository_count,
            children: into_leaves(local).collect(),
        }));
    }

    GroupingTree { roots }
}
