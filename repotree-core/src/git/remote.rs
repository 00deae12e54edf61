//! Remote URL classification into domain and owner path

use serde::Serialize;

/// Placeholder used when a URL or owner path cannot be interpreted
pub const UNKNOWN: &str = "unknown";

/// Where a remote lives: its host and the repository path on that host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteLocation {
    /// Host (e.g., "github.com")
    pub domain: String,
    /// Slash-separated path after the host, without a trailing `.git`
    pub owner_path: String,
}

impl RemoteLocation {
    fn unknown() -> Self {
        Self {
            domain: UNKNOWN.to_string(),
            owner_path: UNKNOWN.to_string(),
        }
    }

    /// Split the owner path into owner segments and repository name
    pub fn hierarchy(&self) -> OwnerHierarchy {
        OwnerHierarchy::from_owner_path(&self.owner_path)
    }
}

/// Owner segments leading to a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerHierarchy {
    /// Owner path segments from the domain downward (never empty)
    pub owners: Vec<String>,
    /// Repository name, when the path had more than one segment
    pub repository: Option<String>,
}

impl OwnerHierarchy {
    /// Build the hierarchy from a slash-separated path
    ///
    /// With two or more segments the last one is the repository and the rest
    /// are owners. A single segment is an owner without nesting. No segments
    /// yields the `unknown` owner.
    pub fn from_owner_path(owner_path: &str) -> Self {
        let mut segments: Vec<String> = owner_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        match segments.len() {
            0 => Self {
                owners: vec![UNKNOWN.to_string()],
                repository: None,
            },
            1 => Self {
                owners: segments,
                repository: None,
            },
            _ => {
                let repository = segments.pop();
                Self {
                    owners: segments,
                    repository,
                }
            }
        }
    }

    /// The owner segments joined with `/`
    pub fn owner_path(&self) -> String {
        self.owners.join("/")
    }
}

/// Classify a remote URL
///
/// Recognizes, in order, SCP-like SSH (`git@host:owner/repo.git`), SSH and
/// git URLs (`ssh://[user@]host[:port]/owner/repo.git`), and HTTP(S) URLs.
/// Anything else classifies as `unknown`.
pub fn classify(url: &str) -> RemoteLocation {
    let url = url.trim();
    classify_scp(url)
        .or_else(|| classify_url(url))
        .unwrap_or_else(RemoteLocation::unknown)
}

fn classify_scp(url: &str) -> Option<RemoteLocation> {
    if url.contains("://") {
        return None;
    }

    let (authority, path) = url.split_once(':')?;

    // Windows drive letters and local paths are not hosts
    if authority.len() < 2 || authority.contains('/') || authority.contains('\\') {
        return None;
    }
    if path.starts_with('\\') {
        return None;
    }

    let host = match authority.rsplit_once('@') {
        Some((_, host)) => host,
        None => authority,
    };
    if host.is_empty() {
        return None;
    }

    Some(RemoteLocation {
        domain: host.to_string(),
        owner_path: clean_path(path),
    })
}

fn classify_url(url: &str) -> Option<RemoteLocation> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str().filter(|h| !h.is_empty())?;

    let domain = match parsed.scheme() {
        "ssh" | "git+ssh" | "ssh+git" | "git" => host.to_string(),
        "http" | "https" => match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        },
        _ => return None,
    };

    Some(RemoteLocation {
        domain,
        owner_path: clean_path(parsed.path()),
    })
}

fn clean_path(path: &str) -> String {
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    path.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
