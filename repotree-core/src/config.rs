//! Configuration management for repotree
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (REPOTREE_*)
//! 3. Config file (~/.config/repotree/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Ignore globs applied when no patterns are configured
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "**/node_modules/**",
    "**/bower_components/**",
    "**/.vscode/**",
    "**/.idea/**",
    "**/out/**",
    "**/dist/**",
];

/// Repository discovery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Absolute root paths to scan, in order
    pub roots: Vec<PathBuf>,

    /// Glob patterns matched against absolute directory paths
    pub ignore_patterns: Vec<String>,

    /// Maximum number of repositories extracted concurrently
    pub max_parallel: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            max_parallel: 8,
        }
    }
}

/// Git-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    /// Path to the git executable
    pub git_path: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            git_path: "git".to_string(),
        }
    }
}

/// Repository store configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Location of the repository list (defaults to the cache directory)
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Resolve the store file location
    ///
    /// Returns `~/.cache/repotree/repositories.json` unless overridden
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }

        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| Error::Config("Could not determine cache directory".to_string()))?;

        Ok(cache_dir.join("repotree").join("repositories.json"))
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Scan configuration
    pub scan: ScanConfig,

    /// Git configuration
    pub git: GitConfig,

    /// Store configuration
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/repotree/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("repotree").join("config.toml"))
    }

    /// Reject settings the scanner cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.scan.max_parallel == 0 {
            return Err(Error::Config(
                "scan.max_parallel must be at least 1".to_string(),
            ));
        }

        if let Some(root) = self.scan.roots.iter().find(|r| !r.is_absolute()) {
            return Err(Error::Config(format!(
                "Scan root must be an absolute path: {}",
                root.display()
            )));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - REPOTREE_ROOTS: scan roots, separated like `PATH`
    /// - REPOTREE_GIT_PATH: Path to git executable
    /// - REPOTREE_STORE: Location of the repository list
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(roots) = std::env::var_os("REPOTREE_ROOTS") {
            let roots: Vec<PathBuf> = std::env::split_paths(&roots)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !roots.is_empty() {
                self.scan.roots = roots;
            }
        }

        if let Ok(git_path) = std::env::var("REPOTREE_GIT_PATH") {
            self.git.git_path = git_path;
        }

        if let Some(store) = std::env::var_os("REPOTREE_STORE") {
            self.store.path = Some(PathBuf::from(store));
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, roots: Vec<PathBuf>, git_path: Option<String>) -> Self {
        if !roots.is_empty() {
            self.scan.roots = roots;
        }

        if let Some(path) = git_path {
            self.git.git_path = path;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        config_path: Option<&Path>,
        roots: Vec<PathBuf>,
        git_path: Option<String>,
    ) -> Result<Self> {
        let base = match config_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        let config = base
            .with_env_overrides()
            .with_cli_overrides(roots, git_path);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.scan.roots.is_empty());
        assert_eq!(config.scan.max_parallel, 8);
        assert_eq!(config.git.git_path, "git");
        assert!(config
            .scan
            .ignore_patterns
            .contains(&"**/node_modules/**".to_string()));
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default().with_cli_overrides(
            vec![PathBuf::from("/src")],
            Some("/usr/local/bin/git".to_string()),
        );

        assert_eq!(config.scan.roots, vec![PathBuf::from("/src")]);
        assert_eq!(config.git.git_path, "/usr/local/bin/git");
    }

    #[test]
    fn test_empty_cli_roots_keep_configured() {
        let mut config = Config::default();
        config.scan.roots = vec![PathBuf::from("/code")];
        let config = config.with_cli_overrides(vec![], None);
        assert_eq!(config.scan.roots, vec![PathBuf::from("/code")]);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[scan]
roots = ["/home/me/code", "/srv/git"]
ignore_patterns = ["**/vendor/**"]
max_parallel = 2

[git]
git_path = "/opt/git/bin/git"

[store]
path = "/tmp/repos.json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.scan.roots.len(), 2);
        assert_eq!(config.scan.ignore_patterns, vec!["**/vendor/**".to_string()]);
        assert_eq!(config.scan.max_parallel, 2);
        assert_eq!(config.git.git_path, "/opt/git/bin/git");
        assert_eq!(
            config.store.resolved_path().unwrap(),
            PathBuf::from("/tmp/repos.json")
        );
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[scan]
roots = ["/code"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        // ignore patterns and git path should use defaults
        assert_eq!(config.scan.ignore_patterns.len(), DEFAULT_IGNORE_PATTERNS.len());
        assert_eq!(config.git.git_path, "git");
    }

    #[test]
    fn test_validate_rejects_relative_root() {
        let config = Config::default().with_cli_overrides(vec![PathBuf::from("code")], None);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_parallelism() {
        let mut config = Config::default();
        config.scan.max_parallel = 0;
        assert!(config.validate().is_err());
    }
}
