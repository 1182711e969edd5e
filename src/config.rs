// Project configuration (.codeindex.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{IndexError, Result};
use crate::indexer::filter::PathFilter;

pub const CONFIG_FILE_NAME: &str = ".codeindex.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub indexing: IndexingConfig,
    pub snapshot: SnapshotConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Directory names excluded in addition to the built-in set
    pub exclude_dirs: Vec<String>,
    /// Glob patterns excluded in addition to the built-in set
    pub exclude_patterns: Vec<String>,
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Relative paths resolve against the project root
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: Vec::new(),
            exclude_patterns: Vec::new(),
            parallel: true,
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: ".codeindex/index.json".to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 200,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from project directory
    /// Looks for .codeindex.toml in the project root
    pub fn from_project_dir<P: AsRef<Path>>(project_dir: P) -> Self {
        let config_path = project_dir.as_ref().join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, project_dir.as_ref().display());
            return Self::default();
        }

        match Self::from_file(&config_path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {}", config_path.display());
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring invalid config {}: {}", config_path.display(), e);
                Self::default()
            }
        }
    }

    /// Snapshot location for a project rooted at `root`.
    pub fn snapshot_path(&self, root: &Path) -> PathBuf {
        let path = PathBuf::from(&self.snapshot.path);
        if path.is_absolute() {
            path
        } else {
            root.join(path)
        }
    }

    pub fn path_filter(&self) -> Result<PathFilter> {
        PathFilter::with_extra(&self.indexing.exclude_dirs, &self.indexing.exclude_patterns)
            .map_err(|e| IndexError::Config(format!("invalid exclude pattern: {}", e)))
    }

    /// Requested limit, or the default, capped at `max_limit`.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.search.default_limit)
            .min(self.search.max_limit)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.search.default_limit == 0 {
            return Err(IndexError::Config("search.default_limit must be greater than 0".to_string()));
        }
        if self.search.max_limit < self.search.default_limit {
            return Err(IndexError::Config(format!(
                "search.max_limit ({}) must be at least search.default_limit ({})",
                self.search.max_limit, self.search.default_limit
            )));
        }
        if self.snapshot.path.trim().is_empty() {
            return Err(IndexError::Config("snapshot.path cannot be empty".to_string()));
        }
        self.path_filter()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.indexing.parallel);
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.search.max_limit, 200);
        assert_eq!(
            config.snapshot_path(Path::new("/project")),
            PathBuf::from("/project/.codeindex/index.json")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[indexing]\nexclude_dirs = [\"build\"]\n\n[search]\ndefault_limit = 25\n",
        )
        .unwrap();

        let config = Config::from_project_dir(dir.path());
        assert_eq!(config.indexing.exclude_dirs, ["build"]);
        assert!(config.indexing.parallel);
        assert_eq!(config.search.default_limit, 25);
        assert_eq!(config.search.max_limit, 200);
        assert!(!config.path_filter().unwrap().allows_dir("build"));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[search]\ndefault_limit = 0\n").unwrap();
        assert_eq!(Config::from_project_dir(dir.path()), Config::default());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "not toml [").unwrap();
        assert_eq!(Config::from_project_dir(dir.path()), Config::default());
    }

    #[test]
    fn test_absolute_snapshot_path() {
        let mut config = Config::default();
        config.snapshot.path = "/tmp/elsewhere.json".to_string();
        assert_eq!(
            config.snapshot_path(Path::new("/project")),
            PathBuf::from("/tmp/elsewhere.json")
        );
    }

    #[test]
    fn test_effective_limit() {
        let config = Config::default();
        assert_eq!(config.effective_limit(None), 10);
        assert_eq!(config.effective_limit(Some(3)), 3);
        assert_eq!(config.effective_limit(Some(1000)), 200);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.search.default_limit = 0;
        assert!(matches!(config.validate(), Err(IndexError::Config(_))));
        config.search.default_limit = 10;

        config.search.max_limit = 5;
        assert!(config.validate().is_err());
        config.search.max_limit = 200;

        config.snapshot.path = "  ".to_string();
        assert!(config.validate().is_err());
        config.snapshot.path = "index.json".to_string();

        config.indexing.exclude_patterns = vec!["[".to_string()];
        assert!(config.validate().is_err());
        config.indexing.exclude_patterns.clear();

        assert!(config.validate().is_ok());
    }
}
