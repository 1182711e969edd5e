// Project workspace: lazy load-or-build and rebuild-and-swap

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::index::shared::SharedIndex;
use crate::index::{snapshot, Index};
use crate::indexer::{BuildReport, Indexer};

/// One indexed project: its configuration, indexer and the index queries see.
pub struct Workspace {
    root: PathBuf,
    config: Config,
    snapshot_path: PathBuf,
    indexer: Indexer,
    current: OnceCell<SharedIndex>,
}

impl Workspace {
    /// Open the project at `root` with its `.codeindex.toml` (or defaults).
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let config = Config::from_project_dir(root);
        Self::with_config(root, config)
    }

    pub fn with_config(root: impl AsRef<Path>, config: Config) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(IndexError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(IndexError::RootNotDirectory(root.to_path_buf()));
        }

        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

        let indexer = Indexer::new(config.path_filter()?).with_parallel(config.indexing.parallel);
        let snapshot_path = config.snapshot_path(&root);

        Ok(Self {
            root,
            config,
            snapshot_path,
            indexer,
            current: OnceCell::new(),
        })
    }

    /// Override the snapshot location from configuration.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn is_loaded(&self) -> bool {
        self.current.get().is_some()
    }

    /// The current index. The first call loads the snapshot, or builds and
    /// saves a fresh index when there is no usable snapshot.
    pub fn index(&self) -> Result<Arc<Index>> {
        let shared = self
            .current
            .get_or_try_init(|| self.load_or_build().map(SharedIndex::new))?;
        Ok(shared.snapshot())
    }

    /// Build a fresh index, make it visible to queries and save it.
    pub fn rebuild(&self) -> Result<BuildReport> {
        let (index, report) = self.indexer.build(&self.root)?;
        let saved = snapshot::save(&index, &self.snapshot_path);
        self.publish(index);

        saved?;
        Ok(report)
    }

    /// Make `index` the one queries see. A lazy load still in flight is
    /// waited for and then superseded.
    fn publish(&self, index: Index) {
        let mut fresh = Some(index);
        let shared = self.current.get_or_init(|| {
            SharedIndex::new(fresh.take().unwrap_or_else(|| Index::empty(self.root.clone())))
        });
        if let Some(index) = fresh {
            shared.replace(index);
        }
    }

    fn load_or_build(&self) -> Result<Index> {
        if self.snapshot_path.exists() {
            match snapshot::load(&self.snapshot_path, &self.root) {
                Ok(index) => return Ok(index),
                Err(e) => warn!("Rebuilding index: {}", e),
            }
        } else {
            info!("No index at {}, building", self.snapshot_path.display());
        }

        let (index, report) = self.indexer.build(&self.root)?;
        if !report.errors.is_empty() {
            warn!("{} files could not be indexed", report.errors.len());
        }
        snapshot::save(&index, &self.snapshot_path)?;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn project() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("app.py"), "def main():\n    pass\n").unwrap();
        dir
    }

    #[test]
    fn test_first_access_builds_and_saves() {
        let dir = project();
        let workspace = Workspace::open(dir.path()).unwrap();
        assert!(!workspace.is_loaded());
        assert!(!workspace.snapshot_path().exists());

        let index = workspace.index().unwrap();
        assert_eq!(index.functions("main").len(), 1);
        assert!(workspace.is_loaded());
        assert!(dir.path().join(".codeindex/index.json").exists());
    }

    #[test]
    fn test_existing_snapshot_is_loaded() {
        let dir = project();
        Workspace::open(dir.path()).unwrap().index().unwrap();

        // A file added after the snapshot is invisible until a rebuild
        std::fs::write(dir.path().join("later.py"), "def later():\n    pass\n").unwrap();
        let workspace = Workspace::open(dir.path()).unwrap();
        assert!(workspace.index().unwrap().functions("later").is_empty());

        let report = workspace.rebuild().unwrap();
        assert_eq!(report.stats.files_indexed, 2);
        assert_eq!(workspace.index().unwrap().functions("later").len(), 1);
    }

    #[test]
    fn test_rebuild_keeps_held_snapshot() {
        let dir = project();
        let workspace = Workspace::open(dir.path()).unwrap();
        let before = workspace.index().unwrap();

        std::fs::write(dir.path().join("more.py"), "def more():\n    pass\n").unwrap();
        workspace.rebuild().unwrap();

        assert!(before.functions("more").is_empty());
        assert_eq!(workspace.index().unwrap().functions("more").len(), 1);
    }

    #[test]
    fn test_rebuild_racing_first_load_wins() {
        let dir = project();
        Workspace::open(dir.path()).unwrap().index().unwrap();

        for step in 0..6 {
            std::fs::write(
                dir.path().join(format!("step_{}.py", step)),
                format!("def step_{}():\n    pass\n", step),
            )
            .unwrap();

            let workspace = Workspace::open(dir.path()).unwrap();
            std::thread::scope(|s| {
                s.spawn(|| {
                    workspace.index().unwrap();
                });
                s.spawn(|| {
                    workspace.rebuild().unwrap();
                });
            });

            let name = format!("step_{}", step);
            assert_eq!(workspace.index().unwrap().functions(&name).len(), 1);
        }
    }

    #[test]
    fn test_corrupt_snapshot_is_rebuilt() {
        let dir = project();
        let snapshot = dir.path().join(".codeindex/index.json");
        std::fs::create_dir_all(snapshot.parent().unwrap()).unwrap();
        std::fs::write(&snapshot, "{ not json").unwrap();

        let workspace = Workspace::open(dir.path()).unwrap();
        assert_eq!(workspace.index().unwrap().functions("main").len(), 1);
        assert!(snapshot::load(&snapshot, dir.path()).is_ok());
    }

    #[test]
    fn test_missing_root() {
        let dir = tempdir().unwrap();
        let err = Workspace::open(dir.path().join("absent")).err().unwrap();
        assert!(matches!(err, IndexError::RootNotFound(_)));
    }

    #[test]
    fn test_snapshot_path_override() {
        let dir = project();
        let target = dir.path().join("custom/snap.json");
        let workspace = Workspace::open(dir.path()).unwrap().with_snapshot_path(&target);
        workspace.rebuild().unwrap();
        assert!(target.exists());
    }
}
