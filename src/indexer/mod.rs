// Project indexing: file discovery, extraction and index assembly

pub mod filter;
pub mod parser;

use std::fs;
use std::path::{Component as PathComponent, Path};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ExtractError, FileError, IndexError, Result};
use crate::index::{Component, Index, Stats};

use self::filter::PathFilter;
use self::parser::{Extractor, MarkdownExtractor, PythonExtractor, SqlExtractor};

/// Outcome of one indexing run.
#[derive(Debug)]
pub struct BuildReport {
    pub stats: Stats,
    pub elapsed: Duration,
    /// Files that could not be read or parsed; they contribute nothing.
    pub errors: Vec<FileError>,
}

/// Walks a project tree and turns every eligible file into components.
pub struct Indexer {
    filter: PathFilter,
    extractors: Vec<Box<dyn Extractor>>,
    parallel: bool,
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new(PathFilter::default())
    }
}

impl Indexer {
    pub fn new(filter: PathFilter) -> Self {
        // Registration order is the category order of the component sequence
        let extractors: Vec<Box<dyn Extractor>> = vec![
            Box::new(PythonExtractor::new()),
            Box::new(SqlExtractor::new()),
            Box::new(MarkdownExtractor::new()),
        ];

        Self {
            filter,
            extractors,
            parallel: true,
        }
    }

    /// Extract files on the rayon pool (default) or one after another.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Eligible files under `root` as forward-slash relative paths, grouped by
    /// extractor and sorted within each group.
    pub fn discover(&self, root: &Path) -> Vec<String> {
        let mut groups: Vec<Vec<String>> = vec![Vec::new(); self.extractors.len()];

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || self.filter.allows_dir(&entry.file_name().to_string_lossy())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            if !self.filter.eligible(relative) {
                continue;
            }

            let rel_path = to_forward_slashes(relative);
            if let Some(slot) = self.extractors.iter().position(|e| e.can_extract(&rel_path)) {
                groups[slot].push(rel_path);
            }
        }

        groups
            .into_iter()
            .flat_map(|mut group| {
                group.sort();
                group
            })
            .collect()
    }

    /// Build a fresh index of the tree at `root`.
    ///
    /// Per-file failures are logged and reported; only a missing or
    /// non-directory root fails the run.
    pub fn build(&self, root: impl AsRef<Path>) -> Result<(Index, BuildReport)> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(IndexError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(IndexError::RootNotDirectory(root.to_path_buf()));
        }
        let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

        let started = Instant::now();
        info!("Indexing project: {}", root.display());

        let files = self.discover(&root);
        debug!("Discovered {} indexable files", files.len());

        let results: Vec<std::result::Result<Vec<Component>, FileError>> = if self.parallel {
            files.par_iter().map(|rel| self.extract_file(&root, rel)).collect()
        } else {
            files.iter().map(|rel| self.extract_file(&root, rel)).collect()
        };

        let mut components = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(extracted) => components.extend(extracted),
                Err(failure) => {
                    warn!("Failed to index {}", failure);
                    errors.push(failure);
                }
            }
        }

        let index = Index::new(root, components);
        let stats = index.stats();
        let elapsed = started.elapsed();
        info!(
            "Indexed {} files ({} components) in {:.2?}",
            stats.files_indexed, stats.total_components, elapsed
        );

        Ok((
            index,
            BuildReport {
                stats,
                elapsed,
                errors,
            },
        ))
    }

    fn extract_file(&self, root: &Path, rel_path: &str) -> std::result::Result<Vec<Component>, FileError> {
        let failed = |error: ExtractError| FileError {
            path: rel_path.to_string(),
            error,
        };

        let extractor = self
            .extractors
            .iter()
            .find(|e| e.can_extract(rel_path))
            .ok_or_else(|| {
                failed(ExtractError::Read(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "no extractor for file",
                )))
            })?;

        let content = fs::read_to_string(root.join(rel_path)).map_err(|e| failed(e.into()))?;
        let components = extractor.extract(rel_path, &content).map_err(failed)?;
        debug!(
            "{} {}: {} components",
            extractor.language().as_str(),
            rel_path,
            components.len()
        );
        Ok(components)
    }
}

fn to_forward_slashes(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            PathComponent::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
