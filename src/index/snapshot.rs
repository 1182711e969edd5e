// Durable JSON snapshot of an index

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{Component, Index, Stats};
use crate::error::{IndexError, Result};

/// On-disk snapshot document. Lookup tables are not stored; they are derived
/// again from `components` on load.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotDocument {
    pub indexed_at: DateTime<Utc>,
    pub project_root: String,
    pub components: Vec<Component>,
    pub stats: Stats,
}

#[derive(Serialize)]
struct SnapshotDocumentRef<'a> {
    indexed_at: DateTime<Utc>,
    project_root: String,
    components: &'a [Component],
    stats: Stats,
}

/// Write `index` to `destination`, creating parent directories as needed.
pub fn save(index: &Index, destination: &Path) -> Result<()> {
    let write_err = |source: std::io::Error| IndexError::SnapshotWrite {
        path: destination.to_path_buf(),
        source,
    };

    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(write_err)?;

    let document = SnapshotDocumentRef {
        indexed_at: Utc::now(),
        project_root: index.root().to_string_lossy().into_owned(),
        components: index.components(),
        stats: index.stats(),
    };

    // Written beside the destination and renamed into place, so readers never
    // see a partial document
    let staging = NamedTempFile::new_in(parent).map_err(write_err)?;
    let mut writer = BufWriter::new(staging);
    serde_json::to_writer_pretty(&mut writer, &document).map_err(|e| IndexError::SnapshotWrite {
        path: destination.to_path_buf(),
        source: e.into(),
    })?;
    let staging = writer.into_inner().map_err(|e| write_err(e.into_error()))?;
    staging.persist(destination).map_err(|e| write_err(e.error))?;

    info!(
        "Saved index to {} ({} components)",
        destination.display(),
        document.stats.total_components
    );
    Ok(())
}

/// Read the snapshot document at `source` without rebuilding lookup tables.
pub fn read_document(source: &Path) -> Result<SnapshotDocument> {
    let file = fs::File::open(source).map_err(|e| IndexError::SnapshotUnavailable {
        path: source.to_path_buf(),
        source: e,
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|e| IndexError::SnapshotDecode {
        path: source.to_path_buf(),
        source: e,
    })
}

/// Reconstruct an index rooted at `root` from the snapshot at `source`.
pub fn load(source: &Path, root: &Path) -> Result<Index> {
    let document = read_document(source)?;
    debug!(
        "Snapshot {} written at {} for {}",
        source.display(),
        document.indexed_at,
        document.project_root
    );

    let index = Index::new(root, document.components);
    let stats = index.stats();
    if stats != document.stats {
        return Err(IndexError::SnapshotMismatch {
            path: source.to_path_buf(),
            reason: format!(
                "stored stats {:?} do not match components {:?}",
                document.stats, stats
            ),
        });
    }

    info!(
        "Loaded index from {} ({} components)",
        source.display(),
        stats.total_components
    );
    Ok(index)
}
