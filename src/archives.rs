/// Local archive detection
///
/// Downloaded books live as `<book id>.zim` files under the archive directory.
/// Scanning runs on a blocking task and only reports what it found; the
/// owning thread then updates the catalog, which emits the mutations the
/// synchronizer reconciles.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tokio::task;
use walkdir::WalkDir;

use crate::error::{LibraryError, Result};
use crate::state::library::Library;

/// File extension of content archives
pub const ARCHIVE_EXTENSION: &str = "zim";

/// Result of an archive scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Book ids (file stems) of the archives found
    pub archive_ids: BTreeSet<String>,
    pub scanned_files: usize,
}

/// Changes made to the catalog after a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalSummary {
    pub marked_local: usize,
    pub marked_remote: usize,
    /// Archives that match no catalog book
    pub unknown: usize,
}

/// Walk `dir` in the background and collect archive ids
pub async fn scan_archives(dir: PathBuf) -> Result<ScanResult> {
    Ok(task::spawn_blocking(move || scan_archives_blocking(&dir)).await?)
}

fn scan_archives_blocking(dir: &Path) -> ScanResult {
    let mut result = ScanResult::default();
    if !dir.is_dir() {
        debug!("Archive directory {} does not exist", dir.display());
        return result;
    }

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        result.scanned_files += 1;

        let is_archive = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(ARCHIVE_EXTENSION))
            .unwrap_or(false);
        if !is_archive {
            continue;
        }
        if let Some(stem) = path.file_stem() {
            result.archive_ids.insert(stem.to_string_lossy().to_string());
        }
    }

    info!(
        "Scanned {} files in {}, found {} archives",
        result.scanned_files,
        dir.display(),
        result.archive_ids.len()
    );
    result
}

/// Bring the catalog's local flags in line with a scan: found archives become
/// local, local books whose archive disappeared go back online.
pub fn apply_scan(library: &Library, scan: &ScanResult) -> Result<LocalSummary> {
    let mut summary = LocalSummary::default();

    for id in &scan.archive_ids {
        match library.set_local(id, true) {
            Ok(true) => summary.marked_local += 1,
            Ok(false) => {}
            Err(LibraryError::BookNotFound(_)) => {
                debug!("Archive {} is not in the catalog", id);
                summary.unknown += 1;
            }
            Err(e) => return Err(e),
        }
    }

    for book in library.query_sorted()? {
        if book.is_local && !scan.archive_ids.contains(&book.id) {
            library.set_local(&book.id, false)?;
            summary.marked_remote += 1;
        }
    }

    if summary.marked_remote > 0 {
        info!("Marked {} missing archives as not downloaded", summary.marked_remote);
    }
    Ok(summary)
}
