//! Startup scan of the photo library.

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info, instrument};
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Return `true` if `path` has a supported image extension (case-insensitive).
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| IMAGE_EXTS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Recursively collect the images under `root`.
///
/// With `shuffle` the list is shuffled once, deterministically when a `seed`
/// is given. Otherwise it is sorted by path.
///
/// # Errors
/// [`Error::BadDir`] if `root` is not a directory, [`Error::EmptyScan`] if no
/// image was found.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn scan_library(root: &Path, shuffle: bool, seed: Option<u64>) -> Result<Vec<PathBuf>, Error> {
    if !root.is_dir() {
        return Err(Error::BadDir(root.display().to_string()));
    }

    let mut out: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        // Skip hidden dot-directories below the root only.
        .filter_entry(|e| !should_skip_dir(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_supported_image(e.path()))
        .map(DirEntry::into_path)
        .collect();

    if out.is_empty() {
        return Err(Error::EmptyScan);
    }

    out.sort();
    if shuffle {
        match seed {
            Some(seed) => out.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => out.shuffle(&mut rand::rng()),
        }
    }
    debug!(first = %out[0].display(), shuffled = shuffle, "library order fixed");
    info!(count = out.len(), "library scan complete");
    Ok(out)
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}
