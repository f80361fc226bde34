//! Recursive document discovery under the corpus root.

use super::corpus::Corpus;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

fn is_skipped_dir(entry: &DirEntry, excluded: &HashSet<&str>) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || excluded.contains(name.to_lowercase().as_str())
}

fn is_readable(path: &Path) -> bool {
    std::fs::File::open(path).is_ok()
}

/// List every readable document under the corpus root.
///
/// A missing root is an empty corpus, not an error. Hidden and excluded
/// directories are not descended, symlinks are not followed, and the walker
/// never yields `.`/`..` entries, so traversal always terminates.
#[must_use]
pub fn list_documents(corpus: &Corpus) -> Vec<PathBuf> {
    let root = corpus.root();
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "corpus root missing; treating as empty");
        return Vec::new();
    }
    let excluded: HashSet<&str> = corpus.excluded_dirs().iter().map(String::as_str).collect();

    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry, &excluded))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::debug!(%error, "skipping unreadable corpus entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(|path| corpus.has_extension(path) && is_readable(path))
        .collect()
}
