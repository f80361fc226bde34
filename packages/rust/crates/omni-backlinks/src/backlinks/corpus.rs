//! Corpus root + document extension, and the id <-> path mapping.

use super::models::DocumentId;
use crate::error::{BacklinkError, Result};
use std::path::{Component, Path, PathBuf};

/// Directory names never descended into by corpus scans.
pub(crate) const DEFAULT_EXCLUDED_DIR_NAMES: &[&str] = &[
    ".git",
    ".cache",
    ".venv",
    "venv",
    ".devenv",
    "target",
    "node_modules",
];

/// Strip a leading dot and lowercase; empty input stays empty.
pub(crate) fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_lowercase()
}

/// Resolve `.` and `..` without touching the filesystem.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn absolute_root(root: &Path) -> PathBuf {
    if let Ok(canonical) = root.canonicalize() {
        return canonical;
    }
    let joined = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(root)
    };
    normalize_lexically(&joined)
}

/// A directory tree of documents sharing one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    root: PathBuf,
    extension: String,
    excluded_dirs: Vec<String>,
}

impl Corpus {
    /// Corpus rooted at `root` (canonicalized when it exists) with the
    /// default excluded directory names.
    pub fn new(root: impl AsRef<Path>, extension: &str) -> Self {
        Self {
            root: absolute_root(root.as_ref()),
            extension: normalize_extension(extension),
            excluded_dirs: DEFAULT_EXCLUDED_DIR_NAMES
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
        }
    }

    /// Add directory names that scans must skip (merged with the defaults).
    #[must_use]
    pub fn with_excluded_dirs(mut self, dirs: &[String]) -> Self {
        self.excluded_dirs.extend(
            dirs.iter()
                .map(|name| name.trim().trim_matches('/').to_lowercase())
                .filter(|name| !name.is_empty()),
        );
        self.excluded_dirs.sort();
        self.excluded_dirs.dedup();
        self
    }

    /// Absolute corpus root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Document extension without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Directory names skipped by scans.
    #[must_use]
    pub fn excluded_dirs(&self) -> &[String] {
        &self.excluded_dirs
    }

    /// Return the root, or [`BacklinkError::CorpusRootMissing`] when it is not a directory.
    pub fn require_root(&self) -> Result<&Path> {
        if self.root.is_dir() {
            Ok(&self.root)
        } else {
            Err(BacklinkError::CorpusRootMissing(self.root.clone()))
        }
    }

    /// Whether the file name carries the corpus extension (exact match).
    #[must_use]
    pub fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension)
    }

    /// Map a path to its corpus id.
    ///
    /// Existing paths are canonicalized; missing ones are normalized
    /// lexically. Relative paths are taken relative to the corpus root.
    /// Returns `None` outside the root or for a foreign extension.
    #[must_use]
    pub fn id_of(&self, path: &Path) -> Option<DocumentId> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let resolved = absolute
            .canonicalize()
            .unwrap_or_else(|_| normalize_lexically(&absolute));
        self.id_of_resolved(&resolved)
    }

    /// [`Corpus::id_of`] for a path that is already absolute and canonical.
    fn id_of_resolved(&self, resolved: &Path) -> Option<DocumentId> {
        if !self.has_extension(resolved) {
            return None;
        }
        let relative = resolved.strip_prefix(&self.root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(segment) => Some(segment.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        let joined = segments.join("/");
        let suffix = format!(".{}", self.extension);
        let id = joined.strip_suffix(&suffix)?;
        if id.is_empty() {
            return None;
        }
        Some(DocumentId::new(id))
    }

    /// Map an id back to its absolute path (inverse of [`Corpus::id_of`]).
    #[must_use]
    pub fn path_of(&self, id: &DocumentId) -> PathBuf {
        let mut path = self.root.clone();
        let mut segments = id.as_str().split('/').filter(|s| !s.is_empty()).peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                path.push(format!("{segment}.{}", self.extension));
            } else {
                path.push(segment);
            }
        }
        path
    }

    /// Corpus id of an existing document file, or `None` when the path is not
    /// a corpus member. Costs one canonicalization.
    #[must_use]
    pub fn contains(&self, path: &Path) -> Option<DocumentId> {
        let canonical = path.canonicalize().ok()?;
        if !canonical.is_file() {
            return None;
        }
        self.id_of_resolved(&canonical)
    }

    /// Path of the existing document `id`.
    ///
    /// [`BacklinkError::TargetFileAbsent`] when the file does not exist yet,
    /// [`BacklinkError::OutsideCorpus`] when `id` escapes the root.
    pub fn existing_document(&self, id: &DocumentId) -> Result<PathBuf> {
        let path = self.path_of(id);
        if self.id_of(&path).as_ref() != Some(id) {
            return Err(BacklinkError::OutsideCorpus(path));
        }
        if path.is_file() {
            Ok(path)
        } else {
            Err(BacklinkError::TargetFileAbsent(path))
        }
    }

    /// Path for `id`, creating an empty placeholder document when absent.
    ///
    /// The corpus grows by reference, so a link to a document that does not
    /// exist yet materializes it instead of failing.
    pub fn ensure_document(&self, id: &DocumentId) -> Result<PathBuf> {
        let path = match self.existing_document(id) {
            Err(BacklinkError::TargetFileAbsent(path)) => path,
            other => return other,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        tracing::info!(id = %id, path = %path.display(), "created placeholder document");
        Ok(path)
    }
}
