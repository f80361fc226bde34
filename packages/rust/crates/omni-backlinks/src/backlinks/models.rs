use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Corpus-relative document identifier: relative path with the extension stripped.
///
/// Always uses `/` as separator, e.g. `projects/alpha` for `<root>/projects/alpha.md`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap an already-normalized id.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DocumentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One corpus document discovered by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Corpus-relative id.
    pub id: DocumentId,
    /// Absolute path on disk.
    pub path: PathBuf,
}

/// What a link points at, decided once at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Another file on the local filesystem.
    LocalFile,
    /// `http(s)`/`ftp` URL.
    Web,
    /// In-document anchor (`#heading`).
    Anchor,
    /// Any other URL scheme (`mailto:`, `tel:`, ...).
    Other,
}

/// Surface syntax the link was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStyle {
    /// `[[Name]]`, `[[Name#Heading]]`, `[[Name|Alias]]`.
    Wiki,
    /// `[text](path.md)`.
    Inline,
    /// `[text](file:path.md)`.
    FileScheme,
}

/// Outbound link found by the extractor, before id resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// Source document path.
    pub source: PathBuf,
    /// Resolved target document path (may not exist yet).
    pub target: PathBuf,
    /// Trimmed text of the innermost enclosing block.
    pub excerpt: String,
    /// Link syntax.
    pub style: LinkStyle,
}

/// One backlink occurrence keyed by document ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Referencing document.
    pub source: DocumentId,
    /// Referenced document.
    pub target: DocumentId,
    /// Trimmed text of the enclosing block.
    pub excerpt: String,
}

/// Excerpts grouped by referencing document.
pub type SourceExcerpts = BTreeMap<DocumentId, Vec<String>>;

/// Counters emitted by one rebuild pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Documents returned by the locator.
    pub documents: usize,
    /// Link records folded into the index.
    pub links: usize,
    /// Documents with at least one backlink.
    pub targets: usize,
    /// Documents skipped because they failed to read or parse.
    pub skipped: usize,
    /// Wall time of the pipeline in milliseconds.
    pub elapsed_ms: u64,
}

/// Immutable reverse-link snapshot: `target -> (source -> excerpts)`.
///
/// Within one source list, excerpts are in accumulation order (latest first),
/// which is not document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklinkIndex {
    entries: BTreeMap<DocumentId, SourceExcerpts>,
    documents: BTreeMap<DocumentId, PathBuf>,
}

impl BacklinkIndex {
    /// Empty index (the "not yet built" state).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold link records into a fresh index.
    pub fn from_records(records: impl IntoIterator<Item = LinkRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        index
    }

    /// Prepend one excerpt under `(target, source)`.
    pub fn insert(&mut self, record: LinkRecord) {
        self.entries
            .entry(record.target)
            .or_default()
            .entry(record.source)
            .or_default()
            .insert(0, record.excerpt);
    }

    /// Attach the scanned document set (used by graph export and stats).
    pub fn set_documents(&mut self, documents: impl IntoIterator<Item = Document>) {
        self.documents = documents
            .into_iter()
            .map(|doc| (doc.id, doc.path))
            .collect();
    }

    /// Backlinks of `id`, borrowed.
    #[must_use]
    pub fn backlinks(&self, id: &str) -> Option<&SourceExcerpts> {
        self.entries.get(id)
    }

    /// Backlinks of `id`; empty when the document has none.
    #[must_use]
    pub fn get(&self, id: &str) -> SourceExcerpts {
        self.backlinks(id).cloned().unwrap_or_default()
    }

    /// Backlinks of `id` without the document's links to itself.
    #[must_use]
    pub fn get_excluding_self(&self, id: &str) -> SourceExcerpts {
        let mut out = self.get(id);
        out.remove(id);
        out
    }

    /// Documents that `source` links to (forward direction).
    #[must_use]
    pub fn targets_of(&self, source: &str) -> Vec<DocumentId> {
        self.entries
            .iter()
            .filter(|(_, sources)| sources.contains_key(source))
            .map(|(target, _)| target.clone())
            .collect()
    }

    /// Distinct `(source, target)` pairs, sorted by source then target.
    #[must_use]
    pub fn edges(&self) -> Vec<(DocumentId, DocumentId)> {
        let mut out: Vec<(DocumentId, DocumentId)> = self
            .entries
            .iter()
            .flat_map(|(target, sources)| {
                sources
                    .keys()
                    .map(move |source| (source.clone(), target.clone()))
            })
            .collect();
        out.sort();
        out
    }

    /// Scanned documents, ordered by id.
    pub fn documents(&self) -> impl Iterator<Item = Document> + '_ {
        self.documents.iter().map(|(id, path)| Document {
            id: id.clone(),
            path: path.clone(),
        })
    }

    /// Whether `id` was seen by the scan that built this snapshot.
    #[must_use]
    pub fn has_document(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Number of documents with at least one backlink.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no document has a backlink.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total excerpt count across all entries.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.entries
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Ids that have backlinks, in order.
    pub fn target_ids(&self) -> impl Iterator<Item = &DocumentId> {
        self.entries.keys()
    }
}
