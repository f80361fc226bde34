//! Link Extractor: outbound local links of one document, with excerpts.

use super::corpus::{Corpus, normalize_lexically};
use super::models::{ExtractedLink, LinkStyle, ReferenceKind};
use super::parser::{LinkReference, StructuralParser};
use crate::error::{BacklinkError, Result};
use std::path::{Path, PathBuf};

fn parse_failure(path: &Path, reason: impl Into<String>) -> BacklinkError {
    BacklinkError::DocumentParseFailure {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Absolute target path of a local reference, or `None` when it falls
/// outside the corpus or names a foreign extension.
///
/// Wikilinks are note ids from the corpus root (`[[sub/Name]]`), with the
/// corpus extension appended when missing. Inline links resolve against the
/// source document's directory; a leading `/` anchors them at the root.
fn resolve_target(corpus: &Corpus, source: &Path, reference: &LinkReference) -> Option<PathBuf> {
    let raw = reference.target.trim();
    if raw.is_empty() {
        return None;
    }

    let joined = match reference.style {
        LinkStyle::Wiki => {
            let suffix = format!(".{}", corpus.extension());
            let mut name = raw.trim_matches('/').to_string();
            if !name.ends_with(&suffix) {
                name.push_str(&suffix);
            }
            corpus.root().join(name)
        }
        LinkStyle::FileScheme if Path::new(raw).is_absolute() => PathBuf::from(raw),
        LinkStyle::Inline | LinkStyle::FileScheme => {
            if let Some(rooted) = raw.strip_prefix('/') {
                corpus.root().join(rooted)
            } else {
                let source = source
                    .canonicalize()
                    .unwrap_or_else(|_| source.to_path_buf());
                source.parent()?.join(raw)
            }
        }
    };

    let target = normalize_lexically(&joined);
    if !corpus.has_extension(&target) || !target.starts_with(corpus.root()) {
        return None;
    }
    Some(target)
}

/// Extract every in-corpus local link of `text`, read from `source`.
///
/// The excerpt of each link is the trimmed content of the innermost block
/// enclosing its start offset. Web links, anchors, other schemes, foreign
/// extensions, and targets outside the root are dropped.
pub fn extract_links_from_text(
    corpus: &Corpus,
    parser: &dyn StructuralParser,
    source: &Path,
    text: &str,
) -> Result<Vec<ExtractedLink>> {
    let tree = parser
        .parse(text)
        .map_err(|reason| parse_failure(source, reason))?;

    let mut out = Vec::new();
    for element in tree.links() {
        let Some(reference) = element.link.as_ref() else {
            continue;
        };
        if reference.kind != ReferenceKind::LocalFile {
            continue;
        }
        let Some(target) = resolve_target(corpus, source, reference) else {
            continue;
        };
        let excerpt = tree
            .innermost_block_at(element.begin)
            .map(|block| tree.content_text(text, block))
            .unwrap_or_default();
        out.push(ExtractedLink {
            source: source.to_path_buf(),
            target,
            excerpt: excerpt.to_string(),
            style: reference.style,
        });
    }
    Ok(out)
}

/// Read `path` and extract its links.
///
/// Unreadable files, invalid UTF-8, and parser rejections all surface as
/// [`BacklinkError::DocumentParseFailure`] so callers can skip the document.
pub fn extract_links(
    corpus: &Corpus,
    parser: &dyn StructuralParser,
    path: &Path,
) -> Result<Vec<ExtractedLink>> {
    let bytes = std::fs::read(path).map_err(|error| parse_failure(path, error.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|error| parse_failure(path, error.to_string()))?;
    extract_links_from_text(corpus, parser, path, &text)
}
