//! Full rebuild pipeline: Locator -> Extractor -> Aggregator.

use super::aggregate::aggregate;
use super::corpus::Corpus;
use super::extract::extract_links;
use super::locator::list_documents;
use super::models::{BacklinkIndex, BuildStats, Document, ExtractedLink};
use super::parser::StructuralParser;
use crate::error::Result;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

/// Result of one pipeline run, not yet installed anywhere.
#[derive(Debug, Clone)]
pub struct RebuildOutcome {
    /// Fresh snapshot.
    pub index: BacklinkIndex,
    /// Counters for this run.
    pub stats: BuildStats,
}

/// Scan the corpus and build a fresh index from scratch.
///
/// Blocking; documents are extracted in parallel on the rayon pool. A
/// document that fails to read or parse is logged, counted in
/// [`BuildStats::skipped`], and contributes no links. A missing root yields
/// an empty index.
pub fn rebuild_index(corpus: &Corpus, parser: &dyn StructuralParser) -> RebuildOutcome {
    let started = Instant::now();
    let paths = list_documents(corpus);

    let results: Vec<(PathBuf, Result<Vec<ExtractedLink>>)> = paths
        .into_par_iter()
        .map(|path| {
            let links = extract_links(corpus, parser, &path);
            (path, links)
        })
        .collect();

    let mut documents = Vec::with_capacity(results.len());
    let mut links = Vec::new();
    let mut skipped = 0usize;
    for (path, result) in results {
        match result {
            Ok(found) => links.extend(found),
            Err(error) => {
                skipped += 1;
                tracing::warn!(path = %path.display(), %error, "skipping document");
            }
        }
        if let Some(id) = corpus.id_of(&path) {
            documents.push(Document { id, path });
        }
    }

    let link_count = links.len();
    let mut index = aggregate(corpus, links);
    let document_count = documents.len();
    index.set_documents(documents);

    let stats = BuildStats {
        documents: document_count,
        links: link_count,
        targets: index.len(),
        skipped,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    tracing::info!(
        root = %corpus.root().display(),
        documents = stats.documents,
        links = stats.links,
        targets = stats.targets,
        skipped = stats.skipped,
        elapsed_ms = stats.elapsed_ms,
        "backlink index rebuilt"
    );
    RebuildOutcome { index, stats }
}
