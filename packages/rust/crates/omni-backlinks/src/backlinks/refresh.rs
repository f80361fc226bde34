//! View-Refresh Trigger: per-interaction check for the backlinks pane.

use super::cache::IndexCache;
use super::corpus::Corpus;
use super::models::{DocumentId, SourceExcerpts};
use super::scheduler::SnapshotNotice;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

/// Content for the display surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewUpdate {
    /// Document now being viewed.
    pub id: DocumentId,
    /// Its backlinks, self-links hidden.
    pub backlinks: SourceExcerpts,
    /// Cache generation the backlinks were read from.
    pub generation: u64,
}

/// Tracks the last rendered document and decides when to refresh.
///
/// Never walks the corpus: a check costs one path canonicalization, one id
/// comparison, and, only when a refresh is due, one snapshot lookup.
#[derive(Debug)]
pub struct ViewRefresh {
    corpus: Corpus,
    cache: Arc<IndexCache>,
    last_rendered: Option<DocumentId>,
    display_active: bool,
    seen_generation: u64,
}

impl ViewRefresh {
    /// Trigger with no display surface active yet.
    #[must_use]
    pub fn new(corpus: Corpus, cache: Arc<IndexCache>) -> Self {
        let seen_generation = cache.generation();
        Self {
            corpus,
            cache,
            last_rendered: None,
            display_active: false,
            seen_generation,
        }
    }

    /// Show or hide the display surface. Hiding forgets the last render.
    pub fn set_display_active(&mut self, active: bool) {
        self.display_active = active;
        if !active {
            self.last_rendered = None;
        }
    }

    /// Whether a display surface is active.
    #[must_use]
    pub fn display_active(&self) -> bool {
        self.display_active
    }

    /// Id rendered last, if any.
    #[must_use]
    pub fn last_rendered(&self) -> Option<&DocumentId> {
        self.last_rendered.as_ref()
    }

    /// Record that `id` is on screen.
    pub fn mark_rendered(&mut self, id: DocumentId) {
        self.last_rendered = Some(id);
    }

    /// A newer snapshot landed; the current view is stale.
    pub fn on_snapshot(&mut self, notice: SnapshotNotice) {
        if notice.generation > self.seen_generation {
            self.seen_generation = notice.generation;
            self.last_rendered = None;
        }
    }

    /// Drain a pending notice from the scheduler without waiting.
    pub fn poll_notices(&mut self, notices: &mut watch::Receiver<Option<SnapshotNotice>>) {
        if !notices.has_changed().unwrap_or(false) {
            return;
        }
        let latest = *notices.borrow_and_update();
        if let Some(notice) = latest {
            self.on_snapshot(notice);
        }
    }

    /// Id to render for the document at `current`, or `None` when the view
    /// is up to date, hidden, or `current` is not a corpus document.
    #[must_use]
    pub fn should_refresh(&self, current: &Path) -> Option<DocumentId> {
        if !self.display_active {
            return None;
        }
        let id = self.corpus.contains(current)?;
        (self.last_rendered.as_ref() != Some(&id)).then_some(id)
    }

    /// Run [`ViewRefresh::should_refresh`] and, when due, read the backlinks
    /// and mark the document rendered.
    pub fn check(&mut self, current: &Path) -> Option<ViewUpdate> {
        let id = self.should_refresh(current)?;
        let snapshot = self.cache.snapshot();
        let update = ViewUpdate {
            backlinks: snapshot.get_excluding_self(id.as_str()),
            generation: self.cache.generation(),
            id: id.clone(),
        };
        self.last_rendered = Some(id);
        Some(update)
    }
}
