//! Rebuild Scheduler: at most one pipeline run in flight, fed by a periodic
//! timer and on-demand triggers.
//!
//! The pipeline runs on Tokio's blocking pool; only the final install and
//! notification touch shared state.

use super::cache::IndexCache;
use super::corpus::Corpus;
use super::models::BuildStats;
use super::parser::{MarkdownParser, StructuralParser};
use super::pipeline::rebuild_index;
use crate::error::{BacklinkError, Result};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Published after every successful install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotNotice {
    /// Cache generation of the new snapshot.
    pub generation: u64,
    /// Counters of the run that produced it.
    pub stats: BuildStats,
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No rebuild in flight.
    Idle,
    /// One rebuild in flight; further triggers are dropped.
    Running,
}

/// Result of a trigger.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// A rebuild was started; the handle resolves once it is installed.
    Started(JoinHandle<Result<SnapshotNotice>>),
    /// A rebuild was already running; nothing was queued.
    Suppressed,
}

/// Counters of a periodic loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeriodicOutcome {
    /// Ticks that started a rebuild.
    pub started: u64,
    /// Ticks dropped because a rebuild was running.
    pub suppressed: u64,
}

/// Owns the single in-flight slot and installs finished snapshots.
pub struct RebuildScheduler {
    corpus: Arc<Corpus>,
    parser: Arc<dyn StructuralParser>,
    cache: Arc<IndexCache>,
    running: AtomicBool,
    notices: watch::Sender<Option<SnapshotNotice>>,
}

/// Clears the in-flight flag when the run ends, panics included.
struct InFlight(Arc<RebuildScheduler>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release);
    }
}

impl RebuildScheduler {
    /// Scheduler over `corpus` using the markdown parser.
    #[must_use]
    pub fn new(corpus: Corpus, cache: Arc<IndexCache>) -> Arc<Self> {
        Self::with_parser(corpus, cache, Arc::new(MarkdownParser))
    }

    /// Scheduler with a custom structural parser.
    #[must_use]
    pub fn with_parser(
        corpus: Corpus,
        cache: Arc<IndexCache>,
        parser: Arc<dyn StructuralParser>,
    ) -> Arc<Self> {
        let (notices, _) = watch::channel(None);
        Arc::new(Self {
            corpus: Arc::new(corpus),
            parser,
            cache,
            running: AtomicBool::new(false),
            notices,
        })
    }

    /// Corpus being indexed.
    #[must_use]
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Cache the scheduler installs into.
    #[must_use]
    pub fn cache(&self) -> &Arc<IndexCache> {
        &self.cache
    }

    /// Receiver for snapshot notices; holds `None` until the first install.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<SnapshotNotice>> {
        self.notices.subscribe()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Start a rebuild unless one is running. Returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn trigger(self: &Arc<Self>) -> TriggerOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(
                root = %self.corpus.root().display(),
                "rebuild already running; trigger dropped"
            );
            return TriggerOutcome::Suppressed;
        }

        let guard = InFlight(Arc::clone(self));
        let handle = tokio::spawn(async move {
            let result = Self::run_in_flight(guard).await;
            if let Err(error) = &result {
                tracing::error!(%error, "backlink rebuild failed; previous snapshot kept");
            }
            result
        });
        TriggerOutcome::Started(handle)
    }

    /// Trigger and wait. `Ok(None)` when the trigger was suppressed.
    pub async fn run_once(self: &Arc<Self>) -> Result<Option<SnapshotNotice>> {
        match self.trigger() {
            TriggerOutcome::Started(handle) => handle
                .await
                .map_err(|error| BacklinkError::RebuildAborted(error.to_string()))?
                .map(Some),
            TriggerOutcome::Suppressed => Ok(None),
        }
    }

    async fn run_in_flight(guard: InFlight) -> Result<SnapshotNotice> {
        let scheduler = Arc::clone(&guard.0);
        let corpus = Arc::clone(&scheduler.corpus);
        let parser = Arc::clone(&scheduler.parser);

        let outcome = tokio::task::spawn_blocking(move || rebuild_index(&corpus, parser.as_ref()))
            .await
            .map_err(|error| BacklinkError::RebuildAborted(error.to_string()))?;

        let generation = scheduler.cache.install(outcome.index);
        let notice = SnapshotNotice {
            generation,
            stats: outcome.stats,
        };
        // Back to idle before notifying, so subscribers may trigger again.
        drop(guard);
        scheduler.notices.send_replace(Some(notice));
        tracing::info!(
            generation,
            documents = notice.stats.documents,
            targets = notice.stats.targets,
            "backlink snapshot installed"
        );
        Ok(notice)
    }

    /// Trigger on every tick of `interval` (first tick fires immediately)
    /// until `shutdown` resolves.
    pub async fn run_periodic<F>(
        self: Arc<Self>,
        interval: Duration,
        shutdown: F,
    ) -> PeriodicOutcome
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut outcome = PeriodicOutcome::default();
        loop {
            tokio::select! {
                _ = ticker.tick() => match self.trigger() {
                    TriggerOutcome::Started(_) => outcome.started += 1,
                    TriggerOutcome::Suppressed => outcome.suppressed += 1,
                },
                () = &mut shutdown => {
                    tracing::info!(
                        started = outcome.started,
                        suppressed = outcome.suppressed,
                        "periodic rebuild loop stopped"
                    );
                    break;
                }
            }
        }
        outcome
    }

    /// Spawn [`RebuildScheduler::run_periodic`] as a background task.
    pub fn spawn_periodic<F>(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: F,
    ) -> JoinHandle<PeriodicOutcome>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(Arc::clone(self).run_periodic(interval, shutdown))
    }
}

impl std::fmt::Debug for RebuildScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildScheduler")
            .field("root", &self.corpus.root())
            .field("state", &self.state())
            .field("generation", &self.cache.generation())
            .finish_non_exhaustive()
    }
}
