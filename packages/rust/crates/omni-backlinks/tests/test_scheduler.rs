//! Integration tests for the rebuild scheduler.

use omni_backlinks::backlinks::parser::ElementTree;
use omni_backlinks::{
    BacklinkError, Corpus, IndexCache, MarkdownParser, RebuildScheduler, SchedulerState,
    StructuralParser, TriggerOutcome,
};
use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn small_corpus() -> Result<TempDir, Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("A.md"), "see [[B]]\n")?;
    write_file(&tmp.path().join("B.md"), "root\n")?;
    Ok(tmp)
}

/// Blocks every parse until the gate is opened (or its sender dropped).
struct GatedParser {
    gate: Mutex<mpsc::Receiver<()>>,
}

impl StructuralParser for GatedParser {
    fn parse(&self, text: &str) -> Result<ElementTree, String> {
        if let Ok(gate) = self.gate.lock() {
            let _ = gate.recv_timeout(Duration::from_secs(10));
        }
        MarkdownParser.parse(text)
    }
}

struct PanickingParser;

impl StructuralParser for PanickingParser {
    fn parse(&self, _text: &str) -> Result<ElementTree, String> {
        panic!("parser exploded");
    }
}

#[tokio::test]
async fn test_run_once_installs_and_notifies() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = small_corpus()?;
    let cache = Arc::new(IndexCache::new());
    let scheduler = RebuildScheduler::new(Corpus::new(tmp.path(), "md"), Arc::clone(&cache));
    let mut notices = scheduler.subscribe();
    assert!(notices.borrow().is_none());
    assert!(cache.get("B").is_empty());

    let notice = scheduler.run_once().await?.ok_or("rebuild was suppressed")?;
    assert_eq!(notice.generation, 1);
    assert_eq!(notice.stats.documents, 2);
    assert_eq!(cache.get("B")["A"], vec!["see [[B]]"]);
    assert_eq!(scheduler.state(), SchedulerState::Idle);

    assert!(notices.has_changed()?);
    assert_eq!(*notices.borrow_and_update(), Some(notice));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_trigger_while_running_is_suppressed() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = small_corpus()?;
    let (open_gate, gate) = mpsc::channel();
    let parser = Arc::new(GatedParser {
        gate: Mutex::new(gate),
    });
    let cache = Arc::new(IndexCache::new());
    let scheduler =
        RebuildScheduler::with_parser(Corpus::new(tmp.path(), "md"), Arc::clone(&cache), parser);

    let TriggerOutcome::Started(first) = scheduler.trigger() else {
        return Err("first trigger should start a rebuild".into());
    };
    assert_eq!(scheduler.state(), SchedulerState::Running);
    assert!(matches!(scheduler.trigger(), TriggerOutcome::Suppressed));
    assert!(matches!(scheduler.trigger(), TriggerOutcome::Suppressed));
    assert!(!cache.is_built());

    open_gate.send(())?;
    drop(open_gate);
    let notice = first.await??;
    assert_eq!(notice.generation, 1);
    assert_eq!(scheduler.state(), SchedulerState::Idle);

    // Suppressed triggers were dropped, not queued.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cache.generation(), 1);

    let second = scheduler.run_once().await?.ok_or("rebuild was suppressed")?;
    assert_eq!(second.generation, 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_rebuild_keeps_previous_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = small_corpus()?;
    let cache = Arc::new(IndexCache::new());
    let good = RebuildScheduler::new(Corpus::new(tmp.path(), "md"), Arc::clone(&cache));
    good.run_once().await?;
    assert_eq!(cache.generation(), 1);

    let broken = RebuildScheduler::with_parser(
        Corpus::new(tmp.path(), "md"),
        Arc::clone(&cache),
        Arc::new(PanickingParser),
    );
    let result = broken.run_once().await;
    assert!(matches!(result, Err(BacklinkError::RebuildAborted(_))));
    assert_eq!(broken.state(), SchedulerState::Idle);
    assert!(broken.subscribe().borrow().is_none());
    assert_eq!(cache.generation(), 1);
    assert_eq!(cache.get("B")["A"], vec!["see [[B]]"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_periodic_loop_fires_then_stops() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = small_corpus()?;
    let cache = Arc::new(IndexCache::new());
    let scheduler = RebuildScheduler::new(Corpus::new(tmp.path(), "md"), Arc::clone(&cache));
    let mut notices = scheduler.subscribe();

    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let periodic = scheduler.spawn_periodic(Duration::from_secs(3600), async move {
        let _ = stopped.await;
    });

    tokio::time::timeout(Duration::from_secs(10), notices.changed()).await??;
    assert!(cache.is_built());
    assert_eq!(cache.get("B")["A"], vec!["see [[B]]"]);

    let _ = stop.send(());
    let outcome = periodic.await?;
    assert_eq!(outcome.started, 1);
    assert_eq!(outcome.suppressed, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rebuild_does_not_block_interactive_work() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    for idx in 0..3000 {
        let next = (idx + 1) % 3000;
        write_file(
            &tmp.path().join(format!("d{}/n{idx}.md", idx % 30)),
            &format!("# Note {idx}\n\nlinks to [[d{}/n{next}]] and [[d0/n0]]\n", next % 30),
        )?;
    }
    let cache = Arc::new(IndexCache::new());
    let scheduler = RebuildScheduler::new(Corpus::new(tmp.path(), "md"), Arc::clone(&cache));

    let started = Instant::now();
    let TriggerOutcome::Started(handle) = scheduler.trigger() else {
        return Err("trigger should start a rebuild".into());
    };
    assert!(started.elapsed() < Duration::from_millis(250));

    // Interactive no-ops keep completing quickly while the rebuild runs.
    for _ in 0..20 {
        let op = Instant::now();
        let _ = cache.get("d0/n0");
        tokio::task::yield_now().await;
        assert!(op.elapsed() < Duration::from_millis(250));
    }

    let notice = handle.await??;
    assert_eq!(notice.stats.documents, 3000);
    assert_eq!(cache.get("d0/n0").len(), 3000);
    Ok(())
}
