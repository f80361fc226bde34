//! backlinks CLI: query, rebuild, and graph a note corpus.
//!
//! Logging goes to stderr (`RUST_LOG` overrides, `--verbose` => debug);
//! stdout carries JSON results, or raw DOT for `graph` without `--render`.

#![allow(missing_docs)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use omni_backlinks::{
    BacklinkConfig, ConfigOverrides, Corpus, DocumentId, IndexCache, RebuildScheduler,
    export_graph, open_in_viewer, render_graph,
};

#[derive(Parser, Debug)]
#[command(
    name = "backlinks",
    about = "Backlink index for a directory of linked notes",
    arg_required_else_help = true
)]
struct Cli {
    /// Corpus root directory (overrides config and `BACKLINKS_ROOT`).
    #[arg(long, short = 'r', value_name = "DIR", global = true)]
    root: Option<PathBuf>,

    /// Document extension (overrides config and `BACKLINKS_EXTENSION`).
    #[arg(long, short = 'e', value_name = "EXT", global = true)]
    extension: Option<String>,

    /// Explicit backlinks config file (replaces the user config path).
    #[arg(long = "conf", short = 'c', value_name = "FILE", global = true)]
    config_file: Option<PathBuf>,

    /// Additional directory names to skip (repeatable).
    #[arg(long = "exclude-dir", value_name = "DIR", global = true)]
    exclude_dirs: Vec<String>,

    /// Output format.
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Json, global = true)]
    output: OutputFormat,

    /// Debug logging.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Backlinks of one document.
    Get {
        id: String,
        /// Keep the document's links to itself.
        #[arg(long, default_value_t = false)]
        include_self: bool,
    },
    /// Rebuild once and print build stats.
    Build,
    /// Export the link graph as DOT, optionally render and open it.
    Graph {
        /// Render through the configured renderer.
        #[arg(long, default_value_t = false)]
        render: bool,
        /// Open the rendered artifact (implies --render).
        #[arg(long, default_value_t = false)]
        view: bool,
        /// Rendered artifact path.
        #[arg(long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
        /// Renderer executable.
        #[arg(long)]
        renderer: Option<String>,
        /// Output format passed to the renderer.
        #[arg(long)]
        format: Option<String>,
        /// Viewer executable.
        #[arg(long)]
        viewer: Option<String>,
    },
    /// Map a document id to its path.
    Resolve {
        id: String,
        /// Create an empty placeholder when the document is absent.
        #[arg(long, default_value_t = false)]
        create: bool,
    },
    /// Rebuild periodically until Ctrl+C.
    Watch {
        /// Rebuild interval (overrides `BACKLINKS_INTERVAL_SECS`).
        #[arg(long = "interval-secs")]
        interval_secs: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

fn emit<T: Serialize>(value: &T, output: OutputFormat) -> Result<()> {
    let rendered = match output {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value),
    }
    .context("failed to serialize CLI output as JSON")?;
    println!("{rendered}");
    Ok(())
}

fn overrides(cli: &Cli) -> ConfigOverrides {
    let mut overrides = ConfigOverrides {
        root: cli.root.clone(),
        extension: cli.extension.clone(),
        ..ConfigOverrides::default()
    };
    match &cli.command {
        Command::Graph {
            renderer,
            format,
            viewer,
            ..
        } => {
            overrides.renderer.clone_from(renderer);
            overrides.graph_format.clone_from(format);
            overrides.viewer.clone_from(viewer);
        }
        Command::Watch { interval_secs } => overrides.rebuild_interval_secs = *interval_secs,
        _ => {}
    }
    overrides
}

fn checked_corpus(config: &BacklinkConfig, exclude_dirs: &[String]) -> Result<Corpus> {
    let corpus = config.corpus().with_excluded_dirs(exclude_dirs);
    corpus
        .require_root()
        .context("backlinks needs an existing corpus root (--root or BACKLINKS_ROOT)")?;
    Ok(corpus)
}

async fn build_once(corpus: Corpus) -> Result<Arc<RebuildScheduler>> {
    let scheduler = RebuildScheduler::new(corpus, Arc::new(IndexCache::new()));
    scheduler
        .run_once()
        .await
        .context("backlink rebuild failed")?;
    Ok(scheduler)
}

/// Resolve once `signal` fires; `false` when the listener itself failed.
async fn wait_for_stop(signal: impl Future<Output = std::io::Result<()>>) -> bool {
    match signal.await {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(error = %error, "failed to listen for Ctrl+C; stopping watch");
            false
        }
    }
}

async fn execute(cli: Cli, config: BacklinkConfig) -> Result<()> {
    match &cli.command {
        Command::Get { id, include_self } => {
            let corpus = checked_corpus(&config, &cli.exclude_dirs)?;
            let scheduler = build_once(corpus).await?;
            let snapshot = scheduler.cache().snapshot();
            let backlinks = if *include_self {
                snapshot.get(id)
            } else {
                snapshot.get_excluding_self(id)
            };
            emit(&json!({ "id": id, "backlinks": backlinks }), cli.output)
        }
        Command::Build => {
            let corpus = checked_corpus(&config, &cli.exclude_dirs)?;
            let scheduler = RebuildScheduler::new(corpus, Arc::new(IndexCache::new()));
            let notice = scheduler
                .run_once()
                .await
                .context("backlink rebuild failed")?;
            emit(
                &json!({ "root": config.root, "snapshot": notice }),
                cli.output,
            )
        }
        Command::Graph {
            render,
            view,
            out,
            ..
        } => {
            let corpus = checked_corpus(&config, &cli.exclude_dirs)?;
            let scheduler = build_once(corpus).await?;
            let snapshot = scheduler.cache().snapshot();
            let documents: Vec<_> = snapshot.documents().collect();
            let dot = export_graph(&documents, &snapshot);
            if !render && !view {
                print!("{dot}");
                return Ok(());
            }
            let output = out.clone().unwrap_or_else(|| {
                std::env::temp_dir().join(format!("backlinks.{}", config.graph_format))
            });
            let render_config = config.render_config(output);
            let artifact = render_graph(&dot, &render_config)
                .context("failed to render backlink graph")?;
            if *view {
                open_in_viewer(&artifact, render_config.viewer.as_deref())
                    .context("failed to open backlink graph")?;
            }
            let summary = json!({
                "artifact": artifact,
                "nodes": documents.len(),
                "edges": snapshot.edges().len(),
            });
            emit(&summary, cli.output)
        }
        Command::Resolve { id, create } => {
            let corpus = config.corpus().with_excluded_dirs(&cli.exclude_dirs);
            let id = DocumentId::from(id.as_str());
            let path = if *create {
                corpus
                    .ensure_document(&id)
                    .with_context(|| format!("failed to create document '{id}'"))?
            } else {
                corpus.path_of(&id)
            };
            let exists = path.is_file();
            emit(
                &json!({ "id": id, "path": path, "exists": exists }),
                cli.output,
            )
        }
        Command::Watch { .. } => {
            let corpus = checked_corpus(&config, &cli.exclude_dirs)?;
            let scheduler = RebuildScheduler::new(corpus, Arc::new(IndexCache::new()));
            let mut notices = scheduler.subscribe();
            let listener = tokio::spawn(async move {
                while notices.changed().await.is_ok() {
                    let latest = *notices.borrow_and_update();
                    if let Some(notice) = latest {
                        tracing::info!(
                            generation = notice.generation,
                            documents = notice.stats.documents,
                            links = notice.stats.links,
                            skipped = notice.stats.skipped,
                            "snapshot available"
                        );
                    }
                }
            });
            tracing::info!(
                root = %config.root.display(),
                interval_secs = config.rebuild_interval_secs,
                "watching corpus; Ctrl+C to stop"
            );
            let outcome = Arc::clone(&scheduler)
                .run_periodic(config.rebuild_interval(), async {
                    wait_for_stop(tokio::signal::ctrl_c()).await;
                })
                .await;
            listener.abort();
            emit(&outcome, cli.output)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "omni_backlinks=debug,backlinks=debug"
        } else {
            "omni_backlinks=info,backlinks=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = BacklinkConfig::resolve(cli.config_file.as_deref(), &overrides(&cli))
        .context("failed to load backlinks config")?;
    tracing::debug!(?config, "resolved backlinks config");
    execute(cli, config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_listener_failure_is_reported() {
        let failed = wait_for_stop(async { Err(std::io::Error::other("no signal handler")) });
        assert!(!failed.await);
        assert!(wait_for_stop(async { Ok(()) }).await);
    }
}
