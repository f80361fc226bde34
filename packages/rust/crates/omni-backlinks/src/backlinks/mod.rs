//! Backlink Index Engine.
//!
//! Locator -> Extractor -> Aggregator build one immutable [`BacklinkIndex`];
//! the [`IndexCache`] swaps snapshots atomically and the
//! [`RebuildScheduler`] keeps it fresh in the background.

mod aggregate;
mod cache;
mod corpus;
mod extract;
mod graph;
mod locator;
mod models;
pub mod parser;
mod pipeline;
mod refresh;
mod scheduler;

pub use aggregate::{aggregate, to_record};
pub use cache::IndexCache;
pub use corpus::Corpus;
pub use extract::{extract_links, extract_links_from_text};
pub use graph::{GraphRenderConfig, export_graph, open_in_viewer, render_graph, resolve_tool};
pub use locator::list_documents;
pub use models::{
    BacklinkIndex, BuildStats, Document, DocumentId, ExtractedLink, LinkRecord, LinkStyle,
    ReferenceKind, SourceExcerpts,
};
pub use parser::{MarkdownParser, StructuralParser};
pub use pipeline::{RebuildOutcome, rebuild_index};
pub use refresh::{ViewRefresh, ViewUpdate};
pub use scheduler::{
    PeriodicOutcome, RebuildScheduler, SchedulerState, SnapshotNotice, TriggerOutcome,
};
