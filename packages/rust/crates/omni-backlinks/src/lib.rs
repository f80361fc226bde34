//! omni-backlinks - reverse-link index for a directory of linked notes.
//!
//! Module layout:
//! - `backlinks`: locator, extractor, aggregator, cache, scheduler, view
//!   refresh, and graph export
//! - `config`: YAML/env/CLI settings
//!
//! # Examples
//!
//! ```rust
//! use omni_backlinks::{BacklinkIndex, LinkRecord};
//!
//! let index = BacklinkIndex::from_records([LinkRecord {
//!     source: "A".into(),
//!     target: "B".into(),
//!     excerpt: "see [[B]]".to_string(),
//! }]);
//! assert_eq!(index.get("B")["A"], vec!["see [[B]]"]);
//! assert!(index.get("A").is_empty());
//! ```

pub mod backlinks;
pub mod config;
mod error;

pub use backlinks::{
    BacklinkIndex, BuildStats, Corpus, Document, DocumentId, ExtractedLink, GraphRenderConfig,
    IndexCache, LinkRecord, LinkStyle, MarkdownParser, PeriodicOutcome, RebuildOutcome,
    RebuildScheduler, ReferenceKind, SchedulerState, SnapshotNotice, SourceExcerpts,
    StructuralParser, TriggerOutcome, ViewRefresh, ViewUpdate, aggregate, export_graph,
    extract_links, extract_links_from_text, list_documents, open_in_viewer, rebuild_index,
    render_graph, resolve_tool,
};
pub use config::{BacklinkConfig, ConfigOverrides};
pub use error::{BacklinkError, Result};
