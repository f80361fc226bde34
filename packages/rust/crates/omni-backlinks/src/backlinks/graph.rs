//! Graph Exporter: DOT description of the corpus and its backlink edges,
//! plus rendering through an external Graphviz-style executable.

use super::models::{BacklinkIndex, Document};
use crate::error::{BacklinkError, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const STDERR_CLIP: usize = 400;

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

fn clipped(raw: &str, max: usize) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Render `documents` and the edges of `index` as a DOT digraph.
///
/// Nodes are sorted by id and carry their absolute path as a `file://` URL;
/// edges run `source -> target`, one per pair no matter how many excerpts
/// back it. Identical input yields byte-identical output.
#[must_use]
pub fn export_graph(documents: &[Document], index: &BacklinkIndex) -> String {
    let nodes: BTreeMap<&str, &Path> = documents
        .iter()
        .map(|doc| (doc.id.as_str(), doc.path.as_path()))
        .collect();

    let mut out = String::from("digraph backlinks {\n");
    for (id, path) in nodes {
        let _ = writeln!(
            out,
            "  \"{id}\" [label=\"{id}\", URL=\"file://{path}\"];",
            id = escape(id),
            path = escape(&path.to_string_lossy()),
        );
    }
    for (source, target) in index.edges() {
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\";",
            escape(source.as_str()),
            escape(target.as_str())
        );
    }
    out.push_str("}\n");
    out
}

/// External renderer + viewer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRenderConfig {
    /// Renderer executable name or path (`dot`).
    pub renderer: String,
    /// Output format passed as `-T<format>` (`svg`, `png`, ...).
    pub format: String,
    /// Artifact path.
    pub output: PathBuf,
    /// Viewer executable; `None` picks the platform opener.
    pub viewer: Option<String>,
}

impl Default for GraphRenderConfig {
    fn default() -> Self {
        Self {
            renderer: "dot".to_string(),
            format: "svg".to_string(),
            output: std::env::temp_dir().join("backlinks.svg"),
            viewer: None,
        }
    }
}

/// Locate an executable on `PATH` (or accept an explicit path).
pub fn resolve_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| BacklinkError::MissingExternalTool(name.to_string()))
}

/// Pipe `dot_source` through the renderer and return the artifact path.
pub fn render_graph(dot_source: &str, config: &GraphRenderConfig) -> Result<PathBuf> {
    let renderer = resolve_tool(&config.renderer)?;
    if let Some(parent) = config.output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut child = Command::new(&renderer)
        .arg(format!("-T{}", config.format))
        .arg("-o")
        .arg(&config.output)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin.write_all(dot_source.as_bytes())?;
    }
    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(BacklinkError::ExternalToolFailed {
            tool: config.renderer.clone(),
            status: output.status.to_string(),
            stderr: clipped(&String::from_utf8_lossy(&output.stderr), STDERR_CLIP),
        });
    }
    tracing::info!(
        renderer = %renderer.display(),
        output = %config.output.display(),
        "graph rendered"
    );
    Ok(config.output.clone())
}

fn default_viewers() -> &'static [&'static str] {
    if cfg!(target_os = "macos") {
        &["open"]
    } else {
        &["xdg-open", "open"]
    }
}

/// Open `artifact` in `viewer` (or the platform opener) without waiting.
pub fn open_in_viewer(artifact: &Path, viewer: Option<&str>) -> Result<()> {
    let candidates: Vec<&str> = match viewer {
        Some(name) => vec![name],
        None => default_viewers().to_vec(),
    };
    let tool = candidates
        .iter()
        .find_map(|name| resolve_tool(name).ok())
        .ok_or_else(|| BacklinkError::MissingExternalTool(candidates.join(" | ")))?;

    Command::new(&tool)
        .arg(artifact)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    tracing::info!(viewer = %tool.display(), artifact = %artifact.display(), "viewer launched");
    Ok(())
}
