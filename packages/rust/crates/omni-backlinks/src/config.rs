//! Runtime configuration: defaults, YAML settings, environment, CLI.
//!
//! Later layers win. YAML keys live under `backlinks.*`; the system file
//! (`<project>/packages/conf/backlinks.yaml`) is deep-merged with the user
//! file (`$PRJ_CONFIG_HOME/omni-backlinks/backlinks.yaml`, or `--conf`).

use crate::backlinks::{Corpus, GraphRenderConfig};
use crate::error::{BacklinkError, Result};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default document extension.
pub const DEFAULT_EXTENSION: &str = "md";
/// Default rebuild period (10 minutes).
pub const DEFAULT_REBUILD_INTERVAL_SECS: u64 = 600;
/// Default graph renderer executable.
pub const DEFAULT_RENDERER: &str = "dot";
/// Default rendered graph format.
pub const DEFAULT_GRAPH_FORMAT: &str = "svg";

/// Env override for the corpus root.
pub const ROOT_ENV: &str = "BACKLINKS_ROOT";
/// Env override for the document extension.
pub const EXTENSION_ENV: &str = "BACKLINKS_EXTENSION";
/// Env override for the rebuild period in seconds.
pub const INTERVAL_ENV: &str = "BACKLINKS_INTERVAL_SECS";

/// Resolved engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BacklinkConfig {
    /// Corpus root directory.
    pub root: PathBuf,
    /// Document extension, normalized (no dot, lowercase).
    pub extension: String,
    /// Periodic rebuild interval.
    pub rebuild_interval_secs: u64,
    /// Extra directory names the locator skips.
    pub excluded_dirs: Vec<String>,
    /// Graph renderer executable.
    pub renderer: String,
    /// Viewer executable; `None` means the platform opener.
    pub viewer: Option<String>,
    /// Rendered graph format.
    pub graph_format: String,
}

impl Default for BacklinkConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extension: DEFAULT_EXTENSION.to_string(),
            rebuild_interval_secs: DEFAULT_REBUILD_INTERVAL_SECS,
            excluded_dirs: Vec::new(),
            renderer: DEFAULT_RENDERER.to_string(),
            viewer: None,
            graph_format: DEFAULT_GRAPH_FORMAT.to_string(),
        }
    }
}

/// Values given on the command line; `None` keeps the lower layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--root`.
    pub root: Option<PathBuf>,
    /// `--extension`.
    pub extension: Option<String>,
    /// `--interval-secs`.
    pub rebuild_interval_secs: Option<u64>,
    /// `--renderer`.
    pub renderer: Option<String>,
    /// `--viewer`.
    pub viewer: Option<String>,
    /// `--format`.
    pub graph_format: Option<String>,
}

fn parse_positive_u64(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|value| *value > 0)
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn normalized_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().trim_start_matches('.').to_lowercase();
    (!ext.is_empty() && !ext.contains(['/', '\\', '.'])).then_some(ext)
}

fn read_yaml_file(path: &Path) -> Option<Value> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                %error,
                "ignoring malformed backlinks config"
            );
            None
        }
    }
}

fn check_explicit_config(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path).map_err(|error| {
        BacklinkError::Config(format!("cannot read '{}': {error}", path.display()))
    })?;
    serde_yaml::from_str::<Value>(&content)
        .map_err(|error| BacklinkError::Config(format!("'{}': {error}", path.display())))?;
    Ok(())
}

fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(existing) = base_map.get_mut(&key) {
                    deep_merge(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn get_setting_value<'a>(settings: &'a Value, dotted_key: &str) -> Option<&'a Value> {
    let mut cursor = settings;
    for segment in dotted_key.split('.') {
        match cursor {
            Value::Mapping(map) => {
                let key = Value::String(segment.to_string());
                cursor = map.get(&key)?;
            }
            _ => return None,
        }
    }
    Some(cursor)
}

fn get_setting_string(settings: &Value, dotted_key: &str) -> Option<String> {
    match get_setting_value(settings, dotted_key)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Trimmed, non-empty string setting.
fn get_setting_text(settings: &Value, dotted_key: &str) -> Option<String> {
    get_setting_string(settings, dotted_key)
        .as_deref()
        .and_then(non_empty)
}

fn get_setting_string_list(settings: &Value, dotted_key: &str) -> Vec<String> {
    match get_setting_value(settings, dotted_key) {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| item.as_str().and_then(non_empty))
            .collect(),
        Some(Value::String(raw)) => raw.split(',').filter_map(non_empty).collect(),
        _ => Vec::new(),
    }
}

fn resolve_project_root() -> PathBuf {
    if let Some(raw) = std::env::var("PRJ_ROOT")
        .ok()
        .as_deref()
        .and_then(non_empty)
    {
        return PathBuf::from(raw);
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    cwd.ancestors()
        .find(|dir| dir.join(".git").exists())
        .map_or_else(|| cwd.clone(), Path::to_path_buf)
}

/// System + user YAML locations; `conf` replaces the user file.
#[must_use]
pub fn default_config_paths(conf: Option<&Path>) -> Vec<PathBuf> {
    let project_root = resolve_project_root();
    let system = project_root.join("packages/conf/backlinks.yaml");
    let user = conf.map_or_else(
        || {
            let config_home = std::env::var("PRJ_CONFIG_HOME")
                .ok()
                .as_deref()
                .and_then(non_empty)
                .map_or_else(|| project_root.join(".config"), |raw| project_root.join(raw));
            config_home.join("omni-backlinks/backlinks.yaml")
        },
        Path::to_path_buf,
    );
    vec![system, user]
}

/// Deep-merge the YAML files that exist, in order.
#[must_use]
pub fn load_settings(paths: &[PathBuf]) -> Value {
    let mut merged = Value::Mapping(Mapping::new());
    for path in paths {
        if let Some(layer) = read_yaml_file(path) {
            tracing::debug!(path = %path.display(), "loaded backlinks config");
            deep_merge(&mut merged, layer);
        }
    }
    merged
}

impl BacklinkConfig {
    /// Defaults overlaid with `settings`, then with env values from `env`.
    ///
    /// Invalid values (zero interval, empty extension) keep the lower layer
    /// and log a warning.
    pub fn from_settings(settings: &Value, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(root) = get_setting_text(settings, "backlinks.root") {
            config.root = PathBuf::from(root);
        }
        if let Some(raw) = get_setting_string(settings, "backlinks.extension") {
            config.set_extension(&raw, "backlinks.extension");
        }
        if let Some(raw) = get_setting_string(settings, "backlinks.rebuild_interval_secs") {
            config.set_interval(&raw, "backlinks.rebuild_interval_secs");
        }
        config.excluded_dirs = get_setting_string_list(settings, "backlinks.excluded_dirs");
        if let Some(renderer) = get_setting_text(settings, "backlinks.graph.renderer") {
            config.renderer = renderer;
        }
        if let Some(viewer) = get_setting_text(settings, "backlinks.graph.viewer") {
            config.viewer = Some(viewer);
        }
        if let Some(format) = get_setting_text(settings, "backlinks.graph.format") {
            config.graph_format = format;
        }

        if let Some(root) = env(ROOT_ENV).as_deref().and_then(non_empty) {
            config.root = PathBuf::from(root);
        }
        if let Some(raw) = env(EXTENSION_ENV) {
            config.set_extension(&raw, EXTENSION_ENV);
        }
        if let Some(raw) = env(INTERVAL_ENV) {
            config.set_interval(&raw, INTERVAL_ENV);
        }
        config
    }

    fn set_extension(&mut self, raw: &str, source: &str) {
        match normalized_extension(raw) {
            Some(ext) => self.extension = ext,
            None => tracing::warn!(
                source,
                value = raw,
                "invalid extension; keeping '{}'",
                self.extension
            ),
        }
    }

    fn set_interval(&mut self, raw: &str, source: &str) {
        match parse_positive_u64(raw) {
            Some(secs) => self.rebuild_interval_secs = secs,
            None => tracing::warn!(
                source,
                value = raw,
                "invalid rebuild interval; keeping {}s",
                self.rebuild_interval_secs
            ),
        }
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(root) = &overrides.root {
            self.root.clone_from(root);
        }
        if let Some(raw) = &overrides.extension {
            self.set_extension(raw, "--extension");
        }
        if let Some(secs) = overrides.rebuild_interval_secs {
            self.set_interval(&secs.to_string(), "--interval-secs");
        }
        if let Some(renderer) = overrides.renderer.as_deref().and_then(non_empty) {
            self.renderer = renderer;
        }
        if let Some(viewer) = overrides.viewer.as_deref().and_then(non_empty) {
            self.viewer = Some(viewer);
        }
        if let Some(format) = overrides.graph_format.as_deref().and_then(non_empty) {
            self.graph_format = format;
        }
        self
    }

    /// Full resolution: YAML files, process environment, then `overrides`.
    ///
    /// Default config files are optional; an explicit `conf` must exist and
    /// parse, or [`BacklinkError::Config`] is returned.
    pub fn resolve(conf: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(path) = conf {
            check_explicit_config(path)?;
        }
        let settings = load_settings(&default_config_paths(conf));
        let config = Self::from_settings(&settings, |key| std::env::var(key).ok());
        Ok(config.with_overrides(overrides))
    }

    /// Rebuild period as a [`Duration`].
    #[must_use]
    pub fn rebuild_interval(&self) -> Duration {
        Duration::from_secs(self.rebuild_interval_secs)
    }

    /// Corpus described by this config.
    #[must_use]
    pub fn corpus(&self) -> Corpus {
        Corpus::new(&self.root, &self.extension).with_excluded_dirs(&self.excluded_dirs)
    }

    /// Renderer settings writing to `output`.
    #[must_use]
    pub fn render_config(&self, output: PathBuf) -> GraphRenderConfig {
        GraphRenderConfig {
            renderer: self.renderer.clone(),
            format: self.graph_format.clone(),
            output,
            viewer: self.viewer.clone(),
        }
    }
}
