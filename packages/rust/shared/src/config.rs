//! Project configuration for siteindex.
//!
//! Project config lives at `./siteindex.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteIndexError};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "siteindex.toml";

// ---------------------------------------------------------------------------
// Config structs (matching siteindex.toml schema)
// ---------------------------------------------------------------------------

/// Top-level project config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Build output and logging.
    #[serde(default)]
    pub build: BuildSection,

    /// Marker vocabulary.
    #[serde(default)]
    pub markers: MarkersConfig,

    /// Which pages are scanned for markers.
    #[serde(default)]
    pub pages: PagesConfig,

    /// Which extracted documents are kept.
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Search index settings applied to every partition.
    #[serde(default)]
    pub index: IndexConfig,

    /// Shaping of the persisted document list.
    #[serde(default)]
    pub output: OutputConfig,

    /// Dev artifact server.
    #[serde(default)]
    pub dev: DevConfig,
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Directory holding the rendered site.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Sub-directory (relative to `out_dir`) receiving the artifacts.
    #[serde(default = "default_sub_dir")]
    pub sub_dir: String,

    /// Report every indexed page at info level.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            sub_dir: default_sub_dir(),
            verbose: false,
        }
    }
}

fn default_out_dir() -> String {
    "dist".into()
}
fn default_sub_dir() -> String {
    "search".into()
}

/// `[markers]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkersConfig {
    /// Tag prefix: `<prefix>-document`, `<prefix>-field`, `<prefix>-text`.
    #[serde(default = "default_marker_prefix")]
    pub prefix: String,
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            prefix: default_marker_prefix(),
        }
    }
}

fn default_marker_prefix() -> String {
    "search".into()
}

/// `[pages]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagesConfig {
    /// Page path include patterns (regex). Empty means every page.
    #[serde(default)]
    pub include: Vec<String>,

    /// Page path exclude patterns (regex).
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `[documents]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Partitions whose documents are dropped entirely.
    #[serde(default)]
    pub exclude_indexes: Vec<String>,

    /// Documents missing any of these fields are dropped.
    #[serde(default)]
    pub require_fields: Vec<String>,
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Token separator (regex).
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Indexed fields. Empty means every field of every document.
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            fields: Vec::new(),
        }
    }
}

fn default_separator() -> String {
    r"[\s\-]+".into()
}

/// One `[[index.fields]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default = "default_boost")]
    pub boost: f32,
}

fn default_boost() -> f32 {
    1.0
}

/// `[output]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Fields removed from `docs.json` (they are still indexed).
    #[serde(default)]
    pub strip_fields: Vec<String>,
}

/// `[dev]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    /// Listen address of the dev server.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Site base path stripped from request paths before lookup.
    #[serde(default = "default_base")]
    pub base: String,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base: default_base(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:4321".into()
}
fn default_base() -> String {
    "/".into()
}

// ---------------------------------------------------------------------------
// Build settings (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime build settings, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Directory holding the rendered site.
    pub out_dir: PathBuf,
    /// Artifact sub-directory; `None` writes artifacts at the output root.
    pub sub_dir: Option<String>,
    /// Marker tag prefix.
    pub marker_prefix: String,
    /// Report every indexed page at info level.
    pub verbose: bool,
}

impl BuildSettings {
    /// Directory receiving the default partition's artifacts.
    pub fn artifact_root(&self) -> PathBuf {
        match &self.sub_dir {
            Some(sub) => self.out_dir.join(sub),
            None => self.out_dir.clone(),
        }
    }
}

impl From<&AppConfig> for BuildSettings {
    fn from(config: &AppConfig) -> Self {
        let sub_dir = config.build.sub_dir.trim_matches('/');
        Self {
            out_dir: PathBuf::from(&config.build.out_dir),
            sub_dir: (!sub_dir.is_empty()).then(|| sub_dir.to_string()),
            marker_prefix: config.markers.prefix.clone(),
            verbose: config.build.verbose,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path of the config file in the current working directory.
pub fn config_file_path() -> Result<PathBuf> {
    let cwd = std::env::current_dir()
        .map_err(|e| SiteIndexError::config(format!("cannot determine working directory: {e}")))?;
    Ok(cwd.join(CONFIG_FILE_NAME))
}

/// Load the project config. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the project config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteIndexError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SiteIndexError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file into `dir`. Returns the path to the created file.
///
/// An existing file is left alone and reported as an error.
pub fn init_config(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(SiteIndexError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| SiteIndexError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SiteIndexError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("out_dir"));
        assert!(toml_str.contains("prefix"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.build.sub_dir, "search");
        assert_eq!(parsed.index.separator, r"[\s\-]+");
        assert_eq!(parsed.dev.bind, "127.0.0.1:4321");
    }

    #[test]
    fn config_with_fields_and_filters() {
        let toml_str = r#"
[build]
out_dir = "public"
verbose = true

[pages]
exclude = ["^drafts/"]

[[index.fields]]
name = "title"
boost = 10.0

[[index.fields]]
name = "content"

[output]
strip_fields = ["content"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.build.out_dir, "public");
        assert!(config.build.verbose);
        assert_eq!(config.pages.exclude, vec!["^drafts/"]);
        assert_eq!(config.index.fields.len(), 2);
        assert_eq!(config.index.fields[0].boost, 10.0);
        assert_eq!(config.index.fields[1].boost, 1.0);
        assert_eq!(config.output.strip_fields, vec!["content"]);
    }

    #[test]
    fn build_settings_from_app_config() {
        let mut app = AppConfig::default();
        let settings = BuildSettings::from(&app);
        assert_eq!(settings.sub_dir.as_deref(), Some("search"));
        assert_eq!(settings.artifact_root(), PathBuf::from("dist/search"));

        app.build.sub_dir = "/".into();
        let settings = BuildSettings::from(&app);
        assert!(settings.sub_dir.is_none());
        assert_eq!(settings.artifact_root(), PathBuf::from("dist"));
    }

    #[test]
    fn init_config_refuses_to_overwrite() {
        let dir = std::env::temp_dir().join(format!("si-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();

        let path = init_config(&dir).expect("first init");
        let loaded = load_config_from(&path).expect("load written config");
        assert_eq!(loaded.markers.prefix, "search");

        let err = init_config(&dir).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
