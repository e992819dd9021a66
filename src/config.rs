// src/config.rs
//! Explicit configuration for one pipeline run. Every knob is externally
//! supplied (environment plus a sources file); nothing is hardcoded in the
//! pipeline itself.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use crate::sources::types::SourceDescriptor;

pub const ENV_DOC_PATH: &str = "REVIEW_DOC_PATH";
pub const ENV_ANCHOR: &str = "REVIEW_ANCHOR";
pub const ENV_DATE_FORMAT: &str = "REVIEW_DATE_FORMAT";
pub const ENV_SOURCES_PATH: &str = "REVIEW_SOURCES_PATH";
pub const ENV_KEYWORDS: &str = "REVIEW_KEYWORDS";
pub const ENV_MAX_CANDIDATES: &str = "REVIEW_MAX_CANDIDATES";
pub const ENV_MODEL: &str = "REVIEW_MODEL";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MAX_RETRIES: &str = "REVIEW_MAX_RETRIES";
pub const ENV_BASE_DELAY_MS: &str = "REVIEW_BASE_DELAY_MS";
pub const ENV_MAX_DELAY_MS: &str = "REVIEW_MAX_DELAY_MS";
pub const ENV_REPO_DIR: &str = "REVIEW_REPO_DIR";
pub const ENV_BRANCH: &str = "REVIEW_BRANCH";
pub const ENV_COMMIT_MESSAGE: &str = "REVIEW_COMMIT_MESSAGE";
pub const ENV_PUBLISH: &str = "REVIEW_PUBLISH";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub document_path: PathBuf,
    pub anchor: String,
    /// chrono format string for the per-entry date marker.
    pub date_format: String,
    pub keywords: Vec<String>,
    pub max_candidates: usize,
    pub model: String,
    pub api_key: String,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub repo_dir: PathBuf,
    pub branch: String,
    pub commit_message: String,
    pub publish_enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            document_path: PathBuf::from("index.html"),
            anchor: crate::document::DEFAULT_ANCHOR.to_string(),
            date_format: "%Y-%m-%d".to_string(),
            keywords: vec!["ai".to_string()],
            max_candidates: 3,
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            max_retries: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 30_000,
            repo_dir: PathBuf::from("."),
            branch: "main".to_string(),
            commit_message: "Add daily AI tool reviews".to_string(),
            publish_enabled: false,
        }
    }
}

impl PipelineConfig {
    /// Build from environment variables, falling back to defaults per field.
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            document_path: env_path(ENV_DOC_PATH).unwrap_or(d.document_path),
            anchor: env_string(ENV_ANCHOR).unwrap_or(d.anchor),
            date_format: env_string(ENV_DATE_FORMAT).unwrap_or(d.date_format),
            keywords: env_string(ENV_KEYWORDS)
                .map(|s| parse_keywords(&s))
                .unwrap_or(d.keywords),
            max_candidates: env_parsed(ENV_MAX_CANDIDATES)?.unwrap_or(d.max_candidates),
            model: env_string(ENV_MODEL).unwrap_or(d.model),
            api_key: env_string(ENV_API_KEY).unwrap_or_default(),
            max_retries: env_parsed(ENV_MAX_RETRIES)?.unwrap_or(d.max_retries),
            base_delay_ms: env_parsed(ENV_BASE_DELAY_MS)?.unwrap_or(d.base_delay_ms),
            max_delay_ms: env_parsed(ENV_MAX_DELAY_MS)?.unwrap_or(d.max_delay_ms),
            repo_dir: env_path(ENV_REPO_DIR).unwrap_or(d.repo_dir),
            branch: env_string(ENV_BRANCH).unwrap_or(d.branch),
            commit_message: env_string(ENV_COMMIT_MESSAGE).unwrap_or(d.commit_message),
            publish_enabled: env_string(ENV_PUBLISH)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(d.publish_enabled),
        })
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_path(name: &str) -> Option<PathBuf> {
    env_string(name).map(PathBuf::from)
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_string(name) {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {name}={s}")),
    }
}

fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Load source descriptors from an explicit path. Supports TOML
/// (`[[sources]]` tables) or JSON (a top-level array).
pub fn load_sources_from(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let content = fs_read(path)?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, &ext)
}

/// Load source descriptors using env var + fallbacks:
/// 1) $REVIEW_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
pub fn load_sources_default() -> Result<Vec<SourceDescriptor>> {
    if let Some(p) = env_string(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("{ENV_SOURCES_PATH} points to a non-existent path"));
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Err(anyhow!("no sources file found (set {ENV_SOURCES_PATH})"))
}

fn fs_read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<SourceDescriptor>> {
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<SourceDescriptor>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<SourceDescriptor>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(v.sources)
}

fn parse_json(s: &str) -> Result<Vec<SourceDescriptor>> {
    let v: Vec<SourceDescriptor> = serde_json::from_str(s)?;
    Ok(v)
}
