// src/sources/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A raw item as normalized from one provider response. Immutable once
/// created; lives only for the duration of a single run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct SourceItem {
    pub title: String,
    pub summary: String,
    pub link: String,
    pub source_id: String,
    pub fetched_at: DateTime<Utc>,
}

/// A source item that survived the relevance filter and deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub item: SourceItem,
    /// Normalized lowercase title (or link when the title normalizes away).
    /// No two candidates in one run share a dedup key.
    pub dedup_key: String,
}

/// How a configured source is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    /// Structured RSS feed.
    Feed,
    /// Unstructured page; repeated item blocks located by CSS selectors.
    Page,
}

/// CSS selectors used to extract item blocks from a scraped page.
#[derive(Debug, Clone, Deserialize)]
pub struct PageSelectors {
    pub item: String,
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub summary: Option<String>,
}

fn default_max_items() -> usize {
    10
}

/// One configured content source, loaded from the sources file.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub kind: FetchKind,
    pub url: String,
    /// Per-source cap on items considered (top-N by fetch order).
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Required for `kind = "page"` sources.
    #[serde(default)]
    pub selectors: Option<PageSelectors>,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<SourceItem>>;
    fn id(&self) -> &str;
}

/// Per-source fetch result, kept so failures are observable by tests and
/// operators rather than only appearing in logs.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched { items: usize },
    Failed { error: anyhow::Error },
}

#[derive(Debug)]
pub struct SourceOutcome {
    pub source_id: String,
    pub outcome: FetchOutcome,
}

impl SourceOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Failed { .. })
    }
}
