// tests/aggregate_sources.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use ai_review_updater::sources::types::{SourceItem, SourceProvider};
use ai_review_updater::sources::{aggregate, AggregateReport};

struct StaticProvider {
    id: &'static str,
    items: Vec<SourceItem>,
}

#[async_trait]
impl SourceProvider for StaticProvider {
    async fn fetch_latest(&self) -> Result<Vec<SourceItem>> {
        Ok(self.items.clone())
    }
    fn id(&self) -> &str {
        self.id
    }
}

struct FailingProvider;

#[async_trait]
impl SourceProvider for FailingProvider {
    async fn fetch_latest(&self) -> Result<Vec<SourceItem>> {
        Err(anyhow!("connection refused"))
    }
    fn id(&self) -> &str {
        "broken"
    }
}

fn item(title: &str, summary: &str, link: &str, source: &str) -> SourceItem {
    SourceItem {
        title: title.to_string(),
        summary: summary.to_string(),
        link: link.to_string(),
        source_id: source.to_string(),
        fetched_at: Utc::now(),
    }
}

#[tokio::test]
async fn duplicate_title_across_sources_keeps_first_seen() {
    let providers: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(StaticProvider {
            id: "a",
            items: vec![item("Tool Z", "an AI helper", "https://z", "a")],
        }),
        Box::new(StaticProvider {
            id: "b",
            items: vec![item("Tool Z", "a different AI summary", "https://z2", "b")],
        }),
    ];
    let report = aggregate(&providers, &["ai".to_string()], 10).await;
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.candidates[0].item.source_id, "a");
}

#[tokio::test]
async fn no_two_candidates_share_a_dedup_key() {
    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(StaticProvider {
        id: "a",
        items: vec![
            item("AI Alpha", "", "https://1", "a"),
            item("ai  alpha", "", "https://2", "a"),
            item("AI Beta", "", "https://3", "a"),
            item("AI BETA", "", "https://4", "a"),
        ],
    })];
    let report = aggregate(&providers, &[], 10).await;
    let mut keys: Vec<&str> = report
        .candidates
        .iter()
        .map(|c| c.dedup_key.as_str())
        .collect();
    let before = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), before);
    assert_eq!(report.candidates.len(), 2);
}

#[tokio::test]
async fn failing_source_is_non_fatal_and_observable() {
    let providers: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(FailingProvider),
        Box::new(StaticProvider {
            id: "ok",
            items: vec![item("AI Gamma", "", "https://g", "ok")],
        }),
    ];
    let AggregateReport {
        candidates,
        outcomes,
    } = aggregate(&providers, &[], 10).await;
    assert_eq!(candidates.len(), 1);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_failure());
    assert_eq!(outcomes[0].source_id, "broken");
    assert!(!outcomes[1].is_failure());
}

#[tokio::test]
async fn relevance_filter_is_case_insensitive_both_ways() {
    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(StaticProvider {
        id: "a",
        items: vec![
            item("Shiny AI Writer", "", "https://keep1", "a"),
            item("Plain spreadsheet", "now with Ai inside", "https://keep2", "a"),
            item("Plain spreadsheet two", "nothing relevant", "https://drop", "a"),
        ],
    })];
    let report = aggregate(&providers, &["AI".to_string()], 10).await;
    let links: Vec<&str> = report
        .candidates
        .iter()
        .map(|c| c.item.link.as_str())
        .collect();
    assert_eq!(links, vec!["https://keep1", "https://keep2"]);
}

#[tokio::test]
async fn global_cap_applies_after_filter_and_dedup() {
    let providers: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(StaticProvider {
            id: "a",
            items: vec![
                item("AI one", "", "https://1", "a"),
                item("AI one", "", "https://1-dup", "a"),
                item("AI two", "", "https://2", "a"),
            ],
        }),
        Box::new(StaticProvider {
            id: "b",
            items: vec![item("AI three", "", "https://3", "b")],
        }),
    ];
    let report = aggregate(&providers, &["ai".to_string()], 2).await;
    let titles: Vec<&str> = report
        .candidates
        .iter()
        .map(|c| c.item.title.as_str())
        .collect();
    // Dedup happens before the cap, so "AI two" is not squeezed out by the duplicate.
    assert_eq!(titles, vec!["AI one", "AI two"]);
}
