// src/sources/mod.rs
pub mod feed;
pub mod page;
pub mod types;

use std::collections::HashSet;

use anyhow::{anyhow, Result};

use crate::sources::types::{
    Candidate, FetchKind, FetchOutcome, SourceDescriptor, SourceItem, SourceOutcome,
    SourceProvider,
};

/// Normalize text: decode HTML entities, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Key used to collapse the same tool appearing across sources.
pub fn dedup_key(item: &SourceItem) -> String {
    let key = normalize_text(&item.title).to_lowercase();
    if key.is_empty() {
        item.link.trim().to_lowercase()
    } else {
        key
    }
}

/// Case-insensitive keyword gate against title and summary.
/// An empty keyword list keeps everything.
pub fn matches_keywords(item: &SourceItem, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let title = item.title.to_lowercase();
    let summary = item.summary.to_lowercase();
    keywords.iter().any(|k| {
        let k = k.trim().to_lowercase();
        !k.is_empty() && (title.contains(&k) || summary.contains(&k))
    })
}

/// Relevance filter, first-seen dedup, then the global candidate cap.
/// Input order (source-declaration order, then within-source fetch order)
/// is preserved in the output.
pub fn filter_dedup_cap(
    items: Vec<SourceItem>,
    keywords: &[String],
    max_candidates: usize,
) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if out.len() >= max_candidates {
            break;
        }
        // Items with a missing required field are dropped, never padded.
        if item.title.trim().is_empty() || item.link.trim().is_empty() {
            continue;
        }
        if !matches_keywords(&item, keywords) {
            continue;
        }
        let key = dedup_key(&item);
        if !seen.insert(key.clone()) {
            continue;
        }
        out.push(Candidate {
            item,
            dedup_key: key,
        });
    }
    out
}

/// Result of one aggregation pass: surviving candidates plus the per-source
/// fetch outcomes.
#[derive(Debug)]
pub struct AggregateReport {
    pub candidates: Vec<Candidate>,
    pub outcomes: Vec<SourceOutcome>,
}

/// Fetch every source once and reduce to the capped candidate list.
/// A failing source contributes zero items and a `Failed` outcome;
/// aggregation continues with the remaining sources.
pub async fn aggregate(
    providers: &[Box<dyn SourceProvider>],
    keywords: &[String],
    max_candidates: usize,
) -> AggregateReport {
    let mut raw = Vec::new();
    let mut outcomes = Vec::with_capacity(providers.len());
    for p in providers {
        match p.fetch_latest().await {
            Ok(mut items) => {
                outcomes.push(SourceOutcome {
                    source_id: p.id().to_string(),
                    outcome: FetchOutcome::Fetched { items: items.len() },
                });
                raw.append(&mut items);
            }
            Err(error) => {
                tracing::warn!(error = ?error, source = p.id(), "source fetch failed, skipping");
                outcomes.push(SourceOutcome {
                    source_id: p.id().to_string(),
                    outcome: FetchOutcome::Failed { error },
                });
            }
        }
    }

    let candidates = filter_dedup_cap(raw, keywords, max_candidates);
    AggregateReport {
        candidates,
        outcomes,
    }
}

/// Build fetchers from descriptors, in declaration order.
pub fn build_providers(descriptors: &[SourceDescriptor]) -> Result<Vec<Box<dyn SourceProvider>>> {
    let mut providers: Vec<Box<dyn SourceProvider>> = Vec::with_capacity(descriptors.len());
    for d in descriptors {
        match d.kind {
            FetchKind::Feed => providers.push(Box::new(feed::FeedProvider::new(
                d.id.clone(),
                d.url.clone(),
                d.max_items,
            ))),
            FetchKind::Page => {
                let selectors = d
                    .selectors
                    .clone()
                    .ok_or_else(|| anyhow!("page source `{}` has no selectors", d.id))?;
                providers.push(Box::new(page::PageProvider::new(
                    d.id.clone(),
                    d.url.clone(),
                    d.max_items,
                    selectors,
                )?));
            }
        }
    }
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(title: &str, summary: &str, link: &str, source: &str) -> SourceItem {
        SourceItem {
            title: title.to_string(),
            summary: summary.to_string(),
            link: link.to_string(),
            source_id: source.to_string(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "  <b>Hello&nbsp;&nbsp;world</b>  ";
        assert_eq!(normalize_text(s), "Hello world");
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let kw = vec!["AI".to_string()];
        assert!(matches_keywords(&item("New ai Writer", "", "https://x", "a"), &kw));
        assert!(matches_keywords(&item("Tool", "an AI assistant", "https://x", "a"), &kw));
        assert!(!matches_keywords(&item("Plain tool", "nothing here", "https://x", "a"), &kw));
    }

    #[test]
    fn dedup_key_falls_back_to_link() {
        let it = item("<i></i>", "", "https://Example.test/T", "a");
        assert_eq!(dedup_key(&it), "https://example.test/t");
    }

    #[test]
    fn first_seen_survives_across_sources() {
        let items = vec![
            item("Tool Z", "ai helper", "https://z", "a"),
            item("tool z", "different ai summary", "https://other", "b"),
        ];
        let out = filter_dedup_cap(items, &["ai".into()], 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].item.source_id, "a");
    }

    #[test]
    fn cap_preserves_established_order() {
        let items = vec![
            item("AI one", "", "https://1", "a"),
            item("AI two", "", "https://2", "a"),
            item("AI three", "", "https://3", "b"),
        ];
        let out = filter_dedup_cap(items, &["ai".into()], 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].item.title, "AI one");
        assert_eq!(out[1].item.title, "AI two");
    }

    #[test]
    fn cap_of_zero_yields_no_candidates() {
        let items = vec![
            item("AI one", "", "https://1", "a"),
            item("AI two", "", "https://2", "a"),
        ];
        let out = filter_dedup_cap(items, &[], 0);
        assert!(out.is_empty());
    }

    #[test]
    fn missing_required_fields_drop_the_item() {
        let items = vec![
            item("", "ai thing without title", "https://no-title", "a"),
            item("AI no link", "ai", "", "a"),
        ];
        let out = filter_dedup_cap(items, &[], 10);
        assert!(out.is_empty());
    }
}
