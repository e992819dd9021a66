// src/sources/feed.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::sources::types::{SourceItem, SourceProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
}

/// RSS feed source. One failing fetch or parse is reported upward and
/// absorbed by the aggregator.
pub struct FeedProvider {
    id: String,
    url: String,
    max_items: usize,
    client: reqwest::Client,
}

impl FeedProvider {
    pub fn new(id: String, url: String, max_items: usize) -> Self {
        Self {
            id,
            url,
            max_items,
            client: reqwest::Client::new(),
        }
    }
}

/// Parse feed XML into normalized items. Items missing a title or link are
/// dropped rather than carried with placeholders.
pub fn parse_feed(source_id: &str, xml: &str, max_items: usize) -> Result<Vec<SourceItem>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss =
        from_str(&xml_clean).with_context(|| format!("parsing rss feed `{source_id}`"))?;

    let fetched_at = Utc::now();
    let mut out = Vec::new();
    for it in rss.channel.item {
        if out.len() == max_items {
            break;
        }
        let (Some(title), Some(link)) = (it.title, it.link) else {
            continue;
        };
        let title = crate::sources::normalize_text(&title);
        let link = link.trim().to_string();
        if title.is_empty() || link.is_empty() {
            continue;
        }
        out.push(SourceItem {
            title,
            summary: crate::sources::normalize_text(it.description.as_deref().unwrap_or_default()),
            link,
            source_id: source_id.to_string(),
            fetched_at,
        });
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for FeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<SourceItem>> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("fetching feed `{}`", self.id))?
            .error_for_status()
            .with_context(|| format!("feed `{}` returned error status", self.id))?
            .text()
            .await
            .with_context(|| format!("reading feed `{}` body", self.id))?;
        parse_feed(&self.id, &body, self.max_items)
    }

    fn id(&self) -> &str {
        &self.id
    }
}

// quick-xml rejects bare HTML entities inside element text.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
