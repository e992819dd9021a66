// src/sources/page.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use scraper::{Html, Selector};

use crate::sources::types::{PageSelectors, SourceItem, SourceProvider};

/// Markup-scrape source: repeated item blocks are located by CSS selectors
/// supplied in the source descriptor.
pub struct PageProvider {
    id: String,
    url: reqwest::Url,
    max_items: usize,
    selectors: CompiledSelectors,
    client: reqwest::Client,
}

struct CompiledSelectors {
    item: Selector,
    title: Selector,
    link: Selector,
    summary: Option<Selector>,
}

fn compile(raw: &str, what: &str, source_id: &str) -> Result<Selector> {
    Selector::parse(raw)
        .map_err(|e| anyhow!("invalid {what} selector `{raw}` for source `{source_id}`: {e}"))
}

impl PageProvider {
    pub fn new(id: String, url: String, max_items: usize, selectors: PageSelectors) -> Result<Self> {
        let compiled = CompiledSelectors {
            item: compile(&selectors.item, "item", &id)?,
            title: compile(&selectors.title, "title", &id)?,
            link: compile(&selectors.link, "link", &id)?,
            summary: selectors
                .summary
                .as_deref()
                .map(|s| compile(s, "summary", &id))
                .transpose()?,
        };
        let url = reqwest::Url::parse(&url)
            .with_context(|| format!("invalid url for source `{id}`"))?;
        Ok(Self {
            id,
            url,
            max_items,
            selectors: compiled,
            client: reqwest::Client::new(),
        })
    }

    fn extract_items(&self, html: &str) -> Vec<SourceItem> {
        let doc = Html::parse_document(html);
        let fetched_at = Utc::now();
        let mut out = Vec::new();

        for block in doc.select(&self.selectors.item) {
            if out.len() == self.max_items {
                break;
            }

            let title = block
                .select(&self.selectors.title)
                .next()
                .map(|el| crate::sources::normalize_text(&el.text().collect::<String>()))
                .unwrap_or_default();

            let href = block
                .select(&self.selectors.link)
                .next()
                .and_then(|el| el.value().attr("href"))
                .map(str::trim)
                .unwrap_or_default();

            // Blocks missing a title or link are dropped, not padded.
            if title.is_empty() || href.is_empty() {
                continue;
            }

            let link = match self.url.join(href) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            };

            let summary = self
                .selectors
                .summary
                .as_ref()
                .and_then(|sel| block.select(sel).next())
                .map(|el| crate::sources::normalize_text(&el.text().collect::<String>()))
                .unwrap_or_default();

            out.push(SourceItem {
                title,
                summary,
                link,
                source_id: self.id.clone(),
                fetched_at,
            });
        }
        out
    }
}

#[async_trait]
impl SourceProvider for PageProvider {
    async fn fetch_latest(&self) -> Result<Vec<SourceItem>> {
        let body = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("fetching page `{}`", self.id))?
            .error_for_status()
            .with_context(|| format!("page `{}` returned error status", self.id))?
            .text()
            .await
            .with_context(|| format!("reading page `{}` body", self.id))?;
        Ok(self.extract_items(&body))
    }

    fn id(&self) -> &str {
        &self.id
    }
}
