// src/pipeline.rs
//! Orchestrator: one run = read document, idempotency check, aggregate,
//! generate per candidate (concurrently, reassembled in candidate order),
//! splice, single write, publish.

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::config::PipelineConfig;
use crate::document::{self, DocumentError};
use crate::publish::{DocumentStore, Publisher};
use crate::review::{build_prompt, fallback_markup, GenerationBackend, ReviewClient};
use crate::sources::types::{Candidate, SourceProvider};
use crate::sources::{self, AggregateReport};

/// Outcome of one candidate's generation, fallback already applied.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub candidate: Candidate,
    /// Never empty; holds the deterministic fallback when `succeeded` is false.
    pub body_markup: String,
    pub succeeded: bool,
    pub attempts: u32,
}

/// Terminal result of a run. Every variant is a success signal; the no-op
/// variants perform zero mutations and zero publish calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Published {
        entries: usize,
        generated: usize,
        fallbacks: usize,
    },
    AlreadyPublished,
    NoCandidates,
    /// The splice produced a byte-identical document, so write and publish
    /// were skipped.
    Unchanged,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("reading published document: {0}")]
    DocumentRead(#[source] anyhow::Error),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("writing published document: {0}")]
    DocumentWrite(#[source] anyhow::Error),
    #[error("publishing document: {0}")]
    Publish(#[source] anyhow::Error),
}

pub struct Pipeline<B> {
    config: PipelineConfig,
    providers: Vec<Box<dyn SourceProvider>>,
    client: Arc<ReviewClient<B>>,
    store: Box<dyn DocumentStore>,
    publisher: Box<dyn Publisher>,
}

impl<B: GenerationBackend + 'static> Pipeline<B> {
    pub fn new(
        config: PipelineConfig,
        providers: Vec<Box<dyn SourceProvider>>,
        client: ReviewClient<B>,
        store: Box<dyn DocumentStore>,
        publisher: Box<dyn Publisher>,
    ) -> Self {
        Self {
            config,
            providers,
            client: Arc::new(client),
            store,
            publisher,
        }
    }

    /// One full run for the given date. The document is read once up front
    /// and written at most once at the end; no interleaved partial writes.
    pub async fn run(&self, today: NaiveDate) -> Result<RunOutcome, PipelineError> {
        let document = self
            .store
            .read(&self.config.document_path)
            .map_err(PipelineError::DocumentRead)?;

        let stamp = today.format(&self.config.date_format).to_string();
        if document::has_entry_for(&document, &stamp) {
            tracing::info!(%stamp, "entries for today already published, nothing to do");
            return Ok(RunOutcome::AlreadyPublished);
        }

        let AggregateReport {
            candidates,
            outcomes,
        } = sources::aggregate(
            &self.providers,
            &self.config.keywords,
            self.config.max_candidates,
        )
        .await;
        let failed_sources = outcomes.iter().filter(|o| o.is_failure()).count();
        tracing::info!(
            candidates = candidates.len(),
            sources = outcomes.len(),
            failed_sources,
            "aggregation finished"
        );
        if candidates.is_empty() {
            return Ok(RunOutcome::NoCandidates);
        }

        let results = self.generate_all(&candidates).await;
        let generated = results.iter().filter(|r| r.succeeded).count();
        let fallbacks = results.len() - generated;

        let mut block = String::new();
        for r in &results {
            block.push_str(&document::render_entry(&r.candidate, &r.body_markup, &stamp));
        }

        let updated = document::insert_before_anchor(&document, &self.config.anchor, &block)?;
        if updated == document {
            tracing::info!("document unchanged, skipping write and publish");
            return Ok(RunOutcome::Unchanged);
        }

        self.store
            .write(&self.config.document_path, &updated)
            .map_err(PipelineError::DocumentWrite)?;
        self.publisher
            .publish(&self.config.commit_message)
            .await
            .map_err(PipelineError::Publish)?;

        Ok(RunOutcome::Published {
            entries: results.len(),
            generated,
            fallbacks,
        })
    }

    /// Generate one review per candidate on a `JoinSet`. Results land in a
    /// slot vector keyed by candidate index, so completion order never leaks
    /// into output order. A failed candidate gets the fallback card; the run
    /// continues.
    async fn generate_all(&self, candidates: &[Candidate]) -> Vec<GenerationResult> {
        let mut set = JoinSet::new();
        for (idx, candidate) in candidates.iter().cloned().enumerate() {
            let client = Arc::clone(&self.client);
            set.spawn(async move {
                let prompt = build_prompt(&candidate);
                (idx, client.generate(&prompt).await)
            });
        }

        let mut slots: Vec<Option<(String, bool, u32)>> = vec![None; candidates.len()];
        while let Some(joined) = set.join_next().await {
            let Ok((idx, outcome)) = joined else {
                tracing::error!("generation task panicked");
                continue;
            };
            let candidate = &candidates[idx];
            match outcome {
                Ok(generated) => {
                    slots[idx] = Some((generated.text, true, generated.attempts));
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        title = %candidate.item.title,
                        "review generation failed, using fallback"
                    );
                    slots[idx] = Some((fallback_markup(candidate), false, e.attempts()));
                }
            }
        }

        candidates
            .iter()
            .cloned()
            .zip(slots)
            .map(|(candidate, slot)| {
                let (body_markup, succeeded, attempts) = match slot {
                    Some(filled) => filled,
                    None => (fallback_markup(&candidate), false, 0),
                };
                GenerationResult {
                    candidate,
                    body_markup,
                    succeeded,
                    attempts,
                }
            })
            .collect()
    }
}
