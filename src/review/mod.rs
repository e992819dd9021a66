// src/review/mod.rs
//! Review generation: backend abstraction plus the bounded retry/backoff
//! loop around rate-limited calls.

pub mod openai;

use std::time::Duration;

use thiserror::Error;

use crate::sources::types::Candidate;

/// Error surfaced by one backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

/// Terminal error of a `generate` call, after the retry budget was applied.
/// Exhaustion is distinct from a single-attempt fatal failure.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generation failed on attempt {attempts}: {source}")]
    Fatal {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("rate-limit retry budget exhausted after {attempts} attempts")]
    RetryExhausted { attempts: u32 },
}

impl GenerateError {
    pub fn attempts(&self) -> u32 {
        match self {
            GenerateError::Fatal { attempts, .. } => *attempts,
            GenerateError::RetryExhausted { attempts } => *attempts,
        }
    }
}

/// A remote text-generation service. Implementations hold no mutable state,
/// so one backend may serve concurrent per-candidate calls.
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, BackendError>;
    fn name(&self) -> &'static str;
}

/// Retry budget and backoff curve for rate-limited calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt, rate-limit responses only.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before the retry following attempt `attempt` (1-based).
    /// Linear in the attempt number, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// A successful generation and the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
    pub attempts: u32,
}

/// Wraps a backend with the retry discipline. Each `generate` call is
/// independent; only the retrying call sleeps, never the whole pipeline.
pub struct ReviewClient<B> {
    backend: B,
    policy: RetryPolicy,
}

impl<B: GenerationBackend> ReviewClient<B> {
    pub fn new(backend: B, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// At most `max_retries + 1` attempts. A rate-limit response waits for
    /// the provider's retry-after hint when present, otherwise for the
    /// policy's backoff delay. Any other failure propagates immediately.
    pub async fn generate(&self, prompt: &str) -> Result<Generated, GenerateError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.backend.complete(prompt).await {
                Ok(text) => return Ok(Generated { text, attempts }),
                Err(BackendError::RateLimited { retry_after }) => {
                    if attempts > self.policy.max_retries {
                        return Err(GenerateError::RetryExhausted { attempts });
                    }
                    let delay = retry_after.unwrap_or_else(|| self.policy.delay_for(attempts));
                    tracing::warn!(
                        backend = self.backend.name(),
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(BackendError::Fatal(source)) => {
                    return Err(GenerateError::Fatal { attempts, source });
                }
            }
        }
    }
}

/// Single-turn review prompt for one candidate.
pub fn build_prompt(candidate: &Candidate) -> String {
    let item = &candidate.item;
    format!(
        "Write a 200-word, unbiased review of {name}.\n\
         Include sections for: Overview, Key Features, Pros, Cons, and Ideal Users.\n\
         End with a short call-to-action like 'Try it now' or 'Learn more'.\n\
         Tool details:\n\
         Name: {name}\n\
         Description: {desc}\n\
         URL: {url}\n",
        name = item.title,
        desc = if item.summary.is_empty() {
            "No description available."
        } else {
            &item.summary
        },
        url = item.link,
    )
}

/// Deterministic substitute markup used when generation fails for one
/// candidate. Always non-empty and still names the tool.
pub fn fallback_markup(candidate: &Candidate) -> String {
    let item = &candidate.item;
    format!(
        "<p>Review unavailable for <a href=\"{href}\">{title}</a>. Check back soon.</p>",
        href = html_escape::encode_double_quoted_attribute(&item.link),
        title = html_escape::encode_text(&item.title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_non_decreasing_and_bounded() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(7),
        };
        let mut prev = Duration::ZERO;
        for attempt in 1..=10 {
            let d = policy.delay_for(attempt);
            assert!(d >= prev);
            assert!(d <= policy.max_delay);
            prev = d;
        }
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(5), Duration::from_secs(7));
    }

    #[test]
    fn fallback_names_the_tool_and_escapes() {
        let c = Candidate {
            item: crate::sources::types::SourceItem {
                title: "Tool <X>".into(),
                summary: String::new(),
                link: "https://x.example/?a=1&b=2".into(),
                source_id: "a".into(),
                fetched_at: chrono::Utc::now(),
            },
            dedup_key: "tool <x>".into(),
        };
        let html = fallback_markup(&c);
        assert!(html.contains("Tool &lt;X&gt;"));
        assert!(html.contains("https://x.example/?a=1&amp;b=2"));
        assert!(!html.is_empty());
    }
}
