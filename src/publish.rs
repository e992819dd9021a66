// src/publish.rs
//! Persistence and publish collaborators. The pipeline computes the full
//! mutated document in memory, writes it once through `DocumentStore`, then
//! signals `Publisher`; commit mechanics stay behind the trait.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

pub trait DocumentStore: Send + Sync {
    fn read(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, contents: &str) -> Result<()>;
}

/// Plain filesystem store.
pub struct FsStore;

impl DocumentStore for FsStore {
    fn read(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading document {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        std::fs::write(path, contents)
            .with_context(|| format!("writing document {}", path.display()))
    }
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: &str) -> Result<()>;
}

/// Used for dry runs and when publishing is disabled.
pub struct NoopPublisher;

#[async_trait]
impl Publisher for NoopPublisher {
    async fn publish(&self, message: &str) -> Result<()> {
        tracing::info!(message, "publishing disabled, skipping");
        Ok(())
    }
}

/// Stages, commits, and pushes the document via the git CLI.
pub struct GitPublisher {
    pub repo_dir: PathBuf,
    pub branch: String,
    pub document_path: PathBuf,
}

impl GitPublisher {
    async fn git(&self, args: &[&str]) -> Result<()> {
        let output = tokio::process::Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .with_context(|| format!("spawning git {}", args.join(" ")))?;
        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Publisher for GitPublisher {
    async fn publish(&self, message: &str) -> Result<()> {
        let doc = self.document_path.display().to_string();
        self.git(&["add", &doc]).await?;
        self.git(&["commit", "-m", message]).await?;
        self.git(&["push", "origin", &self.branch]).await?;
        tracing::info!(branch = %self.branch, "pushed updated document");
        Ok(())
    }
}
