//! Evidence capture and artifact storage.
//!
//! The recorder turns "take a screenshot now" into a durable, labelled,
//! timestamped [`Evidence`] entry. Capture is best-effort: a failed
//! screenshot or write is recorded on the entry as a note and logged, and
//! never fails the scenario.
//!
//! Artifact keys are `<scenario>/<step index>-<label>.png`. A scenario run
//! captures at most once per step index (the final capture takes the index
//! one past the last step), so keys never collide within a run.

use crate::session::Session;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Label used for the capture taken when a run finishes.
pub const FINAL_CAPTURE_LABEL: &str = "final";

/// Kind of stored artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// PNG image bytes.
    Screenshot,
    /// UTF-8 text.
    Text,
}

/// Where an artifact was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Store-relative key.
    pub key: String,
    /// What the artifact holds.
    pub kind: ArtifactKind,
    /// Store-specific location (a file path for the filesystem store).
    pub location: String,
    /// Size in bytes.
    pub size: usize,
}

/// A captured artifact proving the run's state at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Caller-supplied label (or `final`).
    pub label: String,
    /// Index of the step that triggered the capture.
    pub step_index: usize,
    /// When the capture completed.
    pub timestamp: DateTime<Utc>,
    /// The stored artifact, absent if the capture failed.
    pub artifact: Option<ArtifactRef>,
    /// Why the capture failed, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Evidence {
    /// True if an artifact was stored.
    #[must_use]
    pub fn is_stored(&self) -> bool {
        self.artifact.is_some()
    }
}

/// Durable storage for artifacts.
///
/// `put` must not return until the bytes are durably written.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores `bytes` under `key` and reports where they went.
    async fn put(&self, key: &str, kind: ArtifactKind, bytes: &[u8]) -> std::io::Result<ArtifactRef>;
}

/// Stores artifacts as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates a store rooted at `root` (created lazily).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, key: &str, kind: ArtifactKind, bytes: &[u8]) -> std::io::Result<ArtifactRef> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        debug!(path = %path.display(), size = bytes.len(), "artifact written");

        Ok(ArtifactRef {
            key: key.to_string(),
            kind,
            location: path.display().to_string(),
            size: bytes.len(),
        })
    }
}

/// Keeps artifacts in memory. Useful for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactStore {
    artifacts: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stored artifact.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// All keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, key: &str, kind: ArtifactKind, bytes: &[u8]) -> std::io::Result<ArtifactRef> {
        self.artifacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), bytes.to_vec());

        Ok(ArtifactRef {
            key: key.to_string(),
            kind,
            location: format!("memory:{key}"),
            size: bytes.len(),
        })
    }
}

/// Append-only evidence log for one scenario run.
pub struct EvidenceRecorder {
    prefix: String,
    store: Arc<dyn ArtifactStore>,
    entries: Vec<Evidence>,
}

impl EvidenceRecorder {
    /// Creates a recorder keyed by the scenario name.
    pub fn new(scenario: &str, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            prefix: slugify(scenario),
            store,
            entries: Vec::new(),
        }
    }

    /// Takes a screenshot and stores it.
    ///
    /// Suspends until the artifact is written or the attempt fails. Never
    /// returns an error: failures are kept as a note on the entry.
    pub async fn capture(
        &mut self,
        session: &dyn Session,
        step_index: usize,
        label: &str,
        timeout: Duration,
    ) -> &Evidence {
        let key = format!("{}/{step_index:03}-{}.png", self.prefix, slugify(label));

        let outcome = match tokio::time::timeout(timeout, session.screenshot()).await {
            Err(_) => Err(format!("screenshot timed out after {timeout:?}")),
            Ok(Err(e)) => Err(e.to_string()),
            Ok(Ok(bytes)) => self
                .store
                .put(&key, ArtifactKind::Screenshot, &bytes)
                .await
                .map_err(|e| format!("failed to store '{key}': {e}")),
        };

        let (artifact, note) = match outcome {
            Ok(artifact) => (Some(artifact), None),
            Err(reason) => {
                warn!(label, step_index, %reason, "evidence capture failed");
                (None, Some(reason))
            }
        };

        let timestamp = self.next_timestamp();
        self.entries.push(Evidence {
            label: label.to_string(),
            step_index,
            timestamp,
            artifact,
            note,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Stores a text artifact next to the evidence, without adding an entry.
    ///
    /// Returns `None` (after logging) if the write fails.
    pub async fn store_text(&self, name: &str, text: &str) -> Option<ArtifactRef> {
        let key = format!("{}/{name}", self.prefix);
        match self.store.put(&key, ArtifactKind::Text, text.as_bytes()).await {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                warn!(%key, error = %e, "failed to store text artifact");
                None
            }
        }
    }

    /// Entries recorded so far.
    #[must_use]
    pub fn entries(&self) -> &[Evidence] {
        &self.entries
    }

    /// Hands the entries over to the run result.
    #[must_use]
    pub fn into_entries(self) -> Vec<Evidence> {
        self.entries
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.entries.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        }
    }
}

/// Lowercase ASCII alphanumerics with single dashes in between.
pub(crate) fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}
