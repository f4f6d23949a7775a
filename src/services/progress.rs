use crate::models::now_rfc3339;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Receives every raw completion so a story can be resumed later.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn save_progress(&self, session_id: Uuid, raw: &str, modifiers: &[String]) -> Result<()>;
}

#[derive(Serialize)]
struct ProgressEntry<'a> {
    session_id: Uuid,
    raw: &'a str,
    modifiers: &'a [String],
    saved_at: String,
}

/// Appends one JSON line per completion to `<dir>/<session id>.jsonl`.
pub struct FileProgressSink {
    dir: PathBuf,
}

impl FileProgressSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileProgressSink { dir: dir.into() }
    }

    pub fn path_for(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.jsonl", session_id))
    }
}

#[async_trait]
impl ProgressSink for FileProgressSink {
    async fn save_progress(&self, session_id: Uuid, raw: &str, modifiers: &[String]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let mut line = serde_json::to_string(&ProgressEntry {
            session_id,
            raw,
            modifiers,
            saved_at: now_rfc3339(),
        })?;
        line.push('\n');

        let path = self.path_for(session_id);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("opening {}", path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
