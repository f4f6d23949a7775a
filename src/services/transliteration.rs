use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Romanizes a Thai word for the reader.
#[async_trait]
pub trait Transliterator: Send + Sync {
    async fn romanize(&self, word: &str) -> Result<Option<String>>;
}

/// Runs an external romanization script as `<program> <script> <word>`.
/// The word is passed as its own argument, no shell is involved.
pub struct ScriptTransliterator {
    program: String,
    script: PathBuf,
    timeout: Duration,
}

impl ScriptTransliterator {
    pub fn new(program: impl Into<String>, script: impl Into<PathBuf>, timeout: Duration) -> Self {
        ScriptTransliterator {
            program: program.into(),
            script: script.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Transliterator for ScriptTransliterator {
    async fn romanize(&self, word: &str) -> Result<Option<String>> {
        let run = Command::new(&self.program)
            .arg(&self.script)
            .arg(word)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .with_context(|| format!("transliteration timed out after {:?}", self.timeout))?
            .with_context(|| format!("running {} {}", self.program, self.script.display()))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            bail!("transliteration exited with {}: {}", output.status, stderr.trim());
        }
        if !stderr.trim().is_empty() {
            bail!("transliteration script error: {}", stderr.trim());
        }

        let romanized = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Some(romanized).filter(|r| !r.is_empty()))
    }
}
