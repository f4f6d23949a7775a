use crate::models::{ResponseTimeRecord, now_rfc3339};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_ESTIMATE_MS: u64 = 8000;
pub const WINDOW_SIZE: usize = 5;
const SAFETY_BUFFER: f64 = 1.1;

/// Long-term storage for the cumulative average call duration.
#[async_trait]
pub trait ResponseTimeStore: Send + Sync {
    async fn load(&self) -> Result<ResponseTimeRecord>;
    async fn save(&self, record: &ResponseTimeRecord) -> Result<ResponseTimeRecord>;
    /// Folds one duration into the stored record as a single update.
    async fn add_sample(&self, duration_ms: u64) -> Result<ResponseTimeRecord>;
}

/// Folds one duration into the cumulative record using the record's own
/// sample count.
pub fn fold_sample(current: &ResponseTimeRecord, duration_ms: u64) -> ResponseTimeRecord {
    let samples = current.samples + 1;
    let total = current.average_time * current.samples as f64 + duration_ms as f64;
    ResponseTimeRecord {
        average_time: total / samples as f64,
        samples,
        last_updated: now_rfc3339(),
    }
}

/// Folds a duration into whatever the store returned. An unreadable record
/// starts over from the duration itself.
pub fn fold_loaded(loaded: Result<ResponseTimeRecord>, duration_ms: u64) -> ResponseTimeRecord {
    let current = loaded.unwrap_or_else(|e| {
        tracing::warn!("Could not load response time record, starting fresh: {:#}", e);
        ResponseTimeRecord {
            average_time: duration_ms as f64,
            samples: 0,
            last_updated: now_rfc3339(),
        }
    });
    fold_sample(&current, duration_ms)
}

/// Rolling estimate of the next LLM call duration: flat mean of the last
/// five observations plus a 10% buffer.
pub struct ResponseTimeEstimator {
    window: VecDeque<u64>,
    estimate_ms: u64,
    store: Option<Arc<dyn ResponseTimeStore>>,
}

impl ResponseTimeEstimator {
    pub fn new(seed_ms: u64) -> Self {
        ResponseTimeEstimator {
            window: VecDeque::with_capacity(WINDOW_SIZE + 1),
            estimate_ms: seed_ms,
            store: None,
        }
    }

    pub fn with_store(seed_ms: u64, store: Arc<dyn ResponseTimeStore>) -> Self {
        ResponseTimeEstimator {
            store: Some(store),
            ..Self::new(seed_ms)
        }
    }

    /// Seeds from the store's persisted average, falling back to the default.
    pub async fn seeded_from(store: Arc<dyn ResponseTimeStore>) -> Self {
        let seed = match store.load().await {
            Ok(record) if record.average_time.is_finite() && record.average_time > 0.0 => {
                record.average_time.round() as u64
            }
            Ok(_) => DEFAULT_ESTIMATE_MS,
            Err(e) => {
                tracing::warn!("Could not fetch average response time: {:#}", e);
                DEFAULT_ESTIMATE_MS
            }
        };
        tracing::info!("Response time estimate seeded at {}ms", seed);
        Self::with_store(seed, store)
    }

    pub fn record(&mut self, duration_ms: u64) {
        self.window.push_back(duration_ms);
        while self.window.len() > WINDOW_SIZE {
            self.window.pop_front();
        }

        let mean = self.window.iter().sum::<u64>() as f64 / self.window.len() as f64;
        self.estimate_ms = (mean * SAFETY_BUFFER).round() as u64;

        if let Some(store) = &self.store {
            spawn_persist(store.clone(), duration_ms);
        }
    }

    pub fn estimate(&self) -> u64 {
        self.estimate_ms
    }

    #[cfg(test)]
    pub fn window(&self) -> Vec<u64> {
        self.window.iter().copied().collect()
    }
}

fn spawn_persist(store: Arc<dyn ResponseTimeStore>, duration_ms: u64) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::warn!("No runtime available, response time {}ms not persisted", duration_ms);
        return;
    };
    handle.spawn(async move {
        match store.add_sample(duration_ms).await {
            Ok(record) => tracing::debug!(
                "Updated average response time: {:.0}ms over {} samples",
                record.average_time,
                record.samples
            ),
            Err(e) => tracing::error!("Error saving response time: {:#}", e),
        }
    });
}

/// Estimator shared between request handlers. `record` calls are serialized.
pub struct SharedEstimator {
    inner: Mutex<ResponseTimeEstimator>,
}

impl SharedEstimator {
    pub fn new(estimator: ResponseTimeEstimator) -> Self {
        SharedEstimator {
            inner: Mutex::new(estimator),
        }
    }

    pub fn record(&self, duration_ms: u64) -> u64 {
        let mut estimator = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        estimator.record(duration_ms);
        estimator.estimate()
    }

    pub fn estimate(&self) -> u64 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .estimate()
    }
}

/// JSON file holding a single record. A default record is written on first
/// read. Every access goes through one lock and writes replace the file with
/// a rename, so readers never see a partial record.
pub struct FileResponseTimeStore {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl FileResponseTimeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileResponseTimeStore {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn read_record(&self) -> Result<ResponseTimeRecord> {
        if !tokio::fs::try_exists(&self.path).await? {
            return self.write_record(&ResponseTimeRecord::default()).await;
        }
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        let record = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(record)
    }

    async fn write_record(&self, record: &ResponseTimeRecord) -> Result<ResponseTimeRecord> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let saved = ResponseTimeRecord {
            last_updated: now_rfc3339(),
            ..record.clone()
        };
        let body = serde_json::to_string_pretty(&saved)?;

        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, body)
            .await
            .with_context(|| format!("writing {}", staging.display()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(saved)
    }
}

#[async_trait]
impl ResponseTimeStore for FileResponseTimeStore {
    async fn load(&self) -> Result<ResponseTimeRecord> {
        let _guard = self.lock.lock().await;
        self.read_record().await
    }

    async fn save(&self, record: &ResponseTimeRecord) -> Result<ResponseTimeRecord> {
        let _guard = self.lock.lock().await;
        self.write_record(record).await
    }

    async fn add_sample(&self, duration_ms: u64) -> Result<ResponseTimeRecord> {
        let _guard = self.lock.lock().await;
        let updated = fold_loaded(self.read_record().await, duration_ms);
        self.write_record(&updated).await
    }
}
