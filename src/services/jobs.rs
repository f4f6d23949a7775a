use crate::models::StorySegment;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Completed { segment: StorySegment },
    Failed { message: String },
}

struct JobEntry {
    status: JobStatus,
    created_at: Instant,
}

/// In-memory registry of background story generations, polled by id.
#[derive(Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<Uuid, JobEntry>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, JobEntry>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self) -> Uuid {
        self.create_at(Instant::now())
    }

    fn create_at(&self, created_at: Instant) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().insert(
            id,
            JobEntry {
                status: JobStatus::Pending,
                created_at,
            },
        );
        id
    }

    pub fn complete(&self, id: Uuid, segment: StorySegment) {
        self.finish(id, JobStatus::Completed { segment });
    }

    pub fn fail(&self, id: Uuid, message: impl Into<String>) {
        self.finish(id, JobStatus::Failed { message: message.into() });
    }

    fn finish(&self, id: Uuid, status: JobStatus) {
        match self.lock().get_mut(&id) {
            Some(entry) => entry.status = status,
            None => tracing::warn!("Job {} finished after it was swept", id),
        }
    }

    pub fn status(&self, id: Uuid) -> Option<JobStatus> {
        self.lock().get(&id).map(|entry| entry.status.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Removes every job older than `ttl`, whatever its state. Returns the
    /// number removed.
    pub fn sweep(&self, ttl: Duration) -> usize {
        self.sweep_at(Instant::now(), ttl)
    }

    fn sweep_at(&self, now: Instant, ttl: Duration) -> usize {
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|_, entry| now.saturating_duration_since(entry.created_at) < ttl);
        before - jobs.len()
    }
}
