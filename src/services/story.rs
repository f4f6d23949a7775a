use crate::models::StoryParams;
use crate::services::jobs::JobStore;
use crate::services::llm::CompletionProvider;
use crate::services::progress::ProgressSink;
use crate::services::response_time::SharedEstimator;
use crate::services::session::{ChoiceSelection, SessionError, SessionHandle, SessionStore, StorySession};
use crate::services::story_parser::parse_story_response;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("session {0} not found")]
    SessionNotFound(Uuid),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Returned when a generation has been queued.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationTicket {
    pub session_id: Uuid,
    pub job_id: Uuid,
    pub estimated_ms: u64,
}

/// Runs story generations as background jobs and folds their results back
/// into sessions.
pub struct StoryService {
    llm: Arc<dyn CompletionProvider>,
    jobs: Arc<JobStore>,
    sessions: Arc<SessionStore>,
    estimator: Arc<SharedEstimator>,
    progress: Arc<dyn ProgressSink>,
}

impl StoryService {
    pub fn new(
        llm: Arc<dyn CompletionProvider>,
        jobs: Arc<JobStore>,
        sessions: Arc<SessionStore>,
        estimator: Arc<SharedEstimator>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        StoryService {
            llm,
            jobs,
            sessions,
            estimator,
            progress,
        }
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn estimator(&self) -> &SharedEstimator {
        &self.estimator
    }

    pub async fn start_session(
        &self,
        params: StoryParams,
        modifiers: Vec<String>,
    ) -> Result<GenerationTicket, StoryError> {
        let handle = self.sessions.insert(StorySession::new(params, modifiers));
        let (session_id, prompt) = {
            let mut session = handle.state.lock().await;
            (session.id, session.begin_initial()?)
        };
        tracing::info!("Starting story session {}", session_id);
        Ok(self.spawn_generation(session_id, handle, prompt))
    }

    pub async fn continue_session(
        &self,
        session_id: Uuid,
        selection: &ChoiceSelection,
    ) -> Result<GenerationTicket, StoryError> {
        let handle = self
            .sessions
            .get(session_id)
            .ok_or(StoryError::SessionNotFound(session_id))?;
        let prompt = handle.state.lock().await.begin_continue(selection)?;
        tracing::info!("Continuing story session {}", session_id);
        Ok(self.spawn_generation(session_id, handle, prompt))
    }

    fn spawn_generation(
        &self,
        session_id: Uuid,
        handle: Arc<SessionHandle>,
        prompt: String,
    ) -> GenerationTicket {
        let job_id = self.jobs.create();
        let ticket = GenerationTicket {
            session_id,
            job_id,
            estimated_ms: self.estimator.estimate(),
        };

        let llm = self.llm.clone();
        let jobs = self.jobs.clone();
        let estimator = self.estimator.clone();
        let progress = self.progress.clone();

        tokio::spawn(async move {
            let started = Instant::now();
            match llm.complete(&prompt).await {
                Ok(raw) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    let estimate = estimator.record(elapsed_ms);
                    tracing::info!(
                        "Job {} completed in {}ms, next estimate {}ms",
                        job_id,
                        elapsed_ms,
                        estimate
                    );

                    let segment = parse_story_response(&raw);
                    let modifiers = {
                        let mut session = handle.state.lock().await;
                        session.finish(segment.clone());
                        session.modifiers.clone()
                    };
                    jobs.complete(job_id, segment);

                    if let Err(e) = progress.save_progress(session_id, &raw, &modifiers).await {
                        tracing::error!("Error saving progress for session {}: {:#}", session_id, e);
                    }
                }
                Err(e) => {
                    tracing::error!("Job {} failed: {:#}", job_id, e);
                    handle.state.lock().await.abort();
                    jobs.fail(job_id, format!("{:#}", e));
                }
            }
        });

        ticket
    }
}
