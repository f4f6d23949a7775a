use crate::models::{StoryParams, StorySegment};
use crate::services::dictionary::LookupGuard;
use crate::services::prompt::{ContinuePrompt, format_continue_prompt, format_initial_prompt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("a story segment is already being generated")]
    Busy,
    #[error("the story has not produced a segment yet")]
    NotStarted,
    #[error("the story has already ended")]
    Ended,
    #[error("choice {0} is not offered by the current segment")]
    UnknownChoice(u32),
    #[error("choice text must not be empty")]
    EmptyChoice,
}

/// How the reader picked the next step.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChoiceSelection {
    ById { choice_id: u32 },
    ByText { choice_text: String },
}

/// One reader's story: parameters plus an append-only list of segments.
pub struct StorySession {
    pub id: Uuid,
    pub params: StoryParams,
    pub modifiers: Vec<String>,
    history: Vec<StorySegment>,
    generating: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub params: StoryParams,
    pub modifiers: Vec<String>,
    pub history: Vec<StorySegment>,
    pub generating: bool,
}

impl StorySession {
    pub fn new(params: StoryParams, modifiers: Vec<String>) -> Self {
        StorySession {
            id: Uuid::new_v4(),
            params,
            modifiers,
            history: Vec::new(),
            generating: false,
        }
    }

    pub fn history(&self) -> &[StorySegment] {
        &self.history
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            params: self.params.clone(),
            modifiers: self.modifiers.clone(),
            history: self.history().to_vec(),
            generating: self.is_generating(),
        }
    }

    /// Marks the session busy and returns the prompt for the opening segment.
    pub fn begin_initial(&mut self) -> Result<String, SessionError> {
        if self.generating {
            return Err(SessionError::Busy);
        }
        self.generating = true;
        Ok(format_initial_prompt(&self.params, &self.modifiers))
    }

    /// Marks the session busy and returns the prompt continuing from the
    /// latest segment.
    pub fn begin_continue(&mut self, selection: &ChoiceSelection) -> Result<String, SessionError> {
        if self.generating {
            return Err(SessionError::Busy);
        }
        let current = self.history.last().ok_or(SessionError::NotStarted)?;
        if current.is_ending {
            return Err(SessionError::Ended);
        }

        let choice_text = match selection {
            ChoiceSelection::ById { choice_id } => current
                .choices
                .iter()
                .find(|c| c.id == *choice_id)
                .map(|c| c.text.clone())
                .ok_or(SessionError::UnknownChoice(*choice_id))?,
            ChoiceSelection::ByText { choice_text } if choice_text.trim().is_empty() => {
                return Err(SessionError::EmptyChoice);
            }
            ChoiceSelection::ByText { choice_text } => choice_text.trim().to_string(),
        };

        let story_context = self
            .history
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format_continue_prompt(
            &ContinuePrompt {
                goal: self.goal(),
                summary: &current.summary,
                story_context: &story_context,
                user_choice: &choice_text,
            },
            &self.params,
            &self.modifiers,
        );

        self.generating = true;
        Ok(prompt)
    }

    /// Latest non-empty goal; continuation segments may omit it.
    fn goal(&self) -> &str {
        self.history
            .iter()
            .rev()
            .map(|s| s.goal.as_str())
            .find(|g| !g.is_empty())
            .unwrap_or_default()
    }

    pub fn finish(&mut self, segment: StorySegment) {
        self.history.push(segment);
        self.generating = false;
    }

    pub fn abort(&mut self) {
        self.generating = false;
    }
}

/// A session plus its lookup guard. The guard lives outside the session
/// lock so lookups never wait on it.
pub struct SessionHandle {
    pub state: tokio::sync::Mutex<StorySession>,
    pub lookups: LookupGuard,
    last_active: Mutex<Instant>,
}

impl SessionHandle {
    fn new(session: StorySession) -> Self {
        SessionHandle {
            state: tokio::sync::Mutex::new(session),
            lookups: LookupGuard::default(),
            last_active: Mutex::new(Instant::now()),
        }
    }

    pub fn touch(&self) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_since(&self) -> Instant {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Arc<SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<SessionHandle>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, session: StorySession) -> Arc<SessionHandle> {
        let id = session.id;
        let handle = Arc::new(SessionHandle::new(session));
        self.lock().insert(id, handle.clone());
        handle
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<SessionHandle>> {
        let handle = self.lock().get(&id).cloned()?;
        handle.touch();
        Some(handle)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Drops sessions idle for longer than `ttl`.
    pub fn sweep(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, handle| now.saturating_duration_since(handle.idle_since()) < ttl);
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Choice;

    fn session() -> StorySession {
        StorySession::new(
            StoryParams::new("Horror", "PG", "Age 9-10", 2),
            vec!["s4".to_string()],
        )
    }

    fn segment(text: &str, goal: &str, choices: &[&str]) -> StorySegment {
        StorySegment {
            text: text.to_string(),
            goal: goal.to_string(),
            summary: format!("summary of {text}"),
            choices: choices
                .iter()
                .enumerate()
                .map(|(i, c)| Choice {
                    id: i as u32 + 1,
                    text: c.to_string(),
                })
                .collect(),
            is_ending: choices.is_empty(),
        }
    }

    #[test]
    fn initial_generation_marks_session_busy() {
        let mut session = session();
        let prompt = session.begin_initial().unwrap();
        assert!(prompt.contains("Ancient Temple"));
        assert!(session.is_generating());
        assert_eq!(session.begin_initial(), Err(SessionError::Busy));

        session.finish(segment("หนึ่ง", "goal", &["a"]));
        assert!(!session.is_generating());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn snapshot_reflects_history_and_busy_flag() {
        let mut session = session();
        session.finish(segment("หนึ่ง", "goal", &["a"]));
        session.begin_continue(&ChoiceSelection::ById { choice_id: 1 }).unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.id, session.id);
        assert_eq!(snapshot.history.len(), 1);
        assert!(snapshot.generating);
    }

    #[test]
    fn continue_requires_a_segment() {
        let mut session = session();
        let selection = ChoiceSelection::ById { choice_id: 1 };
        assert_eq!(session.begin_continue(&selection), Err(SessionError::NotStarted));
    }

    #[test]
    fn continue_resolves_choice_and_joins_context() {
        let mut session = session();
        session.finish(segment("หนึ่ง .", "Escape", &["ไป ซ้าย", "ไป ขวา"]));
        session.finish(segment("สอง .", "", &["วิ่ง", "หยุด"]));

        let prompt = session
            .begin_continue(&ChoiceSelection::ById { choice_id: 2 })
            .unwrap();
        assert!(prompt.contains("หนึ่ง .\nสอง ."));
        assert!(prompt.contains("The reader chose:\nหยุด"));
        assert!(prompt.contains("Story goal:\nEscape"));
        assert!(prompt.contains("summary of สอง ."));
        assert!(session.is_generating());
    }

    #[test]
    fn continue_rejects_unknown_choice_and_blank_text() {
        let mut session = session();
        session.finish(segment("หนึ่ง", "g", &["a"]));

        assert_eq!(
            session.begin_continue(&ChoiceSelection::ById { choice_id: 3 }),
            Err(SessionError::UnknownChoice(3))
        );
        assert_eq!(
            session.begin_continue(&ChoiceSelection::ByText {
                choice_text: "  ".to_string()
            }),
            Err(SessionError::EmptyChoice)
        );
        assert!(!session.is_generating());

        let prompt = session
            .begin_continue(&ChoiceSelection::ByText {
                choice_text: " เปิด ประตู ".to_string(),
            })
            .unwrap();
        assert!(prompt.contains("The reader chose:\nเปิด ประตู\n"));
    }

    #[test]
    fn ended_story_cannot_continue() {
        let mut session = session();
        session.finish(segment("จบ", "g", &[]));
        assert_eq!(
            session.begin_continue(&ChoiceSelection::ById { choice_id: 1 }),
            Err(SessionError::Ended)
        );
    }

    #[test]
    fn abort_releases_the_session() {
        let mut session = session();
        session.begin_initial().unwrap();
        session.abort();
        assert!(!session.is_generating());
        assert!(session.history().is_empty());
    }

    #[test]
    fn selection_deserializes_from_either_shape() {
        let by_id: ChoiceSelection = serde_json::from_str(r#"{"choice_id":2}"#).unwrap();
        assert!(matches!(by_id, ChoiceSelection::ById { choice_id: 2 }));
        let by_text: ChoiceSelection = serde_json::from_str(r#"{"choice_text":"ไป"}"#).unwrap();
        assert!(matches!(by_text, ChoiceSelection::ByText { .. }));
    }

    #[test]
    fn store_returns_inserted_sessions_and_sweeps_idle_ones() {
        let store = SessionStore::new();
        let handle = store.insert(session());
        let id = handle.state.try_lock().unwrap().id;

        assert!(store.get(id).is_some());
        assert!(store.get(Uuid::new_v4()).is_none());

        assert_eq!(store.sweep(Duration::from_secs(3600)), 0);
        assert_eq!(store.sweep(Duration::ZERO), 1);
        assert_eq!(store.len(), 0);
    }
}
