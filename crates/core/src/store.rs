//! Session persistence seam.
//!
//! The orchestrator depends only on this trait; the in-memory map below
//! is the default backend, and a durable one can be injected without
//! touching orchestration code.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::session::InterviewSession;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: InterviewSession) -> Result<()>;
    async fn get(&self, session_id: &str) -> Result<Option<InterviewSession>>;
    async fn update(&self, session: &InterviewSession) -> Result<()>;
    /// Returns whether a session was actually removed. Safe to call in
    /// any session state.
    async fn remove(&self, session_id: &str) -> Result<bool>;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, InterviewSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: InterviewSession) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<InterviewSession>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn update(&self, session: &InterviewSession) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<bool> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{CloudPreference, InterviewMode, Role};
    use crate::session::{InterviewSetup, InterviewState};

    fn sample_session() -> InterviewSession {
        InterviewSession::new(InterviewSetup {
            target_role: Role::Junior,
            years_of_experience: 1,
            cloud_preference: CloudPreference::Agnostic,
            mode: InterviewMode::Structured,
            max_questions: 3,
            include_skills: vec![],
            exclude_skills: vec![],
        })
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = InMemorySessionStore::new();
        let session = sample_session();
        let id = session.id.clone();
        store.insert(session).await.unwrap();
        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.state, InterviewState::Setup);
    }

    #[tokio::test]
    async fn get_unknown_id_is_none() {
        let store = InMemorySessionStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_overwrites() {
        let store = InMemorySessionStore::new();
        let mut session = sample_session();
        let id = session.id.clone();
        store.insert(session.clone()).await.unwrap();
        session.state = InterviewState::Ready;
        store.update(&session).await.unwrap();
        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.state, InterviewState::Ready);
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let store = InMemorySessionStore::new();
        let session = sample_session();
        let id = session.id.clone();
        store.insert(session).await.unwrap();
        assert!(store.remove(&id).await.unwrap());
        assert!(!store.remove(&id).await.unwrap());
    }
}
