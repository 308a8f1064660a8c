//! Chat session persistence and the send-and-reply exchange.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use super::client::{TutorClient, TutorError};
use super::types::{Agent, ChatSession, Message};
use super::validation::{clean_user_text, ValidationError};
use crate::storage::{from_record, to_record, Filter, Store, StoreError, Table};

/// Reply shown when the tutor endpoint cannot be reached.
pub const FALLBACK_REPLY: &str = "I apologize, but I encountered an error. Please try again.";

/// One completed turn of a conversation.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub question: Message,
    pub reply: Message,
    /// The tutor raised its hint level on this turn
    pub hint_used: bool,
}

/// Chat session store.
pub struct SessionStore {
    store: Arc<dyn Store>,
}

impl SessionStore {
    /// Create a new session store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Start and persist a new session.
    pub fn create(&self, user_id: &str, topic: &str) -> Result<ChatSession, SessionError> {
        let topic = clean_user_text(topic)?;
        let session = ChatSession::new(user_id, topic);
        self.store
            .insert_row(Table::ChatSessions, to_record(&session)?)?;

        tracing::debug!("Created chat session {} for {}", session.id, user_id);
        Ok(session)
    }

    /// A user's sessions, most recently updated first.
    pub fn load_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, SessionError> {
        let records = self.store.query(
            Table::ChatSessions,
            &Filter::all().eq("user_id", user_id),
            &[],
            None,
        )?;

        let mut sessions = records
            .into_iter()
            .map(from_record)
            .collect::<Result<Vec<ChatSession>, _>>()?;
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    /// Fetch one session. Sessions belonging to other users are not visible.
    pub fn get(&self, user_id: &str, session_id: Uuid) -> Result<Option<ChatSession>, SessionError> {
        match self.store.get_row(Table::ChatSessions, &owned(user_id, session_id))? {
            Some(record) => Ok(Some(from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Persist a session's messages and state.
    pub fn save(&self, session: &mut ChatSession) -> Result<(), SessionError> {
        session.updated_at = Utc::now().max(session.updated_at);
        self.store.update_row(
            Table::ChatSessions,
            &owned(&session.user_id, session.id),
            to_record(session)?,
        )?;
        Ok(())
    }

    /// Delete a session. Returns false if it did not exist.
    pub fn delete(&self, user_id: &str, session_id: Uuid) -> Result<bool, SessionError> {
        let removed = self
            .store
            .delete_rows(Table::ChatSessions, &owned(user_id, session_id))?;
        if removed > 0 {
            tracing::debug!("Deleted chat session {}", session_id);
        }
        Ok(removed > 0)
    }

    /// Send a user message and record the tutor's reply.
    ///
    /// If the tutor cannot be reached, a fallback reply is recorded and saved
    /// before the error is returned.
    pub async fn exchange(
        &self,
        client: &TutorClient,
        session: &mut ChatSession,
        content: &str,
    ) -> Result<Exchange, SessionError> {
        let content = clean_user_text(content)?;
        let question = session.push(Message::user(content)).clone();

        let response = match client
            .send_message(&session.messages, &session.topic, &session.state)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                session.push(Message::assistant(FALLBACK_REPLY, Agent::Explainer));
                self.save(session)?;
                return Err(e.into());
            }
        };

        let hint_used = response.next_state.hint_level > session.state.hint_level;
        let reply = session
            .push(Message::assistant(response.combined_message, response.active_agent))
            .clone();
        session.state = response.next_state;
        self.save(session)?;

        Ok(Exchange {
            question,
            reply,
            hint_used,
        })
    }
}

fn owned(user_id: &str, session_id: Uuid) -> Filter {
    Filter::all()
        .eq("id", session_id.to_string())
        .eq("user_id", user_id)
}

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Tutor error: {0}")]
    Tutor(#[from] TutorError),

    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),
}
