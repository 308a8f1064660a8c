//! Conversation types shared by the tutor client and session store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

/// Conversational mode that produced an assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agent {
    /// Asks guiding questions
    Socratic,
    /// Keeps the learner engaged
    Conversationalist,
    /// Gives direct explanations
    Explainer,
}

impl Agent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Agent::Socratic => "socratic",
            Agent::Conversationalist => "conversationalist",
            Agent::Explainer => "explainer",
        }
    }
}

impl std::fmt::Display for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub agent: Option<Agent>,
}

impl Message {
    /// Create a message with a fresh id.
    pub fn new(role: Role, content: impl Into<String>, agent: Option<Agent>) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4().simple()),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            agent,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, None)
    }

    pub fn assistant(content: impl Into<String>, agent: Agent) -> Self {
        Self::new(Role::Assistant, content, Some(agent))
    }
}

/// Counters the tutor endpoint carries from turn to turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorState {
    pub attempt_number: u32,
    pub hint_level: u32,
    pub misconception: String,
}

impl Default for TutorState {
    fn default() -> Self {
        Self {
            attempt_number: 0,
            hint_level: 0,
            misconception: "none".to_string(),
        }
    }
}

/// Message counts used by the learning score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteractionCounts {
    pub user_messages: u32,
    pub assistant_messages: u32,
    pub socratic_messages: u32,
}

impl InteractionCounts {
    /// Count user, assistant and socratic-tagged messages.
    pub fn from_messages(messages: &[Message]) -> Self {
        let mut counts = Self::default();
        for message in messages {
            match message.role {
                Role::User => counts.user_messages += 1,
                Role::Assistant => {
                    counts.assistant_messages += 1;
                    if message.agent == Some(Agent::Socratic) {
                        counts.socratic_messages += 1;
                    }
                }
                Role::System => {}
            }
        }
        counts
    }
}

/// One learning conversation, owned by the user who created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: String,
    pub topic: String,
    pub messages: Vec<Message>,
    pub state: TutorState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Start an empty session on a topic.
    pub fn new(user_id: impl Into<String>, topic: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            topic: topic.into(),
            messages: Vec::new(),
            state: TutorState::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message and touch the session.
    pub fn push(&mut self, message: Message) -> &Message {
        self.updated_at = message.timestamp.max(self.updated_at);
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn counts(&self) -> InteractionCounts {
        InteractionCounts::from_messages(&self.messages)
    }
}

/// Message as sent to the tutor endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Request body of the tutor endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorRequest {
    pub messages: Vec<WireMessage>,
    pub topic: String,
    pub state: TutorState,
    pub model: String,
}

/// Response body of the tutor endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorResponse {
    pub active_agent: Agent,
    #[serde(rename = "combinedMessage")]
    pub combined_message: String,
    pub next_state: TutorState,
}
