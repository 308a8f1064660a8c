//! Tutor module.
//!
//! The conversational side: chat sessions, the remote tutor endpoint and
//! lesson play.

pub mod client;
pub mod lesson;
pub mod sessions;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use client::{TutorClient, TutorError};
pub use lesson::LessonSession;
pub use sessions::{Exchange, SessionError, SessionStore};
pub use types::{Agent, ChatSession, Message, Role, TutorResponse, TutorState};
