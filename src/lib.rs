//! Socratic Tutor - progression engine for a Socratic tutoring app
//!
//! Converts tutoring activity (messages, hints, attempts, lesson completions)
//! into scores, XP, levels, achievement unlocks, course progress and a
//! leaderboard, over a pluggable row store. Also carries the client for the
//! remote multi-agent tutor endpoint and chat session persistence.

pub mod gamification;
pub mod storage;
pub mod tutor;

// Re-export commonly used types
pub use gamification::service::GamificationService;
pub use storage::config::AppConfig;
pub use storage::store::Store;
pub use tutor::client::TutorClient;
pub use tutor::sessions::SessionStore;
