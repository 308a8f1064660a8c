//! Gamification module.
//!
//! Turns tutoring activity into progression:
//! - Learning, quick and lesson scores
//! - XP and levels
//! - Achievement unlocks
//! - Per-course progress and the leaderboard

pub mod achievements;
pub mod catalog;
pub mod events;
pub mod leaderboard;
pub mod leveling;
pub mod progress;
pub mod scoring;
pub mod service;
pub mod types;

// Re-exports for convenience
pub use achievements::EvaluationContext;
pub use events::{GameEvent, GameEventKind, XpReason};
pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use leveling::{level_for_xp, level_progress, LevelProgress, XpAward};
pub use progress::ProgressTracker;
pub use scoring::{learning_score, lesson_score, quick_score, ScoreBreakdown, ScoreLevel};
pub use service::{
    GamificationError, GamificationService, LessonCompletion, LessonOutcome, XpGrant,
};
pub use types::{
    Achievement, AchievementType, Course, Difficulty, ProgressStatus, Rarity, UserProgress,
    UserStats,
};
