//! Scoring formulas.
//!
//! Pure functions over interaction counters. The learning score breakdown and
//! the quick score are separate formulas and are not expected to agree.

use serde::{Deserialize, Serialize};

use crate::tutor::types::{ChatSession, InteractionCounts, TutorState};

/// Label attached to a learning score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoreLevel {
    Beginner,
    Developing,
    Intermediate,
    Advanced,
    Master,
}

impl ScoreLevel {
    /// Label for a total score.
    pub fn for_total(total: u32) -> Self {
        match total {
            80.. => ScoreLevel::Master,
            60..=79 => ScoreLevel::Advanced,
            40..=59 => ScoreLevel::Intermediate,
            20..=39 => ScoreLevel::Developing,
            _ => ScoreLevel::Beginner,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreLevel::Beginner => "Beginner",
            ScoreLevel::Developing => "Developing",
            ScoreLevel::Intermediate => "Intermediate",
            ScoreLevel::Advanced => "Advanced",
            ScoreLevel::Master => "Master",
        }
    }
}

impl std::fmt::Display for ScoreLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Learning score split into its three components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 0..=40
    pub engagement: u32,
    /// 0..=30
    pub progress: u32,
    /// 0..=30
    pub understanding: u32,
    pub total: u32,
    pub level: ScoreLevel,
}

fn engagement_score(user_messages: u32) -> u32 {
    user_messages.saturating_mul(4).min(40)
}

fn progress_score(state: &TutorState) -> u32 {
    let attempt_penalty = state.attempt_number.saturating_mul(2).min(20);
    let hint_penalty = state.hint_level.saturating_mul(5).min(10);
    30u32.saturating_sub(attempt_penalty + hint_penalty)
}

/// Learning score breakdown for a conversation.
pub fn learning_score(counts: InteractionCounts, state: &TutorState) -> ScoreBreakdown {
    let engagement = engagement_score(counts.user_messages);
    let progress = progress_score(state);

    // No credit for tutor questions the learner never answered.
    let understanding = if counts.user_messages > 0 {
        let ratio = f64::from(counts.socratic_messages) / f64::from(counts.assistant_messages.max(1));
        (ratio * 30.0).round() as u32
    } else {
        0
    };

    let total = engagement + progress + understanding;
    ScoreBreakdown {
        engagement,
        progress,
        understanding,
        total,
        level: ScoreLevel::for_total(total),
    }
}

/// Learning score breakdown computed from a stored session.
pub fn session_score(session: &ChatSession) -> ScoreBreakdown {
    learning_score(session.counts(), &session.state)
}

/// Compact score shown next to a session title.
///
/// Uses a flat 15 in place of the understanding component.
pub fn quick_score(user_messages: u32, state: &TutorState) -> u32 {
    (engagement_score(user_messages) + progress_score(state) + 15).min(100)
}

/// Score for a completed lesson, always within 10..=100.
pub fn lesson_score(questions_asked: u32, hints_used: u32, attempt_number: u32) -> u32 {
    let message_penalty = i64::from(questions_asked.saturating_sub(5)) * 2;
    let hint_penalty = i64::from(hints_used) * 10;
    let attempt_penalty = i64::from(attempt_number) * 5;
    (100 - message_penalty - hint_penalty - attempt_penalty).clamp(10, 100) as u32
}
