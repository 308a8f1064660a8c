//! Per-lesson tutoring session.
//!
//! Counts questions and hints while a learner works through one lesson and
//! turns them into a lesson score and a [`LessonOutcome`] once the lesson is
//! complete. Nothing here is persisted.

use chrono::{DateTime, Utc};

use super::types::{Message, Role, TutorResponse, TutorState};
use crate::gamification::scoring::lesson_score;
use crate::gamification::service::LessonOutcome;

/// User messages needed before a lesson counts as complete.
pub const MIN_QUESTIONS_FOR_COMPLETION: u32 = 3;

/// Transient state of one lesson being played.
#[derive(Debug, Clone)]
pub struct LessonSession {
    pub user_id: String,
    pub course_id: String,
    pub lesson_id: u32,
    pub started_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub state: TutorState,
    pub questions_asked: u32,
    pub hints_used: u32,
    pub completed: bool,
}

impl LessonSession {
    pub fn new(user_id: &str, course_id: &str, lesson_id: u32) -> Self {
        Self::started_at(user_id, course_id, lesson_id, Utc::now())
    }

    pub fn started_at(
        user_id: &str,
        course_id: &str,
        lesson_id: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            lesson_id,
            started_at,
            messages: Vec::new(),
            state: TutorState::default(),
            questions_asked: 0,
            hints_used: 0,
            completed: false,
        }
    }

    /// Record a question from the learner.
    pub fn record_question(&mut self, content: &str) -> &Message {
        self.questions_asked += 1;
        self.messages.push(Message::user(content));
        &self.messages[self.messages.len() - 1]
    }

    /// Record the tutor's reply. Returns true if the reply used a hint.
    pub fn record_reply(&mut self, response: TutorResponse) -> bool {
        let hint_used = response.next_state.hint_level > self.state.hint_level;
        if hint_used {
            self.hints_used += 1;
        }
        self.messages.push(Message::assistant(
            response.combined_message,
            response.active_agent,
        ));
        self.state = response.next_state;
        hint_used
    }

    pub fn user_messages(&self) -> u32 {
        self.messages.iter().filter(|m| m.role == Role::User).count() as u32
    }

    /// Whether enough engagement has happened to complete the lesson.
    pub fn ready_to_complete(&self) -> bool {
        !self.completed && self.user_messages() >= MIN_QUESTIONS_FOR_COMPLETION
    }

    /// Current lesson score.
    pub fn score(&self) -> u32 {
        lesson_score(self.questions_asked, self.hints_used, self.state.attempt_number)
    }

    /// Mark the lesson complete and produce the outcome to report.
    ///
    /// Returns `None` if the lesson was already completed.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Option<LessonOutcome> {
        if self.completed {
            return None;
        }
        self.completed = true;

        let time_spent = (now - self.started_at).num_seconds().max(0) as u64;
        Some(LessonOutcome {
            user_id: self.user_id.clone(),
            course_id: self.course_id.clone(),
            lesson_id: self.lesson_id,
            score: self.score(),
            time_spent,
        })
    }
}
