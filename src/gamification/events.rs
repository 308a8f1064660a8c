//! Game events returned to the presentation layer.
//!
//! Events describe mutations that have already been persisted. Nothing in the
//! engine reads them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::leveling::XpAward;
use super::types::{Achievement, Course};

/// Why XP was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpReason {
    LessonCompletion,
    CourseCompletion,
    Achievement,
    Manual,
}

/// Event payloads, tagged the way the UI expects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GameEventKind {
    XpGained {
        amount: u64,
        reason: XpReason,
    },
    LevelUp {
        previous_level: u32,
        new_level: u32,
    },
    CourseCompleted {
        course_id: String,
        course_name: String,
        bonus_xp: u64,
    },
    AchievementUnlocked(Achievement),
}

/// A timestamped game event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(flatten)]
    pub kind: GameEventKind,
    pub timestamp: DateTime<Utc>,
}

impl GameEvent {
    pub fn new(kind: GameEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Wire name of the event type.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            GameEventKind::XpGained { .. } => "xp_gained",
            GameEventKind::LevelUp { .. } => "level_up",
            GameEventKind::CourseCompleted { .. } => "course_completed",
            GameEventKind::AchievementUnlocked(_) => "achievement_unlocked",
        }
    }
}

/// Collects events in the order their mutations happened.
#[derive(Debug, Default)]
pub struct EventEmitter {
    events: Vec<GameEvent>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: GameEventKind) {
        self.events.push(GameEvent::new(kind));
    }

    /// Record an XP grant. Zero-XP awards are not reported.
    pub fn xp_gained(&mut self, award: &XpAward, reason: XpReason) {
        if award.amount > 0 {
            self.push(GameEventKind::XpGained {
                amount: award.amount,
                reason,
            });
        }
    }

    /// Record a level-up if the award caused one.
    pub fn level_up(&mut self, award: &XpAward) {
        if award.level_up() {
            self.push(GameEventKind::LevelUp {
                previous_level: award.previous_level,
                new_level: award.new_level,
            });
        }
    }

    /// Record an XP grant followed by its level-up, if any.
    pub fn award(&mut self, award: &XpAward, reason: XpReason) {
        self.xp_gained(award, reason);
        self.level_up(award);
    }

    pub fn course_completed(&mut self, course: &Course) {
        self.push(GameEventKind::CourseCompleted {
            course_id: course.id.clone(),
            course_name: course.title.clone(),
            bonus_xp: course.rewards.xp,
        });
    }

    pub fn achievement_unlocked(&mut self, achievement: &Achievement) {
        self.push(GameEventKind::AchievementUnlocked(achievement.clone()));
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Hand over the collected events.
    pub fn finish(self) -> Vec<GameEvent> {
        self.events
    }
}
