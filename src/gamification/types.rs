//! Core types for the progression engine.
//!
//! Defines user stats, course progress, the course and achievement catalogs,
//! and earned achievements.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::leveling::level_for_xp;

/// Per-user aggregate stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: String,
    /// Always `level_for_xp(total_xp)`
    pub level: u32,
    pub total_xp: u64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub total_sessions: u32,
    pub total_messages: u32,
    pub average_score: f64,
    pub courses_completed: u32,
    pub achievements_earned: u32,
    /// 0 until the first rank recompute
    pub rank_position: u32,
    /// UTC day of the last completed lesson
    pub last_active_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserStats {
    /// Fresh stats for a user seen for the first time.
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            level: level_for_xp(0),
            total_xp: 0,
            current_streak: 0,
            best_streak: 0,
            total_sessions: 0,
            total_messages: 0,
            average_score: 0.0,
            courses_completed: 0,
            achievements_earned: 0,
            rank_position: 0,
            last_active_on: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold a finished session's score into the running average.
    pub fn record_session(&mut self, score: u32) {
        let previous = self.total_sessions as f64;
        self.total_sessions += 1;
        self.average_score =
            (self.average_score * previous + score as f64) / self.total_sessions as f64;
    }

    /// Update the daily streak for activity on `today`.
    ///
    /// Activity on consecutive days extends the streak, repeated activity on
    /// the same day keeps it, and any gap restarts it at one.
    pub fn record_activity_on(&mut self, today: NaiveDate) {
        self.current_streak = match self.last_active_on {
            Some(last) if last == today => self.current_streak.max(1),
            Some(last) if last.succ_opt() == Some(today) => self.current_streak + 1,
            _ => 1,
        };
        self.best_streak = self.best_streak.max(self.current_streak);
        self.last_active_on = Some(today);
    }
}

/// Course progress status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    /// Present in stored data; no rule currently produces it
    Mastered,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Mastered => "mastered",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(ProgressStatus::NotStarted),
            "in_progress" => Some(ProgressStatus::InProgress),
            "completed" => Some(ProgressStatus::Completed),
            "mastered" => Some(ProgressStatus::Mastered),
            _ => None,
        }
    }

    /// Whether the course has been finished.
    pub fn is_finished(&self) -> bool {
        matches!(self, ProgressStatus::Completed | ProgressStatus::Mastered)
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of one user through one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub id: Uuid,
    pub user_id: String,
    pub course_id: String,
    /// Furthest lesson index unlocked
    pub current_lesson: u32,
    pub completed_lessons: BTreeSet<u32>,
    pub total_score: u64,
    /// Derived from `completed_lessons`; only written by the progress tracker
    pub completion_percentage: u32,
    pub status: ProgressStatus,
    pub best_session_score: u32,
    /// Seconds
    pub total_time_spent: u64,
    pub streak_days: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
}

/// Course difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// Multiplier applied to lesson XP.
    pub fn xp_multiplier(&self) -> f64 {
        match self {
            Difficulty::Beginner => 1.0,
            Difficulty::Intermediate => 1.5,
            Difficulty::Advanced => 2.0,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lesson within a course. `id` equals its index in the course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseLesson {
    pub id: u32,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub objectives: Vec<String>,
}

/// Rewards granted on course completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRewards {
    pub xp: u64,
    #[serde(default)]
    pub badge: Option<String>,
}

/// Structured course from the read-only catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub lessons: Vec<CourseLesson>,
    pub rewards: CourseRewards,
    pub estimated_minutes: u32,
}

impl Course {
    pub fn lesson_count(&self) -> u32 {
        self.lessons.len() as u32
    }

    pub fn lesson(&self, index: u32) -> Option<&CourseLesson> {
        self.lessons.get(index as usize)
    }
}

/// Achievement family; selects the unlock predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementType {
    Score,
    Streak,
    Completion,
    Engagement,
    Mastery,
}

impl AchievementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementType::Score => "score",
            AchievementType::Streak => "streak",
            AchievementType::Completion => "completion",
            AchievementType::Engagement => "engagement",
            AchievementType::Mastery => "mastery",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "score" => Some(AchievementType::Score),
            "streak" => Some(AchievementType::Streak),
            "completion" => Some(AchievementType::Completion),
            "engagement" => Some(AchievementType::Engagement),
            "mastery" => Some(AchievementType::Mastery),
            _ => None,
        }
    }
}

/// Achievement rarity, ordered from most to least common.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 4] = [Rarity::Common, Rarity::Rare, Rarity::Epic, Rarity::Legendary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

/// Named unlock thresholds. Absent (or zero) thresholds are not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses_completed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions_completed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages_in_session: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socratic_interactions: Option<u32>,
}

/// Achievement catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    #[serde(rename = "type")]
    pub kind: AchievementType,
    pub criteria: AchievementCriteria,
    pub reward_xp: u64,
    pub rarity: Rarity,
}

/// Progress marker stored with an earned achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMarker {
    pub current: u32,
    pub target: u32,
}

impl ProgressMarker {
    pub fn complete() -> Self {
        Self {
            current: 1,
            target: 1,
        }
    }
}

/// An achievement earned by a user. At most one per (user, achievement).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAchievement {
    pub id: Uuid,
    pub user_id: String,
    pub achievement_id: String,
    pub earned_at: DateTime<Utc>,
    pub progress: ProgressMarker,
}

/// An earned achievement joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarnedAchievement {
    pub record: UserAchievement,
    /// `None` when the catalog entry has since been removed
    pub achievement: Option<Achievement>,
}
