//! Gamification service.
//!
//! Composes scoring, leveling, achievements, progress and ranking over a
//! [`Store`]. Each public mutation runs as one sequential chain of store calls
//! guarded by a process-wide lock, and every write lands before the
//! resulting events are returned.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::achievements::{
    achievement_progress, pending_unlocks, rarity_summary, EvaluationContext, RarityTally,
};
use super::catalog::{default_achievements, default_courses};
use super::events::{EventEmitter, GameEvent, XpReason};
use super::leaderboard::{rank_entries, rank_from_count, Leaderboard, LeaderboardEntry};
use super::leveling::{apply_xp, lesson_xp, level_progress, LevelProgress, XpAward};
use super::progress::{ProgressError, ProgressTracker};
use super::types::{
    Achievement, Course, EarnedAchievement, ProgressMarker, UserAchievement, UserProgress,
    UserStats,
};
use crate::storage::{from_record, to_record, Filter, Order, Record, Store, StoreError, Table};
use crate::tutor::types::ChatSession;

/// Entries returned by the leaderboard when no limit is given.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// A finished lesson as reported by the lesson player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonOutcome {
    pub user_id: String,
    pub course_id: String,
    pub lesson_id: u32,
    /// 0..=100
    pub score: u32,
    /// Seconds
    pub time_spent: u64,
}

/// Result of completing a lesson.
#[derive(Debug, Clone, Serialize)]
pub struct LessonCompletion {
    pub progress: UserProgress,
    /// False when the lesson had been completed before
    pub newly_completed: bool,
    pub events: Vec<GameEvent>,
}

/// XP granted outside of a lesson.
#[derive(Debug, Clone, Serialize)]
pub struct XpGrant {
    pub award: XpAward,
    pub events: Vec<GameEvent>,
}

/// Achievements unlocked by one evaluation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Unlocks {
    pub achievements: Vec<Achievement>,
    pub events: Vec<GameEvent>,
}

/// Catalog entries written by a seed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSeed {
    pub courses: usize,
    pub achievements: usize,
}

/// Catalog achievement with the user's standing towards it.
#[derive(Debug, Clone, Serialize)]
pub struct AchievementStatus {
    pub achievement: Achievement,
    pub earned: bool,
    /// 0..=100; 100 once earned
    pub progress: f64,
}

/// Everything the achievements view shows.
#[derive(Debug, Clone, Serialize)]
pub struct AchievementOverview {
    pub achievements: Vec<AchievementStatus>,
    pub by_rarity: Vec<RarityTally>,
}

/// Everything the dashboard view shows.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub stats: UserStats,
    pub level: LevelProgress,
    pub progress: Vec<UserProgress>,
    pub recent_achievements: Vec<EarnedAchievement>,
}

/// Gamification service.
pub struct GamificationService {
    store: Arc<dyn Store>,
    leaderboard_limit: usize,
    write_lock: Mutex<()>,
}

impl GamificationService {
    /// Create a new gamification service.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            write_lock: Mutex::new(()),
        }
    }

    /// Use a different default leaderboard size.
    pub fn with_leaderboard_limit(mut self, limit: usize) -> Self {
        if limit > 0 {
            self.leaderboard_limit = limit;
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert built-in catalog entries that are not yet present.
    pub fn seed_catalog(&self) -> Result<CatalogSeed, GamificationError> {
        let _guard = self.lock();
        let mut seeded = CatalogSeed::default();

        for course in default_courses() {
            let filter = Filter::all().eq("id", course.id.as_str());
            if self.store.get_row(Table::Courses, &filter)?.is_none() {
                self.store.insert_row(Table::Courses, to_record(&course)?)?;
                seeded.courses += 1;
            }
        }

        for achievement in default_achievements() {
            let filter = Filter::all().eq("id", achievement.id.as_str());
            if self.store.get_row(Table::Achievements, &filter)?.is_none() {
                self.store
                    .insert_row(Table::Achievements, to_record(&achievement)?)?;
                seeded.achievements += 1;
            }
        }

        if seeded != CatalogSeed::default() {
            tracing::info!(
                "Seeded {} courses and {} achievements",
                seeded.courses,
                seeded.achievements
            );
        }

        Ok(seeded)
    }

    // Courses

    /// All courses, easiest first.
    pub fn get_courses(&self) -> Result<Vec<Course>, GamificationError> {
        self.courses_matching(&Filter::all())
    }

    pub fn get_course(&self, course_id: &str) -> Result<Option<Course>, GamificationError> {
        let filter = Filter::all().eq("id", course_id);
        match self.store.get_row(Table::Courses, &filter)? {
            Some(record) => Ok(Some(from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Courses in a category, easiest first.
    pub fn get_courses_by_category(&self, category: &str) -> Result<Vec<Course>, GamificationError> {
        self.courses_matching(&Filter::all().eq("category", category))
    }

    fn courses_matching(&self, filter: &Filter) -> Result<Vec<Course>, GamificationError> {
        let mut courses: Vec<Course> = decode_all(self.store.query(
            Table::Courses,
            filter,
            &[Order::asc("id")],
            None,
        )?)?;
        courses.sort_by_key(|c| c.difficulty);
        Ok(courses)
    }

    fn require_course(&self, course_id: &str) -> Result<Course, GamificationError> {
        self.get_course(course_id)?
            .ok_or_else(|| GamificationError::CourseNotFound(course_id.to_string()))
    }

    // Progress

    /// All of a user's course progress, most recently active first.
    pub fn get_user_progress(&self, user_id: &str) -> Result<Vec<UserProgress>, GamificationError> {
        let mut progress: Vec<UserProgress> = decode_all(self.store.query(
            Table::UserProgress,
            &Filter::all().eq("user_id", user_id),
            &[],
            None,
        )?)?;
        progress.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        Ok(progress)
    }

    pub fn get_course_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<UserProgress>, GamificationError> {
        let filter = progress_filter(user_id, course_id);
        match self.store.get_row(Table::UserProgress, &filter)? {
            Some(record) => Ok(Some(from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Start a course, or return the existing progress if already started.
    pub fn start_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<UserProgress, GamificationError> {
        let _guard = self.lock();
        let course = self.require_course(course_id)?;

        if let Some(existing) = self.get_course_progress(user_id, course_id)? {
            return Ok(existing);
        }

        let progress = ProgressTracker::new(&course).start(user_id, Utc::now());
        let stored = self
            .store
            .insert_row(Table::UserProgress, to_record(&progress)?)?;

        tracing::info!("User {} started course {}", user_id, course_id);
        Ok(from_record(stored)?)
    }

    /// Record a finished lesson and apply every consequence.
    ///
    /// Events are ordered as the mutations happened: lesson XP, course bonus
    /// and completion, then each unlocked achievement with its XP. Level-ups
    /// follow the award that caused them.
    ///
    /// Stats (XP, bonus, counters) are written before the progress row. If the
    /// progress write fails the earned XP is kept and the lesson can be
    /// reported again.
    pub fn complete_lesson(
        &self,
        outcome: &LessonOutcome,
    ) -> Result<LessonCompletion, GamificationError> {
        if outcome.score > 100 {
            return Err(GamificationError::InvalidState(format!(
                "lesson score {} is above 100",
                outcome.score
            )));
        }

        let _guard = self.lock();
        let now = Utc::now();

        let mut progress = self
            .get_course_progress(&outcome.user_id, &outcome.course_id)?
            .ok_or_else(|| GamificationError::CourseNotStarted {
                user_id: outcome.user_id.clone(),
                course_id: outcome.course_id.clone(),
            })?;
        let course = self.require_course(&outcome.course_id)?;

        let recorded = ProgressTracker::new(&course).record_lesson(
            &mut progress,
            outcome.lesson_id,
            outcome.score,
            outcome.time_spent,
            now,
        )?;

        let mut stats = self.load_stats(&outcome.user_id)?;
        stats.record_session(outcome.score);
        stats.record_activity_on(now.date_naive());
        progress.streak_days = stats.current_streak;

        let mut emitter = EventEmitter::new();
        let award = apply_xp(&mut stats, lesson_xp(outcome.score, course.difficulty));
        emitter.award(&award, XpReason::LessonCompletion);

        if recorded.course_completed {
            stats.courses_completed += 1;
            let bonus = apply_xp(&mut stats, course.rewards.xp);
            emitter.xp_gained(&bonus, XpReason::CourseCompletion);
            emitter.course_completed(&course);
            emitter.level_up(&bonus);
            tracing::info!("User {} completed course {}", outcome.user_id, course.id);
        }

        // A progress row marked completed always has its bonus in the stats.
        self.save_stats(&mut stats, now)?;
        let progress: UserProgress = from_record(self.store.update_row(
            Table::UserProgress,
            &Filter::all().eq("id", progress.id.to_string()),
            to_record(&progress)?,
        )?)?;

        if !recorded.newly_completed {
            tracing::debug!(
                "User {} replayed lesson {} of {}",
                outcome.user_id,
                outcome.lesson_id,
                course.id
            );
        }

        let context =
            EvaluationContext::lesson(outcome.score, recorded.course_completed, outcome.time_spent);
        self.unlock_achievements(&mut stats, &context, &mut emitter, now)?;
        self.update_ranking_locked(&outcome.user_id)?;

        Ok(LessonCompletion {
            progress,
            newly_completed: recorded.newly_completed,
            events: emitter.finish(),
        })
    }

    // Achievements

    /// Achievement catalog, from common to legendary.
    pub fn get_achievements(&self) -> Result<Vec<Achievement>, GamificationError> {
        let mut achievements: Vec<Achievement> = decode_all(self.store.query(
            Table::Achievements,
            &Filter::all(),
            &[Order::asc("id")],
            None,
        )?)?;
        achievements.sort_by_key(|a| a.rarity);
        Ok(achievements)
    }

    /// A user's earned achievements, newest first.
    pub fn get_user_achievements(
        &self,
        user_id: &str,
    ) -> Result<Vec<EarnedAchievement>, GamificationError> {
        let records: Vec<UserAchievement> = decode_all(self.store.query(
            Table::UserAchievements,
            &Filter::all().eq("user_id", user_id),
            &[],
            None,
        )?)?;
        let catalog = self.get_achievements()?;

        let mut earned: Vec<EarnedAchievement> = records
            .into_iter()
            .map(|record| EarnedAchievement {
                achievement: catalog
                    .iter()
                    .find(|a| a.id == record.achievement_id)
                    .cloned(),
                record,
            })
            .collect();
        earned.sort_by(|a, b| b.record.earned_at.cmp(&a.record.earned_at));
        Ok(earned)
    }

    /// Evaluate the catalog for a user and unlock whatever is newly satisfied.
    pub fn check_achievements(
        &self,
        user_id: &str,
        context: &EvaluationContext,
    ) -> Result<Unlocks, GamificationError> {
        let _guard = self.lock();
        let now = Utc::now();
        let mut stats = self.load_stats(user_id)?;
        let mut emitter = EventEmitter::new();

        let achievements = self.unlock_achievements(&mut stats, context, &mut emitter, now)?;
        if !achievements.is_empty() {
            self.update_ranking_locked(user_id)?;
        }

        Ok(Unlocks {
            achievements,
            events: emitter.finish(),
        })
    }

    fn earned_ids(&self, user_id: &str) -> Result<HashSet<String>, GamificationError> {
        let records: Vec<UserAchievement> = decode_all(self.store.query(
            Table::UserAchievements,
            &Filter::all().eq("user_id", user_id),
            &[],
            None,
        )?)?;
        Ok(records.into_iter().map(|r| r.achievement_id).collect())
    }

    /// Unlock satisfied achievements. Caller holds the write lock.
    fn unlock_achievements(
        &self,
        stats: &mut UserStats,
        context: &EvaluationContext,
        emitter: &mut EventEmitter,
        now: DateTime<Utc>,
    ) -> Result<Vec<Achievement>, GamificationError> {
        let catalog = self.get_achievements()?;
        let earned = self.earned_ids(&stats.user_id)?;
        let pending: Vec<Achievement> = pending_unlocks(&catalog, &earned, stats, context)
            .into_iter()
            .cloned()
            .collect();

        let mut unlocked = Vec::with_capacity(pending.len());
        for achievement in pending {
            let record = UserAchievement {
                id: Uuid::new_v4(),
                user_id: stats.user_id.clone(),
                achievement_id: achievement.id.clone(),
                earned_at: now,
                progress: ProgressMarker::complete(),
            };

            match self
                .store
                .insert_row(Table::UserAchievements, to_record(&record)?)
            {
                Ok(_) => {}
                Err(StoreError::ConstraintViolation(_)) => {
                    // Earned through another handle since the read above.
                    tracing::debug!(
                        "Achievement {} already held by {}",
                        achievement.id,
                        stats.user_id
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            stats.achievements_earned += 1;
            let award = apply_xp(stats, achievement.reward_xp);
            self.save_stats(stats, now)?;

            emitter.achievement_unlocked(&achievement);
            emitter.award(&award, XpReason::Achievement);
            tracing::info!(
                "User {} unlocked achievement {}",
                stats.user_id,
                achievement.id
            );
            unlocked.push(achievement);
        }

        Ok(unlocked)
    }

    /// Standing towards every catalog achievement.
    pub fn achievement_overview(
        &self,
        user_id: &str,
    ) -> Result<AchievementOverview, GamificationError> {
        let catalog = self.get_achievements()?;
        let earned = self.earned_ids(user_id)?;
        let stats = self.get_user_stats(user_id)?;

        let achievements = catalog
            .iter()
            .map(|achievement| {
                let is_earned = earned.contains(&achievement.id);
                AchievementStatus {
                    progress: if is_earned {
                        100.0
                    } else {
                        achievement_progress(&stats, achievement)
                    },
                    earned: is_earned,
                    achievement: achievement.clone(),
                }
            })
            .collect();

        Ok(AchievementOverview {
            achievements,
            by_rarity: rarity_summary(&catalog, &earned),
        })
    }

    // Stats and XP

    /// Stats for a user, created on first access.
    pub fn get_user_stats(&self, user_id: &str) -> Result<UserStats, GamificationError> {
        let _guard = self.lock();
        self.load_stats(user_id)
    }

    /// Load stats, creating them if missing. Caller holds the write lock.
    fn load_stats(&self, user_id: &str) -> Result<UserStats, GamificationError> {
        let filter = Filter::all().eq("user_id", user_id);
        if let Some(record) = self.store.get_row(Table::UserStats, &filter)? {
            return Ok(from_record(record)?);
        }

        let stats = UserStats::new(user_id);
        let stored = self.store.insert_row(Table::UserStats, to_record(&stats)?)?;
        tracing::debug!("Created stats for user {}", user_id);
        Ok(from_record(stored)?)
    }

    fn save_stats(&self, stats: &mut UserStats, now: DateTime<Utc>) -> Result<(), GamificationError> {
        stats.updated_at = now;
        self.store.update_row(
            Table::UserStats,
            &Filter::all().eq("user_id", stats.user_id.as_str()),
            to_record(stats)?,
        )?;
        Ok(())
    }

    /// Grant XP outside of a lesson.
    pub fn award_xp(&self, user_id: &str, amount: u64) -> Result<XpGrant, GamificationError> {
        let _guard = self.lock();
        let mut stats = self.load_stats(user_id)?;
        let award = apply_xp(&mut stats, amount);
        self.save_stats(&mut stats, Utc::now())?;

        if award.level_up() {
            tracing::info!("User {} reached level {}", user_id, award.new_level);
        }

        let mut emitter = EventEmitter::new();
        emitter.award(&award, XpReason::Manual);
        Ok(XpGrant {
            award,
            events: emitter.finish(),
        })
    }

    /// Count chat messages and evaluate chat-driven achievements.
    pub fn record_chat_activity(
        &self,
        session: &ChatSession,
        new_messages: u32,
    ) -> Result<Unlocks, GamificationError> {
        let _guard = self.lock();
        let now = Utc::now();

        let mut stats = self.load_stats(&session.user_id)?;
        stats.total_messages = stats.total_messages.saturating_add(new_messages);
        self.save_stats(&mut stats, now)?;

        let counts = session.counts();
        let context =
            EvaluationContext::chat(session.messages.len() as u32, counts.socratic_messages);
        let mut emitter = EventEmitter::new();
        let achievements = self.unlock_achievements(&mut stats, &context, &mut emitter, now)?;
        if !achievements.is_empty() {
            self.update_ranking_locked(&session.user_id)?;
        }

        Ok(Unlocks {
            achievements,
            events: emitter.finish(),
        })
    }

    // Ranking

    /// Top users by XP.
    pub fn get_leaderboard(
        &self,
        limit: Option<usize>,
        current_user: Option<&str>,
    ) -> Result<Leaderboard, GamificationError> {
        let limit = limit.filter(|l| *l > 0).unwrap_or(self.leaderboard_limit);

        let mut entries = rank_entries(self.top_candidates(limit)?, current_user);
        entries.truncate(limit);
        let total_users = self.store.count(Table::UserStats, &Filter::all())?;

        let current_user = match current_user {
            Some(user_id) => match entries.iter().find(|e| e.user_id == user_id) {
                Some(entry) => Some(entry.clone()),
                None => self.standing_of(user_id)?,
            },
            None => None,
        };

        Ok(Leaderboard {
            entries,
            total_users,
            current_user,
        })
    }

    /// Every user who can appear in the top `limit`.
    ///
    /// The store only cuts on XP; everyone tied at the cutoff is fetched so the
    /// tie-break on `created_at` runs on parsed timestamps in [`rank_entries`].
    fn top_candidates(&self, limit: usize) -> Result<Vec<UserStats>, GamificationError> {
        let mut top: Vec<UserStats> = decode_all(self.store.query(
            Table::UserStats,
            &Filter::all(),
            &[Order::desc("total_xp")],
            Some(limit),
        )?)?;

        let Some(cutoff) = top.last().map(|s| s.total_xp) else {
            return Ok(top);
        };
        if top.len() < limit {
            return Ok(top);
        }

        top.retain(|s| s.total_xp > cutoff);
        let tied: Vec<UserStats> = decode_all(self.store.query(
            Table::UserStats,
            &Filter::all().eq("total_xp", cutoff),
            &[],
            None,
        )?)?;
        top.extend(tied);
        Ok(top)
    }

    /// Entry for a user outside the top of the board.
    fn standing_of(
        &self,
        user_id: &str,
    ) -> Result<Option<LeaderboardEntry>, GamificationError> {
        let filter = Filter::all().eq("user_id", user_id);
        let Some(record) = self.store.get_row(Table::UserStats, &filter)? else {
            return Ok(None);
        };
        let stats: UserStats = from_record(record)?;
        let ahead = self
            .store
            .count(Table::UserStats, &Filter::all().gt("total_xp", stats.total_xp))?;

        let entry = rank_entries(vec![stats], Some(user_id))
            .into_iter()
            .next()
            .map(|mut entry| {
                entry.rank = rank_from_count(ahead);
                entry
            });
        Ok(entry)
    }

    /// Recompute and store one user's rank. `None` if the user has no stats.
    pub fn update_user_ranking(&self, user_id: &str) -> Result<Option<u32>, GamificationError> {
        let _guard = self.lock();
        self.update_ranking_locked(user_id)
    }

    fn update_ranking_locked(&self, user_id: &str) -> Result<Option<u32>, GamificationError> {
        let filter = Filter::all().eq("user_id", user_id);
        let Some(record) = self.store.get_row(Table::UserStats, &filter)? else {
            return Ok(None);
        };
        let stats: UserStats = from_record(record)?;

        let ahead = self
            .store
            .count(Table::UserStats, &Filter::all().gt("total_xp", stats.total_xp))?;
        let rank = rank_from_count(ahead);

        let mut partial = Record::new();
        partial.insert("rank_position".to_string(), rank.into());
        self.store.update_row(Table::UserStats, &filter, partial)?;

        Ok(Some(rank))
    }

    /// Recompute every user's rank. Returns how many rows were updated.
    pub fn recompute_all_ranks(&self) -> Result<usize, GamificationError> {
        let _guard = self.lock();
        let all: Vec<UserStats> = decode_all(self.store.query(
            Table::UserStats,
            &Filter::all(),
            &[],
            None,
        )?)?;

        let entries = rank_entries(all, None);
        for entry in &entries {
            let mut partial = Record::new();
            partial.insert("rank_position".to_string(), entry.rank.into());
            self.store.update_row(
                Table::UserStats,
                &Filter::all().eq("user_id", entry.user_id.as_str()),
                partial,
            )?;
        }

        tracing::info!("Recomputed ranks for {} users", entries.len());
        Ok(entries.len())
    }

    // Views

    /// Stats, level, progress and recent achievements for one user.
    ///
    /// A failure to load achievements leaves that list empty.
    pub fn dashboard(&self, user_id: &str) -> Result<Dashboard, GamificationError> {
        let stats = self.get_user_stats(user_id)?;
        let progress = self.get_user_progress(user_id)?;

        let recent_achievements = match self.get_user_achievements(user_id) {
            Ok(earned) => earned,
            Err(e) => {
                tracing::warn!("Failed to load achievements for {}: {}", user_id, e);
                Vec::new()
            }
        };

        Ok(Dashboard {
            level: level_progress(stats.total_xp),
            stats,
            progress,
            recent_achievements,
        })
    }
}

fn progress_filter(user_id: &str, course_id: &str) -> Filter {
    Filter::all()
        .eq("user_id", user_id)
        .eq("course_id", course_id)
}

fn decode_all<T: serde::de::DeserializeOwned>(records: Vec<Record>) -> Result<Vec<T>, StoreError> {
    records.into_iter().map(from_record).collect()
}

/// Gamification errors.
#[derive(Debug, Error)]
pub enum GamificationError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Course not found: {0}")]
    CourseNotFound(String),

    #[error("Course {course_id} not started by {user_id}")]
    CourseNotStarted { user_id: String, course_id: String },

    #[error("Invalid lesson: {0}")]
    InvalidLesson(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<ProgressError> for GamificationError {
    fn from(e: ProgressError) -> Self {
        match e {
            ProgressError::InvalidLesson { .. } => GamificationError::InvalidLesson(e.to_string()),
            ProgressError::CourseMismatch { .. } => GamificationError::InvalidState(e.to_string()),
        }
    }
}
