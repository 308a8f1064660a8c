//! Achievement evaluation.
//!
//! Decides which catalog achievements a user has just satisfied, given their
//! freshest stats and the context of the event that triggered the check.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::types::{Achievement, AchievementCriteria, AchievementType, Rarity, UserStats};

/// Transient facts about the event that triggered an evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Score of the session or lesson just finished
    pub score: Option<u32>,
    pub lesson_completed: bool,
    pub course_completed: bool,
    /// Seconds
    pub time_spent: u64,
    pub messages_in_session: Option<u32>,
    pub socratic_interactions: Option<u32>,
}

impl EvaluationContext {
    /// Context for a finished lesson.
    pub fn lesson(score: u32, course_completed: bool, time_spent: u64) -> Self {
        Self {
            score: Some(score),
            lesson_completed: true,
            course_completed,
            time_spent,
            ..Self::default()
        }
    }

    /// Context for chat activity.
    pub fn chat(messages_in_session: u32, socratic_interactions: u32) -> Self {
        Self {
            messages_in_session: Some(messages_in_session),
            socratic_interactions: Some(socratic_interactions),
            ..Self::default()
        }
    }
}

/// A threshold that is absent or zero is treated as unset.
fn threshold(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v > 0)
}

fn reaches(actual: Option<u32>, target: u32) -> bool {
    actual.map_or(false, |a| a >= target)
}

/// Check whether an achievement's predicate holds.
pub fn is_satisfied(
    achievement: &Achievement,
    stats: &UserStats,
    context: &EvaluationContext,
) -> bool {
    let criteria = &achievement.criteria;

    match achievement.kind {
        AchievementType::Score => match criteria.min_score {
            Some(min) => reaches(context.score, min),
            None => false,
        },
        AchievementType::Completion => match threshold(criteria.courses_completed) {
            Some(target) => stats.courses_completed >= target,
            None => context.course_completed,
        },
        AchievementType::Engagement => {
            if let Some(target) = threshold(criteria.sessions_completed) {
                stats.total_sessions >= target
            } else if let Some(target) = threshold(criteria.messages_in_session) {
                reaches(context.messages_in_session, target)
            } else {
                false
            }
        }
        AchievementType::Streak => match criteria.streak_days {
            Some(days) => stats.current_streak >= days,
            None => false,
        },
        AchievementType::Mastery => match threshold(criteria.socratic_interactions) {
            Some(target) => reaches(context.socratic_interactions, target),
            None => false,
        },
    }
}

/// Achievements to unlock now, in catalog order.
///
/// Anything already in `earned` is skipped, so re-evaluating the same context
/// never yields a second unlock.
pub fn pending_unlocks<'a>(
    catalog: &'a [Achievement],
    earned: &HashSet<String>,
    stats: &UserStats,
    context: &EvaluationContext,
) -> Vec<&'a Achievement> {
    catalog
        .iter()
        .filter(|a| !earned.contains(&a.id))
        .filter(|a| is_satisfied(a, stats, context))
        .collect()
}

fn ratio_percent(actual: f64, target: Option<u32>) -> f64 {
    match threshold(target) {
        Some(target) => (actual / f64::from(target) * 100.0).min(100.0),
        None => 0.0,
    }
}

/// How far a user is towards an achievement, 0..=100.
///
/// Only stat-driven families report progress; event-driven ones stay at 0.
pub fn achievement_progress(stats: &UserStats, achievement: &Achievement) -> f64 {
    let AchievementCriteria {
        min_score,
        streak_days,
        courses_completed,
        sessions_completed,
        ..
    } = &achievement.criteria;

    match achievement.kind {
        AchievementType::Score => ratio_percent(stats.average_score, *min_score),
        AchievementType::Completion => {
            ratio_percent(f64::from(stats.courses_completed), *courses_completed)
        }
        AchievementType::Streak => ratio_percent(f64::from(stats.best_streak), *streak_days),
        AchievementType::Engagement => {
            ratio_percent(f64::from(stats.total_sessions), *sessions_completed)
        }
        AchievementType::Mastery => 0.0,
    }
}

/// Earned versus available achievements of one rarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RarityTally {
    pub rarity: Rarity,
    pub earned: usize,
    pub total: usize,
}

/// Per-rarity tallies, from common to legendary.
pub fn rarity_summary(catalog: &[Achievement], earned: &HashSet<String>) -> Vec<RarityTally> {
    Rarity::ALL
        .iter()
        .map(|&rarity| {
            let of_rarity = catalog.iter().filter(|a| a.rarity == rarity);
            let (total, earned) = of_rarity.fold((0, 0), |(total, count), a| {
                (total + 1, count + usize::from(earned.contains(&a.id)))
            });
            RarityTally {
                rarity,
                earned,
                total,
            }
        })
        .collect()
}
