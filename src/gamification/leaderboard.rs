//! Leaderboard ranking.
//!
//! Users are ordered by total XP, highest first. Equal XP is broken by the
//! earlier `created_at`, then by user id. Ranks are competition ranks: a user's
//! rank is one more than the number of users with strictly more XP, so equal
//! XP shares a rank.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::types::UserStats;

/// Leaderboard entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub level: u32,
    pub total_xp: u64,
    pub current_streak: u32,
    pub courses_completed: u32,
    pub achievements_earned: u32,
    pub is_current_user: bool,
}

/// Top of the leaderboard plus the viewing user's own standing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
    pub total_users: u64,
    pub current_user: Option<LeaderboardEntry>,
}

/// Display order between two users.
pub fn compare_standing(a: &UserStats, b: &UserStats) -> Ordering {
    b.total_xp
        .cmp(&a.total_xp)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.user_id.cmp(&b.user_id))
}

/// Rank for `total_xp` given how many users have strictly more.
pub fn rank_from_count(users_ahead: u64) -> u32 {
    (users_ahead + 1).min(u64::from(u32::MAX)) as u32
}

/// Sort users into display order and assign competition ranks.
///
/// The slice must contain every user with more XP than the last one kept,
/// which holds for any prefix of the full ordering.
pub fn rank_entries(mut stats: Vec<UserStats>, current_user: Option<&str>) -> Vec<LeaderboardEntry> {
    stats.sort_by(compare_standing);

    let mut entries = Vec::with_capacity(stats.len());
    let mut rank = 0u32;
    let mut previous_xp = None;

    for (index, user) in stats.into_iter().enumerate() {
        if previous_xp != Some(user.total_xp) {
            rank = index as u32 + 1;
            previous_xp = Some(user.total_xp);
        }

        entries.push(LeaderboardEntry {
            rank,
            is_current_user: current_user == Some(user.user_id.as_str()),
            user_id: user.user_id,
            level: user.level,
            total_xp: user.total_xp,
            current_streak: user.current_streak,
            courses_completed: user.courses_completed,
            achievements_earned: user.achievements_earned,
        });
    }

    entries
}
