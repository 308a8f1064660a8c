//! XP and level math.
//!
//! Levels grow with the square root of total XP:
//! `level = floor(sqrt(total_xp / 100)) + 1`, so level `n` starts at
//! `(n - 1)^2 * 100` XP.

use serde::{Deserialize, Serialize};

use super::types::{Difficulty, UserStats};

/// XP granted for a perfect lesson on a beginner course.
pub const BASE_LESSON_XP: f64 = 50.0;

/// XP spanned by one level unit.
const XP_PER_LEVEL_UNIT: u64 = 100;

/// Integer square root (floor).
fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = (n as f64).sqrt() as u64;
    // Correct float rounding at the extremes.
    while x.saturating_mul(x) > n {
        x -= 1;
    }
    while (x + 1).saturating_mul(x + 1) <= n {
        x += 1;
    }
    x
}

/// Level reached with `total_xp`. Always at least 1.
pub fn level_for_xp(total_xp: u64) -> u32 {
    (isqrt(total_xp / XP_PER_LEVEL_UNIT) + 1) as u32
}

/// XP at which `level` begins.
pub fn level_threshold(level: u32) -> u64 {
    let n = u64::from(level.saturating_sub(1));
    n * n * XP_PER_LEVEL_UNIT
}

/// XP still needed to leave `level`. Zero once `total_xp >= level^2 * 100`.
pub fn xp_to_next_level(total_xp: u64, level: u32) -> u64 {
    let next = u64::from(level) * u64::from(level) * XP_PER_LEVEL_UNIT;
    next.saturating_sub(total_xp)
}

/// Where a user sits within their current level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    pub xp_to_next_level: u64,
    /// 0..=100
    pub percent: f64,
}

/// Progress through the level implied by `total_xp`.
pub fn level_progress(total_xp: u64) -> LevelProgress {
    let level = level_for_xp(total_xp);
    let start = level_threshold(level);
    let end = level_threshold(level + 1);
    let span = end.saturating_sub(start).max(1);
    let percent = (total_xp.saturating_sub(start) as f64 / span as f64 * 100.0).clamp(0.0, 100.0);

    LevelProgress {
        level,
        xp_to_next_level: xp_to_next_level(total_xp, level),
        percent,
    }
}

/// XP earned for a completed lesson.
pub fn lesson_xp(score: u32, difficulty: Difficulty) -> u64 {
    let xp = BASE_LESSON_XP * (f64::from(score) / 100.0) * difficulty.xp_multiplier();
    xp.round().max(0.0) as u64
}

/// Outcome of a single XP award.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpAward {
    pub amount: u64,
    pub total_xp: u64,
    pub previous_level: u32,
    pub new_level: u32,
}

impl XpAward {
    pub fn level_up(&self) -> bool {
        self.new_level > self.previous_level
    }
}

/// Add XP to stats and recompute the level.
///
/// This is the only place `total_xp` and `level` change.
pub fn apply_xp(stats: &mut UserStats, amount: u64) -> XpAward {
    let previous_level = stats.level;
    stats.total_xp = stats.total_xp.saturating_add(amount);
    stats.level = level_for_xp(stats.total_xp);

    XpAward {
        amount,
        total_xp: stats.total_xp,
        previous_level,
        new_level: stats.level,
    }
}
