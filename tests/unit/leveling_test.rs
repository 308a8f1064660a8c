//! Unit tests for XP and level math.

use socratic_tutor::gamification::leveling::{
    apply_xp, lesson_xp, level_for_xp, level_progress, level_threshold, xp_to_next_level,
};
use socratic_tutor::gamification::types::{Difficulty, UserStats};

#[test]
fn test_level_examples() {
    assert_eq!(level_for_xp(0), 1);
    assert_eq!(level_for_xp(100), 2);
    assert_eq!(level_for_xp(400), 3);
    assert_eq!(level_for_xp(900), 4);
}

#[test]
fn test_level_monotonic() {
    let mut previous = level_for_xp(0);
    for xp in (0..20_000).step_by(7) {
        let level = level_for_xp(xp);
        assert!(level >= 1);
        assert!(level >= previous, "level dropped at {} xp", xp);
        previous = level;
    }
}

#[test]
fn test_xp_to_next_level_zero_exactly_at_threshold() {
    for xp in 0..2_000u64 {
        let level = level_for_xp(xp);
        let remaining = xp_to_next_level(xp, level);
        let boundary = u64::from(level) * u64::from(level) * 100;
        assert_eq!(remaining == 0, xp >= boundary);
    }
    // A stale level reports nothing left to earn.
    assert_eq!(xp_to_next_level(500, 1), 0);
}

#[test]
fn test_level_thresholds() {
    assert_eq!(level_threshold(1), 0);
    assert_eq!(level_threshold(2), 100);
    assert_eq!(level_threshold(3), 400);
}

#[test]
fn test_progress_bounds() {
    for xp in [0u64, 1, 99, 100, 250, 399, 400, 10_000] {
        let progress = level_progress(xp);
        assert!((0.0..=100.0).contains(&progress.percent));
    }
    assert_eq!(level_progress(100).percent, 0.0);
}

/// Award 250 XP from zero
#[test]
fn test_award_levels_up() {
    let mut stats = UserStats::new("ada");
    let award = apply_xp(&mut stats, 250);

    assert_eq!(stats.total_xp, 250);
    assert_eq!(stats.level, 2);
    assert!(award.level_up());
    assert_eq!(award.previous_level, 1);
    assert_eq!(award.new_level, 2);
}

#[test]
fn test_awards_commute() {
    let mut a = UserStats::new("a");
    apply_xp(&mut a, 30);
    apply_xp(&mut a, 20);

    let mut b = UserStats::new("b");
    apply_xp(&mut b, 20);
    apply_xp(&mut b, 30);

    assert_eq!(a.total_xp, b.total_xp);
    assert_eq!(a.level, b.level);
}

#[test]
fn test_zero_award_is_not_level_up() {
    let mut stats = UserStats::new("ada");
    let award = apply_xp(&mut stats, 0);
    assert!(!award.level_up());
    assert_eq!(stats.level, 1);
}

#[test]
fn test_lesson_xp_rounding() {
    assert_eq!(lesson_xp(77, Difficulty::Beginner), 39);
    assert_eq!(lesson_xp(77, Difficulty::Advanced), 77);
    assert_eq!(lesson_xp(0, Difficulty::Advanced), 0);
}
