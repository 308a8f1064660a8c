//! Unit tests for leaderboard ranking

use chrono::{Duration, TimeZone, Utc};

use socratic_tutor::gamification::leaderboard::{compare_standing, rank_entries, rank_from_count};
use socratic_tutor::gamification::types::UserStats;

fn user(id: &str, total_xp: u64, joined_day: u32) -> UserStats {
    let mut stats = UserStats::new(id);
    stats.total_xp = total_xp;
    stats.created_at = Utc.with_ymd_and_hms(2026, 1, joined_day, 12, 0, 0).unwrap();
    stats
}

/// 500 ranks above 499; a second 500 shares first place
#[test]
fn test_equal_xp_shares_rank() {
    let entries = rank_entries(
        vec![user("carol", 500, 3), user("bob", 499, 1), user("alice", 500, 2)],
        None,
    );

    assert_eq!(entries[0].user_id, "alice");
    assert_eq!(entries[0].rank, 1);
    assert_eq!(entries[1].user_id, "carol");
    assert_eq!(entries[1].rank, 1);
    assert_eq!(entries[2].user_id, "bob");
    assert_eq!(entries[2].rank, 3);
}

#[test]
fn test_tie_break_by_user_id_when_joined_together() {
    let a = user("alice", 10, 1);
    let b = user("bob", 10, 1);
    assert!(compare_standing(&a, &b).is_lt());
    assert!(compare_standing(&b, &a).is_gt());
}

#[test]
fn test_order_is_deterministic() {
    let users = vec![
        user("d", 40, 4),
        user("a", 90, 1),
        user("c", 40, 2),
        user("b", 90, 1),
    ];
    let mut reversed = users.clone();
    reversed.reverse();

    let first: Vec<String> = rank_entries(users, None).into_iter().map(|e| e.user_id).collect();
    let second: Vec<String> = rank_entries(reversed, None).into_iter().map(|e| e.user_id).collect();
    assert_eq!(first, second);
    assert_eq!(first, vec!["a", "b", "c", "d"]);
}

#[test]
fn test_current_user_flag() {
    let mut later = user("zed", 5, 1);
    later.created_at += Duration::hours(1);

    let entries = rank_entries(vec![user("amy", 5, 1), later], Some("zed"));
    assert!(!entries[0].is_current_user);
    assert!(entries[1].is_current_user);
    assert_eq!(entries[1].rank, 1);
}

#[test]
fn test_rank_from_count() {
    assert_eq!(rank_from_count(0), 1);
    assert_eq!(rank_from_count(41), 42);
}

#[test]
fn test_empty_board() {
    assert!(rank_entries(Vec::new(), Some("anyone")).is_empty());
}
