//! Integration tests for the gamification service over both store backends.
//!
//! Every scenario runs against the in-memory store and an in-memory SQLite
//! database so the two backends stay interchangeable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use socratic_tutor::gamification::achievements::EvaluationContext;
use socratic_tutor::gamification::events::{GameEventKind, XpReason};
use socratic_tutor::gamification::types::{ProgressStatus, UserStats};
use socratic_tutor::gamification::{GamificationError, GamificationService, LessonOutcome};
use socratic_tutor::storage::{
    to_record, Filter, MemoryStore, Order, Record, SqliteStore, Store, StoreError, Table,
};
use socratic_tutor::tutor::types::{Agent, ChatSession, Message};
use socratic_tutor::tutor::LessonSession;

fn backends() -> Vec<(&'static str, Arc<dyn Store>)> {
    vec![
        ("memory", Arc::new(MemoryStore::new()) as Arc<dyn Store>),
        (
            "sqlite",
            Arc::new(SqliteStore::open_in_memory().unwrap()) as Arc<dyn Store>,
        ),
    ]
}

fn seeded(store: Arc<dyn Store>) -> GamificationService {
    let service = GamificationService::new(store);
    service.seed_catalog().unwrap();
    service
}

fn lesson(user: &str, course: &str, lesson_id: u32, score: u32) -> LessonOutcome {
    LessonOutcome {
        user_id: user.to_string(),
        course_id: course.to_string(),
        lesson_id,
        score,
        time_spent: 120,
    }
}

#[test]
fn test_seed_is_idempotent() {
    for (name, store) in backends() {
        let service = GamificationService::new(Arc::clone(&store));
        let first = service.seed_catalog().unwrap();
        let second = service.seed_catalog().unwrap();

        assert!(first.courses > 0, "{}", name);
        assert_eq!(second.courses, 0, "{}", name);
        assert_eq!(second.achievements, 0, "{}", name);
        assert_eq!(
            store.count(Table::Courses, &Filter::all()).unwrap() as usize,
            first.courses,
            "{}",
            name
        );
    }
}

#[test]
fn test_courses_sorted_by_difficulty() {
    for (name, store) in backends() {
        let service = seeded(store);
        let courses = service.get_courses().unwrap();
        let difficulties: Vec<_> = courses.iter().map(|c| c.difficulty).collect();
        let mut sorted = difficulties.clone();
        sorted.sort();
        assert_eq!(difficulties, sorted, "{}", name);

        let history = service.get_courses_by_category("History").unwrap();
        assert_eq!(history.len(), 1, "{}", name);
        assert_eq!(history[0].id, "world-war-ii-causes", "{}", name);

        let course = service.get_course("photosynthesis").unwrap().unwrap();
        assert_eq!(course.lessons.len(), 4, "{}", name);
        assert!(service.get_course("nope").unwrap().is_none(), "{}", name);
    }
}

#[test]
fn test_stats_created_lazily_once() {
    for (name, store) in backends() {
        let service = seeded(Arc::clone(&store));
        let stats = service.get_user_stats("ada").unwrap();
        assert_eq!(stats.level, 1, "{}", name);
        assert_eq!(stats.total_xp, 0, "{}", name);

        service.get_user_stats("ada").unwrap();
        assert_eq!(store.count(Table::UserStats, &Filter::all()).unwrap(), 1, "{}", name);
    }
}

#[test]
fn test_start_course_returns_existing() {
    for (name, store) in backends() {
        let service = seeded(Arc::clone(&store));
        let first = service.start_course("ada", "photosynthesis").unwrap();
        let again = service.start_course("ada", "photosynthesis").unwrap();

        assert_eq!(first.id, again.id, "{}", name);
        assert_eq!(first.status, ProgressStatus::InProgress, "{}", name);
        assert_eq!(store.count(Table::UserProgress, &Filter::all()).unwrap(), 1, "{}", name);

        assert!(matches!(
            service.start_course("ada", "missing"),
            Err(GamificationError::CourseNotFound(_))
        ));
    }
}

/// Four-lesson course: half way, then complete with a single bonus
#[test]
fn test_four_lesson_course_flow() {
    for (name, store) in backends() {
        let service = seeded(store);
        service.start_course("ada", "photosynthesis").unwrap();

        service.complete_lesson(&lesson("ada", "photosynthesis", 0, 80)).unwrap();
        let half = service.complete_lesson(&lesson("ada", "photosynthesis", 1, 80)).unwrap();
        assert_eq!(half.progress.completion_percentage, 50, "{}", name);
        assert_eq!(half.progress.status, ProgressStatus::InProgress, "{}", name);

        service.complete_lesson(&lesson("ada", "photosynthesis", 2, 80)).unwrap();
        let done = service.complete_lesson(&lesson("ada", "photosynthesis", 3, 80)).unwrap();
        assert_eq!(done.progress.completion_percentage, 100, "{}", name);
        assert_eq!(done.progress.status, ProgressStatus::Completed, "{}", name);

        let types: Vec<&str> = done.events.iter().map(|e| e.type_name()).collect();
        assert_eq!(
            types,
            vec![
                "xp_gained",
                "xp_gained",
                "course_completed",
                "achievement_unlocked",
                "xp_gained",
                "level_up"
            ],
            "{}",
            name
        );
        assert!(matches!(
            done.events[1].kind,
            GameEventKind::XpGained {
                amount: 100,
                reason: XpReason::CourseCompletion
            }
        ));

        // 4 lessons at 40 XP, 100 bonus, 25 + 50 + 100 from achievements.
        let stats = service.get_user_stats("ada").unwrap();
        assert_eq!(stats.total_xp, 435, "{}", name);
        assert_eq!(stats.level, 3, "{}", name);
        assert_eq!(stats.courses_completed, 1, "{}", name);
        assert_eq!(stats.achievements_earned, 3, "{}", name);
        assert_eq!(stats.total_sessions, 4, "{}", name);
        assert!((stats.average_score - 80.0).abs() < 1e-9, "{}", name);
        assert_eq!(stats.rank_position, 1, "{}", name);

        // Replaying a lesson grants lesson XP but never a second bonus.
        let replay = service.complete_lesson(&lesson("ada", "photosynthesis", 3, 80)).unwrap();
        assert!(done.newly_completed, "{}", name);
        assert!(!replay.newly_completed, "{}", name);
        assert!(replay.events.iter().all(|e| e.type_name() != "course_completed"));
        assert_eq!(replay.progress.completion_percentage, 100, "{}", name);
        let stats = service.get_user_stats("ada").unwrap();
        assert_eq!(stats.courses_completed, 1, "{}", name);
        assert_eq!(stats.total_xp, 475, "{}", name);
    }
}

#[test]
fn test_played_lesson_feeds_progress() {
    for (name, store) in backends() {
        let service = seeded(store);
        service.start_course("ada", "quadratic-equations").unwrap();

        let mut lesson = LessonSession::new("ada", "quadratic-equations", 0);
        for question in ["What is a root?", "Why two roots?", "Can a root repeat?"] {
            lesson.record_question(question);
        }
        assert!(lesson.ready_to_complete(), "{}", name);

        let outcome = lesson.finish(Utc::now()).unwrap();
        assert!(lesson.finish(Utc::now()).is_none(), "{}", name);

        let completion = service.complete_lesson(&outcome).unwrap();
        assert!(completion.progress.completed_lessons.contains(&0), "{}", name);
        assert_eq!(completion.progress.completion_percentage, 20, "{}", name);
        assert_eq!(completion.events[0].type_name(), "xp_gained", "{}", name);
    }
}

/// Memory store whose progress updates can be switched to fail.
#[derive(Default)]
struct RejectingProgressStore {
    inner: MemoryStore,
    reject_progress: AtomicBool,
}

impl Store for RejectingProgressStore {
    fn get_row(&self, table: Table, filter: &Filter) -> Result<Option<Record>, StoreError> {
        self.inner.get_row(table, filter)
    }

    fn insert_row(&self, table: Table, record: Record) -> Result<Record, StoreError> {
        self.inner.insert_row(table, record)
    }

    fn update_row(
        &self,
        table: Table,
        filter: &Filter,
        partial: Record,
    ) -> Result<Record, StoreError> {
        if table == Table::UserProgress && self.reject_progress.load(Ordering::SeqCst) {
            return Err(StoreError::QueryFailed("progress write rejected".to_string()));
        }
        self.inner.update_row(table, filter, partial)
    }

    fn query(
        &self,
        table: Table,
        filter: &Filter,
        order: &[Order],
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError> {
        self.inner.query(table, filter, order, limit)
    }

    fn count(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.count(table, filter)
    }

    fn delete_rows(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.delete_rows(table, filter)
    }
}

#[test]
fn test_course_bonus_kept_when_progress_write_fails() {
    let store = Arc::new(RejectingProgressStore::default());
    let service = seeded(Arc::clone(&store) as Arc<dyn Store>);
    service.start_course("ada", "photosynthesis").unwrap();
    for lesson_id in 0..3 {
        service
            .complete_lesson(&lesson("ada", "photosynthesis", lesson_id, 80))
            .unwrap();
    }
    assert_eq!(service.get_user_stats("ada").unwrap().total_xp, 195);

    store.reject_progress.store(true, Ordering::SeqCst);
    let result = service.complete_lesson(&lesson("ada", "photosynthesis", 3, 80));
    assert!(matches!(result, Err(GamificationError::Store(_))));

    // Lesson XP and the course bonus landed with the stats.
    let stats = service.get_user_stats("ada").unwrap();
    assert_eq!(stats.total_xp, 195 + 40 + 100);
    assert_eq!(stats.courses_completed, 1);

    let progress = service
        .get_course_progress("ada", "photosynthesis")
        .unwrap()
        .unwrap();
    assert_eq!(progress.status, ProgressStatus::InProgress);
    assert_eq!(progress.completed_lessons.len(), 3);
}

#[test]
fn test_complete_lesson_errors() {
    for (name, store) in backends() {
        let service = seeded(store);

        assert!(
            matches!(
                service.complete_lesson(&lesson("ada", "photosynthesis", 0, 80)),
                Err(GamificationError::CourseNotStarted { .. })
            ),
            "{}",
            name
        );

        service.start_course("ada", "photosynthesis").unwrap();
        assert!(
            matches!(
                service.complete_lesson(&lesson("ada", "photosynthesis", 9, 80)),
                Err(GamificationError::InvalidLesson(_))
            ),
            "{}",
            name
        );
        assert!(
            matches!(
                service.complete_lesson(&lesson("ada", "photosynthesis", 0, 101)),
                Err(GamificationError::InvalidState(_))
            ),
            "{}",
            name
        );

        // Nothing was recorded by the failed calls.
        let progress = service
            .get_course_progress("ada", "photosynthesis")
            .unwrap()
            .unwrap();
        assert!(progress.completed_lessons.is_empty(), "{}", name);
    }
}

#[test]
fn test_achievement_unlock_is_idempotent() {
    for (name, store) in backends() {
        let service = seeded(Arc::clone(&store));
        let context = EvaluationContext::lesson(100, false, 0);

        let first = service.check_achievements("ada", &context).unwrap();
        let ids: Vec<&str> = first.achievements.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["good_score", "perfect_score"], "{}", name);

        let second = service.check_achievements("ada", &context).unwrap();
        assert!(second.achievements.is_empty(), "{}", name);
        assert!(second.events.is_empty(), "{}", name);

        assert_eq!(
            store
                .count(Table::UserAchievements, &Filter::all().eq("user_id", "ada"))
                .unwrap(),
            2,
            "{}",
            name
        );
        let stats = service.get_user_stats("ada").unwrap();
        assert_eq!(stats.total_xp, 100, "{}", name);
        assert_eq!(stats.achievements_earned, 2, "{}", name);

        let earned = service.get_user_achievements("ada").unwrap();
        assert_eq!(earned.len(), 2, "{}", name);
        assert!(earned.iter().all(|e| e.achievement.is_some()), "{}", name);
        assert_eq!(earned[0].record.progress.current, 1, "{}", name);
    }
}

#[test]
fn test_chat_activity_unlocks_conversation_achievements() {
    for (name, store) in backends() {
        let service = seeded(store);
        let mut chat = ChatSession::new("ada", "Closures");
        for i in 0..10 {
            chat.push(Message::user(format!("question {}", i)));
            chat.push(Message::assistant(format!("what about {}?", i), Agent::Socratic));
        }

        let unlocks = service.record_chat_activity(&chat, 20).unwrap();
        let ids: Vec<&str> = unlocks.achievements.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["deep_conversation", "socratic_thinker"], "{}", name);

        let stats = service.get_user_stats("ada").unwrap();
        assert_eq!(stats.total_messages, 20, "{}", name);
        assert_eq!(stats.total_xp, 200, "{}", name);

        let again = service.record_chat_activity(&chat, 0).unwrap();
        assert!(again.achievements.is_empty(), "{}", name);
    }
}

#[test]
fn test_award_xp_commutes() {
    for (name, store) in backends() {
        let service = seeded(store);

        service.award_xp("a", 30).unwrap();
        service.award_xp("a", 20).unwrap();
        service.award_xp("b", 20).unwrap();
        service.award_xp("b", 30).unwrap();

        let a = service.get_user_stats("a").unwrap();
        let b = service.get_user_stats("b").unwrap();
        assert_eq!(a.total_xp, 50, "{}", name);
        assert_eq!(a.total_xp, b.total_xp, "{}", name);
        assert_eq!(a.level, b.level, "{}", name);
    }
}

#[test]
fn test_award_xp_reports_level_up() {
    for (name, store) in backends() {
        let service = seeded(store);
        let grant = service.award_xp("ada", 250).unwrap();

        assert!(grant.award.level_up(), "{}", name);
        assert_eq!(grant.award.new_level, 2, "{}", name);
        assert_eq!(service.get_user_stats("ada").unwrap().level, 2, "{}", name);

        assert_eq!(grant.events.len(), 2, "{}", name);
        assert!(matches!(
            grant.events[0].kind,
            GameEventKind::XpGained {
                amount: 250,
                reason: XpReason::Manual
            }
        ));
        assert!(matches!(
            grant.events[1].kind,
            GameEventKind::LevelUp {
                previous_level: 1,
                new_level: 2
            }
        ));

        let small = service.award_xp("ada", 10).unwrap();
        let names: Vec<&str> = small.events.iter().map(|e| e.type_name()).collect();
        assert_eq!(names, vec!["xp_gained"], "{}", name);
    }
}

/// 500, 499 and a second 500
#[test]
fn test_ranking_with_ties() {
    for (name, store) in backends() {
        let service = seeded(store);
        service.award_xp("alice", 500).unwrap();
        service.award_xp("bob", 499).unwrap();
        service.award_xp("carol", 500).unwrap();

        assert_eq!(service.update_user_ranking("alice").unwrap(), Some(1), "{}", name);
        assert_eq!(service.update_user_ranking("bob").unwrap(), Some(3), "{}", name);
        assert_eq!(service.update_user_ranking("carol").unwrap(), Some(1), "{}", name);
        assert_eq!(service.update_user_ranking("nobody").unwrap(), None, "{}", name);

        assert_eq!(service.recompute_all_ranks().unwrap(), 3, "{}", name);
        assert_eq!(service.get_user_stats("bob").unwrap().rank_position, 3, "{}", name);

        let board = service.get_leaderboard(Some(2), Some("bob")).unwrap();
        let order: Vec<&str> = board.entries.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, vec!["alice", "carol"], "{}", name);
        assert_eq!(board.total_users, 3, "{}", name);

        let bob = board.current_user.unwrap();
        assert_eq!(bob.rank, 3, "{}", name);
        assert!(bob.is_current_user, "{}", name);
    }
}

/// Tied users at the cutoff keep the earlier join first, whatever the
/// number of fractional digits in their timestamps.
#[test]
fn test_leaderboard_cutoff_respects_join_order() {
    for (name, store) in backends() {
        let joined = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 5).unwrap();
        for (user, created_at) in [
            ("late", joined + Duration::milliseconds(500)),
            ("early", joined),
        ] {
            let mut stats = UserStats::new(user);
            stats.total_xp = 500;
            stats.level = 3;
            stats.created_at = created_at;
            store.insert_row(Table::UserStats, to_record(&stats).unwrap()).unwrap();
        }
        let service = GamificationService::new(Arc::clone(&store));
        service.award_xp("leader", 900).unwrap();

        let board = service.get_leaderboard(Some(2), Some("late")).unwrap();
        let order: Vec<&str> = board.entries.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, vec!["leader", "early"], "{}", name);
        assert_eq!(board.entries[1].rank, 2, "{}", name);

        let late = board.current_user.unwrap();
        assert_eq!(late.user_id, "late", "{}", name);
        assert_eq!(late.rank, 2, "{}", name);

        let top = service.get_leaderboard(Some(1), None).unwrap();
        assert_eq!(top.entries.len(), 1, "{}", name);
        assert_eq!(top.entries[0].user_id, "leader", "{}", name);
    }
}

#[test]
fn test_leaderboard_default_limit() {
    for (name, store) in backends() {
        let service = GamificationService::new(store).with_leaderboard_limit(3);
        for i in 0..5u64 {
            service.award_xp(&format!("user{}", i), i * 10).unwrap();
        }

        let board = service.get_leaderboard(None, None).unwrap();
        assert_eq!(board.entries.len(), 3, "{}", name);
        assert_eq!(board.entries[0].user_id, "user4", "{}", name);
        assert!(board.current_user.is_none(), "{}", name);
    }
}

#[test]
fn test_dashboard_and_overview() {
    for (name, store) in backends() {
        let service = seeded(store);
        service.start_course("ada", "javascript-closures").unwrap();
        service.complete_lesson(&lesson("ada", "javascript-closures", 0, 90)).unwrap();

        let dashboard = service.dashboard("ada").unwrap();
        assert_eq!(dashboard.progress.len(), 1, "{}", name);
        assert_eq!(dashboard.level.level, dashboard.stats.level, "{}", name);
        assert_eq!(dashboard.recent_achievements.len(), 1, "{}", name);

        let overview = service.achievement_overview("ada").unwrap();
        let good = overview
            .achievements
            .iter()
            .find(|s| s.achievement.id == "good_score")
            .unwrap();
        assert!(good.earned, "{}", name);
        assert_eq!(good.progress, 100.0, "{}", name);

        let sessions = overview
            .achievements
            .iter()
            .find(|s| s.achievement.id == "three_sessions")
            .unwrap();
        assert!(!sessions.earned, "{}", name);
        assert!((sessions.progress - 100.0 / 3.0).abs() < 1e-9, "{}", name);
    }
}
