//! Relational schema for the SQLite backend.

use super::store::Table;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Schema version tracking table.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// SQL schema for creating all tables.
pub const SCHEMA: &str = r#"
-- Per-user aggregate stats
CREATE TABLE IF NOT EXISTS user_stats (
    user_id TEXT PRIMARY KEY,
    level INTEGER NOT NULL DEFAULT 1,
    total_xp INTEGER NOT NULL DEFAULT 0,
    current_streak INTEGER NOT NULL DEFAULT 0,
    best_streak INTEGER NOT NULL DEFAULT 0,
    total_sessions INTEGER NOT NULL DEFAULT 0,
    total_messages INTEGER NOT NULL DEFAULT 0,
    average_score REAL NOT NULL DEFAULT 0,
    courses_completed INTEGER NOT NULL DEFAULT 0,
    achievements_earned INTEGER NOT NULL DEFAULT 0,
    rank_position INTEGER NOT NULL DEFAULT 0,
    last_active_on TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_user_stats_total_xp ON user_stats(total_xp);

-- Course catalog
CREATE TABLE IF NOT EXISTS courses (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    topics TEXT NOT NULL DEFAULT '[]',
    lessons TEXT NOT NULL DEFAULT '[]',
    rewards TEXT NOT NULL,
    estimated_minutes INTEGER NOT NULL DEFAULT 0
);

-- Progress per (user, course)
CREATE TABLE IF NOT EXISTS user_progress (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    course_id TEXT NOT NULL REFERENCES courses(id),
    current_lesson INTEGER NOT NULL DEFAULT 0,
    completed_lessons TEXT NOT NULL DEFAULT '[]',
    total_score INTEGER NOT NULL DEFAULT 0,
    completion_percentage INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'not_started',
    best_session_score INTEGER NOT NULL DEFAULT 0,
    total_time_spent INTEGER NOT NULL DEFAULT 0,
    streak_days INTEGER NOT NULL DEFAULT 0,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    last_activity TEXT NOT NULL,
    UNIQUE(user_id, course_id)
);

CREATE INDEX IF NOT EXISTS idx_user_progress_user_id ON user_progress(user_id);

-- Achievement catalog
CREATE TABLE IF NOT EXISTS achievements (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    icon TEXT NOT NULL,
    type TEXT NOT NULL,
    criteria TEXT NOT NULL,
    reward_xp INTEGER NOT NULL DEFAULT 0,
    rarity TEXT NOT NULL DEFAULT 'common'
);

-- Earned achievements
CREATE TABLE IF NOT EXISTS user_achievements (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    achievement_id TEXT NOT NULL REFERENCES achievements(id),
    earned_at TEXT NOT NULL,
    progress TEXT NOT NULL,
    UNIQUE(user_id, achievement_id)
);

CREATE INDEX IF NOT EXISTS idx_user_achievements_user_id ON user_achievements(user_id);

-- Tutor conversations
CREATE TABLE IF NOT EXISTS chat_sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    topic TEXT NOT NULL,
    messages TEXT NOT NULL DEFAULT '[]',
    state TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chat_sessions_user_id ON chat_sessions(user_id);
"#;

/// How a column's value is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    /// Nested value stored as JSON text.
    Json,
}

/// Columns of each table, in declaration order.
pub fn columns(table: Table) -> &'static [(&'static str, ColumnKind)] {
    use ColumnKind::*;

    match table {
        Table::UserStats => &[
            ("user_id", Text),
            ("level", Integer),
            ("total_xp", Integer),
            ("current_streak", Integer),
            ("best_streak", Integer),
            ("total_sessions", Integer),
            ("total_messages", Integer),
            ("average_score", Real),
            ("courses_completed", Integer),
            ("achievements_earned", Integer),
            ("rank_position", Integer),
            ("last_active_on", Text),
            ("created_at", Text),
            ("updated_at", Text),
        ],
        Table::Courses => &[
            ("id", Text),
            ("title", Text),
            ("description", Text),
            ("category", Text),
            ("difficulty", Text),
            ("topics", Json),
            ("lessons", Json),
            ("rewards", Json),
            ("estimated_minutes", Integer),
        ],
        Table::UserProgress => &[
            ("id", Text),
            ("user_id", Text),
            ("course_id", Text),
            ("current_lesson", Integer),
            ("completed_lessons", Json),
            ("total_score", Integer),
            ("completion_percentage", Integer),
            ("status", Text),
            ("best_session_score", Integer),
            ("total_time_spent", Integer),
            ("streak_days", Integer),
            ("started_at", Text),
            ("completed_at", Text),
            ("last_activity", Text),
        ],
        Table::Achievements => &[
            ("id", Text),
            ("name", Text),
            ("description", Text),
            ("icon", Text),
            ("type", Text),
            ("criteria", Json),
            ("reward_xp", Integer),
            ("rarity", Text),
        ],
        Table::UserAchievements => &[
            ("id", Text),
            ("user_id", Text),
            ("achievement_id", Text),
            ("earned_at", Text),
            ("progress", Json),
        ],
        Table::ChatSessions => &[
            ("id", Text),
            ("user_id", Text),
            ("topic", Text),
            ("messages", Json),
            ("state", Json),
            ("created_at", Text),
            ("updated_at", Text),
        ],
    }
}

/// Look up the storage kind of a column.
pub fn column_kind(table: Table, column: &str) -> Option<ColumnKind> {
    columns(table)
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, kind)| *kind)
}
