//! Unit test modules.

mod leaderboard_test;
mod leveling_test;
