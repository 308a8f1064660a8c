//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Socratic tutor progression engine.
#[derive(Parser, Debug)]
#[command(name = "socratic-tutor")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to the platform data directory)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show a user's stats and level progress
    Stats {
        #[arg(short, long)]
        user: String,
    },
    /// Show the leaderboard
    Leaderboard {
        /// Entries to show
        #[arg(short, long)]
        limit: Option<usize>,
        /// Highlight this user
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Recompute every user's rank
    RecomputeRanks,
    /// List courses
    Courses {
        #[arg(long)]
        category: Option<String>,
    },
    /// Start a course
    Start {
        #[arg(short, long)]
        user: String,
        #[arg(long)]
        course: String,
    },
    /// Record a completed lesson
    Complete {
        #[arg(short, long)]
        user: String,
        #[arg(long)]
        course: String,
        /// Lesson index within the course
        #[arg(long)]
        lesson: u32,
        /// Lesson score, 0 to 100
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
        score: u32,
        /// Seconds spent on the lesson
        #[arg(long, default_value_t = 0)]
        time_spent: u64,
    },
    /// Show achievement progress
    Achievements {
        #[arg(short, long)]
        user: String,
    },
    /// Send one message to the tutor
    Chat {
        #[arg(short, long)]
        user: String,
        /// Topic for a new session
        #[arg(short, long)]
        topic: String,
        /// Continue an existing session
        #[arg(long)]
        session: Option<uuid::Uuid>,
        message: String,
    },
}
