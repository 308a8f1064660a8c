//! Socratic tutor command-line front end.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use socratic_tutor::gamification::{level_progress, GamificationService, LessonOutcome};
use socratic_tutor::storage::{self, config, Store};
use socratic_tutor::tutor::{SessionStore, TutorClient};

mod cli;

use cli::{Cli, Command};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
    .context("Failed to load configuration")?;

    tracing::info!("Starting socratic-tutor v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn Store> =
        storage::open_store(&config.storage).context("Failed to open store")?;
    let service = GamificationService::new(Arc::clone(&store))
        .with_leaderboard_limit(config.leaderboard.default_limit);
    service.seed_catalog()?;

    match cli.command {
        Command::Stats { user } => {
            let stats = service.get_user_stats(&user)?;
            let level = level_progress(stats.total_xp);
            print_json(&serde_json::json!({ "stats": stats, "level": level }))?;
        }
        Command::Leaderboard { limit, user } => {
            let board = service.get_leaderboard(limit, user.as_deref())?;
            print_json(&board)?;
        }
        Command::RecomputeRanks => {
            let updated = service.recompute_all_ranks()?;
            println!("Updated {} ranks", updated);
        }
        Command::Courses { category } => {
            let courses = match category {
                Some(category) => service.get_courses_by_category(&category)?,
                None => service.get_courses()?,
            };
            print_json(&courses)?;
        }
        Command::Start { user, course } => {
            let progress = service.start_course(&user, &course)?;
            print_json(&progress)?;
        }
        Command::Complete {
            user,
            course,
            lesson,
            score,
            time_spent,
        } => {
            let completion = service.complete_lesson(&LessonOutcome {
                user_id: user,
                course_id: course,
                lesson_id: lesson,
                score,
                time_spent,
            })?;
            print_json(&completion)?;
        }
        Command::Achievements { user } => {
            let overview = service.achievement_overview(&user)?;
            print_json(&overview)?;
        }
        Command::Chat {
            user,
            topic,
            session,
            message,
        } => {
            config.validate()?;
            let client = TutorClient::new(&config.tutor)?;
            let sessions = SessionStore::new(Arc::clone(&store));

            let mut chat = match session {
                Some(id) => sessions
                    .get(&user, id)?
                    .with_context(|| format!("No session {} for {}", id, user))?,
                None => sessions.create(&user, &topic)?,
            };

            let exchange = sessions.exchange(&client, &mut chat, &message).await?;
            // Question and reply.
            let unlocks = service.record_chat_activity(&chat, 2)?;

            let agent = exchange.reply.agent.map_or("tutor", |a| a.as_str());
            println!("[{}] {}", agent, exchange.reply.content);
            println!("session: {}", chat.id);
            if !unlocks.events.is_empty() {
                print_json(&unlocks.events)?;
            }
        }
    }

    Ok(())
}
