//! FitQuest - Fitness Gamification Core
//!
//! Demo entry point: bootstraps a local account and character, runs one
//! activity sync pass against the simulated pedometer, and prints the
//! leaderboard.

use anyhow::Context;
use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fitquest::character::{Character, SportCategory, UserAccount};
use fitquest::sensors::SimulatedPedometer;
use fitquest::storage::{load_config, Database};
use fitquest::sync::{PersistenceWorker, SyncService};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FitQuest v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("failed to load configuration")?;
    let db_path = config.database_path();
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    // Bootstrap account and character
    let user = match db.get_user_by_email(&config.account.email)? {
        Some(user) => user,
        None => {
            let user = UserAccount::new(
                config.account.email.clone(),
                config.account.display_name.clone(),
            );
            db.upsert_user(&user)?;
            tracing::info!(username = %user.username, "created local account");
            user
        }
    };

    let mut character = match db.get_character_by_user(user.id)? {
        Some(character) => character,
        None => {
            let character = Character::new(
                user.id,
                config.account.display_name.clone(),
                SportCategory::Runner,
            );
            db.insert_character(&character)?;
            tracing::info!(
                name = %character.name,
                category = %character.sport_category,
                "created character"
            );
            character
        }
    };

    // One sync pass for today
    let today = Utc::now().date_naive();
    let ledger = db.get_ledger_entry(user.id, today)?;

    let worker = PersistenceWorker::spawn(Database::open(&db_path)?);
    let mut service = SyncService::new(SimulatedPedometer::seeded_from_clock(), worker.sender());

    let outcome = service.run(&mut character, ledger.as_ref(), today)?;

    tracing::info!(
        steps = outcome.activity.steps,
        awarded = outcome.awarded,
        levels_gained = outcome.levels_gained,
        level = character.level,
        experience = character.experience,
        experience_to_next = character.experience_to_next,
        "sync complete"
    );

    worker.shutdown();

    for (rank, row) in db.leaderboard(None, 10)?.iter().enumerate() {
        tracing::info!(
            rank = rank + 1,
            character = %row.character_name,
            level = row.level,
            experience = row.experience,
            category = %row.sport_category,
            "leaderboard"
        );
    }

    Ok(())
}
