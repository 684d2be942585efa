use std::env;
use std::sync::Arc;
use std::time::Duration;

use teloxide::{prelude::*, utils::command::BotCommands};
use tokio::time;

mod database;
mod dialog;
mod handlers;
mod health;
mod models;
mod plan;

use crate::database::Database;
use crate::dialog::{DialogEngine, SessionStore, SystemClock};
use crate::handlers::{callback_handler, command_handler, message_handler};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
enum Command {
    #[command(description = "begin the questionnaire or show your saved plan")]
    Start,
    #[command(description = "delete your saved plan and start over")]
    Reset,
    #[command(description = "show help")]
    Help,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting FitPlanner bot with PostgreSQL...");

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let db = Database::new(&database_url).await?;
    db.init().await?;
    log::info!("✅ Database initialized");

    let sessions = Arc::new(SessionStore::new(Arc::new(SystemClock)));
    let engine = DialogEngine::new(sessions.clone(), Arc::new(db));

    // Background sweep of idle dialog sessions
    let sessions_clone = sessions.clone();
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            sessions_clone.remove_expired().await;
        }
    });

    // Liveness endpoint for the hosting platform
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    tokio::spawn(async move {
        if let Err(e) = health::serve(port).await {
            log::error!("Health endpoint error: {}", e);
        }
    });

    let bot = Bot::from_env();

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
