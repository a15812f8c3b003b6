#![deny(clippy::pedantic)]

mod announcer;
mod commands;
mod config;
mod error;
mod event;
mod event_menu;
mod handler;
mod health;
mod manager;
mod reaction;
mod repository;
mod scheduler;
mod store;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use config::Config;
use dotenv::dotenv;
use error::AppError;
use handler::Handler;
use repository::Repository;
use serenity::{all::GatewayIntents, Client};
use std::sync::Arc;
use store::GithubStore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "event_bot=info,warn";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Arc::new(Config::from_env()?);

    if config.store.token.is_none() {
        warn!("GITHUB_TOKEN is not set, events will not be persisted");
    }
    let repository = Arc::new(Repository::new(Arc::new(GithubStore::new(
        config.store.clone(),
    )?)));
    let loaded = repository.load().await;
    info!("Loaded {} events from {}", loaded, config.store.repo);

    let port = config.port;
    tokio::spawn(async move {
        if let Err(e) = health::serve(port).await {
            error!("Health endpoint stopped: {}", e);
        }
    });

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(Handler::new(Arc::clone(&config), repository))
        .await?;

    client.start().await?;

    Ok(())
}
