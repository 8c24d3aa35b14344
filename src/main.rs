use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod commands;
mod config;
mod models;
mod services;
mod utils;

use api::predictor::PredictorClient;
use config::Config;
use services::session_service::SessionRegistry;

struct Handler;

struct BotData;

impl TypeMapKey for BotData {
    type Value = Instant;
}

/// Per-channel request coordinators
struct PredictorSessions;

impl TypeMapKey for PredictorSessions {
    type Value = Arc<SessionRegistry<PredictorClient>>;
}

struct Settings;

impl TypeMapKey for Settings {
    type Value = Arc<Config>;
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        commands::handle_message(&ctx, &msg).await;
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        match ctx.http.get_current_user().await {
            Ok(_) => info!("Bot is fully ready!"),
            Err(e) => warn!("Failed to check Discord status: {}", e),
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("stockcast=debug".parse().unwrap())
                .add_directive("serenity=warn".parse().unwrap()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("📈 Starting Stockcast v{}...", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };
    info!(
        "Prediction service: {} (timeout {:?})",
        config.predict_api_url, config.predict_timeout
    );

    let predictor =
        match PredictorClient::new(config.predict_api_url.clone(), config.predict_timeout) {
            Ok(predictor) => predictor,
            Err(e) => {
                error!("Failed to create prediction client: {}", e);
                return;
            }
        };
    let sessions = Arc::new(SessionRegistry::new(predictor));

    let intents = GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGES;

    let mut client = match Client::builder(&config.discord_token, intents)
        .event_handler(Handler)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create client: {}", e);
            return;
        }
    };

    {
        let mut data = client.data.write().await;
        data.insert::<BotData>(Instant::now());
        data.insert::<PredictorSessions>(sessions);
        data.insert::<Settings>(Arc::new(config));
    }

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }
}
