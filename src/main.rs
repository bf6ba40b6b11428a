//! VoiceRelay
//!
//! A Discord bot that transcribes voice messages with Groq Whisper and
//! replies with the text. Audio only lives on disk while it is transcribed.

mod audio;
mod auth;
mod bot;
mod commands;
mod config;
mod event;
mod fetcher;
mod platform;
mod relay;
mod transcriber;

use config::Config;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,voice_relay=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("VoiceRelay starting...");

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("Please ensure DISCORD_TOKEN and GROQ_API_KEY are set in .env file");
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully");
    match &config.allowed_user_id {
        Some(owner) => info!("Restricted to user {}", owner),
        None => info!("ALLOWED_USER_ID not set: every user may use the bot"),
    }
    if let Some(guild_id) = config.guild_id {
        info!("Development mode: Commands will be registered to guild {}", guild_id);
    }

    // Create temp audio directory
    if let Err(e) = std::fs::create_dir_all(&config.temp_audio_dir) {
        error!("Failed to create temp audio directory: {}", e);
        std::process::exit(1);
    }

    // Run the bot
    if let Err(e) = bot::run(config).await {
        error!("Bot error: {}", e);
        std::process::exit(1);
    }
}
