//! Configuration management for VoiceRelay
//!
//! Loads settings from environment variables (.env file)

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// Groq API key
    pub groq_api_key: String,
    /// Only this user may use the bot. `None` lets everyone in.
    pub allowed_user_id: Option<String>,
    /// Optional guild ID for development (faster command sync)
    pub guild_id: Option<u64>,
    /// Directory for transient voice files
    pub temp_audio_dir: PathBuf,
    /// Groq OpenAI-compatible API base
    pub groq_base_url: String,
    /// Voice notes above this size are refused before transcription
    pub max_voice_bytes: Option<u64>,
    /// Timeout for a single transcription request
    pub transcribe_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let discord_token = require("DISCORD_TOKEN")?;
        let groq_api_key = require("GROQ_API_KEY")?;

        let allowed_user_id = get("ALLOWED_USER_ID");

        let guild_id = parse_optional::<u64>("GUILD_ID", get("GUILD_ID"))?;

        let temp_audio_dir = get("TEMP_AUDIO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let groq_base_url = get("GROQ_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| GROQ_API_BASE.to_string());

        let max_voice_bytes = parse_optional::<u64>("MAX_VOICE_BYTES", get("MAX_VOICE_BYTES"))?;

        let transcribe_timeout =
            match parse_optional::<u64>("TRANSCRIBE_TIMEOUT_SECS", get("TRANSCRIBE_TIMEOUT_SECS"))? {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => Some(Duration::from_secs(DEFAULT_TRANSCRIBE_TIMEOUT_SECS)),
            };

        Ok(Self {
            discord_token,
            groq_api_key,
            allowed_user_id,
            guild_id,
            temp_audio_dir,
            groq_base_url,
            max_voice_bytes,
            transcribe_timeout,
        })
    }
}

fn parse_optional<T: std::str::FromStr>(
    key: &str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    value
        .map(|s| {
            s.parse::<T>()
                .map_err(|_| ConfigError::InvalidValue(key.to_string(), s))
        })
        .transpose()
}

pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_TRANSCRIBE_TIMEOUT_SECS: u64 = 120;

/// Whisper model identifiers served by Groq
pub mod models {
    pub const WHISPER_LARGE_V3_TURBO: &str = "whisper-large-v3-turbo";
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_required_credentials() {
        let err = Config::from_lookup(lookup(&[("GROQ_API_KEY", "gsk")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "DISCORD_TOKEN"));

        let err = Config::from_lookup(lookup(&[("DISCORD_TOKEN", "tok"), ("GROQ_API_KEY", "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "GROQ_API_KEY"));
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup(&[("DISCORD_TOKEN", "tok"), ("GROQ_API_KEY", "gsk")])).unwrap();
        assert_eq!(config.allowed_user_id, None);
        assert_eq!(config.guild_id, None);
        assert_eq!(config.groq_base_url, GROQ_API_BASE);
        assert_eq!(config.max_voice_bytes, None);
        assert_eq!(
            config.transcribe_timeout,
            Some(Duration::from_secs(DEFAULT_TRANSCRIBE_TIMEOUT_SECS))
        );
    }

    #[test]
    fn test_optional_values() {
        let config = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "tok"),
            ("GROQ_API_KEY", "gsk"),
            ("ALLOWED_USER_ID", " 42 "),
            ("GUILD_ID", "1234"),
            ("GROQ_BASE_URL", "http://localhost:9000/"),
            ("MAX_VOICE_BYTES", "1048576"),
            ("TRANSCRIBE_TIMEOUT_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.allowed_user_id.as_deref(), Some("42"));
        assert_eq!(config.guild_id, Some(1234));
        assert_eq!(config.groq_base_url, "http://localhost:9000");
        assert_eq!(config.max_voice_bytes, Some(1_048_576));
        assert_eq!(config.transcribe_timeout, None);

        let err = Config::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "tok"),
            ("GROQ_API_KEY", "gsk"),
            ("GUILD_ID", "abc"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k, _) if k == "GUILD_ID"));
    }
}
