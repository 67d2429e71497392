use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub recommend: RecommendConfig,
    pub llm: LLMConfig,
    pub catalog: CatalogConfig,
    pub pacing: PacingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    pub target_new_songs: usize,
    pub max_attempts: usize,
    pub max_seed_songs: usize,
    pub latest_playlist_name: String,
    pub all_time_playlist_name: String,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            target_new_songs: 20,
            max_attempts: 10,
            max_seed_songs: 200,
            latest_playlist_name: "New Gemini Recommendations".to_string(),
            all_time_playlist_name: "All Gemini Recommendations".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            model: "google/gemini-2.5-flash-preview".to_string(),
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub api_base: String,
    pub accounts_base: String,
    pub token_cache_path: String,
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com/v1".to_string(),
            accounts_base: "https://accounts.spotify.com".to_string(),
            token_cache_path: ".spotify_cache".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Courtesy delays for third-party rate limits. Zero disables a delay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub catalog_delay_ms: u64,
    pub batch_delay_ms: u64,
    pub attempt_pause_ms: u64,
    pub failure_backoff_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            catalog_delay_ms: 50,
            batch_delay_ms: 100,
            attempt_pause_ms: 2000,
            failure_backoff_ms: 3000,
        }
    }
}

impl PacingConfig {
    /// No delays at all, for tests and burst-tolerant collaborators.
    pub fn none() -> Self {
        Self {
            catalog_delay_ms: 0,
            batch_delay_ms: 0,
            attempt_pause_ms: 0,
            failure_backoff_ms: 0,
        }
    }

    pub fn catalog_delay(&self) -> Duration {
        Duration::from_millis(self.catalog_delay_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn attempt_pause(&self) -> Duration {
        Duration::from_millis(self.attempt_pause_ms)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Secrets that must come from the environment (or `.env`).
#[derive(Debug, Clone)]
pub struct Credentials {
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    pub openrouter_api_key: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Config::builder()
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recommend.target_new_songs == 0 {
            return Err(ConfigError::Message(
                "recommend.target_new_songs must be at least 1".to_string(),
            ));
        }
        if self.recommend.max_attempts == 0 {
            return Err(ConfigError::Message(
                "recommend.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn credentials() -> Result<Credentials> {
        Credentials::from_lookup(|name| env::var(name).ok())
    }
}

impl Credentials {
    pub const REQUIRED: [&'static str; 4] = [
        "SPOTIPY_CLIENT_ID",
        "SPOTIPY_CLIENT_SECRET",
        "SPOTIPY_REDIRECT_URI",
        "OPENROUTER_API_KEY",
    ];

    /// Resolve every required variable, reporting all missing names at once.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut values = Vec::with_capacity(Self::REQUIRED.len());
        let mut missing = Vec::new();

        for name in Self::REQUIRED {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                Some(value) => values.push(value),
                None => missing.push(name),
            }
        }

        if !missing.is_empty() {
            return Err(anyhow::anyhow!(
                "Missing environment variables: {}. Please check your .env file",
                missing.join(", ")
            ));
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            spotify_client_id: next(),
            spotify_client_secret: next(),
            spotify_redirect_uri: next(),
            openrouter_api_key: next(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.recommend.target_new_songs, 20);
        assert_eq!(settings.recommend.max_attempts, 10);
        assert_eq!(settings.recommend.max_seed_songs, 200);
        assert_eq!(settings.llm.timeout_secs, 60);
        assert_eq!(settings.pacing.failure_backoff(), Duration::from_secs(3));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_target_rejected() {
        let mut settings = Settings::default();
        settings.recommend.target_new_songs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_credentials_all_present() {
        let env: HashMap<&str, &str> = [
            ("SPOTIPY_CLIENT_ID", "id"),
            ("SPOTIPY_CLIENT_SECRET", "secret"),
            ("SPOTIPY_REDIRECT_URI", "http://127.0.0.1:8888/callback"),
            ("OPENROUTER_API_KEY", "sk-or"),
        ]
        .into_iter()
        .collect();

        let creds = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.spotify_client_id, "id");
        assert_eq!(creds.spotify_client_secret, "secret");
        assert_eq!(creds.openrouter_api_key, "sk-or");
    }

    #[test]
    fn test_credentials_report_every_missing_name() {
        let env: HashMap<&str, &str> = [("SPOTIPY_CLIENT_ID", "id"), ("OPENROUTER_API_KEY", " ")]
            .into_iter()
            .collect();

        let err = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string()))
            .unwrap_err()
            .to_string();
        assert!(err.contains("SPOTIPY_CLIENT_SECRET"));
        assert!(err.contains("SPOTIPY_REDIRECT_URI"));
        assert!(err.contains("OPENROUTER_API_KEY"));
        assert!(!err.contains("SPOTIPY_CLIENT_ID"));
    }
}
