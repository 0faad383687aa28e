//! Configuration and settings management
//!
//! Loads settings from environment variables (and optional config files) and
//! defines runtime constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Default base URL used to build poster image links
pub const DEFAULT_TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Telegram Bot API token
    #[serde(default)]
    pub telegram_bot_token: String,

    /// Base URL of the Overseerr instance
    #[serde(default)]
    pub overseerr_url: String,

    /// Overseerr API key sent in the `X-Api-Key` header
    #[serde(default)]
    pub overseerr_api_key: String,

    /// Base URL for poster images
    #[serde(default = "default_tmdb_image_base")]
    pub tmdb_image_base: String,

    /// Raw `REQUEST_4K` flag
    #[serde(rename = "request_4k")]
    pub request_4k_str: Option<String>,

    /// Optional Telegram user ID the bot is restricted to
    #[serde(rename = "owner_telegram_user_id")]
    pub owner_user_id_str: Option<String>,
}

fn default_tmdb_image_base() -> String {
    DEFAULT_TMDB_IMAGE_BASE.to_string()
}

/// Who is allowed to talk to the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAccess {
    /// No owner restriction configured
    Everyone,
    /// Only the configured owner
    Owner(i64),
    /// An owner was configured but could not be parsed, so nobody is allowed
    Nobody,
}

impl UserAccess {
    /// Returns true if the given Telegram user may use the bot
    #[must_use]
    pub const fn allows(self, user_id: i64) -> bool {
        match self {
            Self::Everyone => true,
            Self::Owner(owner) => owner == user_id,
            Self::Nobody => false,
        }
    }
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use overseerr_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required value is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = build_config()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every required value is present
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` listing the missing variables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing: Vec<&str> = [
            ("TELEGRAM_BOT_TOKEN", self.telegram_bot_token.trim()),
            ("OVERSEERR_URL", self.overseerr_base_url()),
            ("OVERSEERR_API_KEY", self.overseerr_api_key.trim()),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(format!(
                "Missing required env vars: {}",
                missing.join(", ")
            )))
        }
    }

    /// Overseerr base URL without a trailing slash
    #[must_use]
    pub fn overseerr_base_url(&self) -> &str {
        self.overseerr_url.trim().trim_end_matches('/')
    }

    /// Poster image base URL without a trailing slash
    #[must_use]
    pub fn image_base_url(&self) -> &str {
        self.tmdb_image_base.trim().trim_end_matches('/')
    }

    /// Whether requests should be created as 4K requests
    #[must_use]
    pub fn request_4k(&self) -> bool {
        self.request_4k_str.as_deref().is_some_and(|raw| {
            matches!(
                raw.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "y"
            )
        })
    }

    /// Resolves the owner restriction
    #[must_use]
    pub fn user_access(&self) -> UserAccess {
        match self.owner_user_id_str.as_deref().map(str::trim) {
            None | Some("") => UserAccess::Everyone,
            Some(raw) => raw
                .parse::<i64>()
                .map_or(UserAccess::Nobody, UserAccess::Owner),
        }
    }
}

/// Builds the layered configuration source.
///
/// # Errors
///
/// Returns a `ConfigError` if any source fails to load.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        // Eg.. `APP__OVERSEERR_URL=... ./target/app`
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Plain UPPER_SNAKE_CASE variables map onto snake_case keys
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// Default timeout for Overseerr HTTP calls (seconds)
pub const OVERSEERR_HTTP_TIMEOUT_SECS: u64 = 30;

/// Get the Overseerr HTTP timeout from env or default.
///
/// Environment variable: `OVERSEERR_HTTP_TIMEOUT_SECS`.
#[must_use]
pub fn get_overseerr_http_timeout_secs() -> u64 {
    std::env::var("OVERSEERR_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(OVERSEERR_HTTP_TIMEOUT_SECS)
}

// Telegram API retry configuration
/// Initial backoff between Telegram send attempts
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound for the Telegram backoff
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Total Telegram call attempts, the first one included
pub const TELEGRAM_API_MAX_ATTEMPTS: usize = 3;

/// Cooldown period (seconds) between "restricted" replies for same user.
/// Default: 20 minutes.
pub const UNAUTHORIZED_COOLDOWN_SECS: u64 = 1200;
/// Time-to-live (seconds) for cache entries.
/// Default: 2 hours.
pub const UNAUTHORIZED_CACHE_TTL_SECS: u64 = 7200;
/// Maximum cache capacity (number of entries).
pub const UNAUTHORIZED_CACHE_MAX_SIZE: u64 = 10_000;

/// Get unauthorized cooldown from env or default.
///
/// Environment variable: `UNAUTHORIZED_COOLDOWN_SECS`.
#[must_use]
pub fn get_unauthorized_cooldown() -> u64 {
    std::env::var("UNAUTHORIZED_COOLDOWN_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(UNAUTHORIZED_COOLDOWN_SECS)
}

/// Get unauthorized cache TTL from env or default.
///
/// Environment variable: `UNAUTHORIZED_CACHE_TTL_SECS`.
#[must_use]
pub fn get_unauthorized_cache_ttl() -> u64 {
    std::env::var("UNAUTHORIZED_CACHE_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(UNAUTHORIZED_CACHE_TTL_SECS)
}

/// Get unauthorized cache max size from env or default.
///
/// Environment variable: `UNAUTHORIZED_CACHE_MAX_SIZE`.
#[must_use]
pub fn get_unauthorized_cache_max_size() -> u64 {
    std::env::var("UNAUTHORIZED_CACHE_MAX_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(UNAUTHORIZED_CACHE_MAX_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn complete_settings() -> Settings {
        Settings {
            telegram_bot_token: "123:abc".to_string(),
            overseerr_url: "https://overseerr.local/".to_string(),
            overseerr_api_key: "key".to_string(),
            tmdb_image_base: "https://image.tmdb.org/t/p/w500/".to_string(),
            request_4k_str: None,
            owner_user_id_str: None,
        }
    }

    // The only test touching the process environment
    #[test]
    fn test_config_env_loading() -> Result<(), Box<dyn std::error::Error>> {
        env::set_var("TELEGRAM_BOT_TOKEN", "dummy_token");
        env::set_var("OVERSEERR_URL", "https://seerr.example.com/");
        env::set_var("OVERSEERR_API_KEY", "secret");
        env::set_var("REQUEST_4K", "Yes");
        env::set_var("OWNER_TELEGRAM_USER_ID", "42");

        let settings = Settings::new()?;
        assert_eq!(settings.overseerr_base_url(), "https://seerr.example.com");
        assert!(settings.request_4k());
        assert_eq!(settings.user_access(), UserAccess::Owner(42));
        assert_eq!(settings.image_base_url(), DEFAULT_TMDB_IMAGE_BASE);

        env::remove_var("OVERSEERR_API_KEY");
        let err = Settings::new().err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("OVERSEERR_API_KEY"), "unexpected error: {err}");

        env::remove_var("TELEGRAM_BOT_TOKEN");
        env::remove_var("OVERSEERR_URL");
        env::remove_var("REQUEST_4K");
        env::remove_var("OWNER_TELEGRAM_USER_ID");
        Ok(())
    }

    #[test]
    fn test_validate_lists_all_missing() {
        let settings = Settings {
            overseerr_url: "/".to_string(),
            ..Settings::default()
        };
        let Err(err) = settings.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(
            err.to_string(),
            "Missing required env vars: TELEGRAM_BOT_TOKEN, OVERSEERR_URL, OVERSEERR_API_KEY"
        );
        assert!(complete_settings().validate().is_ok());
    }

    #[test]
    fn test_request_4k_parsing() {
        let mut settings = complete_settings();
        assert!(!settings.request_4k());

        for raw in ["1", "true", "TRUE", " yes ", "y"] {
            settings.request_4k_str = Some(raw.to_string());
            assert!(settings.request_4k(), "{raw} should enable 4K");
        }
        for raw in ["0", "false", "no", "", "maybe"] {
            settings.request_4k_str = Some(raw.to_string());
            assert!(!settings.request_4k(), "{raw} should not enable 4K");
        }
    }

    #[test]
    fn test_user_access() {
        let mut settings = complete_settings();
        assert_eq!(settings.user_access(), UserAccess::Everyone);
        assert!(settings.user_access().allows(1));

        settings.owner_user_id_str = Some("777".to_string());
        assert!(settings.user_access().allows(777));
        assert!(!settings.user_access().allows(778));

        settings.owner_user_id_str = Some("not-a-number".to_string());
        assert_eq!(settings.user_access(), UserAccess::Nobody);
        assert!(!settings.user_access().allows(777));
    }

    #[test]
    fn test_urls_trimmed() {
        let settings = complete_settings();
        assert_eq!(settings.overseerr_base_url(), "https://overseerr.local");
        assert_eq!(
            settings.image_base_url(),
            "https://image.tmdb.org/t/p/w500"
        );
    }
}
