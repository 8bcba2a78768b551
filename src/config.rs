//! Configuration and settings management
//!
//! Raw settings are layered from optional config files and environment
//! variables, then validated into an immutable [`BotConfig`].

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use teloxide::types::{ChatId, Recipient};
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Environment variable holding the Telegram Bot API token.
pub const TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable holding the mini-app URL.
pub const WEBAPP_URL_VAR: &str = "WEBAPP_URL";
/// Environment variable holding the administrator chat identifier.
pub const ADMIN_ID_VAR: &str = "ADMIN_ID";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required setting is absent or blank.
    #[error("required setting {0} is not set")]
    Missing(&'static str),
    /// A setting is present but cannot be used.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Environment variable name of the offending setting.
        name: &'static str,
        /// Human-readable reason.
        reason: String,
    },
    /// The underlying config sources could not be read.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Raw settings as read from config files and the environment.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Telegram Bot API token (`TELEGRAM_BOT_TOKEN`)
    pub telegram_bot_token: Option<String>,
    /// Mini-app URL opened by the start button (`WEBAPP_URL`)
    pub webapp_url: Option<String>,
    /// Administrator chat id or `@channel` (`ADMIN_ID`)
    pub admin_id: Option<String>,
}

/// Build the layered configuration source.
///
/// # Errors
///
/// Returns a `ConfigError` if a present config file cannot be parsed.
pub fn build_config() -> Result<Config, config::ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        // Eg. `APP__ADMIN_ID=123 ./target/app`
        .add_source(Environment::with_prefix("APP").separator("__"))
        // TELEGRAM_BOT_TOKEN -> telegram_bot_token
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl Settings {
    /// Load settings from config files and environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError::Load` if the sources cannot be read.
    pub fn new() -> Result<Self, SettingsError> {
        Self::from_config(build_config()?)
    }

    /// Deserialize settings from an already built [`Config`].
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError::Load` if deserialization fails.
    pub fn from_config(config: Config) -> Result<Self, SettingsError> {
        Ok(config.try_deserialize()?)
    }

    /// Validate the raw settings into a [`BotConfig`].
    ///
    /// The token is checked first so a missing token is always reported
    /// as such, whatever else is wrong.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Missing` for absent required settings and
    /// `SettingsError::Invalid` for unusable values.
    pub fn validate(self) -> Result<BotConfig, SettingsError> {
        let telegram_token = required(self.telegram_bot_token, TOKEN_VAR)?;
        let webapp_url = parse_webapp_url(&required(self.webapp_url, WEBAPP_URL_VAR)?)?;
        let admin_chat = parse_admin_chat(&required(self.admin_id, ADMIN_ID_VAR)?)?;

        Ok(BotConfig {
            telegram_token,
            webapp_url,
            admin_chat,
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, SettingsError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(SettingsError::Missing(name))
}

/// Parse the mini-app URL.
///
/// Telegram clients only open `https` web apps, but plain `http` is still
/// accepted (with a warning) so local tunnels keep working.
///
/// # Errors
///
/// Returns `SettingsError::Invalid` if the value is not an absolute URL.
pub fn parse_webapp_url(raw: &str) -> Result<Url, SettingsError> {
    let url = Url::parse(raw).map_err(|e| SettingsError::Invalid {
        name: WEBAPP_URL_VAR,
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "https" => {}
        "http" => warn!("{WEBAPP_URL_VAR} uses plain http; Telegram clients require https"),
        other => {
            return Err(SettingsError::Invalid {
                name: WEBAPP_URL_VAR,
                reason: format!("unsupported scheme '{other}'"),
            })
        }
    }

    Ok(url)
}

/// Parse the administrator destination.
///
/// Accepts a numeric chat id (negative for groups and channels) or a
/// public `@channelusername`.
///
/// # Errors
///
/// Returns `SettingsError::Invalid` for anything else.
pub fn parse_admin_chat(raw: &str) -> Result<Recipient, SettingsError> {
    let raw = raw.trim();

    if let Ok(id) = raw.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }

    if let Some(name) = raw.strip_prefix('@') {
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Ok(Recipient::ChannelUsername(raw.to_string()));
        }
    }

    Err(SettingsError::Invalid {
        name: ADMIN_ID_VAR,
        reason: format!("'{raw}' is neither a chat id nor an @username"),
    })
}

/// Validated, immutable configuration shared by all handlers.
#[derive(Clone)]
pub struct BotConfig {
    /// Telegram Bot API token
    pub telegram_token: String,
    /// Mini-app opened by the start button
    pub webapp_url: Url,
    /// Destination of relayed submissions
    pub admin_chat: Recipient,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("telegram_token", &"[TELEGRAM_TOKEN]")
            .field("webapp_url", &self.webapp_url.as_str())
            .field("admin_chat", &self.admin_chat)
            .finish()
    }
}
