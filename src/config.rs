use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::duration::deserialize_duration;
use crate::notify::parse_channel_list;
use crate::valuation::ConversionRate;

/// Environment variable that overrides `notifications.channels`.
pub const NOTIFICATION_METHODS_ENV: &str = "NOTIFICATION_METHODS";

fn default_reporting_currency() -> String {
    "BGN".to_string()
}

/// Fixed USD to BGN peg.
fn default_usd_rate() -> Decimal {
    Decimal::new(17346, 4)
}

fn default_holdings_path() -> PathBuf {
    PathBuf::from("holdings.json")
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("schedule.hour must be between 0 and 23, got {0}")]
    InvalidHour(u32),

    #[error("schedule.minute must be between 0 and 59, got {0}")]
    InvalidMinute(u32),

    #[error("usd_rate must be positive, got {0}")]
    InvalidRate(Decimal),
}

/// Daily fire time, in local wall-clock time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub hour: u32,
    pub minute: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: 8,
            minute: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Decimal places used when printing reporting-currency amounts.
    pub currency_decimals: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_decimals: 2,
        }
    }
}

fn default_request_timeout() -> std::time::Duration {
    crate::sources::DEFAULT_REQUEST_TIMEOUT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerageConfig {
    /// Use the live Trading212 API instead of the demo one.
    pub live: bool,
    pub base_url: Option<String>,
    /// Currency the account is held in.
    pub account_currency: Option<String>,
    pub api_key_env: String,
}

impl Default for BrokerageConfig {
    fn default() -> Self {
        Self {
            live: false,
            base_url: None,
            account_currency: None,
            api_key_env: "TRADING212_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    pub base_url: Option<String>,
    pub api_key_env: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: "CMC_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BullionConfig {
    pub base_url: Option<String>,
    pub api_key_env: String,
}

impl Default for BullionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: "BULLION_API_KEY".to_string(),
        }
    }
}

/// Valuation source settings. API keys are read from the named environment
/// variables, never from this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: std::time::Duration,
    pub brokerage: BrokerageConfig,
    pub crypto: CryptoConfig,
    pub bullion: BullionConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            brokerage: BrokerageConfig::default(),
            crypto: CryptoConfig::default(),
            bullion: BullionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Falls back to `TELEGRAM_CHAT_ID`.
    pub chat_id: Option<String>,
    pub base_url: Option<String>,
    pub bot_token_env: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            chat_id: None,
            base_url: None,
            bot_token_env: "TELEGRAM_BOT_TOKEN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    /// Falls back to `TWILIO_ACCOUNT_SID`.
    pub account_sid: Option<String>,
    /// Falls back to `TWILIO_FROM_NUMBER`.
    pub from: Option<String>,
    /// Falls back to `TWILIO_TO_NUMBER`.
    pub to: Option<String>,
    pub base_url: Option<String>,
    pub auth_token_env: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            from: None,
            to: None,
            base_url: None,
            auth_token_env: "TWILIO_AUTH_TOKEN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Falls back to `SMTP_HOST`.
    pub host: Option<String>,
    /// Falls back to `SMTP_PORT`, then 587.
    pub port: Option<u16>,
    /// Falls back to `SMTP_USERNAME`.
    pub username: Option<String>,
    /// Falls back to `FROM_EMAIL`, then to `username`.
    pub from: Option<String>,
    /// Falls back to `TO_EMAIL`, then to `from`.
    pub to: Option<String>,
    pub password_env: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            username: None,
            from: None,
            to: None,
            password_env: "SMTP_PASSWORD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Channels in dispatch order. Overridden by `NOTIFICATION_METHODS`.
    pub channels: Vec<String>,
    pub telegram: TelegramConfig,
    pub sms: SmsConfig,
    pub email: EmailConfig,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            channels: vec![crate::notify::DEFAULT_CHANNEL.to_string()],
            telegram: TelegramConfig::default(),
            sms: SmsConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl NotificationsConfig {
    /// Configured channel names, with `override_list` (the raw value of
    /// `NOTIFICATION_METHODS`) taking precedence when set.
    pub fn resolve_channels(&self, override_list: Option<&str>) -> Vec<String> {
        match override_list {
            Some(raw) if !raw.trim().is_empty() => parse_channel_list(raw),
            _ => parse_channel_list(&self.channels.join(",")),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// Holdings file. If relative, resolved from config file location.
    #[serde(default = "default_holdings_path")]
    pub holdings_path: PathBuf,

    #[serde(default = "default_reporting_currency")]
    pub reporting_currency: String,

    /// Multiplier from USD to the reporting currency.
    #[serde(default = "default_usd_rate")]
    pub usd_rate: Decimal,

    pub schedule: ScheduleConfig,
    pub display: DisplayConfig,
    pub sources: SourcesConfig,
    pub notifications: NotificationsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            holdings_path: default_holdings_path(),
            reporting_currency: default_reporting_currency(),
            usd_rate: default_usd_rate(),
            schedule: ScheduleConfig::default(),
            display: DisplayConfig::default(),
            sources: SourcesConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.hour > 23 {
            return Err(ConfigError::InvalidHour(self.schedule.hour));
        }
        if self.schedule.minute > 59 {
            return Err(ConfigError::InvalidMinute(self.schedule.minute));
        }
        ConversionRate::new(self.usd_rate).map_err(|_| ConfigError::InvalidRate(self.usd_rate))?;
        Ok(())
    }

    fn resolve_path(path: &Path, config_dir: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            config_dir.join(path)
        }
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) => Self::resolve_path(data_dir, config_dir),
            None => config_dir.to_path_buf(),
        }
    }

    fn resolve(self, config_dir: &Path) -> Result<ResolvedConfig> {
        self.validate()?;
        let usd_rate = ConversionRate::new(self.usd_rate)?;

        Ok(ResolvedConfig {
            data_dir: self.resolve_data_dir(config_dir),
            holdings_path: Self::resolve_path(&self.holdings_path, config_dir),
            reporting_currency: self.reporting_currency.trim().to_uppercase(),
            usd_rate,
            schedule: self.schedule,
            display: self.display,
            sources: self.sources,
            notifications: self.notifications,
        })
    }
}

/// Loaded and validated configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub holdings_path: PathBuf,
    pub reporting_currency: String,
    pub usd_rate: ConversionRate,
    pub schedule: ScheduleConfig,
    pub display: DisplayConfig,
    pub sources: SourcesConfig,
    pub notifications: NotificationsConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./worthwatch.toml` if it exists in current directory
/// 2. `~/.local/share/worthwatch/worthwatch.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("worthwatch.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("worthwatch").join("worthwatch.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// Relative paths are resolved against the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        Config::load(&config_path)?
            .resolve(config_dir)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, the intended config directory is used as the base for
    /// relative paths.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Config::default().resolve(config_dir)
    }

    /// Channel names in dispatch order, honoring `NOTIFICATION_METHODS`.
    pub fn notification_channels(&self) -> Vec<String> {
        let override_list = std::env::var(NOTIFICATION_METHODS_ENV).ok();
        self.notifications
            .resolve_channels(override_list.as_deref())
    }
}
