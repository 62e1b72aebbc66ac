use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::flows::session::DEFAULT_SESSION_TIMEOUT_SECS;
use crate::pricing::DEFAULT_CURRENCY;

const CONFIG_FILE_CANDIDATES: [&str; 2] = ["movequote.toml", "config/movequote.toml"];

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub rates: RatesConfig,
    pub session: SessionConfig,
    pub admin: AdminConfig,
    pub chat: ChatConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Where rate tables come from. Sources are tried sheet, then document, then the local file.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    pub sheet_url: Option<String>,
    pub document_url: Option<String>,
    pub fallback_path: PathBuf,
    pub fetch_timeout_secs: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            sheet_url: None,
            document_url: None,
            fallback_path: PathBuf::from("prices.json"),
            fetch_timeout_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS, sweep_interval_secs: 60 }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub user_ids: Vec<i64>,
}

impl AdminConfig {
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.user_ids.contains(&user_id)
    }
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub bot_token: SecretString,
    pub currency_label: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { bot_token: String::new().into(), currency_label: DEFAULT_CURRENCY.to_string() }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1".to_string(), health_check_port: 8080, graceful_shutdown_secs: 15 }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

/// Values set by the embedding program; they win over the file and the environment.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub rates_fallback_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl AppConfig {
    /// Layers defaults, the TOML file, `MOVEQUOTE_*` variables and `options.overrides`, then validates.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = match find_config_file(options.config_path.as_deref()) {
            Some(path) => read_config_file(&path)?,
            None => Self::default(),
        };

        config.apply_env()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn has_bot_token(&self) -> bool {
        !self.chat.bot_token.expose_secret().trim().is_empty()
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = env_value("MOVEQUOTE_RATES_SHEET_URL")? {
            self.rates.sheet_url = Some(url);
        }
        if let Some(url) = env_value("MOVEQUOTE_RATES_DOCUMENT_URL")? {
            self.rates.document_url = Some(url);
        }
        set_from_env(&mut self.rates.fallback_path, "MOVEQUOTE_RATES_FALLBACK_PATH")?;
        set_from_env(&mut self.rates.fetch_timeout_secs, "MOVEQUOTE_RATES_FETCH_TIMEOUT_SECS")?;

        set_from_env(&mut self.session.timeout_secs, "MOVEQUOTE_SESSION_TIMEOUT_SECS")?;
        set_from_env(&mut self.session.sweep_interval_secs, "MOVEQUOTE_SESSION_SWEEP_INTERVAL_SECS")?;

        if let Some(raw) = read_env("MOVEQUOTE_ADMIN_USER_IDS") {
            self.admin.user_ids = parse_id_list("MOVEQUOTE_ADMIN_USER_IDS", &raw)?;
        }

        if let Some(token) = read_env("MOVEQUOTE_CHAT_BOT_TOKEN") {
            self.chat.bot_token = token.into();
        }
        set_from_env(&mut self.chat.currency_label, "MOVEQUOTE_CHAT_CURRENCY_LABEL")?;

        set_from_env(&mut self.server.bind_address, "MOVEQUOTE_SERVER_BIND_ADDRESS")?;
        set_from_env(&mut self.server.health_check_port, "MOVEQUOTE_SERVER_HEALTH_CHECK_PORT")?;
        set_from_env(&mut self.server.graceful_shutdown_secs, "MOVEQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS")?;

        set_from_env(&mut self.logging.level, "MOVEQUOTE_LOGGING_LEVEL")?;
        if let Some(raw) = read_env("MOVEQUOTE_LOGGING_FORMAT") {
            self.logging.format = raw.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(path) = overrides.rates_fallback_path {
            self.rates.fallback_path = path;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_rates(&self.rates)?;
        validate_session(&self.session)?;
        validate_chat(&self.chat)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// An explicit path that does not exist falls back to defaults rather than failing.
fn find_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then(|| path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let file: ConfigFile = toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })?;
    Ok(file.into())
}

/// On-disk layout. Sections and keys are optional; anything missing keeps its default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    rates: RatesConfig,
    session: SessionConfig,
    admin: AdminConfig,
    chat: ChatSection,
    server: ServerConfig,
    logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatSection {
    bot_token: Option<String>,
    currency_label: Option<String>,
}

impl From<ConfigFile> for AppConfig {
    fn from(file: ConfigFile) -> Self {
        let mut chat = ChatConfig::default();
        if let Some(token) = file.chat.bot_token {
            chat.bot_token = token.into();
        }
        if let Some(label) = file.chat.currency_label {
            chat.currency_label = label;
        }

        Self {
            rates: file.rates,
            session: file.session,
            admin: file.admin,
            chat,
            server: file.server,
            logging: file.logging,
        }
    }
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{field} must start with http:// or https://")))
    }
}

fn validate_rates(rates: &RatesConfig) -> Result<(), ConfigError> {
    if let Some(url) = &rates.sheet_url {
        validate_url("rates.sheet_url", url.trim())?;
    }
    if let Some(url) = &rates.document_url {
        validate_url("rates.document_url", url.trim())?;
    }
    if rates.fallback_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("rates.fallback_path must not be empty".to_string()));
    }
    if !(1..=120).contains(&rates.fetch_timeout_secs) {
        return Err(ConfigError::Validation("rates.fetch_timeout_secs must be in range 1..=120".to_string()));
    }
    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.timeout_secs == 0 {
        return Err(ConfigError::Validation("session.timeout_secs must be greater than zero".to_string()));
    }
    if session.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "session.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_chat(chat: &ChatConfig) -> Result<(), ConfigError> {
    if chat.currency_label.trim().is_empty() {
        return Err(ConfigError::Validation("chat.currency_label must not be empty".to_string()));
    }
    if chat.bot_token.expose_secret().chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "chat.bot_token must not contain whitespace; paste it exactly as the bot platform issued it"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation("server.health_check_port must be greater than zero".to_string()));
    }
    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    match logging.level.trim().to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_value<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    read_env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: raw.clone() })
        })
        .transpose()
}

fn set_from_env<T: FromStr>(target: &mut T, key: &str) -> Result<(), ConfigError> {
    if let Some(value) = env_value(key)? {
        *target = value;
    }
    Ok(())
}

fn parse_id_list(key: &str, value: &str) -> Result<Vec<i64>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}
