use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use movequote_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let admin_ids = config
        .admin
        .user_ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let fields: Vec<(&str, String, &str)> = vec![
        (
            "rates.sheet_url",
            config.rates.sheet_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            "MOVEQUOTE_RATES_SHEET_URL",
        ),
        (
            "rates.document_url",
            config.rates.document_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            "MOVEQUOTE_RATES_DOCUMENT_URL",
        ),
        (
            "rates.fallback_path",
            config.rates.fallback_path.display().to_string(),
            "MOVEQUOTE_RATES_FALLBACK_PATH",
        ),
        (
            "rates.fetch_timeout_secs",
            config.rates.fetch_timeout_secs.to_string(),
            "MOVEQUOTE_RATES_FETCH_TIMEOUT_SECS",
        ),
        ("session.timeout_secs", config.session.timeout_secs.to_string(), "MOVEQUOTE_SESSION_TIMEOUT_SECS"),
        (
            "session.sweep_interval_secs",
            config.session.sweep_interval_secs.to_string(),
            "MOVEQUOTE_SESSION_SWEEP_INTERVAL_SECS",
        ),
        (
            "admin.user_ids",
            if admin_ids.is_empty() { "<none>".to_string() } else { admin_ids },
            "MOVEQUOTE_ADMIN_USER_IDS",
        ),
        (
            "chat.bot_token",
            redact_token(config.chat.bot_token.expose_secret()),
            "MOVEQUOTE_CHAT_BOT_TOKEN",
        ),
        ("chat.currency_label", config.chat.currency_label.clone(), "MOVEQUOTE_CHAT_CURRENCY_LABEL"),
        ("server.bind_address", config.server.bind_address.clone(), "MOVEQUOTE_SERVER_BIND_ADDRESS"),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            "MOVEQUOTE_SERVER_HEALTH_CHECK_PORT",
        ),
        ("logging.level", config.logging.level.clone(), "MOVEQUOTE_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "MOVEQUOTE_LOGGING_FORMAT"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in fields {
        let source = field_source(
            key,
            Some(env_key),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    ["movequote.toml", "config/movequote.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Bot tokens look like `<bot id>:<secret>`; only the id is shown.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((bot_id, _)) = trimmed.split_once(':') {
        return format!("{bot_id}:***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, redact_token};

    #[test]
    fn tokens_keep_only_the_bot_id() {
        assert_eq!(redact_token("123456:AAE-secret"), "123456:***");
        assert_eq!(redact_token("opaque"), "<redacted>");
        assert_eq!(redact_token("  "), "<empty>");
    }

    #[test]
    fn nested_keys_are_found_in_config_documents() {
        let doc = "[rates]\nsheet_url = \"https://example.com\"\n".parse::<Value>().expect("toml");
        assert!(contains_path(&doc, "rates.sheet_url"));
        assert!(!contains_path(&doc, "rates.document_url"));
    }
}
