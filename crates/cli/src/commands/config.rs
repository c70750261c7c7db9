use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use printquote_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let file_path = detect_config_path();
    let file_doc = load_config_file_doc(file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, file_doc.as_ref(), file_path.as_deref())
    };

    let admin_token = match &config.server.admin_token {
        Some(token) => redact_token(token.expose_secret()),
        None => "<unset>".to_string(),
    };

    let entries = [
        ("database.url", config.database.url.clone(), &["PRINTQUOTE_DATABASE_URL"][..]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["PRINTQUOTE_DATABASE_MAX_CONNECTIONS"][..],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["PRINTQUOTE_DATABASE_TIMEOUT_SECS"][..],
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["PRINTQUOTE_SERVER_BIND_ADDRESS"][..],
        ),
        (
            "server.port",
            config.server.port.to_string(),
            &["PRINTQUOTE_SERVER_PORT", "PRINTQUOTE_PORT"][..],
        ),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["PRINTQUOTE_SERVER_GRACEFUL_SHUTDOWN_SECS"][..],
        ),
        ("server.admin_token", admin_token, &["PRINTQUOTE_SERVER_ADMIN_TOKEN"][..]),
        (
            "app.env",
            format!("{:?}", config.app.env).to_ascii_lowercase(),
            &["PRINTQUOTE_APP_ENV", "PRINTQUOTE_ENV"][..],
        ),
        (
            "app.run_migrations_on_start",
            config.app.run_migrations_on_start.to_string(),
            &["PRINTQUOTE_APP_RUN_MIGRATIONS_ON_START"][..],
        ),
        (
            "app.seed_on_start",
            config.app.seed_on_start.to_string(),
            &["PRINTQUOTE_APP_SEED_ON_START"][..],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["PRINTQUOTE_LOGGING_LEVEL", "PRINTQUOTE_LOG_LEVEL"][..],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["PRINTQUOTE_LOGGING_FORMAT", "PRINTQUOTE_LOG_FORMAT"][..],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        entries
            .iter()
            .map(|(key, value, env_keys)| render_line(key, value, source(*key, *env_keys))),
    );
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("printquote.toml"), PathBuf::from("config/printquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
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

/// Keeps at most the first four characters so operators can tell tokens apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.chars().count() <= 8 {
        return "<redacted>".to_string();
    }
    let visible: String = trimmed.chars().take(4).collect();
    format!("{visible}***")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use toml::Value;

    use super::{contains_path, field_source, redact_token};

    #[test]
    fn tokens_are_never_printed_in_full() {
        assert_eq!(redact_token("admin-secret-value"), "admi***");
        assert_eq!(redact_token("short"), "<redacted>");
        assert_eq!(redact_token("   "), "<empty>");
    }

    #[test]
    fn file_keys_are_attributed_to_the_file() {
        let doc: Value = "[server]\nport = 9000\n".parse().expect("toml");

        assert!(contains_path(&doc, "server.port"));
        assert!(!contains_path(&doc, "server.bind_address"));
        assert_eq!(
            field_source(
                "server.port",
                &["PRINTQUOTE_TEST_NEVER_SET"],
                Some(&doc),
                Some(Path::new("printquote.toml"))
            ),
            "file (printquote.toml)"
        );
        assert_eq!(
            field_source("logging.level", &["PRINTQUOTE_TEST_NEVER_SET"], Some(&doc), None),
            "default"
        );
    }
}
