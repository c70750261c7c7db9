use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "PRINTQUOTE_";
const DOTENV_FILE: &str = ".env";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub app: RuntimeConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    /// When set, `/api/admin/*` requires a matching `x-admin-token` header.
    pub admin_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub env: AppEnv,
    pub run_migrations_on_start: bool,
    pub seed_on_start: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppEnv {
    Dev,
    Prod,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub env: Option<AppEnv>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    /// Dotenv file read before the environment layer; `.env` in the working
    /// directory when unset. A missing file is skipped.
    pub dotenv_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("could not load dotenv file `{path}`: {source}")]
    Dotenv { path: PathBuf, source: dotenvy::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://printquote.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
                admin_token: None,
            },
            app: RuntimeConfig {
                env: AppEnv::Dev,
                run_migrations_on_start: true,
                seed_on_start: true,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Dev),
            "prod" | "production" => Ok(Self::Prod),
            other => Err(ConfigError::Validation(format!(
                "unsupported app env `{other}` (expected dev|prod)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
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

impl AppConfig {
    /// Defaults, then the TOML file, then `PRINTQUOTE_*` variables (a dotenv
    /// file fills in the ones not already set), then programmatic overrides.
    /// The merged result is validated once at the end.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        load_dotenv(options.dotenv_path.as_deref().unwrap_or(Path::new(DOTENV_FILE)))?;

        if let Some(path) = resolve_config_path(options.config_path.as_deref()) {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("printquote.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn admin_token_matches(&self, candidate: Option<&str>) -> bool {
        match &self.server.admin_token {
            None => true,
            Some(expected) => candidate.is_some_and(|value| value == expected.expose_secret()),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(admin_token) = server.admin_token {
                self.server.admin_token = non_blank_secret(admin_token);
            }
        }

        if let Some(app) = patch.app {
            if let Some(app_env) = app.env {
                self.app.env = app_env;
            }
            if let Some(run_migrations_on_start) = app.run_migrations_on_start {
                self.app.run_migrations_on_start = run_migrations_on_start;
            }
            if let Some(seed_on_start) = app.seed_on_start {
                self.app.seed_on_start = seed_on_start;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port = read_env("SERVER_PORT").map(|value| ("SERVER_PORT", value));
        let port = port.or_else(|| read_env("PORT").map(|value| ("PORT", value)));
        if let Some((key, value)) = port {
            self.server.port = parse_env(key, &value)?;
        }
        if let Some(value) = read_env("SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("SERVER_ADMIN_TOKEN") {
            self.server.admin_token = non_blank_secret(value);
        }

        let app_env = read_env("APP_ENV").or_else(|| read_env("ENV"));
        if let Some(value) = app_env {
            self.app.env = value.parse()?;
        }
        if let Some(value) = read_env("APP_RUN_MIGRATIONS_ON_START") {
            self.app.run_migrations_on_start = parse_env("APP_RUN_MIGRATIONS_ON_START", &value)?;
        }
        if let Some(value) = read_env("APP_SEED_ON_START") {
            self.app.seed_on_start = parse_env("APP_SEED_ON_START", &value)?;
        }

        let log_level = read_env("LOGGING_LEVEL").or_else(|| read_env("LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("LOGGING_FORMAT").or_else(|| read_env("LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(app_env) = overrides.env {
            self.app.env = app_env;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server, self.app.env)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("printquote.toml"), PathBuf::from("config/printquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

/// Exports the file's variables without replacing ones already present.
fn load_dotenv(path: &Path) -> Result<(), ConfigError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(error) if error.not_found() => Ok(()),
        Err(source) => Err(ConfigError::Dotenv { path: path.to_path_buf(), source }),
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || !matches!(chars.peek(), Some('{')) {
            output.push(ch);
            continue;
        }

        chars.next();
        let mut key = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(next) => key.push(next),
                None => return Err(ConfigError::UnterminatedInterpolation),
            }
        }

        let value =
            env::var(&key).map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
        output.push_str(&value);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig, app_env: AppEnv) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address is required".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if app_env == AppEnv::Prod && server.admin_token.is_none() {
        return Err(ConfigError::Validation(
            "server.admin_token is required when app.env is prod (set PRINTQUOTE_SERVER_ADMIN_TOKEN)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn non_blank_secret(value: String) -> Option<SecretString> {
    (!value.trim().is_empty()).then(|| SecretString::from(value))
}

fn read_env(suffix: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{suffix}")).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(suffix: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: format!("{ENV_PREFIX}{suffix}"),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    app: Option<AppPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    admin_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AppPatch {
    env: Option<AppEnv>,
    run_migrations_on_start: Option<bool>,
    seed_on_start: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, AppEnv, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn write_config(dir: &TempDir, contents: &str) -> Result<std::path::PathBuf, String> {
        let path = dir.path().join("printquote.toml");
        fs::write(&path, contents).map_err(|err| err.to_string())?;
        Ok(path)
    }

    #[test]
    fn defaults_are_valid_for_local_development() {
        let _guard = env_lock().lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let config = AppConfig::load(LoadOptions::default()).expect("defaults load");
        assert_eq!(config.app.env, AppEnv::Dev);
        assert_eq!(config.server.port, 8080);
        assert!(config.app.run_migrations_on_start);
        assert!(matches!(config.logging.format, LogFormat::Compact));
        assert!(config.admin_token_matches(None), "no token configured means open admin");
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PRINTQUOTE_DB", "sqlite://interpolated.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[database]
url = "${TEST_PRINTQUOTE_DB}"
"#,
            )?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            if config.database.url != "sqlite://interpolated.db" {
                return Err(format!("unexpected url {}", config.database.url));
            }
            Ok(())
        })();

        clear_vars(&["TEST_PRINTQUOTE_DB"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, "[database]\nurl = \"${PRINTQUOTE_TEST_UNSET_VAR}\"\n")?;

        match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Err(ConfigError::MissingEnvInterpolation { var })
                if var == "PRINTQUOTE_TEST_UNSET_VAR" =>
            {
                Ok(())
            }
            other => Err(format!("expected missing interpolation error, got {other:?}")),
        }
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRINTQUOTE_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("PRINTQUOTE_SERVER_PORT", "9090");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[database]
url = "sqlite://from-file.db"
max_connections = 3

[server]
port = 7000

[logging]
level = "warn"
format = "json"
"#,
            )?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            let checks = [
                (config.database.url == "sqlite://from-override.db", "override database url wins"),
                (
                    config.database.max_connections == 3,
                    "file value survives when nothing overrides",
                ),
                (config.server.port == 9090, "env port wins over file"),
                (config.logging.level == "debug", "override log level wins"),
                (config.logging.format == LogFormat::Json, "file log format applies"),
            ];
            for (ok, message) in checks {
                if !ok {
                    return Err(message.to_string());
                }
            }
            Ok(())
        })();

        clear_vars(&["PRINTQUOTE_DATABASE_URL", "PRINTQUOTE_SERVER_PORT"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_names_the_variable() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRINTQUOTE_DATABASE_MAX_CONNECTIONS", "many");
        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. })
                if key == "PRINTQUOTE_DATABASE_MAX_CONNECTIONS" =>
            {
                Ok(())
            }
            other => Err(format!("expected invalid override error, got {other:?}")),
        };

        clear_vars(&["PRINTQUOTE_DATABASE_MAX_CONNECTIONS"]);
        result
    }

    #[test]
    fn prod_requires_admin_token() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRINTQUOTE_APP_ENV", "prod");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected validation failure in prod".to_string()),
                Err(error) => error,
            };
            let names_token = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("admin_token")
            );
            if !names_token {
                return Err(format!("unexpected error: {error}"));
            }

            env::set_var("PRINTQUOTE_SERVER_ADMIN_TOKEN", "s3cret-token");
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            if config.app.env != AppEnv::Prod || !config.admin_token_matches(Some("s3cret-token")) {
                return Err("prod config with token should load".to_string());
            }
            if config.admin_token_matches(Some("wrong")) || config.admin_token_matches(None) {
                return Err("token comparison must reject mismatches".to_string());
            }
            Ok(())
        })();

        clear_vars(&["PRINTQUOTE_APP_ENV", "PRINTQUOTE_SERVER_ADMIN_TOKEN"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRINTQUOTE_SERVER_ADMIN_TOKEN", "admin-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            if debug.contains("admin-secret-value") {
                return Err("debug output should not contain the admin token".to_string());
            }
            let exposed = config.server.admin_token.as_ref().map(|token| token.expose_secret());
            if exposed != Some("admin-secret-value") {
                return Err("admin token should load from env".to_string());
            }
            Ok(())
        })();

        clear_vars(&["PRINTQUOTE_SERVER_ADMIN_TOKEN"]);
        result
    }

    #[test]
    fn dotenv_file_fills_unset_variables_only() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PRINTQUOTE_SERVER_PORT", "9191");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let dotenv = dir.path().join(".env");
            fs::write(
                &dotenv,
                "# local settings\n\
                 export PRINTQUOTE_DATABASE_URL=\"sqlite://from-dotenv.db\"\n\
                 PRINTQUOTE_SERVER_PORT=7777\n\
                 PRINTQUOTE_LOGGING_FORMAT='json'\n",
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { dotenv_path: Some(dotenv), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            if config.database.url != "sqlite://from-dotenv.db" {
                return Err(format!("unexpected url {}", config.database.url));
            }
            if config.server.port != 9191 {
                return Err(format!("process env should win, got port {}", config.server.port));
            }
            if config.logging.format != LogFormat::Json {
                return Err("single-quoted dotenv value should load".to_string());
            }
            Ok(())
        })();

        clear_vars(&[
            "PRINTQUOTE_SERVER_PORT",
            "PRINTQUOTE_DATABASE_URL",
            "PRINTQUOTE_LOGGING_FORMAT",
        ]);
        result
    }

    #[test]
    fn missing_dotenv_file_is_skipped_and_malformed_one_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let missing = dir.path().join("absent.env");
        AppConfig::load(LoadOptions { dotenv_path: Some(missing), ..LoadOptions::default() })
            .map_err(|err| format!("missing dotenv should be skipped: {err}"))?;

        let malformed = dir.path().join("broken.env");
        fs::write(&malformed, "PRINTQUOTE_DATABASE_URL sqlite://no-equals.db\n")
            .map_err(|err| err.to_string())?;
        let options = LoadOptions { dotenv_path: Some(malformed), ..LoadOptions::default() };
        match AppConfig::load(options) {
            Err(ConfigError::Dotenv { .. }) => Ok(()),
            other => Err(format!("expected dotenv error, got {other:?}")),
        }
    }
}
