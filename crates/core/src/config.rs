use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resolved application configuration. Precedence, lowest to highest:
/// built-in defaults, the TOML file, `DEMANDGEN_*` environment variables,
/// explicit overrides from the caller.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub generator: GeneratorConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub seasonality_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub seasonality_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading config file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed parsing config file `{path}`: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("config file `{0}` does not exist")]
    NotFound(PathBuf),
    #[error("config file references the unset environment variable `{0}`")]
    Interpolate(String),
    #[error("config file has an unclosed `${{...}}` expression")]
    UnclosedInterpolation,
    #[error("environment variable `{key}` holds an unusable value `{value}`")]
    EnvValue { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://demandgen.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            generator: GeneratorConfig { seasonality_dir: PathBuf::from("config/seasonality") },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
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
                "log format must be compact, pretty, or json (got `{other}`)"
            ))),
        }
    }
}

fn overlay<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match locate_file(options.config_path.as_deref()) {
            Some(path) => RawConfig::from_file(&path)?.merge_into(&mut config),
            None if options.require_file => {
                let wanted = options.config_path.unwrap_or_else(|| PathBuf::from("demandgen.toml"));
                return Err(ConfigError::NotFound(wanted));
            }
            None => {}
        }

        config.merge_env()?;
        config.merge_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn merge_env(&mut self) -> Result<(), ConfigError> {
        overlay(&mut self.database.url, env_string("DEMANDGEN_DATABASE_URL"));
        if let Some(raw) = env_string("DEMANDGEN_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = env_parse("DEMANDGEN_DATABASE_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = env_string("DEMANDGEN_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = env_parse("DEMANDGEN_DATABASE_TIMEOUT_SECS", &raw)?;
        }

        overlay(
            &mut self.generator.seasonality_dir,
            env_string("DEMANDGEN_SEASONALITY_DIR").map(PathBuf::from),
        );

        // Both the long and short names are accepted for the logging vars.
        let level =
            env_string("DEMANDGEN_LOGGING_LEVEL").or_else(|| env_string("DEMANDGEN_LOG_LEVEL"));
        overlay(&mut self.logging.level, level);
        let format =
            env_string("DEMANDGEN_LOGGING_FORMAT").or_else(|| env_string("DEMANDGEN_LOG_FORMAT"));
        if let Some(raw) = format {
            self.logging.format = raw.parse()?;
        }

        Ok(())
    }

    fn merge_overrides(&mut self, overrides: ConfigOverrides) {
        overlay(&mut self.database.url, overrides.database_url);
        overlay(&mut self.generator.seasonality_dir, overrides.seasonality_dir);
        overlay(&mut self.logging.level, overrides.log_level);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.logging.validate()
    }
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.url.trim();
        if !(url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:") {
            return Err(ConfigError::Validation(
                "database.url must point at sqlite (sqlite://..., sqlite::..., or :memory:)"
                    .to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections cannot be zero".to_string(),
            ));
        }
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(ConfigError::Validation(
                "database.timeout_secs must be between 1 and 300".to_string(),
            ));
        }
        Ok(())
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::Validation(
                "logging.level must be trace, debug, info, warn, or error".to_string(),
            )),
        }
    }
}

fn locate_file(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => ["demandgen.toml", "config/demandgen.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists()),
    }
}

/// Expands `${VAR}` expressions against the process environment. An unset
/// variable is an error rather than an empty substitution.
fn expand_env(raw: &str) -> Result<String, ConfigError> {
    let mut expanded = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(open) = rest.find("${") {
        expanded.push_str(&rest[..open]);
        let body = &rest[open + 2..];
        let close = body.find('}').ok_or(ConfigError::UnclosedInterpolation)?;
        let key = &body[..close];
        let value = env::var(key).map_err(|_| ConfigError::Interpolate(key.to_string()))?;
        expanded.push_str(&value);
        rest = &body[close + 1..];
    }

    expanded.push_str(rest);
    Ok(expanded)
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::EnvValue { key: key.to_string(), value: raw.to_string() })
}

/// The TOML file shape: every section and field optional so a file can set
/// only what it cares about.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    database: Option<RawDatabase>,
    generator: Option<RawGenerator>,
    logging: Option<RawLogging>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGenerator {
    seasonality_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl RawConfig {
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let expanded = expand_env(&raw)?;
        toml::from_str(&expanded)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    fn merge_into(self, config: &mut AppConfig) {
        if let Some(database) = self.database {
            overlay(&mut config.database.url, database.url);
            overlay(&mut config.database.max_connections, database.max_connections);
            overlay(&mut config.database.timeout_secs, database.timeout_secs);
        }
        if let Some(generator) = self.generator {
            overlay(&mut config.generator.seasonality_dir, generator.seasonality_dir);
        }
        if let Some(logging) = self.logging {
            overlay(&mut config.logging.level, logging.level);
            overlay(&mut config.logging.format, logging.format);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{expand_env, AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    const DEMANDGEN_VARS: &[&str] = &[
        "DEMANDGEN_DATABASE_URL",
        "DEMANDGEN_DATABASE_MAX_CONNECTIONS",
        "DEMANDGEN_DATABASE_TIMEOUT_SECS",
        "DEMANDGEN_SEASONALITY_DIR",
        "DEMANDGEN_LOGGING_LEVEL",
        "DEMANDGEN_LOGGING_FORMAT",
        "DEMANDGEN_LOG_LEVEL",
        "DEMANDGEN_LOG_FORMAT",
    ];

    /// Serializes env mutation across tests and restores prior values.
    fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        let _guard = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let saved: Vec<(&str, Option<String>)> =
            DEMANDGEN_VARS.iter().map(|key| (*key, env::var(key).ok())).collect();
        for key in DEMANDGEN_VARS {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }

        test_fn();

        for (key, value) in saved {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }
    }

    #[test]
    fn defaults_point_at_the_bundled_seasonality_dir() {
        with_env(&[], || {
            let config = AppConfig::load(LoadOptions::default()).expect("load defaults");
            assert_eq!(config.generator.seasonality_dir, PathBuf::from("config/seasonality"));
            assert_eq!(config.database.url, "sqlite://demandgen.db");
            assert_eq!(config.logging.format, LogFormat::Compact);
        });
    }

    #[test]
    fn file_values_are_expanded_against_the_environment() {
        with_env(&[], || {
            env::set_var("TEST_DEMANDGEN_DB", "sqlite://interpolated.db");

            let dir = TempDir::new().expect("tempdir");
            let path = dir.path().join("demandgen.toml");
            fs::write(&path, "[database]\nurl = \"${TEST_DEMANDGEN_DB}\"\n").expect("write file");

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .expect("load config");
            assert_eq!(config.database.url, "sqlite://interpolated.db");

            env::remove_var("TEST_DEMANDGEN_DB");
        });
    }

    #[test]
    fn unset_interpolation_variable_is_an_error() {
        let result = expand_env("url = \"${DEMANDGEN_NO_SUCH_VAR_12345}\"");
        assert!(matches!(result, Err(ConfigError::Interpolate(ref var)) if var == "DEMANDGEN_NO_SUCH_VAR_12345"));
        assert!(matches!(expand_env("${unclosed"), Err(ConfigError::UnclosedInterpolation)));
    }

    #[test]
    fn overrides_beat_env_beats_file() {
        with_env(&[("DEMANDGEN_SEASONALITY_DIR", "/from/env")], || {
            let dir = TempDir::new().expect("tempdir");
            let path = dir.path().join("demandgen.toml");
            fs::write(
                &path,
                concat!(
                    "[database]\nurl = \"sqlite://from-file.db\"\n\n",
                    "[generator]\nseasonality_dir = \"/from/file\"\n\n",
                    "[logging]\nlevel = \"warn\"\n",
                ),
            )
            .expect("write file");

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .expect("load config");

            assert_eq!(config.database.url, "sqlite://from-override.db");
            assert_eq!(config.logging.level, "debug");
            assert_eq!(config.generator.seasonality_dir, PathBuf::from("/from/env"));
        });
    }

    #[test]
    fn short_logging_env_names_are_accepted() {
        with_env(
            &[("DEMANDGEN_LOG_LEVEL", "warn"), ("DEMANDGEN_LOG_FORMAT", "pretty")],
            || {
                let config = AppConfig::load(LoadOptions::default()).expect("load config");
                assert_eq!(config.logging.level, "warn");
                assert_eq!(config.logging.format, LogFormat::Pretty);
            },
        );
    }

    #[test]
    fn non_sqlite_database_url_is_rejected() {
        with_env(&[], || {
            let result = AppConfig::load(LoadOptions {
                overrides: ConfigOverrides {
                    database_url: Some("postgres://example".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            });
            match result {
                Err(ConfigError::Validation(message)) => {
                    assert!(message.contains("database.url"), "unexpected message: {message}");
                }
                other => panic!("expected validation failure, got {other:?}"),
            }
        });
    }

    #[test]
    fn requiring_a_missing_file_fails() {
        with_env(&[], || {
            let result = AppConfig::load(LoadOptions {
                config_path: Some(PathBuf::from("/nonexistent/demandgen.toml")),
                require_file: true,
                ..LoadOptions::default()
            });
            assert!(matches!(result, Err(ConfigError::NotFound(_))));
        });
    }
}
