use std::{env, fs};

use serde::{Deserialize, Serialize};

use crate::{
    database::db::{self, DbPool},
    meltdown::*,
    quill_log,
    services::*,
};

pub const CONFIG_FILE: &str = "Quill.toml";
const DEFAULT_DATABASE_URL: &str = "storage/quill.sqlite3";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub required_env: RequiredEnv,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct RequiredEnv {
    #[serde(default)]
    pub variables: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub logging: LogSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthSettings {
    #[serde(default = "default_token_expiry_hours")]
    pub token_expiry_hours: u64,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Filled from `JWT_SECRET`, never from the config file.
    #[serde(skip)]
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseSettings {
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(skip)]
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            environment: default_environment(),
            auth: AuthSettings::default(),
            database: DatabaseSettings::default(),
            logging: LogSettings::default(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        AuthSettings {
            token_expiry_hours: default_token_expiry_hours(),
            bcrypt_cost: default_bcrypt_cost(),
            jwt_secret: String::new(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            max_pool_size: default_max_pool_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings { level: default_log_level(), json: false }
    }
}

fn default_environment() -> String {
    "prod".to_string()
}

fn default_token_expiry_hours() -> u64 {
    10
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_max_pool_size() -> u32 {
    8
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> Result<Self, MeltDown> {
        let contents = fs::read_to_string(path).map_err(|e| MeltDown::from(e).with_context("path", path))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, MeltDown> {
        let mut config: AppConfig = toml::from_str(contents)?;
        config.settings.database.url = DEFAULT_DATABASE_URL.to_string();
        Ok(config)
    }

    /// Copies secrets and connection strings from the process environment.
    pub fn apply_env(&mut self) {
        if let Ok(secret) = env::var("JWT_SECRET") {
            self.settings.auth.jwt_secret = secret;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.settings.database.url = url;
            }
        }
    }

    pub fn is_development(&self) -> bool {
        self.settings.environment == "dev"
    }

    pub fn is_production(&self) -> bool {
        self.settings.environment == "prod"
    }

    pub fn missing_env_vars(&self) -> Vec<String> {
        self.required_env
            .variables
            .iter()
            .filter(|var| env::var(var.as_str()).map(|value| value.trim().is_empty()).unwrap_or(true))
            .cloned()
            .collect()
    }
}

/// Loads configuration, installs logging and prepares the database.
///
/// Any failure is logged and terminates the process.
pub fn bootstrap() -> (AppConfig, DbPool) {
    dotenv::dotenv().ok();

    let mut config = AppConfig::load_from_file(CONFIG_FILE).unwrap_or_else(|e| {
        eprintln!("Failed to load {}: {}", CONFIG_FILE, e.log_message());
        std::process::exit(1);
    });

    logger::init_logging(&config.settings.logging);
    logger::setup_panic_hook();

    quill_log!(Info, "Starting bootstrap process");
    quill_log!(Info, format!("Environment: {}", config.settings.environment));

    validate_required_env_vars(&config);
    config.apply_env();

    if config.settings.auth.jwt_secret.is_empty() {
        quill_log!(Error, "JWT_SECRET is not set; sessions cannot be signed");
        std::process::exit(1);
    }

    quill_log!(Debug, format!("Initializing database connection pool for {}", config.settings.database.url));
    let pool = db::init_connection_pool(&config.settings.database).unwrap_or_else(|e| {
        quill_log!(Error, format!("Failed to initialize database connection pool: {}", e.log_message()));
        std::process::exit(1);
    });

    if let Err(e) = db::run_migrations(&pool) {
        quill_log!(Error, format!("Failed to run database migrations: {}", e.log_message()));
        std::process::exit(1);
    }

    quill_log!(Info, "Bootstrap complete");
    (config, pool)
}

fn validate_required_env_vars(config: &AppConfig) {
    let invalid_vars = config.missing_env_vars();

    if !invalid_vars.is_empty() {
        quill_log!(Error, format!("Environment vars {} are missing or empty", invalid_vars.join(", ")));
        std::process::exit(1);
    }

    if !config.required_env.variables.is_empty() {
        quill_log!(Info, format!("All {} required environment variables are set", config.required_env.variables.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_falls_back_to_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.settings.environment, "prod");
        assert_eq!(config.settings.auth.token_expiry_hours, 10);
        assert_eq!(config.settings.database.max_pool_size, 8);
        assert_eq!(config.settings.database.url, DEFAULT_DATABASE_URL);
        assert!(config.required_env.variables.is_empty());
    }

    #[test]
    fn nested_sections_override_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [settings]
            environment = "dev"

            [settings.auth]
            bcrypt_cost = 4

            [settings.logging]
            level = "debug"
            json = true

            [required_env]
            variables = ["JWT_SECRET"]
            "#,
        )
        .unwrap();

        assert!(config.is_development());
        assert_eq!(config.settings.auth.bcrypt_cost, 4);
        assert_eq!(config.settings.auth.token_expiry_hours, 10);
        assert_eq!(config.settings.logging.level, "debug");
        assert!(config.settings.logging.json);
        assert_eq!(config.required_env.variables, vec!["JWT_SECRET".to_string()]);
    }

    #[test]
    fn secrets_are_not_read_from_the_file() {
        let config = AppConfig::from_toml("[settings.auth]\njwt_secret = \"leaked\"\n").unwrap();
        assert!(config.settings.auth.jwt_secret.is_empty());
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let error = AppConfig::from_toml("[settings\nenvironment = ").unwrap_err();
        assert_eq!(error.melt_type, MeltType::ConfigurationError);
    }

    #[test]
    fn unset_required_variable_is_reported() {
        let config = AppConfig {
            required_env: RequiredEnv { variables: vec!["QUILL_TEST_SURELY_UNSET_VARIABLE".to_string()] },
            ..AppConfig::default()
        };
        assert_eq!(config.missing_env_vars(), vec!["QUILL_TEST_SURELY_UNSET_VARIABLE".to_string()]);
    }
}
