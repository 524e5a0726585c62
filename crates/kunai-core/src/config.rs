use anyhow::Result;
use config::Config;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub repository: RepositoryConfig,
    pub access: AccessConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    /// Filesystem root of the served repositories.
    pub root: String,
    /// Directory holding the activity-to-transaction mapping, one file
    /// per activity.
    pub activities_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Path-based authorization file. When unset, every request is
    /// allowed and the access engine is bypassed.
    pub authz_file: Option<String>,
    /// Whether unauthenticated requests are passed to the access engine
    /// (as the anonymous user) or rejected outright.
    pub anonymous_access: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Environment variables take precedence over `.env` file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8690)?
            .set_default("repository.activities_dir", "activities")?
            .set_default("access.anonymous_access", true)?
            .set_default("logging.level", "debug")?
            // Env file
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    tracing::debug!(
        host = %settings.server.host,
        port = settings.server.port,
        "configuration loaded"
    );
    Ok(settings)
}
