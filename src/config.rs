use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

/// Where uploaded files end up.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MediaHostMode {
    Local,
    Remote,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteMediaConfig {
    pub base_url: String,
    pub cloud_name: String,
    pub upload_preset: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    // These fields are populated from the .env file
    pub database_path: String,
    pub media_path: String,
    pub allowed_origins: String,
    pub log_level: String,
    pub media_host: MediaHostMode,
    pub remote_media: Option<RemoteMediaConfig>,
    pub activity_log_limit: u32,
    pub max_upload_size_mb: u64,
}

fn required_var(name: &str) -> Result<String, config::ConfigError> {
    env::var(name).map_err(|_| {
        config::ConfigError::Message(format!(
            "FATAL: Environment variable '{}' is not set in your .env file.",
            name
        ))
    })
}

fn absolute_path_var(name: &str) -> Result<String, config::ConfigError> {
    let value = required_var(name)?;
    if Path::new(&value).is_relative() {
        return Err(config::ConfigError::Message(format!(
            "FATAL: The '{}' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
            name, value
        )));
    }
    Ok(value)
}

fn numeric_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, config::ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse::<T>().map_err(|_| {
            config::ConfigError::Message(format!("FATAL: '{}' must be a whole number (got '{}').", name, raw))
        }),
    }
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        // Load the specified .env file. Propagate an error if it fails.
        dotenvy::from_path(env_path).map_err(|e| {
            config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}",
                env_path.display(),
                e
            ))
        })?;

        let database_path = absolute_path_var("DATABASE_PATH")?;
        let media_path = absolute_path_var("MEDIA_PATH")?;
        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_default();
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let activity_log_limit: u32 = numeric_var("ACTIVITY_LOG_LIMIT", 100)?;
        let max_upload_size_mb: u64 = numeric_var("MAX_UPLOAD_SIZE_MB", 10)?;

        if activity_log_limit == 0 || max_upload_size_mb == 0 {
            return Err(config::ConfigError::Message(
                "FATAL: 'ACTIVITY_LOG_LIMIT' and 'MAX_UPLOAD_SIZE_MB' must be greater than zero.".to_string(),
            ));
        }

        let media_host = env::var("MEDIA_HOST").unwrap_or_else(|_| "local".to_string());
        let media_host = match media_host.trim() {
            "local" => MediaHostMode::Local,
            "remote" => MediaHostMode::Remote,
            other => {
                return Err(config::ConfigError::Message(format!(
                    "FATAL: 'MEDIA_HOST' must be 'local' or 'remote' (got '{}').",
                    other
                )))
            }
        };

        let mut builder = config::Config::builder()
            // Base settings (web host/port) come from the TOML file.
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml))
            .set_override("database_path", database_path)?
            .set_override("media_path", media_path)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .set_override("activity_log_limit", activity_log_limit as i64)?
            .set_override("max_upload_size_mb", max_upload_size_mb as i64)?;

        if media_host == MediaHostMode::Remote {
            let base_url = env::var("MEDIA_HOST_BASE_URL")
                .unwrap_or_else(|_| "https://api.cloudinary.com/v1_1".to_string());
            url::Url::parse(&base_url).map_err(|e| {
                config::ConfigError::Message(format!("FATAL: 'MEDIA_HOST_BASE_URL' is not a valid URL: {}", e))
            })?;
            builder = builder
                .set_override("remote_media.base_url", base_url)?
                .set_override("remote_media.cloud_name", required_var("MEDIA_HOST_CLOUD_NAME")?)?
                .set_override("remote_media.upload_preset", required_var("MEDIA_HOST_UPLOAD_PRESET")?)?
                .set_override("remote_media.api_key", required_var("MEDIA_HOST_API_KEY")?)?
                .set_override("remote_media.api_secret", required_var("MEDIA_HOST_API_SECRET")?)?;
        }

        builder
            .set_override("media_host", if media_host == MediaHostMode::Remote { "remote" } else { "local" })?
            .build()?
            .try_deserialize()
    }

    /// Returns the full path to the resources database file inside its own folder.
    pub fn resources_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
            .join("resources")
            .join("resources.db")
    }

    /// Returns the full path to the activity log database file inside its own folder.
    pub fn activity_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
            .join("activity")
            .join("activity.db")
    }
}
