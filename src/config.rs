//! Configuration management for drumbeat.
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present). Values are read once and cached for the life of the process.

use std::env;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Initialize configuration (call once at startup)
pub fn init() -> &'static Config {
    config()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Longest session lifetime accepted, in seconds (ten years).
pub const MAX_SESSION_AGE_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_age_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory where uploaded project images are written.
    pub images_path: String,
    /// Upper bound on a single image upload, in bytes.
    pub max_image_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_or("PORT", "8000").parse().unwrap_or(8000),
            },
            database: DatabaseConfig {
                path: env_or("DATABASE_PATH", "./data/drumbeat.db"),
            },
            session: SessionConfig {
                max_age_seconds: env_or("SESSION_MAX_AGE", "1209600")
                    .parse::<u64>()
                    .unwrap_or(1_209_600) // 14 days
                    .min(MAX_SESSION_AGE_SECONDS),
            },
            storage: StorageConfig {
                images_path: env_or("IMAGES_PATH", "./data/images"),
                max_image_size: env_or("MAX_IMAGE_SIZE", "2097152")
                    .parse()
                    .unwrap_or(2 * 1024 * 1024), // 2MB
            },
            logging: LoggingConfig {
                format: env_or("LOG_FORMAT", "pretty")
                    .parse()
                    .unwrap_or(LogFormat::Pretty),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
