use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Seeded question bank and in-process ledger/stats.
    Memory,
    Mongo,
}

impl FromStr for StorageBackend {
    type Err = config::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "mongo" | "mongodb" => Ok(Self::Mongo),
            other => Err(config::ConfigError::Message(format!(
                "Unknown storage backend '{}' (expected memory or mongo)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventsBackend {
    Redis,
    Channel,
    Disabled,
}

impl FromStr for EventsBackend {
    type Err = config::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "channel" => Ok(Self::Channel),
            "none" | "off" => Ok(Self::Disabled),
            other => Err(config::ConfigError::Message(format!(
                "Unknown events backend '{}' (expected redis, channel or none)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    pub backend: EventsBackend,
    pub redis_uri: String,
    pub stream: String,
    pub stream_max_len: usize,
    pub publish_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub storage: StorageBackend,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub events: EventsConfig,
    pub stats_max_cas_attempts: usize,
    pub submit_deadline_ms: u64,
    pub metrics_auth: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:50052".to_string(),
            storage: StorageBackend::Memory,
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "quiz".to_string(),
            events: EventsConfig {
                backend: EventsBackend::Channel,
                redis_uri: "redis://127.0.0.1:6379/0".to_string(),
                stream: "pawfiler-events".to_string(),
                stream_max_len: 100_000,
                publish_timeout_ms: 500,
            },
            stats_max_cas_attempts: 8,
            submit_deadline_ms: 5_000,
            metrics_auth: "admin:changeme".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();
        let lookup = |key: &str, env_key: &str| -> Option<String> {
            settings
                .get_string(key)
                .ok()
                .or_else(|| env::var(env_key).ok())
        };

        let storage: StorageBackend = match lookup("storage.backend", "STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.storage,
        };

        let events_backend: EventsBackend = match lookup("events.backend", "EVENTS_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.events.backend,
        };

        let metrics_auth = lookup("metrics.auth", "METRICS_AUTH").unwrap_or_else(|| {
            if app_env == "prod" {
                tracing::warn!("METRICS_AUTH not set in production, using default credentials");
            }
            defaults.metrics_auth.clone()
        });

        Ok(Config {
            bind_addr: lookup("server.bind_addr", "BIND_ADDR").unwrap_or(defaults.bind_addr),
            storage,
            mongo_uri: lookup("database.mongo_uri", "MONGO_URI").unwrap_or(defaults.mongo_uri),
            mongo_database: lookup("database.mongo_database", "MONGO_DATABASE")
                .unwrap_or(defaults.mongo_database),
            events: EventsConfig {
                backend: events_backend,
                redis_uri: lookup("events.redis_uri", "REDIS_URI")
                    .unwrap_or(defaults.events.redis_uri),
                stream: lookup("events.stream", "EVENTS_STREAM").unwrap_or(defaults.events.stream),
                stream_max_len: parse_number(
                    lookup("events.stream_max_len", "EVENTS_STREAM_MAXLEN"),
                    "events.stream_max_len",
                    defaults.events.stream_max_len,
                )?,
                publish_timeout_ms: parse_number(
                    lookup("events.publish_timeout_ms", "EVENTS_PUBLISH_TIMEOUT_MS"),
                    "events.publish_timeout_ms",
                    defaults.events.publish_timeout_ms,
                )?,
            },
            stats_max_cas_attempts: parse_number(
                lookup("stats.max_cas_attempts", "STATS_MAX_CAS_ATTEMPTS"),
                "stats.max_cas_attempts",
                defaults.stats_max_cas_attempts,
            )?,
            submit_deadline_ms: parse_number(
                lookup("server.submit_deadline_ms", "SUBMIT_DEADLINE_MS"),
                "server.submit_deadline_ms",
                defaults.submit_deadline_ms,
            )?,
            metrics_auth,
        })
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.events.publish_timeout_ms)
    }

    pub fn submit_deadline(&self) -> Duration {
        Duration::from_millis(self.submit_deadline_ms)
    }
}

fn parse_number<T: FromStr>(
    raw: Option<String>,
    key: &str,
    default: T,
) -> Result<T, config::ConfigError> {
    match raw {
        Some(value) => value.trim().parse().map_err(|_| {
            config::ConfigError::Message(format!("Invalid number for {}: '{}'", key, value))
        }),
        None => Ok(default),
    }
}
