use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;
use tracing::info;

use crate::{
    application::services::scheduler::OverlapPolicy,
    infrastructure::messaging::webhook::WebhookConfig,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env param {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for env param {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub messages_per_interval: usize,
    pub overlap: OverlapPolicy,
    pub batch_pacing: Duration,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub enabled: bool,
    pub url: String,
    pub cache_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub log_level: String,
    pub host: String,
    pub port: u16,
    pub scheme: String,
    pub scheduler: SchedulerConfig,
    pub postgres: PostgresConfig,
    pub redis: RedisConfig,
    pub webhook: WebhookConfig,
}

impl Config {
    /// Reads the process environment, after loading `.env` when one exists.
    pub fn try_parse() -> Result<Config, ConfigError> {
        let _ = dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Values are trimmed and
    /// blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let env = Env(lookup);

        let environment = match env.optional("ENVIRONMENT").as_deref() {
            None | Some("DEV") => Environment::Dev,
            Some("PROD") => Environment::Prod,
            Some(other) => return Err(invalid("ENVIRONMENT", other, "expected DEV or PROD")),
        };

        let log_level = env
            .optional("LOG_LEVEL")
            .unwrap_or_else(|| "debug".to_string())
            .to_lowercase();
        if !matches!(
            log_level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(invalid(
                "LOG_LEVEL",
                &log_level,
                "expected trace, debug, info, warn or error",
            ));
        }

        let interval_secs: u64 = env.parse_or("SEND_INTERVAL_SECONDS", 120)?;
        if interval_secs == 0 {
            return Err(invalid("SEND_INTERVAL_SECONDS", "0", "must be greater than zero"));
        }

        let overlap = match env.optional("SCHEDULER_OVERLAP").as_deref() {
            None | Some("always") => OverlapPolicy::AlwaysFire,
            Some("skip") => OverlapPolicy::SkipIfRunning,
            Some(other) => {
                return Err(invalid("SCHEDULER_OVERLAP", other, "expected always or skip"));
            }
        };

        let mut headers = Vec::new();
        if let Some(header) = env.optional("WEBHOOK_AUTH_HEADER") {
            let key = env.required("WEBHOOK_AUTH_KEY")?;
            headers.push((header, key));
        }
        let character_limit: u32 = env.parse_or("WEBHOOK_CHARACTER_LIMIT", 160)?;

        Ok(Config {
            environment,
            log_level,
            host: env.optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env.parse_or("PORT", 8000)?,
            scheme: env.optional("SCHEME").unwrap_or_else(|| "http".to_string()),
            scheduler: SchedulerConfig {
                interval: Duration::from_secs(interval_secs),
                messages_per_interval: env.parse_or("MESSAGE_COUNT_PER_INTERVAL", 2)?,
                overlap,
                batch_pacing: Duration::from_millis(env.parse_or("BATCH_PACING_MILLIS", 1000)?),
            },
            postgres: PostgresConfig {
                url: env.required("POSTGRES_DB_URL")?,
                max_connections: env.parse_or("POSTGRES_MAX_CONNECTIONS", 5)?,
            },
            redis: RedisConfig {
                enabled: env.parse_bool_or("CACHE_ENABLED", true)?,
                url: env
                    .optional("REDIS_URL")
                    .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
                cache_key: env
                    .optional("REDIS_CACHE_KEY")
                    .unwrap_or_else(|| "messages".to_string()),
            },
            webhook: WebhookConfig {
                url: env.required("WEBHOOK_URL")?,
                character_limit: (character_limit > 0).then_some(character_limit),
                headers,
                timeout: Duration::from_secs(env.parse_or("WEBHOOK_TIMEOUT_SECONDS", 20)?),
            },
        })
    }

    pub fn server_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Logs everything except connection strings and credentials.
    pub fn log_summary(&self) {
        info!(
            environment = ?self.environment,
            log_level = %self.log_level,
            server_url = %self.server_url(),
            send_interval_secs = self.scheduler.interval.as_secs(),
            messages_per_interval = self.scheduler.messages_per_interval,
            overlap = ?self.scheduler.overlap,
            batch_pacing_ms = self.scheduler.batch_pacing.as_millis() as u64,
            postgres_max_connections = self.postgres.max_connections,
            cache_enabled = self.redis.enabled,
            cache_key = %self.redis.cache_key,
            webhook_character_limit = ?self.webhook.character_limit,
            webhook_timeout_secs = self.webhook.timeout.as_secs(),
            webhook_auth = !self.webhook.headers.is_empty(),
            "loaded config"
        );
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|err: T::Err| invalid(key, &raw, &err.to_string())),
        }
    }

    fn parse_bool_or(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(key).map(|v| v.to_lowercase()).as_deref() {
            None => Ok(default),
            Some("true" | "1" | "yes") => Ok(true),
            Some("false" | "0" | "no") => Ok(false),
            Some(other) => Err(invalid(key, other, "expected true or false")),
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
