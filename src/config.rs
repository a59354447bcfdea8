use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::auth::password::HashCost;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbConfig {
    pub api_key: String,
    pub base_url: String,
    pub language: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailerConfig {
    /// Public base URL used to build confirmation links.
    pub app_base_url: String,
    /// When set, confirmation emails are POSTed here instead of only logged.
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub tmdb: TmdbConfig,
    pub mailer: MailerConfig,
    pub hash_cost: HashCost,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any key lookup, so tests don't have to mutate
    /// the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            get(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "episode-queue".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "episode-queue-users".into()),
            ttl_minutes: parse_or(&get, "JWT_TTL_MINUTES", 60)?,
            refresh_ttl_minutes: parse_or(&get, "JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14)?,
        };
        let tmdb = TmdbConfig {
            api_key: required("TMDB_API_KEY")?,
            base_url: get("TMDB_BASE_URL")
                .unwrap_or_else(|| "https://api.themoviedb.org".into())
                .trim_end_matches('/')
                .to_string(),
            language: get("TMDB_LANGUAGE").unwrap_or_else(|| "en-US".into()),
            timeout: Duration::from_secs(parse_or(&get, "TMDB_TIMEOUT_SECS", 10)?),
        };
        let mailer = MailerConfig {
            app_base_url: get("APP_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".into())
                .trim_end_matches('/')
                .to_string(),
            webhook_url: get("MAILER_WEBHOOK_URL").filter(|v| !v.trim().is_empty()),
        };
        let hash_cost = match get("PASSWORD_HASH_COST") {
            None => HashCost::Default,
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                name: "PASSWORD_HASH_COST",
                value: v,
            })?,
        };

        Ok(Self {
            database_url,
            jwt,
            tmdb,
            mailer,
            hash_cost,
        })
    }
}

fn parse_or<F, T>(get: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(name) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}
