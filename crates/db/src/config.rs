use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::error::DbError;

/// Default pool size. Trigger invocations are short and the mirror
/// database is shared with other consumers.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default time to wait for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Relational mirror connection settings.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub ssl_mode: PgSslMode,
}

impl DbConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                   | Default        |
    /// |---------------------------|----------------|
    /// | `DATABASE_URL`            | required       |
    /// | `DB_MAX_CONNECTIONS`      | `5`            |
    /// | `DB_ACQUIRE_TIMEOUT_SECS` | `30`           |
    /// | `DB_SSL_MODE`             | `verify-full`  |
    pub fn from_env() -> Result<Self, DbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DbError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(DbError::MissingConfig("DATABASE_URL"))?;

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => parse_setting::<u32>("DB_MAX_CONNECTIONS", &raw)?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        if max_connections == 0 {
            return Err(DbError::InvalidConfig {
                key: "DB_MAX_CONNECTIONS",
                message: "must be at least 1".to_string(),
            });
        }

        let acquire_timeout_secs = match lookup("DB_ACQUIRE_TIMEOUT_SECS") {
            Some(raw) => parse_setting::<u64>("DB_ACQUIRE_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_ACQUIRE_TIMEOUT_SECS,
        };

        let ssl_mode = match lookup("DB_SSL_MODE") {
            Some(raw) => parse_ssl_mode(&raw)?,
            None => PgSslMode::VerifyFull,
        };

        Ok(Self {
            database_url,
            max_connections,
            acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            ssl_mode,
        })
    }

    /// Connection options with the configured TLS mode applied on top of
    /// the URL.
    pub fn connect_options(&self) -> Result<PgConnectOptions, DbError> {
        let options = PgConnectOptions::from_str(&self.database_url).map_err(|e| {
            DbError::InvalidConfig {
                key: "DATABASE_URL",
                message: e.to_string(),
            }
        })?;
        Ok(options.ssl_mode(self.ssl_mode))
    }
}

fn parse_setting<T: FromStr>(key: &'static str, raw: &str) -> Result<T, DbError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| DbError::InvalidConfig {
        key,
        message: e.to_string(),
    })
}

/// `require` and `prefer` encrypt without checking the server certificate;
/// they are only used when chosen explicitly.
fn parse_ssl_mode(raw: &str) -> Result<PgSslMode, DbError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "disable" => Ok(PgSslMode::Disable),
        "allow" => Ok(PgSslMode::Allow),
        "prefer" => Ok(PgSslMode::Prefer),
        "require" => Ok(PgSslMode::Require),
        "verify-ca" => Ok(PgSslMode::VerifyCa),
        "verify-full" => Ok(PgSslMode::VerifyFull),
        other => Err(DbError::InvalidConfig {
            key: "DB_SSL_MODE",
            message: format!("unknown mode '{other}'"),
        }),
    }
}
