//! Connection configuration
//!
//! Nothing about the target database is compiled in: settings come from
//! `DATABASE_URL`, or from the discrete `TABLOAD_DB_*` variables, optionally
//! via a `.env` file.

use crate::error::{LoadError, Result};
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Connection Defaults
// ============================================================================

/// Default database host.
pub const DEFAULT_DB_HOST: &str = "127.0.0.1";

/// Default PostgreSQL port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default database name.
pub const DEFAULT_DB_NAME: &str = "postgres";

/// Default database user.
pub const DEFAULT_DB_USER: &str = "postgres";

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Full connection URL; when set, the discrete fields are ignored
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub connect_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            database: DEFAULT_DB_NAME.to_string(),
            user: DEFAULT_DB_USER.to_string(),
            password: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

// The password never reaches a log line.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl DbConfig {
    /// Load `.env` if present, then read the environment.
    ///
    /// - `DATABASE_URL`: full connection URL (takes precedence)
    /// - `TABLOAD_DB_HOST`, `TABLOAD_DB_PORT`, `TABLOAD_DB_NAME`,
    ///   `TABLOAD_DB_USER`, `TABLOAD_DB_PASSWORD`
    /// - `TABLOAD_DB_CONNECT_TIMEOUT`: seconds
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            url: std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            host: std::env::var("TABLOAD_DB_HOST").unwrap_or(defaults.host),
            port: parse_var("TABLOAD_DB_PORT")?.unwrap_or(defaults.port),
            database: std::env::var("TABLOAD_DB_NAME").unwrap_or(defaults.database),
            user: std::env::var("TABLOAD_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("TABLOAD_DB_PASSWORD").ok(),
            connect_timeout_secs: parse_var("TABLOAD_DB_CONNECT_TIMEOUT")?
                .unwrap_or(defaults.connect_timeout_secs),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_secs == 0 {
            return Err(LoadError::config("connect timeout must be greater than 0"));
        }

        if self.url.is_some() {
            return Ok(());
        }

        if self.host.is_empty() {
            return Err(LoadError::config("database host cannot be empty"));
        }
        if self.port == 0 {
            return Err(LoadError::config("database port must be greater than 0"));
        }
        if self.database.is_empty() {
            return Err(LoadError::config("database name cannot be empty"));
        }
        if self.user.is_empty() {
            return Err(LoadError::config("database user cannot be empty"));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn to_connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(ref url) = self.url {
            return PgConnectOptions::from_str(url)
                .map_err(|e| LoadError::config(format!("invalid DATABASE_URL: {}", e)));
        }

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user);

        if let Some(ref password) = self.password {
            options = options.password(password);
        }

        Ok(options)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| LoadError::config(format!("{} has an invalid value '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
