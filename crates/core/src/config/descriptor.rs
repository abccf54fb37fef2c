//! Connection Descriptor
//!
//! The validated, immutable description of the target database. Produced by the
//! configuration loader and consumed by value by the engine's connection builder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::validation::{ConfigError, ConfigValidator, PortValidator};

/// Supported database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverKind {
    MySql,
    Postgres,
}

impl DriverKind {
    /// Port used when the configuration omits one
    pub fn default_port(&self) -> u16 {
        match self {
            DriverKind::MySql => 3306,
            DriverKind::Postgres => 5432,
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::MySql => write!(f, "mysql"),
            DriverKind::Postgres => write!(f, "postgres"),
        }
    }
}

impl FromStr for DriverKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DriverKind::MySql),
            "postgres" | "postgresql" | "pgx" => Ok(DriverKind::Postgres),
            _ => Err(ConfigError::invalid_value(
                "driver",
                s,
                "one of: mysql, postgres",
            )),
        }
    }
}

/// How to reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Tcp,
    /// `host` holds the socket path
    Unix,
}

impl FromStr for Transport {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "tcp" => Ok(Transport::Tcp),
            "unix" | "socket" => Ok(Transport::Unix),
            _ => Err(ConfigError::invalid_value("protocol", s, "tcp or unix")),
        }
    }
}

/// TLS mode, named after libpq's `sslmode` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    Disable,
    Allow,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }
}

impl FromStr for SslMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            _ => Err(ConfigError::invalid_value(
                "sslmode",
                s,
                "disable, allow, prefer, require, verify-ca or verify-full",
            )),
        }
    }
}

/// Connection pool limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: Option<u64>,
    pub max_lifetime_seconds: Option<u64>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 100,
            min_connections: 1,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(3600),
        }
    }
}

/// Everything needed to open a pool against one database
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub driver: DriverKind,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub database: String,
    pub transport: Transport,
    pub ssl_mode: SslMode,
    pub pool: PoolSettings,
    /// Execute migration files statement by statement instead of as one script
    pub split_statements: bool,
}

impl ConnectionDescriptor {
    /// Build a descriptor with default pool settings
    pub fn new(
        driver: DriverKind,
        host: impl Into<String>,
        username: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            driver,
            host: host.into(),
            port: driver.default_port(),
            username: username.into(),
            password: None,
            database: database.into(),
            transport: Transport::default(),
            ssl_mode: SslMode::default(),
            pool: PoolSettings::default(),
            split_statements: false,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Parse a `postgres://` or `mysql://` URL
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| ConfigError::invalid_value("url", redact_url(url), e.to_string()))?;

        let driver: DriverKind = parsed.scheme().parse()?;

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::missing_required("host", "Add a host to the database URL"))?
            .to_string();

        let database = parsed.path().trim_start_matches('/').to_string();
        if database.is_empty() {
            return Err(ConfigError::missing_required(
                "dbname",
                "Add the database name as the URL path",
            ));
        }

        let decode = |component: &str| {
            urlencoding::decode(component)
                .map(|decoded| decoded.into_owned())
                .map_err(|e| {
                    ConfigError::invalid_value(
                        "url",
                        redact_url(url),
                        format!("credentials that percent-decode to UTF-8 ({})", e),
                    )
                })
        };

        let mut descriptor = Self::new(driver, host, decode(parsed.username())?, database);
        if let Some(port) = parsed.port() {
            PortValidator::default().validate("port", &port)?;
            descriptor.port = port;
        }
        descriptor.password = parsed.password().map(decode).transpose()?;

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "sslmode" => descriptor.ssl_mode = value.parse()?,
                "protocol" => descriptor.transport = value.parse()?,
                _ => {}
            }
        }

        Ok(descriptor)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("transport", &self.transport)
            .field("ssl_mode", &self.ssl_mode)
            .field("pool", &self.pool)
            .field("split_statements", &self.split_statements)
            .finish()
    }
}

fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
