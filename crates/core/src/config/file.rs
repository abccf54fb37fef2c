//! Configuration file loading
//!
//! Reads the database section from a JSON (default) or YAML file and validates
//! it into a [`ConnectionDescriptor`].

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::descriptor::{ConnectionDescriptor, DriverKind, PoolSettings};
use super::validation::{
    ConfigError, ConfigValidator, MinimumValidator, PortValidator, RequiredValidator,
};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

/// Overrides `password` when set, so secrets can stay out of the file
pub const PASSWORD_ENV_VAR: &str = "STRATA_DB_PASSWORD";

/// Ports may be written as `5432` or `"5432"`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

/// Configuration as written on disk, before validation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    driver: Option<String>,
    url: Option<String>,
    host: Option<String>,
    port: Option<PortValue>,
    username: Option<String>,
    password: Option<String>,
    dbname: Option<String>,
    protocol: Option<String>,
    sslmode: Option<String>,
    #[serde(default)]
    split_statements: bool,
    #[serde(default)]
    pool: PoolSettings,
}

impl DatabaseConfig {
    /// Parse file contents, picking the format from the file extension
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(contents)?),
            _ => Ok(serde_json::from_str(contents)?),
        }
    }

    /// Validate into a connection descriptor
    pub fn into_descriptor(self) -> Result<ConnectionDescriptor, ConfigError> {
        let mut descriptor = match self.url.as_deref() {
            Some(url) => {
                let descriptor = ConnectionDescriptor::from_url(url)?;
                if let Some(driver) = self.driver.as_deref() {
                    let driver: DriverKind = driver.parse()?;
                    if driver != descriptor.driver {
                        return Err(ConfigError::invalid_value(
                            "driver",
                            driver.to_string(),
                            format!("the URL scheme's driver ({})", descriptor.driver),
                        ));
                    }
                }
                descriptor
            }
            None => self.fields_descriptor()?,
        };

        if let Some(password) = self.password {
            descriptor.password = Some(password);
        }
        if let Some(sslmode) = self.sslmode.as_deref() {
            descriptor.ssl_mode = sslmode.parse()?;
        }
        if let Some(protocol) = self.protocol.as_deref() {
            descriptor.transport = protocol.parse()?;
        }

        let minimum = MinimumValidator { min: 1 };
        minimum.validate("pool.max_connections", &u64::from(self.pool.max_connections))?;
        if self.pool.min_connections > self.pool.max_connections {
            return Err(ConfigError::invalid_value(
                "pool.min_connections",
                self.pool.min_connections.to_string(),
                format!("at most pool.max_connections ({})", self.pool.max_connections),
            ));
        }

        descriptor.pool = self.pool;
        descriptor.split_statements = self.split_statements;
        Ok(descriptor)
    }

    fn fields_descriptor(&self) -> Result<ConnectionDescriptor, ConfigError> {
        let required = |field: &str, value: &Option<String>, hint: &'static str| {
            RequiredValidator { hint }.validate(field, value)
        };

        required("driver", &self.driver, "Set \"driver\" to mysql or postgres")?;
        required("host", &self.host, "Set \"host\" to the database server address")?;
        required("username", &self.username, "Set \"username\" for the database login")?;
        required("dbname", &self.dbname, "Set \"dbname\" to the target database")?;

        let driver: DriverKind = self.driver.as_deref().unwrap_or_default().parse()?;

        let mut descriptor = ConnectionDescriptor::new(
            driver,
            self.host.clone().unwrap_or_default().trim(),
            self.username.clone().unwrap_or_default(),
            self.dbname.clone().unwrap_or_default().trim(),
        );

        if let Some(port) = &self.port {
            descriptor.port = parse_port(port)?;
        }

        Ok(descriptor)
    }
}

fn parse_port(value: &PortValue) -> Result<u16, ConfigError> {
    let port = match value {
        PortValue::Number(port) => *port,
        PortValue::Text(text) => text
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::invalid_value("port", text.as_str(), "a port number"))?,
    };
    PortValidator::default().validate("port", &port)?;
    Ok(port)
}

/// Load and validate the configuration file at `path`
pub fn load_config(path: impl AsRef<Path>) -> Result<ConnectionDescriptor, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::FileSystemError {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let mut descriptor = DatabaseConfig::parse(path, &contents)?.into_descriptor()?;
    apply_env_overrides(&mut descriptor);

    tracing::debug!(
        driver = %descriptor.driver,
        host = %descriptor.host,
        database = %descriptor.database,
        "Loaded configuration from {}",
        path.display()
    );
    Ok(descriptor)
}

/// Apply environment variable overrides to a loaded descriptor
pub fn apply_env_overrides(descriptor: &mut ConnectionDescriptor) {
    if let Ok(password) = std::env::var(PASSWORD_ENV_VAR) {
        descriptor.password = Some(password);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SslMode, Transport};
    use serial_test::serial;
    use std::io::Write;

    fn parse_json(json: &str) -> Result<ConnectionDescriptor, ConfigError> {
        DatabaseConfig::parse(Path::new("config.json"), json)?.into_descriptor()
    }

    #[test]
    fn test_mysql_config_with_string_port() {
        let descriptor = parse_json(
            r#"{
                "driver": "mysql",
                "host": "127.0.0.1",
                "port": "3307",
                "username": "root",
                "password": "secret",
                "dbname": "shop",
                "protocol": "tcp"
            }"#,
        )
        .unwrap();

        assert_eq!(descriptor.driver, DriverKind::MySql);
        assert_eq!(descriptor.port, 3307);
        assert_eq!(descriptor.password.as_deref(), Some("secret"));
        assert_eq!(descriptor.transport, Transport::Tcp);
        assert!(!descriptor.split_statements);
    }

    #[test]
    fn test_postgres_config_with_numeric_port_and_pool() {
        let descriptor = parse_json(
            r#"{
                "driver": "postgres",
                "host": "localhost",
                "port": 5433,
                "username": "app",
                "dbname": "app",
                "sslmode": "disable",
                "split_statements": true,
                "pool": { "max_connections": 5 }
            }"#,
        )
        .unwrap();

        assert_eq!(descriptor.driver, DriverKind::Postgres);
        assert_eq!(descriptor.port, 5433);
        assert_eq!(descriptor.ssl_mode, SslMode::Disable);
        assert!(descriptor.split_statements);
        assert_eq!(descriptor.pool.max_connections, 5);
        assert_eq!(descriptor.pool.max_lifetime_seconds, Some(3600));
    }

    #[test]
    fn test_missing_host_is_reported() {
        let err = parse_json(r#"{ "driver": "mysql", "username": "root", "dbname": "shop" }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref field, .. } if field == "host"));
    }

    #[test]
    fn test_unknown_driver_is_rejected() {
        let err = parse_json(
            r#"{ "driver": "oracle", "host": "h", "username": "u", "dbname": "d" }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "driver"));
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let err = parse_json(
            r#"{ "driver": "mysql", "host": "h", "port": "http", "username": "u", "dbname": "d" }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "port"));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = parse_json(
            r#"{ "driver": "mysql", "host": "h", "username": "u", "dbname": "d", "dsn": "x" }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_url_config() {
        let descriptor =
            parse_json(r#"{ "url": "postgres://app:pw@db/app", "sslmode": "require" }"#).unwrap();
        assert_eq!(descriptor.driver, DriverKind::Postgres);
        assert_eq!(descriptor.host, "db");
        assert_eq!(descriptor.ssl_mode, SslMode::Require);
    }

    #[test]
    fn test_url_and_driver_must_agree() {
        let err = parse_json(r#"{ "driver": "mysql", "url": "postgres://app@db/app" }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "driver"));
    }

    #[test]
    fn test_min_connections_above_max() {
        let err = parse_json(
            r#"{
                "driver": "mysql", "host": "h", "username": "u", "dbname": "d",
                "pool": { "max_connections": 2, "min_connections": 3 }
            }"#,
        )
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "pool.min_connections")
        );
    }

    #[test]
    fn test_yaml_config() {
        let yaml = "driver: postgres\nhost: localhost\nusername: app\ndbname: app\nport: 5432\n";
        let descriptor = DatabaseConfig::parse(Path::new("strata.yaml"), yaml)
            .unwrap()
            .into_descriptor()
            .unwrap();
        assert_eq!(descriptor.driver, DriverKind::Postgres);
        assert_eq!(descriptor.username, "app");
    }

    #[test]
    #[serial]
    fn test_load_config_applies_password_override() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{ "driver": "mysql", "host": "h", "username": "u", "password": "file", "dbname": "d" }}"#
        )
        .unwrap();

        std::env::set_var(PASSWORD_ENV_VAR, "from-env");
        let descriptor = load_config(file.path());
        std::env::remove_var(PASSWORD_ENV_VAR);

        assert_eq!(descriptor.unwrap().password.as_deref(), Some("from-env"));
    }

    #[test]
    #[serial]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/strata/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::FileSystemError { .. }));
    }
}
