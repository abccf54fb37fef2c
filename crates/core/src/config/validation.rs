use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("File system error: {message}")]
    FileSystemError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T: ?Sized> {
    /// Validate a configuration value
    fn validate(&self, field: &str, value: &T) -> Result<(), ConfigError>;
}

/// Port number validator
pub struct PortValidator {
    pub min: u16,
    pub max: u16,
}

impl Default for PortValidator {
    fn default() -> Self {
        Self { min: 1, max: 65535 }
    }
}

impl ConfigValidator<u16> for PortValidator {
    fn validate(&self, field: &str, value: &u16) -> Result<(), ConfigError> {
        if *value < self.min || *value > self.max {
            return Err(ConfigError::invalid_value(
                field,
                value.to_string(),
                format!("port between {} and {}", self.min, self.max),
            ));
        }
        Ok(())
    }
}

/// Rejects missing or blank string values
pub struct RequiredValidator {
    pub hint: &'static str,
}

impl ConfigValidator<Option<String>> for RequiredValidator {
    fn validate(&self, field: &str, value: &Option<String>) -> Result<(), ConfigError> {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Ok(()),
            _ => Err(ConfigError::missing_required(field, self.hint)),
        }
    }
}

/// Bounds a numeric pool setting from below
pub struct MinimumValidator {
    pub min: u64,
}

impl ConfigValidator<u64> for MinimumValidator {
    fn validate(&self, field: &str, value: &u64) -> Result<(), ConfigError> {
        if *value < self.min {
            return Err(ConfigError::invalid_value(
                field,
                value.to_string(),
                format!("a value of at least {}", self.min),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_validator_rejects_zero() {
        let validator = PortValidator::default();
        assert!(validator.validate("port", &5432).is_ok());

        let err = validator.validate("port", &0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "port"));
    }

    #[test]
    fn test_required_validator_rejects_blank() {
        let validator = RequiredValidator { hint: "set it" };
        assert!(validator.validate("host", &Some("db".to_string())).is_ok());
        assert!(validator.validate("host", &Some("   ".to_string())).is_err());

        match validator.validate("host", &None) {
            Err(ConfigError::MissingRequired { field, hint }) => {
                assert_eq!(field, "host");
                assert_eq!(hint, "set it");
            }
            other => panic!("Expected missing required error, got {:?}", other),
        }
    }

    #[test]
    fn test_minimum_validator() {
        let validator = MinimumValidator { min: 1 };
        assert!(validator.validate("pool.max_connections", &1).is_ok());
        assert!(validator.validate("pool.max_connections", &0).is_err());
    }
}
