use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{LoggingSettings, ServerSettings, Settings};
use crate::persistence::{DatabaseBackend, PersistenceConfig};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Check every section and report all problems at once
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        errors.extend(Self::validate_server(&settings.server));
        errors.extend(Self::validate_database(&settings.database));
        errors.extend(Self::validate_logging(&settings.logging));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        errors
    }

    fn validate_database(database: &PersistenceConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if database.url.is_empty() {
            errors.push(ValidationError::MissingField("database.url".to_string()));
        } else if let Err(e) = DatabaseBackend::from_url(&database.url) {
            errors.push(ValidationError::InvalidValue {
                field: "database.url".to_string(),
                reason: e.to_string(),
            });
        }

        if database.max_connections == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "database.max_connections".to_string(),
                reason: "Pool needs at least one connection".to_string(),
            });
        }

        errors
    }

    fn validate_logging(logging: &LoggingSettings) -> Vec<ValidationError> {
        match EnvFilter::try_new(&logging.level) {
            Ok(_) => Vec::new(),
            Err(e) => vec![ValidationError::InvalidValue {
                field: "logging.level".to_string(),
                reason: e.to_string(),
            }],
        }
    }
}
