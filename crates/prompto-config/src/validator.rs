//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_api(config, &mut result);
        Self::validate_engine(config, &mut result);
        Self::validate_storage(config, &mut result);

        result
    }

    fn validate_api(config: &Config, result: &mut ValidationResult) {
        let url = &config.api.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            result.add_error(ValidationError::new(
                "api.base_url",
                "base_url must start with http:// or https://",
            ));
        } else if url.starts_with("http://")
            && !url.contains("://localhost")
            && !url.contains("://127.0.0.1")
        {
            result.add_warning(ValidationWarning::new(
                "api.base_url",
                "plain http to a non-local API sends the bearer token unencrypted",
            ));
        }

        if config.api.timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "api.timeout_seconds",
                "timeout_seconds must be greater than 0",
            ));
        }

        let paths = [
            ("api.enhance_path", &config.api.enhance_path),
            ("api.optimize_path", &config.api.optimize_path),
            ("api.login_path", &config.api.login_path),
        ];
        for (field, path) in paths {
            if path.is_empty() {
                result.add_error(ValidationError::new(field, "path cannot be empty"));
            }
        }
    }

    fn validate_engine(config: &Config, result: &mut ValidationResult) {
        let engine = &config.engine;

        if engine.rescan_debounce_ms == 0 {
            result.add_error(ValidationError::new(
                "engine.rescan_debounce_ms",
                "debounce must be greater than 0",
            ));
        }

        if engine.maintenance_tick_ms == 0 {
            result.add_error(ValidationError::new(
                "engine.maintenance_tick_ms",
                "maintenance tick must be greater than 0",
            ));
        } else if engine.maintenance_tick_ms > 2000 {
            result.add_warning(ValidationWarning::new(
                "engine.maintenance_tick_ms",
                "maintenance tick above 2s makes controls lag behind the input",
            ));
        }

        if engine.fallback_scan_secs == 0 {
            result.add_error(ValidationError::new(
                "engine.fallback_scan_secs",
                "fallback scan interval must be greater than 0",
            ));
        }

        if engine.min_text_chars > engine.max_text_chars {
            result.add_error(ValidationError::new(
                "engine.min_text_chars",
                "min_text_chars must not exceed max_text_chars",
            ));
        }

        if engine.bridge_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "engine.bridge_timeout_secs",
                "bridge timeout must be greater than 0",
            ));
        } else if engine.bridge_timeout_secs <= config.api.timeout_seconds {
            result.add_warning(ValidationWarning::new(
                "engine.bridge_timeout_secs",
                "bridge timeout should exceed api.timeout_seconds so API errors reach the user",
            ));
        }
    }

    fn validate_storage(config: &Config, result: &mut ValidationResult) {
        if config.storage.state_path.is_empty() {
            result.add_error(ValidationError::new(
                "storage.state_path",
                "state_path cannot be empty",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
