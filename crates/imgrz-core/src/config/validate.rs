//! Configuration validation with range checks.

use regex::Regex;

use crate::error::ConfigError;
use crate::types::Interpolation;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.resize.quality == 0 || self.resize.quality > 100 {
            return Err(ConfigError::ValidationError(
                "resize.quality must be between 1 and 100".into(),
            ));
        }
        if Interpolation::from_mode(self.resize.interpolation).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "resize.interpolation must be between 0 and 4, got {}",
                self.resize.interpolation
            )));
        }
        if self.processing.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "processing.channel_capacity must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.fetch_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.fetch_timeout_ms must be > 0".into(),
            ));
        }
        if let (Some(min), Some(max)) = (self.filter.min_size, self.filter.max_size) {
            if min > max {
                return Err(ConfigError::ValidationError(format!(
                    "filter.min_size ({min}) must not exceed filter.max_size ({max})"
                )));
            }
        }
        for pattern in self
            .filter
            .exclude_names
            .iter()
            .chain(self.filter.include_names.iter())
        {
            Regex::new(pattern).map_err(|e| {
                ConfigError::ValidationError(format!("invalid name pattern `{pattern}`: {e}"))
            })?;
        }
        Ok(())
    }
}
