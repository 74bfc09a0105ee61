//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resize target and output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    /// Directory resized images are written to
    pub output_dir: PathBuf,

    /// Target width in pixels (0 keeps the aspect ratio)
    pub width: u32,

    /// Target height in pixels (0 keeps the aspect ratio)
    pub height: u32,

    /// Interpolation mode: 0 nearest, 1 bilinear, 2 bicubic, 3 gaussian, 4 lanczos3
    pub interpolation: u32,

    /// JPEG quality (1-100)
    pub quality: u8,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("~/imgrz-out"),
            width: 0,
            height: 0,
            interpolation: 0,
            quality: 75,
        }
    }
}

/// Admission filter rules.
///
/// Empty lists and `None` bounds disable the corresponding check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Regex patterns; a name matching any of them is rejected
    pub exclude_names: Vec<String>,

    /// Regex patterns; when non-empty, a name must match at least one
    pub include_names: Vec<String>,

    /// Minimum source size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,

    /// Maximum source size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Extensions admitted by directory scans
    pub supported_formats: Vec<String>,

    /// Descend into subdirectories when scanning
    pub recursive: bool,

    /// Buffer size of the success and failure streams
    pub channel_capacity: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
                "webp".to_string(),
                "bmp".to_string(),
                "tif".to_string(),
                "tiff".to_string(),
            ],
            recursive: false,
            channel_capacity: 1,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum source size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Remote fetch timeout in milliseconds
    pub fetch_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
            fetch_timeout_ms: 30000,
        }
    }
}

impl LimitsConfig {
    /// Maximum source size in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
