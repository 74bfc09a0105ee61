//! Error types for the imgrz batch resizer.
//!
//! Per-item errors are organized by the stage that produced them so that a
//! failure line in the report always names the offending source.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for imgrz operations.
#[derive(Error, Debug)]
pub enum ImgrzError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Coarse classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The item was excluded by a filter predicate.
    Admission,
    /// The source bytes could not be read or fetched.
    Resource,
    /// Decoding, resizing, encoding or saving failed.
    Transform,
    /// A directory listing failed.
    Scan,
}

/// Per-item errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Item excluded by a name or size rule
    #[error("Skipped {name}: {reason}")]
    Rejected { name: String, reason: String },

    /// Local file does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Local file could not be read
    #[error("Read failed for {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Remote resource could not be fetched
    #[error("Fetch failed for {url}: {message}")]
    Fetch {
        url: String,
        message: String,
        status_code: Option<u16>,
    },

    /// Source exceeds the size limit
    #[error("File too large: {name} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        name: String,
        size_mb: u64,
        max_mb: u64,
    },

    /// Source bytes are not a recognizable image
    #[error("Not an image: {name} ({message})")]
    InvalidImage { name: String, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {name} after {timeout_ms}ms")]
    Timeout {
        name: String,
        stage: String,
        timeout_ms: u64,
    },

    /// Image decoding failed
    #[error("Decode error for {name}: {message}")]
    Decode { name: String, message: String },

    /// Unsupported image format
    #[error("Unsupported format for {name}: {format}")]
    UnsupportedFormat { name: String, format: String },

    /// Image dimensions exceed limit
    #[error("Image too large: {name} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        name: String,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Encoding the resized image failed
    #[error("Encode error for {name}: {message}")]
    Encode { name: String, message: String },

    /// Writing the resized image failed
    #[error("Save failed for {path}: {message}")]
    Save { path: PathBuf, message: String },

    /// A resize worker ended without producing a result
    #[error("Worker for {name} aborted: {message}")]
    Worker { name: String, message: String },

    /// Directory listing failed
    #[error("Scan failed for {path}: {message}")]
    Scan { path: PathBuf, message: String },
}

impl PipelineError {
    /// Classify this error into one of the four reporting classes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Rejected { .. } => ErrorKind::Admission,
            PipelineError::FileNotFound(_)
            | PipelineError::Read { .. }
            | PipelineError::Fetch { .. }
            | PipelineError::FileTooLarge { .. }
            | PipelineError::InvalidImage { .. }
            | PipelineError::Timeout { .. } => ErrorKind::Resource,
            PipelineError::Decode { .. }
            | PipelineError::UnsupportedFormat { .. }
            | PipelineError::ImageTooLarge { .. }
            | PipelineError::Encode { .. }
            | PipelineError::Save { .. }
            | PipelineError::Worker { .. } => ErrorKind::Transform,
            PipelineError::Scan { .. } => ErrorKind::Scan,
        }
    }

    /// Build an admission rejection for the named item.
    pub fn rejected(name: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Rejected {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for imgrz results.
pub type Result<T> = std::result::Result<T, ImgrzError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
