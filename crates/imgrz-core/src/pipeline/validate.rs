//! Source validation before decode.

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Validates source bytes before they are handed to the decoder.
#[derive(Debug, Clone)]
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Check a declared source size against the configured limit.
    pub fn check_size(&self, name: &str, size: u64) -> Result<(), PipelineError> {
        let max_bytes = self.limits.max_bytes();
        if size > max_bytes {
            return Err(PipelineError::FileTooLarge {
                name: name.to_string(),
                size_mb: size / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }
        Ok(())
    }

    /// Quick validation of a fully read source.
    ///
    /// Checks:
    /// - size is within limits
    /// - the header carries known image magic bytes
    pub fn validate(&self, name: &str, bytes: &[u8]) -> Result<(), PipelineError> {
        self.check_size(name, bytes.len() as u64)?;

        if bytes.len() < 4 {
            return Err(PipelineError::InvalidImage {
                name: name.to_string(),
                message: "too small to be a valid image".to_string(),
            });
        }

        if !Self::is_valid_image_header(bytes) {
            return Err(PipelineError::InvalidImage {
                name: name.to_string(),
                message: "unrecognized image format (invalid magic bytes)".to_string(),
            });
        }

        Ok(())
    }

    /// Check if the header bytes match known image formats.
    fn is_valid_image_header(bytes: &[u8]) -> bool {
        let header = &bytes[..bytes.len().min(12)];
        if header.len() < 4 {
            return false;
        }

        // JPEG: FF D8 FF
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return true;
        }

        // PNG: 89 50 4E 47
        if header.starts_with(&[0x89, b'P', b'N', b'G']) {
            return true;
        }

        // GIF: GIF8
        if header.starts_with(b"GIF8") {
            return true;
        }

        // WebP: RIFF....WEBP
        if header.starts_with(b"RIFF") {
            if header.len() >= 12 {
                return &header[8..12] == b"WEBP";
            }
            return true;
        }

        // BMP: BM
        if header.starts_with(b"BM") {
            return true;
        }

        // TIFF: II or MM followed by version 42
        if header.starts_with(&[b'I', b'I', 0x2A, 0x00])
            || header.starts_with(&[b'M', b'M', 0x00, 0x2A])
        {
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(LimitsConfig::default())
    }

    #[test]
    fn test_magic_bytes_jpeg() {
        let header = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_png() {
        let header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert!(Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_webp() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P'];
        assert!(Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_riff_non_webp_rejected() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'A', b'V', b'E'];
        assert!(!Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_magic_bytes_bare_ii_rejected() {
        let header = [b'I', b'I', 0x00, 0x00, 0, 0, 0, 0];
        assert!(!Validator::is_valid_image_header(&header));
    }

    #[test]
    fn test_validate_rejects_text() {
        let err = validator().validate("notes.png", b"hello world").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImage { .. }));
    }

    #[test]
    fn test_validate_rejects_tiny_input() {
        let err = validator().validate("a.gif", b"GI").unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn test_check_size_limit() {
        let v = Validator::new(LimitsConfig {
            max_file_size_mb: 1,
            ..LimitsConfig::default()
        });
        assert!(v.check_size("a.jpg", 1024).is_ok());
        let err = v.check_size("a.jpg", 3 * 1024 * 1024).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::FileTooLarge {
                size_mb: 3,
                max_mb: 1,
                ..
            }
        ));
    }
}
