//! Core data types shared by the resize pipeline.

use image::imageops::FilterType;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

/// Resampling filter used when resizing.
///
/// Mode numbers are stable and used by the config file and command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Mode 0
    #[default]
    Nearest,
    /// Mode 1
    Bilinear,
    /// Mode 2
    Bicubic,
    /// Mode 3
    Gaussian,
    /// Mode 4
    Lanczos3,
}

impl Interpolation {
    /// Map a mode number to an interpolation, `None` when out of range.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode {
            0 => Some(Self::Nearest),
            1 => Some(Self::Bilinear),
            2 => Some(Self::Bicubic),
            3 => Some(Self::Gaussian),
            4 => Some(Self::Lanczos3),
            _ => None,
        }
    }

    /// The `image` crate filter implementing this interpolation.
    pub fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::Bicubic => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Fixed transform parameters shared by every item of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeParams {
    /// Directory resized images are written to
    pub output_dir: PathBuf,
    /// Requested width (0 derives it from the height)
    pub width: u32,
    /// Requested height (0 derives it from the width)
    pub height: u32,
    /// Resampling filter
    pub interpolation: Interpolation,
    /// JPEG quality (1-100)
    pub quality: u8,
}

impl ResizeParams {
    /// Build parameters from the `[resize]` section of a config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir(),
            width: config.resize.width,
            height: config.resize.height,
            interpolation: Interpolation::from_mode(config.resize.interpolation)
                .unwrap_or_default(),
            quality: config.resize.quality,
        }
    }
}

/// Outcome of one successfully resized item.
///
/// Records the *requested* dimensions, not the ones the transform produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveResult {
    /// Where the resized image was written
    pub saved_path: PathBuf,
    /// Requested target width
    pub width: u32,
    /// Requested target height
    pub height: u32,
}

impl SaveResult {
    pub fn new(saved_path: PathBuf, params: &ResizeParams) -> Self {
        Self {
            saved_path,
            width: params.width,
            height: params.height,
        }
    }
}

/// Tally of a finished batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Items resized and saved
    pub succeeded: usize,

    /// Failure events reported, including verbose admission rejections
    pub failed: usize,

    /// Wall time from dispatch to handshake
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Total number of events the reporter drained.
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_modes() {
        assert_eq!(Interpolation::from_mode(0), Some(Interpolation::Nearest));
        assert_eq!(Interpolation::from_mode(2), Some(Interpolation::Bicubic));
        assert_eq!(Interpolation::from_mode(4), Some(Interpolation::Lanczos3));
        assert_eq!(Interpolation::from_mode(5), None);
        assert_eq!(Interpolation::Bilinear.filter_type(), FilterType::Triangle);
    }

    #[test]
    fn test_params_from_config() {
        let mut config = Config::default();
        config.resize.output_dir = PathBuf::from("/tmp/imgrz");
        config.resize.width = 400;
        config.resize.interpolation = 3;
        config.resize.quality = 90;

        let params = ResizeParams::from_config(&config);
        assert_eq!(params.output_dir, PathBuf::from("/tmp/imgrz"));
        assert_eq!(params.width, 400);
        assert_eq!(params.height, 0);
        assert_eq!(params.interpolation, Interpolation::Gaussian);
        assert_eq!(params.quality, 90);
    }

    #[test]
    fn test_save_result_records_requested_size() {
        let params = ResizeParams {
            output_dir: PathBuf::from("/out"),
            width: 320,
            height: 0,
            interpolation: Interpolation::Nearest,
            quality: 75,
        };
        let result = SaveResult::new(PathBuf::from("/out/a.png"), &params);
        assert_eq!(result.width, 320);
        assert_eq!(result.height, 0);
    }

    #[test]
    fn test_summary_total() {
        let summary = BatchSummary {
            succeeded: 2,
            failed: 1,
            elapsed: Duration::from_millis(5),
        };
        assert_eq!(summary.total(), 3);
    }
}
