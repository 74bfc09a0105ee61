//! Resize, encode and save: the transform applied to every work item.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::types::ResizeParams;

use super::decode::{format_extension, ImageDecoder};
use super::validate::Validator;

/// Turns source bytes into a resized file on disk.
///
/// Shared by every work item of a batch. Output paths handed out by one
/// resizer are unique: a name already written in this batch gets a
/// `-<hash of the source>` suffix.
#[derive(Debug)]
pub struct ImageResizer {
    validator: Validator,
    decoder: ImageDecoder,
    claimed: Mutex<HashSet<PathBuf>>,
}

/// Encoded output waiting to be written.
struct Encoded {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl ImageResizer {
    /// Create a new resizer with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            validator: Validator::new(limits.clone()),
            decoder: ImageDecoder::new(limits),
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// The validator, for checking a declared size before a source is read.
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Resize `bytes` and write the result into `params.output_dir`.
    ///
    /// `name` identifies the source in errors. `file_name` is the output
    /// file name; when absent one is derived from the content hash.
    pub async fn resize_bytes(
        &self,
        bytes: Vec<u8>,
        name: &str,
        file_name: Option<&str>,
        params: &ResizeParams,
    ) -> PipelineResult<PathBuf> {
        self.validator.validate(name, &bytes)?;
        let hashed_stem = file_name.is_none().then(|| hashed_file_name(&bytes));

        let decoder = self.decoder.clone();
        let job_name = name.to_string();
        let job_params = params.clone();
        let encoded = tokio::task::spawn_blocking(move || {
            let decoded = decoder.decode(bytes, &job_name)?;
            let (width, height) = target_dimensions(
                decoded.width,
                decoded.height,
                job_params.width,
                job_params.height,
            );
            tracing::trace!(
                "  Resize {}: {}x{} -> {}x{}",
                job_name,
                decoded.width,
                decoded.height,
                width,
                height
            );
            let resized =
                decoded
                    .image
                    .resize_exact(width, height, job_params.interpolation.filter_type());
            encode(&resized, decoded.format, job_params.quality, &job_name)
        })
        .await
        .map_err(|e| PipelineError::Decode {
            name: name.to_string(),
            message: format!("Task join error: {}", e),
        })??;

        let file_name = file_name.map(String::from).unwrap_or_else(|| {
            format!(
                "{}.{}",
                hashed_stem.unwrap_or_default(),
                format_extension(encoded.format)
            )
        });
        let file_name = self.claim(&params.output_dir, file_name, name);
        save(&params.output_dir, &file_name, &encoded.bytes).await
    }

    /// Reserve `file_name` in `dir`, suffixing it when already taken.
    fn claim(&self, dir: &Path, file_name: String, source: &str) -> String {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        if claimed.insert(dir.join(&file_name)) {
            return file_name;
        }

        let hex = blake3::hash(source.as_bytes()).to_hex();
        let tag = &hex.as_str()[..8];
        let unique = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{tag}.{ext}"),
            _ => format!("{file_name}-{tag}"),
        };
        tracing::debug!(
            "{} already written in this batch; saving {} as {}",
            file_name,
            source,
            unique
        );
        claimed.insert(dir.join(&unique));
        unique
    }
}

/// Compute output dimensions, deriving a zero side from the source aspect ratio.
pub fn target_dimensions(src_w: u32, src_h: u32, width: u32, height: u32) -> (u32, u32) {
    let scale = |num: u32, ratio_num: u32, ratio_den: u32| -> u32 {
        let scaled = (u64::from(num) * u64::from(ratio_num) + u64::from(ratio_den) / 2)
            / u64::from(ratio_den.max(1));
        scaled.clamp(1, u64::from(u32::MAX)) as u32
    };
    match (width, height) {
        (0, 0) => (src_w, src_h),
        (0, h) => (scale(h, src_w, src_h), h),
        (w, 0) => (w, scale(w, src_h, src_w)),
        (w, h) => (w, h),
    }
}

fn encode(
    image: &DynamicImage,
    format: ImageFormat,
    quality: u8,
    name: &str,
) -> PipelineResult<Encoded> {
    let mut buffer = Cursor::new(Vec::new());
    let result = match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)
        }
        other => image.write_to(&mut buffer, other),
    };
    result.map_err(|e| PipelineError::Encode {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    Ok(Encoded {
        bytes: buffer.into_inner(),
        format,
    })
}

async fn save(dir: &Path, file_name: &str, bytes: &[u8]) -> PipelineResult<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PipelineError::Save {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| PipelineError::Save {
            path: path.clone(),
            message: e.to_string(),
        })?;
    Ok(path)
}

/// `remote-<hash prefix>` for sources that carry no usable file name.
fn hashed_file_name(bytes: &[u8]) -> String {
    let hash = blake3::hash(bytes).to_hex();
    format!("remote-{}", &hash.as_str()[..12])
}
