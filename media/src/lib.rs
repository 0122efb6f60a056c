//! Client-side photo compression before upload.
//!
//! [`MediaCompressor`] takes an image file and re-encodes it as JPEG at
//! decreasing quality until the result fits under a byte budget.
//!
//! # Algorithm
//!
//! 1. Missing source: [`CompressionError::NotFound`], nothing is written.
//! 2. Source already within budget: returned unchanged (no re-encode).
//! 3. Decode (format sniffed from content, extension as fallback).
//! 4. Encode at quality 100, 90, ... into `compressed_<id>_<stem>.jpg` next to the
//!    source, overwriting the previous attempt and measuring each write.
//! 5. First attempt within budget wins. After each miss the quality drops by the
//!    step; the ladder stops once the next quality would reach the floor, so with
//!    the defaults the last attempt is quality 20.
//!
//! The `<id>` is unique per call, so concurrent or repeated calls on the same
//! source never share an output file. A failed call removes its attempt file.
//!
//! Compression is CPU-bound and blocking. [`MediaCompressor::compress`] runs it
//! on the blocking thread pool; [`MediaCompressor::compress_blocking`] is the
//! synchronous form for callers already off the async executor.

mod capture;

use std::fs::{self, File};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageError, ImageReader};
use thiserror::Error;
use uuid::Uuid;

pub use capture::{capture_path, stage_for_upload};

/// Default upload budget: 1 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 1_048_576;

const COMPRESSED_PREFIX: &str = "compressed_";

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("source image not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to decode image {}: {source}", path.display())]
    DecodeFailed {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error(
        "could not fit {} under {max_bytes} bytes (last attempt: {last_size} bytes at quality {last_quality})",
        path.display()
    )]
    BudgetUnreachable {
        path: PathBuf,
        max_bytes: u64,
        last_quality: u8,
        last_size: u64,
    },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("compression task failed: {0}")]
    TaskFailed(String),
}

/// A file at or under the requested budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// JPEG quality of the winning attempt; `None` when the source was
    /// already small enough and returned as-is.
    pub quality: Option<u8>,
}

impl CompressedFile {
    #[must_use]
    pub fn was_reencoded(&self) -> bool {
        self.quality.is_some()
    }
}

/// Budget and quality ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaOptions {
    pub max_bytes: u64,
    /// First quality tried.
    pub quality_start: u8,
    /// Decrement between attempts (at least 1).
    pub quality_step: u8,
    /// Exclusive lower bound: no attempt is made at or below this quality
    /// unless it is `quality_start` itself.
    pub quality_floor: u8,
}

impl Default for MediaOptions {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            quality_start: 100,
            quality_step: 10,
            quality_floor: 10,
        }
    }
}

impl MediaOptions {
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Qualities attempted, in order.
    pub fn quality_ladder(&self) -> impl Iterator<Item = u8> + use<> {
        let step = self.quality_step.max(1);
        let floor = self.quality_floor;
        std::iter::successors(Some(self.quality_start.clamp(1, 100)), move |quality| {
            quality.checked_sub(step).filter(|next| *next > floor)
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaCompressor {
    options: MediaOptions,
}

impl MediaCompressor {
    #[must_use]
    pub fn new(options: MediaOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &MediaOptions {
        &self.options
    }

    /// Compress on the blocking thread pool.
    pub async fn compress(
        &self,
        source: impl Into<PathBuf>,
    ) -> Result<CompressedFile, CompressionError> {
        let source = source.into();
        let compressor = self.clone();
        tokio::task::spawn_blocking(move || compressor.compress_blocking(&source))
            .await
            .map_err(|e| CompressionError::TaskFailed(e.to_string()))?
    }

    pub fn compress_blocking(&self, source: &Path) -> Result<CompressedFile, CompressionError> {
        let max_bytes = self.options.max_bytes;
        let source_size = match fs::metadata(source) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return Err(CompressionError::NotFound(source.to_path_buf())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CompressionError::NotFound(source.to_path_buf()));
            }
            Err(source_err) => {
                return Err(CompressionError::Io {
                    path: source.to_path_buf(),
                    source: source_err,
                });
            }
        };

        if source_size <= max_bytes {
            tracing::debug!(
                path = %source.display(),
                size = source_size,
                max_bytes,
                "Image already within budget"
            );
            return Ok(CompressedFile {
                path: source.to_path_buf(),
                size_bytes: source_size,
                quality: None,
            });
        }

        let image = decode(source)?;
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        drop(image);

        let target = attempt_path(source, Uuid::new_v4());
        let mut last_attempt = None;

        for quality in self.options.quality_ladder() {
            let size = match write_attempt(&rgb, &target, quality) {
                Ok(size) => size,
                Err(e) => {
                    discard(&target);
                    return Err(e);
                }
            };
            tracing::debug!(path = %target.display(), quality, size, max_bytes, "Compression attempt");

            if size <= max_bytes {
                tracing::info!(
                    source = %source.display(),
                    output = %target.display(),
                    quality,
                    from = source_size,
                    to = size,
                    "Image compressed"
                );
                return Ok(CompressedFile {
                    path: target,
                    size_bytes: size,
                    quality: Some(quality),
                });
            }
            last_attempt = Some((quality, size));
        }

        discard(&target);
        let (last_quality, last_size) = last_attempt.unwrap_or((self.options.quality_start, 0));
        tracing::warn!(
            path = %source.display(),
            max_bytes,
            last_quality,
            last_size,
            "Image could not be compressed under budget"
        );
        Err(CompressionError::BudgetUnreachable {
            path: source.to_path_buf(),
            max_bytes,
            last_quality,
            last_size,
        })
    }
}

/// `compressed_<id>_<file stem>.jpg` in the source's directory.
///
/// The extension is always `.jpg` since every attempt is JPEG-encoded,
/// whatever the source format was.
#[must_use]
pub fn attempt_path(source: &Path, id: Uuid) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let file_name = format!("{COMPRESSED_PREFIX}{}_{stem}.jpg", id.simple());
    match source.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

fn decode(source: &Path) -> Result<DynamicImage, CompressionError> {
    let io_err = |e: io::Error| CompressionError::Io {
        path: source.to_path_buf(),
        source: e,
    };
    ImageReader::open(source)
        .map_err(io_err)?
        .with_guessed_format()
        .map_err(io_err)?
        .decode()
        .map_err(|e| CompressionError::DecodeFailed {
            path: source.to_path_buf(),
            source: e,
        })
}

/// Encode one attempt and return the size written.
fn write_attempt(image: &DynamicImage, target: &Path, quality: u8) -> Result<u64, CompressionError> {
    let io_err = |e: io::Error| CompressionError::Io {
        path: target.to_path_buf(),
        source: e,
    };

    let file = File::create(target).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    image
        .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        .map_err(|e| match e {
            ImageError::IoError(e) => io_err(e),
            other => io_err(io::Error::other(other)),
        })?;
    writer.flush().map_err(io_err)?;
    drop(writer);

    Ok(fs::metadata(target).map_err(io_err)?.len())
}

fn discard(target: &Path) {
    if let Err(e) = fs::remove_file(target)
        && e.kind() != ErrorKind::NotFound
    {
        tracing::warn!(path = %target.display(), "Failed to remove compression attempt: {e}");
    }
}
