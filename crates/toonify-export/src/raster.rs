//! Raster export: cartoon images to PNG or JPEG bytes.
//!
//! Encoding goes through the `image` crate's encoders directly on the
//! RGB sample buffer. This is a pure function with no I/O; it returns a
//! `Vec<u8>`.

use std::fmt;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use toonify_pipeline::RgbImage;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Base name used when the source file name is unknown.
const DEFAULT_STEM: &str = "cartoon";

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossless PNG.
    Png,
    /// Lossy JPEG at the given quality (1-100).
    Jpeg {
        /// Encoder quality; higher is larger and closer to the source.
        quality: u8,
    },
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl OutputFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }

    /// MIME type for HTTP responses and download links.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }

    /// Pick a format from a file path's extension (case-insensitive).
    /// JPEG gets [`DEFAULT_JPEG_QUALITY`].
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::default()),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Png => f.write_str("PNG"),
            Self::Jpeg { quality } => write!(f, "JPEG (quality {quality})"),
        }
    }
}

/// Errors that can occur while encoding output.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// JPEG quality outside 1-100.
    #[error("JPEG quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),

    /// The encoder rejected the image.
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Encode `image` in `format`.
///
/// # Errors
///
/// Returns [`ExportError::InvalidQuality`] for a JPEG quality of 0 or
/// above 100, and [`ExportError::Encode`] if the encoder fails.
pub fn encode(image: &RgbImage, format: OutputFormat) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    let (w, h) = image.dimensions();
    match format {
        OutputFormat::Png => {
            PngEncoder::new(&mut buf).write_image(image.as_raw(), w, h, ExtendedColorType::Rgb8)?;
        }
        OutputFormat::Jpeg { quality } => {
            if !(1..=100).contains(&quality) {
                return Err(ExportError::InvalidQuality(quality));
            }
            JpegEncoder::new_with_quality(&mut buf, quality).write_image(
                image.as_raw(),
                w,
                h,
                ExtendedColorType::Rgb8,
            )?;
        }
    }
    Ok(buf)
}

/// File name to offer for the encoded result.
///
/// With no source name this is `cartoon.<ext>`. Otherwise the source's
/// stem is kept and `_cartoon.<ext>` appended, so `photos/cat.png`
/// becomes `cat_cartoon.jpg`.
#[must_use]
pub fn suggested_filename(source_name: Option<&str>, format: OutputFormat) -> String {
    let stem = source_name
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty());
    match stem {
        Some(stem) => format!("{stem}_{DEFAULT_STEM}.{}", format.extension()),
        None => format!("{DEFAULT_STEM}.{}", format.extension()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_format_is_jpeg_95() {
        assert_eq!(OutputFormat::default(), OutputFormat::Jpeg { quality: 95 });
        assert_eq!(suggested_filename(None, OutputFormat::default()), "cartoon.jpg");
    }

    #[test]
    fn filename_keeps_source_stem() {
        assert_eq!(
            suggested_filename(Some("photos/cat.png"), OutputFormat::default()),
            "cat_cartoon.jpg"
        );
        assert_eq!(
            suggested_filename(Some("dog.jpeg"), OutputFormat::Png),
            "dog_cartoon.png"
        );
        assert_eq!(suggested_filename(Some(""), OutputFormat::Png), "cartoon.png");
    }

    #[test]
    fn mime_types() {
        assert_eq!(OutputFormat::Png.mime_type(), "image/png");
        assert_eq!(OutputFormat::default().mime_type(), "image/jpeg");
    }

    #[test]
    fn format_from_path() {
        assert_eq!(
            OutputFormat::from_path(Path::new("out/x.PNG")),
            Some(OutputFormat::Png)
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("x.jpeg")),
            Some(OutputFormat::default())
        );
        assert_eq!(OutputFormat::from_path(Path::new("x.gif")), None);
        assert_eq!(OutputFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn png_has_signature() {
        let img = RgbImage::new(4, 4);
        let bytes = encode(&img, OutputFormat::Png).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let img = RgbImage::new(4, 4);
        let bytes = encode(&img, OutputFormat::default()).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn jpeg_quality_zero_is_rejected() {
        let img = RgbImage::new(4, 4);
        let err = encode(&img, OutputFormat::Jpeg { quality: 0 }).unwrap_err();
        assert!(matches!(err, ExportError::InvalidQuality(0)));
        assert!(encode(&img, OutputFormat::Jpeg { quality: 101 }).is_err());
    }
}
