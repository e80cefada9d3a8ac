//! Shared types for the toonify cartoonization pipeline.

use std::fmt;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::neural::Warning;

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage`: every variant produces 3-channel RGB output.
pub use image::RgbImage;

/// Re-export `RgbaImage` for callers that build [`SourceImage::Rgba`].
pub use image::RgbaImage;

/// Largest encoded input the pipeline accepts (16 MiB).
pub const MAX_INPUT_BYTES: usize = 16 * 1024 * 1024;

/// A decoded image, tagged by channel layout.
///
/// Decoders produce whichever layout the file carries; [`into_rgb`]
/// normalizes all of them to the 3-channel RGB grid every variant works
/// on. Channel order is always RGB internally.
///
/// [`into_rgb`]: Self::into_rgb
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceImage {
    /// Single-channel luminance.
    Grayscale(GrayImage),
    /// Three-channel color.
    Rgb(RgbImage),
    /// Color with alpha. Alpha is dropped on normalization.
    Rgba(RgbaImage),
}

impl SourceImage {
    /// Classify a decoded image by its channel layout.
    ///
    /// Layouts outside the three tags collapse onto the nearest one:
    /// luma+alpha becomes [`Grayscale`](Self::Grayscale), 16-bit and
    /// float images are narrowed to 8 bits per sample.
    #[must_use]
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let color = image.color();
        match (color.has_color(), color.has_alpha()) {
            (false, _) => Self::Grayscale(image.to_luma8()),
            (true, true) => Self::Rgba(image.into_rgba8()),
            (true, false) => Self::Rgb(image.into_rgb8()),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Grayscale(img) => img.width(),
            Self::Rgb(img) => img.width(),
            Self::Rgba(img) => img.width(),
        }
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Grayscale(img) => img.height(),
            Self::Rgb(img) => img.height(),
            Self::Rgba(img) => img.height(),
        }
    }

    /// Number of channels in the source layout.
    #[must_use]
    pub const fn channels(&self) -> u8 {
        match self {
            Self::Grayscale(_) => 1,
            Self::Rgb(_) => 3,
            Self::Rgba(_) => 4,
        }
    }

    /// Normalize to 3-channel RGB.
    ///
    /// Grayscale samples are replicated into all three channels; alpha
    /// is discarded without compositing.
    #[must_use]
    pub fn into_rgb(self) -> RgbImage {
        match self {
            Self::Grayscale(img) => DynamicImage::ImageLuma8(img).into_rgb8(),
            Self::Rgb(img) => img,
            Self::Rgba(img) => DynamicImage::ImageRgba8(img).into_rgb8(),
        }
    }
}

impl From<DynamicImage> for SourceImage {
    fn from(image: DynamicImage) -> Self {
        Self::from_dynamic(image)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of any `image` buffer.
    #[must_use]
    pub fn of<I: image::GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    /// Total pixel count.
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Which cartoonization chain to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Median blur + adaptive-threshold edges over a bilateral-filtered
    /// color image. Fast.
    #[default]
    Basic,
    /// Edge-preserving smoothing and detail enhancement with thickened
    /// hysteresis edges stamped on top.
    Smooth,
    /// Neural style transfer. Falls back to [`Smooth`](Self::Smooth)
    /// when no inference backend is available.
    Neural,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => f.write_str("Basic"),
            Self::Smooth => f.write_str("Smooth"),
            Self::Neural => f.write_str("Neural"),
        }
    }
}

/// Numeric knobs for both filter chains.
///
/// Defaults reproduce the stock cartoon look. All fields are public;
/// call [`validate`](Self::validate) (the pipeline entry points do) to
/// reject values the filters cannot honor.
///
/// Even kernel and block sizes are rejected rather than rounded, so a
/// caller always gets exactly the neighborhood it asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParameters {
    /// Median blur kernel side (odd, >= 1). Exposed to users as
    /// "blur strength".
    pub blur_kernel: u32,

    /// Adaptive-threshold neighborhood side (odd, >= 3). Exposed to
    /// users as "edge thickness".
    pub block_size: u32,

    /// Constant subtracted from the local mean before thresholding.
    /// Larger values produce fewer, darker-only edges.
    pub threshold_offset: i32,

    /// Bilateral filter window diameter (odd, >= 1).
    pub bilateral_diameter: u32,

    /// Bilateral range sigma: how different two colors may be and still
    /// blend.
    pub bilateral_sigma_color: f32,

    /// Bilateral spatial sigma in pixels.
    pub bilateral_sigma_space: f32,

    /// Spatial sigma of the edge-preserving smoother (Smooth variant).
    pub smoothing_sigma_spatial: f32,

    /// Range sigma of the edge-preserving smoother, in normalized
    /// intensity units (0.0 to 1.0).
    pub smoothing_sigma_range: f32,

    /// Spatial sigma of the detail-enhancement base layer.
    pub detail_sigma_spatial: f32,

    /// Range sigma of the detail-enhancement base layer.
    pub detail_sigma_range: f32,

    /// Gaussian sigma applied to the grayscale image before hysteresis
    /// edge detection.
    pub edge_blur_sigma: f32,

    /// Hysteresis low threshold: weak edges above this survive only when
    /// connected to a strong edge.
    pub canny_low: f32,

    /// Hysteresis high threshold: gradients above this are definite
    /// edges.
    pub canny_high: f32,

    /// Side of the square structuring element used to thicken edges.
    pub dilate_size: u32,

    /// Weight of the detail-enhanced image in the final blend; the
    /// smoothed image receives `1.0 - detail_weight`.
    pub detail_weight: f32,
}

impl FilterParameters {
    /// Default median blur kernel size.
    pub const DEFAULT_BLUR_KERNEL: u32 = 5;
    /// Default adaptive-threshold block size.
    pub const DEFAULT_BLOCK_SIZE: u32 = 9;
    /// Default threshold offset.
    pub const DEFAULT_THRESHOLD_OFFSET: i32 = 2;
    /// Default bilateral window diameter.
    pub const DEFAULT_BILATERAL_DIAMETER: u32 = 9;
    /// Default bilateral range sigma.
    pub const DEFAULT_BILATERAL_SIGMA_COLOR: f32 = 75.0;
    /// Default bilateral spatial sigma.
    pub const DEFAULT_BILATERAL_SIGMA_SPACE: f32 = 75.0;
    /// Default edge-preserving spatial sigma.
    pub const DEFAULT_SMOOTHING_SIGMA_SPATIAL: f32 = 60.0;
    /// Default edge-preserving range sigma.
    pub const DEFAULT_SMOOTHING_SIGMA_RANGE: f32 = 0.4;
    /// Default detail-enhancement spatial sigma.
    pub const DEFAULT_DETAIL_SIGMA_SPATIAL: f32 = 10.0;
    /// Default detail-enhancement range sigma.
    pub const DEFAULT_DETAIL_SIGMA_RANGE: f32 = 0.15;
    /// Default pre-edge Gaussian sigma (equivalent to a 3x3 kernel).
    pub const DEFAULT_EDGE_BLUR_SIGMA: f32 = 0.8;
    /// Default hysteresis low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 100.0;
    /// Default hysteresis high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 200.0;
    /// Default dilation structuring element side.
    pub const DEFAULT_DILATE_SIZE: u32 = 2;
    /// Default detail weight in the final blend.
    pub const DEFAULT_DETAIL_WEIGHT: f32 = 0.8;

    /// Largest accepted kernel, block, window or structuring-element
    /// side. Filter cost grows with the square of this value.
    pub const MAX_KERNEL_SIZE: u32 = 255;
    /// Largest accepted `threshold_offset` magnitude. Beyond one full
    /// intensity step every pixel lands on the same side of the mean.
    pub const MAX_THRESHOLD_OFFSET: i32 = 255;

    /// Check every field against the limits the filters need.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameters`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        require_odd("blur_kernel", self.blur_kernel, 1)?;
        require_odd("block_size", self.block_size, 3)?;
        require_odd("bilateral_diameter", self.bilateral_diameter, 1)?;

        if self.threshold_offset.unsigned_abs() > Self::MAX_THRESHOLD_OFFSET.unsigned_abs() {
            return Err(PipelineError::InvalidParameters(format!(
                "threshold_offset must lie in [-{max}, {max}], got {}",
                self.threshold_offset,
                max = Self::MAX_THRESHOLD_OFFSET,
            )));
        }

        for (name, value) in [
            ("bilateral_sigma_color", self.bilateral_sigma_color),
            ("bilateral_sigma_space", self.bilateral_sigma_space),
            ("smoothing_sigma_spatial", self.smoothing_sigma_spatial),
            ("smoothing_sigma_range", self.smoothing_sigma_range),
            ("detail_sigma_spatial", self.detail_sigma_spatial),
            ("detail_sigma_range", self.detail_sigma_range),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(PipelineError::InvalidParameters(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }

        if !(self.edge_blur_sigma.is_finite() && self.edge_blur_sigma >= 0.0) {
            return Err(PipelineError::InvalidParameters(format!(
                "edge_blur_sigma must be non-negative, got {}",
                self.edge_blur_sigma
            )));
        }

        if !(self.canny_low >= crate::edge::MIN_THRESHOLD
            && self.canny_high >= crate::edge::MIN_THRESHOLD)
        {
            return Err(PipelineError::InvalidParameters(format!(
                "canny thresholds must be at least {}, got low={} high={}",
                crate::edge::MIN_THRESHOLD,
                self.canny_low,
                self.canny_high
            )));
        }
        if self.canny_low > self.canny_high {
            return Err(PipelineError::InvalidParameters(format!(
                "canny_low ({}) must not exceed canny_high ({})",
                self.canny_low, self.canny_high
            )));
        }

        if !(1..=Self::MAX_KERNEL_SIZE).contains(&self.dilate_size) {
            return Err(PipelineError::InvalidParameters(format!(
                "dilate_size must lie in [1, {}], got {}",
                Self::MAX_KERNEL_SIZE,
                self.dilate_size
            )));
        }

        if !(0.0..=1.0).contains(&self.detail_weight) {
            return Err(PipelineError::InvalidParameters(format!(
                "detail_weight must lie in [0, 1], got {}",
                self.detail_weight
            )));
        }

        Ok(())
    }
}

fn require_odd(name: &str, value: u32, min: u32) -> Result<(), PipelineError> {
    if value < min {
        return Err(PipelineError::InvalidParameters(format!(
            "{name} must be at least {min}, got {value}"
        )));
    }
    if value > FilterParameters::MAX_KERNEL_SIZE {
        return Err(PipelineError::InvalidParameters(format!(
            "{name} must be at most {}, got {value}",
            FilterParameters::MAX_KERNEL_SIZE
        )));
    }
    if value % 2 == 0 {
        return Err(PipelineError::InvalidParameters(format!(
            "{name} must be odd, got {value}"
        )));
    }
    Ok(())
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            blur_kernel: Self::DEFAULT_BLUR_KERNEL,
            block_size: Self::DEFAULT_BLOCK_SIZE,
            threshold_offset: Self::DEFAULT_THRESHOLD_OFFSET,
            bilateral_diameter: Self::DEFAULT_BILATERAL_DIAMETER,
            bilateral_sigma_color: Self::DEFAULT_BILATERAL_SIGMA_COLOR,
            bilateral_sigma_space: Self::DEFAULT_BILATERAL_SIGMA_SPACE,
            smoothing_sigma_spatial: Self::DEFAULT_SMOOTHING_SIGMA_SPATIAL,
            smoothing_sigma_range: Self::DEFAULT_SMOOTHING_SIGMA_RANGE,
            detail_sigma_spatial: Self::DEFAULT_DETAIL_SIGMA_SPATIAL,
            detail_sigma_range: Self::DEFAULT_DETAIL_SIGMA_RANGE,
            edge_blur_sigma: Self::DEFAULT_EDGE_BLUR_SIGMA,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            dilate_size: Self::DEFAULT_DILATE_SIZE,
            detail_weight: Self::DEFAULT_DETAIL_WEIGHT,
        }
    }
}

/// Result of a single cartoonization request.
#[derive(Debug, Clone)]
pub struct Cartoon {
    /// The stylized image, same dimensions as the input, always RGB.
    pub image: RgbImage,
    /// Variant the caller asked for.
    pub requested: Variant,
    /// Variant that actually produced [`image`](Self::image). Differs
    /// from `requested` only when the neural path fell back.
    pub applied: Variant,
    /// Non-fatal problems encountered along the way.
    pub warnings: Vec<Warning>,
}

impl Cartoon {
    /// Whether the requested variant was replaced by a fallback.
    #[must_use]
    pub fn fell_back(&self) -> bool {
        self.requested != self.applied
    }

    /// Output dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.image)
    }
}

/// Intermediate rasters produced by one variant's filter chain.
#[derive(Debug, Clone)]
pub enum Intermediates {
    /// Stages of the Basic chain.
    Basic {
        /// Luma of the normalized input.
        grayscale: GrayImage,
        /// Median-blurred luma.
        blurred: GrayImage,
        /// Adaptive-threshold mask: 0 on edges, 255 elsewhere.
        edges: GrayImage,
        /// Bilateral-filtered color.
        smoothed: RgbImage,
    },
    /// Stages of the Smooth chain.
    Smooth {
        /// Luma of the normalized input.
        grayscale: GrayImage,
        /// Gaussian-blurred luma.
        blurred: GrayImage,
        /// Dilated hysteresis edges: 255 on edges, 0 elsewhere.
        edges: GrayImage,
        /// Edge-preserving smoothed color.
        smoothed: RgbImage,
        /// Detail-enhanced color.
        detail: RgbImage,
    },
    /// The neural backend ran; it exposes no intermediates.
    Neural,
}

/// Result of running a variant with every intermediate stage preserved.
///
/// Useful for previews and for asserting on individual stages.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Input normalized to RGB.
    pub original: RgbImage,
    /// Per-stage rasters of the chain that ran.
    pub intermediates: Intermediates,
    /// Final output.
    pub output: RgbImage,
    /// Variant the caller asked for.
    pub requested: Variant,
    /// Variant that produced [`output`](Self::output).
    pub applied: Variant,
    /// Non-fatal problems encountered along the way.
    pub warnings: Vec<Warning>,
}

impl StagedResult {
    /// The edge mask of the chain that ran, if it has one.
    #[must_use]
    pub fn edges(&self) -> Option<&GrayImage> {
        match &self.intermediates {
            Intermediates::Basic { edges, .. } | Intermediates::Smooth { edges, .. } => {
                Some(edges)
            }
            Intermediates::Neural => None,
        }
    }

    /// The smoothed color image of the chain that ran, if it has one.
    #[must_use]
    pub fn smoothed(&self) -> Option<&RgbImage> {
        match &self.intermediates {
            Intermediates::Basic { smoothed, .. } | Intermediates::Smooth { smoothed, .. } => {
                Some(smoothed)
            }
            Intermediates::Neural => None,
        }
    }

    /// Drop the intermediates, keeping only the output.
    #[must_use]
    pub fn into_cartoon(self) -> Cartoon {
        Cartoon {
            image: self.output,
            requested: self.requested,
            applied: self.applied,
            warnings: self.warnings,
        }
    }
}

/// Errors that can occur during pipeline processing.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The encoded input exceeds [`MAX_INPUT_BYTES`].
    #[error("input image is {size} bytes, larger than the {limit} byte limit")]
    InputTooLarge {
        /// Size of the rejected input.
        size: usize,
        /// Limit it exceeded.
        limit: usize,
    },

    /// The decoded image has zero width or height.
    #[error("image has no pixels")]
    EmptyImage,

    /// Filter parameters are out of range.
    #[error("invalid filter parameters: {0}")]
    InvalidParameters(String),

    /// A filter stage could not run on its input.
    #[error("{stage} failed: {reason}")]
    Filter {
        /// Stage that failed.
        stage: &'static str,
        /// What went wrong.
        reason: String,
    },
}

/// Serde-compatible proxy for `PipelineError`.
///
/// `image::ImageError` does not implement serde, so the `ImageDecode`
/// variant stores its `Display` string instead.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InputTooLarge { size: usize, limit: usize },
    EmptyImage,
    InvalidParameters(String),
    Filter { stage: String, reason: String },
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InputTooLarge { size, limit } => PipelineErrorProxy::InputTooLarge {
                size: *size,
                limit: *limit,
            },
            Self::EmptyImage => PipelineErrorProxy::EmptyImage,
            Self::InvalidParameters(s) => PipelineErrorProxy::InvalidParameters(s.clone()),
            Self::Filter { stage, reason } => PipelineErrorProxy::Filter {
                stage: (*stage).to_owned(),
                reason: reason.clone(),
            },
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The typed image error cannot be rebuilt; keep its message.
            PipelineErrorProxy::ImageDecode(msg) => Self::ImageDecode(image::ImageError::IoError(
                std::io::Error::new(std::io::ErrorKind::InvalidData, msg),
            )),
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InputTooLarge { size, limit } => {
                Self::InputTooLarge { size, limit }
            }
            PipelineErrorProxy::EmptyImage => Self::EmptyImage,
            PipelineErrorProxy::InvalidParameters(s) => Self::InvalidParameters(s),
            PipelineErrorProxy::Filter { stage, reason } => Self::Filter {
                stage: stage_name(&stage),
                reason,
            },
        })
    }
}

/// Map a deserialized stage name back onto a static label.
fn stage_name(name: &str) -> &'static str {
    crate::diagnostics::StageId::ALL
        .iter()
        .map(|s| s.label())
        .find(|label| *label == name)
        .unwrap_or("filter")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- SourceImage tests ---

    #[test]
    fn grayscale_source_replicates_into_rgb() {
        let gray = GrayImage::from_pixel(3, 2, image::Luma([77]));
        let rgb = SourceImage::Grayscale(gray).into_rgb();
        assert_eq!(rgb.dimensions(), (3, 2));
        for p in rgb.pixels() {
            assert_eq!(p.0, [77, 77, 77]);
        }
    }

    #[test]
    fn rgba_source_drops_alpha() {
        let rgba = RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 0]));
        let rgb = SourceImage::Rgba(rgba).into_rgb();
        for p in rgb.pixels() {
            assert_eq!(p.0, [10, 20, 30]);
        }
    }

    #[test]
    fn from_dynamic_classifies_layouts() {
        let gray = DynamicImage::ImageLuma8(GrayImage::new(1, 1));
        let luma_alpha = DynamicImage::ImageLumaA8(image::GrayAlphaImage::new(1, 1));
        let rgb = DynamicImage::ImageRgb8(RgbImage::new(1, 1));
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(1, 1));
        let rgb16 = DynamicImage::ImageRgb16(image::ImageBuffer::new(1, 1));

        assert_eq!(SourceImage::from(gray).channels(), 1);
        assert_eq!(SourceImage::from(luma_alpha).channels(), 1);
        assert_eq!(SourceImage::from(rgb).channels(), 3);
        assert_eq!(SourceImage::from(rgba).channels(), 4);
        assert_eq!(SourceImage::from(rgb16).channels(), 3);
    }

    // --- FilterParameters tests ---

    #[test]
    fn defaults_match_documented_values() {
        let p = FilterParameters::default();
        assert_eq!(p.blur_kernel, 5);
        assert_eq!(p.block_size, 9);
        assert_eq!(p.threshold_offset, 2);
        assert_eq!(p.bilateral_diameter, 9);
        assert!((p.smoothing_sigma_spatial - 60.0).abs() < f32::EPSILON);
        assert!((p.detail_weight - 0.8).abs() < f32::EPSILON);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn even_blur_kernel_is_rejected() {
        let p = FilterParameters {
            blur_kernel: 4,
            ..FilterParameters::default()
        };
        let err = p.validate().unwrap_err();
        assert!(
            matches!(err, PipelineError::InvalidParameters(ref msg) if msg.contains("blur_kernel")),
            "unexpected error: {err}",
        );
    }

    #[test]
    fn even_block_size_is_rejected() {
        let p = FilterParameters {
            block_size: 10,
            ..FilterParameters::default()
        };
        assert!(matches!(
            p.validate(),
            Err(PipelineError::InvalidParameters(ref msg)) if msg.contains("block_size")
        ));
    }

    #[test]
    fn block_size_one_is_rejected() {
        let p = FilterParameters {
            block_size: 1,
            ..FilterParameters::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn oversized_windows_are_rejected() {
        for (field, p) in [
            (
                "blur_kernel",
                FilterParameters {
                    blur_kernel: u32::MAX,
                    ..FilterParameters::default()
                },
            ),
            (
                "block_size",
                FilterParameters {
                    block_size: 257,
                    ..FilterParameters::default()
                },
            ),
            (
                "bilateral_diameter",
                FilterParameters {
                    bilateral_diameter: 1001,
                    ..FilterParameters::default()
                },
            ),
            (
                "dilate_size",
                FilterParameters {
                    dilate_size: 256,
                    ..FilterParameters::default()
                },
            ),
        ] {
            assert!(
                matches!(p.validate(), Err(PipelineError::InvalidParameters(ref msg)) if msg.contains(field)),
                "{field} was not rejected",
            );
        }
    }

    #[test]
    fn largest_odd_window_is_accepted() {
        let p = FilterParameters {
            blur_kernel: FilterParameters::MAX_KERNEL_SIZE,
            block_size: FilterParameters::MAX_KERNEL_SIZE,
            bilateral_diameter: FilterParameters::MAX_KERNEL_SIZE,
            dilate_size: FilterParameters::MAX_KERNEL_SIZE,
            ..FilterParameters::default()
        };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn threshold_offset_is_bounded() {
        for offset in [i32::MIN, -256, 256, i32::MAX] {
            let p = FilterParameters {
                threshold_offset: offset,
                ..FilterParameters::default()
            };
            assert!(
                matches!(p.validate(), Err(PipelineError::InvalidParameters(ref msg)) if msg.contains("threshold_offset")),
                "offset {offset} was accepted",
            );
        }
        for offset in [-255, 0, 255] {
            let p = FilterParameters {
                threshold_offset: offset,
                ..FilterParameters::default()
            };
            assert!(p.validate().is_ok(), "offset {offset} was rejected");
        }
    }

    #[test]
    fn inverted_canny_thresholds_are_rejected() {
        let p = FilterParameters {
            canny_low: 210.0,
            canny_high: 200.0,
            ..FilterParameters::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn detail_weight_out_of_range_is_rejected() {
        let p = FilterParameters {
            detail_weight: 1.5,
            ..FilterParameters::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn nan_sigma_is_rejected() {
        let p = FilterParameters {
            bilateral_sigma_color: f32::NAN,
            ..FilterParameters::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let p: FilterParameters = serde_json::from_str(r#"{"blur_kernel": 7}"#).unwrap();
        assert_eq!(p.blur_kernel, 7);
        assert_eq!(p.block_size, FilterParameters::DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn variant_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Variant::Smooth).unwrap(), "\"smooth\"");
        let v: Variant = serde_json::from_str("\"neural\"").unwrap();
        assert_eq!(v, Variant::Neural);
    }

    // --- PipelineError tests ---

    #[test]
    fn error_display_messages() {
        assert_eq!(
            PipelineError::EmptyInput.to_string(),
            "input image data is empty"
        );
        assert_eq!(
            PipelineError::InputTooLarge { size: 20, limit: 10 }.to_string(),
            "input image is 20 bytes, larger than the 10 byte limit",
        );
        assert_eq!(
            PipelineError::Filter {
                stage: "combine",
                reason: "size mismatch".to_owned(),
            }
            .to_string(),
            "combine failed: size mismatch",
        );
    }

    #[test]
    fn error_serde_keeps_variant() {
        let err = PipelineError::InvalidParameters("bad".to_owned());
        let json = serde_json::to_string(&err).unwrap();
        let back: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, PipelineError::InvalidParameters(ref s) if s == "bad"));

        let err = PipelineError::Filter {
            stage: "combine",
            reason: "x".to_owned(),
        };
        let json = serde_json::to_string(&err).unwrap();
        let back: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, PipelineError::Filter { stage: "combine", .. }));
    }

    #[test]
    fn decode_error_serializes_as_message() {
        let err = image::load_from_memory(&[0xFF, 0x00]).unwrap_err();
        let json = serde_json::to_string(&PipelineError::ImageDecode(err)).unwrap();
        let back: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, PipelineError::ImageDecode(_)));
    }
}
