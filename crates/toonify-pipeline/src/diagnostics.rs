//! Pipeline diagnostics: timing and per-stage metrics.
//!
//! [`cartoonize_with_diagnostics`] runs the same chains as
//! [`crate::process`] and records, for every stage that executed, how
//! long it took and a few numbers worth looking at when tuning
//! parameters.
//!
//! Timestamps come from a caller-supplied [`Clock`], so the pipeline
//! itself never touches a platform timer.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::neural::Warning;
use crate::types::{
    Dimensions, FilterParameters, GrayImage, Intermediates, PipelineError, StagedResult, Variant,
};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
///
/// Native front ends wrap `std::time::Instant`; tests can supply a fake.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Identifies one step of a filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Byte decoding.
    Decode,
    /// Conversion of the source layout to RGB.
    Normalize,
    /// RGB to luma.
    Grayscale,
    /// Median blur (Basic).
    MedianBlur,
    /// Adaptive mean threshold (Basic).
    AdaptiveThreshold,
    /// Bilateral color smoothing (Basic).
    Bilateral,
    /// Color AND edge mask (Basic).
    Combine,
    /// Domain-transform smoothing (Smooth).
    EdgePreserving,
    /// Detail enhancement (Smooth).
    DetailEnhance,
    /// Gaussian pre-blur (Smooth).
    GaussianBlur,
    /// Hysteresis edge detection (Smooth).
    EdgeDetection,
    /// Edge thickening (Smooth).
    Dilate,
    /// Weighted blend of detail and smoothed color (Smooth).
    Blend,
    /// Blend OR edge mask (Smooth).
    Overlay,
    /// Neural stylizer.
    Neural,
}

impl StageId {
    /// Every stage, in execution order.
    pub const ALL: [Self; 15] = [
        Self::Decode,
        Self::Normalize,
        Self::Grayscale,
        Self::MedianBlur,
        Self::AdaptiveThreshold,
        Self::Bilateral,
        Self::Combine,
        Self::EdgePreserving,
        Self::DetailEnhance,
        Self::GaussianBlur,
        Self::EdgeDetection,
        Self::Dilate,
        Self::Blend,
        Self::Overlay,
        Self::Neural,
    ];

    /// Short lowercase name, also used in [`PipelineError::Filter`].
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Normalize => "normalize",
            Self::Grayscale => "grayscale",
            Self::MedianBlur => "median blur",
            Self::AdaptiveThreshold => "adaptive threshold",
            Self::Bilateral => "bilateral",
            Self::Combine => "combine",
            Self::EdgePreserving => "edge-preserving",
            Self::DetailEnhance => "detail enhance",
            Self::GaussianBlur => "gaussian blur",
            Self::EdgeDetection => "edge detection",
            Self::Dilate => "dilate",
            Self::Blend => "blend",
            Self::Overlay => "overlay",
            Self::Neural => "neural",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Variant the caller asked for.
    pub requested: Variant,
    /// Variant that produced the output.
    pub applied: Variant,
    /// Executed stages, in order.
    pub stages: Vec<StageDiagnostics>,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
    /// Non-fatal problems, e.g. a neural fallback.
    pub warnings: Vec<Warning>,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Which stage ran.
    pub stage: StageId,
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
        /// Channels in the decoded layout (1, 3 or 4).
        channels: u8,
    },
    /// Layout normalization metrics.
    Normalize {
        /// Channels before normalization.
        source_channels: u8,
    },
    /// Grayscale conversion metrics.
    Grayscale {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
    /// Median blur metrics.
    MedianBlur {
        /// Kernel side length.
        kernel: u32,
    },
    /// Gaussian blur metrics.
    GaussianBlur {
        /// Sigma value used for the blur kernel.
        sigma: f32,
    },
    /// Edge mask metrics, shared by adaptive threshold, hysteresis and
    /// dilation.
    Edges {
        /// Pixels marked as lines.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Bilateral filter metrics.
    Bilateral {
        /// Window diameter.
        diameter: u32,
        /// Range sigma.
        sigma_color: f32,
        /// Spatial sigma.
        sigma_space: f32,
    },
    /// Domain-transform filter metrics.
    Smoothing {
        /// Spatial sigma.
        sigma_spatial: f32,
        /// Range sigma.
        sigma_range: f32,
    },
    /// Blend metrics.
    Blend {
        /// Weight of the detail image.
        detail_weight: f32,
    },
    /// Mask compositing metrics.
    Composite {
        /// Pixels the mask forced to black (combine) or white (overlay).
        masked_pixel_count: u64,
    },
    /// Neural stylizer metrics.
    Neural {
        /// Whether the stylizer produced the output.
        succeeded: bool,
    },
    /// The stage returned an error.
    Failed,
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Pixels drawn as lines in the final image; zero for neural output.
    pub edge_pixel_count: u64,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        if self.requested == self.applied {
            lines.push(format!("Variant: {}", self.applied));
        } else {
            lines.push(format!(
                "Variant: {} (requested {})",
                self.applied, self.requested
            ));
        }
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for diag in &self.stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            let name = diag.stage.label();
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!("Edge pixels: {}", self.summary.edge_pixel_count));
        for warning in &self.warnings {
            lines.push(format!("Warning: {warning}"));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            channels,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height} ({channels} ch)"),
        StageMetrics::Normalize { source_channels } => format!("{source_channels} ch -> 3 ch"),
        StageMetrics::Grayscale { width, height } => format!("{width}x{height}"),
        StageMetrics::MedianBlur { kernel } => format!("kernel={kernel}"),
        StageMetrics::GaussianBlur { sigma } => format!("sigma={sigma:.2}"),
        StageMetrics::Edges {
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("edges={edge_pixel_count} ({density:.1}%)")
        }
        StageMetrics::Bilateral {
            diameter,
            sigma_color,
            sigma_space,
        } => format!("d={diameter} sc={sigma_color:.1} ss={sigma_space:.1}"),
        StageMetrics::Smoothing {
            sigma_spatial,
            sigma_range,
        } => format!("ss={sigma_spatial:.1} sr={sigma_range:.2}"),
        StageMetrics::Blend { detail_weight } => format!("w={detail_weight:.2}"),
        StageMetrics::Composite { masked_pixel_count } => format!("masked={masked_pixel_count}"),
        StageMetrics::Neural { succeeded } => {
            if *succeeded {
                "ok".to_owned()
            } else {
                "failed".to_owned()
            }
        }
        StageMetrics::Failed => "error".to_owned(),
    }
}

/// Receives each stage as the chain runs it.
///
/// The chains call [`observe`](Self::observe) around every step. The
/// metrics closure only runs if the observer wants it.
pub(crate) trait StageObserver {
    /// Run one stage.
    fn observe<T>(
        &mut self,
        stage: StageId,
        run: impl FnOnce() -> T,
        metrics: impl FnOnce(&T) -> StageMetrics,
    ) -> T;

    /// Run one fallible stage; failures are recorded as
    /// [`StageMetrics::Failed`].
    fn try_observe<T, E>(
        &mut self,
        stage: StageId,
        run: impl FnOnce() -> Result<T, E>,
        metrics: impl FnOnce(&T) -> StageMetrics,
    ) -> Result<T, E> {
        self.observe(stage, run, |result| match result {
            Ok(value) => metrics(value),
            Err(_) => StageMetrics::Failed,
        })
    }
}

/// Observer that only runs the stages.
pub(crate) struct Untimed;

impl StageObserver for Untimed {
    fn observe<T>(
        &mut self,
        stage: StageId,
        run: impl FnOnce() -> T,
        _metrics: impl FnOnce(&T) -> StageMetrics,
    ) -> T {
        let out = run();
        tracing::debug!(%stage, "stage complete");
        out
    }
}

/// Observer that times each stage against a [`Clock`].
pub(crate) struct Recorder<'c, C: Clock> {
    clock: &'c C,
    stages: Vec<StageDiagnostics>,
}

impl<'c, C: Clock> Recorder<'c, C> {
    pub(crate) const fn new(clock: &'c C) -> Self {
        Self {
            clock,
            stages: Vec::new(),
        }
    }

    pub(crate) fn into_stages(self) -> Vec<StageDiagnostics> {
        self.stages
    }
}

impl<C: Clock> StageObserver for Recorder<'_, C> {
    fn observe<T>(
        &mut self,
        stage: StageId,
        run: impl FnOnce() -> T,
        metrics: impl FnOnce(&T) -> StageMetrics,
    ) -> T {
        let start = self.clock.now();
        let out = run();
        let duration = self.clock.elapsed(&start);
        tracing::debug!(%stage, ms = duration_ms(duration), "stage complete");
        self.stages.push(StageDiagnostics {
            stage,
            duration,
            metrics: metrics(&out),
        });
        out
    }
}

/// Count pixels equal to `value` in a grayscale image.
pub(crate) fn count_pixels(image: &GrayImage, value: u8) -> u64 {
    image
        .pixels()
        .map(|p| u64::from(u8::from(p.0[0] == value)))
        .sum()
}

/// Number of pixels a chain's edge mask draws as lines.
///
/// The Basic mask marks lines with 0, the Smooth mask with 255.
pub(crate) fn line_pixel_count(intermediates: &Intermediates) -> u64 {
    match intermediates {
        Intermediates::Basic { edges, .. } => count_pixels(edges, 0),
        Intermediates::Smooth { edges, .. } => count_pixels(edges, 255),
        Intermediates::Neural => 0,
    }
}

/// Decode `image_bytes`, run `variant` with the default engine, and
/// record per-stage diagnostics.
///
/// See [`Cartoonizer::cartoonize_with_diagnostics`](crate::Cartoonizer::cartoonize_with_diagnostics).
///
/// # Errors
///
/// Same as [`crate::process`].
pub fn cartoonize_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    variant: Variant,
    params: &FilterParameters,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    crate::Cartoonizer::default().cartoonize_with_diagnostics(image_bytes, variant, params, clock)
}

/// Assemble the run-level diagnostics from the recorded stages.
pub(crate) fn collect(
    staged: &StagedResult,
    stages: Vec<StageDiagnostics>,
    total_duration: Duration,
) -> PipelineDiagnostics {
    let dims = Dimensions::of(&staged.original);
    PipelineDiagnostics {
        requested: staged.requested,
        applied: staged.applied,
        stages,
        total_duration,
        summary: PipelineSummary {
            image_width: dims.width,
            image_height: dims.height,
            pixel_count: dims.pixel_count(),
            edge_pixel_count: line_pixel_count(&staged.intermediates),
        },
        warnings: staged.warnings.clone(),
    }
}
