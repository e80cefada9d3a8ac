//! toonify-pipeline: Pure cartoonization pipeline (sans-IO).
//!
//! Turns a photo into a cartoon-style image with one of two classic
//! filter chains:
//!
//! - **Basic**: grayscale -> median blur -> adaptive threshold edges,
//!   bilateral color smoothing, then the edges are cut into the color
//!   image.
//! - **Smooth**: edge-preserving smoothing -> detail enhancement,
//!   blended, with dilated hysteresis edges painted on top.
//!
//! A third **Neural** variant delegates to a [`NeuralStylizer`] when one
//! is registered and falls back to Smooth otherwise.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory
//! byte slices and images and returns structured data. Reading files,
//! probing for model weights and encoding output live in the front end
//! and in `toonify-export`.

pub mod bilateral;
pub mod blur;
pub mod canny;
pub mod combine;
pub mod diagnostics;
pub mod edge;
mod engine;
pub mod grayscale;
pub mod neural;
pub mod smoothing;
pub mod threshold;
pub mod types;
mod variants;

pub use engine::Cartoonizer;
pub use neural::{InferenceError, NeuralCapability, NeuralStylizer, Warning};
pub use types::{
    Cartoon, Dimensions, FilterParameters, GrayImage, Intermediates, MAX_INPUT_BYTES,
    PipelineError, RgbImage, RgbaImage, SourceImage, StagedResult, Variant,
};

/// Cartoonize a decoded image with the default engine.
///
/// The default engine has no neural backend, so [`Variant::Neural`]
/// always falls back to [`Variant::Smooth`] with a
/// [`Warning::ModelMissing`].
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameters`] if `params` fails
/// validation and [`PipelineError::EmptyImage`] if the image has no
/// pixels.
pub fn cartoonize(
    image: SourceImage,
    variant: Variant,
    params: &FilterParameters,
) -> Result<Cartoon, PipelineError> {
    Cartoonizer::default().cartoonize(image, variant, params)
}

/// Like [`cartoonize`], keeping every intermediate raster.
///
/// # Errors
///
/// Same as [`cartoonize`].
pub fn cartoonize_staged(
    image: SourceImage,
    variant: Variant,
    params: &FilterParameters,
) -> Result<StagedResult, PipelineError> {
    Cartoonizer::default().cartoonize_staged(image, variant, params)
}

/// Run the full pipeline on encoded image bytes.
///
/// # Pipeline steps
///
/// 1. Decode (PNG, JPEG, BMP, WebP) and normalize to RGB
/// 2. Run the requested variant's filter chain
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::InputTooLarge`] if it exceeds
/// [`MAX_INPUT_BYTES`].
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
/// Otherwise the same errors as [`cartoonize`].
pub fn process(
    image_bytes: &[u8],
    variant: Variant,
    params: &FilterParameters,
) -> Result<Cartoon, PipelineError> {
    Cartoonizer::default().process(image_bytes, variant, params)
}
