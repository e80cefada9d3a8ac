//! Noise-reduction blurs applied to the grayscale image before edge
//! extraction.
//!
//! [`median_blur`] feeds the adaptive threshold of the Basic chain;
//! [`gaussian_blur`] feeds the hysteresis edge detector of the Smooth
//! chain. Both wrap `imageproc::filter` and never touch color data.

use image::GrayImage;

/// Apply a median filter over a `kernel` x `kernel` square.
///
/// `kernel` must be odd (enforced by
/// [`FilterParameters::validate`](crate::FilterParameters::validate));
/// a kernel of 1 returns the image unchanged. Border pixels use the
/// nearest in-bounds neighbors.
#[must_use = "returns the blurred image"]
pub fn median_blur(image: &GrayImage, kernel: u32) -> GrayImage {
    let radius = kernel / 2;
    if radius == 0 {
        return image.clone();
    }

    imageproc::filter::median_filter(image, radius, radius)
}

/// Gaussian blur with standard deviation `sigma`.
///
/// `imageproc` panics on `sigma <= 0.0`; such values return a copy of
/// the input instead.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}
