//! Pixel-wise compositing of color images and edge masks.

use image::{GrayImage, Rgb, RgbImage};

use crate::types::PipelineError;

/// Bitwise AND of every color channel with the mask broadcast across
/// channels. With a binary mask this blacks out mask-0 pixels and keeps
/// mask-255 pixels unchanged.
///
/// # Errors
///
/// Returns [`PipelineError::Filter`] if the two images differ in size.
pub fn mask_and(color: &RgbImage, mask: &GrayImage) -> Result<RgbImage, PipelineError> {
    combine_with_mask("combine", color, mask, |c, m| c & m)
}

/// Bitwise OR of every color channel with the mask broadcast across
/// channels. With a binary mask this paints mask-255 pixels white.
///
/// # Errors
///
/// Returns [`PipelineError::Filter`] if the two images differ in size.
pub fn mask_or(color: &RgbImage, mask: &GrayImage) -> Result<RgbImage, PipelineError> {
    combine_with_mask("overlay", color, mask, |c, m| c | m)
}

/// Weighted blend `round(weight * a + (1 - weight) * b)`, saturated.
///
/// # Errors
///
/// Returns [`PipelineError::Filter`] if the two images differ in size.
pub fn blend(a: &RgbImage, weight: f32, b: &RgbImage) -> Result<RgbImage, PipelineError> {
    if a.dimensions() != b.dimensions() {
        return Err(size_mismatch("blend", a.dimensions(), b.dimensions()));
    }
    let rest = 1.0 - weight;
    Ok(RgbImage::from_fn(a.width(), a.height(), |x, y| {
        let (pa, pb) = (a.get_pixel(x, y).0, b.get_pixel(x, y).0);
        Rgb([0, 1, 2].map(|c| {
            crate::bilateral::quantize(weight.mul_add(f32::from(pa[c]), rest * f32::from(pb[c])))
        }))
    }))
}

fn combine_with_mask(
    stage: &'static str,
    color: &RgbImage,
    mask: &GrayImage,
    op: impl Fn(u8, u8) -> u8,
) -> Result<RgbImage, PipelineError> {
    if color.dimensions() != mask.dimensions() {
        return Err(size_mismatch(stage, color.dimensions(), mask.dimensions()));
    }
    let mut out = color.clone();
    for (p, m) in out.pixels_mut().zip(mask.pixels()) {
        let m = m.0[0];
        p.0 = p.0.map(|c| op(c, m));
    }
    Ok(out)
}

fn size_mismatch(stage: &'static str, a: (u32, u32), b: (u32, u32)) -> PipelineError {
    PipelineError::Filter {
        stage,
        reason: format!("size mismatch: {}x{} vs {}x{}", a.0, a.1, b.0, b.1),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn half_mask(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, _| image::Luma([if x < w / 2 { 0 } else { 255 }]))
    }

    #[test]
    fn and_blacks_out_masked_pixels() {
        let color = RgbImage::from_pixel(4, 2, Rgb([10, 200, 77]));
        let out = mask_and(&color, &half_mask(4, 2)).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(3, 1).0, [10, 200, 77]);
    }

    #[test]
    fn or_whitens_masked_pixels() {
        let color = RgbImage::from_pixel(4, 2, Rgb([10, 200, 77]));
        let out = mask_or(&color, &half_mask(4, 2)).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [10, 200, 77]);
        assert_eq!(out.get_pixel(3, 1).0, [255, 255, 255]);
    }

    #[test]
    fn blend_weights_inputs() {
        let a = RgbImage::from_pixel(2, 2, Rgb([200, 100, 0]));
        let b = RgbImage::from_pixel(2, 2, Rgb([0, 100, 250]));
        let out = blend(&a, 0.8, &b).unwrap();
        assert_eq!(out.get_pixel(1, 1).0, [160, 100, 50]);
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let color = RgbImage::new(4, 4);
        let mask = GrayImage::new(3, 4);
        let err = mask_and(&color, &mask).unwrap_err();
        assert!(matches!(err, PipelineError::Filter { stage: "combine", .. }));
        assert!(blend(&color, 0.5, &RgbImage::new(4, 5)).is_err());
    }
}
