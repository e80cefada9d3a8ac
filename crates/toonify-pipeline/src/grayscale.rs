//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces a tagged
//! [`SourceImage`]. [`luma`] turns the normalized RGB grid into the
//! single-channel image both edge chains start from.

use image::{GrayImage, Luma, RgbImage};

use crate::types::{MAX_INPUT_BYTES, PipelineError, SourceImage};

/// Decode raw image bytes into a [`SourceImage`].
///
/// Supports PNG, JPEG, BMP, and WebP formats (whatever the `image` crate
/// can decode with the enabled features).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::InputTooLarge`] if `bytes` exceeds
/// [`MAX_INPUT_BYTES`].
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<SourceImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    if bytes.len() > MAX_INPUT_BYTES {
        return Err(PipelineError::InputTooLarge {
            size: bytes.len(),
            limit: MAX_INPUT_BYTES,
        });
    }

    let img = image::load_from_memory(bytes)?;
    Ok(SourceImage::from_dynamic(img))
}

/// Convert an RGB image to luma using ITU-R BT.601 weights
/// (`0.299*R + 0.587*G + 0.114*B`).
///
/// Computed in 14-bit fixed point so that equal R, G and B always map
/// back to the same gray value.
#[must_use = "returns the grayscale image"]
pub fn luma(image: &RgbImage) -> GrayImage {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    const SHIFT: u32 = 14;
    const _: () = assert!(R + G + B == 1 << SHIFT);

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let sum = R * u32::from(r) + G * u32::from(g) + B * u32::from(b);
        #[allow(clippy::cast_possible_truncation)]
        let v = ((sum + (1 << (SHIFT - 1))) >> SHIFT) as u8;
        Luma([v])
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn oversize_input_is_rejected_before_decoding() {
        let bytes = vec![0u8; MAX_INPUT_BYTES + 1];
        let result = decode(&bytes);
        assert!(matches!(
            result,
            Err(PipelineError::InputTooLarge { size, limit })
                if size == MAX_INPUT_BYTES + 1 && limit == MAX_INPUT_BYTES
        ));
    }

    #[test]
    fn rgba_png_decodes_as_rgba_source() {
        let img = image::RgbaImage::from_pixel(17, 31, image::Rgba([128, 64, 32, 200]));
        let source = decode(&encode_png(&img)).unwrap();
        assert_eq!(source.channels(), 4);
        assert_eq!(source.width(), 17);
        assert_eq!(source.height(), 31);
    }

    #[test]
    fn equal_channels_map_to_same_gray() {
        for v in [0u8, 1, 127, 128, 254, 255] {
            let rgb = RgbImage::from_pixel(1, 1, image::Rgb([v, v, v]));
            assert_eq!(luma(&rgb).get_pixel(0, 0).0[0], v);
        }
    }

    #[test]
    fn luma_uses_weighted_channels() {
        let px = |r, g, b| luma(&RgbImage::from_pixel(1, 1, image::Rgb([r, g, b]))).get_pixel(0, 0).0[0];
        let (r_val, g_val, b_val) = (px(255, 0, 0), px(0, 255, 0), px(0, 0, 255));

        // Green carries the highest weight, blue the lowest.
        assert!(
            g_val > r_val && r_val > b_val,
            "expected green > red > blue luminance, got R={r_val} G={g_val} B={b_val}",
        );
        assert_eq!(r_val, 76);
        assert_eq!(g_val, 150);
        assert_eq!(b_val, 29);
    }
}
