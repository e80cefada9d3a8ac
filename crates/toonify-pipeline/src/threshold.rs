//! Local adaptive mean thresholding.
//!
//! Produces the Basic chain's edge mask: a pixel darker than the mean of
//! its `block_size` x `block_size` neighborhood (less a constant offset)
//! is an edge and becomes 0; everything else becomes 255.

use image::{GrayImage, Luma};

/// Binarize `image` against its local neighborhood mean.
///
/// For every pixel `p` with rounded local mean `m`, the output is 255
/// when `p > m - offset` and 0 otherwise. The neighborhood is a square of
/// side `block_size` (odd, >= 3) centered on the pixel; samples outside
/// the image repeat the nearest border pixel, so a uniform image has no
/// edges anywhere, including at its borders.
#[must_use = "returns the binary edge mask"]
pub fn adaptive_mean_threshold(image: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }

    let radius = i64::from(block_size / 2);
    let area = u32::try_from((2 * radius + 1).pow(2)).unwrap_or(u32::MAX);
    let row_sums = horizontal_box_sums(image, radius);

    let clamp_y = |y: i64| -> u32 {
        // In range by construction: clamped to [0, h - 1].
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let c = y.clamp(0, i64::from(h) - 1) as u32;
        c
    };

    GrayImage::from_fn(w, h, |x, y| {
        let center = i64::from(y);
        let sum: u32 = (center - radius..=center + radius)
            .map(|yy| row_sums[(clamp_y(yy) * w + x) as usize])
            .sum();
        let mean = (sum + area / 2) / area;
        let value = i64::from(image.get_pixel(x, y).0[0]);
        let is_background = value - i64::from(mean) > -i64::from(offset);
        Luma([if is_background { 255 } else { 0 }])
    })
}

/// Sum of each pixel's horizontal run of `2 * radius + 1` samples, with
/// border replication. Row-major, one entry per pixel.
fn horizontal_box_sums(image: &GrayImage, radius: i64) -> Vec<u32> {
    let (w, h) = image.dimensions();
    let max_x = i64::from(w) - 1;
    let mut sums = Vec::with_capacity((w as usize) * (h as usize));
    for y in 0..h {
        for x in 0..w {
            let center = i64::from(x);
            let sum: u32 = (center - radius..=center + radius)
                .map(|xx| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let xx = xx.clamp(0, max_x) as u32;
                    u32::from(image.get_pixel(xx, y).0[0])
                })
                .sum();
            sums.push(sum);
        }
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_image_has_no_edges() {
        for v in [0u8, 128, 255] {
            let img = GrayImage::from_pixel(16, 16, Luma([v]));
            let mask = adaptive_mean_threshold(&img, 9, 2);
            assert!(
                mask.pixels().all(|p| p.0[0] == 255),
                "uniform {v} image produced edge pixels",
            );
        }
    }

    #[test]
    fn dark_side_of_step_becomes_edge() {
        // Black for x < 8, white from x = 8.
        let img = GrayImage::from_fn(16, 8, |x, _| Luma([if x < 8 { 0 } else { 255 }]));
        let mask = adaptive_mean_threshold(&img, 9, 2);
        for y in 0..8 {
            // Dark pixels whose window reaches the white side are edges.
            for x in 4..8 {
                assert_eq!(mask.get_pixel(x, y).0[0], 0, "expected edge at ({x},{y})");
            }
            // Dark pixels out of reach are background.
            assert_eq!(mask.get_pixel(3, y).0[0], 255);
            // Bright pixels are never edges.
            for x in 8..16 {
                assert_eq!(mask.get_pixel(x, y).0[0], 255);
            }
        }
    }

    #[test]
    fn offset_suppresses_faint_texture() {
        // Alternating 100/101 columns: differences smaller than the offset.
        let img = GrayImage::from_fn(12, 12, |x, _| Luma([100 + u8::from(x % 2 == 0)]));
        let mask = adaptive_mean_threshold(&img, 3, 2);
        assert!(mask.pixels().all(|p| p.0[0] == 255));

        let strict = adaptive_mean_threshold(&img, 3, 0);
        assert!(strict.pixels().any(|p| p.0[0] == 0));
    }

    #[test]
    fn output_is_binary_and_same_size() {
        let img = GrayImage::from_fn(13, 7, |x, y| Luma([((x * 37 + y * 11) % 256) as u8]));
        let mask = adaptive_mean_threshold(&img, 5, 2);
        assert_eq!(mask.dimensions(), (13, 7));
        assert!(mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn block_larger_than_image_is_handled() {
        let img = GrayImage::from_fn(3, 3, |x, _| Luma([if x == 0 { 0 } else { 200 }]));
        let mask = adaptive_mean_threshold(&img, 11, 2);
        assert_eq!(mask.dimensions(), (3, 3));
        assert_eq!(mask.get_pixel(0, 1).0[0], 0);
        assert_eq!(mask.get_pixel(2, 1).0[0], 255);
    }

    #[test]
    fn extreme_offsets_saturate_the_mask() {
        let img = GrayImage::from_fn(8, 8, |x, _| Luma([if x < 4 { 10 } else { 240 }]));
        let all_edges = adaptive_mean_threshold(&img, 3, i32::MIN);
        assert!(all_edges.pixels().all(|p| p.0[0] == 0));
        let no_edges = adaptive_mean_threshold(&img, 3, i32::MAX);
        assert!(no_edges.pixels().all(|p| p.0[0] == 255));
    }
}
