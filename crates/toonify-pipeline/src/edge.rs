//! Line extraction for the Smooth chain: hysteresis edges plus dilation.
//!
//! [`canny`] returns a binary image where white pixels (255) are edges
//! and black pixels (0) are background. [`dilate`] thickens those lines
//! so they read as ink strokes once stamped onto the color image.

use image::{GrayImage, Luma};

/// Minimum allowed hysteresis threshold.
///
/// A low threshold of zero lets every pixel with any gradient join an
/// edge chain, turning the overlay into noise.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Hysteresis edge map of `image`, 255 on lines and 0 elsewhere.
///
/// Thresholds below [`MIN_THRESHOLD`] are raised to it, and a low
/// threshold above the high one is lowered to match.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    crate::canny::canny(image, low, high)
}

/// Grayscale dilation with a `size` x `size` square structuring element.
///
/// The anchor sits at `(size / 2, size / 2)`, so an even-sized element
/// extends one pixel further up and left than down and right (a 2x2
/// element covers the pixel, its left, upper and upper-left neighbors).
/// Samples outside the image are ignored.
#[must_use = "returns the dilated image"]
pub fn dilate(image: &GrayImage, size: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if size <= 1 || w == 0 || h == 0 {
        return image.clone();
    }

    let before = i64::from(size / 2);
    let after = i64::from(size) - 1 - before;
    let (max_x, max_y) = (i64::from(w) - 1, i64::from(h) - 1);

    GrayImage::from_fn(w, h, |x, y| {
        let (x, y) = (i64::from(x), i64::from(y));
        let mut value = 0u8;
        for ny in (y - before).max(0)..=(y + after).min(max_y) {
            for nx in (x - before).max(0)..=(x + after).min(max_x) {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let v = image.get_pixel(nx as u32, ny as u32).0[0];
                value = value.max(v);
            }
        }
        Luma([value])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, _| Luma([if x < 10 { 0 } else { 255 }]))
    }

    fn lit(img: &GrayImage) -> usize {
        img.pixels().filter(|p| p.0[0] == 255).count()
    }

    #[test]
    fn flat_image_has_no_lines() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        assert_eq!(lit(&canny(&img, 100.0, 200.0)), 0);
    }

    #[test]
    fn step_is_found_with_default_thresholds() {
        assert!(lit(&canny(&step(), 100.0, 200.0)) > 0);
    }

    #[test]
    fn zero_low_threshold_is_clamped_to_min() {
        let img = step();
        assert_eq!(canny(&img, 0.0, 150.0), canny(&img, MIN_THRESHOLD, 150.0));
    }

    #[test]
    fn low_above_high_is_clamped() {
        let img = step();
        assert_eq!(canny(&img, 200.0, 100.0), canny(&img, 100.0, 100.0));
    }

    #[test]
    fn dilate_size_one_is_identity() {
        let mut img = GrayImage::new(5, 5);
        img.put_pixel(2, 2, Luma([255]));
        assert_eq!(dilate(&img, 1), img);
    }

    #[test]
    fn dilate_two_grows_down_and_right() {
        let mut img = GrayImage::new(5, 5);
        img.put_pixel(2, 2, Luma([255]));
        let out = dilate(&img, 2);

        let lit: Vec<(u32, u32)> = out
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] == 255)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert_eq!(lit, vec![(2, 2), (3, 2), (2, 3), (3, 3)]);
    }

    #[test]
    fn dilated_step_line_is_two_pixels_wide() {
        let out = dilate(&canny(&step(), 100.0, 200.0), 2);
        for y in 2..19 {
            let row: Vec<u32> = (0..20).filter(|&x| out.get_pixel(x, y).0[0] == 255).collect();
            assert_eq!(row, vec![9, 10], "row {y}");
        }
    }

    #[test]
    fn dilate_three_is_centered() {
        let mut img = GrayImage::new(5, 5);
        img.put_pixel(2, 2, Luma([255]));
        let out = dilate(&img, 3);
        let count = out.pixels().filter(|p| p.0[0] == 255).count();
        assert_eq!(count, 9);
        assert_eq!(out.get_pixel(1, 1).0[0], 255);
        assert_eq!(out.get_pixel(3, 3).0[0], 255);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn dilate_at_border_stays_in_bounds() {
        let mut img = GrayImage::new(3, 3);
        img.put_pixel(0, 0, Luma([200]));
        let out = dilate(&img, 3);
        assert_eq!(out.get_pixel(1, 1).0[0], 200);
        assert_eq!(out.get_pixel(2, 2).0[0], 0);
    }
}
