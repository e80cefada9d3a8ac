//! Bilateral filter for color smoothing in the Basic chain.
//!
//! Each output pixel is a weighted mean of its neighbors inside a
//! circular window, where the weight falls off with both spatial distance
//! and color difference. Flat regions flatten; strong color edges survive.

use image::{Rgb, RgbImage};

/// Apply a bilateral filter to an RGB image.
///
/// - `diameter`: window diameter in pixels (odd). Only neighbors within
///   `diameter / 2` of the center, measured in Euclidean distance,
///   contribute.
/// - `sigma_color`: range sigma. Color difference is the sum of absolute
///   per-channel differences, so one weight is shared by all channels.
/// - `sigma_space`: spatial sigma in pixels.
///
/// Samples outside the image repeat the nearest border pixel.
#[must_use = "returns the filtered image"]
pub fn bilateral_filter(
    image: &RgbImage,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> RgbImage {
    let (w, h) = image.dimensions();
    let radius = i64::from(diameter / 2);
    if radius == 0 || w == 0 || h == 0 {
        return image.clone();
    }

    let offsets = window_offsets(radius, sigma_space);
    let color_weights = color_weight_table(sigma_color);
    let (max_x, max_y) = (i64::from(w) - 1, i64::from(h) - 1);

    RgbImage::from_fn(w, h, |x, y| {
        let center = image.get_pixel(x, y).0;
        let mut sum = [0.0f32; 3];
        let mut weight_sum = 0.0f32;

        for &(dx, dy, spatial) in &offsets {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (nx, ny) = (
                (i64::from(x) + dx).clamp(0, max_x) as u32,
                (i64::from(y) + dy).clamp(0, max_y) as u32,
            );
            let neighbor = image.get_pixel(nx, ny).0;
            let distance: usize = center
                .iter()
                .zip(&neighbor)
                .map(|(&a, &b)| usize::from(a.abs_diff(b)))
                .sum();
            let weight = spatial * color_weights[distance];

            for (acc, &v) in sum.iter_mut().zip(&neighbor) {
                *acc += weight * f32::from(v);
            }
            weight_sum += weight;
        }

        // The center always contributes with weight 1, so weight_sum > 0.
        Rgb(sum.map(|s| quantize(s / weight_sum)))
    })
}

/// Window offsets inside the circle of `radius`, each with its spatial
/// weight.
fn window_offsets(radius: i64, sigma_space: f32) -> Vec<(i64, i64, f32)> {
    let coeff = -0.5 / (sigma_space * sigma_space);
    let mut offsets = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = dx * dx + dy * dy;
            if r2 > radius * radius {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let weight = (coeff * r2 as f32).exp();
            offsets.push((dx, dy, weight));
        }
    }
    offsets
}

/// Range weights indexed by L1 color distance (0 ..= 3 * 255).
fn color_weight_table(sigma_color: f32) -> Vec<f32> {
    let coeff = -0.5 / (sigma_color * sigma_color);
    (0..=3 * 255u16)
        .map(|d| {
            let d = f32::from(d);
            (coeff * d * d).exp()
        })
        .collect()
}

/// Round and saturate a filtered sample to `u8`.
pub(crate) fn quantize(value: f32) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let v = value.round().clamp(0.0, 255.0) as u8;
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_image_is_unchanged() {
        let img = RgbImage::from_pixel(12, 12, Rgb([90, 140, 200]));
        let out = bilateral_filter(&img, 9, 75.0, 75.0);
        assert_eq!(out, img);
    }

    #[test]
    fn diameter_one_is_identity() {
        let img = RgbImage::from_fn(6, 6, |x, y| Rgb([(x * 40) as u8, (y * 40) as u8, 7]));
        assert_eq!(bilateral_filter(&img, 1, 75.0, 75.0), img);
    }

    #[test]
    fn strong_edge_survives_weak_noise_flattens() {
        // Left half dark with +/-4 noise, right half bright.
        let img = RgbImage::from_fn(20, 10, |x, y| {
            if x < 10 {
                let n = if (x + y) % 2 == 0 { 4 } else { 0 };
                Rgb([20 + n, 20 + n, 20 + n])
            } else {
                Rgb([230, 230, 230])
            }
        });
        let out = bilateral_filter(&img, 9, 30.0, 75.0);

        // Noise amplitude shrinks inside the dark region.
        let a = i16::from(out.get_pixel(4, 4).0[0]);
        let b = i16::from(out.get_pixel(5, 4).0[0]);
        assert!((a - b).abs() < 4, "noise not flattened: {a} vs {b}");

        // The edge stays sharp: no bright bleed into the dark side.
        assert!(out.get_pixel(9, 5).0[0] < 40);
        assert!(out.get_pixel(10, 5).0[0] > 210);
    }

    #[test]
    fn output_dimensions_match_input() {
        let img = RgbImage::new(17, 31);
        let out = bilateral_filter(&img, 5, 50.0, 50.0);
        assert_eq!(out.dimensions(), (17, 31));
    }

    #[test]
    fn quantize_rounds_and_saturates() {
        assert_eq!(quantize(-3.0), 0);
        assert_eq!(quantize(12.5), 13);
        assert_eq!(quantize(12.49), 12);
        assert_eq!(quantize(300.0), 255);
    }
}
