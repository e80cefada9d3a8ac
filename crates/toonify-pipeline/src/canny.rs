//! Hysteresis edge detection (Canny) without an internal blur.
//!
//! `imageproc::edges::canny` always applies its own sigma-1.4 Gaussian
//! before computing gradients, which would stack on top of the pipeline's
//! configurable pre-blur. This module runs the remaining steps directly:
//!
//! 1. Sobel gradients via [`imageproc::filter::filter_clamped`].
//! 2. L1 gradient magnitude (`|gx| + |gy|`).
//! 3. Non-maximum suppression along the quantized gradient direction.
//! 4. Hysteresis: pixels at or above `high` seed edges; 8-connected
//!    pixels at or above `low` join them.
//!
//! Neighbor lookups are bounds-checked, so edge chains that reach the
//! image border cannot underflow a `u32` coordinate.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

/// Detect edges; returns 255 on edge pixels and 0 elsewhere.
///
/// Requires `low <= high`; callers go through [`crate::edge::canny`],
/// which clamps both thresholds.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w < 3 || h < 3 {
        return GrayImage::new(w, h);
    }

    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    let magnitude: Vec<f32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(a, b)| f32::from(a.0[0].unsigned_abs()) + f32::from(b.0[0].unsigned_abs()))
        .collect();

    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);
    hysteresis(&thinned, w, h, low, high)
}

/// Gradient direction quantized to the four neighbor axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Diagonal,
    Vertical,
    AntiDiagonal,
}

impl Direction {
    fn quantize(gx: f32, gy: f32) -> Self {
        let mut angle = gy.atan2(gx).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if (22.5..67.5).contains(&angle) {
            Self::Diagonal
        } else if (67.5..112.5).contains(&angle) {
            Self::Vertical
        } else if (112.5..157.5).contains(&angle) {
            Self::AntiDiagonal
        } else {
            Self::Horizontal
        }
    }

    /// Offsets of the two neighbors compared against along the gradient.
    const fn neighbors(self) -> [(i64, i64); 2] {
        match self {
            Self::Horizontal => [(-1, 0), (1, 0)],
            Self::Diagonal => [(1, 1), (-1, -1)],
            Self::Vertical => [(0, -1), (0, 1)],
            Self::AntiDiagonal => [(-1, 1), (1, -1)],
        }
    }
}

/// Zero every pixel that is not a local maximum along its gradient.
/// On a tie only one pixel of the pair survives, so a hard step thins to
/// a single-pixel line. The one-pixel border is always zero.
fn non_maximum_suppression(
    magnitude: &[f32],
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Vec<f32> {
    let (w, h) = gx.dimensions();
    let (wu, hu) = (w as usize, h as usize);
    let mut out = vec![0.0f32; wu * hu];

    for y in 1..hu - 1 {
        for x in 1..wu - 1 {
            let i = y * wu + x;
            let m = magnitude[i];
            if m == 0.0 {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let dir = Direction::quantize(
                f32::from(gx.get_pixel(x as u32, y as u32).0[0]),
                f32::from(gy.get_pixel(x as u32, y as u32).0[0]),
            );
            let [before, after] = dir.neighbors().map(|(dx, dy)| {
                #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
                let j = ((y as i64 + dy) * wu as i64 + (x as i64 + dx)) as usize;
                magnitude[j]
            });
            let is_max = m > before && m >= after;
            if is_max {
                out[i] = m;
            }
        }
    }
    out
}

/// Keep strong edges and the weak edges connected to them.
/// Non-recursive depth-first flood over 8-connected neighbors.
fn hysteresis(thinned: &[f32], w: u32, h: u32, low: f32, high: f32) -> GrayImage {
    let mut out = GrayImage::new(w, h);
    let mut stack = Vec::new();
    let index = |x: u32, y: u32| (y as usize) * (w as usize) + x as usize;

    for y in 0..h {
        for x in 0..w {
            if thinned[index(x, y)] < high || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma([255]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let (nx, ny) = (i64::from(cx) + dx, i64::from(cy) + dy);
                        let (Ok(nx), Ok(ny)) = (u32::try_from(nx), u32::try_from(ny)) else {
                            continue;
                        };
                        if nx >= w || ny >= h {
                            continue;
                        }
                        if thinned[index(nx, ny)] >= low && out.get_pixel(nx, ny).0[0] == 0 {
                            out.put_pixel(nx, ny, Luma([255]));
                            stack.push((nx, ny));
                        }
                    }
                }
            }
        }
    }
    out
}
