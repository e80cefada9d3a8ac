//! The two classic filter chains.
//!
//! Each chain takes the normalized RGB image and returns its
//! intermediates together with the final output. Stage boundaries go
//! through a [`StageObserver`] so the same code serves plain runs and
//! timed diagnostic runs.

use crate::diagnostics::{StageId, StageMetrics, StageObserver, count_pixels};
use crate::types::{FilterParameters, Intermediates, PipelineError, RgbImage};
use crate::{bilateral, blur, combine, edge, grayscale, smoothing, threshold};

/// Output of one chain.
pub(crate) struct ChainOutput {
    pub intermediates: Intermediates,
    pub output: RgbImage,
}

/// Basic: median-blurred luma, adaptive-threshold mask, bilateral color,
/// then AND the mask into the color image.
pub(crate) fn basic<O: StageObserver>(
    rgb: &RgbImage,
    params: &FilterParameters,
    obs: &mut O,
) -> Result<ChainOutput, PipelineError> {
    let total = u64::from(rgb.width()) * u64::from(rgb.height());

    let gray = obs.observe(
        StageId::Grayscale,
        || grayscale::luma(rgb),
        |g| StageMetrics::Grayscale {
            width: g.width(),
            height: g.height(),
        },
    );

    let blurred = obs.observe(
        StageId::MedianBlur,
        || blur::median_blur(&gray, params.blur_kernel),
        |_| StageMetrics::MedianBlur {
            kernel: params.blur_kernel,
        },
    );

    let edges = obs.observe(
        StageId::AdaptiveThreshold,
        || threshold::adaptive_mean_threshold(&blurred, params.block_size, params.threshold_offset),
        |mask| StageMetrics::Edges {
            edge_pixel_count: count_pixels(mask, 0),
            total_pixel_count: total,
        },
    );

    let smoothed = obs.observe(
        StageId::Bilateral,
        || {
            bilateral::bilateral_filter(
                rgb,
                params.bilateral_diameter,
                params.bilateral_sigma_color,
                params.bilateral_sigma_space,
            )
        },
        |_| StageMetrics::Bilateral {
            diameter: params.bilateral_diameter,
            sigma_color: params.bilateral_sigma_color,
            sigma_space: params.bilateral_sigma_space,
        },
    );

    let output = obs.try_observe(
        StageId::Combine,
        || combine::mask_and(&smoothed, &edges),
        |_| StageMetrics::Composite {
            masked_pixel_count: count_pixels(&edges, 0),
        },
    )?;

    Ok(ChainOutput {
        intermediates: Intermediates::Basic {
            grayscale: gray,
            blurred,
            edges,
            smoothed,
        },
        output,
    })
}

/// Smooth: domain-transform smoothing and detail enhancement blended
/// together, with dilated hysteresis edges painted white on top.
pub(crate) fn smooth<O: StageObserver>(
    rgb: &RgbImage,
    params: &FilterParameters,
    obs: &mut O,
) -> Result<ChainOutput, PipelineError> {
    let total = u64::from(rgb.width()) * u64::from(rgb.height());

    let smoothed = obs.observe(
        StageId::EdgePreserving,
        || {
            smoothing::edge_preserving_filter(
                rgb,
                params.smoothing_sigma_spatial,
                params.smoothing_sigma_range,
            )
        },
        |_| StageMetrics::Smoothing {
            sigma_spatial: params.smoothing_sigma_spatial,
            sigma_range: params.smoothing_sigma_range,
        },
    );

    let detail = obs.observe(
        StageId::DetailEnhance,
        || {
            smoothing::detail_enhance(
                &smoothed,
                params.detail_sigma_spatial,
                params.detail_sigma_range,
            )
        },
        |_| StageMetrics::Smoothing {
            sigma_spatial: params.detail_sigma_spatial,
            sigma_range: params.detail_sigma_range,
        },
    );

    let gray = obs.observe(
        StageId::Grayscale,
        || grayscale::luma(rgb),
        |g| StageMetrics::Grayscale {
            width: g.width(),
            height: g.height(),
        },
    );

    let blurred = obs.observe(
        StageId::GaussianBlur,
        || blur::gaussian_blur(&gray, params.edge_blur_sigma),
        |_| StageMetrics::GaussianBlur {
            sigma: params.edge_blur_sigma,
        },
    );

    let raw_edges = obs.observe(
        StageId::EdgeDetection,
        || edge::canny(&blurred, params.canny_low, params.canny_high),
        |e| StageMetrics::Edges {
            edge_pixel_count: count_pixels(e, 255),
            total_pixel_count: total,
        },
    );

    let edges = obs.observe(
        StageId::Dilate,
        || edge::dilate(&raw_edges, params.dilate_size),
        |e| StageMetrics::Edges {
            edge_pixel_count: count_pixels(e, 255),
            total_pixel_count: total,
        },
    );

    let blended = obs.try_observe(
        StageId::Blend,
        || combine::blend(&detail, params.detail_weight, &smoothed),
        |_| StageMetrics::Blend {
            detail_weight: params.detail_weight,
        },
    )?;

    let output = obs.try_observe(
        StageId::Overlay,
        || combine::mask_or(&blended, &edges),
        |_| StageMetrics::Composite {
            masked_pixel_count: count_pixels(&edges, 255),
        },
    )?;

    Ok(ChainOutput {
        intermediates: Intermediates::Smooth {
            grayscale: gray,
            blurred,
            edges,
            smoothed,
            detail,
        },
        output,
    })
}
