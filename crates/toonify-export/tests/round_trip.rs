//! Integration test: run synthetic images through the pipeline, encode
//! the result and decode it again.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use image::Rgb;
use toonify_export::{OutputFormat, encode};
use toonify_pipeline::{FilterParameters, RgbImage, Variant};

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            u8::try_from(x * 255 / (width - 1)).unwrap(),
            u8::try_from(y * 255 / (height - 1)).unwrap(),
            128,
        ])
    })
}

fn decode_rgb(bytes: &[u8]) -> RgbImage {
    image::load_from_memory(bytes).unwrap().into_rgb8()
}

#[test]
fn png_round_trip_is_exact() {
    let img = gradient(37, 23);
    let bytes = encode(&img, OutputFormat::Png).unwrap();
    assert_eq!(decode_rgb(&bytes), img);
}

#[test]
fn jpeg_round_trip_is_close() {
    let img = gradient(64, 64);
    let bytes = encode(&img, OutputFormat::default()).unwrap();
    let back = decode_rgb(&bytes);
    assert_eq!(back.dimensions(), img.dimensions());

    let total: u64 = img
        .as_raw()
        .iter()
        .zip(back.as_raw())
        .map(|(&a, &b)| u64::from(a.abs_diff(b)))
        .sum();
    let mean = total as f64 / img.as_raw().len() as f64;
    assert!(mean < 4.0, "mean absolute error {mean:.2} too large");
}

#[test]
fn pipeline_output_survives_png_export() {
    let png = encode(&gradient(48, 32), OutputFormat::Png).expect("encode input");
    let cartoon = toonify_pipeline::process(&png, Variant::Basic, &FilterParameters::default())
        .expect("pipeline should succeed");

    let bytes = encode(&cartoon.image, OutputFormat::Png).unwrap();
    let back = toonify_pipeline::grayscale::decode(&bytes).unwrap().into_rgb();
    assert_eq!(back, cartoon.image);
}

#[test]
fn encoded_cartoon_decodes_as_three_channels() {
    let png = encode(&gradient(20, 20), OutputFormat::Png).unwrap();
    for variant in [Variant::Basic, Variant::Smooth, Variant::Neural] {
        let cartoon =
            toonify_pipeline::process(&png, variant, &FilterParameters::default()).unwrap();
        let jpeg = encode(&cartoon.image, OutputFormat::default()).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.color().channel_count(), 3);
        assert_eq!((decoded.width(), decoded.height()), (20, 20));
    }
}
