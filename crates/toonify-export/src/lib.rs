//! toonify-export: Pure output encoders (sans-IO)
//!
//! Turns cartoon images into downloadable bytes. Currently supports PNG
//! and JPEG.

pub mod raster;

pub use raster::{
    DEFAULT_JPEG_QUALITY, ExportError, OutputFormat, encode, suggested_filename,
};
