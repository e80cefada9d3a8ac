//! toonify: cartoonize an image file from the command line.
//!
//! Reads an image, runs one of the cartoon filter chains, and writes the
//! result as PNG or JPEG. Optionally prints per-stage diagnostics.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin toonify -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Set `RUST_LOG` for finer control over log output; `-v` enables debug
//! logging for the whole pipeline.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use toonify_export::{DEFAULT_JPEG_QUALITY, OutputFormat};
use toonify_pipeline::diagnostics::Clock;
use toonify_pipeline::neural::DEFAULT_MODEL_PATH;
use toonify_pipeline::{
    Cartoonizer, FilterParameters, MAX_INPUT_BYTES, RgbImage, Variant, Warning,
};
use tracing_subscriber::EnvFilter;

/// Turn a photo into a cartoon-style image.
///
/// Runs a fixed chain of classic image filters (blur, adaptive
/// threshold, bilateral smoothing) or the smoother edge-preserving
/// variant, and writes the result to `<stem>_cartoon.<ext>` in the
/// current directory unless `--output` says otherwise.
#[derive(Parser)]
#[command(name = "toonify", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Filter chain to run.
    #[arg(long, value_enum, default_value_t = VariantArg::Basic)]
    variant: VariantArg,

    /// Median blur kernel size (odd, 1-255).
    #[arg(
        long,
        default_value_t = FilterParameters::DEFAULT_BLUR_KERNEL,
        value_parser = clap::value_parser!(u32).range(1..=i64::from(FilterParameters::MAX_KERNEL_SIZE)),
    )]
    blur_strength: u32,

    /// Adaptive-threshold block size (odd, 3-255).
    #[arg(
        long,
        default_value_t = FilterParameters::DEFAULT_BLOCK_SIZE,
        value_parser = clap::value_parser!(u32).range(3..=i64::from(FilterParameters::MAX_KERNEL_SIZE)),
    )]
    edge_thickness: u32,

    /// Output format. Inferred from `--output` when omitted, else JPEG.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Where to write the result. Defaults to `<stem>_cartoon.<ext>` in
    /// the current directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to the neural style-transfer weights.
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Full filter parameters as a JSON string.
    ///
    /// When provided, `--blur-strength` and `--edge-thickness` are
    /// ignored. Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Print a per-stage timing report.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    /// Implies `--diagnostics`.
    #[arg(long)]
    json: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

/// Filter chain selection.
#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    /// Median blur + adaptive threshold edges over bilateral color.
    Basic,
    /// Edge-preserving smoothing and detail enhancement with bold edges.
    Smooth,
    /// Neural style transfer; falls back to smooth when unavailable.
    Neural,
}

impl From<VariantArg> for Variant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Basic => Self::Basic,
            VariantArg::Smooth => Self::Smooth,
            VariantArg::Neural => Self::Neural,
        }
    }
}

/// Output format selection.
#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Lossless PNG.
    Png,
    /// JPEG at `--quality`.
    Jpeg,
}

/// Build [`FilterParameters`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored.
fn params_from_cli(cli: &Cli) -> Result<FilterParameters, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(FilterParameters {
        blur_kernel: cli.blur_strength,
        block_size: cli.edge_thickness,
        ..FilterParameters::default()
    })
}

/// Resolve the output format from `--format`, then the `--output`
/// extension, then the JPEG default.
fn format_from_cli(cli: &Cli) -> OutputFormat {
    match cli.format {
        Some(FormatArg::Png) => OutputFormat::Png,
        Some(FormatArg::Jpeg) => OutputFormat::Jpeg {
            quality: cli.quality,
        },
        None => match cli.output.as_deref().and_then(OutputFormat::from_path) {
            Some(OutputFormat::Jpeg { .. }) | None => OutputFormat::Jpeg {
                quality: cli.quality,
            },
            Some(format) => format,
        },
    }
}

/// Log filter from `RUST_LOG`, falling back to warnings only when it is
/// unset or unparsable. `-v` raises everything to debug on top.
fn log_filter(rust_log: Option<&str>, verbose: bool) -> EnvFilter {
    let filter = rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    if verbose {
        filter.add_directive(tracing::Level::DEBUG.into())
    } else {
        filter
    }
}

fn init_logging(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), verbose))
        .with_writer(std::io::stderr)
        .init();
}

/// Read the input file, refusing anything over [`MAX_INPUT_BYTES`].
fn read_input(path: &Path) -> Result<Vec<u8>, String> {
    let size = std::fs::metadata(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?
        .len();
    if size > MAX_INPUT_BYTES as u64 {
        return Err(format!(
            "Error: {} is {size} bytes, larger than the {MAX_INPUT_BYTES} byte limit",
            path.display(),
        ));
    }
    std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let params = match params_from_cli(&cli) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match read_input(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let model_present = cli.model.is_file();
    let engine = Cartoonizer::probe(model_present);
    tracing::debug!(
        model = %cli.model.display(),
        capability = ?engine.capability(),
        "probed neural backend",
    );

    let variant = Variant::from(cli.variant);
    let (image, warnings) = match run(&cli, &engine, &image_bytes, variant, &params) {
        Ok(result) => result,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    for warning in &warnings {
        eprintln!("Warning: {warning}");
    }

    let format = format_from_cli(&cli);
    let encoded = match toonify_export::encode(&image, format) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Export error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let output_path = cli.output.clone().unwrap_or_else(|| {
        let source_name = cli.image_path.file_name().and_then(|s| s.to_str());
        PathBuf::from(toonify_export::suggested_filename(source_name, format))
    });
    match std::fs::write(&output_path, &encoded) {
        Ok(()) => {
            eprintln!(
                "{format} written to {} ({} bytes)",
                output_path.display(),
                encoded.len(),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error writing {}: {e}", output_path.display());
            ExitCode::FAILURE
        }
    }
}

/// Run the pipeline, printing diagnostics when asked for.
fn run(
    cli: &Cli,
    engine: &Cartoonizer,
    image_bytes: &[u8],
    variant: Variant,
    params: &FilterParameters,
) -> Result<(RgbImage, Vec<Warning>), String> {
    if !(cli.diagnostics || cli.json) {
        let cartoon = engine
            .process(image_bytes, variant, params)
            .map_err(|e| format!("Pipeline error: {e}"))?;
        return Ok((cartoon.image, cartoon.warnings));
    }

    let (staged, diagnostics) = engine
        .cartoonize_with_diagnostics(image_bytes, variant, params, &StdClock)
        .map_err(|e| format!("Pipeline error: {e}"))?;
    if cli.json {
        let json = serde_json::to_string_pretty(&diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", diagnostics.report());
    }
    let cartoon = staged.into_cartoon();
    Ok((cartoon.image, cartoon.warnings))
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
