//! Command-line frontend
//!
//! Invoked by an image-processing service as a subprocess, one image per
//! run: `cutout <input_path> <output_path>`. On success the output path is
//! the only line on stdout; every failure prints a single diagnostic line to
//! stderr and exits non-zero. The calling service parses stdout only when
//! the exit status is zero.

use crate::{
    cache::ModelCache,
    config::RemovalConfig,
    download::ModelDownloader,
    models::{ModelSource, ModelSpec},
    processor::BackgroundRemovalProcessor,
};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Background removal CLI
///
/// The service contract is two positional paths and nothing else; help and
/// version flags are disabled so no argument is ever interpreted as an
/// option.
#[derive(Parser, Debug)]
#[command(name = "cutout", disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Image to process
    #[arg(value_name = "INPUT_PATH")]
    pub input: PathBuf,

    /// Destination for the PNG cutout
    #[arg(value_name = "OUTPUT_PATH")]
    pub output: PathBuf,
}

/// CLI entry point, returning the process exit code
pub async fn main() -> ExitCode {
    let Ok(cli) = Cli::try_parse() else {
        eprintln!("Usage: {} <input_path> <output_path>", program_name());
        return ExitCode::FAILURE;
    };

    init_tracing();

    // Checked before any decoding so a missing file gets a precise
    // diagnostic instead of a generic decode failure.
    if !cli.input.exists() {
        eprintln!("Input file does not exist: {}", cli.input.display());
        return ExitCode::FAILURE;
    }

    let output = cli.output.clone();

    // The task boundary is the outer safety net: pipeline errors report
    // through the inner arm, while a panic escaping the pipeline surfaces
    // as a join error instead of leaving the caller without a diagnostic.
    match tokio::spawn(run_removal(cli.input, cli.output)).await {
        Ok(Ok(())) => {
            println!("{}", output.display());
            ExitCode::SUCCESS
        },
        Ok(Err(e)) => {
            eprintln!("Error processing image: {e:#}");
            ExitCode::FAILURE
        },
        Err(e) => {
            eprintln!("Failed to process image: {e}");
            ExitCode::FAILURE
        },
    }
}

/// The linear pipeline: decode, resolve the model, segment, encode
async fn run_removal(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let image = crate::io::load_image(&input)?;

    let model_spec = ModelSpec::default();
    ensure_model_available(&model_spec).await?;

    let config = RemovalConfig::builder().model_spec(model_spec).build()?;
    let mut processor = BackgroundRemovalProcessor::new(config)
        .context("Failed to create background removal processor")?;

    let result = processor.process_image(&image)?;
    result.save_png(&output)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        "background removal complete"
    );
    Ok(())
}

/// Ensure the configured model is cached, downloading the default on first use
async fn ensure_model_available(model_spec: &ModelSpec) -> anyhow::Result<()> {
    let ModelSource::Cached(model_id) = &model_spec.source else {
        return Ok(());
    };

    let cache = ModelCache::new().context("Failed to open model cache")?;
    if cache.is_model_cached(model_id) {
        return Ok(());
    }

    if model_id != ModelCache::default_model_id() {
        anyhow::bail!("Model '{model_id}' not found in cache");
    }

    tracing::info!(model_id, "model not cached, downloading");
    let downloader =
        ModelDownloader::with_cache(cache).context("Failed to create model downloader")?;
    let downloaded_id = downloader
        .download_model(ModelCache::default_model_url())
        .await
        .context("Failed to download default model")?;

    anyhow::ensure!(
        downloaded_id == *model_id,
        "Downloaded model id '{downloaded_id}' does not match expected '{model_id}'"
    );
    Ok(())
}

/// Name the process was invoked as, for the usage line
fn program_name() -> String {
    std::env::args()
        .next()
        .as_deref()
        .map(std::path::Path::new)
        .and_then(std::path::Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cutout".to_string())
}

/// Diagnostics go to stderr and stay silent unless RUST_LOG asks for them,
/// keeping both streams parseable for the calling service.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
