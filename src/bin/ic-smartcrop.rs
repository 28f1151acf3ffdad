//! IC SmartCrop command-line driver.
//!
//! Two thin drivers over the same pipeline:
//!
//! ```bash
//! # One photograph; writes cropped_<name>.png next to it and prints the record.
//! ic-smartcrop crop --image capture_20240501_101500.jpg --margin 8 --scale 42
//!
//! # A directory tree; mirrors it under <input>-cropped with ic_dimensions.csv.
//! ic-smartcrop batch --input lots/2024-05 --threads 8
//! ```
//!
//! Set `RUST_LOG=ic_smartcrop=debug` for per-stage numbers.

use clap::{Parser, Subcommand};
use ic_smartcrop::pipeline::cropped_file_name;
use ic_smartcrop::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "ic-smartcrop")]
#[command(about = "Detect, level and crop packaged IC chips in photographs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Pipeline options shared by both drivers.
#[derive(clap::Args)]
struct PipelineArgs {
    /// JSON file with a pipeline configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fixed margin kept around the chip body, in pixels
    #[arg(long)]
    margin: Option<u32>,

    /// Pixels per millimetre, enables physical dimensions
    #[arg(long)]
    scale: Option<f32>,

    /// Trim protruding leads with projection profiles
    #[arg(long)]
    refine: bool,

    /// Encode crops as JPEG with this quality instead of PNG
    #[arg(long)]
    jpeg_quality: Option<u8>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crop a single photograph.
    Crop {
        /// Path to the input image.
        #[arg(long)]
        image: PathBuf,

        /// Directory for the cropped image (defaults to the image's directory).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Path to write the measurement record (JSON); printed when absent.
        #[arg(long)]
        record: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Crop every image below a directory.
    Batch {
        /// Root directory to scan recursively.
        #[arg(long)]
        input: PathBuf,

        /// Output root (defaults to `<input>-cropped` next to the input).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Maximum worker threads.
        #[arg(long)]
        threads: Option<usize>,

        /// Also write the summary table as JSON to this path.
        #[arg(long)]
        summary_json: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

fn main() -> CliResult<()> {
    ic_smartcrop::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crop {
            image,
            out,
            record,
            pipeline,
        } => {
            let config = pipeline_config(&pipeline, cli.verbose)?;
            run_crop(&image, out.as_deref(), record.as_deref(), config)
        }
        Commands::Batch {
            input,
            output,
            threads,
            summary_json,
            pipeline,
        } => {
            let config = pipeline_config(&pipeline, cli.verbose)?;
            run_batch(&input, output, threads, summary_json.as_deref(), config)
        }
    }
}

fn pipeline_config(args: &PipelineArgs, verbose: bool) -> CliResult<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(margin) = args.margin {
        config = config.with_margin_px(margin);
    }
    if args.scale.is_some() {
        config = config.with_scale_px_per_mm(args.scale);
    }
    if args.refine && config.profile_refinement.is_none() {
        config = config.with_profile_refinement(Some(ProfileRefinement::default()));
    }
    if let Some(quality) = args.jpeg_quality {
        config = config.with_output_format(OutputFormat::Jpeg { quality });
    }
    config.validate()?;

    if verbose {
        info!("Pipeline configuration:");
        info!("{}", serde_json::to_string_pretty(&config)?);
    }
    Ok(config)
}

fn run_crop(
    image_path: &Path,
    out_dir: Option<&Path>,
    record_path: Option<&Path>,
    config: PipelineConfig,
) -> CliResult<()> {
    info!("Loading image: {}", image_path.display());
    let bytes = std::fs::read(image_path)
        .map_err(|e| -> CliError { format!("Failed to read {}: {e}", image_path.display()).into() })?;

    let start = Instant::now();
    let output = match process(&bytes, &config) {
        Ok(output) => output,
        Err(e) => {
            error!("{} failed ({}): {e}", image_path.display(), e.kind());
            return Err(e.into());
        }
    };
    info!("Processed in {:.2?}", start.elapsed());

    let file_name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let out_dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => image_path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    std::fs::create_dir_all(&out_dir)?;
    let crop_path = out_dir.join(cropped_file_name(&file_name, config.output_format));
    std::fs::write(&crop_path, &output.cropped_bytes)?;
    info!("Crop written to {}", crop_path.display());

    let json = serde_json::to_string_pretty(&output.record)?;
    match record_path {
        Some(path) => {
            std::fs::write(path, &json)?;
            info!("Record written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_batch(
    input: &Path,
    output: Option<PathBuf>,
    threads: Option<usize>,
    summary_json: Option<&Path>,
    config: PipelineConfig,
) -> CliResult<()> {
    let output = output.unwrap_or_else(|| default_output_root(input));
    info!("Input: {}", input.display());
    info!("Output: {}", output.display());

    let batch_config = BatchConfig::new(config)
        .with_parallel(ParallelPolicy::new().with_max_threads(threads));
    let runner = BatchRunner::new(batch_config)?;

    let table = runner.run(input, &output)?;
    let summary_path = runner.save_summary(&table, &output)?;
    info!("Dimensions saved to {}", summary_path.display());

    if let Some(path) = summary_json {
        std::fs::write(path, table.to_json()?)?;
        info!("Summary JSON written to {}", path.display());
    }

    print!("{}", runner.stats());
    Ok(())
}

/// `<input>-cropped`, next to the input directory.
fn default_output_root(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{name}-cropped"))
}
