//! The `imgrz resize` command.

use clap::Args;
use imgrz_core::pipeline::parse_byte_size;
use imgrz_core::{BatchSummary, Config, ReportSink, Task, TracingSink};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the `resize` command.
#[derive(Args, Debug, Default)]
pub struct ResizeArgs {
    /// Comma-separated local image paths
    #[arg(long, value_name = "PATHS")]
    pub images: Option<String>,

    /// Comma-separated image URLs
    #[arg(long, value_name = "URLS")]
    pub urls: Option<String>,

    /// Directory to scan for images
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Scan --dir recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Output directory (defaults to resize.output_dir from the config)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Target width in pixels (0 keeps the aspect ratio)
    #[arg(short = 'W', long)]
    pub width: Option<u32>,

    /// Target height in pixels (0 keeps the aspect ratio)
    #[arg(short = 'H', long)]
    pub height: Option<u32>,

    /// Interpolation mode: 0 nearest, 1 bilinear, 2 bicubic, 3 gaussian, 4 lanczos3
    #[arg(long, value_name = "MODE")]
    pub interp: Option<u32>,

    /// JPEG quality (1-100)
    #[arg(long)]
    pub quality: Option<u8>,

    /// Skip images whose file name matches this regex (repeatable)
    #[arg(long = "exclude-name", value_name = "REGEX")]
    pub exclude_names: Vec<String>,

    /// Only keep images whose file name matches one of these regexes (repeatable)
    #[arg(long = "include-name", value_name = "REGEX")]
    pub include_names: Vec<String>,

    /// Skip images smaller than this (e.g. 512, 10k, 2.5m)
    #[arg(long, value_name = "SIZE", value_parser = parse_byte_size)]
    pub min_size: Option<u64>,

    /// Skip images larger than this (e.g. 512, 10k, 2.5m)
    #[arg(long, value_name = "SIZE", value_parser = parse_byte_size)]
    pub max_size: Option<u64>,

    /// Exit with an error when any image fails
    #[arg(long)]
    pub fail_on_error: bool,
}

/// Execute the resize command.
pub async fn execute(args: ResizeArgs, config: Config, verbose: bool) -> anyhow::Result<()> {
    let summary = resize_batch(&args, config, verbose, Arc::new(TracingSink)).await?;
    if args.fail_on_error && summary.failed > 0 {
        anyhow::bail!("{} of {} image(s) failed", summary.failed, summary.total());
    }
    Ok(())
}

/// Assemble the batch from the command line and run it, reporting to `sink`.
async fn resize_batch(
    args: &ResizeArgs,
    mut config: Config,
    verbose: bool,
    sink: Arc<dyn ReportSink>,
) -> anyhow::Result<BatchSummary> {
    apply_overrides(args, &mut config);
    config.check()?;

    let mut task = Task::new(&config, sink)?;
    task.set_verbose(verbose);

    if let Some(list) = &args.images {
        task.add_images(list).await;
    }
    if let Some(list) = &args.urls {
        task.add_urls(list).await;
    }
    if let Some(dir) = &args.dir {
        task.add_scan_dir(dir).await?;
    }

    if task.is_empty() {
        // Still run: the handshake flushes rejections reported during admission
        tracing::warn!("Nothing to resize: no image was admitted");
    } else {
        tracing::info!(
            "Resizing {} image(s) into {:?}",
            task.len(),
            task.params().output_dir
        );
    }

    let summary = task.run().await;
    tracing::info!(
        "Done: {} resized, {} failed in {:.1}s",
        summary.succeeded,
        summary.failed,
        summary.elapsed.as_secs_f64()
    );
    Ok(summary)
}

/// Layer command line flags over the loaded config.
fn apply_overrides(args: &ResizeArgs, config: &mut Config) {
    if let Some(output) = &args.output {
        config.resize.output_dir = output.clone();
    }
    if let Some(width) = args.width {
        config.resize.width = width;
    }
    if let Some(height) = args.height {
        config.resize.height = height;
    }
    if let Some(mode) = args.interp {
        config.resize.interpolation = mode;
    }
    if let Some(quality) = args.quality {
        config.resize.quality = quality;
    }
    if args.recursive {
        config.processing.recursive = true;
    }

    // Flag patterns extend the configured ones
    config
        .filter
        .exclude_names
        .extend(args.exclude_names.iter().cloned());
    config
        .filter
        .include_names
        .extend(args.include_names.iter().cloned());
    if args.min_size.is_some() {
        config.filter.min_size = args.min_size;
    }
    if args.max_size.is_some() {
        config.filter.max_size = args.max_size;
    }
}
