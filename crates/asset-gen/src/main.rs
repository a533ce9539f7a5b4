use std::path::PathBuf;

use anyhow::{Result, ensure};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use luma_wipe::processing::assets::{
    DEFAULT_HEIGHT, DEFAULT_QUALITY, DEFAULT_WIDTH, write_assets,
};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "generate-assets",
    about = "Write image-color.jpg and image-bw.jpg for the wipe viewer"
)]
struct Args {
    /// Directory the pair is written into.
    #[arg(long, default_value = "assets")]
    out_dir: PathBuf,

    /// Image width in pixels.
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: u32,

    /// Image height in pixels.
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_QUALITY)]
    quality: u8,

    /// Logging level (error|warn|info|debug|trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .compact()
        .init();

    ensure!(args.width > 0 && args.height > 0, "width and height must be positive");
    ensure!(
        (1..=100).contains(&args.quality),
        "quality must be between 1 and 100"
    );

    let paths = write_assets(&args.out_dir, args.width, args.height, args.quality)?;
    info!(
        color = %paths.color.display(),
        gray = %paths.gray.display(),
        "assets ready"
    );
    Ok(())
}
