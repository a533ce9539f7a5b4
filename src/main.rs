use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use luma_wipe::config::Configuration;
use luma_wipe::events::{ImageSource, LoadImage, LoadOutcome};
use luma_wipe::render::{headless, viewer};
use luma_wipe::tasks::{loader, unsplash::UnsplashClient, watch};

const DEFAULT_CONFIG: &str = "config.yaml";

#[derive(Debug, Parser)]
#[command(
    name = "luma-wipe",
    version,
    about = "Animated luminance-threshold wipe between a photo and its grayscale rendering"
)]
struct Args {
    /// Path to YAML config (defaults to ./config.yaml when present)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Start from this image instead of the configured one
    #[arg(long, value_name = "FILE")]
    image: Option<PathBuf>,
    /// Render this many frames to PNG files without opening a window
    #[arg(long = "render-frames", value_name = "N")]
    render_frames: Option<u32>,
    /// Output directory for --render-frames
    #[arg(long = "render-dir", value_name = "DIR", default_value = "frames")]
    render_dir: PathBuf,
    /// Frame rate used to advance the sweep in headless mode
    #[arg(long, value_name = "FPS", default_value_t = 30.0)]
    fps: f32,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    // RUST_LOG wins; otherwise -v raises this crate's level
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("info,luma_wipe={level},wgpu=warn,winit=warn"))
        }))
        .with_target(false)
        .compact()
        .init();
}

fn load_configuration(path: Option<&Path>) -> Result<Configuration> {
    let cfg = match path {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => Configuration::from_yaml_file(DEFAULT_CONFIG)
            .with_context(|| format!("failed to load configuration from {DEFAULT_CONFIG}"))?,
        None => {
            tracing::info!("no configuration file; using defaults");
            Configuration::default()
        }
    };
    cfg.validated().context("invalid configuration values")
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        image,
        render_frames,
        render_dir,
        fps,
        verbose,
    } = Args::parse();
    init_tracing(verbose);

    let cfg = load_configuration(config.as_deref())?;
    tracing::info!("Loaded configuration:\n{:#?}", cfg);

    let initial = match image {
        Some(path) => ImageSource::File(path),
        None => cfg.image.source(),
    };
    let unsplash = UnsplashClient::new(&cfg.unsplash).context("failed to build HTTP client")?;
    if !unsplash.has_credentials() {
        tracing::info!(
            env = %cfg.unsplash.access_key_env,
            "no Unsplash access key; remote photos are unavailable"
        );
    }

    if let Some(frames) = render_frames {
        return run_headless(&cfg, &initial, &unsplash, frames, fps, render_dir).await;
    }

    // Channels (small/bounded)
    let (load_tx, load_rx) = mpsc::channel::<LoadImage>(8); // Viewer -> Loader
    let (outcome_tx, outcome_rx) = mpsc::channel::<LoadOutcome>(8); // Loader -> Viewer

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();
    tasks.spawn({
        let cancel = cancel.clone();
        let options = cfg.loader.clone();
        async move {
            loader::run(load_rx, outcome_tx, cancel, options, unsplash)
                .await
                .context("loader task failed")
        }
    });

    // keep the watcher alive for as long as the window is open
    let mut _watcher = None;
    let changes = if cfg.image.watch {
        let (tx, rx) = crossbeam_channel::unbounded();
        match watch::start_watcher(&cfg.image.watched_paths(), tx) {
            Ok(watcher) => {
                tracing::info!("watching bundled image files for changes");
                _watcher = Some(watcher);
                Some(rx)
            }
            Err(err) => {
                tracing::warn!("failed to watch image files: {err}");
                None
            }
        }
    } else {
        None
    };

    let channels = viewer::ViewerChannels {
        load_tx,
        outcomes: outcome_rx,
        changes,
    };
    // Run the windowed viewer on the main thread (blocking) after spawning other tasks
    if let Err(e) =
        viewer::run_windowed(cfg, initial, channels, cancel.clone()).context("viewer failed")
    {
        tracing::error!("{e:?}");
    }
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}

async fn run_headless(
    cfg: &Configuration,
    source: &ImageSource,
    unsplash: &UnsplashClient,
    frames: u32,
    fps: f32,
    out_dir: PathBuf,
) -> Result<()> {
    let (image, attribution) = match loader::acquire(source, unsplash, cfg.loader.max_dimension)
        .await
    {
        Ok(acquired) => acquired,
        Err(err) => {
            if let Some(hint) = source.missing_hint(&err) {
                tracing::warn!("{hint}");
            }
            return Err(anyhow::Error::new(err).context(format!("failed to load {source}")));
        }
    };
    if let Some(credit) = attribution {
        tracing::info!(photographer = %credit.text, url = %credit.url, "photo credit");
    }
    let params = cfg.wipe.clone();
    let written = tokio::task::spawn_blocking(move || {
        headless::render_sequence(&image, &params, frames, fps, &out_dir)
    })
    .await
    .context("headless render task failed")??;
    println!("wrote {} frames", written.len());
    Ok(())
}
