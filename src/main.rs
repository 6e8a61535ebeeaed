use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, info, instrument, warn};
use tracing_subscriber::EnvFilter;

use picview::ImageCache;
use picview::config::Configuration;
use picview::gpu::{GraphicsContext, WgpuContext};
use picview::processing::decode::ImageDecoder;
use picview::scan::scan_library;
use picview::slideshow::{Frame, Slideshow};

const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

#[derive(Debug, Parser)]
#[command(name = "picview", version, about = "Image slideshow with a cached thumbnail grid")]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Override the configured photo library
    #[arg(long, value_name = "DIR")]
    library: Option<PathBuf>,
    /// Viewport size used for fitting and grid layout
    #[arg(long, value_name = "WxH", default_value = "1920x1080", value_parser = parse_viewport)]
    viewport: (u32, u32),
    /// Generate this many thumbnail pages, log them, and exit
    #[arg(long = "dry-run-pages", value_name = "N")]
    dry_run_pages: Option<usize>,
    /// Auto-play this many slides, then exit
    #[arg(long = "dry-run-slides", value_name = "N")]
    dry_run_slides: Option<usize>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn parse_viewport(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    if w == 0 || h == 0 {
        return Err("viewport dimensions must be positive".into());
    }
    Ok((w, h))
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive(format!("picview={level}").parse()?)
        .add_directive("wgpu=warn".parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        library,
        viewport,
        dry_run_pages,
        dry_run_slides,
        verbose,
    } = Args::parse();
    init_tracing(verbose)?;

    let mut cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?;
    if let Some(dir) = library {
        cfg.photo_library_path = dir;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    debug!("loaded configuration from {}:\n{:#?}", config.display(), cfg);

    let images = scan_library(&cfg.photo_library_path, cfg.shuffle, cfg.shuffle_seed)
        .with_context(|| format!("failed to scan {}", cfg.photo_library_path.display()))?;

    let ctx = WgpuContext::headless()?;
    let cache = ImageCache::new(&cfg, ctx, Arc::new(ImageDecoder), images, viewport)?;
    let mut show = Slideshow::new(cache, &cfg, viewport, Instant::now());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let outcome = match dry_run_pages {
        Some(pages) => run_pages(&mut show, pages, &cancel).await,
        None => run_slides(&mut show, dry_run_slides, &cancel).await,
    };

    let stats = show.cache().stats();
    info!(
        full_images = stats.full_images,
        thumbnails_decoded = stats.thumbnails.decoded,
        "final cache residency"
    );
    show.shutdown();
    outcome
}

/// Page through the thumbnail grid, waiting on each page until its decodes
/// have settled.
#[instrument(skip(show, cancel))]
async fn run_pages<G: GraphicsContext>(
    show: &mut Slideshow<G>,
    pages: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    show.toggle_thumbnails(Instant::now());
    for page in 0..pages {
        let started = Instant::now();
        let total = show.thumbnails().len();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }
            show.pump();
            if show.cache().stats().thumbnails.pending == 0 {
                break;
            }
        }
        let ready = show.thumbnails().iter().filter(|s| s.is_ready()).count();
        info!(
            page,
            start = show.page_start(),
            ready,
            total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "thumbnail page settled"
        );
        if page + 1 < pages && !show.page_down() {
            info!("reached the last page");
            break;
        }
    }
    show.toggle_thumbnails(Instant::now());
    Ok(())
}

/// Drive auto-play at frame rate until `limit` slides have advanced or the
/// process is cancelled.
#[instrument(skip(show, cancel))]
async fn run_slides<G: GraphicsContext>(
    show: &mut Slideshow<G>,
    limit: Option<usize>,
    cancel: &CancellationToken,
) -> Result<()> {
    if show.is_empty() {
        bail!("nothing to show");
    }
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    let mut advanced = 0usize;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }
        let now = Instant::now();
        show.pump();
        if let Some(index) = show.tick(now) {
            advanced += 1;
            let path = show.cache().images()[index].display().to_string();
            info!(index, %path, progress = ?show.progress(), "showing slide");
            if limit.is_some_and(|limit| advanced >= limit) {
                return Ok(());
            }
        }
        if let Frame::Transition { progress, .. } = show.frame(now) {
            debug!(progress, "transition");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_parses_both_separators() {
        assert_eq!(parse_viewport("900x600"), Ok((900, 600)));
        assert_eq!(parse_viewport("1920X1080"), Ok((1920, 1080)));
        assert!(parse_viewport("900").is_err());
        assert!(parse_viewport("0x600").is_err());
    }

    #[test]
    fn cli_requires_config() {
        assert!(Args::try_parse_from(["picview"]).is_err());
        let args =
            Args::try_parse_from(["picview", "cfg.yaml", "--viewport", "800x480", "-vv"]).unwrap();
        assert_eq!(args.viewport, (800, 480));
        assert_eq!(args.verbose, 2);
    }
}
