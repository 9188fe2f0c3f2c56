//! CLI binary for card-games-converter.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig` and reports failures. A successful run prints nothing
//! unless `--json` or `--progress` is given.

use anyhow::{Context, Result};
use card_games_converter::{
    convert_all, convert_single, Axis, CacheMode, PipelineConfig, PipelineProgressCallback,
    ProgressCallback, Stage,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar, re-armed at every stage start.
/// Cards complete out of order, so only counts are tracked.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos:>4}/{len}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn short_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage, units: usize) {
        self.bar.reset();
        self.bar.set_length(units as u64);
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message("");
    }

    fn on_card_complete(&self, path: &Path) {
        self.bar.set_message(Self::short_name(path));
        self.bar.inc(1);
    }

    fn on_card_error(&self, path: &Path, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            Self::short_name(path),
            red(error)
        ));
        self.bar.inc(1);
    }

    fn on_tile_written(&self, axis: Axis, path: &Path) {
        self.bar
            .set_message(format!("{axis}/{}", Self::short_name(path)));
        self.bar.inc(1);
    }

    fn on_stage_complete(&self, stage: Stage) {
        if stage == Stage::Estimate {
            self.bar.inc(1);
        }
        self.bar.println(format!("  {} {}", green("✓"), dim(&stage.to_string())));
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed > 0 {
            eprintln!("{} {} card(s) failed", red("✘"), failed);
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Default directories (<temp>/cards → <temp>/cgc)
  cgc

  # Explicit directories, skip cards already in individual/
  cgc --src ~/scans --dest ~/print --cache name

  # Tarot-sized cards (2.75 × 4.75 in)
  cgc --width-inches 2.75 --height-inches 4.75

  # Normalise a single card only
  cgc --single ~/scans/ace.jpg

  # Machine-readable report
  cgc --json > report.json

OUTPUT TREE:
  <dest>/individual/   density-normalised, portrait cards
  <dest>/vertical/     4-up strips, named by cumulative card count
  <dest>/horizontal/   2-up sheets of strips
  <dest>/pdfs/         one PDF per sheet, 0.pdf, 1.pdf, …

CACHE MODES:
  none     process every source card (default)
  name     skip cards whose name already appears in individual/
  sha512   like name, but also reprocess cards byte-identical to their copy

ENVIRONMENT VARIABLES:
  RUST_LOG     Override the log filter (e.g. card_games_converter=debug)
  CGC_*        Every flag has one, see --help
"#;

/// Batch-convert card images into printable sheets.
#[derive(Parser, Debug)]
#[command(
    name = "cgc",
    version,
    about = "Batch-convert card images into printable 4-up and 8-up sheets",
    long_about = "Normalise a directory of card images to one pixel density for a given \
physical card size, rotate them to portrait, tile them 4-up into vertical strips and 2-up \
into horizontal sheets, and export each sheet as a PDF page.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory of source card images.
    #[arg(long, env = "CGC_SRC")]
    src: Option<PathBuf>,

    /// Destination root (individual/, vertical/, horizontal/, pdfs/).
    #[arg(long, env = "CGC_DEST")]
    dest: Option<PathBuf>,

    /// Physical card height in inches.
    #[arg(long, visible_alias = "ppi-height", env = "CGC_HEIGHT_INCHES", default_value_t = 2.5)]
    height_inches: f64,

    /// Physical card width in inches.
    #[arg(long, visible_alias = "ppi-width", env = "CGC_WIDTH_INCHES", default_value_t = 3.5)]
    width_inches: f64,

    /// Normalise only this one image (no tiling, no PDF).
    #[arg(long, env = "CGC_SINGLE", value_name = "FILE")]
    single: Option<PathBuf>,

    /// Cache mode: none, name or sha512.
    #[arg(long, env = "CGC_CACHE", value_enum, default_value = "none")]
    cache: CacheArg,

    /// Concurrent codec workers. Default: available parallelism.
    #[arg(short, long, env = "CGC_WORKERS")]
    workers: Option<usize>,

    /// Skip the PDF export stage.
    #[arg(long, env = "CGC_NO_PDF")]
    no_pdf: bool,

    /// Per codec call timeout in seconds.
    #[arg(long, env = "CGC_CODEC_TIMEOUT", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    codec_timeout: u64,

    /// JPEG quality (1–100).
    #[arg(long, env = "CGC_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Show a progress bar on stderr.
    #[arg(long, env = "CGC_PROGRESS")]
    progress: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "CGC_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CGC_VERBOSE")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, env = "CGC_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CacheArg {
    None,
    Name,
    Sha512,
}

impl From<CacheArg> for CacheMode {
    fn from(v: CacheArg) -> Self {
        match v {
            CacheArg::None => CacheMode::None,
            CacheArg::Name => CacheMode::Name,
            CacheArg::Sha512 => CacheMode::Digest,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if cli.progress && !cli.quiet {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    if let Some(ref single) = cli.single {
        let result = convert_single(single, &config)
            .await
            .with_context(|| format!("Failed to convert {}", single.display()))?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("Failed to serialise result")?
            );
        }
        return Ok(());
    }

    let report = convert_all(&config).await.context("Conversion failed")?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .width_inches(cli.width_inches)
        .height_inches(cli.height_inches)
        .cache_mode(cli.cache.into())
        .export_pdf(!cli.no_pdf)
        .codec_timeout_secs(cli.codec_timeout)
        .jpeg_quality(cli.quality);

    if let Some(ref src) = cli.src {
        builder = builder.src_dir(src);
    }
    if let Some(ref dest) = cli.dest {
        builder = builder.dest_dir(dest);
    }
    if let Some(workers) = cli.workers {
        builder = builder.workers(workers);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn aliases_and_cache_map_through() {
        let cli = Cli::try_parse_from([
            "cgc",
            "--ppi-width",
            "2.75",
            "--ppi-height",
            "4.75",
            "--cache",
            "sha512",
            "--no-pdf",
        ])
        .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.physical_size.width_in, 2.75);
        assert_eq!(config.physical_size.height_in, 4.75);
        assert_eq!(config.cache_mode, CacheMode::Digest);
        assert!(!config.export_pdf);
    }

    #[test]
    fn quality_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["cgc", "--quality", "0"]).is_err());
    }
}
