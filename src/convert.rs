//! Pipeline orchestration.
//!
//! ```text
//! Estimate → Dispatch → PartitionVertical → PartitionHorizontal → [ExportPdf]
//! ```
//!
//! Linear, no retries. Each stage must fully succeed before the next starts;
//! the first failure is returned as [`CgcError::StageFailed`] naming the
//! stage, and nothing after it runs.
//!
//! ## Re-runs
//!
//! The destination tree is both output and (in cache modes) the next run's
//! freshness reference. Merge passes always re-read all of `individual/` and
//! `vertical/`, and number new sheets after what is already there, so a
//! second run appends sheets rather than overwriting them.

use crate::config::PipelineConfig;
use crate::error::CgcError;
use crate::layout::DestLayout;
use crate::output::{BatchReport, CardResult, PipelineReport, RunStats, TileResult};
use crate::pipeline::grid::{HORIZONTAL_GROUP, VERTICAL_GROUP};
use crate::pipeline::merge::Axis;
use crate::pipeline::{batch, cache, card, grid, listing, pdf, ppi};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

/// A step of the orchestrated pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Derive the run's PPI from the first source card.
    Estimate,
    /// Cache selection plus the per-card fan-out into `individual/`.
    Dispatch,
    /// 4-up strips into `vertical/`.
    PartitionVertical,
    /// 2-up sheets into `horizontal/`.
    PartitionHorizontal,
    /// One PDF per sheet into `pdfs/`.
    ExportPdf,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Estimate => "estimate",
            Stage::Dispatch => "dispatch",
            Stage::PartitionVertical => "partition vertical",
            Stage::PartitionHorizontal => "partition horizontal",
            Stage::ExportPdf => "export pdf",
        })
    }
}

/// Run the full pipeline over `config.src_dir` into `config.dest_dir`.
///
/// # Returns
/// A [`PipelineReport`] describing every card, sheet and PDF written.
///
/// # Errors
/// - [`CgcError::DirectoryCreate`] if the destination tree cannot be made.
/// - [`CgcError::StageFailed`] wrapping the first failing stage's error.
///   A dispatch that had any failed card fails with
///   [`CgcError::BatchFailed`] inside, after every card has finished.
pub async fn convert_all(config: &PipelineConfig) -> Result<PipelineReport, CgcError> {
    let total_start = Instant::now();
    info!(
        "Converting {} → {} (cache: {})",
        config.src_dir.display(),
        config.dest_dir.display(),
        config.cache_mode
    );

    let layout = DestLayout::new(&config.dest_dir);
    layout.ensure_layout().inspect_err(|e| error!("{}", e))?;

    // ── Estimate ─────────────────────────────────────────────────────────
    let ppi = run_stage(config, Stage::Estimate, 1, async {
        ppi::estimate_ppi(&config.src_dir, config).await
    })
    .await?;
    info!("Target density: {} ppi", ppi);

    // ── Dispatch ─────────────────────────────────────────────────────────
    let dispatch_start = Instant::now();
    let sources = select(config, &layout)
        .await
        .map_err(|e| fail(e, Stage::Dispatch))?;
    let all_sources = listing::sorted_files(&config.src_dir)
        .map(|v| v.len())
        .unwrap_or(sources.len());
    let skipped = all_sources.saturating_sub(sources.len());

    let batch = run_stage(config, Stage::Dispatch, sources.len(), async {
        let mut report = batch::run_batch(&sources, layout.individual(), ppi, config).await;
        report.skipped = skipped;
        report.ensure_success()?;
        Ok(report)
    })
    .await?;
    let dispatch_duration_ms = dispatch_start.elapsed().as_millis() as u64;
    info!(
        "Converted {} card(s), {} skipped by cache",
        batch.cards.len(),
        skipped
    );

    // ── Partition ────────────────────────────────────────────────────────
    let merge_start = Instant::now();
    let vertical = merge_pass(
        config,
        &layout,
        Stage::PartitionVertical,
        layout.individual(),
        VERTICAL_GROUP,
        Axis::Vertical,
        ppi,
    )
    .await?;
    let horizontal = merge_pass(
        config,
        &layout,
        Stage::PartitionHorizontal,
        layout.vertical(),
        HORIZONTAL_GROUP,
        Axis::Horizontal,
        ppi,
    )
    .await?;
    let merge_duration_ms = merge_start.elapsed().as_millis() as u64;

    // ── PDF ──────────────────────────────────────────────────────────────
    let pdfs = if config.export_pdf {
        let units = listing::sorted_files(layout.horizontal())
            .map(|v| v.len())
            .unwrap_or(0);
        run_stage(config, Stage::ExportPdf, units, async {
            pdf::export_pdfs(layout.horizontal(), layout.pdfs(), ppi, config).await
        })
        .await?
    } else {
        Vec::new()
    };

    let stats = RunStats {
        cards_total: batch.cards.len() + skipped,
        cards_converted: batch.succeeded(),
        cards_skipped: skipped,
        vertical_tiles: vertical.len(),
        horizontal_tiles: horizontal.len(),
        pdfs: pdfs.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        dispatch_duration_ms,
        merge_duration_ms,
    };
    info!(
        "Done: {} card(s), {} strip(s), {} sheet(s), {} PDF(s) in {}ms",
        stats.cards_converted,
        stats.vertical_tiles,
        stats.horizontal_tiles,
        stats.pdfs,
        stats.total_duration_ms
    );

    Ok(PipelineReport {
        ppi,
        batch,
        vertical,
        horizontal,
        pdfs,
        stats,
    })
}

/// Synchronous wrapper around [`convert_all`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(config: &PipelineConfig) -> Result<PipelineReport, CgcError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CgcError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_all(config))
}

/// Normalise one image into `<dest>/individual/`, estimating the PPI from
/// the image itself. No tiling, no PDF.
///
/// # Errors
/// [`CgcError::StageFailed`] around the estimate error, or around the card's
/// own failure mapped to its fatal kind.
pub async fn convert_single(
    path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<CardResult, CgcError> {
    let path = path.as_ref();
    info!("Converting single card {}", path.display());

    let layout = DestLayout::new(&config.dest_dir);
    layout.ensure_layout().inspect_err(|e| error!("{}", e))?;

    let ppi = run_stage(config, Stage::Estimate, 1, async {
        ppi::estimate_ppi_from(path, config).await
    })
    .await?;

    run_stage(config, Stage::Dispatch, 1, async {
        let result = card::convert_one(path, layout.individual(), ppi, config).await;
        if let Some(ref cb) = config.progress_callback {
            match &result.error {
                None => cb.on_card_complete(&result.dest),
                Some(e) => cb.on_card_error(path, &e.to_string()),
            }
        }
        match result.error {
            Some(e) => Err(CgcError::from(e)),
            None => Ok(result),
        }
    })
    .await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run one stage with progress events; tag its error with the stage.
async fn run_stage<T>(
    config: &PipelineConfig,
    stage: Stage,
    units: usize,
    work: impl std::future::Future<Output = Result<T, CgcError>>,
) -> Result<T, CgcError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage, units);
    }
    let out = work.await.map_err(|e| fail(e, stage))?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage);
    }
    Ok(out)
}

fn fail(e: CgcError, stage: Stage) -> CgcError {
    error!("Stage '{}' failed: {}", stage, e);
    e.in_stage(stage)
}

/// Cache selection reads and hashes files, so it runs on the blocking pool.
async fn select(config: &PipelineConfig, layout: &DestLayout) -> Result<Vec<PathBuf>, CgcError> {
    let src = config.src_dir.clone();
    let dest = layout.individual().to_path_buf();
    let mode = config.cache_mode;
    tokio::task::spawn_blocking(move || cache::select_sources(&src, &dest, mode))
        .await
        .map_err(|e| CgcError::Internal(format!("Cache scan task panicked: {}", e)))?
}

async fn merge_pass(
    config: &PipelineConfig,
    layout: &DestLayout,
    stage: Stage,
    input_dir: &Path,
    group_size: usize,
    axis: Axis,
    ppi: u32,
) -> Result<Vec<TileResult>, CgcError> {
    let list = listing::sorted_files(input_dir).map_err(|e| fail(e, stage))?;
    let units = list.len().div_ceil(group_size);
    run_stage(config, stage, units, async {
        let offset = listing::next_sequence_start(layout.axis_dir(axis))?;
        grid::partition(&list, group_size, axis, layout.root(), offset, ppi, config).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_lowercase() {
        assert_eq!(Stage::Estimate.to_string(), "estimate");
        assert_eq!(Stage::PartitionHorizontal.to_string(), "partition horizontal");
        assert_eq!(
            serde_json::to_string(&Stage::ExportPdf).unwrap(),
            "\"export_pdf\""
        );
    }

    #[tokio::test]
    async fn missing_source_fails_in_estimate() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = PipelineConfig::builder()
            .src_dir(tmp.path().join("missing"))
            .dest_dir(tmp.path().join("out"))
            .build()
            .unwrap();

        let err = convert_all(&config).await.unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Estimate));
        // The layout is created before any stage runs.
        assert!(tmp.path().join("out/individual").is_dir());
    }

    #[test]
    fn single_missing_file_fails_in_estimate() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = PipelineConfig::builder()
            .dest_dir(tmp.path().join("out"))
            .build()
            .unwrap();

        let err = tokio_test::block_on(convert_single(tmp.path().join("nope.jpg"), &config))
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Estimate));
        assert!(err.to_string().contains("nope.jpg"));
    }
}
