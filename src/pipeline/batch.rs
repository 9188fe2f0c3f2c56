//! Fan-out of the individual stage over a bounded worker pool.
//!
//! Every selected card runs through [`convert_one`] with at most
//! `config.workers` in flight (`buffer_unordered`). A failed card does not
//! cancel its siblings: the stream is always driven to completion, and only
//! then does the caller decide whether the batch as a whole failed
//! ([`BatchReport::ensure_success`]).

use crate::config::PipelineConfig;
use crate::output::{BatchReport, CardResult};
use crate::pipeline::card::convert_one;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Convert every file in `sources` into `dest_dir` at `ppi`.
///
/// Directory entries are skipped, not reported as failures. The returned
/// report lists cards in the order of `sources`, whatever order they
/// finished in.
pub async fn run_batch(
    sources: &[PathBuf],
    dest_dir: &Path,
    ppi: u32,
    config: &PipelineConfig,
) -> BatchReport {
    let files: Vec<&PathBuf> = sources
        .iter()
        .filter(|p| {
            let keep = !p.is_dir();
            if !keep {
                debug!("Skipping directory {}", p.display());
            }
            keep
        })
        .collect();

    let mut indexed: Vec<(usize, CardResult)> = stream::iter(files.into_iter().enumerate())
        .map(|(idx, src)| async move {
            let result = convert_one(src, dest_dir, ppi, config).await;
            if let Some(ref cb) = config.progress_callback {
                match &result.error {
                    None => cb.on_card_complete(&result.dest),
                    Some(e) => cb.on_card_error(src, &e.to_string()),
                }
            }
            if let Some(ref e) = result.error {
                warn!("{}", e);
            }
            (idx, result)
        })
        .buffer_unordered(config.workers.max(1))
        .collect()
        .await;

    indexed.sort_by_key(|(idx, _)| *idx);
    BatchReport {
        cards: indexed.into_iter().map(|(_, r)| r).collect(),
        skipped: 0,
    }
}
