//! Result types returned by the pipeline.
//!
//! Everything here is `Serialize` so the CLI's `--json` flag (or any host
//! application) can dump a run report verbatim.

use crate::error::{CardError, CgcError};
use crate::pipeline::merge::Axis;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one card's density + orientation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardResult {
    /// Source image.
    pub source: PathBuf,
    /// File written under `individual/` (may be partially processed on error).
    pub dest: PathBuf,
    /// Whether the card was landscape and got a quarter turn.
    pub rotated: bool,
    pub duration_ms: u64,
    /// `None` on success.
    pub error: Option<CardError>,
}

impl CardResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Every card of one dispatch, in source order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub cards: Vec<CardResult>,
    /// Source files the cache selector left out.
    pub skipped: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.cards.iter().filter(|c| c.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.cards.len() - self.succeeded()
    }

    pub fn first_error(&self) -> Option<&CardError> {
        self.cards.iter().find_map(|c| c.error.as_ref())
    }

    /// `Err(CgcError::BatchFailed)` if any card failed.
    pub fn ensure_success(&self) -> Result<(), CgcError> {
        match self.first_error() {
            None => Ok(()),
            Some(first) => Err(CgcError::BatchFailed {
                failed: self.failed(),
                total: self.cards.len(),
                first_error: first.to_string(),
            }),
        }
    }
}

/// One merged sheet on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileResult {
    pub axis: Axis,
    pub path: PathBuf,
    /// The images pasted into this tile, in paste order.
    pub inputs: Vec<PathBuf>,
    /// Cumulative image count when the group closed; also the file stem.
    pub sequence: usize,
}

/// Timing and counters for a full run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub cards_total: usize,
    pub cards_converted: usize,
    pub cards_skipped: usize,
    pub vertical_tiles: usize,
    pub horizontal_tiles: usize,
    pub pdfs: usize,
    pub total_duration_ms: u64,
    pub dispatch_duration_ms: u64,
    pub merge_duration_ms: u64,
}

/// Everything a successful [`crate::convert::convert_all`] produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Density every card was normalised to.
    pub ppi: u32,
    pub batch: BatchReport,
    /// Sheets written to `vertical/`, ordered by sequence number.
    pub vertical: Vec<TileResult>,
    /// Sheets written to `horizontal/`, ordered by sequence number.
    pub horizontal: Vec<TileResult>,
    /// PDFs written to `pdfs/`, in page order.
    pub pdfs: Vec<PathBuf>,
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, error: Option<CardError>) -> CardResult {
        CardResult {
            source: PathBuf::from(name),
            dest: PathBuf::from("individual").join(name),
            rotated: false,
            duration_ms: 1,
            error,
        }
    }

    #[test]
    fn batch_counts() {
        let report = BatchReport {
            cards: vec![
                card("1.jpg", None),
                card(
                    "2.jpg",
                    Some(CardError::Timeout {
                        file: PathBuf::from("2.jpg"),
                        secs: 3,
                    }),
                ),
                card("3.jpg", None),
            ],
            skipped: 4,
        };
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.first_error().map(|e| e.file().to_path_buf()),
            Some(PathBuf::from("2.jpg"))
        );

        match report.ensure_success() {
            Err(CgcError::BatchFailed { failed, total, .. }) => {
                assert_eq!((failed, total), (1, 3))
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(BatchReport::default().ensure_success().is_ok());
    }

    #[test]
    fn report_serialises_axis_lowercase() {
        let tile = TileResult {
            axis: Axis::Horizontal,
            path: PathBuf::from("horizontal/2.jpg"),
            inputs: vec![PathBuf::from("vertical/4.jpg"), PathBuf::from("vertical/8.jpg")],
            sequence: 2,
        };
        let json = serde_json::to_string(&tile).unwrap();
        assert!(json.contains("\"horizontal\""), "got: {json}");
        assert!(json.contains("\"sequence\":2"), "got: {json}");
    }
}
