//! Error types for the card-games-converter library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CgcError`] — **Fatal**: a pipeline stage cannot proceed (empty source
//!   directory, destination tree not creatable, a merge that cannot be
//!   written). Returned as `Err(CgcError)` from the top-level `convert*`
//!   functions, and the orchestrator never starts the next stage after one.
//!
//! * [`CardError`] — **Non-fatal**: one card failed its density or rotation
//!   step while its siblings were still running. Stored inside
//!   [`crate::output::CardResult`] so the batch finishes every card before
//!   reporting, instead of losing the whole run to the first bad file.

use crate::convert::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the card-games-converter library.
///
/// Per-card failures use [`CardError`] and are collected in
/// [`crate::output::BatchReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum CgcError {
    // ── Codec errors ─────────────────────────────────────────────────────
    /// The file could not be opened or decoded as an image.
    #[error("Cannot read image '{path}': {detail}")]
    ImageRead { path: PathBuf, detail: String },

    /// Rewriting the pixel density failed.
    #[error("Failed to set density of '{path}' to {ppi} ppi: {detail}")]
    DensityChange {
        path: PathBuf,
        ppi: u32,
        detail: String,
    },

    /// Rotating a landscape card failed.
    #[error("Failed to rotate '{path}': {detail}")]
    Rotation { path: PathBuf, detail: String },

    /// A codec call did not return within the configured timeout.
    #[error("Image codec timed out after {secs}s on '{path}'")]
    CodecTimeout { path: PathBuf, secs: u64 },

    // ── Layout errors ────────────────────────────────────────────────────
    /// A tile merge was requested with no inputs, an unknown axis, or the
    /// sheet could not be written.
    #[error("Merge failed: {detail}")]
    Merge { detail: String },

    /// No image to estimate the pixel density from.
    #[error("No images found in '{path}'\nPut the card images in this directory or pass --src.")]
    EmptyDirectory { path: PathBuf },

    /// Writing a PDF page failed.
    #[error("PDF export failed for '{path}': {detail}")]
    PdfExport { path: PathBuf, detail: String },

    // ── Batch errors ─────────────────────────────────────────────────────
    /// At least one card failed; every other card still ran to completion.
    #[error("{failed}/{total} cards failed to convert\nFirst error: {first_error}")]
    BatchFailed {
        failed: usize,
        total: usize,
        first_error: String,
    },

    /// A pipeline stage failed; later stages were not attempted.
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<CgcError>,
    },

    // ── I/O errors ───────────────────────────────────────────────────────
    /// Listing, hashing or stat-ing during cache selection failed.
    #[error("Failed to scan '{path}' for cache selection: {source}")]
    CacheScan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory of the destination tree could not be created.
    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Listing a stage directory failed.
    #[error("Failed to list directory '{path}': {source}")]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CgcError {
    /// Tag this error with the stage it came from.
    pub fn in_stage(self, stage: Stage) -> Self {
        CgcError::StageFailed {
            stage,
            source: Box::new(self),
        }
    }

    /// The stage a [`CgcError::StageFailed`] came from, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CgcError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// A non-fatal error for a single card.
///
/// Stored alongside [`crate::output::CardResult`] when a card fails.
/// The batch continues; the orchestrator reports failure after the join.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum CardError {
    /// The source (or the freshly written card) could not be decoded.
    #[error("{file}: cannot read image: {detail}")]
    ImageRead { file: PathBuf, detail: String },

    /// The density rewrite failed.
    #[error("{file}: setting density to {ppi} ppi failed: {detail}")]
    DensityChange {
        file: PathBuf,
        ppi: u32,
        detail: String,
    },

    /// The orientation fix failed.
    #[error("{file}: rotation failed: {detail}")]
    Rotation { file: PathBuf, detail: String },

    /// A codec call exceeded the configured timeout.
    #[error("{file}: codec timed out after {secs}s")]
    Timeout { file: PathBuf, secs: u64 },

    /// The worker task died.
    #[error("{file}: worker failed: {detail}")]
    Internal { file: PathBuf, detail: String },
}

impl CardError {
    pub fn file(&self) -> &std::path::Path {
        match self {
            CardError::ImageRead { file, .. }
            | CardError::DensityChange { file, .. }
            | CardError::Rotation { file, .. }
            | CardError::Timeout { file, .. }
            | CardError::Internal { file, .. } => file,
        }
    }
}

/// Single-file mode surfaces the card's failure as the matching fatal kind.
impl From<CardError> for CgcError {
    fn from(e: CardError) -> Self {
        match e {
            CardError::ImageRead { file, detail } => CgcError::ImageRead { path: file, detail },
            CardError::DensityChange { file, ppi, detail } => CgcError::DensityChange {
                path: file,
                ppi,
                detail,
            },
            CardError::Rotation { file, detail } => CgcError::Rotation { path: file, detail },
            CardError::Timeout { file, secs } => CgcError::CodecTimeout { path: file, secs },
            CardError::Internal { detail, .. } => CgcError::Internal(detail),
        }
    }
}
