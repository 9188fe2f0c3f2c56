//! # card-games-converter
//!
//! Turn a directory of card scans into printable sheets: every card is
//! normalised to one pixel density and a portrait orientation, then tiled
//! 4-up into vertical strips, the strips 2-up into horizontal sheets, and
//! each sheet optionally exported as a PDF page sized for print.
//!
//! ## Why a density pass?
//!
//! Scans arrive at whatever resolution the scanner picked. Printing software
//! sizes an image from its stored pixels-per-inch, so a card is only printed
//! at its true physical size if that value matches its pixel dimensions. The
//! pipeline derives one PPI for the whole run from the first card and the
//! configured physical card size, and writes it into every output.
//!
//! ## Pipeline Overview
//!
//! ```text
//! cards/
//!  │
//!  ├─ 1. Estimate   ppi = ceil((w / 3.5in + h / 2.5in) / 2)
//!  ├─ 2. Dispatch   cache filter, then density + rotate per card (bounded pool)
//!  ├─ 3. Vertical   individual/ in groups of 4 → vertical/<n>.jpg
//!  ├─ 4. Horizontal vertical/ in groups of 2   → horizontal/<n>.jpg
//!  └─ 5. PDF        horizontal/<i>.jpg         → pdfs/<i>.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use card_games_converter::{convert_all, CacheMode, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .src_dir("scans")
//!         .dest_dir("print")
//!         .cache_mode(CacheMode::Name)
//!         .build()?;
//!     let report = convert_all(&config).await?;
//!     eprintln!(
//!         "{} ppi, {} sheets, {} PDFs",
//!         report.ppi,
//!         report.horizontal.len(),
//!         report.pdfs.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cgc` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! card-games-converter = { version = "1.5", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CacheMode, PhysicalSize, PipelineConfig, PipelineConfigBuilder};
pub use convert::{convert_all, convert_single, convert_sync, Stage};
pub use error::{CardError, CgcError};
pub use layout::DestLayout;
pub use output::{BatchReport, CardResult, PipelineReport, RunStats, TileResult};
pub use pipeline::merge::Axis;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};

pub use cgc_codec::{CodecError, ImageCodec, NativeCodec, QuarterTurn};
