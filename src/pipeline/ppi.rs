//! Target density from one representative card.
//!
//! `ppi = ceil((width / physical_width + height / physical_height) / 2)`
//!
//! Averaging the two axis densities keeps a slightly off-ratio scan from
//! favouring one edge; rounding up means a card never prints larger than
//! the configured physical size.

use crate::config::{PhysicalSize, PipelineConfig};
use crate::error::CgcError;
use crate::pipeline::blocking::{run_codec, BlockingFailure};
use crate::pipeline::listing::sorted_files;
use cgc_codec::CodecError;
use std::path::Path;
use tracing::debug;

/// Pixel density that makes a `width` × `height` image print at `size`.
///
/// Never returns less than 1.
pub fn calc_ppi(width: u32, height: u32, size: PhysicalSize) -> u32 {
    let per_inch_w = f64::from(width) / size.width_in;
    let per_inch_h = f64::from(height) / size.height_in;
    let ppi = ((per_inch_w + per_inch_h) / 2.0).ceil();
    if ppi.is_finite() && ppi >= 1.0 {
        ppi as u32
    } else {
        1
    }
}

/// Estimate the run's PPI from the first card of `dir` in listing order.
///
/// # Errors
/// - [`CgcError::EmptyDirectory`] if `dir` has no files.
/// - [`CgcError::ImageRead`] if the first file cannot be decoded.
pub async fn estimate_ppi(dir: &Path, config: &PipelineConfig) -> Result<u32, CgcError> {
    let files = sorted_files(dir)?;
    let first = files.first().ok_or_else(|| CgcError::EmptyDirectory {
        path: dir.to_path_buf(),
    })?;
    estimate_ppi_from(first, config).await
}

/// Estimate the PPI from one specific image.
pub async fn estimate_ppi_from(path: &Path, config: &PipelineConfig) -> Result<u32, CgcError> {
    let owned = path.to_path_buf();
    let (width, height) = run_codec(&config.codec, config.codec_timeout_secs, move |c| {
        c.read_dimensions(&owned)
    })
    .await
    .map_err(|e| read_error(path, e))?;

    let ppi = calc_ppi(width, height, config.physical_size);
    debug!(
        "{}: {}×{} px at {:?} → {} ppi",
        path.display(),
        width,
        height,
        config.physical_size,
        ppi
    );
    Ok(ppi)
}

fn read_error(path: &Path, e: BlockingFailure<CodecError>) -> CgcError {
    match e {
        BlockingFailure::Failed(e) => CgcError::ImageRead {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
        BlockingFailure::TimedOut { secs } => CgcError::CodecTimeout {
            path: path.to_path_buf(),
            secs,
        },
        BlockingFailure::Panicked(detail) => CgcError::Internal(detail),
    }
}
