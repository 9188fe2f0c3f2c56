//! One card through the individual stage.
//!
//! 1. Re-encode `src` into `dest_dir/<file name>` with the run's density.
//!    GIF, BMP, TIFF and WebP cards are written as `<stem>.png`.
//! 2. Read back the written file's dimensions.
//! 3. If it is not already portrait (`width >= height`), give it a
//!    counter-clockwise quarter turn in place, keeping the density.
//!
//! Re-running on an already processed card only rewrites the density;
//! a portrait file is never rotated again.

use crate::config::PipelineConfig;
use crate::error::CardError;
use crate::output::CardResult;
use crate::pipeline::blocking::{run_codec, BlockingFailure};
use cgc_codec::{density_target, CodecError, QuarterTurn};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// Normalise one card into `dest_dir`. Never panics or returns early on
/// failure; the error is stored in the returned [`CardResult`].
pub async fn convert_one(
    src: &Path,
    dest_dir: &Path,
    ppi: u32,
    config: &PipelineConfig,
) -> CardResult {
    let start = Instant::now();
    let dest = match src.file_name() {
        Some(name) => density_target(&dest_dir.join(name)),
        None => dest_dir.to_path_buf(),
    };

    let outcome = normalise(src, &dest, ppi, config).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(rotated) => {
            debug!(
                "{} → {} ({} ppi{}) in {}ms",
                src.display(),
                dest.display(),
                ppi,
                if rotated { ", rotated" } else { "" },
                duration_ms
            );
            CardResult {
                source: src.to_path_buf(),
                dest,
                rotated,
                duration_ms,
                error: None,
            }
        }
        Err(error) => CardResult {
            source: src.to_path_buf(),
            dest,
            rotated: false,
            duration_ms,
            error: Some(error),
        },
    }
}

/// Returns whether the card was rotated.
async fn normalise(
    src: &Path,
    dest: &Path,
    ppi: u32,
    config: &PipelineConfig,
) -> Result<bool, CardError> {
    if src.file_name().is_none() {
        return Err(CardError::Internal {
            file: src.to_path_buf(),
            detail: "source path has no file name".into(),
        });
    }
    let timeout = config.codec_timeout_secs;

    // ── Density ──────────────────────────────────────────────────────────
    let (from, to) = (src.to_path_buf(), dest.to_path_buf());
    run_codec(&config.codec, timeout, move |c| c.set_density(&from, &to, ppi))
        .await
        .map_err(|e| {
            card_error(src, e, |file, detail| CardError::DensityChange {
                file,
                ppi,
                detail,
            })
        })?;

    // ── Orientation ──────────────────────────────────────────────────────
    let written = dest.to_path_buf();
    let (width, height) = run_codec(&config.codec, timeout, move |c| {
        c.read_dimensions(&written)
    })
    .await
    .map_err(|e| card_error(src, e, |file, detail| CardError::ImageRead { file, detail }))?;

    if width < height {
        return Ok(false);
    }

    let target = dest.to_path_buf();
    run_codec(&config.codec, timeout, move |c| {
        c.rotate(&target, &target, QuarterTurn::CounterClockwise, Some(ppi))
    })
    .await
    .map_err(|e| card_error(src, e, |file, detail| CardError::Rotation { file, detail }))?;

    Ok(true)
}

fn card_error(
    src: &Path,
    e: BlockingFailure<CodecError>,
    kind: impl FnOnce(PathBuf, String) -> CardError,
) -> CardError {
    let file = src.to_path_buf();
    match e {
        BlockingFailure::Failed(e) => kind(file, e.to_string()),
        BlockingFailure::TimedOut { secs } => CardError::Timeout { file, secs },
        BlockingFailure::Panicked(detail) => CardError::Internal { file, detail },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn setup(name: &str, w: u32, h: u32) -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let src_dir = tmp.path().join("cards");
        let dest_dir = tmp.path().join("individual");
        std::fs::create_dir_all(&src_dir).unwrap();
        std::fs::create_dir_all(&dest_dir).unwrap();
        let src = src_dir.join(name);
        RgbImage::from_pixel(w, h, Rgb([50, 60, 70])).save(&src).unwrap();
        (tmp, src, dest_dir)
    }

    #[tokio::test]
    async fn landscape_card_is_rotated() {
        let (_tmp, src, dest_dir) = setup("1.jpg", 364, 260);
        let result = convert_one(&src, &dest_dir, 104, &PipelineConfig::default()).await;

        assert!(result.is_ok(), "{:?}", result.error);
        assert!(result.rotated);
        assert_eq!(result.dest, dest_dir.join("1.jpg"));
        assert_eq!(image::image_dimensions(&result.dest).unwrap(), (260, 364));
    }

    #[tokio::test]
    async fn square_card_counts_as_landscape() {
        let (_tmp, src, dest_dir) = setup("sq.png", 50, 50);
        let result = convert_one(&src, &dest_dir, 72, &PipelineConfig::default()).await;
        assert!(result.is_ok());
        assert!(result.rotated);
    }

    #[tokio::test]
    async fn portrait_card_is_left_alone_and_rerun_is_stable() {
        let (_tmp, src, dest_dir) = setup("2.jpg", 260, 364);
        let config = PipelineConfig::default();

        let first = convert_one(&src, &dest_dir, 104, &config).await;
        assert!(first.is_ok());
        assert!(!first.rotated);

        let second = convert_one(&src, &dest_dir, 104, &config).await;
        assert!(!second.rotated);
        assert_eq!(image::image_dimensions(&second.dest).unwrap(), (260, 364));
    }

    #[tokio::test]
    async fn bmp_card_is_written_as_png() {
        let (_tmp, src, dest_dir) = setup("ace.bmp", 364, 260);
        let result = convert_one(&src, &dest_dir, 104, &PipelineConfig::default()).await;

        assert!(result.is_ok(), "{:?}", result.error);
        assert_eq!(result.dest, dest_dir.join("ace.png"));
        assert_eq!(image::image_dimensions(&result.dest).unwrap(), (260, 364));
        assert!(!dest_dir.join("ace.bmp").exists());
    }

    #[tokio::test]
    async fn undecodable_source_is_density_error() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("broken.jpg");
        std::fs::write(&src, b"garbage").unwrap();
        let dest_dir = tmp.path().join("out");
        std::fs::create_dir_all(&dest_dir).unwrap();

        let result = convert_one(&src, &dest_dir, 104, &PipelineConfig::default()).await;
        match result.error {
            Some(CardError::DensityChange { file, ppi, .. }) => {
                assert_eq!(file, src);
                assert_eq!(ppi, 104);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
