//! One PDF per horizontal sheet.
//!
//! Sheets are exported in listing order as `0.pdf`, `1.pdf`, … The whole of
//! `horizontal/` is exported on every run, so earlier PDFs are rewritten
//! with the same content and new sheets extend the numbering.

use crate::config::PipelineConfig;
use crate::error::CgcError;
use crate::pipeline::blocking::{run_codec, BlockingFailure};
use crate::pipeline::listing::sorted_files;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Write a PDF for every sheet in `sheets_dir` into `pdfs_dir`, each page
/// sized `pixels / ppi` inches. Returns the written paths in page order.
pub async fn export_pdfs(
    sheets_dir: &Path,
    pdfs_dir: &Path,
    ppi: u32,
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>, CgcError> {
    let sheets = sorted_files(sheets_dir)?;

    let mut written: Vec<(usize, Result<PathBuf, CgcError>)> =
        stream::iter(sheets.into_iter().enumerate())
            .map(|(idx, sheet)| async move {
                let dest = pdfs_dir.join(format!("{idx}.pdf"));
                (idx, export_one(sheet, dest, ppi, config).await)
            })
            .buffer_unordered(config.workers.max(1))
            .collect()
            .await;

    written.sort_by_key(|(idx, _)| *idx);
    let pdfs = written
        .into_iter()
        .map(|(_, r)| r)
        .collect::<Result<Vec<_>, _>>()?;

    info!("Exported {} PDF(s) to {}", pdfs.len(), pdfs_dir.display());
    Ok(pdfs)
}

async fn export_one(
    sheet: PathBuf,
    dest: PathBuf,
    ppi: u32,
    config: &PipelineConfig,
) -> Result<PathBuf, CgcError> {
    let source = sheet.clone();
    let bytes = run_codec(&config.codec, config.codec_timeout_secs, move |c| {
        c.encode_pdf(&source, ppi)
    })
    .await
    .map_err(|e| match e {
        BlockingFailure::TimedOut { secs } => CgcError::CodecTimeout {
            path: sheet.clone(),
            secs,
        },
        other => CgcError::PdfExport {
            path: sheet.clone(),
            detail: other.to_string(),
        },
    })?;

    // Atomic write: temp file, then rename
    let write_err = |e: std::io::Error| CgcError::PdfExport {
        path: dest.clone(),
        detail: e.to_string(),
    };
    let tmp = dest.with_extension("pdf.tmp");
    tokio::fs::write(&tmp, &bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, &dest).await.map_err(write_err)?;

    debug!("{} → {}", sheet.display(), dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[tokio::test]
    async fn one_pdf_per_sheet_numbered_from_zero() {
        let tmp = TempDir::new().unwrap();
        let sheets = tmp.path().join("horizontal");
        let pdfs = tmp.path().join("pdfs");
        std::fs::create_dir_all(&sheets).unwrap();
        std::fs::create_dir_all(&pdfs).unwrap();
        for name in ["2.jpg", "3.jpg"] {
            RgbImage::from_pixel(30, 20, Rgb([0, 0, 0]))
                .save(sheets.join(name))
                .unwrap();
        }

        let written = export_pdfs(&sheets, &pdfs, 10, &PipelineConfig::default())
            .await
            .unwrap();

        assert_eq!(written, vec![pdfs.join("0.pdf"), pdfs.join("1.pdf")]);
        for p in &written {
            let bytes = std::fs::read(p).unwrap();
            assert!(bytes.starts_with(b"%PDF"));
        }
        assert!(!pdfs.join("0.pdf.tmp").exists());
    }

    #[tokio::test]
    async fn no_sheets_no_pdfs() {
        let tmp = TempDir::new().unwrap();
        let written = export_pdfs(tmp.path(), tmp.path(), 10, &PipelineConfig::default())
            .await
            .unwrap();
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn corrupt_sheet_is_pdf_export_error() {
        let tmp = TempDir::new().unwrap();
        let sheets = tmp.path().join("horizontal");
        std::fs::create_dir_all(&sheets).unwrap();
        std::fs::write(sheets.join("2.jpg"), b"garbage").unwrap();

        let err = export_pdfs(&sheets, tmp.path(), 10, &PipelineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CgcError::PdfExport { .. }));
    }
}
