//! Compositing a group of cards into one sheet.
//!
//! ```text
//! Vertical              Horizontal
//! +------+              +------+----+---+
//! |  a   |  y = 0       |  a   | b  | c |
//! +----+-+              |      +----+   |
//! | b  |    y = h(a)    +------+    +---+
//! +---++                x = 0, w(a), w(a)+w(b)
//! | c |     y = h(a)+h(b)
//! +---+
//! ```
//!
//! The canvas is the sum of the extents along the merge axis and the maximum
//! across it. It is solid-filled first, so narrower cards leave fill colour,
//! never transparency, in the gap.

use crate::config::PipelineConfig;
use crate::error::CgcError;
use crate::pipeline::blocking::{run_codec, BlockingFailure};
use image::{imageops, DynamicImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Direction images are laid out in a merged sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Stacked top to bottom, left-aligned.
    Vertical,
    /// Side by side left to right, top-aligned.
    Horizontal,
}

impl Axis {
    /// Subdirectory of the destination root that holds this axis's sheets.
    pub fn dir_name(self) -> &'static str {
        match self {
            Axis::Vertical => "vertical",
            Axis::Horizontal => "horizontal",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Axis {
    type Err = CgcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vertical" => Ok(Axis::Vertical),
            "horizontal" => Ok(Axis::Horizontal),
            other => Err(CgcError::Merge {
                detail: format!("unknown axis '{other}'"),
            }),
        }
    }
}

/// Lay `images` out along `axis` on a canvas filled with `fill`.
///
/// # Errors
/// [`CgcError::Merge`] when `images` is empty.
pub fn compose(images: &[DynamicImage], axis: Axis, fill: [u8; 3]) -> Result<RgbImage, CgcError> {
    if images.is_empty() {
        return Err(CgcError::Merge {
            detail: "no images to merge".into(),
        });
    }

    let (width, height) = match axis {
        Axis::Vertical => (
            images.iter().map(|i| i.width()).max().unwrap_or(0),
            images.iter().map(|i| i.height()).sum(),
        ),
        Axis::Horizontal => (
            images.iter().map(|i| i.width()).sum(),
            images.iter().map(|i| i.height()).max().unwrap_or(0),
        ),
    };

    let mut canvas = RgbImage::from_pixel(width, height, Rgb(fill));
    let mut offset: i64 = 0;
    for img in images {
        let rgb = img.to_rgb8();
        match axis {
            Axis::Vertical => {
                imageops::replace(&mut canvas, &rgb, 0, offset);
                offset += i64::from(rgb.height());
            }
            Axis::Horizontal => {
                imageops::replace(&mut canvas, &rgb, offset, 0);
                offset += i64::from(rgb.width());
            }
        }
    }
    Ok(canvas)
}

/// Merge `paths` along `axis` into `<output_dir>/<axis>/<output_name>`.
///
/// The sheet is written as JPEG with `ppi` recorded as its density.
/// Returns the written path.
///
/// # Errors
/// - [`CgcError::Merge`] for an empty group or a failed write.
/// - [`CgcError::ImageRead`] if any input cannot be decoded.
pub async fn merge_tiles(
    paths: Vec<PathBuf>,
    axis: Axis,
    output_dir: &Path,
    output_name: &str,
    ppi: Option<u32>,
    config: &PipelineConfig,
) -> Result<PathBuf, CgcError> {
    if paths.is_empty() {
        return Err(CgcError::Merge {
            detail: format!("no images to merge into {output_name}"),
        });
    }

    let dest = output_dir.join(axis.dir_name()).join(output_name);
    let target = dest.clone();
    let fill = config.canvas_fill;
    let count = paths.len();

    run_codec(&config.codec, config.codec_timeout_secs, move |codec| {
        let images = paths
            .iter()
            .map(|p| {
                codec.decode(p).map_err(|e| CgcError::ImageRead {
                    path: p.clone(),
                    detail: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let sheet = compose(&images, axis, fill)?;
        codec
            .write_jpeg(&DynamicImage::ImageRgb8(sheet), &target, ppi)
            .map_err(|e| CgcError::Merge {
                detail: e.to_string(),
            })
    })
    .await
    .map_err(|e| match e {
        BlockingFailure::Failed(e) => e,
        BlockingFailure::TimedOut { secs } => CgcError::CodecTimeout {
            path: dest.clone(),
            secs,
        },
        BlockingFailure::Panicked(detail) => CgcError::Internal(detail),
    })?;

    debug!("Merged {} images {} → {}", count, axis, dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(rgb)))
    }

    #[test]
    fn vertical_stacks_and_pads_right() {
        let red = [255, 0, 0];
        let blue = [0, 0, 255];
        let sheet = compose(
            &[solid(10, 4, red), solid(6, 3, blue)],
            Axis::Vertical,
            [255, 255, 255],
        )
        .unwrap();

        assert_eq!(sheet.dimensions(), (10, 7));
        assert_eq!(sheet.get_pixel(0, 0), &Rgb(red));
        assert_eq!(sheet.get_pixel(0, 4), &Rgb(blue));
        assert_eq!(sheet.get_pixel(5, 6), &Rgb(blue));
        // Right of the narrower second card is fill.
        assert_eq!(sheet.get_pixel(8, 5), &Rgb([255, 255, 255]));
    }

    #[test]
    fn horizontal_places_side_by_side_and_pads_bottom() {
        let green = [0, 255, 0];
        let sheet = compose(
            &[solid(3, 5, green), solid(4, 2, [9, 9, 9])],
            Axis::Horizontal,
            [0, 0, 0],
        )
        .unwrap();

        assert_eq!(sheet.dimensions(), (7, 5));
        assert_eq!(sheet.get_pixel(2, 4), &Rgb(green));
        assert_eq!(sheet.get_pixel(3, 0), &Rgb([9, 9, 9]));
        assert_eq!(sheet.get_pixel(6, 4), &Rgb([0, 0, 0]));
    }

    #[test]
    fn single_image_is_unchanged() {
        for axis in [Axis::Vertical, Axis::Horizontal] {
            let sheet = compose(&[solid(8, 5, [1, 2, 3])], axis, [255, 255, 255]).unwrap();
            assert_eq!(sheet.dimensions(), (8, 5));
            assert!(sheet.pixels().all(|p| *p == Rgb([1, 2, 3])));
        }
    }

    #[test]
    fn empty_group_is_merge_error() {
        let err = compose(&[], Axis::Vertical, [255, 255, 255]).unwrap_err();
        assert!(matches!(err, CgcError::Merge { .. }));
    }

    #[test]
    fn unknown_axis_is_merge_error() {
        assert_eq!("vertical".parse::<Axis>().unwrap(), Axis::Vertical);
        let err = "diagonal".parse::<Axis>().unwrap_err();
        assert!(matches!(err, CgcError::Merge { .. }));
    }

    #[tokio::test]
    async fn merge_writes_jpeg_under_axis_dir() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("vertical")).unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        RgbImage::from_pixel(20, 30, Rgb([10, 10, 10])).save(&a).unwrap();
        RgbImage::from_pixel(20, 30, Rgb([200, 200, 200])).save(&b).unwrap();

        let out = merge_tiles(
            vec![a, b],
            Axis::Vertical,
            tmp.path(),
            "2.jpg",
            Some(104),
            &PipelineConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(out, tmp.path().join("vertical").join("2.jpg"));
        assert_eq!(image::image_dimensions(&out).unwrap(), (20, 60));
    }

    #[tokio::test]
    async fn unreadable_input_is_image_read() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("horizontal")).unwrap();
        let bad = tmp.path().join("bad.jpg");
        std::fs::write(&bad, b"nope").unwrap();

        let err = merge_tiles(
            vec![bad],
            Axis::Horizontal,
            tmp.path(),
            "1.jpg",
            None,
            &PipelineConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CgcError::ImageRead { .. }));
    }
}
