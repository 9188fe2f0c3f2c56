//! Fixed-size grouping of a listing into merged sheets.
//!
//! The listing is walked once. Each time the pending group reaches
//! `group_size` it closes; whatever is left at the end closes too, even a
//! single image. A closed group is named after the cumulative number of
//! images seen so far (plus the sequence offset):
//!
//! ```text
//! 9 cards, size 4:   [1 2 3 4] [5 6 7 8] [9]  →  4.jpg 8.jpg 9.jpg
//! 3 strips, size 2:  [4 8] [9]                →  2.jpg 3.jpg
//! ```
//!
//! Groups write disjoint files, so their merges run concurrently (bounded by
//! `config.workers`). [`partition`] returns only after every merge of the
//! pass has finished, so the next pass always sees complete output.

use crate::config::PipelineConfig;
use crate::error::CgcError;
use crate::output::TileResult;
use crate::pipeline::merge::{merge_tiles, Axis};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Cards per vertical strip.
pub const VERTICAL_GROUP: usize = 4;
/// Strips per horizontal sheet.
pub const HORIZONTAL_GROUP: usize = 2;

/// A closed group: its sequence number and its images in paste order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub sequence: usize,
    pub paths: Vec<PathBuf>,
}

impl Group {
    /// `"<sequence>.jpg"`.
    pub fn file_name(&self) -> String {
        format!("{}.jpg", self.sequence)
    }
}

/// Split `list` into groups of `group_size`, remainder last.
///
/// `sequence_offset` is added to every sequence number; pass 0 for a fresh
/// output directory.
pub fn plan_groups(
    list: &[PathBuf],
    group_size: usize,
    sequence_offset: usize,
) -> Result<Vec<Group>, CgcError> {
    if group_size == 0 {
        return Err(CgcError::Merge {
            detail: "group size must be at least 1".into(),
        });
    }

    let mut groups = Vec::with_capacity(list.len().div_ceil(group_size));
    let mut pending = Vec::with_capacity(group_size);
    for (seen, path) in list.iter().enumerate() {
        pending.push(path.clone());
        if pending.len() == group_size {
            groups.push(Group {
                sequence: sequence_offset + seen + 1,
                paths: std::mem::take(&mut pending),
            });
        }
    }
    if !pending.is_empty() {
        groups.push(Group {
            sequence: sequence_offset + list.len(),
            paths: pending,
        });
    }
    Ok(groups)
}

/// Merge `list` along `axis` in groups of `group_size`, writing under
/// `<dest_root>/<axis>/`.
///
/// An empty `list` writes nothing and succeeds.
///
/// # Errors
/// The first failed merge (by sequence), reported after every merge of the
/// pass has completed.
pub async fn partition(
    list: &[PathBuf],
    group_size: usize,
    axis: Axis,
    dest_root: &Path,
    sequence_offset: usize,
    ppi: u32,
    config: &PipelineConfig,
) -> Result<Vec<TileResult>, CgcError> {
    let groups = plan_groups(list, group_size, sequence_offset)?;
    if groups.is_empty() {
        debug!("Nothing to merge {}", axis);
        return Ok(Vec::new());
    }

    let mut results: Vec<(usize, Result<TileResult, CgcError>)> =
        stream::iter(groups.into_iter())
            .map(|group| async move {
                let name = group.file_name();
                let merged = merge_tiles(
                    group.paths.clone(),
                    axis,
                    dest_root,
                    &name,
                    Some(ppi),
                    config,
                )
                .await
                .map(|path| {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_tile_written(axis, &path);
                    }
                    TileResult {
                        axis,
                        path,
                        inputs: group.paths,
                        sequence: group.sequence,
                    }
                });
                (group.sequence, merged)
            })
            .buffer_unordered(config.workers.max(1))
            .collect()
            .await;

    results.sort_by_key(|(seq, _)| *seq);
    let tiles = results
        .into_iter()
        .map(|(_, r)| r)
        .collect::<Result<Vec<_>, _>>()?;

    info!("Wrote {} {} sheet(s)", tiles.len(), axis);
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn paths(n: usize) -> Vec<PathBuf> {
        (1..=n).map(|i| PathBuf::from(format!("{i}.jpg"))).collect()
    }

    fn summary(groups: &[Group]) -> Vec<(String, usize)> {
        groups.iter().map(|g| (g.file_name(), g.paths.len())).collect()
    }

    #[test]
    fn nine_cards_in_fours() {
        let groups = plan_groups(&paths(9), VERTICAL_GROUP, 0).unwrap();
        assert_eq!(
            summary(&groups),
            vec![
                ("4.jpg".to_string(), 4),
                ("8.jpg".to_string(), 4),
                ("9.jpg".to_string(), 1)
            ]
        );
        assert_eq!(groups[1].paths, paths(8)[4..].to_vec());
    }

    #[test]
    fn three_strips_in_twos() {
        let groups = plan_groups(&paths(3), HORIZONTAL_GROUP, 0).unwrap();
        assert_eq!(
            summary(&groups),
            vec![("2.jpg".to_string(), 2), ("3.jpg".to_string(), 1)]
        );
    }

    #[test]
    fn exact_multiple_has_no_remainder() {
        let groups = plan_groups(&paths(8), VERTICAL_GROUP, 0).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].sequence, 8);
    }

    #[test]
    fn offset_continues_numbering() {
        let groups = plan_groups(&paths(5), VERTICAL_GROUP, 9).unwrap();
        let seqs: Vec<_> = groups.iter().map(|g| g.sequence).collect();
        assert_eq!(seqs, vec![13, 14]);
    }

    #[test]
    fn zero_group_size_is_rejected() {
        assert!(plan_groups(&paths(2), 0, 0).is_err());
    }

    #[tokio::test]
    async fn empty_listing_merges_nothing() {
        let tmp = TempDir::new().unwrap();
        let tiles = partition(
            &[],
            VERTICAL_GROUP,
            Axis::Vertical,
            tmp.path(),
            0,
            100,
            &PipelineConfig::default(),
        )
        .await
        .unwrap();
        assert!(tiles.is_empty());
    }

    #[tokio::test]
    async fn five_cards_make_two_strips() {
        let tmp = TempDir::new().unwrap();
        let individual = tmp.path().join("individual");
        std::fs::create_dir_all(&individual).unwrap();
        std::fs::create_dir_all(tmp.path().join("vertical")).unwrap();
        let list: Vec<PathBuf> = (1..=5)
            .map(|i| {
                let p = individual.join(format!("{i}.png"));
                RgbImage::from_pixel(10, 14, Rgb([0, 0, 0])).save(&p).unwrap();
                p
            })
            .collect();

        let tiles = partition(
            &list,
            VERTICAL_GROUP,
            Axis::Vertical,
            tmp.path(),
            0,
            72,
            &PipelineConfig::default(),
        )
        .await
        .unwrap();

        let names: Vec<_> = tiles.iter().map(|t| t.path.clone()).collect();
        assert_eq!(
            names,
            vec![
                tmp.path().join("vertical/4.jpg"),
                tmp.path().join("vertical/5.jpg")
            ]
        );
        assert_eq!(image::image_dimensions(&names[0]).unwrap(), (10, 56));
        assert_eq!(image::image_dimensions(&names[1]).unwrap(), (10, 14));
    }
}
