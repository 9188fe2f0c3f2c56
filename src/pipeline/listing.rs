//! Deterministic directory listings.
//!
//! Every stage that needs "the files of a directory, in order" goes through
//! [`sorted_files`], so the representative image for PPI estimation and the
//! grouping of cards into sheets never depend on what order the filesystem
//! happens to return.
//!
//! ## Order
//!
//! 1. Names whose stem is all ASCII digits, ascending by value
//!    (`2.jpg` < `10.jpg`). Equal values fall back to the full name
//!    (`1.jpg` < `01.jpg` is decided bytewise, never left as a tie).
//! 2. Every other name, byte-lexicographic.
//!
//! Directories and hidden entries (leading `.`, which includes the codec's
//! in-flight temp files) are not listed.

use crate::error::CgcError;
use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};

/// Regular files of `dir` in listing order.
pub fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>, CgcError> {
    read_sorted(dir).map_err(|source| CgcError::ListDirectory {
        path: dir.to_path_buf(),
        source,
    })
}

/// [`sorted_files`] with the raw I/O error, for callers that wrap it in
/// their own error kind.
pub(crate) fn read_sorted(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        // Follows symlinks, so a link to a card counts as a card.
        if entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort_by(|a, b| compare_names(file_name(a), file_name(b)));
    Ok(files)
}

/// Where the next merge pass into `dir` should start counting.
///
/// The larger of the number of files already there and the largest numeric
/// stem among them, so appended tiles always get fresh, strictly larger
/// names. An empty directory starts at 0.
pub fn next_sequence_start(dir: &Path) -> Result<usize, CgcError> {
    let files = sorted_files(dir)?;
    let largest = files
        .iter()
        .filter_map(|p| numeric_stem(file_name(p)))
        .filter_map(|digits| digits.parse::<usize>().ok())
        .max()
        .unwrap_or(0);
    Ok(files.len().max(largest))
}

/// Total order on file names described in the module docs.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    match (numeric_stem(a), numeric_stem(b)) {
        (Some(x), Some(y)) => compare_digits(x, y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

pub(crate) fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

fn numeric_stem(name: &str) -> Option<&str> {
    let stem = match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    };
    (!stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit())).then_some(stem)
}

/// Compare digit strings by value without parsing, so arbitrarily long stems
/// cannot overflow.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    fn names(files: &[PathBuf]) -> Vec<&str> {
        files.iter().map(|p| file_name(p)).collect()
    }

    #[test]
    fn numeric_names_sort_by_value() {
        let tmp = TempDir::new().unwrap();
        for n in ["10.jpg", "2.jpg", "1.jpg", "b.jpg", "a.png", "007.jpg"] {
            touch(tmp.path(), n);
        }
        let files = sorted_files(tmp.path()).unwrap();
        assert_eq!(
            names(&files),
            vec!["1.jpg", "2.jpg", "007.jpg", "10.jpg", "a.png", "b.jpg"]
        );
    }

    #[test]
    fn directories_and_hidden_files_are_skipped() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "1.jpg");
        touch(tmp.path(), ".1.jpg.tmp");
        std::fs::create_dir(tmp.path().join("nested")).unwrap();

        let files = sorted_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["1.jpg"]);
    }

    #[test]
    fn equal_values_are_not_ties() {
        assert_eq!(compare_names("1.jpg", "01.jpg"), Ordering::Greater);
        assert_eq!(compare_names("1.jpg", "1.png"), Ordering::Less);
        assert_eq!(compare_names("9.jpg", "9.jpg"), Ordering::Equal);
    }

    #[test]
    fn missing_directory_is_a_list_error() {
        let tmp = TempDir::new().unwrap();
        let err = sorted_files(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, CgcError::ListDirectory { .. }));
    }

    #[test]
    fn sequence_start_follows_existing_tiles() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(next_sequence_start(tmp.path()).unwrap(), 0);

        for n in ["4.jpg", "8.jpg", "9.jpg"] {
            touch(tmp.path(), n);
        }
        assert_eq!(next_sequence_start(tmp.path()).unwrap(), 9);

        // A stray non-numeric file still counts towards the total.
        touch(tmp.path(), "notes.txt");
        touch(tmp.path(), "1.jpg");
        touch(tmp.path(), "2.jpg");
        touch(tmp.path(), "3.jpg");
        touch(tmp.path(), "5.jpg");
        touch(tmp.path(), "6.jpg");
        touch(tmp.path(), "7.jpg");
        touch(tmp.path(), "x.jpg");
        assert_eq!(next_sequence_start(tmp.path()).unwrap(), 11);
    }
}
