//! Which source cards still need the individual stage.
//!
//! Cache state is recomputed from disk on every call and never persisted:
//! the files already under `individual/` are the cache.
//!
//! ## Name matching
//!
//! A source file counts as present when any destination file name *ends
//! with* the source file name. This is deliberately lenient (`1.jpg` is
//! matched by `11.jpg`), so short numeric names can over-match. A card the
//! individual stage writes under another extension (`ace.gif` → `ace.png`)
//! is also matched by that name.
//!
//! ## Modes
//!
//! | [`CacheMode`] | Returned |
//! |---|---|
//! | `None`   | every source file |
//! | `Name`   | sources with no name match |
//! | `Digest` | `Name`'s result, plus sources with any match of identical bytes |
//!
//! [`identical_counterparts`] is the digest rule on its own: only sources
//! that have a match *and* hash the same. `Digest` layers it over `Name`
//! so brand-new cards are never dropped.

use crate::config::CacheMode;
use crate::error::CgcError;
use crate::pipeline::listing::{file_name, read_sorted};
use cgc_codec::density_target;
use sha2::{Digest, Sha512};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source files of `src_dir` that should be (re)processed into `dest_dir`,
/// in listing order.
///
/// Hidden files (leading `.`) and subdirectories are never listed, so even
/// [`CacheMode::None`] returns every *visible regular* file rather than
/// every directory entry.
///
/// # Errors
/// [`CgcError::CacheScan`] on any I/O failure listing or hashing either
/// directory. Nothing is returned partially.
pub fn select_sources(
    src_dir: &Path,
    dest_dir: &Path,
    mode: CacheMode,
) -> Result<Vec<PathBuf>, CgcError> {
    let sources = scan(src_dir)?;
    if mode == CacheMode::None {
        return Ok(sources);
    }

    let dest_names = dest_names(dest_dir)?;
    let mut selected = Vec::with_capacity(sources.len());

    for src in sources {
        let matches = counterparts(&src, dest_dir, &dest_names);
        if matches.is_empty() {
            debug!("cache: {} is new", src.display());
            selected.push(src);
        } else if mode == CacheMode::Digest {
            if any_identical(&src, &matches)? {
                debug!("cache: {} unchanged, reprocessing", src.display());
                selected.push(src);
            } else {
                debug!(
                    "cache: {} differs from all {} match(es), skipping",
                    src.display(),
                    matches.len()
                );
            }
        } else {
            debug!(
                "cache: {} matched by {}, skipping",
                src.display(),
                matches[0].display()
            );
        }
    }

    Ok(selected)
}

/// Sources with at least one name match in `dest_dir` whose contents hash
/// identically (SHA-512). Sources without a match are not returned.
pub fn identical_counterparts(src_dir: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, CgcError> {
    let dest_names = dest_names(dest_dir)?;
    let mut selected = Vec::new();
    for src in scan(src_dir)? {
        let matches = counterparts(&src, dest_dir, &dest_names);
        if !matches.is_empty() && any_identical(&src, &matches)? {
            selected.push(src);
        }
    }
    Ok(selected)
}

/// Whether two files have the same SHA-512 digest.
pub fn digest_identical(a: &Path, b: &Path) -> Result<bool, CgcError> {
    Ok(sha512_file(a)? == sha512_file(b)?)
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn scan(dir: &Path) -> Result<Vec<PathBuf>, CgcError> {
    read_sorted(dir).map_err(|source| scan_error(dir, source))
}

fn dest_names(dest_dir: &Path) -> Result<Vec<String>, CgcError> {
    Ok(scan(dest_dir)?
        .iter()
        .map(|p| file_name(p).to_string())
        .collect())
}

/// Every destination file `src` is considered present as, in listing order.
fn counterparts(src: &Path, dest_dir: &Path, dest_names: &[String]) -> Vec<PathBuf> {
    let name = file_name(src);
    if name.is_empty() {
        return Vec::new();
    }
    let target = density_target(Path::new(name));
    let written = file_name(&target);
    dest_names
        .iter()
        .filter(|d| d.ends_with(name) || d.ends_with(written))
        .map(|d| dest_dir.join(d))
        .collect()
}

/// Hashes `src` once and compares it against each match until one agrees.
fn any_identical(src: &Path, matches: &[PathBuf]) -> Result<bool, CgcError> {
    let digest = sha512_file(src)?;
    for dest in matches {
        if sha512_file(dest)? == digest {
            return Ok(true);
        }
    }
    Ok(false)
}

fn sha512_file(path: &Path) -> Result<Vec<u8>, CgcError> {
    let hash = || -> io::Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let mut hasher = Sha512::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(hasher.finalize().to_vec())
    };
    hash().map_err(|source| scan_error(path, source))
}

fn scan_error(path: &Path, source: io::Error) -> CgcError {
    CgcError::CacheScan {
        path: path.to_path_buf(),
        source,
    }
}
