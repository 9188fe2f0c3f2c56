//! Configuration types for card-sheet conversion.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. The physical card size, cache policy and
//! worker bound are set once here and read-only for the rest of the run.

use crate::error::CgcError;
use crate::progress::ProgressCallback;
use cgc_codec::{ImageCodec, NativeCodec, DEFAULT_JPEG_QUALITY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for a card-sheet conversion run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use card_games_converter::{CacheMode, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .src_dir("/tmp/cards")
///     .dest_dir("/tmp/cgc")
///     .cache_mode(CacheMode::Name)
///     .workers(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Directory holding the source card images. Default: `<temp>/cards`.
    pub src_dir: PathBuf,

    /// Root of the destination tree (`individual/`, `vertical/`,
    /// `horizontal/`, `pdfs/`). Default: `<temp>/cgc`.
    pub dest_dir: PathBuf,

    /// Physical size every card should print at. Default: 3.5 × 2.5 in.
    pub physical_size: PhysicalSize,

    /// Which source files are skipped as already processed. Default: none.
    pub cache_mode: CacheMode,

    /// Upper bound on concurrently running codec calls. Default: available
    /// parallelism.
    ///
    /// The per-card stage fans out over this many workers; the merge passes
    /// reuse the same bound for their groups.
    pub workers: usize,

    /// Write one PDF per horizontal sheet into `pdfs/`. Default: true.
    pub export_pdf: bool,

    /// Per codec call timeout in seconds. Default: 120.
    ///
    /// A timed-out call is reported as failed; the blocking thread itself is
    /// not interrupted and finishes in the background.
    pub codec_timeout_secs: u64,

    /// JPEG quality (1–100) for every JPEG the pipeline writes. Default: 90.
    pub jpeg_quality: u8,

    /// RGB fill painted under merged tiles before pasting. Default: white.
    pub canvas_fill: [u8; 3],

    /// Image codec. Default: [`NativeCodec`] at `jpeg_quality`.
    pub codec: Arc<dyn ImageCodec>,

    /// Optional per-stage / per-card progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let tmp = std::env::temp_dir();
        Self {
            src_dir: tmp.join("cards"),
            dest_dir: tmp.join("cgc"),
            physical_size: PhysicalSize::default(),
            cache_mode: CacheMode::default(),
            workers: default_workers(),
            export_pdf: true,
            codec_timeout_secs: 120,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            canvas_fill: [255, 255, 255],
            codec: Arc::new(NativeCodec::new(DEFAULT_JPEG_QUALITY)),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("src_dir", &self.src_dir)
            .field("dest_dir", &self.dest_dir)
            .field("physical_size", &self.physical_size)
            .field("cache_mode", &self.cache_mode)
            .field("workers", &self.workers)
            .field("export_pdf", &self.export_pdf)
            .field("codec_timeout_secs", &self.codec_timeout_secs)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("canvas_fill", &self.canvas_fill)
            .field("codec", &"<dyn ImageCodec>")
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
            custom_codec: false,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
    custom_codec: bool,
}

impl PipelineConfigBuilder {
    pub fn src_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.src_dir = dir.into();
        self
    }

    pub fn dest_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dest_dir = dir.into();
        self
    }

    pub fn physical_size(mut self, size: PhysicalSize) -> Self {
        self.config.physical_size = size;
        self
    }

    pub fn width_inches(mut self, inches: f64) -> Self {
        self.config.physical_size.width_in = inches;
        self
    }

    pub fn height_inches(mut self, inches: f64) -> Self {
        self.config.physical_size.height_in = inches;
        self
    }

    pub fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.config.cache_mode = mode;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n.max(1);
        self
    }

    pub fn export_pdf(mut self, v: bool) -> Self {
        self.config.export_pdf = v;
        self
    }

    pub fn codec_timeout_secs(mut self, secs: u64) -> Self {
        self.config.codec_timeout_secs = secs;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q;
        self
    }

    pub fn canvas_fill(mut self, rgb: [u8; 3]) -> Self {
        self.config.canvas_fill = rgb;
        self
    }

    /// Replace the image codec. The codec's own quality setting wins over
    /// [`Self::jpeg_quality`].
    pub fn codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.config.codec = codec;
        self.custom_codec = true;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<PipelineConfig, CgcError> {
        let c = &self.config;
        c.physical_size.validate()?;
        if !(1..=100).contains(&c.jpeg_quality) {
            return Err(CgcError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.workers == 0 {
            return Err(CgcError::InvalidConfig("Workers must be ≥ 1".into()));
        }
        if c.codec_timeout_secs == 0 {
            return Err(CgcError::InvalidConfig(
                "Codec timeout must be ≥ 1 second".into(),
            ));
        }
        if !self.custom_codec {
            self.config.codec = Arc::new(NativeCodec::new(self.config.jpeg_quality));
        }
        Ok(self.config)
    }
}

// ── Value types ──────────────────────────────────────────────────────────

/// The printed size of one card, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalSize {
    pub width_in: f64,
    pub height_in: f64,
}

impl Default for PhysicalSize {
    /// A standard playing card held landscape: 3.5 × 2.5 in.
    fn default() -> Self {
        Self {
            width_in: 3.5,
            height_in: 2.5,
        }
    }
}

impl PhysicalSize {
    pub fn new(width_in: f64, height_in: f64) -> Self {
        Self {
            width_in,
            height_in,
        }
    }

    fn validate(&self) -> Result<(), CgcError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.width_in) && ok(self.height_in) {
            Ok(())
        } else {
            Err(CgcError::InvalidConfig(format!(
                "Physical size must be positive, got {} × {} in",
                self.width_in, self.height_in
            )))
        }
    }
}

/// Policy deciding which source cards still need the individual stage.
///
/// | Mode | Selected |
/// |------|----------|
/// | `None` | every source file |
/// | `Name` | files with no name match in `individual/` |
/// | `Digest` | `Name` selection plus files byte-identical (SHA-512) to their match |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    #[default]
    None,
    Name,
    /// Spelled `sha512` on the command line.
    #[serde(rename = "sha512")]
    Digest,
}

impl FromStr for CacheMode {
    type Err = CgcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(CacheMode::None),
            "name" => Ok(CacheMode::Name),
            "sha512" | "digest" => Ok(CacheMode::Digest),
            other => Err(CgcError::InvalidConfig(format!(
                "Unknown cache mode '{other}': use none, name or sha512"
            ))),
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheMode::None => "none",
            CacheMode::Name => "name",
            CacheMode::Digest => "sha512",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_card() {
        let c = PipelineConfig::default();
        assert_eq!(c.physical_size, PhysicalSize::new(3.5, 2.5));
        assert_eq!(c.cache_mode, CacheMode::None);
        assert!(c.workers >= 1);
        assert!(c.export_pdf);
        assert!(c.dest_dir.ends_with("cgc"));
        assert!(c.src_dir.ends_with("cards"));
    }

    #[test]
    fn builder_rejects_non_positive_size() {
        let err = PipelineConfig::builder()
            .width_inches(0.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, CgcError::InvalidConfig(_)));

        let err = PipelineConfig::builder()
            .height_inches(f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(err, CgcError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_bad_quality_and_timeout() {
        assert!(PipelineConfig::builder().jpeg_quality(0).build().is_err());
        assert!(PipelineConfig::builder().jpeg_quality(101).build().is_err());
        assert!(PipelineConfig::builder()
            .codec_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn workers_clamped_to_one() {
        let c = PipelineConfig::builder().workers(0).build().unwrap();
        assert_eq!(c.workers, 1);
    }

    #[test]
    fn cache_mode_parses_cli_spellings() {
        assert_eq!("none".parse::<CacheMode>().unwrap(), CacheMode::None);
        assert_eq!("NAME".parse::<CacheMode>().unwrap(), CacheMode::Name);
        assert_eq!("sha512".parse::<CacheMode>().unwrap(), CacheMode::Digest);
        assert!("md5".parse::<CacheMode>().is_err());
        assert_eq!(CacheMode::Digest.to_string(), "sha512");
    }

    #[test]
    fn cache_mode_serde_uses_cli_names() {
        let json = serde_json::to_string(&CacheMode::Digest).unwrap();
        assert_eq!(json, "\"sha512\"");
        let back: CacheMode = serde_json::from_str("\"name\"").unwrap();
        assert_eq!(back, CacheMode::Name);
    }
}
