//! # cgc-codec
//!
//! The pixel-level collaborator behind `card-games-converter`. Everything that
//! touches encoded bytes lives here so the layout engine never has to know
//! how a JPEG header stores its density or how a PDF page is sized.
//!
//! ## Operations
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`ImageCodec::read_dimensions`] | header-only width/height read |
//! | [`ImageCodec::set_density`]     | re-encode `src` into `dest` carrying `ppi` |
//! | [`ImageCodec::rotate`]          | quarter turn with frame expansion |
//! | [`ImageCodec::decode`]          | full decode for compositing |
//! | [`ImageCodec::write_jpeg`]      | RGB JPEG sheet, optional density |
//! | [`ImageCodec::encode_pdf`]      | one-page PDF sized from pixels and `ppi` |
//!
//! ## Density storage
//!
//! - JPEG: JFIF APP0 header, units = dots per inch.
//! - PNG: `pHYs` chunk, units = pixels per metre (`ppi / 0.0254`, rounded).
//!
//! Any other destination extension is rejected with
//! [`CodecError::UnsupportedFormat`] rather than silently dropping density.
//! GIF, BMP, TIFF and WebP are accepted as *inputs*; [`density_target`] maps
//! such a file name onto the PNG it should be written as.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cgc_codec::{ImageCodec, NativeCodec, QuarterTurn};
//! use std::path::Path;
//!
//! let codec = NativeCodec::new(90);
//! codec.set_density(Path::new("in.jpg"), Path::new("out.jpg"), 104)?;
//! let (w, h) = codec.read_dimensions(Path::new("out.jpg"))?;
//! if w >= h {
//!     codec.rotate(Path::new("out.jpg"), Path::new("out.jpg"), QuarterTurn::CounterClockwise, Some(104))?;
//! }
//! # Ok::<(), cgc_codec::CodecError>(())
//! ```

use std::path::{Path, PathBuf};

use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::{ColorType, DynamicImage, ImageFormat};
use printpdf::{
    ColorBits, ColorSpace, Image, ImageFilter, ImageTransform, ImageXObject, Mm, PdfDocument, Px,
};
use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// JPEG quality used by [`NativeCodec::default`].
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

const METRES_PER_INCH: f64 = 0.0254;
const MM_PER_INCH: f32 = 25.4;

/// Where an image named like `path` should be written so its density can be
/// stored: JPEG and PNG keep their name, anything else becomes `.png`.
pub fn density_target(path: &Path) -> PathBuf {
    match ImageFormat::from_path(path) {
        Ok(ImageFormat::Jpeg | ImageFormat::Png) => path.to_path_buf(),
        _ => path.with_extension("png"),
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by codec operations.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Reading or writing the file itself failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not an image this codec understands.
    #[error("Cannot decode '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Encoding the output image failed.
    #[error("Cannot encode '{path}': {reason}")]
    Encode { path: PathBuf, reason: String },

    /// The destination extension has no density-carrying encoder.
    #[error("Unsupported output format for '{path}' (expected .jpg, .jpeg or .png)")]
    UnsupportedFormat { path: PathBuf },

    /// JFIF stores density as a 16-bit value; zero is meaningless.
    #[error("Density {ppi} ppi is outside the supported range 1–65535")]
    DensityOutOfRange { ppi: u32 },

    /// printpdf rejected the document.
    #[error("PDF encoding failed for '{path}': {reason}")]
    Pdf { path: PathBuf, reason: String },
}

// ── Rotation ─────────────────────────────────────────────────────────────────

/// A 90° rotation. The canvas always expands, so width and height swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarterTurn {
    Clockwise,
    /// Positive-angle rotation in the usual image-editor convention.
    CounterClockwise,
}

impl QuarterTurn {
    pub fn apply(self, img: &DynamicImage) -> DynamicImage {
        match self {
            QuarterTurn::Clockwise => img.rotate90(),
            QuarterTurn::CounterClockwise => img.rotate270(),
        }
    }
}

// ── Codec trait ──────────────────────────────────────────────────────────────

/// Synchronous, path-in / file-or-bytes-out image operations.
///
/// All methods block; callers running inside an async runtime should move
/// them onto a blocking thread. Implementations must be `Send + Sync` because
/// a single codec instance is shared by every batch worker.
pub trait ImageCodec: Send + Sync {
    /// Pixel width and height, read from the header where possible.
    fn read_dimensions(&self, path: &Path) -> Result<(u32, u32), CodecError>;

    /// Decode `src` and write it to `dest` with `ppi` recorded as its density.
    ///
    /// The output format follows `dest`'s extension.
    fn set_density(&self, src: &Path, dest: &Path, ppi: u32) -> Result<(), CodecError>;

    /// Rotate `src` a quarter turn into `dest` (which may equal `src`).
    ///
    /// `ppi` is written back when given, since re-encoding drops metadata.
    fn rotate(
        &self,
        src: &Path,
        dest: &Path,
        turn: QuarterTurn,
        ppi: Option<u32>,
    ) -> Result<(), CodecError>;

    /// Fully decode an image.
    fn decode(&self, path: &Path) -> Result<DynamicImage, CodecError>;

    /// Encode `img` as an RGB JPEG at `dest`.
    fn write_jpeg(&self, img: &DynamicImage, dest: &Path, ppi: Option<u32>)
        -> Result<(), CodecError>;

    /// Wrap the image at `path` in a single-page PDF whose page measures
    /// `pixels / ppi` inches on each side.
    fn encode_pdf(&self, path: &Path, ppi: u32) -> Result<Vec<u8>, CodecError>;
}

// ── Native implementation ────────────────────────────────────────────────────

/// [`ImageCodec`] backed by the `image`, `png` and `printpdf` crates.
#[derive(Debug, Clone, Copy)]
pub struct NativeCodec {
    jpeg_quality: u8,
}

impl Default for NativeCodec {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl NativeCodec {
    /// `jpeg_quality` is clamped to 1–100.
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    fn write_with_density(
        &self,
        img: &DynamicImage,
        dest: &Path,
        ppi: Option<u32>,
    ) -> Result<(), CodecError> {
        let bytes = match ImageFormat::from_path(dest) {
            Ok(ImageFormat::Jpeg) => encode_jpeg(img, ppi, self.jpeg_quality, dest)?,
            Ok(ImageFormat::Png) => encode_png(img, ppi, dest)?,
            _ => {
                return Err(CodecError::UnsupportedFormat {
                    path: dest.to_path_buf(),
                })
            }
        };
        write_atomic(dest, &bytes)
    }
}

impl ImageCodec for NativeCodec {
    fn read_dimensions(&self, path: &Path) -> Result<(u32, u32), CodecError> {
        image::image_dimensions(path).map_err(|e| decode_error(path, e))
    }

    fn set_density(&self, src: &Path, dest: &Path, ppi: u32) -> Result<(), CodecError> {
        let img = self.decode(src)?;
        self.write_with_density(&img, dest, Some(ppi))
    }

    fn rotate(
        &self,
        src: &Path,
        dest: &Path,
        turn: QuarterTurn,
        ppi: Option<u32>,
    ) -> Result<(), CodecError> {
        let img = self.decode(src)?;
        let rotated = turn.apply(&img);
        self.write_with_density(&rotated, dest, ppi)
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage, CodecError> {
        image::open(path).map_err(|e| decode_error(path, e))
    }

    fn write_jpeg(
        &self,
        img: &DynamicImage,
        dest: &Path,
        ppi: Option<u32>,
    ) -> Result<(), CodecError> {
        let bytes = encode_jpeg(img, ppi, self.jpeg_quality, dest)?;
        write_atomic(dest, &bytes)
    }

    fn encode_pdf(&self, path: &Path, ppi: u32) -> Result<Vec<u8>, CodecError> {
        if ppi == 0 {
            return Err(CodecError::DensityOutOfRange { ppi });
        }

        let bytes = std::fs::read(path).map_err(|source| CodecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let format = image::guess_format(&bytes).map_err(|e| decode_error(path, e))?;
        let img = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| decode_error(path, e))?;
        let (width, height) = (img.width(), img.height());

        // Baseline RGB JPEG goes in as-is (DCTDecode); everything else is
        // normalised to one first so the PDF never carries alpha or CMYK.
        let jpeg = if format == ImageFormat::Jpeg && img.color() == ColorType::Rgb8 {
            bytes
        } else {
            encode_jpeg(&img, None, self.jpeg_quality, path)?
        };

        let dpi = ppi as f32;
        let page_w = Mm(width as f32 / dpi * MM_PER_INCH);
        let page_h = Mm(height as f32 / dpi * MM_PER_INCH);

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sheet".to_string());
        let (doc, page, layer) = PdfDocument::new(title, page_w, page_h, "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);

        let page_image = Image::from(ImageXObject {
            width: Px(width as usize),
            height: Px(height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: false,
            image_data: jpeg,
            image_filter: Some(ImageFilter::DCT),
            clipping_bbox: None,
            smask: None,
        });
        page_image.add_to_layer(
            layer,
            ImageTransform {
                dpi: Some(dpi),
                ..Default::default()
            },
        );

        doc.save_to_bytes().map_err(|e| CodecError::Pdf {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn decode_error(path: &Path, e: image::ImageError) -> CodecError {
    CodecError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn density_u16(ppi: u32) -> Result<u16, CodecError> {
    match u16::try_from(ppi) {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(CodecError::DensityOutOfRange { ppi }),
    }
}

fn encode_jpeg(
    img: &DynamicImage,
    ppi: Option<u32>,
    quality: u8,
    dest: &Path,
) -> Result<Vec<u8>, CodecError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        if let Some(ppi) = ppi {
            encoder.set_pixel_density(PixelDensity::dpi(density_u16(ppi)?));
        }
        encoder
            .encode_image(&rgb)
            .map_err(|e| CodecError::Encode {
                path: dest.to_path_buf(),
                reason: e.to_string(),
            })?;
    }
    Ok(buf)
}

fn encode_png(img: &DynamicImage, ppi: Option<u32>, dest: &Path) -> Result<Vec<u8>, CodecError> {
    let encode_err = |e: png::EncodingError| CodecError::Encode {
        path: dest.to_path_buf(),
        reason: e.to_string(),
    };

    let rgba = img.to_rgba8();
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, rgba.width(), rgba.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if let Some(ppi) = ppi {
            density_u16(ppi)?;
            let ppm = (f64::from(ppi) / METRES_PER_INCH).round() as u32;
            encoder.set_pixel_dims(Some(png::PixelDimensions {
                xppu: ppm,
                yppu: ppm,
                unit: png::Unit::Meter,
            }));
        }
        let mut writer = encoder.write_header().map_err(encode_err)?;
        writer.write_image_data(rgba.as_raw()).map_err(encode_err)?;
    }
    Ok(buf)
}

/// Write to a hidden sibling, then rename over `dest`, so readers never see a
/// half-written image and in-place rewrites (`src == dest`) are safe.
fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), CodecError> {
    let io_err = |source| CodecError::Io {
        path: dest.to_path_buf(),
        source,
    };

    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dest.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&tmp, bytes).map_err(io_err)?;
    std::fs::rename(&tmp, dest).map_err(io_err)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
