//! Stateless image decoding for both the full-view and thumbnail paths.
//!
//! Every output is RGBA8 and flipped vertically so that row 0 is the bottom
//! of the picture, matching a bottom-left origin renderer.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use fast_image_resize as fir;
use image::{RgbaImage, imageops};
use tracing::{debug, trace};

use crate::config::SharpenOptions;
use crate::error::{DecodeError, DecodeErrorKind};
use crate::events::RawImage;
use crate::processing::layout::{fit_within, shrink_within};
use crate::processing::sharpen::unsharp_mask;

/// How a decoded image is shaped before it is handed back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraints {
    /// Fit inside a window, high-quality resample, optional sharpening.
    Fit {
        width: u32,
        height: u32,
        sharpen: Option<SharpenOptions>,
    },
    /// Shrink into a thumbnail bound (never enlarges).
    Thumbnail { max_width: u32, max_height: u32 },
    /// No resampling or sharpening.
    Original,
}

/// Decoder seam; implementations must be reentrant across worker threads.
pub trait Decode: Send + Sync {
    fn decode(&self, path: &Path, constraints: &Constraints) -> Result<RawImage, DecodeError>;
}

/// [`Decode`] backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl Decode for ImageDecoder {
    fn decode(&self, path: &Path, constraints: &Constraints) -> Result<RawImage, DecodeError> {
        let err = |kind: DecodeErrorKind| DecodeError::new(path, kind);
        let img = decode_rgba8_apply_exif(path).map_err(err)?;
        if img.width() == 0 || img.height() == 0 {
            return Err(err(DecodeErrorKind::Empty));
        }

        let img = match *constraints {
            Constraints::Fit {
                width,
                height,
                sharpen,
            } => {
                let (w, h) = fit_within(img.width(), img.height(), width, height);
                let resized = resize_rgba(&img, w, h, fir::FilterType::Lanczos3).map_err(err)?;
                match sharpen {
                    Some(opts) => unsharp_mask(&resized, &opts),
                    None => resized,
                }
            }
            Constraints::Thumbnail {
                max_width,
                max_height,
            } => {
                let (w, h) = shrink_within(img.width(), img.height(), max_width, max_height);
                resize_rgba(&img, w, h, fir::FilterType::CatmullRom).map_err(err)?
            }
            Constraints::Original => img,
        };

        let flipped = imageops::flip_vertical(&img);
        let (width, height) = flipped.dimensions();
        trace!(path = %path.display(), width, height, "decoded");
        Ok(RawImage::new(width, height, flipped.into_raw()))
    }
}

// Decodes an image to RGBA8 and applies EXIF orientation if available.
// If metadata is missing, the original orientation is preserved.
fn decode_rgba8_apply_exif(path: &Path) -> Result<RgbaImage, DecodeErrorKind> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let img = img.to_rgba8();

    let orientation = read_orientation(path).unwrap_or(1);
    Ok(match orientation {
        2 => imageops::flip_horizontal(&img),
        3 => imageops::rotate180(&img),
        4 => imageops::flip_vertical(&img),
        5 => imageops::flip_horizontal(&imageops::rotate90(&img)),
        6 => imageops::rotate90(&img),
        7 => imageops::flip_horizontal(&imageops::rotate270(&img)),
        8 => imageops::rotate270(&img),
        _ => img,
    })
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let o = field.value.get_uint(0)? as u16;
    debug!("exif orientation {} for {}", o, path.display());
    Some(o)
}

fn resize_rgba(
    source: &RgbaImage,
    target_w: u32,
    target_h: u32,
    filter: fir::FilterType,
) -> Result<RgbaImage, DecodeErrorKind> {
    if target_w == 0 || target_h == 0 {
        return Err(DecodeErrorKind::Empty);
    }
    if source.width() == target_w && source.height() == target_h {
        return Ok(source.clone());
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .map_err(|e| DecodeErrorKind::Resize(e.to_string()))?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(filter));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .map_err(|e| DecodeErrorKind::Resize(e.to_string()))?;
    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| DecodeErrorKind::Resize("resized buffer has the wrong length".into()))
}
