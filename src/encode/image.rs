use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, codecs::jpeg::JpegEncoder, imageops::FilterType};

use crate::encode::ffmpeg::ensure_parent_dir;
use crate::encode::pdf::write_jpeg_pdf;
use crate::format::MediaFormat;
use crate::foundation::core::Resolution;
use crate::foundation::error::{ConvertError, ConvertResult};
use crate::request::ImageEdits;

pub const JPEG_QUALITY: u8 = 100;

pub fn open_image(path: &Path) -> ConvertResult<DynamicImage> {
    image::open(path)
        .map_err(|e| ConvertError::input(format!("cannot decode image '{}': {e}", path.display())))
}

pub fn resize_exact(img: &DynamicImage, to: Resolution) -> DynamicImage {
    if img.width() == to.width && img.height() == to.height {
        return img.clone();
    }
    img.resize_exact(to.width, to.height, FilterType::Lanczos3)
}

/// Mirror, flip and crop `img` as `edits` asks, in that order.
pub fn apply_edits(img: DynamicImage, edits: ImageEdits) -> DynamicImage {
    let img = if edits.mirror { img.fliph() } else { img };
    let img = if edits.flip { img.flipv() } else { img };
    if !edits.crop_square {
        return img;
    }
    let side = img.width().min(img.height());
    let x = (img.width() - side) / 2;
    let y = (img.height() - side) / 2;
    img.crop_imm(x, y, side, side)
}

/// Encode one still image into `format`.
pub fn encode_still(img: &DynamicImage, format: MediaFormat) -> ConvertResult<Vec<u8>> {
    let mut buf = Vec::new();
    match format {
        MediaFormat::Jpg => encode_jpeg(img, &mut buf)?,
        MediaFormat::Png => write_as(img, ImageFormat::Png, &mut buf)?,
        // image's WebP encoder is lossless.
        MediaFormat::Webp => write_as(
            &DynamicImage::ImageRgba8(img.to_rgba8()),
            ImageFormat::WebP,
            &mut buf,
        )?,
        MediaFormat::Gif => write_as(
            &DynamicImage::ImageRgba8(img.to_rgba8()),
            ImageFormat::Gif,
            &mut buf,
        )?,
        MediaFormat::Pdf => {
            let mut jpeg = Vec::new();
            encode_jpeg(img, &mut jpeg)?;
            write_jpeg_pdf(&mut buf, &jpeg, img.width(), img.height())?;
        }
        MediaFormat::Heic => {
            return Err(ConvertError::unsupported(
                "HEIC encoding is not available in this build",
            ));
        }
        other => {
            return Err(ConvertError::validation(format!(
                "'{other}' is not an image format"
            )));
        }
    }
    Ok(buf)
}

fn encode_jpeg(img: &DynamicImage, buf: &mut Vec<u8>) -> ConvertResult<()> {
    let rgb = img.to_rgb8();
    JpegEncoder::new_with_quality(&mut *buf, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| ConvertError::export(format!("jpeg encode failed: {e}")))
}

fn write_as(img: &DynamicImage, fmt: ImageFormat, buf: &mut Vec<u8>) -> ConvertResult<()> {
    img.write_to(&mut Cursor::new(buf), fmt)
        .map_err(|e| ConvertError::export(format!("{fmt:?} encode failed: {e}")))
}

/// Decode `src`, optionally resize, encode to `format` and write `out`.
///
/// Returns the size of the written image.
#[tracing::instrument(level = "debug")]
pub fn convert_image_file(
    src: &Path,
    out: &Path,
    format: MediaFormat,
    resize: Option<Resolution>,
) -> ConvertResult<Resolution> {
    let img = open_image(src)?;
    let img = match resize {
        Some(to) => resize_exact(&img, to),
        None => img,
    };
    write_still(&img, format, out)
}

/// Decode `src`, apply `edits`, encode to `format` and write `out`.
#[tracing::instrument(level = "debug")]
pub fn edit_image_file(
    src: &Path,
    out: &Path,
    format: MediaFormat,
    edits: ImageEdits,
) -> ConvertResult<Resolution> {
    let img = apply_edits(open_image(src)?, edits);
    write_still(&img, format, out)
}

fn write_still(img: &DynamicImage, format: MediaFormat, out: &Path) -> ConvertResult<Resolution> {
    let bytes = encode_still(img, format)?;
    ensure_parent_dir(out)?;
    std::fs::write(out, bytes)
        .map_err(|e| ConvertError::io(format!("failed to write '{}': {e}", out.display())))?;
    Resolution::new(img.width(), img.height())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/image.rs"]
mod tests;
