use std::io::Write;
use std::path::Path;

use image::{
    Delay, DynamicImage, Frame, RgbaImage,
    codecs::gif::{GifEncoder, Repeat},
};

use crate::assets::decode::{FrameReader, FrameReaderOpts};
use crate::assets::probe::MediaAsset;
use crate::encode::ffmpeg::ensure_parent_dir;
use crate::encode::image::resize_exact;
use crate::encode::session::CancelToken;
use crate::foundation::core::Resolution;
use crate::foundation::error::{ConvertError, ConvertResult};
use crate::request::GifOptions;

/// NeuQuant speed handed to the encoder (1 best, 30 fastest).
const QUANTIZE_SPEED: i32 = 10;

/// 0 loops forever; `n` repeats `n` times.
pub fn gif_repeat(loop_count: u16) -> Repeat {
    match loop_count {
        0 => Repeat::Infinite,
        n => Repeat::Finite(n),
    }
}

pub fn gif_delay(fps: u32) -> Delay {
    Delay::from_numer_denom_ms(1000, fps.max(1))
}

/// Streams frames into a GIF encoder writing to `W`.
pub struct GifWriter<W: Write> {
    encoder: GifEncoder<W>,
    delay: Delay,
    size: Resolution,
    frames: u64,
}

impl<W: Write> GifWriter<W> {
    pub fn new(sink: W, size: Resolution, fps: u32, loop_count: u16) -> ConvertResult<Self> {
        if fps == 0 {
            return Err(ConvertError::validation("gif fps must be non-zero"));
        }
        let mut encoder = GifEncoder::new_with_speed(sink, QUANTIZE_SPEED);
        encoder
            .set_repeat(gif_repeat(loop_count))
            .map_err(|e| ConvertError::export(format!("gif header: {e}")))?;
        Ok(Self {
            encoder,
            delay: gif_delay(fps),
            size,
            frames: 0,
        })
    }

    pub fn push(&mut self, frame: RgbaImage) -> ConvertResult<()> {
        if frame.width() != self.size.width || frame.height() != self.size.height {
            return Err(ConvertError::validation(format!(
                "gif frame is {}x{}, expected {}",
                frame.width(),
                frame.height(),
                self.size
            )));
        }
        self.encoder
            .encode_frame(Frame::from_parts(frame, 0, 0, self.delay))
            .map_err(|e| ConvertError::export(format!("gif frame encode failed: {e}")))?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Write the trailer (the encoder does so when dropped). Returns the frame count.
    pub fn finish(self) -> ConvertResult<u64> {
        if self.frames == 0 {
            return Err(ConvertError::input("gif has no frames"));
        }
        let frames = self.frames;
        drop(self.encoder);
        Ok(frames)
    }
}

fn write_output(out: &Path, bytes: &[u8]) -> ConvertResult<()> {
    ensure_parent_dir(out)?;
    std::fs::write(out, bytes)
        .map_err(|e| ConvertError::io(format!("failed to write '{}': {e}", out.display())))
}

/// Loop a still image for `opts.range` seconds at `opts.fps`.
#[tracing::instrument(level = "debug", skip(img, cancel))]
pub fn gif_from_image(
    img: &DynamicImage,
    opts: &GifOptions,
    out: &Path,
    cancel: &CancelToken,
) -> ConvertResult<u64> {
    let count = opts.frame_count();
    if count == 0 {
        return Err(ConvertError::validation(
            "gif must contain at least one frame",
        ));
    }
    let size = opts.resolution.unwrap_or(Resolution::GIF_DEFAULT);
    let frame = resize_exact(img, size).to_rgba8();

    let mut bytes = Vec::new();
    let mut writer = GifWriter::new(&mut bytes, size, opts.fps, opts.loop_count)?;
    for _ in 0..count {
        cancel.check()?;
        writer.push(frame.clone())?;
    }
    let frames = writer.finish()?;
    write_output(out, &bytes)?;
    Ok(frames)
}

/// Decode `opts.range` of a video at `opts.fps` and encode every frame.
#[tracing::instrument(
    level = "debug",
    skip(ffmpeg, asset, cancel),
    fields(src = %asset.path.display())
)]
pub fn gif_from_video(
    ffmpeg: &Path,
    asset: &MediaAsset,
    opts: &GifOptions,
    out: &Path,
    cancel: &CancelToken,
) -> ConvertResult<u64> {
    asset.require_video()?;
    let range = opts.range.require_non_empty()?;
    let size = match opts.resolution {
        Some(r) => r,
        None => asset
            .display_size()
            .ok_or_else(|| ConvertError::input("video has no usable size"))?,
    };

    let mut reader = FrameReader::spawn(
        ffmpeg,
        &asset.path,
        &FrameReaderOpts {
            size,
            start_sec: Some(range.start_sec),
            duration_sec: Some(range.duration_sec()),
            fps: Some(opts.fps),
        },
    )?;
    let mut bytes = Vec::new();
    let mut writer = GifWriter::new(&mut bytes, size, opts.fps, opts.loop_count)?;
    let mut buf = Vec::new();
    while reader.read_frame(&mut buf)? {
        cancel.check()?;
        let img = RgbaImage::from_raw(size.width, size.height, std::mem::take(&mut buf))
            .ok_or_else(|| ConvertError::input("decoded frame has the wrong size"))?;
        writer.push(img)?;
    }
    reader.finish()?;
    let frames = writer.finish()?;
    write_output(out, &bytes)?;
    Ok(frames)
}
