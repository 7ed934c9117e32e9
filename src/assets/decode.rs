use std::{
    io::Read,
    path::Path,
    process::{Child, ChildStdout, Command, Stdio},
    sync::Arc,
    thread::JoinHandle,
};

use anyhow::Context;

use crate::foundation::core::Resolution;
use crate::foundation::error::{ConvertError, ConvertResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// Decoded still image, premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    pub fn resolution(&self) -> ConvertResult<Resolution> {
        Resolution::new(self.width, self.height)
    }
}

pub fn decode_image(bytes: &[u8]) -> ConvertResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

pub fn decode_image_file(path: &Path) -> ConvertResult<PreparedImage> {
    let bytes = std::fs::read(path).map_err(|e| {
        ConvertError::io(format!("failed to read image '{}': {e}", path.display()))
    })?;
    decode_image(&bytes)
        .map_err(|e| ConvertError::input(format!("'{}': {e}", path.display())))
}

/// Decoded interleaved floating-point PCM.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

/// Decode the first audio stream of `path` as interleaved `f32` at the given rate/layout.
#[tracing::instrument(level = "debug", skip(ffmpeg))]
pub fn decode_audio_f32(
    ffmpeg: &Path,
    path: &Path,
    sample_rate: u32,
    channels: u16,
) -> ConvertResult<AudioPcm> {
    if sample_rate == 0 || channels == 0 {
        return Err(ConvertError::validation(
            "audio decode needs non-zero sample_rate/channels",
        ));
    }
    let out = Command::new(ffmpeg)
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            &channels.to_string(),
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| ConvertError::io(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("does not contain any stream")
        {
            return Err(ConvertError::input(format!(
                "'{}' has no audio track",
                path.display()
            )));
        }
        return Err(ConvertError::input(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(ConvertError::input(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let interleaved_f32 = out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(AudioPcm {
        sample_rate,
        channels,
        interleaved_f32,
    })
}

/// Where and how a [`FrameReader`] decodes.
#[derive(Clone, Debug)]
pub struct FrameReaderOpts {
    /// Size every frame is scaled to.
    pub size: Resolution,
    pub start_sec: Option<f64>,
    pub duration_sec: Option<f64>,
    /// Resample to this rate (drops/duplicates frames).
    pub fps: Option<u32>,
}

/// Streams straight-alpha RGBA8 frames out of an `ffmpeg` child, one frame at a time.
///
/// ffmpeg applies the container rotation itself, so frames come out in display orientation.
pub struct FrameReader {
    size: Resolution,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    frames_read: u64,
}

impl FrameReader {
    pub fn spawn(ffmpeg: &Path, source: &Path, opts: &FrameReaderOpts) -> ConvertResult<Self> {
        let mut cmd = Command::new(ffmpeg);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.args(["-v", "error"]);
        if let Some(ss) = opts.start_sec.filter(|s| *s > 0.0) {
            cmd.args(["-ss", &format!("{ss:.6}")]);
        }
        if let Some(t) = opts.duration_sec {
            cmd.args(["-t", &format!("{t:.6}")]);
        }
        cmd.arg("-i").arg(source);
        cmd.args(["-an", "-vf", &frame_filter(opts)]);
        cmd.args(["-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"]);

        let mut child = cmd.spawn().map_err(|e| {
            ConvertError::io(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConvertError::io("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConvertError::io("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        Ok(Self {
            size: opts.size,
            child: Some(child),
            stdout: Some(stdout),
            stderr_drain: Some(stderr_drain),
            frames_read: 0,
        })
    }

    pub fn size(&self) -> Resolution {
        self.size
    }

    pub fn frame_len(&self) -> usize {
        self.size.pixel_count() * 4
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Fill `buf` with the next frame. Returns `false` at end of stream.
    pub fn read_frame(&mut self, buf: &mut Vec<u8>) -> ConvertResult<bool> {
        let len = self.frame_len();
        buf.resize(len, 0);
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(false);
        };

        let mut filled = 0usize;
        while filled < len {
            match stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ConvertError::io(format!(
                        "failed to read frame from ffmpeg: {e}"
                    )));
                }
            }
        }

        if filled == 0 {
            self.stdout = None;
            return Ok(false);
        }
        if filled < len {
            return Err(ConvertError::input(format!(
                "truncated frame from ffmpeg: got {filled} of {len} bytes"
            )));
        }
        self.frames_read += 1;
        Ok(true)
    }

    /// Wait for the decoder and surface its error output on failure.
    pub fn finish(mut self) -> ConvertResult<u64> {
        drop(self.stdout.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ConvertError::io("ffmpeg decoder already finished"))?;
        let status = child
            .wait()
            .map_err(|e| ConvertError::io(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = join_drain(self.stderr_drain.take())?;
        if !status.success() {
            return Err(ConvertError::input(format!(
                "ffmpeg decode exited with status {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(self.frames_read)
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

pub(crate) fn join_drain(
    handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
) -> ConvertResult<Vec<u8>> {
    match handle {
        Some(h) => h
            .join()
            .map_err(|_| ConvertError::io("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| ConvertError::io(format!("ffmpeg stderr read failed: {e}"))),
        None => Ok(Vec::new()),
    }
}

fn frame_filter(opts: &FrameReaderOpts) -> String {
    let mut chain = Vec::new();
    if let Some(fps) = opts.fps {
        chain.push(format!("fps={fps}"));
    }
    chain.push(format!(
        "scale={}:{}:flags=bilinear",
        opts.size.width, opts.size.height
    ));
    chain.join(",")
}
