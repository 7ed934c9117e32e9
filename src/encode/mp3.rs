//! WAV to MP3 through a chunked PCM loop.
//!
//! The WAV is parsed with `hound`, read in blocks of [`PCM_CHUNK_FRAMES`] interleaved frames and
//! handed to a [`PcmEncoder`]. The encoder is flushed exactly once, after the last block.

use std::io::{BufReader, Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::assets::decode::join_drain;
use crate::encode::ffmpeg::ensure_parent_dir;
use crate::encode::session::{CancelToken, remove_partial};
use crate::foundation::error::{ConvertError, ConvertResult};

/// Frames (samples per channel) handed to the encoder per call.
pub const PCM_CHUNK_FRAMES: usize = 8192;

/// Encoder context fed with interleaved 16-bit PCM.
pub trait PcmEncoder {
    fn encode_interleaved(&mut self, samples: &[i16]) -> ConvertResult<()>;
    /// Finish the stream. Called once, after the last `encode_interleaved`.
    fn flush(&mut self) -> ConvertResult<()>;
}

/// LAME via the system `ffmpeg` (`libmp3lame`, VBR).
pub struct FfmpegMp3Encoder {
    out_path: PathBuf,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    bytes: Vec<u8>,
}

impl FfmpegMp3Encoder {
    pub fn spawn(
        ffmpeg: &Path,
        out_path: &Path,
        sample_rate: u32,
        channels: u16,
        vbr_quality: u8,
    ) -> ConvertResult<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(ConvertError::validation(
                "mp3 encoder needs non-zero sample_rate/channels",
            ));
        }
        ensure_parent_dir(out_path)?;
        let mut child = Command::new(ffmpeg)
            .args(["-y", "-hide_banner", "-loglevel", "error", "-f", "s16le"])
            .args(["-ar", &sample_rate.to_string()])
            .args(["-ac", &channels.to_string()])
            .args(["-i", "pipe:0", "-c:a", "libmp3lame", "-q:a"])
            .arg(vbr_quality.min(9).to_string())
            .arg(out_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ConvertError::export(format!("failed to spawn ffmpeg for mp3: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ConvertError::io("failed to open ffmpeg stdin (unexpected)"))?;
        let stderr_drain = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut bytes = Vec::new();
                stderr.read_to_end(&mut bytes)?;
                Ok(bytes)
            })
        });
        Ok(Self {
            out_path: out_path.to_path_buf(),
            child: Some(child),
            stdin: Some(stdin),
            stderr_drain,
            bytes: Vec::with_capacity(PCM_CHUNK_FRAMES * usize::from(channels) * 2),
        })
    }
}

impl PcmEncoder for FfmpegMp3Encoder {
    fn encode_interleaved(&mut self, samples: &[i16]) -> ConvertResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ConvertError::export("mp3 encoder already flushed"));
        };
        self.bytes.clear();
        for s in samples {
            self.bytes.extend_from_slice(&s.to_le_bytes());
        }
        stdin
            .write_all(&self.bytes)
            .map_err(|e| ConvertError::export(format!("failed to write pcm to ffmpeg: {e}")))
    }

    fn flush(&mut self) -> ConvertResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ConvertError::export("mp3 encoder already flushed"))?;
        let status = child
            .wait()
            .map_err(|e| ConvertError::io(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = join_drain(self.stderr_drain.take())?;
        if !status.success() {
            remove_partial(&self.out_path);
            return Err(ConvertError::export(format!(
                "ffmpeg mp3 encode exited with status {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegMp3Encoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            remove_partial(&self.out_path);
        }
    }
}

/// Header facts needed to set up an encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub frames: u32,
}

pub fn read_wav_info(path: &Path) -> ConvertResult<WavInfo> {
    let reader = open_wav(path)?;
    let spec = reader.spec();
    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        frames: reader.duration(),
    })
}

fn open_wav(path: &Path) -> ConvertResult<hound::WavReader<BufReader<std::fs::File>>> {
    hound::WavReader::open(path)
        .map_err(|e| ConvertError::input(format!("cannot read WAV '{}': {e}", path.display())))
}

/// Feed every sample of `wav_path` into `encoder` in fixed-size chunks, then flush once.
///
/// Returns the number of frames encoded.
pub fn encode_wav(
    wav_path: &Path,
    encoder: &mut dyn PcmEncoder,
    cancel: &CancelToken,
) -> ConvertResult<u64> {
    let mut reader = open_wav(wav_path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));
    let chunk_len = PCM_CHUNK_FRAMES * channels;
    let mut chunk: Vec<i16> = Vec::with_capacity(chunk_len);
    let mut samples_total: u64 = 0;

    let mut feed = |s: i16, chunk: &mut Vec<i16>| -> ConvertResult<()> {
        chunk.push(s);
        if chunk.len() == chunk_len {
            cancel.check()?;
            encoder.encode_interleaved(chunk)?;
            chunk.clear();
        }
        Ok(())
    };

    match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => {
            for s in reader.samples::<i16>() {
                feed(s.map_err(wav_read_err)?, &mut chunk)?;
                samples_total += 1;
            }
        }
        (hound::SampleFormat::Int, bits) if bits <= 32 => {
            for s in reader.samples::<i32>() {
                feed(int_to_i16(s.map_err(wav_read_err)?, bits), &mut chunk)?;
                samples_total += 1;
            }
        }
        (hound::SampleFormat::Float, _) => {
            for s in reader.samples::<f32>() {
                feed(f32_to_i16(s.map_err(wav_read_err)?), &mut chunk)?;
                samples_total += 1;
            }
        }
        (_, bits) => {
            return Err(ConvertError::unsupported(format!(
                "{bits}-bit WAV samples"
            )));
        }
    }

    cancel.check()?;
    if !chunk.is_empty() {
        encoder.encode_interleaved(&chunk)?;
    }
    encoder.flush()?;
    Ok(samples_total / channels as u64)
}

/// Encode a WAV file into `out_path` as VBR MP3.
#[tracing::instrument(level = "info", skip(ffmpeg, cancel))]
pub fn wav_to_mp3(
    ffmpeg: &Path,
    wav_path: &Path,
    out_path: &Path,
    vbr_quality: u8,
    cancel: &CancelToken,
) -> ConvertResult<u64> {
    let info = read_wav_info(wav_path)?;
    let mut encoder =
        FfmpegMp3Encoder::spawn(ffmpeg, out_path, info.sample_rate, info.channels, vbr_quality)?;
    let frames = encode_wav(wav_path, &mut encoder, cancel)?;
    tracing::debug!(frames, "mp3 encoded");
    Ok(frames)
}

fn wav_read_err(e: hound::Error) -> ConvertError {
    ConvertError::input(format!("WAV sample read failed: {e}"))
}

fn int_to_i16(s: i32, bits: u16) -> i16 {
    if bits > 16 {
        (s >> (bits - 16)) as i16
    } else {
        (s << (16 - bits)) as i16
    }
}

fn f32_to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}

#[cfg(test)]
#[path = "../../tests/unit/encode/mp3.rs"]
mod tests;
