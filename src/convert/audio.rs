//! Audio conversion, effects, WAV export, audio extraction and audio-to-video.

use std::ffi::OsString;
use std::path::Path;

use crate::encode::session::os_args;
use crate::format::MediaFormat;
use crate::foundation::core::Resolution;
use crate::foundation::error::{ConvertError, ConvertResult};
use crate::request::AudioEffect;

/// PCM layout of WAV exports.
pub const WAV_SAMPLE_RATE: u32 = 44_100;
pub const WAV_CHANNELS: u16 = 2;

/// Frame rate of the black video track rendered under an audio file.
pub const AUDIO_VIDEO_FPS: u32 = 30;

fn input(src: &Path) -> Vec<OsString> {
    let mut v = os_args(["-i"]);
    v.push(src.as_os_str().to_os_string());
    v
}

fn wav_codec() -> Vec<OsString> {
    os_args([
        "-c:a",
        "pcm_s16le",
        "-ar",
        &WAV_SAMPLE_RATE.to_string(),
        "-ac",
        &WAV_CHANNELS.to_string(),
    ])
}

/// Encoder arguments for a direct ffmpeg write of `format`.
///
/// MP3 is not handled here; it goes through a WAV and the PCM chunk encoder.
fn audio_codec(format: MediaFormat) -> ConvertResult<Vec<OsString>> {
    let codec: &[&str] = match format {
        MediaFormat::Wav => return Ok(wav_codec()),
        MediaFormat::M4a => &["-c:a", "aac", "-b:a", "192k"],
        MediaFormat::Aac => &["-c:a", "aac", "-b:a", "192k", "-f", "adts"],
        MediaFormat::Flac => &["-c:a", "flac"],
        MediaFormat::Aiff => &["-c:a", "pcm_s16be", "-f", "aiff"],
        MediaFormat::Opus => &["-c:a", "libopus", "-b:a", "128k"],
        MediaFormat::Mp3 => {
            return Err(ConvertError::validation(
                "mp3 is encoded through the WAV chunk loop, not a direct ffmpeg job",
            ));
        }
        other => {
            return Err(ConvertError::validation(format!(
                "'{other}' is not an audio format"
            )));
        }
    };
    Ok(os_args(codec))
}

/// 16-bit little-endian stereo PCM at 44.1 kHz.
pub fn wav_args(src: &Path) -> Vec<OsString> {
    let mut v = input(src);
    v.push("-vn".into());
    v.extend(wav_codec());
    v
}

/// Arguments for a direct ffmpeg conversion into `format`.
pub fn convert_audio_args(src: &Path, format: MediaFormat) -> ConvertResult<Vec<OsString>> {
    let codec = audio_codec(format)?;
    let mut v = input(src);
    v.push("-vn".into());
    v.extend(codec);
    Ok(v)
}

/// ffmpeg `-af` chain for `effect`.
pub fn effect_filter(effect: AudioEffect) -> &'static str {
    match effect {
        AudioEffect::Reverb => "aecho=0.8:0.88:40|70|110:0.45|0.35|0.25",
        AudioEffect::Echo => "aecho=0.8:0.9:500:0.4",
        AudioEffect::Bass => "bass=g=10:f=100",
        AudioEffect::Cut => "bass=g=-20:f=100",
    }
}

/// Render `effect` into the first audio stream and encode it as `format`.
///
/// Pass [`MediaFormat::Wav`] to produce the intermediate for an MP3 export.
pub fn effect_args(
    src: &Path,
    effect: AudioEffect,
    format: MediaFormat,
) -> ConvertResult<Vec<OsString>> {
    let codec = audio_codec(format)?;
    let mut v = input(src);
    v.extend(os_args(["-map", "0:a:0", "-vn", "-af", effect_filter(effect)]));
    v.extend(codec);
    Ok(v)
}

/// First audio stream copied into an AAC `.m4a`.
pub fn extract_audio_args(src: &Path) -> Vec<OsString> {
    let mut v = input(src);
    v.extend(os_args(["-map", "0:a:0", "-vn", "-c:a", "aac", "-b:a", "192k"]));
    v
}

/// Black portrait video for the length of the audio, with the audio muxed in.
pub fn audio_to_video_args(src: &Path, format: MediaFormat) -> ConvertResult<Vec<OsString>> {
    if !format.is_video() {
        return Err(ConvertError::validation(format!(
            "'{format}' is not a video container"
        )));
    }
    let canvas = Resolution::PORTRAIT_1080;
    let mut v = os_args([
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        format!("color=c=black:s={canvas}:r={AUDIO_VIDEO_FPS}"),
    ]);
    v.extend(input(src));
    v.extend(os_args([
        "-map",
        "0:v:0",
        "-map",
        "1:a:0",
        "-c:v",
        "libx264",
        "-tune",
        "stillimage",
        "-pix_fmt",
        "yuv420p",
        "-c:a",
        "aac",
        "-b:a",
        "192k",
        "-shortest",
    ]));
    Ok(v)
}

#[cfg(test)]
#[path = "../../tests/unit/convert/audio.rs"]
mod tests;
