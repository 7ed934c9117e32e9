use std::{fmt, str::FromStr};

use crate::foundation::error::{ConvertError, ConvertResult};

pub use kurbo::{Point, Rect, Size, Vec2};

/// Half-open time range `[start, end)` in seconds of source time.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    pub start_sec: f64,
    pub end_sec: f64,
}

impl TimeRange {
    /// Create a validated range with `0 <= start <= end`.
    ///
    /// Empty ranges (`start == end`) are representable; operations that need media reject them
    /// through [`TimeRange::require_non_empty`].
    pub fn new(start_sec: f64, end_sec: f64) -> ConvertResult<Self> {
        if !start_sec.is_finite() || !end_sec.is_finite() {
            return Err(ConvertError::validation("time range bounds must be finite"));
        }
        if start_sec < 0.0 {
            return Err(ConvertError::validation("time range start must be >= 0"));
        }
        if start_sec > end_sec {
            return Err(ConvertError::validation("time range start must be <= end"));
        }
        Ok(Self { start_sec, end_sec })
    }

    /// The whole of a clip of `duration_sec` seconds.
    pub fn whole(duration_sec: f64) -> Self {
        Self {
            start_sec: 0.0,
            end_sec: duration_sec.max(0.0),
        }
    }

    pub fn duration_sec(self) -> f64 {
        (self.end_sec - self.start_sec).max(0.0)
    }

    pub fn is_empty(self) -> bool {
        self.duration_sec() <= 0.0
    }

    pub fn require_non_empty(self) -> ConvertResult<Self> {
        if self.is_empty() {
            return Err(ConvertError::validation(format!(
                "time range [{:.3}, {:.3}] is empty",
                self.start_sec, self.end_sec
            )));
        }
        Ok(self)
    }

    /// Clamp both bounds into `[0, duration_sec]`.
    pub fn clamp_to(self, duration_sec: f64) -> Self {
        let max = duration_sec.max(0.0);
        let start_sec = self.start_sec.clamp(0.0, max);
        Self {
            start_sec,
            end_sec: self.end_sec.clamp(start_sec, max),
        }
    }
}

/// Frame size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Fallback used by the GIF editor when nothing else is known.
    pub const GIF_DEFAULT: Resolution = Resolution {
        width: 480,
        height: 720,
    };

    /// Canvas used when rendering audio into a video.
    pub const PORTRAIT_1080: Resolution = Resolution {
        width: 1080,
        height: 1920,
    };

    pub fn new(width: u32, height: u32) -> ConvertResult<Self> {
        if width == 0 || height == 0 {
            return Err(ConvertError::validation(
                "resolution width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    pub fn size(self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// Round both sides down to even numbers (yuv420p needs even dimensions).
    pub fn even(self) -> Self {
        Self {
            width: (self.width & !1).max(2),
            height: (self.height & !1).max(2),
        }
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = ConvertError;

    /// Accepts `1280x720`, `1280X720` and `1280*720`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(['x', 'X', '*']);
        let (Some(w), Some(h), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ConvertError::validation(format!(
                "resolution '{s}' must look like WIDTHxHEIGHT"
            )));
        };
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| ConvertError::validation(format!("resolution width '{w}': {e}")))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| ConvertError::validation(format!("resolution height '{h}': {e}")))?;
        Self::new(width, height)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32,
}

impl Fps {
    pub fn new(num: u32, den: u32) -> ConvertResult<Self> {
        if num == 0 || den == 0 {
            return Err(ConvertError::validation("fps num/den must be non-zero"));
        }
        Ok(Self { num, den })
    }

    pub fn whole(fps: u32) -> ConvertResult<Self> {
        Self::new(fps, 1)
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_sec(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Number of whole frames that fit in `seconds`.
    pub fn frames_in(self, seconds: f64) -> u64 {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        (seconds * self.as_f64()).floor() as u64
    }

    /// Parse ffprobe's `30000/1001` style ratios.
    pub fn parse_ratio(s: &str) -> Option<Self> {
        let mut parts = s.split('/');
        let num = parts.next()?.trim().parse::<u32>().ok()?;
        let den = match parts.next() {
            Some(d) => d.trim().parse::<u32>().ok()?,
            None => 1,
        };
        Self::new(num, den).ok()
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// One video frame as premultiplied RGBA8, row-major, no padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgba {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> ConvertResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| ConvertError::validation("frame size overflow"))?;
        if data.len() != expected {
            return Err(ConvertError::validation(format!(
                "frame data is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Opaque frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            data: rgba.repeat(width as usize * height as usize),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}

/// Format seconds as `mm:ss` from whole seconds. Non-finite or negative input renders `00:00`.
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00".to_string();
    }
    let total = seconds as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
