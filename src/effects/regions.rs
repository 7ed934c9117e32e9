//! Watermark-region planning for blur exports.
//!
//! Planning is a pure function of the candidate rectangles and the display extent, so the same
//! inputs always give the same plan and re-planning a plan's own output changes nothing.

use crate::foundation::core::{Rect, Size};
use crate::foundation::error::{ConvertError, ConvertResult};

/// Fraction of the display width covered by one corner region.
pub const REGION_WIDTH_FRACTION: f64 = 0.25;
/// Fraction of the display height covered by one corner region.
pub const REGION_HEIGHT_FRACTION: f64 = 0.10;
/// Inset from the display edges, as a fraction of the shorter side.
pub const MARGIN_FRACTION: f64 = 0.03;

pub const MAX_CORNER_REGIONS: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No overlap with the video extent at all.
    OutsideExtent,
    /// Zero width or height.
    Degenerate,
    /// Intersects the already-included rectangle at this index.
    Overlaps(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkippedRegion {
    pub rect: Rect,
    pub reason: SkipReason,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegionPlan {
    pub extent: Rect,
    /// Rectangles to blur, clipped to `extent`, pairwise non-overlapping.
    pub included: Vec<Rect>,
    pub skipped: Vec<SkippedRegion>,
}

impl RegionPlan {
    /// Check candidates in order against `extent` and the rectangles already included.
    pub fn from_rects(candidates: &[Rect], extent: Rect) -> Self {
        let mut included: Vec<Rect> = Vec::with_capacity(candidates.len());
        let mut skipped = Vec::new();

        for &raw in candidates {
            let rect = raw.abs();
            if rect.width() <= 0.0 || rect.height() <= 0.0 {
                skipped.push(SkippedRegion {
                    rect: raw,
                    reason: SkipReason::Degenerate,
                });
                continue;
            }
            let clipped = rect.intersect(extent);
            if clipped.width() <= 0.0 || clipped.height() <= 0.0 {
                skipped.push(SkippedRegion {
                    rect: raw,
                    reason: SkipReason::OutsideExtent,
                });
                continue;
            }
            if let Some(idx) = included.iter().position(|r| overlaps(*r, clipped)) {
                skipped.push(SkippedRegion {
                    rect: raw,
                    reason: SkipReason::Overlaps(idx),
                });
                continue;
            }
            included.push(clipped);
        }

        Self {
            extent,
            included,
            skipped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }

    /// An empty plan means there is nothing to erase, which is an input problem.
    pub fn require_non_empty(self) -> ConvertResult<Self> {
        if self.is_empty() {
            return Err(ConvertError::input(format!(
                "nothing to erase: all {} region(s) fall outside the video or overlap",
                self.skipped.len()
            )));
        }
        Ok(self)
    }
}

fn overlaps(a: Rect, b: Rect) -> bool {
    let i = a.intersect(b);
    i.width() > 0.0 && i.height() > 0.0
}

/// Corner rectangles for `count` watermarks, in order top-left, top-right, bottom-left.
pub fn corner_candidates(display: Size, count: u8) -> ConvertResult<Vec<Rect>> {
    if !(1..=MAX_CORNER_REGIONS).contains(&count) {
        return Err(ConvertError::validation(format!(
            "watermark count must be between 1 and {MAX_CORNER_REGIONS}, got {count}"
        )));
    }
    if display.width <= 0.0 || display.height <= 0.0 {
        return Err(ConvertError::input("video has no display size"));
    }

    let margin = display.width.min(display.height) * MARGIN_FRACTION;
    let w = display.width * REGION_WIDTH_FRACTION;
    let h = display.height * REGION_HEIGHT_FRACTION;
    let left = margin;
    let right = display.width - margin - w;
    let top = margin;
    let bottom = display.height - margin - h;

    let corners = [
        Rect::new(left, top, left + w, top + h),
        Rect::new(right, top, right + w, top + h),
        Rect::new(left, bottom, left + w, bottom + h),
    ];
    Ok(corners[..usize::from(count)].to_vec())
}

/// Plan `count` corner regions for a video of `display` size.
pub fn plan_corner_regions(display: Size, count: u8) -> ConvertResult<RegionPlan> {
    let candidates = corner_candidates(display, count)?;
    Ok(RegionPlan::from_rects(&candidates, display.to_rect()))
}

#[cfg(test)]
#[path = "../../tests/unit/effects/regions.rs"]
mod tests;
