use crate::foundation::core::{FrameRgba, Rect};
use crate::foundation::error::{ConvertError, ConvertResult};

/// Largest kernel radius accepted; the window padding and tap count scale with it.
pub const MAX_BLUR_RADIUS: u32 = 256;

pub fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> ConvertResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| ConvertError::validation("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(ConvertError::validation(
            "blur_rgba8_premul expects src matching width*height*4",
        ));
    }
    check_radius(radius)?;
    if radius == 0 || expected_len == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    horizontal_pass(src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

/// Integer pixel bounds `(x0, y0, x1, y1)` of `rect` clipped to a `width`x`height` frame.
pub fn pixel_bounds(rect: Rect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let x0 = rect.x0.floor().clamp(0.0, f64::from(width)) as u32;
    let y0 = rect.y0.floor().clamp(0.0, f64::from(height)) as u32;
    let x1 = rect.x1.ceil().clamp(0.0, f64::from(width)) as u32;
    let y1 = rect.y1.ceil().clamp(0.0, f64::from(height)) as u32;
    (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
}

/// Blur `frame` inside each rectangle only; pixels outside every rectangle are untouched.
///
/// The blur samples up to `radius` pixels of context around a rectangle so its edges fade into
/// the surrounding picture instead of into a hard border.
pub fn blur_regions_in_place(
    frame: &mut FrameRgba,
    regions: &[Rect],
    radius: u32,
    sigma: f32,
) -> ConvertResult<()> {
    check_radius(radius)?;
    if radius == 0 {
        return Ok(());
    }
    let (fw, fh) = (frame.width, frame.height);
    for rect in regions {
        let Some((x0, y0, x1, y1)) = pixel_bounds(*rect, fw, fh) else {
            continue;
        };
        // Padded window with context.
        let px0 = x0.saturating_sub(radius);
        let py0 = y0.saturating_sub(radius);
        let px1 = x1.saturating_add(radius).min(fw);
        let py1 = y1.saturating_add(radius).min(fh);
        let (ww, wh) = (px1 - px0, py1 - py0);

        let mut window = Vec::with_capacity(ww as usize * wh as usize * 4);
        for y in py0..py1 {
            let start = (y as usize * fw as usize + px0 as usize) * 4;
            window.extend_from_slice(&frame.data[start..start + ww as usize * 4]);
        }
        let blurred = blur_rgba8_premul(&window, ww, wh, radius, sigma)?;

        for y in y0..y1 {
            let wy = (y - py0) as usize;
            let src = (wy * ww as usize + (x0 - px0) as usize) * 4;
            let dst = (y as usize * fw as usize + x0 as usize) * 4;
            let n = (x1 - x0) as usize * 4;
            frame.data[dst..dst + n].copy_from_slice(&blurred[src..src + n]);
        }
    }
    Ok(())
}

fn check_radius(radius: u32) -> ConvertResult<()> {
    if radius > MAX_BLUR_RADIUS {
        return Err(ConvertError::validation(format!(
            "blur radius {radius} exceeds {MAX_BLUR_RADIUS}"
        )));
    }
    Ok(())
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> ConvertResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(ConvertError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = sigma as f64;
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = i as f64;
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(ConvertError::validation("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Rounding drift goes to the centre tap so the kernel sums to exactly 1.0.
    let delta = 65536i64 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }

    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
