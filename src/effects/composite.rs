use crate::assets::decode::PreparedImage;
use crate::foundation::core::{FrameRgba, Rect, Size, Vec2};
use crate::foundation::error::{ConvertError, ConvertResult};
use crate::foundation::math::mul_div255_u8;

pub type PremulRgba8 = [u8; 4];

pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Rectangle of `size` centred at `frame_center + offset`.
pub fn centered_rect(frame: Size, offset: Vec2, size: Size) -> Rect {
    let center = frame.to_rect().center() + offset;
    Rect::from_center_size(center, size)
}

/// Largest rectangle with `content`'s aspect ratio that fits in `bounds`, centred.
pub fn fit_rect(content: Size, bounds: Rect) -> Rect {
    if content.width <= 0.0 || content.height <= 0.0 {
        return bounds;
    }
    let scale = (bounds.width() / content.width).min(bounds.height() / content.height);
    Rect::from_center_size(bounds.center(), content * scale)
}

/// Bilinearly scale `img` into `dst` (frame pixel coordinates) and composite it over `frame`.
///
/// Parts of `dst` outside the frame are clipped. Returns `false` when nothing was visible.
pub fn draw_image_scaled(
    frame: &mut FrameRgba,
    img: &PreparedImage,
    dst: Rect,
    opacity: f32,
) -> ConvertResult<bool> {
    if img.width == 0 || img.height == 0 {
        return Err(ConvertError::validation("overlay image is empty"));
    }
    if dst.width() <= 0.0 || dst.height() <= 0.0 {
        return Ok(false);
    }
    let frame_rect = Rect::new(0.0, 0.0, f64::from(frame.width), f64::from(frame.height));
    let visible = dst.intersect(frame_rect);
    if visible.width() <= 0.0 || visible.height() <= 0.0 {
        return Ok(false);
    }

    let sx = f64::from(img.width) / dst.width();
    let sy = f64::from(img.height) / dst.height();
    let x_start = visible.x0.floor() as u32;
    let x_end = (visible.x1.ceil() as u32).min(frame.width);
    let y_start = visible.y0.floor() as u32;
    let y_end = (visible.y1.ceil() as u32).min(frame.height);

    for y in y_start..y_end {
        let cy = f64::from(y) + 0.5;
        if cy < dst.y0 || cy >= dst.y1 {
            continue;
        }
        let v = (cy - dst.y0) * sy - 0.5;
        for x in x_start..x_end {
            let cx = f64::from(x) + 0.5;
            if cx < dst.x0 || cx >= dst.x1 {
                continue;
            }
            let u = (cx - dst.x0) * sx - 0.5;
            let src = sample_bilinear(img, u, v);
            let i = (y as usize * frame.width as usize + x as usize) * 4;
            let d = [
                frame.data[i],
                frame.data[i + 1],
                frame.data[i + 2],
                frame.data[i + 3],
            ];
            frame.data[i..i + 4].copy_from_slice(&over(d, src, opacity));
        }
    }
    Ok(true)
}

fn sample_bilinear(img: &PreparedImage, u: f64, v: f64) -> PremulRgba8 {
    let max_x = f64::from(img.width - 1);
    let max_y = f64::from(img.height - 1);
    let u = u.clamp(0.0, max_x);
    let v = v.clamp(0.0, max_y);
    let (x0, y0) = (u.floor() as u32, v.floor() as u32);
    let x1 = (x0 + 1).min(img.width - 1);
    let y1 = (y0 + 1).min(img.height - 1);
    let (fx, fy) = (u - f64::from(x0), v - f64::from(y0));

    let px = |x: u32, y: u32| {
        let i = (y as usize * img.width as usize + x as usize) * 4;
        &img.rgba8_premul[i..i + 4]
    };
    let (p00, p10, p01, p11) = (px(x0, y0), px(x1, y0), px(x0, y1), px(x1, y1));
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = f64::from(p00[c]) * (1.0 - fx) + f64::from(p10[c]) * fx;
        let bottom = f64::from(p01[c]) * (1.0 - fx) + f64::from(p11[c]) * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}
