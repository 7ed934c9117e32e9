use super::*;

#[test]
fn blur_radius_0_is_identity() {
    let src = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
    let out = blur_rgba8_premul(&src, 1, 2, 0, 1.0).unwrap();
    assert_eq!(out, src);
}

#[test]
fn blur_constant_image_is_identity() {
    let (w, h) = (4u32, 3u32);
    let px = [10u8, 20u8, 30u8, 40u8];
    let src = px.repeat((w * h) as usize);
    let out = blur_rgba8_premul(&src, w, h, 3, 2.0).unwrap();
    assert_eq!(out, src);
}

#[test]
fn blur_spreads_energy_from_single_pixel() {
    let (w, h) = (5u32, 5u32);
    let mut src = vec![0u8; (w * h * 4) as usize];
    let center = ((2 * w + 2) * 4) as usize;
    src[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);

    let out = blur_rgba8_premul(&src, w, h, 2, 1.2).unwrap();

    let nonzero = out.chunks_exact(4).filter(|px| px[3] != 0).count();
    assert!(nonzero > 1);

    let sum_a: u32 = out.chunks_exact(4).map(|px| u32::from(px[3])).sum();
    assert!((sum_a as i32 - 255).abs() <= 4);
}

#[test]
fn blur_rejects_bad_sigma_and_sizes() {
    assert!(blur_rgba8_premul(&[0; 4], 1, 1, 2, 0.0).is_err());
    assert!(blur_rgba8_premul(&[0; 3], 1, 1, 2, 1.0).is_err());
}

fn striped(w: u32, h: u32) -> FrameRgba {
    let mut f = FrameRgba::solid(w, h, [0, 0, 0, 255]);
    for y in 0..h {
        for x in (0..w).step_by(2) {
            let i = ((y * w + x) * 4) as usize;
            f.data[i..i + 3].copy_from_slice(&[255, 255, 255]);
        }
    }
    f
}

#[test]
fn region_blur_leaves_outside_pixels_untouched() {
    let src = striped(16, 16);
    let mut frame = src.clone();
    blur_regions_in_place(&mut frame, &[Rect::new(4.0, 4.0, 8.0, 8.0)], 2, 1.5).unwrap();

    for y in 0..16 {
        for x in 0..16 {
            let inside = (4..8).contains(&x) && (4..8).contains(&y);
            if !inside {
                assert_eq!(frame.pixel(x, y), src.pixel(x, y), "({x},{y}) changed");
            }
        }
    }
    // Stripes inside the rectangle average out towards grey.
    let p = frame.pixel(5, 5);
    assert!(p[0] > 40 && p[0] < 215, "{p:?}");
    assert_eq!(p[3], 255);
}

#[test]
fn region_blur_skips_rects_outside_the_frame() {
    let src = striped(8, 8);
    let mut frame = src.clone();
    blur_regions_in_place(&mut frame, &[Rect::new(20.0, 20.0, 30.0, 30.0)], 3, 2.0).unwrap();
    assert_eq!(frame, src);
}

#[test]
fn pixel_bounds_clip_and_round_outward() {
    assert_eq!(
        pixel_bounds(Rect::new(-3.0, 1.2, 4.5, 9.0), 8, 6),
        Some((0, 1, 5, 6))
    );
    assert_eq!(pixel_bounds(Rect::new(9.0, 0.0, 12.0, 3.0), 8, 6), None);
}

#[test]
fn oversized_radius_is_rejected_without_touching_the_frame() {
    let src = striped(8, 8);
    let mut frame = src.clone();
    let region = [Rect::new(0.0, 0.0, 4.0, 4.0)];
    let err = blur_regions_in_place(&mut frame, &region, u32::MAX - 1, 6.0).unwrap_err();
    assert!(matches!(err, ConvertError::Validation(_)), "{err}");
    assert_eq!(frame, src);

    let buf = vec![0u8; 4 * 4 * 4];
    assert!(blur_rgba8_premul(&buf, 4, 4, MAX_BLUR_RADIUS + 1, 2.0).is_err());
    blur_rgba8_premul(&buf, 4, 4, MAX_BLUR_RADIUS, 2.0).unwrap();
}
