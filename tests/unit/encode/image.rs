use super::*;

fn checker(w: u32, h: u32) -> DynamicImage {
    let img = image::RgbaImage::from_fn(w, h, |x, y| {
        if (x + y) % 2 == 0 {
            image::Rgba([255, 0, 0, 255])
        } else {
            image::Rgba([0, 0, 255, 128])
        }
    });
    DynamicImage::ImageRgba8(img)
}

#[test]
fn lossless_formats_decode_back_to_same_size() {
    let img = checker(6, 4);
    for (fmt, guess) in [
        (MediaFormat::Png, ImageFormat::Png),
        (MediaFormat::Webp, ImageFormat::WebP),
        (MediaFormat::Gif, ImageFormat::Gif),
        (MediaFormat::Jpg, ImageFormat::Jpeg),
    ] {
        let bytes = encode_still(&img, fmt).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), guess, "{fmt}");
        let back = image::load_from_memory(&bytes).unwrap();
        assert_eq!((back.width(), back.height()), (6, 4), "{fmt}");
    }
}

#[test]
fn webp_output_is_lossless() {
    let img = checker(3, 3);
    let bytes = encode_still(&img, MediaFormat::Webp).unwrap();
    let back = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(back.as_raw(), img.to_rgba8().as_raw());
}

#[test]
fn pdf_embeds_a_jpeg_page() {
    let bytes = encode_still(&checker(8, 8), MediaFormat::Pdf).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(bytes.windows(2).any(|w| w == [0xFF, 0xD8]));
}

#[test]
fn heic_and_non_image_targets_fail_distinctly() {
    let img = checker(2, 2);
    assert!(matches!(
        encode_still(&img, MediaFormat::Heic),
        Err(ConvertError::Unsupported(_))
    ));
    assert!(matches!(
        encode_still(&img, MediaFormat::Mp3),
        Err(ConvertError::Validation(_))
    ));
}

#[test]
fn convert_file_resizes_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in.png");
    checker(10, 20).save(&src).unwrap();
    let out = dir.path().join("nested/out.jpg");

    let size = convert_image_file(
        &src,
        &out,
        MediaFormat::Jpg,
        Some(Resolution::new(4, 6).unwrap()),
    )
    .unwrap();
    assert_eq!(size, Resolution::new(4, 6).unwrap());
    let back = image::open(&out).unwrap();
    assert_eq!((back.width(), back.height()), (4, 6));
}

#[test]
fn undecodable_source_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in.png");
    std::fs::write(&src, b"nope").unwrap();
    assert!(matches!(
        convert_image_file(&src, &dir.path().join("o.png"), MediaFormat::Png, None),
        Err(ConvertError::Input(_))
    ));
}

fn corners(w: u32, h: u32) -> DynamicImage {
    // Distinct colour per corner: red top-left, green top-right, blue bottom-left.
    let img = image::RgbaImage::from_fn(w, h, |x, y| match (x, y) {
        (0, 0) => image::Rgba([255, 0, 0, 255]),
        (x, 0) if x == w - 1 => image::Rgba([0, 255, 0, 255]),
        (0, y) if y == h - 1 => image::Rgba([0, 0, 255, 255]),
        _ => image::Rgba([0, 0, 0, 255]),
    });
    DynamicImage::ImageRgba8(img)
}

fn edits(mirror: bool, flip: bool, crop_square: bool) -> ImageEdits {
    ImageEdits {
        mirror,
        flip,
        crop_square,
    }
}

#[test]
fn mirror_swaps_left_and_right() {
    let out = apply_edits(corners(4, 3), edits(true, false, false)).to_rgba8();
    assert_eq!(out.get_pixel(3, 0).0, [255, 0, 0, 255]);
    assert_eq!(out.get_pixel(0, 0).0, [0, 255, 0, 255]);
    assert_eq!((out.width(), out.height()), (4, 3));
}

#[test]
fn flip_turns_upside_down() {
    let out = apply_edits(corners(4, 3), edits(false, true, false)).to_rgba8();
    assert_eq!(out.get_pixel(0, 2).0, [255, 0, 0, 255]);
    assert_eq!(out.get_pixel(0, 0).0, [0, 0, 255, 255]);
}

#[test]
fn crop_keeps_the_centred_square() {
    let wide = apply_edits(checker(10, 4), edits(false, false, true));
    assert_eq!((wide.width(), wide.height()), (4, 4));
    // Offset 3 is odd, so the checker phase flips relative to the source origin.
    assert_eq!(wide.to_rgba8().get_pixel(0, 0).0, [0, 0, 255, 128]);

    let tall = apply_edits(checker(3, 9), edits(true, true, true));
    assert_eq!((tall.width(), tall.height()), (3, 3));
}

#[test]
fn edit_file_writes_the_edited_image() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in.png");
    corners(6, 2).save(&src).unwrap();
    let out = dir.path().join("edited.png");

    let size = edit_image_file(&src, &out, MediaFormat::Png, edits(true, false, true)).unwrap();
    assert_eq!(size, Resolution::new(2, 2).unwrap());
    let back = image::open(&out).unwrap();
    assert_eq!((back.width(), back.height()), (2, 2));
}
