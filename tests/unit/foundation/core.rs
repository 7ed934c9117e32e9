use super::*;

#[test]
fn time_range_validates_bounds() {
    assert!(TimeRange::new(1.0, 0.5).is_err());
    assert!(TimeRange::new(-0.1, 1.0).is_err());
    assert!(TimeRange::new(0.0, f64::NAN).is_err());

    let r = TimeRange::new(2.0, 6.0).unwrap();
    assert!((r.duration_sec() - 4.0).abs() < 1e-12);
    assert!(!r.is_empty());
}

#[test]
fn empty_range_is_constructible_but_rejected_for_work() {
    let r = TimeRange::new(3.0, 3.0).unwrap();
    assert!(r.is_empty());
    assert!(r.require_non_empty().is_err());
}

#[test]
fn clamp_keeps_start_before_end() {
    let r = TimeRange::new(4.0, 20.0).unwrap().clamp_to(10.0);
    assert_eq!(r.start_sec, 4.0);
    assert_eq!(r.end_sec, 10.0);

    let r = TimeRange::new(12.0, 20.0).unwrap().clamp_to(10.0);
    assert_eq!(r.start_sec, 10.0);
    assert_eq!(r.end_sec, 10.0);
}

#[test]
fn resolution_parses_common_spellings() {
    assert_eq!(
        "1280x720".parse::<Resolution>().unwrap(),
        Resolution::new(1280, 720).unwrap()
    );
    assert_eq!(
        "480*720".parse::<Resolution>().unwrap(),
        Resolution::GIF_DEFAULT
    );
    assert!("1280".parse::<Resolution>().is_err());
    assert!("0x720".parse::<Resolution>().is_err());
    assert!("1x2x3".parse::<Resolution>().is_err());
    assert_eq!(Resolution::new(1280, 720).unwrap().to_string(), "1280x720");
}

#[test]
fn resolution_even_rounds_down() {
    let r = Resolution::new(641, 361).unwrap().even();
    assert_eq!((r.width, r.height), (640, 360));
    let r = Resolution::new(1, 1).unwrap().even();
    assert_eq!((r.width, r.height), (2, 2));
}

#[test]
fn fps_ratio_and_frame_counts() {
    let fps = Fps::parse_ratio("30000/1001").unwrap();
    assert!((fps.as_f64() - 29.97).abs() < 0.01);
    assert_eq!(Fps::parse_ratio("25"), Some(Fps { num: 25, den: 1 }));
    assert!(Fps::parse_ratio("0/0").is_none());

    let fps = Fps::whole(15).unwrap();
    assert_eq!(fps.frames_in(5.0), 75);
    assert_eq!(fps.frames_in(0.0), 0);
    assert_eq!(fps.frames_in(-1.0), 0);
}

#[test]
fn clock_formatting_uses_whole_seconds() {
    assert_eq!(format_clock(4.0), "00:04");
    assert_eq!(format_clock(3.999), "00:03");
    assert_eq!(format_clock(61.5), "01:01");
    assert_eq!(format_clock(f64::INFINITY), "00:00");
    assert_eq!(format_clock(-2.0), "00:00");
}
