use super::*;

const PORTRAIT_PHONE_CLIP: &str = r#"{
    "streams": [
        {
            "codec_type": "video",
            "width": 1920,
            "height": 1080,
            "r_frame_rate": "30/1",
            "avg_frame_rate": "30000/1001",
            "side_data_list": [{ "side_data_type": "Display Matrix", "rotation": -90 }]
        },
        { "codec_type": "audio", "sample_rate": "44100", "channels": 2 }
    ],
    "format": { "duration": "10.010000" }
}"#;

#[test]
fn parses_tracks_duration_and_rotation() {
    let asset = parse_probe_json(Path::new("clip.mov"), PORTRAIT_PHONE_CLIP.as_bytes()).unwrap();
    assert!((asset.duration_sec - 10.01).abs() < 1e-9);
    assert!(asset.has_audio());
    assert!(asset.has_video());

    let v = asset.video.as_ref().unwrap();
    assert_eq!(v.rotation, 90);
    assert_eq!(asset.natural_size().unwrap().to_string(), "1920x1080");
    assert_eq!(asset.display_size().unwrap().to_string(), "1080x1920");
    assert_eq!(asset.fps().unwrap().num, 30000);

    let a = asset.audio.as_ref().unwrap();
    assert_eq!((a.sample_rate, a.channels), (44100, 2));
}

#[test]
fn audio_only_file_has_no_display_size() {
    let json = r#"{
        "streams": [{ "codec_type": "audio", "sample_rate": "48000", "channels": 1 }],
        "format": { "duration": "3.5" }
    }"#;
    let asset = parse_probe_json(Path::new("a.m4a"), json.as_bytes()).unwrap();
    assert!(!asset.has_video());
    assert!(asset.display_size().is_none());
    assert!(matches!(
        asset.require_video(),
        Err(ConvertError::Input(_))
    ));
}

#[test]
fn cover_art_is_not_a_video_track() {
    let json = r#"{
        "streams": [
            { "codec_type": "audio", "sample_rate": "44100", "channels": 2 },
            { "codec_type": "video", "width": 600, "height": 600,
              "disposition": { "attached_pic": 1 } }
        ],
        "format": { "duration": "200.0" }
    }"#;
    let asset = parse_probe_json(Path::new("song.mp3"), json.as_bytes()).unwrap();
    assert!(!asset.has_video());
}

#[test]
fn legacy_rotate_tag_is_clockwise() {
    let json = r#"{
        "streams": [{ "codec_type": "video", "width": 640, "height": 480,
                      "tags": { "rotate": "270" } }],
        "format": {}
    }"#;
    let asset = parse_probe_json(Path::new("v.mp4"), json.as_bytes()).unwrap();
    assert_eq!(asset.video.unwrap().rotation, 270);
    assert_eq!(asset.duration_sec, 0.0);
}

#[test]
fn streamless_output_is_an_input_error() {
    let json = r#"{ "streams": [], "format": { "duration": "1.0" } }"#;
    assert!(matches!(
        parse_probe_json(Path::new("x.bin"), json.as_bytes()),
        Err(ConvertError::Input(_))
    ));
}

#[test]
fn missing_source_is_reported_before_spawning() {
    let err = probe(Path::new("ffprobe"), Path::new("/definitely/not/here.mp4")).unwrap_err();
    assert!(matches!(err, ConvertError::Input(_)));
}

#[test]
fn rotation_snaps_to_quarter_turns() {
    assert_eq!(normalize_rotation(0.0), 0);
    assert_eq!(normalize_rotation(-90.0), 270);
    assert_eq!(normalize_rotation(450.0), 90);
    assert_eq!(normalize_rotation(179.0), 180);
    assert_eq!(normalize_rotation(f64::NAN), 0);
}
