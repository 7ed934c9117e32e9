use super::*;

#[test]
fn cancel_token_is_shared_between_clones() {
    let token = CancelToken::new();
    let other = token.clone();
    assert!(token.check().is_ok());
    other.cancel();
    assert!(token.is_cancelled());
    assert!(matches!(token.check(), Err(ConvertError::Cancelled)));
}

#[test]
fn command_args_wrap_user_args() {
    let job = ExportJob::new(
        "ffmpeg",
        os_args(["-i", "in.wav", "-c:a", "pcm_s16le"]),
        "/tmp/out.wav",
    );
    let args: Vec<String> = job
        .command_args()
        .iter()
        .map(|s| s.to_string_lossy().into_owned())
        .collect();
    assert_eq!(args[0], "-y");
    assert_eq!(&args[4..8], &["-i", "in.wav", "-c:a", "pcm_s16le"]);
    assert_eq!(args.last().unwrap(), "/tmp/out.wav");
}

#[test]
fn precancelled_job_never_spawns() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never.mp4");
    let token = CancelToken::new();
    token.cancel();
    let job = ExportJob::new("/nonexistent/ffmpeg", Vec::new(), &out);
    assert_eq!(job.run(&token), ExportStatus::Cancelled);
    assert!(!out.exists());
}

#[test]
fn missing_program_is_a_failed_export() {
    let dir = tempfile::tempdir().unwrap();
    let job = ExportJob::new("/nonexistent/ffmpeg", Vec::new(), dir.path().join("x.mp4"));
    let err = job.run_checked(&CancelToken::new()).unwrap_err();
    assert!(matches!(err, ConvertError::Export(_)));
}

#[test]
fn status_maps_onto_errors() {
    let p = PathBuf::from("o.mp4");
    assert_eq!(ExportStatus::Completed.into_result(p.clone()).unwrap(), p);
    assert!(
        ExportStatus::Cancelled
            .into_result(p.clone())
            .unwrap_err()
            .is_cancelled()
    );
    assert!(matches!(
        ExportStatus::Failed("boom".into()).into_result(p),
        Err(ConvertError::Export(_))
    ));
}

#[test]
fn namer_produces_distinct_prefixed_names() {
    let namer = OutputNamer::new("/out");
    let a = namer.next("trimmed_", MediaFormat::Mp4);
    let b = namer.next("trimmed_", MediaFormat::Mp4);
    assert_ne!(a, b);
    let name = a.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("trimmed_"));
    assert!(name.ends_with(".mp4"));
    assert_eq!(a.parent().unwrap(), Path::new("/out"));
}

#[test]
fn remove_partial_ignores_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.mp4");
    std::fs::write(&path, b"xx").unwrap();
    remove_partial(&path);
    assert!(!path.exists());
    remove_partial(&path);
}
