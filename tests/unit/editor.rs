use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::*;
use crate::format::MediaFormat;
use crate::request::Operation;

fn asset(duration_sec: f64) -> MediaAsset {
    MediaAsset {
        path: PathBuf::from("clip.mp4"),
        duration_sec,
        video: None,
        audio: None,
    }
}

fn trim(start: f64, end: f64) -> ConversionRequest {
    ConversionRequest::new(
        "clip.mp4",
        Operation::Trim {
            range: TimeRange::new(start, end).unwrap(),
            preset: None,
        },
    )
}

/// Writes a small file for a source of `source_sec` seconds. The measured output runs 20 ms
/// past the covered range, like a real encode.
struct FileExporter {
    dir: PathBuf,
    source_sec: f64,
}

impl Exporter for FileExporter {
    fn export(
        &self,
        request: &ConversionRequest,
        cancel: &CancelToken,
    ) -> ConvertResult<ExportResult> {
        cancel.check()?;
        let path = self.dir.join(format!(
            "{}{}.mp4",
            request.operation.output_prefix(),
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, vec![0u8; 2048]).unwrap();
        let requested = request
            .operation
            .expected_duration_within(Some(self.source_sec));
        let measured = requested.unwrap_or(self.source_sec) + 0.02;
        Ok(ExportResult::new(path, MediaFormat::Mp4, Some(measured))
            .with_requested_duration(requested))
    }
}

fn file_session(dir: &std::path::Path, library: &Arc<LibraryStore>) -> EditorSession {
    let exporter = FileExporter {
        dir: dir.to_path_buf(),
        source_sec: 10.0,
    };
    EditorSession::new(Arc::new(exporter)).with_library(Arc::clone(library))
}

/// Runs until cancelled.
struct BlockingExporter {
    saw_cancel: Arc<AtomicBool>,
}

impl Exporter for BlockingExporter {
    fn export(
        &self,
        _request: &ConversionRequest,
        cancel: &CancelToken,
    ) -> ConvertResult<ExportResult> {
        while !cancel.is_cancelled() {
            std::thread::sleep(Duration::from_millis(2));
        }
        self.saw_cancel.store(true, Ordering::SeqCst);
        Err(ConvertError::Cancelled)
    }
}

fn blocking() -> (EditorSession, Arc<AtomicBool>) {
    let flag = Arc::new(AtomicBool::new(false));
    let exporter = BlockingExporter {
        saw_cancel: Arc::clone(&flag),
    };
    (EditorSession::new(Arc::new(exporter)), flag)
}

#[test]
fn idle_session_rejects_playback() {
    let (mut s, _) = blocking();
    assert_eq!(s.state(), EditorState::Idle);
    assert!(matches!(
        s.play().unwrap_err(),
        ConvertError::InvalidTransition { action: "play", state: "idle" }
    ));
    assert!(s.seek(1.0).is_err());
    assert!(s.pause().is_err());
}

#[test]
fn seek_clamps_to_duration() {
    let (mut s, _) = blocking();
    s.load(asset(10.0)).unwrap();
    s.seek(25.0).unwrap();
    assert_eq!(s.position_sec(), 10.0);
    s.seek(-3.0).unwrap();
    assert_eq!(s.position_sec(), 0.0);
    s.seek(f64::NAN).unwrap();
    assert_eq!(s.position_label(), "00:00");
}

#[test]
fn play_pause_advances_virtual_clock() {
    let (mut s, _) = blocking();
    s.load(asset(10.0)).unwrap();
    s.seek(9.99).unwrap();
    s.play().unwrap();
    assert_eq!(s.state(), EditorState::Playing);
    std::thread::sleep(Duration::from_millis(30));
    s.pause().unwrap();
    assert_eq!(s.state(), EditorState::Paused);
    assert_eq!(s.position_sec(), 10.0);
}

#[test]
fn nudges_keep_start_before_end() {
    let (mut s, _) = blocking();
    s.load(asset(1.0)).unwrap();
    assert_eq!(s.selection(), TimeRange::new(0.0, 1.0).unwrap());

    let r = s.nudge_start(-NUDGE_STEP_SEC).unwrap();
    assert_eq!(r.start_sec, 0.0);
    let r = s.nudge_start(5.0).unwrap();
    assert!(r.start_sec < r.end_sec);
    let r = s.nudge_end(-5.0).unwrap();
    assert!(r.start_sec < r.end_sec);
    let r = s.nudge_end(10.0).unwrap();
    assert_eq!(r.end_sec, 1.0);
}

#[test]
fn selection_must_fit_the_asset() {
    let (mut s, _) = blocking();
    s.load(asset(5.0)).unwrap();
    assert!(s.set_selection(TimeRange::new(1.0, 6.0).unwrap()).is_err());
    assert!(s.set_selection(TimeRange::new(2.0, 2.0).unwrap()).is_err());
    s.set_selection(TimeRange::new(1.0, 4.0).unwrap()).unwrap();
    assert_eq!(s.selection().duration_sec(), 3.0);
}

#[test]
fn seek_and_load_are_rejected_while_exporting() {
    let (mut s, _) = blocking();
    s.load(asset(10.0)).unwrap();
    s.start_export(trim(2.0, 6.0), None).unwrap();
    assert_eq!(s.state(), EditorState::Exporting);

    assert!(matches!(
        s.seek(1.0).unwrap_err(),
        ConvertError::InvalidTransition { action: "seek", state: "exporting" }
    ));
    assert!(s.play().is_err());
    assert!(s.load(asset(3.0)).is_err());
    assert!(s.start_export(trim(0.0, 1.0), None).is_err());
    assert!(s.poll_export().is_none());

    assert!(s.cancel_export());
    let err = s.wait_export().unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(s.state(), EditorState::Failed);
    assert!(!s.is_exporting());
    s.seek(1.0).unwrap();
}

#[test]
fn completed_export_is_saved_with_range_duration() {
    let dir = tempfile::tempdir().unwrap();
    let library = Arc::new(LibraryStore::in_memory());
    let mut s = file_session(dir.path(), &library);
    s.load(asset(10.0)).unwrap();
    s.start_export(trim(2.0, 6.0), Some("my clip".into())).unwrap();
    let outcome = s.wait_export().unwrap();

    assert_eq!(s.state(), EditorState::Done);
    let saved = outcome.saved.unwrap();
    assert_eq!(saved.duration, "00:04");
    assert_eq!(saved.file_name, "my clip");
    assert_eq!(saved.file_size_kb, 2);
    assert_eq!(library.fetch_saved_files(), vec![saved]);
    assert!(s.wait_export().is_err());
}

#[test]
fn saved_duration_follows_the_clamped_range() {
    let dir = tempfile::tempdir().unwrap();
    let library = Arc::new(LibraryStore::in_memory());
    let mut s = file_session(dir.path(), &library);
    s.load(asset(10.0)).unwrap();
    s.start_export(trim(5.0, 20.0), Some("tail".into())).unwrap();
    let outcome = s.wait_export().unwrap();

    assert_eq!(outcome.result.requested_sec, Some(5.0));
    assert_eq!(outcome.saved.unwrap().duration, "00:05");
}

#[test]
fn saved_duration_falls_back_to_the_measured_length() {
    let dir = tempfile::tempdir().unwrap();
    let library = Arc::new(LibraryStore::in_memory());
    let mut s = file_session(dir.path(), &library);
    let request = ConversionRequest::new("clip.mp4", Operation::ExtractAudio);
    s.start_export(request, Some("audio".into())).unwrap();
    let outcome = s.wait_export().unwrap();

    assert_eq!(outcome.result.requested_sec, None);
    assert_eq!(outcome.saved.unwrap().duration, "00:10");
}

#[test]
fn export_without_save_name_is_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let library = Arc::new(LibraryStore::in_memory());
    let mut s = file_session(dir.path(), &library);
    s.start_export(trim(0.0, 1.0), None).unwrap();
    let outcome = loop {
        if let Some(o) = s.poll_export() {
            break o.unwrap();
        }
        std::thread::sleep(Duration::from_millis(2));
    };
    assert!(outcome.saved.is_none());
    assert!(library.is_empty());
}

#[test]
fn dropping_the_session_cancels_its_export() {
    let (mut s, flag) = blocking();
    s.start_export(trim(0.0, 1.0), None).unwrap();
    drop(s);
    let deadline = Instant::now() + Duration::from_secs(5);
    while !flag.load(Ordering::SeqCst) {
        assert!(Instant::now() < deadline, "export was not cancelled");
        std::thread::sleep(Duration::from_millis(2));
    }
}
