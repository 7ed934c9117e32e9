use super::*;
use crate::format::MediaFormat;

fn export_in(dir: &Path, name: &str, bytes: usize, format: MediaFormat) -> ExportResult {
    let path = dir.join(name);
    std::fs::write(&path, vec![7u8; bytes]).unwrap();
    ExportResult::new(path, format, Some(4.0))
}

#[test]
fn saving_twice_creates_distinct_entities() {
    let dir = tempfile::tempdir().unwrap();
    let store = LibraryStore::in_memory();
    let res = export_in(dir.path(), "trimmed_a.mp4", 4096, MediaFormat::Mp4);
    let new = NewSavedFile::from_export(&res, Some("clip"), "00:04".into()).unwrap();

    let a = store.add_saved_file(new.clone()).unwrap();
    let b = store.add_saved_file(new).unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(store.len(), 2);
    assert_eq!(a.file_size_kb, 4);
    assert_eq!(a.kind, MediaKind::Video);
    assert_eq!(a.file_name, "clip");
    assert!(a.file_url.starts_with("file://"));
    assert_eq!(a.path(), std::path::absolute(&res.path).unwrap());
}

#[test]
fn persists_camel_case_fields_and_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data").join("library.json");
    let res = export_in(dir.path(), "x.mp3", 3000, MediaFormat::Mp3);

    let saved = {
        let store = LibraryStore::open(&db).unwrap();
        assert!(store.is_empty());
        store
            .add_saved_file(NewSavedFile::from_export(&res, None, "00:01".into()).unwrap())
            .unwrap()
    };

    let text = std::fs::read_to_string(&db).unwrap();
    for key in ["\"fileURL\"", "\"fileName\"", "\"type\"", "\"fileSizeKB\"", "\"duration\""] {
        assert!(text.contains(key), "missing {key} in {text}");
    }
    assert!(text.contains("\"Audio\""));
    assert!(!text.contains("imageData"));

    let reopened = LibraryStore::open(&db).unwrap();
    assert_eq!(reopened.fetch_saved_files(), vec![saved.clone()]);
    assert_eq!(reopened.get(saved.id).unwrap().file_name, "x.mp3");
}

#[test]
fn image_exports_carry_bytes_and_extension() {
    let dir = tempfile::tempdir().unwrap();
    let res = export_in(dir.path(), "converted_a.png", 10, MediaFormat::Png);
    let new = NewSavedFile::from_export(&res, Some("  pic "), "00:00".into()).unwrap();
    assert_eq!(new.file_name, "pic");
    assert_eq!(new.image_data.as_deref(), Some(&[7u8; 10][..]));
    assert_eq!(new.image_file_extension.as_deref(), Some("png"));
}

#[test]
fn delete_removes_only_the_target() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("library.json");
    let store = LibraryStore::open(&db).unwrap();
    let res = export_in(dir.path(), "a.wav", 1, MediaFormat::Wav);
    let a = store
        .add_saved_file(NewSavedFile::from_export(&res, None, "00:00".into()).unwrap())
        .unwrap();
    let b = store
        .add_saved_file(NewSavedFile::from_export(&res, None, "00:00".into()).unwrap())
        .unwrap();

    assert!(store.delete_saved_file(a.id).unwrap());
    assert!(!store.delete_saved_file(a.id).unwrap());
    assert_eq!(store.fetch_saved_files(), vec![b.clone()]);
    assert_eq!(
        LibraryStore::open(&db).unwrap().fetch_saved_files(),
        vec![b]
    );
}

#[test]
fn missing_output_cannot_be_saved() {
    let store = LibraryStore::in_memory();
    let new = NewSavedFile {
        path: PathBuf::from("/definitely/not/here.mp4"),
        file_name: "x".into(),
        kind: MediaKind::Video,
        duration: "00:00".into(),
        image_data: None,
        image_file_extension: None,
    };
    assert!(matches!(
        store.add_saved_file(new).unwrap_err(),
        ConvertError::Io(_)
    ));
    assert!(store.is_empty());
}

#[test]
fn corrupt_library_is_a_serde_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("library.json");
    std::fs::write(&db, "{not json").unwrap();
    assert!(matches!(
        LibraryStore::open(&db).unwrap_err(),
        ConvertError::Serde(_)
    ));
}

#[test]
fn file_urls_escape_reserved_path_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let res = export_in(dir.path(), "my clip #2.mp4", 10, MediaFormat::Mp4);
    let store = LibraryStore::in_memory();
    let saved = store
        .add_saved_file(NewSavedFile::from_export(&res, None, "00:04".into()).unwrap())
        .unwrap();

    assert!(
        saved.file_url.ends_with("/my%20clip%20%232.mp4"),
        "{}",
        saved.file_url
    );
    assert!(!saved.file_url.contains(' '));
    assert_eq!(saved.path(), std::path::absolute(&res.path).unwrap());
}
