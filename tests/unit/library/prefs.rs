use super::*;

#[test]
fn builtins_exist_on_fresh_store() {
    let prefs = Preferences::in_memory();
    assert_eq!(prefs.playlists(), vec![HIDDEN_PLAYLIST, FAVORITES_PLAYLIST]);
    assert!(!prefs.has_launched_before());
    assert!(!prefs.is_logged_in());
}

#[test]
fn missing_builtins_are_inserted_at_the_front() {
    let mut data = PrefsData {
        saved_playlists: vec!["Road trip".into(), HIDDEN_PLAYLIST.into()],
        ..PrefsData::default()
    };
    assert!(data.ensure_builtin_playlists());
    assert_eq!(
        data.saved_playlists,
        vec![FAVORITES_PLAYLIST, "Road trip", HIDDEN_PLAYLIST]
    );
    assert!(!data.ensure_builtin_playlists());
}

#[test]
fn loads_legacy_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    std::fs::write(
        &path,
        r#"{"hasLaunchedBefore":true,"isLoggedIn":false,"SavedPlaylists":["Mix"],"playlistsMapping":{"Mix":["a","b"]}}"#,
    )
    .unwrap();
    let prefs = Preferences::open(&path).unwrap();
    assert!(prefs.has_launched_before());
    assert_eq!(
        prefs.playlists(),
        vec![HIDDEN_PLAYLIST, FAVORITES_PLAYLIST, "Mix"]
    );
    assert_eq!(prefs.file_ids("Mix").unwrap(), vec!["a", "b"]);
}

#[test]
fn adding_a_file_is_idempotent() {
    let prefs = Preferences::in_memory();
    assert!(prefs.add_file(FAVORITES_PLAYLIST, "id-1").unwrap());
    assert!(!prefs.add_file(FAVORITES_PLAYLIST, "id-1").unwrap());
    assert_eq!(prefs.file_ids(FAVORITES_PLAYLIST).unwrap(), vec!["id-1"]);
    assert!(prefs.remove_file(FAVORITES_PLAYLIST, "id-1").unwrap());
    assert!(!prefs.remove_file(FAVORITES_PLAYLIST, "id-1").unwrap());
}

#[test]
fn unknown_playlist_is_rejected() {
    let prefs = Preferences::in_memory();
    assert!(prefs.add_file("Nope", "id").is_err());
    assert!(prefs.file_ids("Nope").is_err());
    assert!(prefs.create_playlist("  ").is_err());
}

#[test]
fn changes_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("prefs.json");
    {
        let prefs = Preferences::open(&path).unwrap();
        assert!(prefs.create_playlist("Workout").unwrap());
        assert!(!prefs.create_playlist("Workout").unwrap());
        prefs.add_file("Workout", "abc").unwrap();
        prefs.mark_launched().unwrap();
        prefs.set_logged_in(true).unwrap();
    }
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"SavedPlaylists\""));
    assert!(text.contains("\"playlistsMapping\""));

    let prefs = Preferences::open(&path).unwrap();
    assert!(prefs.has_launched_before());
    assert!(prefs.is_logged_in());
    assert_eq!(prefs.file_ids("Workout").unwrap(), vec!["abc"]);
    assert_eq!(prefs.snapshot().saved_playlists.len(), 3);
}
