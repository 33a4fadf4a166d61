use hrdc_auth::{purge_session_artifacts, FileArtifactStore, SessionArtifactStore};

#[test]
fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileArtifactStore::new(dir.path().join("artifacts")).unwrap();

    assert!(store.get("sb-xyz-auth-token").unwrap().is_none());
    store.set("sb-xyz-auth-token", r#"{"access_token":"a"}"#).unwrap();

    assert_eq!(
        store.get("sb-xyz-auth-token").unwrap().as_deref(),
        Some(r#"{"access_token":"a"}"#)
    );
    assert!(dir
        .path()
        .join("artifacts")
        .join("sb-xyz-auth-token.json")
        .exists());
}

#[test]
fn test_file_store_purge_keeps_other_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileArtifactStore::new(dir.path()).unwrap();
    store.set("sb-xyz-auth-token", "{}").unwrap();
    store.set("preferences", "{}").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let removed = purge_session_artifacts(&store).unwrap();

    assert_eq!(removed, vec!["sb-xyz-auth-token"]);
    assert_eq!(store.keys().unwrap(), vec!["preferences"]);
}

#[test]
fn test_file_store_rejects_path_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileArtifactStore::new(dir.path()).unwrap();

    assert!(store.set("../escape", "x").is_err());
    assert!(store.remove("missing-key").is_ok());
}
