//! Integration test for session persistence across process restarts

use gradewise_core::session::{TOKEN_KEY, USER_KEY};
use gradewise_core::{Error, FileStore, KeyValueStore, Role, SessionStore, UserProfile};
use tempfile::TempDir;

/// Helper to create a session store on a fresh file
fn create_test_store() -> (SessionStore<FileStore>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("nested").join("session.json");
    (SessionStore::new(FileStore::new(path)), temp_dir)
}

/// Reopen the same file as a new process would
fn reopen(store: &SessionStore<FileStore>) -> SessionStore<FileStore> {
    let mut reopened = SessionStore::new(FileStore::new(store.storage().path()));
    reopened.restore_session();
    reopened
}

fn profile(role: Role) -> UserProfile {
    UserProfile {
        id: uuid::Uuid::new_v4().to_string(),
        auth_user_id: format!("auth-{}", uuid::Uuid::new_v4()),
        full_name: "Jamie Rivera".to_string(),
        email: "jamie@school.test".to_string(),
        role,
        metadata: serde_json::json!({"homeroom": "4B"}),
    }
}

#[test]
fn test_session_survives_restart() {
    let (mut store, _temp_dir) = create_test_store();
    let user = profile(Role::Teacher);

    store
        .set_session("tok-1", user.auth_user_id.clone(), user.clone())
        .expect("Failed to set session");

    let restored = reopen(&store);
    assert!(restored.is_authenticated());
    assert_eq!(restored.token(), Some("tok-1"));
    assert_eq!(restored.user(), Some(&user));
    assert_eq!(restored.session().auth_user_id(), Some(user.auth_user_id.as_str()));
    assert!(restored.require_role(Role::Teacher).is_ok());
}

#[test]
fn test_logout_survives_restart() {
    let (mut store, _temp_dir) = create_test_store();
    let user = profile(Role::Student);
    store
        .set_session("tok-1", user.auth_user_id.clone(), user)
        .unwrap();

    store.clear_session().unwrap();
    assert!(!store.storage().path().exists());

    let restored = reopen(&store);
    assert!(!restored.is_authenticated());
    assert!(matches!(restored.require_user(), Err(Error::NotAuthenticated)));
}

#[test]
fn test_profile_edit_survives_restart() {
    let (mut store, _temp_dir) = create_test_store();
    let mut user = profile(Role::Student);
    store
        .set_session("tok-1", user.auth_user_id.clone(), user.clone())
        .unwrap();

    user.full_name = "Jamie R. Rivera".to_string();
    store.set_user(user).unwrap();

    let restored = reopen(&store);
    assert_eq!(restored.user().unwrap().full_name, "Jamie R. Rivera");
    assert_eq!(restored.token(), Some("tok-1"));
}

#[test]
fn test_corrupt_file_restores_as_logged_out() {
    let (store, _temp_dir) = create_test_store();
    let path = store.storage().path().to_path_buf();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    let restored = reopen(&store);
    assert!(!restored.is_authenticated());
    assert_eq!(restored.session(), SessionStore::new(FileStore::new(&path)).session());
    assert!(!path.exists());
}

#[test]
fn test_malformed_user_restores_as_logged_out() {
    let (store, _temp_dir) = create_test_store();
    let file = store.storage();
    file.set(TOKEN_KEY, "tok-1").unwrap();
    // Valid JSON, but not a usable profile
    file.set(USER_KEY, r#"{"id": "", "email": "x@y.z"}"#).unwrap();

    let restored = reopen(&store);
    assert!(!restored.is_authenticated());
    assert_eq!(file.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(file.get(USER_KEY).unwrap(), None);
}

#[test]
fn test_token_without_user_restores_as_logged_out() {
    let (store, _temp_dir) = create_test_store();
    store.storage().set(TOKEN_KEY, "tok-orphan").unwrap();

    let restored = reopen(&store);
    assert!(!restored.is_authenticated());
    assert_eq!(restored.token(), None);
}
