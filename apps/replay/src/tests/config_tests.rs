use super::{load_settings_with, normalize_database_url, prepare_database_url, Settings};

use std::{collections::HashMap, fs};

use run_tracker::RunBoundaryConfig;
use shared::domain::CardId;

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_with(&dir.path().join("replay.toml"), no_env);
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.run_boundary, RunBoundaryConfig::default());
    assert_eq!(settings.store.history_capacity, 20);
}

#[test]
fn file_values_then_env_overrides() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("replay.toml");
    fs::write(
        &path,
        r#"
database_url = "sqlite://./data/from-file.db"
history_capacity = 5
signature_cards = ["PVPDR_SIG_01", " PVPDR_SIG_02 "]

[run_boundary]
max_wins = 7
"#,
    )
    .expect("write config");

    let env: HashMap<&str, &str> = HashMap::from([
        ("APP__DATABASE_URL", "sqlite::memory:"),
        ("APP__MAX_LOSSES", "2"),
        ("APP__PUBLISH_CAPACITY", "not-a-number"),
    ]);
    let settings = load_settings_with(&path, |key| env.get(key).map(|v| v.to_string()));

    assert_eq!(settings.database_url, "sqlite::memory:");
    assert_eq!(settings.store.history_capacity, 5);
    assert_eq!(settings.store.publish_capacity, 1024);
    assert_eq!(settings.run_boundary.max_wins, 7);
    assert_eq!(settings.run_boundary.max_losses, 2);
    assert_eq!(
        settings.signature_cards,
        vec![CardId::new("PVPDR_SIG_01"), CardId::new("PVPDR_SIG_02")]
    );
}

#[test]
fn unparsable_file_is_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("replay.toml");
    fs::write(&path, "history_capacity = [").expect("write config");
    let settings = load_settings_with(&path, |key| {
        (key == "APP__SIGNATURE_CARDS").then(|| "A, ,B".to_string())
    });
    assert_eq!(settings.store, Settings::default().store);
    assert_eq!(
        settings.signature_cards,
        vec![CardId::new("A"), CardId::new("B")]
    );
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\player\\replay.db"),
        "sqlite://C:/Users/player/replay.db"
    );
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
}

#[test]
fn creates_parent_dir_for_sqlite_url() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("data").join("replay.db");

    let url = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(url.starts_with("sqlite://"));
    assert!(dir.path().join("data").exists());
}
