use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use run_tracker::RunBoundaryConfig;
use serde::Deserialize;
use shared::domain::CardId;
use state_core::StoreConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub log_filter: String,
    pub store: StoreConfig,
    pub run_boundary: RunBoundaryConfig,
    pub signature_cards: Vec<CardId>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/replay.db".into(),
            log_filter: "info".into(),
            store: StoreConfig::default(),
            run_boundary: RunBoundaryConfig::default(),
            signature_cards: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    database_url: Option<String>,
    log_filter: Option<String>,
    history_capacity: Option<usize>,
    publish_capacity: Option<usize>,
    run_boundary: Option<RunBoundaryConfig>,
    signature_cards: Option<Vec<String>>,
}

pub fn load_settings(path: &Path) -> Settings {
    load_settings_with(path, |key| std::env::var(key).ok())
}

/// File values first, then `APP__*` overrides looked up through `env`.
/// Unreadable files and unparsable values leave the defaults in place.
pub(crate) fn load_settings_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<FileSettings>(&raw) {
            apply_file(&mut settings, file_cfg);
        }
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
    if let Some(v) = env("APP__HISTORY_CAPACITY").and_then(|v| v.parse().ok()) {
        settings.store.history_capacity = v;
    }
    if let Some(v) = env("APP__PUBLISH_CAPACITY").and_then(|v| v.parse().ok()) {
        settings.store.publish_capacity = v;
    }
    if let Some(v) = env("APP__MAX_WINS").and_then(|v| v.parse().ok()) {
        settings.run_boundary.max_wins = v;
    }
    if let Some(v) = env("APP__MAX_LOSSES").and_then(|v| v.parse().ok()) {
        settings.run_boundary.max_losses = v;
    }
    if let Some(v) = env("APP__SIGNATURE_CARDS") {
        settings.signature_cards = card_list(v.split(','));
    }

    settings
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file_cfg.history_capacity {
        settings.store.history_capacity = v;
    }
    if let Some(v) = file_cfg.publish_capacity {
        settings.store.publish_capacity = v;
    }
    if let Some(v) = file_cfg.run_boundary {
        settings.run_boundary = v;
    }
    if let Some(v) = file_cfg.signature_cards {
        settings.signature_cards = card_list(v.iter().map(String::as_str));
    }
}

fn card_list<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<CardId> {
    raw.map(str::trim)
        .filter(|card_id| !card_id.is_empty())
        .map(CardId::new)
        .collect()
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
