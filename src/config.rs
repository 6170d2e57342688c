use std::path::PathBuf;

use anyhow::{Context, Result};

pub const DEFAULT_STORAGE_KEY: &str = "sophia_conversations";
pub const DEFAULT_TITLE: &str = "Nova conversa";
const DB_FILE_NAME: &str = "sophia.sqlite";
const APP_DIR_NAME: &str = "sophia";

const ENV_DB_PATH: &str = "SOPHIA_DB_PATH";
const ENV_STORAGE_KEY: &str = "SOPHIA_STORAGE_KEY";
const ENV_DEFAULT_TITLE: &str = "SOPHIA_DEFAULT_TITLE";
const ENV_SIDEBAR_OPEN: &str = "SOPHIA_SIDEBAR_OPEN";
const ENV_IN_MEMORY: &str = "SOPHIA_IN_MEMORY";

/// Runtime settings for the chat application.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// SQLite file backing the blob store.
    pub db_path: PathBuf,
    /// Key the conversation snapshot is stored under.
    pub storage_key: String,
    /// Title given to newly created conversations.
    pub default_title: String,
    pub sidebar_open: bool,
    /// Keep everything in memory instead of opening the database.
    pub in_memory: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_title: DEFAULT_TITLE.to_string(),
            sidebar_open: true,
            in_memory: false,
        }
    }
}

impl AppConfig {
    /// Builds the configuration from `SOPHIA_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH).filter(|v| !v.trim().is_empty()) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(key) = lookup(ENV_STORAGE_KEY).filter(|v| !v.trim().is_empty()) {
            config.storage_key = key;
        }
        if let Some(title) = lookup(ENV_DEFAULT_TITLE).filter(|v| !v.trim().is_empty()) {
            config.default_title = title;
        }
        if let Some(raw) = lookup(ENV_SIDEBAR_OPEN) {
            config.sidebar_open = parse_bool(&raw)
                .with_context(|| format!("Invalid value for {}", ENV_SIDEBAR_OPEN))?;
        }
        if let Some(raw) = lookup(ENV_IN_MEMORY) {
            config.in_memory = parse_bool(&raw)
                .with_context(|| format!("Invalid value for {}", ENV_IN_MEMORY))?;
        }

        log::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }
}

fn default_db_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join(APP_DIR_NAME).join(DB_FILE_NAME),
        None => PathBuf::from(DB_FILE_NAME),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("expected a boolean, got '{}'", other)),
    }
}
