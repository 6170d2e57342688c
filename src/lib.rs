// Declare the modules
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod shell;
pub mod state;
pub mod storage;
pub mod store;

use std::sync::Arc;

use anyhow::Context;
use config::AppConfig;
use state::AppState;
use storage::{BlobStore, MemoryBlobStore, SqliteBlobStore};
use store::{ConversationStore, StoreOptions};

pub async fn run() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let blobs: Arc<dyn BlobStore> = if config.in_memory {
        log::info!("Using in-memory storage; conversations will not be saved");
        Arc::new(MemoryBlobStore::new())
    } else {
        Arc::new(SqliteBlobStore::open(&config.db_path).await?)
    };

    let store = ConversationStore::restore(blobs, StoreOptions::from(&config)).await?;
    log::info!(
        "Loaded {} conversations, current: {:?}",
        store.conversations().len(),
        store.current_conversation_id()
    );

    let app_state = AppState::new(store);
    shell::run_shell(app_state).await
}
