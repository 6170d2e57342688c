// Commands exposed to the front end. Errors come back as display strings;
// the full error is logged here.

use crate::models::{Attachment, Conversation, MediaType, Message};
use crate::state::AppState;

pub async fn list_conversations(state: &AppState) -> Vec<Conversation> {
    log::debug!("Front end requested conversation list");
    let store = state.store.lock().await;
    store.conversations().to_vec()
}

pub async fn current_conversation(state: &AppState) -> Option<Conversation> {
    let store = state.store.lock().await;
    store.current_conversation().cloned()
}

pub async fn create_conversation(state: &AppState) -> Result<String, String> {
    let mut store = state.store.lock().await;
    store.create_new_conversation().await.map_err(|e| {
        log::error!("Failed to create conversation: {:?}", e);
        format!("Failed to create conversation: {}", e)
    })
}

pub async fn select_conversation(state: &AppState, conversation_id: &str) -> Result<(), String> {
    let mut store = state.store.lock().await;
    store
        .set_current_conversation(conversation_id)
        .map_err(|e| format!("Failed to open conversation: {}", e))
}

/// Sends a user message to the current conversation.
///
/// `media` and `media_type` come straight from the input form and must be
/// given together.
pub async fn send_message(
    state: &AppState,
    content: String,
    media: Option<String>,
    media_type: Option<String>,
) -> Result<Message, String> {
    let attachment = match (media, media_type) {
        (Some(media), Some(kind)) => {
            let kind: MediaType = kind.parse().map_err(|e| format!("{}", e))?;
            Some(Attachment::new(media, kind))
        }
        (None, None) => None,
        _ => return Err("Media and media type must be provided together".to_string()),
    };

    let mut store = state.store.lock().await;
    match store.add_message(content, attachment).await {
        Ok(message) => {
            log::info!("User message {} saved.", message.id);
            Ok(message)
        }
        Err(e) => {
            log::error!("Failed to add message: {:?}", e);
            Err(format!("Failed to send message: {}", e))
        }
    }
}

pub async fn delete_conversation(state: &AppState, conversation_id: &str) -> Result<(), String> {
    log::warn!("[CMD] Front end requested to delete conversation ID: {}", conversation_id);
    let mut store = state.store.lock().await;
    match store.delete_conversation(conversation_id).await {
        Ok(_) => Ok(()),
        Err(e) => {
            log::error!("[CMD] Failed to delete conversation {}: {:?}", conversation_id, e);
            Err(format!("Failed to delete conversation: {}", e))
        }
    }
}

pub async fn rename_conversation(
    state: &AppState,
    conversation_id: &str,
    title: String,
) -> Result<(), String> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err("Title cannot be empty".to_string());
    }

    let mut store = state.store.lock().await;
    store
        .update_conversation_title(conversation_id, title)
        .await
        .map_err(|e| {
            log::error!("Failed to rename conversation {}: {:?}", conversation_id, e);
            format!("Failed to rename conversation: {}", e)
        })
}

/// Returns the new sidebar visibility.
pub async fn toggle_sidebar(state: &AppState) -> bool {
    let mut store = state.store.lock().await;
    store.toggle_sidebar()
}
