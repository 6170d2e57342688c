use thiserror::Error;

/// Failures reported by [`crate::store::ConversationStore`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conversation not found: {id}")]
    ConversationNotFound { id: String },

    #[error("No active conversation selected")]
    NoActiveConversation,

    /// The in-memory state changed but writing the snapshot failed.
    #[error("Failed to persist conversations: {0:#}")]
    Persistence(#[source] anyhow::Error),
}

impl StoreError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::ConversationNotFound { id: id.into() }
    }
}
