//! In-process owner of all conversations and the current selection.
//!
//! Every mutation of the conversation list is followed by writing the whole
//! list, as JSON, to the injected [`BlobStore`].

use std::sync::Arc;

use anyhow::Context;

use crate::config::{AppConfig, DEFAULT_STORAGE_KEY, DEFAULT_TITLE};
use crate::error::StoreError;
use crate::models::{Attachment, Conversation, Message, Role};
use crate::storage::BlobStore;

/// Settings the store needs from the application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    pub storage_key: String,
    pub default_title: String,
    pub sidebar_open: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_title: DEFAULT_TITLE.to_string(),
            sidebar_open: true,
        }
    }
}

impl From<&AppConfig> for StoreOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            storage_key: config.storage_key.clone(),
            default_title: config.default_title.clone(),
            sidebar_open: config.sidebar_open,
        }
    }
}

pub struct ConversationStore {
    blobs: Arc<dyn BlobStore>,
    options: StoreOptions,
    /// Newest-created first.
    conversations: Vec<Conversation>,
    current_id: Option<String>,
    sidebar_open: bool,
}

impl ConversationStore {
    /// Loads the persisted snapshot, or starts with one fresh conversation
    /// when nothing usable is stored.
    ///
    /// Unparsable snapshots are discarded with a warning. Only a failure of
    /// the blob store itself is an error.
    pub async fn restore(
        blobs: Arc<dyn BlobStore>,
        options: StoreOptions,
    ) -> Result<Self, anyhow::Error> {
        let saved = blobs
            .get(&options.storage_key)
            .await
            .context("Failed to read saved conversations")?;

        let mut store = Self {
            blobs,
            sidebar_open: options.sidebar_open,
            options,
            conversations: Vec::new(),
            current_id: None,
        };

        let loaded = match saved {
            None => {
                log::info!("No saved conversations found");
                None
            }
            Some(raw) => match serde_json::from_str::<Vec<Conversation>>(&raw) {
                Ok(conversations) if conversations.is_empty() => {
                    log::info!("Saved conversation list is empty");
                    None
                }
                Ok(conversations) => Some(conversations),
                Err(e) => {
                    log::warn!(
                        "Discarding unreadable saved conversations under '{}': {}",
                        store.options.storage_key,
                        e
                    );
                    None
                }
            },
        };

        match loaded {
            Some(conversations) => {
                log::info!("Restored {} conversations", conversations.len());
                store.current_id = conversations.first().map(|c| c.id.clone());
                store.conversations = conversations;
            }
            None => {
                store
                    .create_new_conversation()
                    .await
                    .context("Failed to initialize conversation storage")?;
            }
        }

        Ok(store)
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn current_conversation_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.current_id.as_deref().and_then(|id| self.conversation(id))
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn is_sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    /// Flips sidebar visibility and returns the new value.
    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_open = !self.sidebar_open;
        self.sidebar_open
    }

    /// Prepends a new empty conversation, selects it and returns its id.
    pub async fn create_new_conversation(&mut self) -> Result<String, StoreError> {
        let conversation = Conversation::new(self.options.default_title.clone());
        let id = conversation.id.clone();
        log::info!("Creating new conversation {}", id);

        self.conversations.insert(0, conversation);
        self.current_id = Some(id.clone());
        self.persist().await?;
        Ok(id)
    }

    /// Appends a user message to the current conversation.
    pub async fn add_message(
        &mut self,
        content: impl Into<String>,
        attachment: Option<Attachment>,
    ) -> Result<Message, StoreError> {
        let id = self
            .current_id
            .clone()
            .ok_or(StoreError::NoActiveConversation)?;
        self.append(&id, Message::new(Role::User, content, attachment))
            .await
    }

    /// Appends an assistant message to `conversation_id`, which need not be
    /// the current conversation.
    pub async fn record_reply(
        &mut self,
        conversation_id: &str,
        content: impl Into<String>,
        attachment: Option<Attachment>,
    ) -> Result<Message, StoreError> {
        self.append(
            conversation_id,
            Message::new(Role::Assistant, content, attachment),
        )
        .await
    }

    async fn append(&mut self, conversation_id: &str, message: Message) -> Result<Message, StoreError> {
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| StoreError::not_found(conversation_id))?;

        log::debug!(
            "Appending {:?} message {} to conversation {}",
            message.role,
            message.id,
            conversation_id
        );
        conversation.push(message.clone());
        self.persist().await?;
        Ok(message)
    }

    pub fn set_current_conversation(&mut self, id: &str) -> Result<(), StoreError> {
        if self.conversation(id).is_none() {
            log::warn!("Attempted to select non-existent conversation: {}", id);
            return Err(StoreError::not_found(id));
        }
        self.current_id = Some(id.to_string());
        Ok(())
    }

    /// Removes the conversation, returning whether it existed.
    ///
    /// Deleting the current conversation selects the first remaining one.
    pub async fn delete_conversation(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(index) = self.conversations.iter().position(|c| c.id == id) else {
            log::warn!("Attempted to delete non-existent conversation: {}", id);
            return Ok(false);
        };

        log::info!("Deleting conversation {}", id);
        self.conversations.remove(index);
        if self.current_id.as_deref() == Some(id) {
            self.current_id = self.conversations.first().map(|c| c.id.clone());
        }
        self.persist().await?;
        Ok(true)
    }

    pub async fn update_conversation_title(
        &mut self,
        id: &str,
        title: impl Into<String>,
    ) -> Result<(), StoreError> {
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found(id))?;

        conversation.title = title.into();
        log::info!("Renamed conversation {} to: {}", id, conversation.title);
        self.persist().await
    }

    // An empty list is never written, so the last non-empty snapshot survives
    async fn persist(&self) -> Result<(), StoreError> {
        if self.conversations.is_empty() {
            log::debug!("No conversations left, keeping previous snapshot");
            return Ok(());
        }

        let json = serde_json::to_string(&self.conversations)
            .context("Failed to serialize conversations")
            .map_err(StoreError::Persistence)?;
        self.blobs
            .put(&self.options.storage_key, &json)
            .await
            .map_err(StoreError::Persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;
    use crate::storage::MemoryBlobStore;
    use async_trait::async_trait;

    const KEY: &str = "sophia_conversations";

    async fn fresh_store() -> (ConversationStore, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let store = ConversationStore::restore(blobs.clone(), StoreOptions::default())
            .await
            .unwrap();
        (store, blobs)
    }

    async fn store_with(raw: &str) -> (ConversationStore, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.put(KEY, raw).await.unwrap();
        let store = ConversationStore::restore(blobs.clone(), StoreOptions::default())
            .await
            .unwrap();
        (store, blobs)
    }

    fn ids(store: &ConversationStore) -> Vec<&str> {
        store.conversations().iter().map(|c| c.id.as_str()).collect()
    }

    async fn saved(blobs: &MemoryBlobStore) -> Vec<Conversation> {
        let raw = blobs.get(KEY).await.unwrap().expect("snapshot written");
        serde_json::from_str(&raw).unwrap()
    }

    const TWO_CONVERSATIONS: &str = r#"[
        {"id":"2","title":"Second","messages":[],"lastUpdated":2000},
        {"id":"1","title":"First","messages":[],"lastUpdated":1000}
    ]"#;

    #[tokio::test]
    async fn empty_storage_starts_with_one_current_conversation() {
        let (store, blobs) = fresh_store().await;

        assert_eq!(store.conversations().len(), 1);
        let conv = &store.conversations()[0];
        assert_eq!(conv.title, "Nova conversa");
        assert!(conv.messages.is_empty());
        assert_eq!(store.current_conversation_id(), Some(conv.id.as_str()));
        assert_eq!(saved(&blobs).await, store.conversations());
    }

    #[tokio::test]
    async fn restore_selects_newest_conversation() {
        let (store, _) = store_with(TWO_CONVERSATIONS).await;
        assert_eq!(ids(&store), vec!["2", "1"]);
        assert_eq!(store.current_conversation_id(), Some("2"));
    }

    #[tokio::test]
    async fn unreadable_snapshot_falls_back_to_fresh_state() {
        let (store, blobs) = store_with("{not json").await;

        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.conversations()[0].title, "Nova conversa");
        assert_eq!(saved(&blobs).await, store.conversations());
    }

    #[tokio::test]
    async fn empty_saved_list_falls_back_to_fresh_state() {
        let (store, _) = store_with("[]").await;
        assert_eq!(store.conversations().len(), 1);
        assert!(store.current_conversation_id().is_some());
    }

    #[tokio::test]
    async fn created_ids_are_unique_and_newest_first() {
        let (mut store, _) = fresh_store().await;
        let initial = store.conversations()[0].id.clone();

        let mut created = Vec::new();
        for _ in 0..20 {
            created.push(store.create_new_conversation().await.unwrap());
        }

        let unique: std::collections::HashSet<&String> = created.iter().collect();
        assert_eq!(unique.len(), created.len());

        let mut expected: Vec<&str> = created.iter().rev().map(String::as_str).collect();
        expected.push(&initial);
        assert_eq!(ids(&store), expected);
        assert_eq!(store.current_conversation_id(), created.last().map(String::as_str));
    }

    #[tokio::test]
    async fn creating_leaves_previous_conversation_untouched() {
        let (mut store, _) = fresh_store().await;
        store.add_message("keep me", None).await.unwrap();
        let before = store.conversations()[0].clone();

        store.create_new_conversation().await.unwrap();
        assert_eq!(store.conversation(&before.id), Some(&before));
    }

    #[tokio::test]
    async fn add_message_appends_user_message_to_current() {
        let (mut store, _) =
            store_with(r#"[{"id":"1","title":"Nova conversa","messages":[],"lastUpdated":1}]"#).await;

        let msg = store.add_message("hello", None).await.unwrap();

        let conv = store.conversation("1").unwrap();
        assert_eq!(conv.messages.len(), 1);
        assert_eq!(conv.messages[0], msg);
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.attachment, None);
        assert!(conv.last_updated >= msg.timestamp);
    }

    #[tokio::test]
    async fn add_message_only_mutates_current_conversation() {
        let (mut store, blobs) = store_with(TWO_CONVERSATIONS).await;
        store.set_current_conversation("1").unwrap();
        let other = store.conversation("2").unwrap().clone();

        let attachment = Attachment::new("https://example.com/clip.mp4", MediaType::Video);
        store
            .add_message("watch this", Some(attachment.clone()))
            .await
            .unwrap();

        assert_eq!(store.conversation("2"), Some(&other));
        let target = store.conversation("1").unwrap();
        assert_eq!(target.messages.len(), 1);
        assert_eq!(target.messages[0].attachment, Some(attachment));
        assert_eq!(saved(&blobs).await, store.conversations());
    }

    #[tokio::test]
    async fn add_message_without_current_conversation_is_reported() {
        let (mut store, _) = store_with(r#"[{"id":"1","title":"t","messages":[],"lastUpdated":1}]"#).await;
        store.delete_conversation("1").await.unwrap();

        let err = store.add_message("nobody home", None).await.unwrap_err();
        assert!(matches!(err, StoreError::NoActiveConversation));
    }

    #[tokio::test]
    async fn record_reply_appends_assistant_message_to_named_conversation() {
        let (mut store, _) = store_with(TWO_CONVERSATIONS).await;

        let reply = store.record_reply("1", "here you go", None).await.unwrap();

        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(store.conversation("1").unwrap().messages, vec![reply]);
        assert!(store.conversation("2").unwrap().messages.is_empty());
        assert_eq!(store.current_conversation_id(), Some("2"));

        let err = store.record_reply("missing", "x", None).await.unwrap_err();
        assert!(matches!(err, StoreError::ConversationNotFound { ref id } if id == "missing"));
    }

    #[tokio::test]
    async fn set_current_rejects_unknown_id() {
        let (mut store, _) = store_with(TWO_CONVERSATIONS).await;

        store.set_current_conversation("1").unwrap();
        assert_eq!(store.current_conversation().map(|c| c.title.as_str()), Some("First"));

        let err = store.set_current_conversation("nope").unwrap_err();
        assert!(matches!(err, StoreError::ConversationNotFound { .. }));
        assert_eq!(store.current_conversation_id(), Some("1"));
    }

    #[tokio::test]
    async fn deleting_current_selects_first_remaining() {
        let (mut store, _) = store_with(TWO_CONVERSATIONS).await;

        assert!(store.delete_conversation("2").await.unwrap());
        assert_eq!(ids(&store), vec!["1"]);
        assert_eq!(store.current_conversation_id(), Some("1"));
    }

    #[tokio::test]
    async fn deleting_other_conversation_keeps_selection() {
        let (mut store, _) = store_with(TWO_CONVERSATIONS).await;

        store.delete_conversation("1").await.unwrap();
        assert_eq!(ids(&store), vec!["2"]);
        assert_eq!(store.current_conversation_id(), Some("2"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (mut store, _) = store_with(TWO_CONVERSATIONS).await;

        assert!(store.delete_conversation("2").await.unwrap());
        let after_once = store.conversations().to_vec();
        let current_once = store.current_conversation_id().map(str::to_string);

        assert!(!store.delete_conversation("2").await.unwrap());
        assert_eq!(store.conversations(), after_once.as_slice());
        assert_eq!(store.current_conversation_id().map(str::to_string), current_once);
    }

    #[tokio::test]
    async fn deleting_everything_keeps_last_snapshot() {
        let (mut store, blobs) = store_with(TWO_CONVERSATIONS).await;
        store.delete_conversation("2").await.unwrap();
        store.delete_conversation("1").await.unwrap();

        assert!(store.conversations().is_empty());
        assert_eq!(store.current_conversation_id(), None);

        // The one-element snapshot written after the first delete is still there.
        let remaining = saved(&blobs).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "1");

        let reopened = ConversationStore::restore(blobs.clone(), StoreOptions::default())
            .await
            .unwrap();
        assert_eq!(ids(&reopened), vec!["1"]);
    }

    #[tokio::test]
    async fn update_title_changes_only_that_title() {
        let (mut store, blobs) = store_with(TWO_CONVERSATIONS).await;
        let other = store.conversation("2").unwrap().clone();

        store
            .update_conversation_title("1", "Trip planning")
            .await
            .unwrap();

        let renamed = store.conversation("1").unwrap();
        assert_eq!(renamed.title, "Trip planning");
        assert_eq!(renamed.last_updated, 1000);
        assert_eq!(store.conversation("2"), Some(&other));
        assert_eq!(saved(&blobs).await[1].title, "Trip planning");
    }

    #[tokio::test]
    async fn update_title_rejects_unknown_id() {
        let (mut store, _) = store_with(TWO_CONVERSATIONS).await;
        let before = store.conversations().to_vec();

        let err = store.update_conversation_title("9", "x").await.unwrap_err();
        assert!(matches!(err, StoreError::ConversationNotFound { .. }));
        assert_eq!(store.conversations(), before.as_slice());
    }

    #[tokio::test]
    async fn restoring_a_snapshot_reproduces_the_conversations() {
        let (mut store, blobs) = fresh_store().await;
        store.add_message("first", None).await.unwrap();
        let second = store.create_new_conversation().await.unwrap();
        store
            .add_message(
                "with picture",
                Some(Attachment::new("data:image/png;base64,AAAA", MediaType::Image)),
            )
            .await
            .unwrap();
        store.record_reply(&second, "nice picture", None).await.unwrap();
        store.update_conversation_title(&second, "Pictures").await.unwrap();

        let restored = ConversationStore::restore(blobs.clone(), StoreOptions::default())
            .await
            .unwrap();
        assert_eq!(restored.conversations(), store.conversations());
        assert_eq!(restored.current_conversation_id(), Some(second.as_str()));
    }

    #[tokio::test]
    async fn custom_options_drive_key_and_title() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let options = StoreOptions {
            storage_key: "elsewhere".to_string(),
            default_title: "New chat".to_string(),
            sidebar_open: false,
        };
        let store = ConversationStore::restore(blobs.clone(), options).await.unwrap();

        assert_eq!(store.conversations()[0].title, "New chat");
        assert!(!store.is_sidebar_open());
        assert!(blobs.get("elsewhere").await.unwrap().is_some());
        assert!(blobs.get(KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn toggle_sidebar_flips_without_writing() {
        let (mut store, _) = store_with(TWO_CONVERSATIONS).await;
        assert!(store.is_sidebar_open());
        assert!(!store.toggle_sidebar());
        assert!(store.toggle_sidebar());
    }

    struct ReadOnlyBlobStore {
        snapshot: Option<String>,
        fail_reads: bool,
    }

    #[async_trait]
    impl BlobStore for ReadOnlyBlobStore {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            if self.fail_reads {
                anyhow::bail!("disk unavailable");
            }
            Ok(self.snapshot.clone())
        }

        async fn put(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("read-only")
        }
    }

    #[tokio::test]
    async fn write_failure_is_reported_after_mutation() {
        let blobs = Arc::new(ReadOnlyBlobStore {
            snapshot: Some(TWO_CONVERSATIONS.to_string()),
            fail_reads: false,
        });
        let mut store = ConversationStore::restore(blobs, StoreOptions::default())
            .await
            .unwrap();

        let err = store.add_message("unsaved", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
        assert_eq!(store.conversation("2").unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn read_failure_aborts_restore() {
        let blobs = Arc::new(ReadOnlyBlobStore {
            snapshot: None,
            fail_reads: true,
        });
        let result = ConversationStore::restore(blobs, StoreOptions::default()).await;
        assert!(result.is_err());
    }
}
