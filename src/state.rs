use crate::store::ConversationStore;
use std::sync::Arc;
use tokio::sync::Mutex;

// Core application state shared by every command
#[derive(Clone)]
pub struct AppState {
    // Single owner of the conversations; commands take the lock for the
    // duration of one operation.
    pub store: Arc<Mutex<ConversationStore>>,
}

impl AppState {
    pub fn new(store: ConversationStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }
}
