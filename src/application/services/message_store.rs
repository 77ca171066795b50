use std::sync::Arc;

use crate::application::ports::TurnStore;
use crate::domain::ConversationTurn;

pub const DEFAULT_STORAGE_KEY: &str = "AIChatMessages";

/// Ordered conversation log backed by on-device storage. Always holds at
/// least the seeded welcome turn.
pub struct MessageStore {
    store: Arc<dyn TurnStore>,
    key: String,
    welcome_message: String,
    turns: Vec<ConversationTurn>,
}

impl MessageStore {
    pub fn new(store: Arc<dyn TurnStore>, key: String, welcome_message: String) -> Self {
        let turns = vec![ConversationTurn::welcome(welcome_message.clone())];
        Self {
            store,
            key,
            welcome_message,
            turns,
        }
    }

    /// Loads the persisted log. Anything unreadable leaves only the welcome
    /// turn; unparseable data is also deleted from storage.
    pub async fn restore(&mut self) -> &[ConversationTurn] {
        self.turns = self.seed();

        let raw = match self.store.load(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return &self.turns,
            Err(e) => {
                tracing::warn!(error = %e, key = %self.key, "Failed to load chat history");
                return &self.turns;
            }
        };

        match serde_json::from_str::<Vec<ConversationTurn>>(&raw) {
            Ok(turns) if turns.len() > 1 => {
                tracing::debug!(turns = turns.len(), "Restored chat history");
                self.turns = turns;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, key = %self.key, "Discarding corrupt chat history");
                if let Err(e) = self.store.remove(&self.key).await {
                    tracing::warn!(error = %e, "Failed to remove corrupt chat history");
                }
            }
        }

        &self.turns
    }

    /// Appends a settled turn. A failed write is logged; the in-memory log keeps the turn.
    pub async fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
        self.persist().await;
    }

    /// Drops the conversation back to the welcome turn and clears storage.
    pub async fn reset(&mut self) {
        self.turns = self.seed();
        if let Err(e) = self.store.remove(&self.key).await {
            tracing::warn!(error = %e, key = %self.key, "Failed to clear chat history");
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    async fn persist(&self) {
        // The welcome turn alone is never written.
        if self.turns.iter().all(|turn| turn.id.is_welcome()) {
            return;
        }

        let serialized = match serde_json::to_string(&self.turns) {
            Ok(serialized) => serialized,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize chat history");
                return;
            }
        };

        if let Err(e) = self.store.save(&self.key, &serialized).await {
            tracing::warn!(error = %e, key = %self.key, "Failed to save chat history");
        }
    }

    fn seed(&self) -> Vec<ConversationTurn> {
        vec![ConversationTurn::welcome(self.welcome_message.clone())]
    }
}
