//! In-memory conversation store.
//!
//! Keeps the role-tagged message history per conversation id. The store is
//! owned by the application context and passed to request handlers — no
//! globals — and is bounded: when the entry cap is reached, the
//! least-recently-used conversation is evicted to keep memory flat for the
//! process lifetime. Within a conversation the history is append-only.

use std::collections::HashMap;

use crate::inference::types::ChatMessage;

/// Default maximum number of live conversations.
pub const DEFAULT_MAX_CONVERSATIONS: usize = 256;

struct Entry {
    messages: Vec<ChatMessage>,
    last_used: u64,
}

/// Bounded map of conversation id → message history.
pub struct ConversationStore {
    entries: HashMap<String, Entry>,
    max_entries: usize,
    /// Logical clock for LRU ordering; bumped on every access.
    clock: u64,
}

impl ConversationStore {
    /// Create a store holding at most `max_entries` conversations.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: max_entries.max(1),
            clock: 0,
        }
    }

    /// Return a copy of the conversation's history, seeding a new
    /// conversation with the system prompt on first access.
    ///
    /// Counts as a use for LRU purposes.
    pub fn history(&mut self, id: &str, system_prompt: &str) -> Vec<ChatMessage> {
        self.clock += 1;
        let clock = self.clock;

        if !self.entries.contains_key(id) {
            self.evict_if_full();
            self.entries.insert(
                id.to_string(),
                Entry {
                    messages: vec![ChatMessage::system(system_prompt)],
                    last_used: clock,
                },
            );
            tracing::debug!(conversation = id, "seeded new conversation");
        }

        let entry = self.entries.get_mut(id).expect("entry just ensured");
        entry.last_used = clock;
        entry.messages.clone()
    }

    /// Append messages to a conversation. Counts as a use for LRU purposes.
    ///
    /// A conversation evicted between `history` and `append` is silently
    /// recreated without its earlier turns; the caller's messages still land.
    pub fn append(&mut self, id: &str, messages: impl IntoIterator<Item = ChatMessage>) {
        self.clock += 1;
        let clock = self.clock;

        if !self.entries.contains_key(id) {
            self.evict_if_full();
            self.entries.insert(
                id.to_string(),
                Entry {
                    messages: Vec::new(),
                    last_used: clock,
                },
            );
        }

        let entry = self.entries.get_mut(id).expect("entry just ensured");
        entry.last_used = clock;
        entry.messages.extend(messages);
    }

    /// Number of live conversations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a conversation id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Drop the least-recently-used conversation when at capacity.
    fn evict_if_full(&mut self) {
        if self.entries.len() < self.max_entries {
            return;
        }
        if let Some(oldest) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| id.clone())
        {
            self.entries.remove(&oldest);
            tracing::debug!(conversation = %oldest, "evicted least-recently-used conversation");
        }
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONVERSATIONS)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
