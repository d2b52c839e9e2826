use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleetctl_core::{RoomId, SenderId};

use crate::types::{Conversation, Message};

const DEFAULT_COOLDOWN: Duration = Duration::from_secs(900);
const DEFAULT_MAX_MESSAGES: usize = 50;
const DEFAULT_MAX_TOKENS: usize = 8000;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub cooldown: Duration,
    pub max_messages: usize,
    pub max_tokens: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            max_messages: DEFAULT_MAX_MESSAGES,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl TrackerConfig {
    /// Non-positive configured values fall back to the defaults above,
    /// matching the replace-bad-config-with-defaults rule used throughout
    /// this workspace.
    fn normalize(mut self) -> Self {
        if self.cooldown.is_zero() {
            self.cooldown = DEFAULT_COOLDOWN;
        }
        if self.max_messages == 0 {
            self.max_messages = DEFAULT_MAX_MESSAGES;
        }
        if self.max_tokens == 0 {
            self.max_tokens = DEFAULT_MAX_TOKENS;
        }
        self
    }
}

/// Rough token estimate: `chars / 4`, plus a flat 4-token overhead per
/// message for role/metadata framing. Deliberately soft — this gates buffer
/// trimming, not billing.
pub fn estimate_tokens(messages: &[Message]) -> usize {
    messages
        .iter()
        .map(|m| m.content.len() / 4 + 4)
        .sum()
}

type ConvKey = (RoomId, SenderId);

/// Holds every active conversation in memory. Sealing moves a conversation
/// out of this map and hands it to the caller (or a periodic sweep) for
/// summarisation; the tracker itself never talks to long-term storage.
pub struct ConversationTracker {
    config: TrackerConfig,
    conversations: Mutex<HashMap<ConvKey, Conversation>>,
}

impl ConversationTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config: config.normalize(),
            conversations: Mutex::new(HashMap::new()),
        }
    }

    fn trim(&self, conv: &mut Conversation) {
        while conv.messages.len() > self.config.max_messages {
            conv.messages.remove(0);
        }
        while estimate_tokens(&conv.messages) > self.config.max_tokens && !conv.messages.is_empty() {
            conv.messages.remove(0);
        }
    }

    /// Records `message` against the conversation identified by
    /// `(room_id, sender_id)`. If the existing conversation's cooldown has
    /// elapsed since its last activity, it is sealed first (removed from
    /// the active map) and a fresh conversation is started; the sealed
    /// conversation is returned alongside the active one's ID for the
    /// caller to forward to the seal pipeline.
    pub fn record_message(
        &self,
        room_id: RoomId,
        sender_id: SenderId,
        message: Message,
        now: DateTime<Utc>,
    ) -> (String, Vec<Conversation>) {
        let key = (room_id.clone(), sender_id.clone());
        let mut sealed = Vec::new();
        let mut conversations = self.conversations.lock().unwrap();

        if let Some(existing) = conversations.get(&key) {
            let idle = now.signed_duration_since(existing.last_activity).to_std().unwrap_or_default();
            if idle > self.config.cooldown {
                if let Some(expired) = conversations.remove(&key) {
                    sealed.push(expired);
                }
            }
        }

        let conv = conversations
            .entry(key)
            .or_insert_with(|| Conversation::new(room_id, sender_id, now));
        conv.messages.push(message);
        conv.last_activity = now;
        self.trim(conv);

        (conv.id.clone(), sealed)
    }

    /// Returns a deep copy of the active conversation for this key, if any.
    pub fn get_active_conversation(&self, room_id: &RoomId, sender_id: &SenderId) -> Option<Conversation> {
        let key = (room_id.clone(), sender_id.clone());
        self.conversations.lock().unwrap().get(&key).cloned()
    }

    /// Sweeps every active conversation, sealing (removing) those whose
    /// cooldown has elapsed relative to `now`. Used by the periodic seal
    /// runner so idle conversations get archived even without new traffic.
    pub fn seal_expired(&self, now: DateTime<Utc>) -> Vec<Conversation> {
        let mut conversations = self.conversations.lock().unwrap();
        let expired_keys: Vec<ConvKey> = conversations
            .iter()
            .filter(|(_, conv)| {
                now.signed_duration_since(conv.last_activity)
                    .to_std()
                    .unwrap_or_default()
                    > self.config.cooldown
            })
            .map(|(k, _)| k.clone())
            .collect();

        expired_keys
            .into_iter()
            .filter_map(|k| conversations.remove(&k))
            .collect()
    }
}
