use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fleetctl_core::{RoomId, SenderId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            at,
        }
    }

    pub fn user(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(Role::User, content, at)
    }

    pub fn assistant(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(Role::Assistant, content, at)
    }

    pub fn system(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(Role::System, content, at)
    }

    pub fn tool(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(Role::Tool, content, at)
    }
}

/// A live, in-memory conversation between one human operator and the
/// control plane in one room. Owned exclusively by the short-term tracker
/// — never persisted directly. Keyed by `(room_id, sender_id)`; which
/// agent eventually handles a given turn is decided downstream by the
/// classifier's output, not by the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub room_id: RoomId,
    pub sender_id: SenderId,
    pub messages: Vec<Message>,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Conversation {
    pub fn new(room_id: RoomId, sender_id: SenderId, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            room_id,
            sender_id,
            messages: Vec::new(),
            started_at: now,
            last_activity: now,
        }
    }
}

/// A sealed, searchable long-term memory entry: a summarised conversation,
/// its embedding (when one could be produced), and the full transcript it
/// was sealed from. An entry with no embedding is still stored — just
/// invisible to similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub room_id: RoomId,
    pub sender_id: SenderId,
    pub summary: String,
    pub embedding: Option<Vec<f32>>,
    pub messages: Vec<Message>,
    pub sealed_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A long-term memory entry paired with its similarity to a search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMemory {
    pub entry: MemoryEntry,
    pub score: f32,
}
