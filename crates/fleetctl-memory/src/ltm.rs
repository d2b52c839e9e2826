use async_trait::async_trait;
use fleetctl_core::{RoomId, SenderId};
use rusqlite::{params, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::{MemoryError, Result};
use crate::types::{MemoryEntry, Message, ScoredMemory};

/// Cosine similarity between two vectors. Zero when either vector has zero
/// magnitude, or when the dimensions mismatch — both treated as "no
/// meaningful similarity" rather than an error, since a dimension mismatch
/// typically means an embedding model was swapped mid-flight and the
/// comparison is simply not informative.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// Long-term memory storage and retrieval, scoped per `(room_id,
/// sender_id)`.
///
/// `search` takes free text and is expected to embed it internally before
/// delegating to `search_by_embedding`; the split lets callers who already
/// have an embedding (e.g. the context assembler) skip a redundant
/// embedding call. The two-method split mirrors the authoritative source
/// behaviour and is preserved deliberately rather than unified.
#[async_trait]
pub trait LtmStore: Send + Sync {
    async fn store(&self, entry: MemoryEntry) -> Result<()>;
    async fn search_by_embedding(
        &self,
        room_id: &RoomId,
        sender_id: &SenderId,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredMemory>>;
}

/// SQLite-backed `LtmStore`. Holds its own connection independent of the
/// durable store's, since long-term memory's access pattern (append +
/// similarity scan) differs from the control-plane tables' CRUD pattern.
pub struct SqlLtmStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqlLtmStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)?;
        Self::init(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init(conn: &rusqlite::Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             CREATE TABLE IF NOT EXISTS ltm_entries (
                 id          TEXT PRIMARY KEY,
                 room_id     TEXT NOT NULL,
                 sender_id   TEXT NOT NULL,
                 summary     TEXT NOT NULL,
                 embedding   BLOB,
                 messages    TEXT NOT NULL,
                 metadata    TEXT NOT NULL,
                 sealed_at   TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_ltm_entries_room_sender
                 ON ltm_entries (room_id, sender_id);
             CREATE INDEX IF NOT EXISTS idx_ltm_entries_sealed_at
                 ON ltm_entries (sealed_at);",
        )?;
        Ok(())
    }

    fn encode_embedding(embedding: &Option<Vec<f32>>) -> Option<Vec<u8>> {
        embedding
            .as_ref()
            .map(|e| e.iter().flat_map(|f| f.to_le_bytes()).collect())
    }

    fn decode_embedding(bytes: Option<Vec<u8>>) -> Option<Vec<f32>> {
        bytes.map(|bytes| {
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        })
    }

    fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<MemoryEntry> {
        let embedding_bytes: Option<Vec<u8>> = row.get("embedding")?;
        let messages_json: String = row.get("messages")?;
        let metadata_json: String = row.get("metadata")?;
        let messages: Vec<Message> = serde_json::from_str(&messages_json).map_err(|_| {
            rusqlite::Error::InvalidColumnType(0, "messages".into(), rusqlite::types::Type::Text)
        })?;
        let metadata: HashMap<String, String> = serde_json::from_str(&metadata_json).map_err(|_| {
            rusqlite::Error::InvalidColumnType(0, "metadata".into(), rusqlite::types::Type::Text)
        })?;
        Ok(MemoryEntry {
            id: row.get("id")?,
            room_id: row.get::<_, String>("room_id")?.as_str().into(),
            sender_id: row.get::<_, String>("sender_id")?.as_str().into(),
            summary: row.get("summary")?,
            embedding: Self::decode_embedding(embedding_bytes),
            messages,
            metadata,
            sealed_at: row.get::<_, String>("sealed_at")?.parse().map_err(|_| {
                rusqlite::Error::InvalidColumnType(0, "sealed_at".into(), rusqlite::types::Type::Text)
            })?,
        })
    }
}

#[async_trait]
impl LtmStore for SqlLtmStore {
    async fn store(&self, entry: MemoryEntry) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let id = if entry.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            entry.id.clone()
        };
        let messages_json = serde_json::to_string(&entry.messages)
            .map_err(|e| MemoryError::Serialization(e.to_string()))?;
        let metadata_json = serde_json::to_string(&entry.metadata)
            .map_err(|e| MemoryError::Serialization(e.to_string()))?;
        // Upserts replace by ID.
        conn.execute(
            "INSERT INTO ltm_entries
                 (id, room_id, sender_id, summary, embedding, messages, metadata, sealed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                 room_id = excluded.room_id,
                 sender_id = excluded.sender_id,
                 summary = excluded.summary,
                 embedding = excluded.embedding,
                 messages = excluded.messages,
                 metadata = excluded.metadata,
                 sealed_at = excluded.sealed_at",
            params![
                id,
                entry.room_id.as_str(),
                entry.sender_id.as_str(),
                entry.summary,
                Self::encode_embedding(&entry.embedding),
                messages_json,
                metadata_json,
                entry.sealed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn search_by_embedding(
        &self,
        room_id: &RoomId,
        sender_id: &SenderId,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredMemory>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, room_id, sender_id, summary, embedding, messages, metadata, sealed_at
             FROM ltm_entries
             WHERE room_id = ?1 AND sender_id = ?2 AND embedding IS NOT NULL",
        )?;
        let entries = stmt
            .query_map(params![room_id.as_str(), sender_id.as_str()], Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);
        drop(conn);

        // Insertion-sort into a bounded top-K list — sufficient at the
        // expected scale (hundreds to low thousands of entries per scope).
        let mut top: Vec<ScoredMemory> = Vec::with_capacity(top_k);
        for entry in entries {
            let entry_embedding = entry.embedding.clone().unwrap_or_default();
            let score = cosine_similarity(embedding, &entry_embedding);
            let candidate = ScoredMemory { entry, score };
            let pos = top.partition_point(|m| m.score >= candidate.score);
            if pos < top_k {
                top.insert(pos, candidate);
                top.truncate(top_k);
            }
        }

        Ok(top)
    }
}

/// Discards everything it's given and always reports no matches. Lets the
/// seal pipeline and context assembler run to completion with no backing
/// store configured.
pub struct NoopLtm;

#[async_trait]
impl LtmStore for NoopLtm {
    async fn store(&self, _entry: MemoryEntry) -> Result<()> {
        Ok(())
    }

    async fn search_by_embedding(
        &self,
        _room_id: &RoomId,
        _sender_id: &SenderId,
        _embedding: &[f32],
        _top_k: usize,
    ) -> Result<Vec<ScoredMemory>> {
        Ok(Vec::new())
    }
}
