use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::ltm::LtmStore;
use crate::stm::ConversationTracker;
use crate::types::{Conversation, MemoryEntry};

/// Produces a short text summary of a sealed conversation.
#[async_trait]
pub trait Summariser: Send + Sync {
    async fn summarise(&self, conversation: &Conversation) -> anyhow::Result<String>;
}

/// Produces an embedding vector for a piece of text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// No-op summariser: joins message contents verbatim. Used when no LLM
/// summariser is configured, so the pipeline still produces a searchable
/// (if verbose) long-term entry.
pub struct NoopSummariser;

#[async_trait]
impl Summariser for NoopSummariser {
    async fn summarise(&self, conversation: &Conversation) -> anyhow::Result<String> {
        Ok(conversation
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// No-op embedder: a zero vector, which always scores 0 similarity against
/// any query. Lets the pipeline run end-to-end without a real embedding
/// model configured.
pub struct NoopEmbedder {
    pub dims: usize,
}

#[async_trait]
impl Embedder for NoopEmbedder {
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(vec![0.0; self.dims])
    }
}

/// Summarises a sealed conversation, embeds the summary, and stores the
/// result in long-term memory.
///
/// A summarisation failure leaves the entry with an empty summary rather
/// than falling back to the raw transcript — the full transcript is kept on
/// the entry regardless, so nothing is lost, but a failed summary is never
/// silently promoted into the summary field. The embedder is skipped
/// entirely when the summary is empty (there's nothing meaningful to
/// embed), which is also what makes the entry invisible to similarity
/// search: `embedding` stays `None`. An embedder failure on a non-empty
/// summary behaves the same way — the entry is still stored, just without
/// an embedding. A long-term storage failure is propagated, since losing
/// the entry there means losing it for good.
pub struct SealPipeline {
    summariser: Arc<dyn Summariser>,
    embedder: Arc<dyn Embedder>,
    ltm: Arc<dyn LtmStore>,
}

impl SealPipeline {
    pub fn new(summariser: Arc<dyn Summariser>, embedder: Arc<dyn Embedder>, ltm: Arc<dyn LtmStore>) -> Self {
        Self {
            summariser,
            embedder,
            ltm,
        }
    }

    pub async fn process(&self, conversation: Conversation) -> Result<MemoryEntry> {
        let summary = match self.summariser.summarise(&conversation).await {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(error = %err, conversation_id = %conversation.id, "summarisation failed, continuing with empty summary");
                String::new()
            }
        };

        let embedding = if summary.is_empty() {
            None
        } else {
            match self.embedder.embed(&summary).await {
                Ok(e) => Some(e),
                Err(err) => {
                    tracing::warn!(error = %err, conversation_id = %conversation.id, "embedding failed, storing without one");
                    None
                }
            }
        };

        let entry = MemoryEntry {
            id: String::new(),
            room_id: conversation.room_id.clone(),
            sender_id: conversation.sender_id.clone(),
            summary,
            embedding,
            messages: conversation.messages.clone(),
            sealed_at: Utc::now(),
            metadata: HashMap::new(),
        };

        self.ltm.store(entry.clone()).await?;
        Ok(entry)
    }
}

/// Periodically sweeps the conversation tracker for cooldown-expired
/// conversations and seals each one. `run` blocks until cancelled via the
/// shared `CancellationToken`; `stop` is idempotent.
pub struct SealRunner {
    tracker: Arc<ConversationTracker>,
    pipeline: Arc<SealPipeline>,
    interval: Duration,
    cancel: CancellationToken,
}

impl SealRunner {
    pub fn new(tracker: Arc<ConversationTracker>, pipeline: Arc<SealPipeline>, interval: Duration) -> Self {
        Self {
            tracker,
            pipeline,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("seal runner stopping");
                    return;
                }
                _ = ticker.tick() => {
                    let sealed = self.tracker.seal_expired(Utc::now());
                    for conversation in sealed {
                        if let Err(err) = self.pipeline.process(conversation).await {
                            tracing::warn!(error = %err, "failed to seal expired conversation");
                        }
                    }
                }
            }
        }
    }

    /// Idempotent: calling `stop` more than once is a no-op after the first.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}
