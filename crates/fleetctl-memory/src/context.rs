use std::sync::Arc;

use fleetctl_core::{RoomId, SenderId};

use crate::ltm::LtmStore;
use crate::seal::Embedder;
use crate::stm::{estimate_tokens, ConversationTracker};
use crate::types::{Message, Role};

#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    pub max_tokens: usize,
    pub ltm_top_k: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            ltm_top_k: 3,
        }
    }
}

/// Merges the live short-term conversation with relevant long-term memory
/// entries into one budgeted list of messages for a classifier or LLM
/// prompt.
///
/// STM has priority over the token budget: if STM alone exceeds it, the
/// oldest STM messages are dropped (always keeping at least one) rather
/// than ever dropping from the end; whatever budget remains after STM is
/// allocated to LTM entries greedily, in the order the store returned
/// them. Failures reaching the embedder or long-term store are logged and
/// swallowed — STM is always returned even if LTM is unavailable. Returns
/// `None` when there is nothing to assemble (no active conversation and no
/// usable long-term memory).
pub struct ContextAssembler {
    tracker: Arc<ConversationTracker>,
    embedder: Arc<dyn Embedder>,
    ltm: Arc<dyn LtmStore>,
    config: AssemblerConfig,
}

impl ContextAssembler {
    pub fn new(
        tracker: Arc<ConversationTracker>,
        embedder: Arc<dyn Embedder>,
        ltm: Arc<dyn LtmStore>,
        config: AssemblerConfig,
    ) -> Self {
        Self {
            tracker,
            embedder,
            ltm,
            config,
        }
    }

    pub async fn assemble(
        &self,
        room_id: &RoomId,
        sender_id: &SenderId,
        current_message: &str,
    ) -> Option<Vec<Message>> {
        let mut stm_messages = self
            .tracker
            .get_active_conversation(room_id, sender_id)
            .map(|c| c.messages)
            .unwrap_or_default();

        // STM priority: drop the oldest STM messages until within budget,
        // but never below one message.
        while estimate_tokens(&stm_messages) > self.config.max_tokens && stm_messages.len() > 1 {
            stm_messages.remove(0);
        }
        let stm_tokens = estimate_tokens(&stm_messages);

        let remaining_budget = self.config.max_tokens.saturating_sub(stm_tokens);
        let ltm_messages = self.render_ltm(room_id, sender_id, current_message, remaining_budget).await;

        if ltm_messages.is_empty() && stm_messages.is_empty() {
            return None;
        }

        let mut messages = ltm_messages;
        messages.extend(stm_messages);
        Some(messages)
    }

    async fn render_ltm(
        &self,
        room_id: &RoomId,
        sender_id: &SenderId,
        current_message: &str,
        token_budget: usize,
    ) -> Vec<Message> {
        if token_budget == 0 {
            return Vec::new();
        }

        let embedding = match self.embedder.embed(current_message).await {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "context assembler: embedding query failed, skipping long-term memory");
                return Vec::new();
            }
        };

        let results = match self
            .ltm
            .search_by_embedding(room_id, sender_id, &embedding, self.config.ltm_top_k)
            .await
        {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(error = %err, "context assembler: long-term memory search failed, skipping");
                return Vec::new();
            }
        };

        let mut rendered = Vec::new();
        let mut used_tokens = 0usize;
        for scored in results {
            if scored.entry.summary.is_empty() {
                continue;
            }
            let text = format!(
                "Previous relevant conversation (from {}): {}",
                scored.entry.sealed_at.format("%Y-%m-%d"),
                scored.entry.summary
            );
            let message = Message::new(Role::System, text, scored.entry.sealed_at);
            let message_tokens = estimate_tokens(std::slice::from_ref(&message));
            if used_tokens + message_tokens > token_budget {
                break;
            }
            used_tokens += message_tokens;
            rendered.push(message);
        }
        rendered
    }
}
