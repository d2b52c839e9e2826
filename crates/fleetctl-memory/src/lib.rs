pub mod context;
pub mod error;
pub mod ltm;
pub mod seal;
pub mod stm;
pub mod types;

pub use context::{AssemblerConfig, ContextAssembler};
pub use error::{MemoryError, Result};
pub use ltm::{cosine_similarity, LtmStore, NoopLtm, SqlLtmStore};
pub use seal::{Embedder, NoopEmbedder, NoopSummariser, SealPipeline, SealRunner, Summariser};
pub use stm::{estimate_tokens, ConversationTracker, TrackerConfig};
pub use types::{Conversation, MemoryEntry, Message, Role, ScoredMemory};
