pub mod catalog;
pub mod classifier;
pub mod cron;
pub mod error;
pub mod prompt;
pub mod sanitize;
pub mod types;

pub use catalog::{ActionCatalog, ActionSpec};
pub use classifier::{Classifier, Provider};
pub use cron::{is_cron_flag_key, validate_cron, CRON_FLAG_KEYS};
pub use error::{messages, ClassifierError, ProviderError, Result};
pub use prompt::SystemPromptBuilder;
pub use sanitize::sanitize_flags;
pub use types::{
    confidence_tier, ClassifyRequest, ClassifyResponse, ConfidenceTier, Intent, PlanStep, Usage,
    HIGH_THRESHOLD, MID_THRESHOLD,
};
