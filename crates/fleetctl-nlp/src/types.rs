use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Everything the classifier needs to build a deterministic system prompt
/// and interpret the provider's response in context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    /// The raw, untrusted chat message.
    pub message: String,
    /// The full command catalogue rendered as text for the prompt.
    pub catalog_text: String,
    /// Shown to the model only for traceability; the prompt instructs it
    /// to ignore this field when deciding what to do.
    pub sender_id: String,
    pub known_agents: Vec<String>,
    pub known_templates: Vec<String>,
    #[serde(default)]
    pub history: Option<String>,
    #[serde(default)]
    pub canonical_agents: Vec<String>,
}

/// Reported token counts and latency for a single classification call, when
/// the provider makes them available.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub latency_ms: Option<u64>,
}

/// One step of a multi-step plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanStep {
    pub action: String,
    #[serde(default)]
    pub args: HashMap<String, Value>,
    #[serde(default)]
    pub flags: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// What the classifier decided the message means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Command,
    Conversational,
    Unknown,
    Plan,
}

/// The structured result of classifying one message. Every field besides
/// `intent` is optional — which ones are populated depends on `intent`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub intent: Option<Intent>,

    // intent = command
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub args: HashMap<String, Value>,
    #[serde(default)]
    pub flags: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,

    // intent = plan
    #[serde(default)]
    pub steps: Option<Vec<PlanStep>>,

    // intent = conversational / unknown
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub read_queries: Option<Vec<String>>,

    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ClassifyResponse {
    pub fn intent(&self) -> Intent {
        self.intent.unwrap_or(Intent::Unknown)
    }

    /// Replaces the whole response with an `unknown` intent carrying
    /// `message` as its user-visible text. Used by every rewrite rule in
    /// `crate::classifier` so a rejected response can never leak partial
    /// structured fields (a stale `action`, a plan's `steps`, ...).
    pub fn into_unknown(self, message: impl Into<String>) -> Self {
        ClassifyResponse {
            intent: Some(Intent::Unknown),
            response: Some(message.into()),
            usage: self.usage,
            ..Default::default()
        }
    }
}

/// Confidence tier: drives whether a classified action is auto-executed,
/// surfaced for confirmation, or rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Mid,
    Low,
}

pub const HIGH_THRESHOLD: f32 = 0.80;
pub const MID_THRESHOLD: f32 = 0.50;

/// Classifies a raw confidence score into a tier using half-open bounds:
/// `[0.80, 1.0]` is High, `[0.50, 0.80)` is Mid, everything below is Low.
pub fn confidence_tier(score: f32) -> ConfidenceTier {
    if score >= HIGH_THRESHOLD {
        ConfidenceTier::High
    } else if score >= MID_THRESHOLD {
        ConfidenceTier::Mid
    } else {
        ConfidenceTier::Low
    }
}
