use std::sync::Arc;

use async_trait::async_trait;
use fleetctl_limits::{RateLimiter, TokenBudget};

use crate::catalog::ActionCatalog;
use crate::cron::{is_cron_flag_key, validate_cron};
use crate::error::{messages, ClassifierError, ProviderError, Result};
use crate::sanitize::sanitize_flags;
use crate::types::{ClassifyRequest, ClassifyResponse, Intent};

pub use crate::types::{confidence_tier, ConfidenceTier, HIGH_THRESHOLD, MID_THRESHOLD};

/// Implemented by a concrete LLM-backed or rule-based classifier. The
/// provider is responsible only for producing a raw `ClassifyResponse` (and
/// for building its own system prompt from the request fields);
/// sanitisation, action-key validation, cron-flag validation, and the
/// confidence policy all happen in `Classifier` around it.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn classify(&self, request: ClassifyRequest) -> std::result::Result<ClassifyResponse, ProviderError>;
}

/// Wraps a `Provider` with rate limiting, token budgeting, and a fixed
/// four-stage response validation pipeline: flag sanitisation, action-key
/// validation, cron-flag validation, confidence policy — always in that
/// order.
pub struct Classifier {
    provider: Arc<dyn Provider>,
    rate_limiter: Arc<RateLimiter>,
    token_budget: Arc<TokenBudget>,
    catalog: Arc<ActionCatalog>,
}

impl Classifier {
    pub fn new(
        provider: Arc<dyn Provider>,
        rate_limiter: Arc<RateLimiter>,
        token_budget: Arc<TokenBudget>,
        catalog: Arc<ActionCatalog>,
    ) -> Self {
        Self {
            provider,
            rate_limiter,
            token_budget,
            catalog,
        }
    }

    /// The full gated entry point: rate limit, then token budget, then the
    /// provider call, then the validation pipeline. Either gate failing
    /// skips the provider call entirely — no tokens are ever spent on a
    /// request that was going to be refused anyway.
    pub async fn classify_checked(&self, request: ClassifyRequest) -> Result<ClassifyResponse> {
        if !self.rate_limiter.allow(&request.sender_id) {
            return Err(ClassifierError::RateLimited);
        }
        if !self.token_budget.allow(&request.sender_id) {
            return Err(ClassifierError::TokenBudgetExhausted);
        }

        let raw = self.provider.classify(request.clone()).await?;

        if let Some(usage) = raw.usage.as_ref() {
            self.token_budget.record_usage(&request.sender_id, usage.total_tokens);
        }

        Ok(validate_response(raw, &self.catalog))
    }
}

/// Runs sanitisation and structural validation on a raw provider response,
/// independent of rate/budget gating — kept as a free function composed of
/// smaller free functions so each rule is unit-testable in isolation.
/// Applies, in order: flag sanitisation, action-key validation, cron-flag
/// validation, confidence policy.
pub fn validate_response(raw: ClassifyResponse, catalog: &ActionCatalog) -> ClassifyResponse {
    let response = sanitize_flags(raw);
    let response = validate_action_keys(response, catalog);
    let response = validate_cron_flags(response);
    apply_confidence_policy(response)
}

/// Rejects an `action`/`steps[].action` that isn't in the known-key set,
/// and rejects an empty plan. Any rejection replaces the whole response
/// with `intent=unknown`, never leaving partial structured fields behind.
fn validate_action_keys(response: ClassifyResponse, catalog: &ActionCatalog) -> ClassifyResponse {
    match response.intent() {
        Intent::Command => {
            if let Some(action) = response.action.as_deref() {
                if !action.is_empty() && !catalog.is_known(action) {
                    let msg = format!("\"{action}\" isn't a command I recognise.");
                    return response.into_unknown(msg);
                }
            }
            response
        }
        Intent::Plan => {
            let steps = match response.steps.as_ref() {
                Some(steps) if !steps.is_empty() => steps,
                _ => return response.into_unknown("I need more detail before I can plan that out."),
            };
            if let Some(bad) = steps.iter().find(|s| !catalog.is_known(&s.action)) {
                let msg = format!("\"{}\" isn't a command I recognise.", bad.action);
                return response.into_unknown(msg);
            }
            // Defensively clear any stray top-level action on a plan response.
            ClassifyResponse {
                action: None,
                ..response
            }
        }
        Intent::Conversational | Intent::Unknown => response,
    }
}

/// Validates every flag whose key is in the recognised cron-flag set
/// (`cron`, `schedule`, `cron-expr`), at the top level and inside every
/// plan step. The first invalid expression rewrites the whole response to
/// `intent=unknown`.
fn validate_cron_flags(response: ClassifyResponse) -> ClassifyResponse {
    let mut invalid: Option<String> = None;

    if let Some(flags) = response.flags.as_ref() {
        invalid = invalid.or_else(|| first_invalid_cron(flags));
    }
    if invalid.is_none() {
        if let Some(steps) = response.steps.as_ref() {
            for step in steps {
                if let Some(flags) = step.flags.as_ref() {
                    if let Some(reason) = first_invalid_cron(flags) {
                        invalid = Some(reason);
                        break;
                    }
                }
            }
        }
    }

    match invalid {
        Some(_) => response.into_unknown("That schedule doesn't look like a valid cron expression — mind rephrasing it?"),
        None => response,
    }
}

fn first_invalid_cron(flags: &std::collections::HashMap<String, serde_json::Value>) -> Option<String> {
    for (key, value) in flags {
        if !is_cron_flag_key(key) {
            continue;
        }
        let Some(expr) = value.as_str() else {
            return Some(format!("{key} must be a string"));
        };
        if let Err(reason) = validate_cron(expr) {
            return Some(reason);
        }
    }
    None
}

/// Confidence policy, applied only to `intent=command` responses that carry
/// a confidence score (the only intent that carries one):
/// `>= HIGH` passes through unchanged, `[MID, HIGH)` preserves structured
/// fields but overwrites `response` with a confirmation prompt, and
/// `< MID` downgrades the whole response to `unknown` with a friendly
/// clarification that still preserves the original `explanation` for
/// traceability.
fn apply_confidence_policy(response: ClassifyResponse) -> ClassifyResponse {
    if response.intent() != Intent::Command {
        return response;
    }
    let Some(confidence) = response.confidence else {
        return response;
    };

    match confidence_tier(confidence) {
        ConfidenceTier::High => response,
        ConfidenceTier::Mid => {
            let explanation = response.explanation.clone().unwrap_or_else(|| "do that".to_string());
            ClassifyResponse {
                response: Some(format!("I think you want to: {explanation} — is that right?")),
                ..response
            }
        }
        ConfidenceTier::Low => {
            let explanation = response.explanation.clone();
            let message = format!(
                "I'm not confident I understood that correctly. {}",
                messages::HELP_HINT
            );
            let mut rewritten = response.into_unknown(message);
            rewritten.explanation = explanation;
            rewritten
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlanStep;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    struct StubProvider {
        response: ClassifyResponse,
    }

    #[async_trait]
    impl Provider for StubProvider {
        async fn classify(&self, _request: ClassifyRequest) -> std::result::Result<ClassifyResponse, ProviderError> {
            Ok(self.response.clone())
        }
    }

    fn request() -> ClassifyRequest {
        ClassifyRequest {
            message: "restart the worker".into(),
            catalog_text: String::new(),
            sender_id: "@a:example".into(),
            known_agents: vec![],
            known_templates: vec![],
            history: None,
            canonical_agents: vec![],
        }
    }

    fn command(action: &str, confidence: f32) -> ClassifyResponse {
        ClassifyResponse {
            intent: Some(Intent::Command),
            action: Some(action.to_string()),
            confidence: Some(confidence),
            explanation: Some("restart the worker agent".into()),
            ..Default::default()
        }
    }

    #[test]
    fn unknown_action_becomes_unknown_intent() {
        let catalog = ActionCatalog::default();
        let result = validate_response(command("launch_missiles", 0.95), &catalog);
        assert_eq!(result.intent(), Intent::Unknown);
        assert!(result.response.unwrap().contains("launch_missiles"));
    }

    #[test]
    fn empty_plan_steps_become_unknown_intent() {
        let catalog = ActionCatalog::default();
        let raw = ClassifyResponse {
            intent: Some(Intent::Plan),
            steps: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(validate_response(raw, &catalog).intent(), Intent::Unknown);
    }

    #[test]
    fn plan_with_unknown_step_action_becomes_unknown_intent() {
        let catalog = ActionCatalog::default();
        let raw = ClassifyResponse {
            intent: Some(Intent::Plan),
            steps: Some(vec![
                PlanStep { action: "status".into(), ..Default::default() },
                PlanStep { action: "launch_missiles".into(), ..Default::default() },
            ]),
            ..Default::default()
        };
        assert_eq!(validate_response(raw, &catalog).intent(), Intent::Unknown);
    }

    #[test]
    fn unknown_gating_ignores_reported_confidence() {
        let catalog = ActionCatalog::default();
        // High confidence must not rescue an unknown action or empty plan.
        let result = validate_response(command("launch_missiles", 0.99), &catalog);
        assert_eq!(result.intent(), Intent::Unknown);
    }

    #[test]
    fn injected_flags_are_stripped_before_validation() {
        let catalog = ActionCatalog::default();
        let mut flags = HashMap::new();
        flags.insert("name".to_string(), json!("kumo"));
        flags.insert("_approved".to_string(), json!("true"));
        let raw = ClassifyResponse {
            flags: Some(flags),
            ..command("create_agent", 0.95)
        };
        let result = validate_response(raw, &catalog);
        assert_eq!(result.intent(), Intent::Command);
        let flags = result.flags.unwrap();
        assert!(flags.contains_key("name"));
        assert!(!flags.contains_key("_approved"));
    }

    #[test]
    fn invalid_cron_flag_becomes_unknown_intent() {
        let catalog = ActionCatalog::default();
        let mut flags = HashMap::new();
        flags.insert("cron".to_string(), json!("every day"));
        let raw = ClassifyResponse {
            flags: Some(flags),
            ..command("schedule_job", 0.95)
        };
        assert_eq!(validate_response(raw, &catalog).intent(), Intent::Unknown);
    }

    #[test]
    fn valid_cron_flag_passes_through() {
        let catalog = ActionCatalog::default();
        let mut flags = HashMap::new();
        flags.insert("cron".to_string(), json!("*/15 * * * *"));
        let raw = ClassifyResponse {
            flags: Some(flags),
            ..command("schedule_job", 0.95)
        };
        assert_eq!(validate_response(raw, &catalog).intent(), Intent::Command);
    }

    #[test]
    fn confidence_high_passes_through_unchanged() {
        let catalog = ActionCatalog::default();
        let result = validate_response(command("status", 0.8), &catalog);
        assert_eq!(result.intent(), Intent::Command);
        assert!(result.response.is_none());
    }

    #[test]
    fn confidence_just_below_high_is_confirmation_prompt() {
        let catalog = ActionCatalog::default();
        let result = validate_response(command("status", 0.799), &catalog);
        assert_eq!(result.intent(), Intent::Command);
        assert!(result.response.unwrap().contains("is that right?"));
        assert!(result.action.is_some());
    }

    #[test]
    fn confidence_exactly_mid_is_confirmation_prompt() {
        let catalog = ActionCatalog::default();
        let result = validate_response(command("status", 0.5), &catalog);
        assert_eq!(result.intent(), Intent::Command);
        assert!(result.response.unwrap().contains("is that right?"));
    }

    #[test]
    fn confidence_just_below_mid_downgrades_to_unknown() {
        let catalog = ActionCatalog::default();
        let result = validate_response(command("status", 0.499), &catalog);
        assert_eq!(result.intent(), Intent::Unknown);
        assert_eq!(result.explanation.as_deref(), Some("restart the worker agent"));
        assert!(result.action.is_none());
    }

    #[tokio::test]
    async fn classify_checked_gates_on_rate_limit() {
        let provider = Arc::new(StubProvider { response: command("status", 0.9) });
        let rate_limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(60)));
        let token_budget = Arc::new(TokenBudget::new(0));
        let classifier = Classifier::new(provider, rate_limiter, token_budget, Arc::new(ActionCatalog::default()));

        assert!(classifier.classify_checked(request()).await.is_ok());
        assert!(matches!(
            classifier.classify_checked(request()).await,
            Err(ClassifierError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn classify_checked_gates_on_token_budget() {
        let provider = Arc::new(StubProvider { response: command("status", 0.9) });
        let rate_limiter = Arc::new(RateLimiter::with_defaults());
        let token_budget = Arc::new(TokenBudget::new(1));
        token_budget.record_usage("@a:example", 1);
        let classifier = Classifier::new(provider, rate_limiter, token_budget, Arc::new(ActionCatalog::default()));

        assert!(matches!(
            classifier.classify_checked(request()).await,
            Err(ClassifierError::TokenBudgetExhausted)
        ));
    }

    #[tokio::test]
    async fn classify_checked_maps_provider_upstream_rate_limit() {
        struct FailingProvider;
        #[async_trait]
        impl Provider for FailingProvider {
            async fn classify(&self, _request: ClassifyRequest) -> std::result::Result<ClassifyResponse, ProviderError> {
                Err(ProviderError::UpstreamRateLimit)
            }
        }
        let classifier = Classifier::new(
            Arc::new(FailingProvider),
            Arc::new(RateLimiter::with_defaults()),
            Arc::new(TokenBudget::new(100_000)),
            Arc::new(ActionCatalog::default()),
        );
        assert!(matches!(
            classifier.classify_checked(request()).await,
            Err(ClassifierError::UpstreamRateLimit)
        ));
    }

    #[test]
    fn ambiguous_schedule_style_response_from_provider_is_unknown() {
        // Mirrors the "set up Saito to run daily" scenario: a provider
        // that (correctly) refuses to guess a time-of-day returns unknown
        // directly; the pipeline must not force a cron flag to appear.
        let catalog = ActionCatalog::default();
        let raw = ClassifyResponse {
            intent: Some(Intent::Unknown),
            response: Some("What time of day should this run? (e.g. 9am UTC)".into()),
            ..Default::default()
        };
        let result = validate_response(raw, &catalog);
        assert_eq!(result.intent(), Intent::Unknown);
        let response = result.response.unwrap().to_lowercase();
        assert!(["time", "hour", "am", "pm", "utc", "when"]
            .iter()
            .any(|kw| response.contains(kw)));
    }
}
