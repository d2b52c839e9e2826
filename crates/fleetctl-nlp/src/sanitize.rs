use crate::types::ClassifyResponse;

/// Strips any flag whose key starts with `_` from a classifier response,
/// at the top level and inside every plan step. This is a prompt-injection
/// defense: a hostile user embedding text like `_admin_override: true`
/// into their message should never be able to set a flag the classifier
/// itself didn't intend to emit. A `None` flags map stays `None` — this
/// never invents an empty map where the provider sent none.
pub fn sanitize_flags(mut response: ClassifyResponse) -> ClassifyResponse {
    if let Some(flags) = response.flags.as_mut() {
        flags.retain(|key, _| !key.starts_with('_'));
    }
    if let Some(steps) = response.steps.as_mut() {
        for step in steps.iter_mut() {
            if let Some(flags) = step.flags.as_mut() {
                flags.retain(|key, _| !key.starts_with('_'));
            }
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Intent, PlanStep};
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn strips_underscore_prefixed_keys() {
        let mut flags = HashMap::new();
        flags.insert("name".to_string(), json!("kumo"));
        flags.insert("_approved".to_string(), json!(true));

        let response = ClassifyResponse {
            intent: Some(Intent::Command),
            action: Some("create_agent".into()),
            flags: Some(flags),
            confidence: Some(0.95),
            ..Default::default()
        };

        let sanitized = sanitize_flags(response);
        let flags = sanitized.flags.unwrap();
        assert!(flags.contains_key("name"));
        assert!(!flags.contains_key("_approved"));
        assert_eq!(flags.len(), 1);
    }

    #[test]
    fn leaves_clean_flags_untouched() {
        let mut flags = HashMap::new();
        flags.insert("cron".to_string(), json!("0 9 * * *"));
        let response = ClassifyResponse {
            flags: Some(flags),
            ..Default::default()
        };
        let sanitized = sanitize_flags(response);
        assert_eq!(sanitized.flags.unwrap().len(), 1);
    }

    #[test]
    fn nil_flags_stay_nil() {
        let response = ClassifyResponse::default();
        assert!(sanitize_flags(response).flags.is_none());
    }

    #[test]
    fn strips_injected_flags_from_every_plan_step() {
        let mut bad_flags = HashMap::new();
        bad_flags.insert("_skip_approval".to_string(), json!(true));
        bad_flags.insert("cron".to_string(), json!("0 9 * * *"));

        let response = ClassifyResponse {
            intent: Some(Intent::Plan),
            steps: Some(vec![PlanStep {
                action: "schedule_job".into(),
                flags: Some(bad_flags),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let sanitized = sanitize_flags(response);
        let steps = sanitized.steps.unwrap();
        let step_flags = steps[0].flags.as_ref().unwrap();
        assert!(!step_flags.contains_key("_skip_approval"));
        assert!(step_flags.contains_key("cron"));
    }
}
