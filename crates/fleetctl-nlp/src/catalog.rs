use std::collections::HashSet;

/// A single action the classifier is allowed to emit.
#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    pub key: &'static str,
    pub description: &'static str,
    /// Read-only actions are the ones a `conversational` response may list
    /// in `read_queries` for the host to execute without an approval gate.
    pub read_only: bool,
}

/// The fixed catalogue of actions the classifier may emit. Keeping this
/// static (rather than dynamically discovered) means a classified action
/// can always be validated without a round trip anywhere else.
pub const ACTIONS: &[ActionSpec] = &[
    ActionSpec { key: "create_agent", description: "Provision a new managed agent", read_only: false },
    ActionSpec { key: "delete_agent", description: "Remove a managed agent", read_only: false },
    ActionSpec { key: "restart_agent", description: "Restart a managed agent's process", read_only: false },
    ActionSpec { key: "disable_agent", description: "Disable a managed agent without deleting it", read_only: false },
    ActionSpec { key: "enable_agent", description: "Re-enable a previously disabled agent", read_only: false },
    ActionSpec { key: "apply_config", description: "Apply a configuration update to an agent", read_only: false },
    ActionSpec { key: "apply_secrets", description: "Apply secrets to an agent", read_only: false },
    ActionSpec { key: "schedule_job", description: "Schedule a recurring or one-off job for an agent", read_only: false },
    ActionSpec { key: "cancel_task", description: "Cancel an in-flight task", read_only: false },
    ActionSpec { key: "status", description: "Report an agent's current status", read_only: true },
    ActionSpec { key: "list_agents", description: "List known managed agents", read_only: true },
    ActionSpec { key: "help", description: "Explain available commands", read_only: true },
];

/// The action-key registry the classifier validates `action`/`steps[].action`
/// against. It is sourced from the same catalogue that a concrete `Provider`
/// renders into its LLM system prompt (see `render_text`) — both sites must
/// share one registry to prevent drift, hence this is a value type callers
/// construct once and pass to both the prompt builder and `Classifier::new`,
/// rather than two independent globals.
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    actions: Vec<ActionSpec>,
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self {
            actions: ACTIONS.to_vec(),
        }
    }
}

impl ActionCatalog {
    pub fn known_keys(&self) -> HashSet<&str> {
        self.actions.iter().map(|a| a.key).collect()
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.actions.iter().any(|a| a.key == key)
    }

    pub fn read_only_keys(&self) -> HashSet<&str> {
        self.actions.iter().filter(|a| a.read_only).map(|a| a.key).collect()
    }

    /// Renders the catalogue as deterministic text for an LLM system
    /// prompt. Same input, same output — no randomness, no wall-clock.
    pub fn render_text(&self) -> String {
        let mut out = String::from("Available actions:\n");
        for action in &self.actions {
            out.push_str(&format!("- {}: {}\n", action.key, action.description));
        }
        out
    }
}
