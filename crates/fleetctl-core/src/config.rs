use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DB_PATH: &str = "./fleetctl.db";
pub const DEFAULT_NLP_RATE_LIMIT: u32 = 20;
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 30;

/// Top-level config (fleetctl.toml + FLEETCTL_* env overrides).
///
/// Only the keys listed here are recognised; unrecognised TOML/env keys are
/// silently ignored by `figment`, for forward-compatible config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetctlConfig {
    pub matrix_homeserver: String,

    #[serde(default = "default_database_path")]
    pub database_path: String,

    pub master_key: Option<String>,

    #[serde(default)]
    pub enable_docker: bool,

    #[serde(default = "default_docker_network")]
    pub docker_network: String,

    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval: u64,

    #[serde(default = "default_nlp_model")]
    pub nlp_model: String,

    pub nlp_endpoint: Option<String>,

    #[serde(default = "default_nlp_rate_limit")]
    pub nlp_rate_limit: u32,

    #[serde(default)]
    pub nlp_token_budget: u64,

    pub audit_room_id: Option<String>,

    pub kuze_base_url: Option<String>,

    #[serde(default)]
    pub kuze_ttl: u64,

    #[serde(default = "default_agent_image")]
    pub default_agent_image: String,

    pub templates_fs: Option<String>,
}

impl Default for FleetctlConfig {
    fn default() -> Self {
        Self {
            matrix_homeserver: String::new(),
            database_path: default_database_path(),
            master_key: None,
            enable_docker: false,
            docker_network: default_docker_network(),
            reconcile_interval: default_reconcile_interval(),
            nlp_model: default_nlp_model(),
            nlp_endpoint: None,
            nlp_rate_limit: default_nlp_rate_limit(),
            nlp_token_budget: 0,
            audit_room_id: None,
            kuze_base_url: None,
            kuze_ttl: 0,
            default_agent_image: default_agent_image(),
            templates_fs: None,
        }
    }
}

fn default_database_path() -> String {
    DEFAULT_DB_PATH.to_string()
}
fn default_docker_network() -> String {
    "fleetctl".to_string()
}
fn default_reconcile_interval() -> u64 {
    DEFAULT_RECONCILE_INTERVAL_SECS
}
fn default_nlp_model() -> String {
    "fleetctl-classifier".to_string()
}
fn default_nlp_rate_limit() -> u32 {
    DEFAULT_NLP_RATE_LIMIT
}
fn default_agent_image() -> String {
    "fleetctl/agent:latest".to_string()
}

impl FleetctlConfig {
    /// Load config from a TOML file with FLEETCTL_* env var overrides.
    ///
    /// Checks, in order: the explicit path argument, then
    /// `./fleetctl.toml`. Unknown keys in either source are ignored.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or("fleetctl.toml");

        let config: FleetctlConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("FLEETCTL_"))
            .extract()
            .map_err(|e| crate::error::FleetError::Configuration(e.to_string()))?;

        Ok(config)
    }
}
