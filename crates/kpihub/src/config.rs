//! Immutable settings values and the file/env loader.
//!
//! Workers receive their settings as owned values at construction time;
//! reconfiguration replaces the whole value rather than mutating shared
//! state. The loader layers defaults, an optional file source, and
//! `KPIHUB_`-prefixed environment variables, then validates every entry
//! against the static scheme registry before anything is spawned.

use std::collections::BTreeMap;
use std::path::Path;

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::kpis;

/// Configuration loading or validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

/// Per-model settings for a locally served KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSettings {
    /// Benchmark service endpoint for task fetch and answer submission.
    pub rest_url: String,

    /// Task count used when a benchmark run does not name one.
    #[serde(default = "default_tasks_number")]
    pub test_tasks_number: u64,

    /// Maximum observations per agent call; 0 disables partitioning.
    #[serde(default)]
    pub observations_batch_size: usize,

    /// Free-form settings handed to the agent factory untouched.
    #[serde(default)]
    pub agent_settings: Value,
}

fn default_tasks_number() -> u64 {
    10
}

impl KpiSettings {
    pub fn new(rest_url: impl Into<String>) -> Self {
        Self {
            rest_url: rest_url.into(),
            test_tasks_number: default_tasks_number(),
            observations_batch_size: 0,
            agent_settings: Value::Null,
        }
    }

    pub fn with_tasks_number(mut self, tasks_number: u64) -> Self {
        self.test_tasks_number = tasks_number;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.observations_batch_size = batch_size;
        self
    }

    pub fn with_agent_settings(mut self, agent_settings: Value) -> Self {
        self.agent_settings = agent_settings;
        self
    }
}

/// Per-model settings for a proxied (router) KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterSettings {
    /// Remote endpoint answering benchmark-style GETs.
    pub rest_url_get: String,

    /// Remote endpoint answering pair-scoring POSTs.
    pub rest_url_post: String,
}

impl RouterSettings {
    pub fn new(rest_url_get: impl Into<String>, rest_url_post: impl Into<String>) -> Self {
        Self {
            rest_url_get: rest_url_get.into(),
            rest_url_post: rest_url_post.into(),
        }
    }
}

/// One locally served model in the configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiEntry {
    /// Name resolved through [`kpis::scheme_for`] at startup.
    pub scheme: String,

    #[serde(flatten)]
    pub settings: KpiSettings,
}

/// The whole configuration document consumed by
/// [`Dispatcher::from_config`](crate::Dispatcher::from_config).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Emit the retained pipeline state after each benchmark run.
    #[serde(default)]
    pub log_state: bool,

    #[serde(default)]
    pub kpis: BTreeMap<String, KpiEntry>,

    #[serde(default)]
    pub routers: BTreeMap<String, RouterSettings>,
}

/// Loads and validates a [`HubConfig`] from a file plus the environment.
///
/// Environment variables use the `KPIHUB_` prefix with `__` as the level
/// separator, e.g. `KPIHUB_KPIS__KPI1__REST_URL=http://bench/kpi1`.
pub fn load_config(path: &Path) -> Result<HubConfig, ConfigError> {
    let builder = Config::builder()
        .set_default("log_state", false)?
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("KPIHUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let loaded = builder.build()?;
    let hub: HubConfig = loaded
        .try_deserialize()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    validate_config(&hub)?;
    Ok(hub)
}

/// Checks every configured model against the static scheme registry and
/// rejects unusable endpoints before any worker is spawned.
pub fn validate_config(config: &HubConfig) -> Result<(), ConfigError> {
    for (id, entry) in &config.kpis {
        if kpis::scheme_for(&entry.scheme).is_none() {
            return Err(ConfigError::Validation(format!(
                "model `{id}` names unknown scheme `{}`; known schemes: {}",
                entry.scheme,
                kpis::SCHEME_NAMES.join(", ")
            )));
        }
        if entry.settings.rest_url.is_empty() {
            return Err(ConfigError::Validation(format!(
                "model `{id}` has an empty rest_url"
            )));
        }
        if entry.settings.test_tasks_number == 0 {
            return Err(ConfigError::Validation(format!(
                "model `{id}` has a zero default task count"
            )));
        }
    }
    for (id, settings) in &config.routers {
        if settings.rest_url_get.is_empty() || settings.rest_url_post.is_empty() {
            return Err(ConfigError::Validation(format!(
                "router `{id}` has an empty endpoint url"
            )));
        }
        if config.kpis.contains_key(id) {
            return Err(ConfigError::Validation(format!(
                "`{id}` is declared both as a kpi and as a router"
            )));
        }
    }
    Ok(())
}
