//! The model agent seam.
//!
//! The actual inference capability lives outside this crate: an agent is
//! heavy to construct (it loads weights) and cheap to reuse, so a worker
//! builds one through its [`AgentFactory`] and then keeps it for its whole
//! lifetime, rebuilding only on an explicit reconfiguration.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::config::KpiSettings;
use crate::error::Error;

/// The model-ready representation of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub text: String,
}

impl Observation {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Raw agent output for one observation.
///
/// The shape is the agent's contract; schemes interpret it when building
/// answers (a `score` for classifiers, a `text` for extractive models,
/// a `valid_conll` block for coreference).
pub type Prediction = serde_json::Value;

/// A long-lived inference capability bound to one model.
///
/// Implementations must return exactly one prediction per observation, in
/// observation order; the pipeline zips the two sequences by position.
#[async_trait]
pub trait ModelAgent: Send + Sync {
    /// Runs inference over a batch of observations.
    async fn batch_act(&self, observations: &[Observation]) -> Result<Vec<Prediction>, Error>;
}

/// Future resolving to a freshly constructed agent.
pub type AgentFuture = BoxFuture<'static, Result<Box<dyn ModelAgent>, Error>>;

/// Constructor used for both initial construction and rebuilds.
///
/// The factory receives the worker's current settings so a rebuild after
/// reconfiguration sees the replacement value.
pub type AgentFactory = Arc<dyn Fn(KpiSettings) -> AgentFuture + Send + Sync>;
