use serde_json::{Map, Value};

use crate::agent::{Observation, Prediction};
use crate::remote::TaskBatch;

/// Per-invocation record of everything a pipeline run produced.
///
/// A fresh state is created for each request and owned exclusively by the
/// worker executing it; after the response is sent the worker may retain
/// it read-only for diagnostic logging, but it is never reused.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub session_id: Option<String>,
    pub tasks_number: Option<u64>,
    pub tasks: Option<TaskBatch>,
    pub observations: Vec<Observation>,
    pub predictions: Vec<Prediction>,
    pub answers: Option<Map<String, Value>>,
    pub score: Option<String>,
    pub status: Option<u16>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }
}
