//! Long-lived execution units, one per registered model.
//!
//! A worker owns its model agent and pipeline exclusively and runs an
//! infinite receive-process-reply loop over its channel pair: receive one
//! message, produce exactly one response, repeat. The loop blocks only on
//! the request channel; there is no internal concurrency, which makes
//! at-most-one agent invocation per model structural.
//!
//! Failures never terminate a worker. Errors become failure responses at
//! the loop boundary, and a panic inside request handling is caught and
//! reported the same way.

mod handle;
mod local;
mod router;

pub use handle::WorkerHandle;
pub use local::{AgentInit, Worker, WorkerSpec};
pub use router::{RouterSpec, RouterWorker};

use std::any::Any;

use crate::config::{KpiSettings, RouterSettings};
use crate::request::Request;

/// Everything a worker can receive over its request channel.
#[derive(Debug, Clone)]
pub(crate) enum WorkerMessage {
    Request(Request),
    Reconfigure(SettingsUpdate),
}

/// A replacement settings value, applied between requests.
///
/// The variant must match the worker flavor; a mismatch is answered with
/// a failure response and leaves the worker untouched.
#[derive(Debug, Clone)]
pub enum SettingsUpdate {
    /// Replace a local worker's settings, optionally rebuilding its agent
    /// before the next request is accepted.
    Kpi {
        settings: KpiSettings,
        reinit_agent: bool,
    },

    /// Replace a router worker's endpoints.
    Router(RouterSettings),
}

/// Best-effort extraction of a caught panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
