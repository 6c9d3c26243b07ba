use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for dispatch, pipeline, and proxy operations.
///
/// Variants mirror where in the request lifecycle a failure can occur:
/// before any channel interaction (`Validation`, `UnknownModel`), while
/// talking to a remote service (`Upstream`, `MalformedReply`), inside the
/// model agent (`Inference`, `AgentInit`), or in the channel plumbing
/// itself (`ChannelClosed`).
#[derive(Debug, Error)]
pub enum Error {
    /// The request was rejected before reaching any worker.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The model identifier is not present in the registry.
    #[error("unknown model identifier `{0}`")]
    UnknownModel(String),

    /// A remote service could not be reached or answered outside 2xx.
    #[error("{context} request failed")]
    Upstream {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// A remote service answered with a body this crate cannot use.
    #[error("malformed reply from {context}: {detail}")]
    MalformedReply {
        context: &'static str,
        detail: String,
    },

    /// The model agent failed while producing predictions.
    #[error("model agent failed: {0}")]
    Inference(String),

    /// The model agent could not be constructed.
    #[error("model agent initialization failed: {0}")]
    AgentInit(String),

    /// A worker received a message shape it cannot classify.
    #[error("unrecognized input: {0}")]
    UnrecognizedInput(String),

    /// The reqwest client itself could not be built.
    #[error("failed to construct http client")]
    Client(#[source] reqwest::Error),

    /// The worker's channel pair is gone; the worker has stopped.
    #[error("worker channel closed")]
    ChannelClosed,
}

impl Error {
    /// Creates a `Validation` error from any printable message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an `Inference` error from any printable message.
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    /// Classifies this error for the serializable failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Validation(_) => FailureKind::Validation,
            Error::UnknownModel(_) => FailureKind::UnknownModel,
            Error::Upstream { .. } | Error::MalformedReply { .. } => FailureKind::Upstream,
            Error::Inference(_) | Error::AgentInit(_) => FailureKind::Inference,
            Error::UnrecognizedInput(_) => FailureKind::UnrecognizedInput,
            Error::Client(_) | Error::ChannelClosed => FailureKind::Internal,
        }
    }
}

/// Coarse classification of a [`Failure`], stable across the wire.
///
/// The façade layer maps `Validation` and `UnknownModel` to client-error
/// statuses and the remaining kinds to server-side failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    UnknownModel,
    Upstream,
    Inference,
    UnrecognizedInput,
    Internal,
}

/// Structured failure payload returned through the response channel.
///
/// Every error crossing the worker or dispatcher boundary is flattened
/// into this shape; callers always receive a response, never a raw error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// Source chain of the underlying error, outermost first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl Failure {
    /// Flattens an [`Error`] and its source chain into a failure value.
    pub fn from_error(error: &Error) -> Self {
        let mut causes = Vec::new();
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            kind: error.kind(),
            message: error.to_string(),
            cause: if causes.is_empty() {
                None
            } else {
                Some(causes.join(": "))
            },
        }
    }

    /// Wraps a caught panic payload message.
    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Internal,
            message: format!("worker task panicked: {}", message.into()),
            cause: None,
        }
    }
}

impl From<&Error> for Failure {
    fn from(error: &Error) -> Self {
        Failure::from_error(error)
    }
}
