//! Remote service boundaries: the benchmark grader and proxied models.

mod core_trait;
mod http;

pub use core_trait::{BenchmarkApi, RemoteModel};
pub use http::{HttpBenchmark, HttpRemoteModel};

use serde_json::Value;

use crate::error::Error;

/// One fetched batch of benchmark tasks.
///
/// `raw` is the service's reply body, kept untouched; answer payloads are
/// built from a copy so the original is never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskBatch {
    pub session_id: String,
    pub total: u64,
    pub raw: Value,
}

impl TaskBatch {
    /// Parses a benchmark fetch reply of the shape `{id, total, ...}`.
    ///
    /// Session ids arrive as strings or numbers depending on the service
    /// deployment; both are accepted.
    pub fn from_value(raw: Value) -> Result<Self, Error> {
        let session_id = match raw.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(Error::MalformedReply {
                    context: "benchmark task fetch",
                    detail: "reply is missing a session id".into(),
                })
            }
        };
        let total = raw
            .get("total")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::MalformedReply {
                context: "benchmark task fetch",
                detail: "reply is missing a numeric `total`".into(),
            })?;
        Ok(Self {
            session_id,
            total,
            raw,
        })
    }

    /// The flat task list most models are graded on.
    pub fn qas(&self) -> Result<&[Value], Error> {
        self.raw
            .get("qas")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MalformedReply {
                context: "benchmark task fetch",
                detail: "reply is missing a `qas` task list".into(),
            })
    }
}

/// The grading verdict for one submitted answer payload.
///
/// Body and status are captured verbatim; the score text is free-form.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub text: String,
    pub status: u16,
}
