//! Concrete scoring targets and the static scheme registry.
//!
//! Each scheme knows how one model family wants its tasks shaped and its
//! predictions graded. The registry is a compile-time table; unknown
//! names fail configuration validation at startup instead of surfacing as
//! lookup errors at request time.

mod coref;
mod insults;
mod ner;
mod paraphrase;
mod squad;

pub use coref::CorefScheme;
pub use insults::InsultsScheme;
pub use ner::NerScheme;
pub use paraphrase::ParaphraseScheme;
pub use squad::SquadScheme;

use std::sync::Arc;

use serde_json::Value;

use crate::error::Error;
use crate::pipeline::KpiScheme;

/// Every scheme name the registry can resolve.
pub const SCHEME_NAMES: &[&str] = &["insults", "paraphrase", "ner", "squad", "coref"];

/// Resolves a scheme name to its implementation.
pub fn scheme_for(name: &str) -> Option<Arc<dyn KpiScheme>> {
    match name {
        "insults" => Some(Arc::new(InsultsScheme)),
        "paraphrase" => Some(Arc::new(ParaphraseScheme)),
        "ner" => Some(Arc::new(NerScheme)),
        "squad" => Some(Arc::new(SquadScheme)),
        "coref" => Some(Arc::new(CorefScheme)),
        _ => None,
    }
}

/// Task ids arrive as strings or numbers depending on the service.
pub(crate) fn task_id(task: &Value) -> Result<String, Error> {
    match task.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(Error::MalformedReply {
            context: "benchmark task fetch",
            detail: "task record is missing an id".into(),
        }),
    }
}

pub(crate) fn task_str<'a>(task: &'a Value, field: &'static str) -> Result<&'a str, Error> {
    task.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::MalformedReply {
            context: "benchmark task fetch",
            detail: format!("task record is missing `{field}`"),
        })
}
