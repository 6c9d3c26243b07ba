use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, Failure};

/// The outcome of one request, delivered through the response channel.
///
/// A worker sends exactly one `Response` per received message. Failures
/// travel through the same channel as successes; no error ever crosses
/// the worker boundary uncaught.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Success { payload: Value },
    Failure(Failure),
}

impl Response {
    /// Successful response carrying an arbitrary structured payload.
    pub fn success(payload: Value) -> Self {
        Self::Success { payload }
    }

    /// Failed response built from an error at the worker or dispatcher
    /// boundary.
    pub fn from_error(error: &Error) -> Self {
        Self::Failure(Failure::from_error(error))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    /// The success payload, if any.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Response::Success { payload } => Some(payload),
            Response::Failure(_) => None,
        }
    }

    /// The failure value, if any.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Response::Success { .. } => None,
            Response::Failure(failure) => Some(failure),
        }
    }
}

impl From<Failure> for Response {
    fn from(failure: Failure) -> Self {
        Self::Failure(failure)
    }
}

/// Benchmark-mode result: the answer map alongside the grading verdict.
///
/// `score` and `status` are the remote service's response body and HTTP
/// status, captured verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub session_id: String,
    pub tasks_number: u64,
    pub answers: Map<String, Value>,
    pub score: String,
    pub status: u16,
}

impl ScoreCard {
    /// Encodes the card as a response payload.
    pub fn into_value(self) -> Value {
        json!({
            "session_id": self.session_id,
            "tasks_number": self.tasks_number,
            "answers": Value::Object(self.answers),
            "score": self.score,
            "status": self.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn success_exposes_payload() {
        let response = Response::success(json!({"answer": 1}));
        assert!(response.is_success());
        assert_eq!(response.payload().unwrap()["answer"], 1);
        assert!(response.failure().is_none());
    }

    #[test]
    fn failure_exposes_kind() {
        let response = Response::from_error(&Error::UnknownModel("kpi9".into()));
        assert!(!response.is_success());
        assert_eq!(
            response.failure().unwrap().kind,
            FailureKind::UnknownModel
        );
    }

    #[test]
    fn score_card_round_trips() {
        let mut answers = Map::new();
        answers.insert("t1".into(), json!(0.75));
        let card = ScoreCard {
            session_id: "session-9".into(),
            tasks_number: 1,
            answers,
            score: "accuracy 0.75".into(),
            status: 200,
        };
        let value = card.clone().into_value();
        assert_eq!(value["session_id"], "session-9");
        assert_eq!(value["answers"]["t1"], 0.75);
        let decoded: ScoreCard = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, card);
    }
}
