use serde_json::{json, Map, Value};

use super::{task_id, task_str};
use crate::agent::{Observation, Prediction};
use crate::error::Error;
use crate::pipeline::KpiScheme;
use crate::remote::TaskBatch;

/// Paraphrase detection over phrase pairs.
///
/// The agent sees both phrases framed under a dummy title; benchmark
/// answers are the score thresholded to 0/1, single-shot answers keep the
/// raw score. Submissions use the `{sessionId, answers}` payload instead
/// of the merged task copy.
pub struct ParaphraseScheme;

impl KpiScheme for ParaphraseScheme {
    fn name(&self) -> &'static str {
        "paraphrase"
    }

    fn observations(&self, tasks: &TaskBatch) -> Result<Vec<Observation>, Error> {
        tasks
            .qas()?
            .iter()
            .map(|task| {
                Ok(Observation::new(
                    task_id(task)?,
                    frame(task_str(task, "phrase1")?, task_str(task, "phrase2")?),
                ))
            })
            .collect()
    }

    fn single_observation(
        &self,
        text1: &str,
        text2: Option<&str>,
    ) -> Result<Observation, Error> {
        let text2 =
            text2.ok_or_else(|| Error::validation("paraphrase scoring needs both texts"))?;
        Ok(Observation::new("dummy", frame(text1, text2)))
    }

    fn answer(&self, prediction: &Prediction) -> Result<Value, Error> {
        let score = score_of(prediction)?;
        Ok(json!(if score < 0.5 { 0.0 } else { 1.0 }))
    }

    fn single_answer(&self, prediction: &Prediction) -> Result<Value, Error> {
        Ok(json!(score_of(prediction)?))
    }

    fn answers_payload(&self, tasks: &TaskBatch, answers: &Map<String, Value>) -> Value {
        json!({
            "sessionId": tasks.session_id,
            "answers": Value::Object(answers.clone()),
        })
    }
}

fn frame(phrase1: &str, phrase2: &str) -> String {
    format!("Dummy title\n{phrase1}\n{phrase2}")
}

/// The agent reports a one-element score vector per pair.
fn score_of(prediction: &Prediction) -> Result<f64, Error> {
    prediction
        .get("score")
        .and_then(|score| score.get(0))
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::inference("prediction is missing a numeric `score`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> TaskBatch {
        TaskBatch::from_value(json!({
            "id": "session-3",
            "total": 1,
            "qas": [{"id": "p1", "phrase1": "he left", "phrase2": "he departed"}],
        }))
        .unwrap()
    }

    #[test]
    fn observation_frames_both_phrases() {
        let observations = ParaphraseScheme.observations(&batch()).unwrap();
        assert_eq!(observations[0].text, "Dummy title\nhe left\nhe departed");
    }

    #[test]
    fn benchmark_answer_is_thresholded() {
        let scheme = ParaphraseScheme;
        assert_eq!(scheme.answer(&json!({"score": [0.2]})).unwrap(), json!(0.0));
        assert_eq!(scheme.answer(&json!({"score": [0.5]})).unwrap(), json!(1.0));
        assert_eq!(scheme.answer(&json!({"score": [0.9]})).unwrap(), json!(1.0));
    }

    #[test]
    fn single_answer_keeps_the_raw_score() {
        assert_eq!(
            ParaphraseScheme
                .single_answer(&json!({"score": [0.4]}))
                .unwrap(),
            json!(0.4)
        );
    }

    #[test]
    fn single_observation_requires_both_texts() {
        assert!(ParaphraseScheme.single_observation("one", None).is_err());
        assert!(ParaphraseScheme
            .single_observation("one", Some("two"))
            .is_ok());
    }

    #[test]
    fn payload_is_session_plus_answers() {
        let mut answers = Map::new();
        answers.insert("p1".into(), json!(1.0));
        let payload = ParaphraseScheme.answers_payload(&batch(), &answers);
        assert_eq!(payload["sessionId"], "session-3");
        assert_eq!(payload["answers"]["p1"], 1.0);
        // No merged task copy for this scheme.
        assert!(payload.get("qas").is_none());
    }
}
