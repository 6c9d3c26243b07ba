use serde_json::Value;

use super::{task_id, task_str};
use crate::agent::{Observation, Prediction};
use crate::error::Error;
use crate::pipeline::KpiScheme;
use crate::remote::TaskBatch;

/// Insult detection: one question per task, a scalar `score` back.
pub struct InsultsScheme;

impl KpiScheme for InsultsScheme {
    fn name(&self) -> &'static str {
        "insults"
    }

    fn observations(&self, tasks: &TaskBatch) -> Result<Vec<Observation>, Error> {
        tasks
            .qas()?
            .iter()
            .map(|task| {
                Ok(Observation::new(
                    task_id(task)?,
                    cleanup(task_str(task, "question")?),
                ))
            })
            .collect()
    }

    fn single_observation(
        &self,
        text1: &str,
        _text2: Option<&str>,
    ) -> Result<Observation, Error> {
        Ok(Observation::new("dummy", cleanup(text1)))
    }

    fn answer(&self, prediction: &Prediction) -> Result<Value, Error> {
        prediction
            .get("score")
            .cloned()
            .ok_or_else(|| Error::inference("prediction is missing `score`"))
    }
}

/// Light text cleanup applied before scoring: escaped line breaks become
/// spaces and whitespace runs collapse to one space.
fn cleanup(text: &str) -> String {
    text.replace("\\n", " ")
        .replace("\\t", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
