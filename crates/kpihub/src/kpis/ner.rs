use serde_json::Value;

use super::{task_id, task_str};
use crate::agent::{Observation, Prediction};
use crate::error::Error;
use crate::pipeline::KpiScheme;
use crate::remote::TaskBatch;

/// Named-entity recognition: the task text carries the expected markup
/// after a tab, so the observation keeps only the part before it.
pub struct NerScheme;

impl KpiScheme for NerScheme {
    fn name(&self) -> &'static str {
        "ner"
    }

    fn observations(&self, tasks: &TaskBatch) -> Result<Vec<Observation>, Error> {
        tasks
            .qas()?
            .iter()
            .map(|task| {
                Ok(Observation::new(
                    task_id(task)?,
                    before_tab(task_str(task, "question")?),
                ))
            })
            .collect()
    }

    fn single_observation(
        &self,
        text1: &str,
        _text2: Option<&str>,
    ) -> Result<Observation, Error> {
        Ok(Observation::new("dummy", before_tab(text1)))
    }

    fn answer(&self, prediction: &Prediction) -> Result<Value, Error> {
        prediction
            .get("text")
            .cloned()
            .ok_or_else(|| Error::inference("prediction is missing `text`"))
    }
}

fn before_tab(text: &str) -> &str {
    text.split('\t').next().unwrap_or_default()
}
