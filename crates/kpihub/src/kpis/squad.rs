use serde_json::Value;

use super::{task_id, task_str};
use crate::agent::{Observation, Prediction};
use crate::error::Error;
use crate::pipeline::KpiScheme;
use crate::remote::TaskBatch;

/// Reading-comprehension QA: tasks arrive nested as paragraphs, each with
/// its own question list, and the agent sees context and question joined
/// on one observation.
pub struct SquadScheme;

impl KpiScheme for SquadScheme {
    fn name(&self) -> &'static str {
        "squad"
    }

    fn observations(&self, tasks: &TaskBatch) -> Result<Vec<Observation>, Error> {
        let paragraphs = tasks
            .raw
            .get("paragraphs")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::MalformedReply {
                context: "benchmark task fetch",
                detail: "reply is missing a `paragraphs` task list".into(),
            })?;

        let mut observations = Vec::new();
        for paragraph in paragraphs {
            let context = task_str(paragraph, "context")?;
            let questions = paragraph
                .get("qas")
                .and_then(Value::as_array)
                .ok_or_else(|| Error::MalformedReply {
                    context: "benchmark task fetch",
                    detail: "paragraph record is missing `qas`".into(),
                })?;
            for question in questions {
                observations.push(Observation::new(
                    task_id(question)?,
                    join(context, task_str(question, "question")?),
                ));
            }
        }
        Ok(observations)
    }

    fn single_observation(
        &self,
        text1: &str,
        text2: Option<&str>,
    ) -> Result<Observation, Error> {
        let question = text2
            .ok_or_else(|| Error::validation("reading comprehension needs a context and a question"))?;
        Ok(Observation::new("dummy", join(text1, question)))
    }

    fn answer(&self, prediction: &Prediction) -> Result<Value, Error> {
        prediction
            .get("text")
            .cloned()
            .ok_or_else(|| Error::inference("prediction is missing `text`"))
    }
}

fn join(context: &str, question: &str) -> String {
    format!("{context}\n{question}")
}
