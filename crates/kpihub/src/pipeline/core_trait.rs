use serde_json::{Map, Value};

use crate::agent::{Observation, Prediction};
use crate::error::Error;
use crate::remote::TaskBatch;

/// Model-specific shaping of tasks into observations and predictions into
/// answers.
///
/// Every method is a pure, stage-local function: schemes hold no state and
/// perform no I/O. The pipeline owns sequencing; a scheme only knows how
/// its model wants to see a task and how its raw predictions turn into
/// gradable answers.
pub trait KpiScheme: Send + Sync {
    /// Registry name of this scheme.
    fn name(&self) -> &'static str;

    /// Builds the observation batch for a fetched task set.
    fn observations(&self, tasks: &TaskBatch) -> Result<Vec<Observation>, Error>;

    /// Builds the single observation for a literal input pair.
    fn single_observation(
        &self,
        text1: &str,
        text2: Option<&str>,
    ) -> Result<Observation, Error>;

    /// Extracts the gradable answer from one raw prediction.
    fn answer(&self, prediction: &Prediction) -> Result<Value, Error>;

    /// Extracts the single-shot answer; defaults to [`Self::answer`].
    ///
    /// Schemes that post-process answers for grading (e.g. thresholding a
    /// score) override this to return the raw value instead.
    fn single_answer(&self, prediction: &Prediction) -> Result<Value, Error> {
        self.answer(prediction)
    }

    /// Builds the submission payload from the id→answer map.
    ///
    /// The default merges the answers into a copy of the original task
    /// payload under an `"answers"` key; the original is never touched.
    fn answers_payload(&self, tasks: &TaskBatch, answers: &Map<String, Value>) -> Value {
        let mut payload = tasks.raw.clone();
        if let Value::Object(fields) = &mut payload {
            fields.insert("answers".to_string(), Value::Object(answers.clone()));
        }
        payload
    }
}
