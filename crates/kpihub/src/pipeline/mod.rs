//! The five-stage evaluation engine.
//!
//! A pipeline run turns either a task count (benchmark mode) or a literal
//! input pair (single-shot mode) into a scored result:
//!
//! 1. fetch tasks from the benchmark service (benchmark mode only)
//! 2. build observations through the model's [`KpiScheme`]
//! 3. run agent inference, partitioned into fixed-size sub-batches when
//!    the settings ask for it
//! 4. zip observations with predictions into an id→answer map
//! 5. submit the answers and capture the grading verdict (benchmark mode
//!    only)
//!
//! Only stages one and five perform network I/O; their failures are
//! environmental. The pipeline never retries — a caller wanting a retry
//! submits a fresh request.

mod core_trait;
mod state;

pub use core_trait::KpiScheme;
pub use state::PipelineState;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::agent::{ModelAgent, Observation, Prediction};
use crate::config::KpiSettings;
use crate::error::Error;
use crate::remote::BenchmarkApi;
use crate::response::ScoreCard;

/// Deterministic five-stage evaluation over one model.
///
/// The pipeline holds the model's scheme and benchmark boundary but no
/// mutable state of its own; everything a run produces is written into the
/// caller-supplied [`PipelineState`].
pub struct TestPipeline {
    scheme: Arc<dyn KpiScheme>,
    benchmark: Arc<dyn BenchmarkApi>,
}

impl TestPipeline {
    pub fn new(scheme: Arc<dyn KpiScheme>, benchmark: Arc<dyn BenchmarkApi>) -> Self {
        Self { scheme, benchmark }
    }

    /// Runs the full benchmark cycle: fetch, observe, infer, answer,
    /// submit.
    ///
    /// A `quantity` of zero falls back to the configured default task
    /// count.
    pub async fn run_benchmark(
        &self,
        agent: &dyn ModelAgent,
        settings: &KpiSettings,
        quantity: u64,
        state: &mut PipelineState,
    ) -> Result<ScoreCard, Error> {
        let quantity = resolve_quantity(settings, quantity);

        let tasks = self.benchmark.fetch_tasks(settings, quantity).await?;
        state.session_id = Some(tasks.session_id.clone());
        state.tasks_number = Some(tasks.total);
        tracing::debug!(
            scheme = self.scheme.name(),
            session = %tasks.session_id,
            total = tasks.total,
            "tasks fetched"
        );

        let observations = self.scheme.observations(&tasks)?;
        state.observations = observations.clone();

        let predictions = self.infer(agent, settings, &observations).await?;
        state.predictions = predictions.clone();

        let answers = self.answers(&observations, &predictions)?;
        state.answers = Some(answers.clone());
        let payload = self.scheme.answers_payload(&tasks, &answers);

        let report = self.benchmark.submit_answers(settings, &payload).await?;
        state.score = Some(report.text.clone());
        state.status = Some(report.status);

        let card = ScoreCard {
            session_id: tasks.session_id.clone(),
            tasks_number: tasks.total,
            answers,
            score: report.text,
            status: report.status,
        };
        state.tasks = Some(tasks);
        Ok(card)
    }

    /// Runs the single-shot cycle: observe, infer, answer. Stages one and
    /// five are skipped; the scheme's single-shot answer is the result.
    pub async fn run_single(
        &self,
        agent: &dyn ModelAgent,
        settings: &KpiSettings,
        text1: &str,
        text2: Option<&str>,
        state: &mut PipelineState,
    ) -> Result<Value, Error> {
        let observation = self.scheme.single_observation(text1, text2)?;
        state.observations = vec![observation.clone()];

        let predictions = self
            .infer(agent, settings, std::slice::from_ref(&observation))
            .await?;
        state.predictions = predictions.clone();

        let prediction = predictions
            .first()
            .ok_or_else(|| Error::inference("agent returned no prediction"))?;
        self.scheme.single_answer(prediction)
    }

    /// Stage three: agent inference with optional sub-batch partitioning.
    ///
    /// A batch size of zero means one call over the whole observation set.
    /// Otherwise observations are split into fixed-size chunks, inferred
    /// in order, and the outputs concatenated, so predictions stay in
    /// lockstep with observations by position.
    async fn infer(
        &self,
        agent: &dyn ModelAgent,
        settings: &KpiSettings,
        observations: &[Observation],
    ) -> Result<Vec<Prediction>, Error> {
        let batch_size = settings.observations_batch_size;
        let predictions = if batch_size == 0 {
            agent.batch_act(observations).await?
        } else {
            let mut merged = Vec::with_capacity(observations.len());
            for chunk in observations.chunks(batch_size) {
                merged.extend(agent.batch_act(chunk).await?);
            }
            merged
        };

        if predictions.len() != observations.len() {
            return Err(Error::inference(format!(
                "agent returned {} predictions for {} observations",
                predictions.len(),
                observations.len()
            )));
        }
        Ok(predictions)
    }

    /// Stage four: zips observations with aligned predictions by position
    /// into an id→answer map.
    fn answers(
        &self,
        observations: &[Observation],
        predictions: &[Prediction],
    ) -> Result<Map<String, Value>, Error> {
        let mut answers = Map::new();
        for (observation, prediction) in observations.iter().zip(predictions) {
            answers.insert(observation.id.clone(), self.scheme.answer(prediction)?);
        }
        Ok(answers)
    }
}

#[inline]
fn resolve_quantity(settings: &KpiSettings, requested: u64) -> u64 {
    if requested == 0 {
        settings.test_tasks_number
    } else {
        requested
    }
}
