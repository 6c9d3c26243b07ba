use async_trait::async_trait;
use serde_json::Value;

use super::{ScoreReport, TaskBatch};
use crate::config::{KpiSettings, RouterSettings};
use crate::error::Error;

/// The remote benchmark service a local worker is graded against.
///
/// The two methods are the only network I/O in the test pipeline (stages
/// one and five); their failures are environmental, never retried here.
/// Settings are passed per call so a reconfigured worker talks to its
/// replacement endpoint without rebuilding the client.
#[async_trait]
pub trait BenchmarkApi: Send + Sync {
    /// Fetches `quantity` tasks for the current testing session.
    async fn fetch_tasks(
        &self,
        settings: &KpiSettings,
        quantity: u64,
    ) -> Result<TaskBatch, Error>;

    /// Submits the answer payload and captures the grading verdict.
    async fn submit_answers(
        &self,
        settings: &KpiSettings,
        payload: &Value,
    ) -> Result<ScoreReport, Error>;
}

/// A remote model-serving endpoint proxied by a router worker.
#[async_trait]
pub trait RemoteModel: Send + Sync {
    /// Scores one literal text pair remotely.
    async fn score_pair(
        &self,
        settings: &RouterSettings,
        text1: &str,
        text2: &str,
    ) -> Result<Value, Error>;

    /// Runs a benchmark round of `quantity` tasks remotely.
    async fn run_benchmark(
        &self,
        settings: &RouterSettings,
        quantity: u64,
    ) -> Result<Value, Error>;
}
