use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::{json, Value};

use super::{BenchmarkApi, RemoteModel, ScoreReport, TaskBatch};
use crate::config::{KpiSettings, RouterSettings};
use crate::error::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Reqwest-backed [`BenchmarkApi`].
///
/// The client is built once and shared; per-model endpoints come from the
/// settings value of each call.
pub struct HttpBenchmark {
    client: Client,
}

impl HttpBenchmark {
    pub fn new() -> Result<Self, Error> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BenchmarkApi for HttpBenchmark {
    async fn fetch_tasks(
        &self,
        settings: &KpiSettings,
        quantity: u64,
    ) -> Result<TaskBatch, Error> {
        tracing::debug!(url = %settings.rest_url, quantity, "fetching benchmark tasks");
        let response = self
            .client
            .get(&settings.rest_url)
            .query(&[("stage", "test")])
            .query(&[("quantity", quantity)])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| Error::Upstream {
                context: "benchmark task fetch",
                source,
            })?;

        let body: Value = response.json().await.map_err(|source| Error::MalformedReply {
            context: "benchmark task fetch",
            detail: source.to_string(),
        })?;
        TaskBatch::from_value(body)
    }

    async fn submit_answers(
        &self,
        settings: &KpiSettings,
        payload: &Value,
    ) -> Result<ScoreReport, Error> {
        tracing::debug!(url = %settings.rest_url, "submitting benchmark answers");
        let response = self
            .client
            .post(&settings.rest_url)
            .header(ACCEPT, "*/*")
            .json(payload)
            .send()
            .await
            .map_err(|source| Error::Upstream {
                context: "benchmark answer submission",
                source,
            })?;

        // The grading verdict keeps body and status verbatim, whatever the
        // status class; only transport failures count as upstream errors.
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|source| Error::Upstream {
            context: "benchmark answer submission",
            source,
        })?;
        tracing::debug!(status, "benchmark answers graded");
        Ok(ScoreReport { text, status })
    }
}

/// Reqwest-backed [`RemoteModel`] used by router workers.
pub struct HttpRemoteModel {
    client: Client,
}

impl HttpRemoteModel {
    pub fn new() -> Result<Self, Error> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteModel for HttpRemoteModel {
    async fn score_pair(
        &self,
        settings: &RouterSettings,
        text1: &str,
        text2: &str,
    ) -> Result<Value, Error> {
        tracing::debug!(url = %settings.rest_url_post, "proxying pair scoring");
        let response = self
            .client
            .post(&settings.rest_url_post)
            .header(ACCEPT, "application/json")
            .json(&json!({"text1": text1, "text2": text2}))
            .send()
            .await
            .map_err(|source| Error::Upstream {
                context: "router pair scoring",
                source,
            })?;

        response.json().await.map_err(|source| Error::MalformedReply {
            context: "router pair scoring",
            detail: source.to_string(),
        })
    }

    async fn run_benchmark(
        &self,
        settings: &RouterSettings,
        quantity: u64,
    ) -> Result<Value, Error> {
        tracing::debug!(url = %settings.rest_url_get, quantity, "proxying benchmark run");
        let response = self
            .client
            .get(&settings.rest_url_get)
            .header(ACCEPT, "application/json")
            .query(&[("tasks_number", quantity)])
            .send()
            .await
            .map_err(|source| Error::Upstream {
                context: "router benchmark run",
                source,
            })?;

        response.json().await.map_err(|source| Error::MalformedReply {
            context: "router benchmark run",
            detail: source.to_string(),
        })
    }
}
