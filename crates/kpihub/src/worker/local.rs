use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use super::{panic_message, SettingsUpdate, WorkerHandle, WorkerMessage};
use crate::agent::{AgentFactory, ModelAgent};
use crate::config::KpiSettings;
use crate::error::Error;
use crate::pipeline::{KpiScheme, PipelineState, TestPipeline};
use crate::remote::BenchmarkApi;
use crate::request::Request;
use crate::response::{Response, ScoreCard};

/// When the model agent is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentInit {
    /// Before the loop starts; a construction failure aborts the spawn.
    Eager,
    /// On the first request; a construction failure becomes a failure
    /// response and is retried on the next request.
    Lazy,
}

/// Everything needed to spawn one local inference worker.
#[derive(Clone)]
pub struct WorkerSpec {
    pub id: String,
    pub scheme: Arc<dyn KpiScheme>,
    pub factory: AgentFactory,
    pub benchmark: Arc<dyn BenchmarkApi>,
    pub settings: KpiSettings,
    pub init: AgentInit,
    pub log_state: bool,
}

impl WorkerSpec {
    pub fn new(
        id: impl Into<String>,
        scheme: Arc<dyn KpiScheme>,
        factory: AgentFactory,
        benchmark: Arc<dyn BenchmarkApi>,
        settings: KpiSettings,
    ) -> Self {
        Self {
            id: id.into(),
            scheme,
            factory,
            benchmark,
            settings,
            init: AgentInit::Eager,
            log_state: false,
        }
    }

    pub fn with_init(mut self, init: AgentInit) -> Self {
        self.init = init;
        self
    }

    pub fn with_log_state(mut self, log_state: bool) -> Self {
        self.log_state = log_state;
        self
    }
}

/// A single-consumer execution unit bound to exactly one model.
///
/// The worker owns its agent and pipeline exclusively; the channel pair
/// is the only thing it shares with the rest of the process. Requests are
/// handled strictly one at a time, and any failure — error or panic — is
/// converted into a failure response at the loop boundary so the loop
/// keeps running.
pub struct Worker {
    id: String,
    pipeline: TestPipeline,
    factory: AgentFactory,
    settings: KpiSettings,
    agent: Option<Box<dyn ModelAgent>>,
    log_state: bool,
    /// Last completed run, retained read-only for diagnostics.
    last_state: Option<PipelineState>,
    requests: UnboundedReceiver<WorkerMessage>,
    responses: UnboundedSender<Response>,
}

impl Worker {
    /// Creates the channel pair, optionally constructs the agent, and
    /// spawns the receive loop.
    ///
    /// With [`AgentInit::Eager`] a construction failure is returned to
    /// the caller — a worker that cannot build its agent must not be
    /// registered.
    pub async fn spawn(spec: WorkerSpec) -> Result<WorkerHandle, Error> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        let mut worker = Worker {
            id: spec.id.clone(),
            pipeline: TestPipeline::new(spec.scheme, spec.benchmark),
            factory: spec.factory,
            settings: spec.settings,
            agent: None,
            log_state: spec.log_state,
            last_state: None,
            requests: request_rx,
            responses: response_tx,
        };

        if spec.init == AgentInit::Eager {
            worker.build_agent().await?;
        }

        let join = tokio::spawn(worker.run());
        Ok(WorkerHandle::new(spec.id, request_tx, response_rx, join))
    }

    /// The receive-process-reply loop. Runs until the request channel
    /// closes.
    async fn run(mut self) {
        tracing::info!(kpi = %self.id, "worker loop started");
        while let Some(message) = self.requests.recv().await {
            let response = self.process(message).await;
            if self.responses.send(response).is_err() {
                tracing::warn!(kpi = %self.id, "response channel closed, stopping");
                break;
            }
        }
        tracing::info!(kpi = %self.id, "worker loop stopped");
    }

    /// Handles one message, containing every failure mode.
    async fn process(&mut self, message: WorkerMessage) -> Response {
        match message {
            WorkerMessage::Request(request) => {
                let request_id = Uuid::new_v4();
                tracing::info!(kpi = %self.id, request = %request_id, input = ?request, "request received");
                let outcome = AssertUnwindSafe(self.handle_request(request))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(Ok(payload)) => {
                        tracing::info!(kpi = %self.id, request = %request_id, "request served");
                        Response::success(payload)
                    }
                    Ok(Err(error)) => {
                        tracing::warn!(kpi = %self.id, request = %request_id, error = %error, "request failed");
                        Response::from_error(&error)
                    }
                    Err(panic) => {
                        let error =
                            Error::inference(format!("agent panicked: {}", panic_message(panic)));
                        tracing::error!(kpi = %self.id, request = %request_id, error = %error, "request panicked");
                        Response::from_error(&error)
                    }
                }
            }
            WorkerMessage::Reconfigure(update) => self.reconfigure(update).await,
        }
    }

    async fn handle_request(&mut self, request: Request) -> Result<Value, Error> {
        if self.agent.is_none() {
            self.build_agent().await?;
        }

        match request {
            Request::Count { quantity } => {
                let mut state = PipelineState::new();
                let outcome = {
                    let agent = self.current_agent()?;
                    self.pipeline
                        .run_benchmark(agent, &self.settings, quantity, &mut state)
                        .await
                };
                if self.log_state {
                    tracing::debug!(kpi = %self.id, state = ?state, "pipeline state");
                }
                self.last_state = Some(state);
                outcome.map(ScoreCard::into_value)
            }
            Request::Pair { text1, text2 } => {
                let mut state = PipelineState::new();
                let outcome = {
                    let agent = self.current_agent()?;
                    self.pipeline
                        .run_single(agent, &self.settings, &text1, text2.as_deref(), &mut state)
                        .await
                };
                self.last_state = Some(state);
                outcome
            }
        }
    }

    /// Applies a settings replacement between requests.
    ///
    /// The whole settings value is swapped; with `reinit_agent` the old
    /// agent is dropped and rebuilt before the next request is accepted.
    /// A rebuild failure leaves the worker agent-less but alive; the next
    /// request retries lazily.
    async fn reconfigure(&mut self, update: SettingsUpdate) -> Response {
        match update {
            SettingsUpdate::Kpi {
                settings,
                reinit_agent,
            } => {
                self.settings = settings;
                if reinit_agent {
                    self.agent = None;
                    if let Err(error) = self.build_agent().await {
                        tracing::warn!(kpi = %self.id, error = %error, "agent rebuild failed");
                        return Response::from_error(&error);
                    }
                }
                tracing::info!(kpi = %self.id, reinit_agent, "settings replaced");
                Response::success(json!({"reconfigured": true}))
            }
            SettingsUpdate::Router(_) => Response::from_error(&Error::validation(
                "router settings sent to an inference worker",
            )),
        }
    }

    async fn build_agent(&mut self) -> Result<(), Error> {
        tracing::info!(kpi = %self.id, "constructing model agent");
        let agent = (self.factory)(self.settings.clone()).await?;
        self.agent = Some(agent);
        Ok(())
    }

    fn current_agent(&self) -> Result<&dyn ModelAgent, Error> {
        self.agent
            .as_deref()
            .ok_or_else(|| Error::AgentInit("agent unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::agent::{Observation, Prediction};
    use crate::error::FailureKind;
    use crate::kpis::InsultsScheme;
    use crate::remote::{ScoreReport, TaskBatch};

    /// Scores each observation with its text length; records call sizes.
    #[derive(Default)]
    struct ScoreAgent {
        calls: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl ModelAgent for ScoreAgent {
        async fn batch_act(
            &self,
            observations: &[Observation],
        ) -> Result<Vec<Prediction>, Error> {
            self.calls.lock().unwrap().push(observations.len());
            Ok(observations
                .iter()
                .map(|o| {
                    if o.text.contains("panic now") {
                        panic!("poisoned observation");
                    }
                    json!({"score": o.text.len()})
                })
                .collect())
        }
    }

    /// Fails every call while `failing` holds true.
    struct FlakyAgent {
        failing: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl ModelAgent for FlakyAgent {
        async fn batch_act(
            &self,
            observations: &[Observation],
        ) -> Result<Vec<Prediction>, Error> {
            if *self.failing.lock().unwrap() {
                return Err(Error::inference("model exploded"));
            }
            Ok(observations.iter().map(|_| json!({"score": 1})).collect())
        }
    }

    struct StubBenchmark;

    #[async_trait]
    impl crate::remote::BenchmarkApi for StubBenchmark {
        async fn fetch_tasks(
            &self,
            _settings: &KpiSettings,
            quantity: u64,
        ) -> Result<TaskBatch, Error> {
            TaskBatch::from_value(json!({
                "id": "session-1",
                "total": quantity,
                "qas": (1..=quantity)
                    .map(|i| json!({"id": format!("t{i}"), "question": format!("insult {i}")}))
                    .collect::<Vec<_>>(),
            }))
        }

        async fn submit_answers(
            &self,
            _settings: &KpiSettings,
            _payload: &serde_json::Value,
        ) -> Result<ScoreReport, Error> {
            Ok(ScoreReport {
                text: "graded".into(),
                status: 200,
            })
        }
    }

    fn factory_for(
        agent_calls: Arc<Mutex<Vec<usize>>>,
        builds: Arc<AtomicUsize>,
    ) -> AgentFactory {
        Arc::new(move |_settings: KpiSettings| {
            let calls = agent_calls.clone();
            let builds = builds.clone();
            async move {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(ScoreAgent { calls }) as Box<dyn ModelAgent>)
            }
            .boxed()
        })
    }

    fn spec_with(factory: AgentFactory, settings: KpiSettings) -> WorkerSpec {
        WorkerSpec::new(
            "kpi1",
            Arc::new(InsultsScheme),
            factory,
            Arc::new(StubBenchmark),
            settings,
        )
    }

    async fn submit(handle: &WorkerHandle, request: Request) -> Response {
        handle
            .call(WorkerMessage::Request(request))
            .await
            .expect("worker alive")
    }

    #[tokio::test]
    async fn benchmark_request_produces_a_score_card() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let builds = Arc::new(AtomicUsize::new(0));
        let handle = Worker::spawn(spec_with(
            factory_for(calls, builds.clone()),
            KpiSettings::new("http://bench"),
        ))
        .await
        .unwrap();

        let response = submit(&handle, Request::count(3)).await;
        let payload = response.payload().unwrap();
        assert_eq!(payload["session_id"], "session-1");
        assert_eq!(payload["answers"]["t2"], "insult 2".len());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn eager_construction_failure_aborts_the_spawn() {
        let factory: AgentFactory = Arc::new(|_settings| {
            async { Err::<Box<dyn ModelAgent>, _>(Error::AgentInit("weights missing".into())) }
                .boxed()
        });
        let result = Worker::spawn(spec_with(factory, KpiSettings::new("http://bench"))).await;
        assert!(matches!(result, Err(Error::AgentInit(_))));
    }

    #[tokio::test]
    async fn lazy_construction_failure_is_retried_per_request() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let factory: AgentFactory = {
            let attempts = attempts.clone();
            Arc::new(move |_settings| {
                let attempts = attempts.clone();
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(Error::AgentInit("weights still downloading".into()))
                    } else {
                        Ok(Box::new(ScoreAgent::default()) as Box<dyn ModelAgent>)
                    }
                }
                .boxed()
            })
        };
        let handle = Worker::spawn(
            spec_with(factory, KpiSettings::new("http://bench")).with_init(AgentInit::Lazy),
        )
        .await
        .unwrap();

        let first = submit(&handle, Request::count(1)).await;
        assert_eq!(first.failure().unwrap().kind, FailureKind::Inference);

        let second = submit(&handle, Request::count(1)).await;
        assert!(second.is_success());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn agent_error_does_not_kill_the_worker() {
        let failing = Arc::new(Mutex::new(true));
        let factory: AgentFactory = {
            let failing = failing.clone();
            Arc::new(move |_settings| {
                let failing = failing.clone();
                async move { Ok(Box::new(FlakyAgent { failing }) as Box<dyn ModelAgent>) }.boxed()
            })
        };
        let handle = Worker::spawn(spec_with(factory, KpiSettings::new("http://bench")))
            .await
            .unwrap();

        let failed = submit(&handle, Request::count(2)).await;
        assert_eq!(failed.failure().unwrap().kind, FailureKind::Inference);

        *failing.lock().unwrap() = false;
        let recovered = submit(&handle, Request::count(2)).await;
        assert!(recovered.is_success());
        assert!(handle.is_alive());
    }

    #[tokio::test]
    async fn agent_panic_does_not_kill_the_worker() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let builds = Arc::new(AtomicUsize::new(0));
        let handle = Worker::spawn(spec_with(
            factory_for(calls, builds),
            KpiSettings::new("http://bench"),
        ))
        .await
        .unwrap();

        let panicked = submit(&handle, Request::single("panic now please")).await;
        let failure = panicked.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Inference);
        assert!(failure.message.contains("poisoned observation"));

        let recovered = submit(&handle, Request::single("calm text")).await;
        assert!(recovered.is_success());
        assert!(handle.is_alive());
    }

    #[tokio::test]
    async fn reconfigure_changes_sub_batching_for_the_next_request() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let builds = Arc::new(AtomicUsize::new(0));
        let handle = Worker::spawn(spec_with(
            factory_for(calls.clone(), builds.clone()),
            KpiSettings::new("http://bench").with_batch_size(2),
        ))
        .await
        .unwrap();

        submit(&handle, Request::count(5)).await;
        assert_eq!(*calls.lock().unwrap(), vec![2, 2, 1]);

        let ack = handle
            .call(WorkerMessage::Reconfigure(SettingsUpdate::Kpi {
                settings: KpiSettings::new("http://bench"),
                reinit_agent: false,
            }))
            .await
            .unwrap();
        assert!(ack.is_success());
        // Same factory result is kept; no rebuild without reinit_agent.
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        calls.lock().unwrap().clear();
        submit(&handle, Request::count(5)).await;
        assert_eq!(*calls.lock().unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn reconfigure_with_reinit_rebuilds_the_agent() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let builds = Arc::new(AtomicUsize::new(0));
        let handle = Worker::spawn(spec_with(
            factory_for(calls, builds.clone()),
            KpiSettings::new("http://bench"),
        ))
        .await
        .unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        let ack = handle
            .call(WorkerMessage::Reconfigure(SettingsUpdate::Kpi {
                settings: KpiSettings::new("http://bench-2"),
                reinit_agent: true,
            }))
            .await
            .unwrap();
        assert!(ack.is_success());
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mismatched_settings_variant_is_rejected() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let builds = Arc::new(AtomicUsize::new(0));
        let handle = Worker::spawn(spec_with(
            factory_for(calls, builds),
            KpiSettings::new("http://bench"),
        ))
        .await
        .unwrap();

        let response = handle
            .call(WorkerMessage::Reconfigure(SettingsUpdate::Router(
                crate::config::RouterSettings::new("http://get", "http://post"),
            )))
            .await
            .unwrap();
        assert_eq!(response.failure().unwrap().kind, FailureKind::Validation);
        assert!(handle.is_alive());
    }
}
