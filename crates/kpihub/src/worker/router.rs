use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use super::{panic_message, SettingsUpdate, WorkerHandle, WorkerMessage};
use crate::config::RouterSettings;
use crate::error::{Error, Failure};
use crate::remote::RemoteModel;
use crate::request::Request;
use crate::response::Response;

/// Everything needed to spawn one router worker.
#[derive(Clone)]
pub struct RouterSpec {
    pub id: String,
    pub remote: Arc<dyn RemoteModel>,
    pub settings: RouterSettings,
}

impl RouterSpec {
    pub fn new(
        id: impl Into<String>,
        remote: Arc<dyn RemoteModel>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            id: id.into(),
            remote,
            settings,
        }
    }
}

/// Worker variant with no local agent: requests are classified by shape
/// and proxied to a remote model-serving endpoint.
///
/// The channel contract is identical to [`Worker`](super::Worker) — one
/// response per message, failures contained at the loop boundary — so a
/// remote outage degrades to failure responses instead of killing the
/// worker.
pub struct RouterWorker {
    id: String,
    remote: Arc<dyn RemoteModel>,
    settings: RouterSettings,
    requests: UnboundedReceiver<WorkerMessage>,
    responses: UnboundedSender<Response>,
}

impl RouterWorker {
    /// Creates the channel pair and spawns the receive loop. There is no
    /// agent to construct, so the spawn itself cannot fail.
    pub fn spawn(spec: RouterSpec) -> WorkerHandle {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        let worker = RouterWorker {
            id: spec.id.clone(),
            remote: spec.remote,
            settings: spec.settings,
            requests: request_rx,
            responses: response_tx,
        };

        let join = tokio::spawn(worker.run());
        WorkerHandle::new(spec.id, request_tx, response_rx, join)
    }

    async fn run(mut self) {
        tracing::info!(router = %self.id, "router loop started");
        while let Some(message) = self.requests.recv().await {
            let response = self.process(message).await;
            if self.responses.send(response).is_err() {
                tracing::warn!(router = %self.id, "response channel closed, stopping");
                break;
            }
        }
        tracing::info!(router = %self.id, "router loop stopped");
    }

    async fn process(&mut self, message: WorkerMessage) -> Response {
        match message {
            WorkerMessage::Request(request) => {
                let request_id = Uuid::new_v4();
                tracing::info!(router = %self.id, request = %request_id, input = ?request, "request received");
                let outcome = AssertUnwindSafe(self.handle_request(request))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(Ok(payload)) => Response::success(payload),
                    Ok(Err(error)) => {
                        tracing::warn!(router = %self.id, request = %request_id, error = %error, "proxying failed");
                        Response::from_error(&error)
                    }
                    Err(panic) => {
                        let failure = Failure::panic(panic_message(panic));
                        tracing::error!(router = %self.id, request = %request_id, message = %failure.message, "proxying panicked");
                        Response::from(failure)
                    }
                }
            }
            WorkerMessage::Reconfigure(update) => match update {
                SettingsUpdate::Router(settings) => {
                    self.settings = settings;
                    tracing::info!(router = %self.id, "settings replaced");
                    Response::success(json!({"reconfigured": true}))
                }
                SettingsUpdate::Kpi { .. } => Response::from_error(&Error::UnrecognizedInput(
                    "inference settings sent to a router worker".into(),
                )),
            },
        }
    }

    /// Classifies the request by shape and proxies it.
    async fn handle_request(&self, request: Request) -> Result<Value, Error> {
        match request {
            Request::Pair { text1, text2 } => {
                self.remote
                    .score_pair(&self.settings, &text1, text2.as_deref().unwrap_or(""))
                    .await
            }
            Request::Count { quantity } => {
                self.remote.run_benchmark(&self.settings, quantity).await
            }
        }
    }
}
