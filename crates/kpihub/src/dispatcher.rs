//! The worker registry and the synchronous façade entry point.
//!
//! The dispatcher maps model identifiers to worker handles and performs
//! the blocking request/response exchange on behalf of the façade. It
//! validates what it can before touching any channel; everything past
//! that boundary comes back as a response, never as a raw error.

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::AgentFactory;
use crate::config::{validate_config, HubConfig};
use crate::error::Error;
use crate::kpis::scheme_for;
use crate::remote::{HttpBenchmark, HttpRemoteModel};
use crate::request::Request;
use crate::response::Response;
use crate::worker::{
    RouterSpec, RouterWorker, SettingsUpdate, Worker, WorkerHandle, WorkerMessage, WorkerSpec,
};

/// Immutable registry of running workers, one per model identifier.
///
/// Requests against different models proceed fully in parallel; requests
/// against the same model serialize in submission order through that
/// worker's channel pair. The dispatcher itself may be called from any
/// number of façade tasks concurrently.
#[derive(Debug)]
pub struct Dispatcher {
    workers: HashMap<String, WorkerHandle>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Wires a validated [`HubConfig`] and a factory per configured model
    /// into a running dispatcher.
    ///
    /// Every scheme name is resolved through the static registry and every
    /// model must have a factory; anything unresolvable aborts startup
    /// before a single worker is spawned.
    pub async fn from_config(
        config: &HubConfig,
        factories: &HashMap<String, AgentFactory>,
    ) -> Result<Self, Error> {
        validate_config(config).map_err(|error| Error::validation(error.to_string()))?;

        let benchmark = Arc::new(HttpBenchmark::new()?);
        let remote = Arc::new(HttpRemoteModel::new()?);

        let mut builder = Self::builder().log_state(config.log_state);
        for (id, entry) in &config.kpis {
            let scheme = scheme_for(&entry.scheme).ok_or_else(|| {
                Error::validation(format!("unknown scheme `{}` for model `{id}`", entry.scheme))
            })?;
            let factory = factories.get(id).cloned().ok_or_else(|| {
                Error::validation(format!("no agent factory registered for model `{id}`"))
            })?;
            builder = builder.kpi(WorkerSpec::new(
                id.clone(),
                scheme,
                factory,
                benchmark.clone(),
                entry.settings.clone(),
            ));
        }
        for (id, settings) in &config.routers {
            builder = builder.router(RouterSpec::new(id.clone(), remote.clone(), settings.clone()));
        }
        builder.spawn().await
    }

    /// Synchronous call semantics over one model: submit the request,
    /// block until its response arrives, return it.
    ///
    /// Validation failures and unknown identifiers are answered without
    /// any channel interaction. No timeout is imposed — callers needing
    /// bounded latency wrap this with their own deadline.
    pub async fn submit(&self, model_id: &str, request: Request) -> Response {
        if let Err(error) = request.validate() {
            return Response::from_error(&error);
        }
        match self.workers.get(model_id) {
            None => Response::from_error(&Error::UnknownModel(model_id.to_string())),
            Some(handle) => match handle.call(WorkerMessage::Request(request)).await {
                Ok(response) => response,
                Err(error) => Response::from_error(&error),
            },
        }
    }

    /// Replaces one worker's settings between requests.
    pub async fn reconfigure(&self, model_id: &str, update: SettingsUpdate) -> Response {
        match self.workers.get(model_id) {
            None => Response::from_error(&Error::UnknownModel(model_id.to_string())),
            Some(handle) => match handle.call(WorkerMessage::Reconfigure(update)).await {
                Ok(response) => response,
                Err(error) => Response::from_error(&error),
            },
        }
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.workers.contains_key(model_id)
    }

    /// Registered identifiers, sorted for stable output.
    pub fn model_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.workers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_alive(&self, model_id: &str) -> bool {
        self.workers
            .get(model_id)
            .map(WorkerHandle::is_alive)
            .unwrap_or(false)
    }

    /// Shuts every worker down. Also happens on drop, handle by handle.
    pub fn shutdown(&mut self) {
        for handle in self.workers.values_mut() {
            handle.shutdown();
        }
    }
}

/// Collects worker specifications and spawns them all eagerly.
#[derive(Default)]
pub struct DispatcherBuilder {
    kpis: Vec<WorkerSpec>,
    routers: Vec<RouterSpec>,
    log_state: bool,
}

impl DispatcherBuilder {
    /// Registers a local inference worker.
    pub fn kpi(mut self, spec: WorkerSpec) -> Self {
        self.kpis.push(spec);
        self
    }

    /// Registers a router (proxy) worker.
    pub fn router(mut self, spec: RouterSpec) -> Self {
        self.routers.push(spec);
        self
    }

    /// Enables pipeline-state logging for every registered worker.
    pub fn log_state(mut self, log_state: bool) -> Self {
        self.log_state = log_state;
        self
    }

    /// Spawns every registered worker and returns the dispatcher.
    ///
    /// Identifiers must be unique across both flavors, and the first
    /// eager agent-construction failure aborts the whole startup.
    pub async fn spawn(self) -> Result<Dispatcher, Error> {
        let mut workers = HashMap::new();

        for mut spec in self.kpis {
            if workers.contains_key(&spec.id) {
                return Err(Error::validation(format!(
                    "duplicate model identifier `{}`",
                    spec.id
                )));
            }
            spec.log_state = spec.log_state || self.log_state;
            let id = spec.id.clone();
            let handle = Worker::spawn(spec).await?;
            workers.insert(id, handle);
        }

        for spec in self.routers {
            if workers.contains_key(&spec.id) {
                return Err(Error::validation(format!(
                    "duplicate model identifier `{}`",
                    spec.id
                )));
            }
            let id = spec.id.clone();
            workers.insert(id, RouterWorker::spawn(spec));
        }

        tracing::info!(models = workers.len(), "dispatcher ready");
        Ok(Dispatcher { workers })
    }
}
