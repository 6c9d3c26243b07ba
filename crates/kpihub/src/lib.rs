//! # Kpihub
//!
//! A synchronous dispatch layer over long-lived model scoring workers.
//!
//! ## Overview
//!
//! Scoring models are expensive to initialize and cheap to reuse, so each
//! one lives in its own persistent worker: an isolated execution unit that
//! constructs its model agent once and then serves requests forever over a
//! dedicated request/response channel pair. The dispatcher maps model
//! identifiers to workers and gives the HTTP façade plain synchronous call
//! semantics — submit a request, block for its response.
//!
//! Key components include:
//!
//! - A worker registry with submit/reconfigure call semantics
//! - A five-stage test pipeline turning task counts or literal text pairs
//!   into graded results
//! - Per-model schemes shaping tasks into observations and predictions
//!   into answers
//! - A router worker variant that proxies requests to a remote model
//!   endpoint instead of running local inference
//!
//! ## Architecture
//!
//! The crate is built around a few hard rules:
//!
//! ### One request at a time per model
//!
//! A worker is a single-consumer loop: receive one request, run the
//! pipeline, send exactly one response, repeat. Nothing else touches its
//! model agent or pipeline state, so there is at most one agent invocation
//! in flight per model and no locking anywhere past the channel pair.
//! Requests against different models share nothing and run in parallel.
//!
//! ### Failures are responses
//!
//! Every error — a bad request, an unreachable benchmark service, a
//! failing or panicking agent — is converted into a structured failure
//! response at the worker boundary and delivered through the same channel
//! as a success. A single bad request never terminates a worker.
//!
//! ### No hidden deadlines
//!
//! The core imposes no timeout. A submit against a hung remote blocks
//! until the worker answers; callers needing bounded latency impose their
//! own deadline above the dispatcher and accept that the eventual response
//! goes unread.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kpihub::{Dispatcher, KpiSettings, Request};
//! use kpihub::kpis::scheme_for;
//! use kpihub::remote::HttpBenchmark;
//! use kpihub::worker::WorkerSpec;
//!
//! # async fn example(factory: kpihub::agent::AgentFactory) -> Result<(), kpihub::Error> {
//! let dispatcher = Dispatcher::builder()
//!     .kpi(WorkerSpec::new(
//!         "kpi1",
//!         scheme_for("insults").expect("registered scheme"),
//!         factory,
//!         Arc::new(HttpBenchmark::new()?),
//!         KpiSettings::new("http://benchmarks/kpi1"),
//!     ))
//!     .spawn()
//!     .await?;
//!
//! let response = dispatcher.submit("kpi1", Request::count(10)).await;
//! println!("{response:?}");
//! # Ok(())
//! # }
//! ```

mod config;
mod dispatcher;
mod error;
mod request;
mod response;

pub mod agent;
pub mod kpis;
pub mod pipeline;
pub mod remote;
pub mod worker;

pub use config::{
    load_config, validate_config, ConfigError, HubConfig, KpiEntry, KpiSettings, RouterSettings,
};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{Error, Failure, FailureKind};
pub use request::Request;
pub use response::{Response, ScoreCard};
pub use worker::SettingsUpdate;
