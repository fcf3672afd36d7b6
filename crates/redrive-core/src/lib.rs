//! redrive-core
//!
//! Task lifecycle and retry/dead-letter control on top of an at-least-once
//! queue with a dead-letter redrive policy.
//!
//! # Modules
//! - **domain**: task record, status graph, retry policy, outcomes, diagnostics, errors
//! - **ports**: record store, queue, unit of work, diagnostic sink, clock, ids
//! - **app**: ingress, lifecycle controller, dead-letter triage, worker group, builder
//! - **impls**: in-memory store and queue, diagnostic sinks, fault injection
//! - **config**: TOML + environment configuration
//! - **observability**: tracing subscriber setup

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{App, AppBuilder, WorkerGroup};
pub use config::RedriveConfig;
