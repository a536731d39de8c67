//! Server surface for the Vesper content pipeline.
//!
//! This crate wires configuration into running services:
//!
//! - [`ServerConfig`] loads `vesper.toml`.
//! - [`Services`] builds the pipeline and the translation outbox worker.
//! - [`create_router`] exposes the internal HTTP trigger.
//! - [`TriggerLoop`] fires schedules whose cron expression is due.
//! - [`init_observability`] installs a meter provider.

mod api;
mod config;
mod observability;
mod scheduler;
mod services;

pub use api::{
    AppState, INTERNAL_SECRET_HEADER, RunScheduleRequest, RunScheduleResponse,
    TranslateContentRequest, create_router,
};
pub use config::{
    ModelsConfig, PipelineSection, ServerConfig, ServerSettings, internal_secret,
};
pub use observability::{init_observability, shutdown_observability};
pub use scheduler::TriggerLoop;
pub use services::{Services, refinement_chain};
