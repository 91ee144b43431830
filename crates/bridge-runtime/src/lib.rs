//! The Orchestrator (spec §4.E): owns the lifecycle of the Mobile Client,
//! Desktop Client, Transformation Engine, and Rules Repository, drives the
//! initialization sequence, routes frames, and runs the recovery loop.

#[macro_use]
pub mod log_macros;

pub mod backoff;
pub mod error;
pub mod lifecycle;
pub mod progress;
pub mod tracing_init;

pub use lifecycle::{wait_for_signal, Orchestrator};
