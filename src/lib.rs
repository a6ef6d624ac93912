//! AI Log Analysis Core
//!
//! Ingests structured log records, trains anomaly and classification models
//! against them, scores new records, and explains individual anomaly
//! verdicts in terms of contributing features.
//!
//! The crate is transport-agnostic: a request layer (HTTP, IPC, CLI) builds
//! an [`Engine`], calls [`Engine::init`] once at startup, and then invokes
//! the operations in [`api`] with plain typed requests.

pub mod api;
pub mod constants;
pub mod logic;

pub use api::{init_logging, Engine};
pub use logic::error::EngineError;
