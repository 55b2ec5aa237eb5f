//! Arbiter Core Library
//!
//! Provider orchestration for large-language-model backends: priority
//! fallback, retries with backoff, circuit breaking, health tracking and
//! weighted ensemble consensus behind one call surface.
//!
//! ```no_run
//! use arbiter_core::{config, Orchestrator, Request, TaskType};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = config::load_from_yaml("arbiter.yaml")?;
//! let orchestrator = Orchestrator::from_config(&config)?;
//!
//! let request = Request::new("Summarize this quarter's spending", TaskType::Analysis);
//! let response = orchestrator.call_with_fallback(&request, None).await;
//! if response.is_synthetic() {
//!     // no real answer; use rule-based output instead
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod orchestrator;
pub mod protocol;
pub mod providers;

pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorError};
pub use protocol::{EnsembleResult, Request, Response, TaskType, TokenUsage};
pub use providers::{AdapterReply, ProviderAdapter, ProviderError};

/// Returns the version of the Arbiter Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
