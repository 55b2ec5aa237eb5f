//! Protocol module for orchestrated request/response structures
//!
//! These structures are the only shapes call sites see. They are:
//! - Provider-agnostic
//! - Immutable once issued
//! - Serializable for audit and dashboards

pub mod types;

pub use types::{
    truncate_chars, EnsembleResult, Request, Response, TaskType, TokenUsage, VoteResult,
    ALL_FAILED_CONFIDENCE, NO_PROVIDERS_CONFIDENCE, SYNTHETIC_PROVIDER_ID,
};
