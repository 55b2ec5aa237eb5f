//! Provider abstraction layer
//!
//! This module defines the adapter trait every backend implements, the
//! registry that maps provider ids to adapters, credential sources, the
//! error taxonomy consumed by the retry classifier, and the concrete HTTP
//! adapters.

pub mod adapter;
pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod openai;

pub use adapter::{
    AdapterReply, CredentialSource, EnvCredentials, ProviderAdapter, ProviderRegistry,
    StaticCredentials,
};
pub use error::{ProviderError, ProviderResult};

// Re-export concrete adapters
pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAIAdapter;
