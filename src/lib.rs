//! # llm-gateway
//!
//! Provider-agnostic LLM gateway core. Accepts an OpenAI-shaped chat
//! completion request and dispatches it to one of ~15 third-party back-ends,
//! normalising their wire formats, auth schemes, and streaming encodings into
//! a single model.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use llm_gateway::core::providers::openai::OpenAiProvider;
//! use llm_gateway::core::providers::ProviderRegistry;
//! use llm_gateway::core::router::{Router, RouterConfig, Target};
//! use llm_gateway::core::types::{ChatRequest, RequestContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = ProviderRegistry::new();
//!     registry.register(OpenAiProvider::new("sk-..."));
//!
//!     let config = RouterConfig::single(Target::new("openai"));
//!     let router = Router::new(config, registry)?;
//!
//!     let request = ChatRequest::new("gpt-4o").user("Hello!");
//!     let response = router.route(&RequestContext::new(), request).await?;
//!     println!("{}", response.first_text().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! The crate is a library: it installs no tracing subscriber, spawns no
//! server, and imposes no timeouts. Cancellation and deadlines belong to the
//! caller via [`core::types::RequestContext`].

#![warn(clippy::all)]

pub mod core;

pub use crate::core::plugins::{Plugin, PluginContext, PluginPipeline, PluginStage};
pub use crate::core::providers::ProviderRegistry;
pub use crate::core::router::{Router, RouterConfig, StrategyMode, Target};
pub use crate::core::traits::{Capability, Provider};
pub use crate::core::types::{
    ChatChunk, ChatMessage, ChatRequest, ChatResponse, GatewayError, RequestContext,
};
