//! Provider adapters
//!
//! One adapter per upstream back-end. Every adapter shares the same shape of
//! work: build the wire body from the normalised request, attach auth,
//! execute honouring cancellation, map the error envelope, translate the
//! response back, and (where supported) parse the streaming encoding.
//!
//! OpenAI-compatible back-ends (OpenAI, Groq, DeepSeek, Mistral, Together,
//! Fireworks, Perplexity, Ollama, Azure, AI21 Jamba) share one wire core in
//! [`openai_compat`]; the rest carry their own translation.

pub mod ai21;
pub mod anthropic;
pub mod azure;
pub mod base;
pub mod bedrock;
pub mod cohere;
pub mod deepseek;
pub mod fireworks;
pub mod gemini;
pub mod groq;
pub mod mistral;
pub mod ollama;
pub mod openai;
pub mod openai_compat;
pub mod perplexity;
pub mod registry;
pub mod replicate;
pub mod together;

pub use registry::ProviderRegistry;
