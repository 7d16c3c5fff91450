//! Gateway configuration
//!
//! A YAML-deserialisable description of the whole gateway: the routing
//! block plus the provider credentials. `build()` constructs the adapters,
//! registers them, and returns a ready router. The embedder may equally
//! assemble registry and router by hand; this module is the declarative
//! path.
//!
//! ```yaml
//! router:
//!   strategy:
//!     mode: fallback
//!   targets:
//!     - provider: openai
//!       retry:
//!         attempts: 3
//!     - provider: anthropic
//! providers:
//!   - kind: openai
//!     api_key: sk-...
//!   - kind: anthropic
//!     api_key: sk-ant-...
//! ```

use serde::{Deserialize, Serialize};

use crate::core::providers::{
    ai21::Ai21Provider, anthropic::AnthropicProvider, azure::AzureOpenAiProvider,
    bedrock::BedrockProvider, cohere::CohereProvider, deepseek::DeepSeekProvider,
    fireworks::FireworksProvider, gemini::GeminiProvider, groq::GroqProvider,
    mistral::MistralProvider, ollama::OllamaProvider, openai::OpenAiProvider,
    perplexity::PerplexityProvider, replicate::ReplicateProvider, together::TogetherProvider,
    ProviderRegistry,
};
use crate::core::router::{Router, RouterConfig};
use crate::core::types::GatewayError;

/// Which adapter a provider entry configures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    /// OpenAI
    #[serde(rename = "openai")]
    OpenAi,
    /// Azure OpenAI
    #[serde(rename = "azure")]
    Azure,
    /// Groq
    #[serde(rename = "groq")]
    Groq,
    /// DeepSeek
    #[serde(rename = "deepseek")]
    DeepSeek,
    /// Mistral
    #[serde(rename = "mistral")]
    Mistral,
    /// Together AI
    #[serde(rename = "together")]
    Together,
    /// Fireworks AI
    #[serde(rename = "fireworks")]
    Fireworks,
    /// Perplexity
    #[serde(rename = "perplexity")]
    Perplexity,
    /// Ollama
    #[serde(rename = "ollama")]
    Ollama,
    /// AI21
    #[serde(rename = "ai21")]
    Ai21,
    /// Anthropic
    #[serde(rename = "anthropic")]
    Anthropic,
    /// Gemini
    #[serde(rename = "gemini")]
    Gemini,
    /// Cohere
    #[serde(rename = "cohere")]
    Cohere,
    /// AWS Bedrock
    #[serde(rename = "bedrock")]
    Bedrock,
    /// Replicate
    #[serde(rename = "replicate")]
    Replicate,
}

/// Credentials and endpoint settings for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Adapter to construct
    pub kind: ProviderKind,
    /// API key / token, for back-ends that take one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override (mocks, self-hosted endpoints)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Azure resource endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Azure deployment name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    /// Azure api-version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// AWS region (Bedrock)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// AWS access key id (Bedrock)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    /// AWS secret access key (Bedrock)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    /// AWS session token (Bedrock)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl ProviderSettings {
    fn api_key(&self) -> Result<String, GatewayError> {
        self.api_key.clone().ok_or_else(|| {
            GatewayError::configuration(format!("{:?} provider requires api_key", self.kind))
        })
    }
}

/// Top-level gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Routing block
    pub router: RouterConfig,
    /// Providers to construct and register
    #[serde(default)]
    pub providers: Vec<ProviderSettings>,
}

impl GatewayConfig {
    /// Parse from a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self, GatewayError> {
        serde_yaml::from_str(yaml)
            .map_err(|err| GatewayError::configuration(format!("invalid gateway config: {err}")))
    }

    /// Parse from a YAML file
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self, GatewayError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| GatewayError::configuration(format!("cannot read config: {err}")))?;
        Self::from_yaml(&raw)
    }

    /// Construct every configured provider and return a ready router
    pub fn build(self) -> Result<Router, GatewayError> {
        let mut registry = ProviderRegistry::new();
        for settings in &self.providers {
            register_provider(&mut registry, settings)?;
        }
        Router::new(self.router, registry)
    }
}

fn register_provider(
    registry: &mut ProviderRegistry,
    settings: &ProviderSettings,
) -> Result<(), GatewayError> {
    match settings.kind {
        ProviderKind::OpenAi => {
            let key = settings.api_key()?;
            registry.register(match &settings.base_url {
                Some(base) => OpenAiProvider::with_base_url(key, base),
                None => OpenAiProvider::new(key),
            });
        }
        ProviderKind::Azure => {
            let key = settings.api_key()?;
            let endpoint = settings.endpoint.clone().ok_or_else(|| {
                GatewayError::configuration("azure provider requires endpoint")
            })?;
            let deployment = settings.deployment.clone().ok_or_else(|| {
                GatewayError::configuration("azure provider requires deployment")
            })?;
            registry.register(match &settings.api_version {
                Some(version) => {
                    AzureOpenAiProvider::with_api_version(key, endpoint, deployment, version)
                }
                None => AzureOpenAiProvider::new(key, endpoint, deployment),
            });
        }
        ProviderKind::Groq => {
            let key = settings.api_key()?;
            registry.register(match &settings.base_url {
                Some(base) => GroqProvider::with_base_url(key, base),
                None => GroqProvider::new(key),
            });
        }
        ProviderKind::DeepSeek => {
            let key = settings.api_key()?;
            registry.register(match &settings.base_url {
                Some(base) => DeepSeekProvider::with_base_url(key, base),
                None => DeepSeekProvider::new(key),
            });
        }
        ProviderKind::Mistral => {
            let key = settings.api_key()?;
            registry.register(match &settings.base_url {
                Some(base) => MistralProvider::with_base_url(key, base),
                None => MistralProvider::new(key),
            });
        }
        ProviderKind::Together => {
            let key = settings.api_key()?;
            registry.register(match &settings.base_url {
                Some(base) => TogetherProvider::with_base_url(key, base),
                None => TogetherProvider::new(key),
            });
        }
        ProviderKind::Fireworks => {
            let key = settings.api_key()?;
            registry.register(match &settings.base_url {
                Some(base) => FireworksProvider::with_base_url(key, base),
                None => FireworksProvider::new(key),
            });
        }
        ProviderKind::Perplexity => {
            let key = settings.api_key()?;
            registry.register(match &settings.base_url {
                Some(base) => PerplexityProvider::with_base_url(key, base),
                None => PerplexityProvider::new(key),
            });
        }
        ProviderKind::Ollama => {
            registry.register(match &settings.base_url {
                Some(base) => OllamaProvider::with_base_url(base),
                None => OllamaProvider::new(),
            });
        }
        ProviderKind::Ai21 => {
            let key = settings.api_key()?;
            registry.register(match &settings.base_url {
                Some(base) => Ai21Provider::with_base_url(key, base),
                None => Ai21Provider::new(key),
            });
        }
        ProviderKind::Anthropic => {
            let key = settings.api_key()?;
            registry.register(match &settings.base_url {
                Some(base) => AnthropicProvider::with_base_url(key, base),
                None => AnthropicProvider::new(key),
            });
        }
        ProviderKind::Gemini => {
            let key = settings.api_key()?;
            registry.register(match &settings.base_url {
                Some(base) => GeminiProvider::with_base_url(key, base),
                None => GeminiProvider::new(key),
            });
        }
        ProviderKind::Cohere => {
            let key = settings.api_key()?;
            registry.register(match &settings.base_url {
                Some(base) => CohereProvider::with_base_url(key, base),
                None => CohereProvider::new(key),
            });
        }
        ProviderKind::Bedrock => {
            let provider = match (&settings.access_key_id, &settings.secret_access_key) {
                (Some(access_key), Some(secret_key)) => BedrockProvider::with_session_token(
                    access_key,
                    secret_key,
                    settings.session_token.clone(),
                    settings.region.clone().unwrap_or_else(|| "us-east-1".to_string()),
                ),
                // Fall back to the standard AWS environment
                _ => BedrockProvider::from_env()?,
            };
            registry.register(match &settings.base_url {
                Some(base) => provider.with_base_url(base),
                None => provider,
            });
        }
        ProviderKind::Replicate => {
            let key = settings.api_key()?;
            registry.register(match &settings.base_url {
                Some(base) => ReplicateProvider::with_base_url(key, base),
                None => ReplicateProvider::new(key),
            });
        }
    }
    Ok(())
}
