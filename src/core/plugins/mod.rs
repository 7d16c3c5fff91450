//! Staged plugin pipeline
//!
//! Plugins are ordered observers and mutators hung off four stages of a
//! routed call. `before_request` may rewrite the request or veto the route;
//! `after_response` sees successful responses; `on_error` observes failures
//! without being able to silence them; `on_stream_chunk` rides along every
//! streamed frame. A plugin context lives for exactly one `route` call.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::core::types::{ChatChunk, ChatRequest, ChatResponse, GatewayError};

/// Pipeline stage a plugin is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginStage {
    /// Before any provider call; may mutate the request, an error aborts
    BeforeRequest,
    /// After a successful provider call; an error surfaces as a failure
    AfterResponse,
    /// On adapter failure, before retries and fallback decide
    OnError,
    /// Per streamed chunk; an error cuts the stream
    OnStreamChunk,
}

impl std::fmt::Display for PluginStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PluginStage::BeforeRequest => "before_request",
            PluginStage::AfterResponse => "after_response",
            PluginStage::OnError => "on_error",
            PluginStage::OnStreamChunk => "on_stream_chunk",
        };
        write!(f, "{name}")
    }
}

/// Mutable state accompanying one routed call.
///
/// Allocated per `route` invocation and discarded on return; plugins may
/// mutate it only while executing within their stage.
#[derive(Debug)]
pub struct PluginContext {
    /// The request; mutable pre-flight via `before_request`
    pub request: ChatRequest,
    /// Set after a successful provider call
    pub response: Option<ChatResponse>,
    /// Set when the current attempt failed
    pub error: Option<String>,
    /// The chunk in flight during `on_stream_chunk`
    pub chunk: Option<ChatChunk>,
    /// Free-form annotations shared between stages
    pub metadata: HashMap<String, Value>,
    /// Target currently being tried
    pub target_name: String,
    /// 1-based attempt number on the current target
    pub attempt: u32,
}

impl PluginContext {
    /// Context for a fresh route call
    pub fn new(request: ChatRequest) -> Self {
        Self {
            request,
            response: None,
            error: None,
            chunk: None,
            metadata: HashMap::new(),
            target_name: String::new(),
            attempt: 0,
        }
    }
}

/// A named plugin bound to one stage at registration time
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique name within the stage it registers into
    fn name(&self) -> &str;

    /// One-time initialisation with the plugin's configuration map
    fn init(&mut self, config: &HashMap<String, Value>) -> Result<(), GatewayError> {
        let _ = config;
        Ok(())
    }

    /// Run within the stage this plugin registered for
    async fn execute(&self, ctx: &mut PluginContext) -> Result<(), GatewayError>;
}

/// Ordered per-stage plugin lists
#[derive(Default)]
pub struct PluginPipeline {
    before_request: Vec<Box<dyn Plugin>>,
    after_response: Vec<Box<dyn Plugin>>,
    on_error: Vec<Box<dyn Plugin>>,
    on_stream_chunk: Vec<Box<dyn Plugin>>,
}

impl PluginPipeline {
    /// Empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin with no configuration
    pub fn register(
        &mut self,
        stage: PluginStage,
        plugin: Box<dyn Plugin>,
    ) -> Result<(), GatewayError> {
        self.register_with_config(stage, plugin, &HashMap::new())
    }

    /// Register a plugin, running its `init` with `config`.
    ///
    /// Fails on a duplicate name within the stage or when `init` errors.
    pub fn register_with_config(
        &mut self,
        stage: PluginStage,
        mut plugin: Box<dyn Plugin>,
        config: &HashMap<String, Value>,
    ) -> Result<(), GatewayError> {
        let list = self.stage_mut(stage);
        if list.iter().any(|existing| existing.name() == plugin.name()) {
            return Err(GatewayError::configuration(format!(
                "duplicate plugin '{}' in stage {stage}",
                plugin.name()
            )));
        }
        plugin
            .init(config)
            .map_err(|err| GatewayError::plugin(plugin.name(), format!("init failed: {err}")))?;
        self.stage_mut(stage).push(plugin);
        Ok(())
    }

    fn stage_mut(&mut self, stage: PluginStage) -> &mut Vec<Box<dyn Plugin>> {
        match stage {
            PluginStage::BeforeRequest => &mut self.before_request,
            PluginStage::AfterResponse => &mut self.after_response,
            PluginStage::OnError => &mut self.on_error,
            PluginStage::OnStreamChunk => &mut self.on_stream_chunk,
        }
    }

    fn stage(&self, stage: PluginStage) -> &[Box<dyn Plugin>] {
        match stage {
            PluginStage::BeforeRequest => &self.before_request,
            PluginStage::AfterResponse => &self.after_response,
            PluginStage::OnError => &self.on_error,
            PluginStage::OnStreamChunk => &self.on_stream_chunk,
        }
    }

    /// Registered plugin names for a stage, in execution order
    pub fn names(&self, stage: PluginStage) -> Vec<&str> {
        self.stage(stage).iter().map(|plugin| plugin.name()).collect()
    }

    /// Run a stage serially in registration order; the first error aborts
    /// and is attributed to the failing plugin.
    pub async fn run(
        &self,
        stage: PluginStage,
        ctx: &mut PluginContext,
    ) -> Result<(), GatewayError> {
        for plugin in self.stage(stage) {
            if let Err(err) = plugin.execute(ctx).await {
                return Err(match err {
                    already @ GatewayError::Plugin { .. } => already,
                    other => GatewayError::plugin(plugin.name(), other.to_string()),
                });
            }
        }
        Ok(())
    }

    /// Run the `on_error` stage. Plugins observe the failure; their own
    /// errors are logged and must not mask the original.
    pub async fn run_on_error(&self, ctx: &mut PluginContext) {
        for plugin in &self.on_error {
            if let Err(err) = plugin.execute(ctx).await {
                warn!(plugin = plugin.name(), error = %err, "on_error plugin failed");
            }
        }
    }

    /// Pass one streamed chunk through the `on_stream_chunk` stage.
    ///
    /// Returns the (possibly annotated) chunk, or the plugin error that
    /// should cut the stream.
    pub async fn run_stream_chunk(
        &self,
        ctx: &mut PluginContext,
        chunk: ChatChunk,
    ) -> Result<ChatChunk, GatewayError> {
        if self.on_stream_chunk.is_empty() {
            return Ok(chunk);
        }
        ctx.chunk = Some(chunk);
        let outcome = self.run(PluginStage::OnStreamChunk, ctx).await;
        let chunk = ctx.chunk.take();
        outcome?;
        chunk.ok_or_else(|| GatewayError::plugin("on_stream_chunk", "plugin dropped the chunk"))
    }
}

impl std::fmt::Debug for PluginPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginPipeline")
            .field("before_request", &self.names(PluginStage::BeforeRequest))
            .field("after_response", &self.names(PluginStage::AfterResponse))
            .field("on_error", &self.names(PluginStage::OnError))
            .field("on_stream_chunk", &self.names(PluginStage::OnStreamChunk))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Recorder {
        name: &'static str,
        calls: Arc<AtomicU32>,
        fail: bool,
    }

    #[async_trait]
    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self, ctx: &mut PluginContext) -> Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ctx.metadata.insert(
                self.name.to_string(),
                Value::from(self.calls.load(Ordering::SeqCst)),
            );
            if self.fail {
                Err(GatewayError::validation("nope"))
            } else {
                Ok(())
            }
        }
    }

    fn recorder(name: &'static str, fail: bool) -> (Box<Recorder>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        (
            Box::new(Recorder {
                name,
                calls: calls.clone(),
                fail,
            }),
            calls,
        )
    }

    #[tokio::test]
    async fn stage_runs_in_registration_order() {
        let mut pipeline = PluginPipeline::new();
        let (a, _) = recorder("a", false);
        let (b, _) = recorder("b", false);
        pipeline.register(PluginStage::BeforeRequest, a).unwrap();
        pipeline.register(PluginStage::BeforeRequest, b).unwrap();
        assert_eq!(pipeline.names(PluginStage::BeforeRequest), vec!["a", "b"]);

        let mut ctx = PluginContext::new(ChatRequest::new("m").user("x"));
        pipeline.run(PluginStage::BeforeRequest, &mut ctx).await.unwrap();
        assert!(ctx.metadata.contains_key("a"));
        assert!(ctx.metadata.contains_key("b"));
    }

    #[tokio::test]
    async fn first_error_aborts_stage() {
        let mut pipeline = PluginPipeline::new();
        let (a, _) = recorder("a", true);
        let (b, b_calls) = recorder("b", false);
        pipeline.register(PluginStage::BeforeRequest, a).unwrap();
        pipeline.register(PluginStage::BeforeRequest, b).unwrap();

        let mut ctx = PluginContext::new(ChatRequest::new("m").user("x"));
        let err = pipeline
            .run(PluginStage::BeforeRequest, &mut ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("plugin a"));
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn duplicate_name_in_stage_rejected() {
        let mut pipeline = PluginPipeline::new();
        let (a1, _) = recorder("dup", false);
        let (a2, _) = recorder("dup", false);
        pipeline.register(PluginStage::OnError, a1).unwrap();
        let err = pipeline.register(PluginStage::OnError, a2).unwrap_err();
        assert!(err.to_string().contains("duplicate plugin"));

        // Same name in a different stage is fine
        let (a3, _) = recorder("dup", false);
        pipeline.register(PluginStage::AfterResponse, a3).unwrap();
    }

    #[tokio::test]
    async fn init_failure_rejects_registration() {
        struct BadInit;

        #[async_trait]
        impl Plugin for BadInit {
            fn name(&self) -> &str {
                "bad-init"
            }

            fn init(&mut self, _config: &HashMap<String, Value>) -> Result<(), GatewayError> {
                Err(GatewayError::configuration("missing required key"))
            }

            async fn execute(&self, _ctx: &mut PluginContext) -> Result<(), GatewayError> {
                Ok(())
            }
        }

        let mut pipeline = PluginPipeline::new();
        let err = pipeline
            .register(PluginStage::BeforeRequest, Box::new(BadInit))
            .unwrap_err();
        assert!(err.to_string().contains("init failed"));
        assert!(pipeline.names(PluginStage::BeforeRequest).is_empty());
    }

    #[tokio::test]
    async fn on_error_plugins_cannot_mask_the_failure() {
        let mut pipeline = PluginPipeline::new();
        let (a, a_calls) = recorder("observer-1", true);
        let (b, b_calls) = recorder("observer-2", false);
        pipeline.register(PluginStage::OnError, a).unwrap();
        pipeline.register(PluginStage::OnError, b).unwrap();

        let mut ctx = PluginContext::new(ChatRequest::new("m").user("x"));
        ctx.error = Some("upstream exploded".to_string());
        // Does not return a Result at all: observers cannot replace the error
        pipeline.run_on_error(&mut ctx).await;
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stream_chunk_passes_through_when_stage_empty() {
        let pipeline = PluginPipeline::new();
        let mut ctx = PluginContext::new(ChatRequest::new("m").user("x"));
        let chunk = ChatChunk::content("id", "m", "hello");
        let out = pipeline.run_stream_chunk(&mut ctx, chunk).await.unwrap();
        assert_eq!(out.first_content(), Some("hello"));
    }
}
