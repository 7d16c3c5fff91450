//! The routing engine

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, warn};

use super::config::RouterConfig;
use super::strategy;
use crate::core::plugins::{PluginContext, PluginPipeline, PluginStage};
use crate::core::providers::ProviderRegistry;
use crate::core::types::{
    ChatRequest, ChatResponse, ChunkStream, GatewayError, RequestContext,
};

/// Strategy-driven dispatcher over the provider registry.
///
/// One `route` call is sequential: targets are tried per the strategy's
/// order, each target's retries are exhausted before moving on, and there is
/// no speculative fan-out. Cancellation short-circuits both retries and
/// fallback.
pub struct Router {
    config: RouterConfig,
    registry: Arc<ProviderRegistry>,
    pipeline: Arc<PluginPipeline>,
}

impl Router {
    /// Router with an empty plugin pipeline
    pub fn new(config: RouterConfig, registry: ProviderRegistry) -> Result<Self, GatewayError> {
        Self::with_pipeline(config, registry, PluginPipeline::new())
    }

    /// Router with a caller-assembled pipeline
    pub fn with_pipeline(
        config: RouterConfig,
        registry: ProviderRegistry,
        pipeline: PluginPipeline,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: Arc::new(registry),
            pipeline: Arc::new(pipeline),
        })
    }

    /// The registry backing this router
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Route a chat completion.
    ///
    /// Validation failures return before any plugin or network activity.
    /// `before_request` plugin errors abort with no upstream call issued.
    pub async fn route(
        &self,
        ctx: &RequestContext,
        request: ChatRequest,
    ) -> Result<ChatResponse, GatewayError> {
        request.validate()?;

        let mut pctx = PluginContext::new(request);
        self.pipeline.run(PluginStage::BeforeRequest, &mut pctx).await?;

        let order = strategy::selection_order(&self.config, &self.registry);
        let mut last_err: Option<GatewayError> = None;

        for target in order {
            pctx.target_name = target.provider.clone();

            let provider = match self.registry.get(&target.provider) {
                Some(provider) => provider,
                None => {
                    let err = GatewayError::configuration(format!(
                        "routing target '{}' has no registered provider",
                        target.provider
                    ));
                    pctx.attempt = 1;
                    pctx.error = Some(err.to_string());
                    self.pipeline.run_on_error(&mut pctx).await;
                    last_err = Some(err);
                    continue;
                }
            };

            let attempts = target.retry.attempts.max(1);
            for attempt in 1..=attempts {
                pctx.attempt = attempt;
                if ctx.is_cancelled() {
                    pctx.error = Some(GatewayError::Cancelled.to_string());
                    self.pipeline.run_on_error(&mut pctx).await;
                    return Err(GatewayError::Cancelled);
                }

                debug!(
                    request_id = %ctx.request_id,
                    target = %target.provider,
                    attempt,
                    "routing attempt"
                );

                match provider.complete(ctx, &pctx.request).await {
                    Ok(response) => {
                        pctx.response = Some(response);
                        if let Err(err) =
                            self.pipeline.run(PluginStage::AfterResponse, &mut pctx).await
                        {
                            // Surfaced as if the provider had failed; the
                            // upstream call did succeed, so no retry
                            pctx.error = Some(err.to_string());
                            self.pipeline.run_on_error(&mut pctx).await;
                            return Err(err);
                        }
                        return Ok(pctx
                            .response
                            .take()
                            .expect("response present after successful call"));
                    }
                    Err(err) => {
                        warn!(
                            request_id = %ctx.request_id,
                            target = %target.provider,
                            attempt,
                            error = %err,
                            "provider call failed"
                        );
                        pctx.error = Some(err.to_string());
                        self.pipeline.run_on_error(&mut pctx).await;
                        if matches!(err, GatewayError::Cancelled) {
                            return Err(err);
                        }
                        // Only transport and provider application errors
                        // are worth another attempt on the same target
                        let retryable = err.is_retryable();
                        last_err = Some(err);
                        if !retryable {
                            break;
                        }
                    }
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| GatewayError::configuration("no routing targets configured")))
    }

    /// Route a streaming chat completion.
    ///
    /// Retries and fallback apply to establishing the stream; once frames
    /// flow, failures travel inside the stream. Every frame passes through
    /// the `on_stream_chunk` stage, and a plugin error there cuts the stream
    /// with a final error item.
    pub async fn route_stream(
        &self,
        ctx: &RequestContext,
        request: ChatRequest,
    ) -> Result<ChunkStream, GatewayError> {
        request.validate()?;

        let mut pctx = PluginContext::new(request);
        self.pipeline.run(PluginStage::BeforeRequest, &mut pctx).await?;

        let order = strategy::selection_order(&self.config, &self.registry);
        let mut last_err: Option<GatewayError> = None;

        for target in order {
            pctx.target_name = target.provider.clone();

            let provider = match self.registry.get(&target.provider) {
                Some(provider) => provider,
                None => {
                    let err = GatewayError::configuration(format!(
                        "routing target '{}' has no registered provider",
                        target.provider
                    ));
                    pctx.attempt = 1;
                    pctx.error = Some(err.to_string());
                    self.pipeline.run_on_error(&mut pctx).await;
                    last_err = Some(err);
                    continue;
                }
            };

            let attempts = target.retry.attempts.max(1);
            for attempt in 1..=attempts {
                pctx.attempt = attempt;
                if ctx.is_cancelled() {
                    pctx.error = Some(GatewayError::Cancelled.to_string());
                    self.pipeline.run_on_error(&mut pctx).await;
                    return Err(GatewayError::Cancelled);
                }

                debug!(
                    request_id = %ctx.request_id,
                    target = %target.provider,
                    attempt,
                    "routing stream attempt"
                );

                match provider.complete_stream(ctx, &pctx.request).await {
                    Ok(stream) => {
                        return Ok(Self::wrap_stream(stream, self.pipeline.clone(), pctx));
                    }
                    Err(err) => {
                        warn!(
                            request_id = %ctx.request_id,
                            target = %target.provider,
                            attempt,
                            error = %err,
                            "provider stream failed to establish"
                        );
                        pctx.error = Some(err.to_string());
                        self.pipeline.run_on_error(&mut pctx).await;
                        if matches!(err, GatewayError::Cancelled) {
                            return Err(err);
                        }
                        let retryable = err.is_retryable();
                        last_err = Some(err);
                        if !retryable {
                            break;
                        }
                    }
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| GatewayError::configuration("no routing targets configured")))
    }

    fn wrap_stream(
        stream: ChunkStream,
        pipeline: Arc<PluginPipeline>,
        mut pctx: PluginContext,
    ) -> ChunkStream {
        Box::pin(async_stream::stream! {
            let mut inner = stream;
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => match pipeline.run_stream_chunk(&mut pctx, chunk).await {
                        Ok(chunk) => yield Ok(chunk),
                        Err(err) => {
                            yield Err(err);
                            break;
                        }
                    },
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("strategy", &self.config.strategy)
            .field("targets", &self.config.targets.len())
            .finish()
    }
}
