//! Per-request context carried through every provider operation

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

/// Ambient state for one gateway call.
///
/// Carries the caller's cancellation token; every upstream HTTP call, SSE
/// read, and polling sleep selects against it. The gateway imposes no
/// timeout of its own — callers encode deadlines by cancelling the token.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id, attached to tracing output
    pub request_id: String,
    /// Caller-owned cancellation token
    pub cancellation: CancellationToken,
    /// Free-form metadata visible to plugins
    pub metadata: HashMap<String, String>,
}

impl RequestContext {
    /// Fresh context with a generated request id
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().simple().to_string(),
            cancellation: CancellationToken::new(),
            metadata: HashMap::new(),
        }
    }

    /// Context bound to an existing cancellation token
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().simple().to_string(),
            cancellation,
            metadata: HashMap::new(),
        }
    }

    /// True once the caller has cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
