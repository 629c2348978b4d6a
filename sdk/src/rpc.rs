use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use dgen_wire::WireError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("service error: {0}")]
    Service(Box<dyn StdError + Send + Sync>),

    #[error("no handler registered for {0}")]
    UnknownMethod(String),
}

impl RpcError {
    /// Wrap an application error returned from a service implementation.
    pub fn service<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        RpcError::Service(err.into())
    }
}

/// A byte-oriented method handler: encoded request in, encoded reply out.
/// Fire-and-forget methods reply with an empty buffer.
pub type MethodHandler = Box<dyn Fn(&[u8]) -> Result<Vec<u8>, RpcError> + Send + Sync>;

/// The transport-side handle generated `register_*` functions bind to.
pub trait Registrar {
    /// Bind `method` (always `"<serviceName>.<methodName>"`) to `handler`.
    fn register(&mut self, method: String, handler: MethodHandler);
}

/// An in-process dispatcher keyed by full method name.
#[derive(Default)]
pub struct Router {
    handlers: HashMap<String, MethodHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invoke the handler bound to `method` with an encoded request.
    pub fn call(&self, method: &str, req: &[u8]) -> Result<Vec<u8>, RpcError> {
        let handler = self
            .handlers
            .get(method)
            .ok_or_else(|| RpcError::UnknownMethod(method.to_string()))?;
        debug!(method, request_len = req.len(), "dispatching call");
        handler(req)
    }
}

impl Registrar for Router {
    fn register(&mut self, method: String, handler: MethodHandler) {
        debug!(method = %method, "registering handler");
        self.handlers.insert(method, handler);
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("methods", &self.methods())
            .finish()
    }
}
