//! Pipeline context types.
//!
//! The [`GatewayContext`] carries state through the request pipeline. Each
//! stage enriches it: correlation sets the ID, rate limiting records the
//! resolved client key, and authentication attaches the verified identity.

use portico_core::{CorrelationId, ForwardedIdentity};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

/// Context that flows through the request pipeline.
///
/// The context is mutable during pipeline processing. When the terminal
/// dispatcher runs, it receives a snapshot of the enriched context along
/// with the request.
///
/// # Example
///
/// ```
/// use portico_middleware::context::GatewayContext;
/// use portico_core::ForwardedIdentity;
///
/// let mut ctx = GatewayContext::new();
/// ctx.set_identity(ForwardedIdentity::new(42, "alice"));
///
/// assert_eq!(ctx.identity().unwrap().username(), "alice");
/// ```
#[derive(Debug)]
pub struct GatewayContext {
    /// Correlation ID for this request.
    correlation_id: CorrelationId,

    /// Identity asserted by the identity service, when authenticated.
    identity: Option<ForwardedIdentity>,

    /// Client key used for rate limiting (proxy-aware IP).
    client_key: Option<String>,

    /// Peer address of the TCP connection.
    peer_addr: Option<SocketAddr>,

    /// When the request started processing.
    started_at: Instant,

    /// Type-erased extension data for middleware-private state.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl GatewayContext {
    /// Creates a new context with a fresh correlation ID.
    ///
    /// The correlation stage replaces the ID when the client supplied one.
    #[must_use]
    pub fn new() -> Self {
        Self {
            correlation_id: CorrelationId::generate(),
            identity: None,
            client_key: None,
            peer_addr: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Creates a context for a connection from the given peer.
    #[must_use]
    pub fn for_peer(peer_addr: SocketAddr) -> Self {
        let mut ctx = Self::new();
        ctx.peer_addr = Some(peer_addr);
        ctx
    }

    /// Returns the correlation ID.
    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Sets the correlation ID.
    ///
    /// This should only be called by the correlation middleware.
    pub fn set_correlation_id(&mut self, id: CorrelationId) {
        self.correlation_id = id;
    }

    /// Returns the verified identity, if the caller authenticated.
    #[must_use]
    pub fn identity(&self) -> Option<&ForwardedIdentity> {
        self.identity.as_ref()
    }

    /// Sets the verified identity.
    ///
    /// This should only be called by the authentication middleware.
    pub fn set_identity(&mut self, identity: ForwardedIdentity) {
        self.identity = Some(identity);
    }

    /// Returns the resolved client key, if rate limiting ran.
    #[must_use]
    pub fn client_key(&self) -> Option<&str> {
        self.client_key.as_deref()
    }

    /// Sets the resolved client key.
    pub fn set_client_key(&mut self, key: String) {
        self.client_key = Some(key);
    }

    /// Returns the peer address of the TCP connection.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Sets the peer address.
    pub fn set_peer_addr(&mut self, addr: SocketAddr) {
        self.peer_addr = Some(addr);
    }

    /// Returns when the request started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    ///
    /// Extensions allow middleware to stash data that later stages can
    /// retrieve without widening the context struct.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }
}

impl Default for GatewayContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for GatewayContext {
    fn clone(&self) -> Self {
        // Extensions are not cloned - they don't implement Clone
        Self {
            correlation_id: self.correlation_id.clone(),
            identity: self.identity.clone(),
            client_key: self.client_key.clone(),
            peer_addr: self.peer_addr,
            started_at: self.started_at,
            extensions: HashMap::new(),
        }
    }
}
