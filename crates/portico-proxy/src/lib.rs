//! # Portico Proxy
//!
//! Routing and upstream forwarding for the Portico edge gateway.
//!
//! After the request pipeline admits and authenticates a request, this
//! crate decides where it goes and what happens when the upstream is
//! down:
//!
//! - [`RouteTable`] matches request paths against route prefixes, first
//!   match wins in declaration order.
//! - [`Forwarder`] relays the request to the route's target, preserving
//!   headers and body.
//! - [`CircuitBreaker`] stops hammering an upstream that keeps failing.
//! - [`FallbackRegistry`] produces the per-route 503 response served when
//!   forwarding fails or the breaker is open.
//! - [`diagnostics`] builds the structured 404 for unmatched paths.
//!
//! [`RouteDispatcher`] ties these together behind a single `dispatch`
//! call, which the server installs as the pipeline's terminal handler.

#![doc(html_root_url = "https://docs.rs/portico-proxy/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod breaker;
pub mod diagnostics;
pub mod dispatch;
pub mod fallback;
pub mod forward;
pub mod table;

pub use breaker::{BreakerState, CircuitBreaker};
pub use dispatch::RouteDispatcher;
pub use fallback::FallbackRegistry;
pub use forward::{ForwardError, Forwarder};
pub use table::{Route, RouteTable};
