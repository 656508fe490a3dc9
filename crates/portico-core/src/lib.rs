//! # Portico Core
//!
//! Core types and traits for the Portico edge gateway.
//!
//! This crate provides the foundational types used throughout Portico:
//!
//! - [`CorrelationId`] - Per-request correlation identifier propagated end to end
//! - [`ForwardedIdentity`] - Identity asserted by the identity service after
//!   token validation
//! - [`GatewayError`] - Standard error types with HTTP status mapping
//! - [`ErrorBody`] - The JSON error envelope returned to clients

#![doc(html_root_url = "https://docs.rs/portico-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod correlation;
mod error;
mod identity;

pub use correlation::{CorrelationId, CORRELATION_HEADER};
pub use error::{ErrorBody, ErrorCategory, GatewayError, GatewayResult};
pub use identity::{ForwardedIdentity, USERNAME_HEADER, USER_ID_HEADER};
