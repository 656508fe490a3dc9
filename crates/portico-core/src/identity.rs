//! Forwarded identity types.
//!
//! The gateway never validates tokens itself. It delegates to the identity
//! service, which answers a successful validation with the caller's user ID
//! and username in response headers. Those values become trusted forwarded
//! headers on the upstream request.

use serde::{Deserialize, Serialize};

/// Header carrying the authenticated user's ID to upstream services.
///
/// Inbound copies of this header are stripped before authentication runs,
/// only the gateway may assert it.
pub const USER_ID_HEADER: &str = "userId";

/// Header carrying the authenticated user's username to upstream services.
///
/// Stripped from inbound requests for the same reason as [`USER_ID_HEADER`].
pub const USERNAME_HEADER: &str = "username";

/// Identity asserted by the identity service for an authenticated caller.
///
/// The user ID is numeric by contract; a `userId` header that does not
/// parse as an integer is treated as an unusable identity response.
///
/// # Example
///
/// ```
/// use portico_core::ForwardedIdentity;
///
/// let identity = ForwardedIdentity::new(42, "alice");
/// assert_eq!(identity.user_id(), 42);
/// assert_eq!(identity.username(), "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedIdentity {
    /// Stable numeric user identifier.
    user_id: i64,

    /// Human-readable username.
    username: String,
}

impl ForwardedIdentity {
    /// Creates a forwarded identity from validated values.
    #[must_use]
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }

    /// Returns the user ID.
    #[must_use]
    pub const fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}
