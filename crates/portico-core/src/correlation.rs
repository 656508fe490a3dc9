//! Correlation identifier types.
//!
//! Every request that enters the gateway carries a correlation ID for the
//! rest of its life: it is forwarded to upstream services, attached to the
//! identity-service validation call, echoed on the client response, and
//! included in structured logs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The header that carries the correlation ID on requests and responses.
pub const CORRELATION_HEADER: &str = "X-Correlation-Id";

/// A unique identifier correlating all log lines and upstream calls for
/// one client request.
///
/// Clients may supply their own ID via [`CORRELATION_HEADER`]; the gateway
/// preserves it verbatim. When absent, a UUID v7 is generated so IDs stay
/// time-ordered across instances.
///
/// # Example
///
/// ```
/// use portico_core::CorrelationId;
///
/// let id = CorrelationId::generate();
/// assert!(!id.as_str().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generates a fresh correlation ID using UUID v7.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Parses a correlation ID from a header value.
    ///
    /// Returns `None` when the value is empty or whitespace-only; callers
    /// should fall back to [`CorrelationId::generate`] in that case. The
    /// value is otherwise preserved verbatim, clients are allowed to use
    /// non-UUID formats.
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::generate()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CorrelationId> for String {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = CorrelationId::generate();
        let b = CorrelationId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_header_preserves_value() {
        let id = CorrelationId::from_header("client-supplied-id").unwrap();
        assert_eq!(id.as_str(), "client-supplied-id");
    }

    #[test]
    fn test_from_header_trims_whitespace() {
        let id = CorrelationId::from_header("  abc-123  ").unwrap();
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn test_from_header_rejects_empty() {
        assert!(CorrelationId::from_header("").is_none());
        assert!(CorrelationId::from_header("   ").is_none());
    }

    #[test]
    fn test_serde_transparent() {
        let id = CorrelationId::from_header("abc").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn test_display() {
        let id = CorrelationId::from_header("xyz").unwrap();
        assert_eq!(id.to_string(), "xyz");
    }
}
