use thiserror::Error;

use crate::types::{ApiVersion, Href};

/// Which side of the wire a transport failure happened on.
///
/// `NotSent` failures are always safe to retry. `ResponseLost` means the
/// server may already have acted on the request, so non-idempotent
/// operations must not be replayed blindly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// The request never reached the server (connect refused, DNS, builder error).
    NotSent,
    /// The request was sent but the response was lost (timeout, reset mid-body).
    ResponseLost,
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSent => f.write_str("request not sent"),
            Self::ResponseLost => f.write_str("response lost"),
        }
    }
}

/// Top-level error type for the `smc-api` crate.
///
/// Only transport, session and programming failures are raised here.
/// Ordinary validation failures from the server come back as a failed
/// [`SmcResult`](crate::SmcResult) instead.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// Login rejected, or the session expired / lacks permission (401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// No protocol version is supported by both client and server.
    #[error("No compatible API version: client supports {client:?}, server offers {server:?}")]
    VersionMismatch {
        client: Vec<ApiVersion>,
        server: Vec<ApiVersion>,
    },

    /// An operation was attempted without an active session.
    #[error("Not logged in -- call login() first")]
    NotLoggedIn,

    // ── Transport ───────────────────────────────────────────────────
    /// Connection, timeout or interrupted-body failure.
    #[error("HTTP transport error ({failure}) on {method} {href}: {source}")]
    Transport {
        failure: TransportFailure,
        method: reqwest::Method,
        href: Href,
        #[source]
        source: reqwest::Error,
    },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// A success response body was not valid UTF-8 or not valid JSON.
    #[error("Failed to decode response from {href}: {message}")]
    Decode {
        href: Href,
        message: String,
        body: String,
    },

    // ── Resource outcomes ───────────────────────────────────────────
    /// The server reported that the resource does not exist (404).
    #[error("Resource not found: {href}")]
    ResourceNotFound { href: Href },

    /// The concurrency token presented with a mutation is stale (409/412).
    #[error("Resource conflict on {href} (HTTP {status}): {message}")]
    ResourceConflict {
        href: Href,
        status: u16,
        message: String,
    },

    /// The requested action is not offered by this resource.
    #[error("Unsupported operation '{operation}' on {href}")]
    UnsupportedOperation { href: Href, operation: String },

    /// The server does not advertise an entry point for this kind.
    #[error("Unsupported entry point: {0}")]
    UnsupportedEntryPoint(String),
}

impl Error {
    /// Returns `true` if this error indicates the session is unusable
    /// and logging in again might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::NotLoggedIn)
    }

    /// Returns `true` if this is a transient error worth retrying for an
    /// idempotent request.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { failure, source, .. } => {
                *failure == TransportFailure::NotSent || source.is_timeout()
            }
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }

    /// Returns `true` if a stale concurrency token was rejected.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ResourceConflict { .. })
    }

    /// The href of the request that failed, when one applies.
    pub fn href(&self) -> Option<&Href> {
        match self {
            Self::Transport { href, .. }
            | Self::Decode { href, .. }
            | Self::ResourceNotFound { href }
            | Self::ResourceConflict { href, .. }
            | Self::UnsupportedOperation { href, .. } => Some(href),
            _ => None,
        }
    }

    /// Build a transport error from a `reqwest` failure.
    ///
    /// Connect and builder errors never reach the server. Anything else
    /// (timeouts included) may have been acted on.
    pub(crate) fn transport(method: reqwest::Method, href: Href, source: reqwest::Error) -> Self {
        let failure = if source.is_connect() || source.is_builder() {
            TransportFailure::NotSent
        } else {
            TransportFailure::ResponseLost
        };
        Self::Transport {
            failure,
            method,
            href,
            source,
        }
    }
}
