// ── Core error types ──
//
// Errors surfaced by the resource model. The two outcomes callers must
// branch on -- a missing resource and a stale concurrency token -- keep
// their own variants; everything else from the transport layer is carried
// through unchanged so the href and status context survive.

use smc_api::Href;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Resource outcomes ────────────────────────────────────────────
    #[error("Resource not found: {href}")]
    ResourceNotFound { href: Href },

    #[error("Resource conflict on {href} (HTTP {status}): {message}")]
    ResourceConflict {
        href: Href,
        status: u16,
        message: String,
    },

    #[error("Request to {href} failed (HTTP {status}): {message}")]
    RequestFailed {
        href: Href,
        status: u16,
        message: String,
    },

    #[error("Unsupported operation '{operation}' on {href}")]
    UnsupportedOperation { href: Href, operation: String },

    #[error("No {kind} named '{name}'")]
    NotFound { kind: String, name: String },

    #[error("{count} elements match {kind} '{name}' -- narrow the search by kind")]
    Ambiguous {
        kind: String,
        name: String,
        count: usize,
    },

    // ── Session ──────────────────────────────────────────────────────
    #[error("Not logged in -- call login() first")]
    NotLoggedIn,

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Model ────────────────────────────────────────────────────────
    #[error("Kind '{kind}' is already bound to {existing}, cannot bind {attempted}")]
    RegistryConflict {
        kind: String,
        existing: &'static str,
        attempted: &'static str,
    },

    #[error("Field '{field}' of {href} is not {expected}")]
    InvalidField {
        href: Href,
        field: String,
        expected: &'static str,
    },

    #[error("Element {href} has no representation to act on: {reason}")]
    InvalidRepresentation { href: Href, reason: String },

    #[error("Failed to encode element body: {0}")]
    Encode(String),

    // ── Transport (wrapped) ──────────────────────────────────────────
    #[error(transparent)]
    Api(smc_api::Error),
}

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. } | Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ResourceConflict { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<smc_api::Error> for CoreError {
    fn from(err: smc_api::Error) -> Self {
        match err {
            smc_api::Error::ResourceNotFound { href } => Self::ResourceNotFound { href },
            smc_api::Error::ResourceConflict {
                href,
                status,
                message,
            } => Self::ResourceConflict {
                href,
                status,
                message,
            },
            smc_api::Error::NotLoggedIn => Self::NotLoggedIn,
            smc_api::Error::Authentication { message } => Self::Authentication { message },
            smc_api::Error::UnsupportedOperation { href, operation } => {
                Self::UnsupportedOperation { href, operation }
            }
            other => Self::Api(other),
        }
    }
}
