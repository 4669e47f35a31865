//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Settings errors ───────────────────────────────────────────────────────────

/// Errors raised while locating or validating the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Didn't find the config file. Searched:\n{searched}")]
    NotFound { searched: String },

    #[error("Unrecognized config file extension: {0} (expected .yml or .yaml)")]
    UnsupportedFormat(String),

    #[error("Missing required setting '{0}'")]
    MissingField(&'static str),
}

// ── Agent errors ──────────────────────────────────────────────────────────────

/// Protocol failures from the download agent's control API.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("could not extract session cookie from login response")]
    AuthenticationFailed,

    #[error("malformed status response: {0}")]
    MalformedStatus(String),
}

// ── Cloud errors ──────────────────────────────────────────────────────────────

/// Failures reported by the cloud control plane.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("cloud API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("ssh key '{0}' not found in the cloud account")]
    KeyNotFound(String),

    #[error("instance {0} not found")]
    InstanceNotFound(u64),
}

// ── Run errors ────────────────────────────────────────────────────────────────

/// Fatal orchestration failures.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no running instance found with address {0}")]
    NoInstanceAtAddress(String),

    #[error("instance {0} has no public address")]
    AddressUnavailable(u64),
}
