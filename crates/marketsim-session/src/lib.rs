//! ---
//! msim_section: "02-session-persistence"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Session persistence abstractions and storage bindings."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Durable per-user session state. Every synthetic user owns exactly one
//! [`UserSession`] record, keyed by user name and persisted as a single JSON
//! file; the record is the system's long-lived proof that the identity
//! already exists on the target application.

/// Result alias used throughout the session crate.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Error type for the session subsystem.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No record is stored under the requested user name.
    #[error("no session stored for user {name}")]
    NotFound {
        /// The user name that failed to resolve.
        name: String,
    },
    /// Wrapper for IO errors while reading or writing session files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub mod record;
pub mod store;

pub use record::{OrderUrls, SessionDelta, UserSession};
pub use store::SessionStore;
