//! ---
//! msim_section: "04-driver-integration"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Browser driver capability seam and backend adapters."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! The driver capability the workflow core depends on but does not
//! implement. Action steps are written against the [`Driver`]/[`Page`]
//! traits; the [`webdriver`] module maps those traits onto a W3C WebDriver
//! endpoint, and the testkit crate provides a scripted in-memory backend.

/// Result alias used throughout the driver crate.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Error type for driver operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Transport-level failure talking to the automation backend.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    /// The backend answered with a protocol-level error payload.
    #[error("driver protocol error ({status}): {message}")]
    Protocol {
        /// HTTP status carried by the error response.
        status: u16,
        /// Error kind and message reported by the backend.
        message: String,
    },
    /// A selector that must resolve matched nothing.
    #[error("no element matches selector {selector}")]
    NoSuchElement {
        /// The selector that failed to resolve.
        selector: String,
    },
    /// The page did not reach a ready state within the configured window.
    #[error("navigation did not settle within {timeout_secs}s")]
    NavigationTimeout {
        /// The configured poll window, in seconds.
        timeout_secs: u64,
    },
    /// Reading or writing an on-disk artifact failed.
    #[error("artifact io error: {0}")]
    Artifact(#[from] std::io::Error),
    /// The backend answered with a payload the adapter cannot interpret.
    #[error("malformed driver payload: {0}")]
    Payload(String),
    /// A URL could not be derived from the configured endpoint.
    #[error("invalid driver url: {0}")]
    Endpoint(#[from] url::ParseError),
}

pub mod capability;
pub mod webdriver;

pub use capability::{CookieRecord, Driver, ElementHandle, Page};
pub use webdriver::WebDriver;
