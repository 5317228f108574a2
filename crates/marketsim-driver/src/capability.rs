//! ---
//! msim_section: "04-driver-integration"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Abstract page and driver traits consumed by the workflow core."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Opaque reference to a DOM element owned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(String);

impl ElementHandle {
    /// Wrap a backend-assigned element identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The backend-assigned identifier.
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Cookie captured from or replayed into a page context.
///
/// Optional fields default on deserialize so records written by other
/// tooling still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CookieRecord {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain scope, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Path scope, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Expiry as seconds since the epoch; session cookies carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    /// Whether the cookie is HTTP-only.
    #[serde(default)]
    pub http_only: bool,
    /// Whether the cookie is restricted to secure transports.
    #[serde(default)]
    pub secure: bool,
}

impl CookieRecord {
    /// Build a bare name/value cookie.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            http_only: false,
            secure: false,
        }
    }
}

/// Factory for page contexts against one automation backend.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a fresh page (tab) with an empty cookie jar.
    async fn new_page(&self) -> Result<Box<dyn Page>>;
}

/// One page context: navigation, element queries, and input.
///
/// Methods take `&mut self`: the simulation is a single cooperative flow
/// and a page is never shared across steps concurrently.
#[async_trait]
pub trait Page: Send {
    /// Navigate to an absolute URL.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// First element matching `selector`, if any.
    async fn query(&mut self, selector: &str) -> Result<Option<ElementHandle>>;

    /// All elements matching `selector`; an empty result is not an error.
    async fn query_all(&mut self, selector: &str) -> Result<Vec<ElementHandle>>;

    /// All elements matching `selector` within `element`.
    async fn query_within(
        &mut self,
        element: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>>;

    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<()>;

    /// Click a previously resolved element.
    async fn click_element(&mut self, element: &ElementHandle) -> Result<()>;

    /// Type `text` into the first element matching `selector`.
    async fn type_text(&mut self, selector: &str, text: &str) -> Result<()>;

    /// Choose the option with the given value on a `<select>` element.
    async fn select(&mut self, selector: &str, value: &str) -> Result<()>;

    /// Block until the last triggered navigation has settled.
    async fn wait_for_navigation(&mut self) -> Result<()>;

    /// Cookies visible in this page context.
    async fn cookies(&mut self) -> Result<Vec<CookieRecord>>;

    /// Replay previously captured cookies into this page context.
    async fn set_cookies(&mut self, cookies: &[CookieRecord]) -> Result<()>;

    /// Read a named property (`href`, `innerText`, ...) off an element.
    async fn property(&mut self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    /// Render the current page to an on-disk artifact (PDF).
    async fn render_to_artifact(&mut self, path: &Path) -> Result<()>;

    /// Release the page and its backend resources.
    async fn close(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_roundtrips_through_json() {
        let cookie = CookieRecord {
            name: "session".into(),
            value: "abc123".into(),
            domain: Some("127.0.0.1".into()),
            path: Some("/".into()),
            expires: Some(1_900_000_000.0),
            http_only: true,
            secure: false,
        };
        let json = serde_json::to_string(&cookie).unwrap();
        let back: CookieRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cookie);
    }

    #[test]
    fn cookie_tolerates_missing_optional_fields() {
        let back: CookieRecord =
            serde_json::from_str(r#"{"name":"session","value":"abc123"}"#).unwrap();
        assert_eq!(back, CookieRecord::new("session", "abc123"));
    }
}
