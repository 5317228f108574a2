//! ---
//! msim_section: "04-driver-integration"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "W3C WebDriver adapter for the driver capability."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use marketsim_common::config::DriverConfig;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use tracing::{debug, trace};
use url::Url;

use crate::capability::{CookieRecord, Driver, ElementHandle, Page};
use crate::{DriverError, Result};

const READINESS_POLL: Duration = Duration::from_millis(250);

/// Driver implementation speaking the W3C WebDriver wire protocol.
#[derive(Debug, Clone)]
pub struct WebDriver {
    http: Client,
    endpoint: Url,
    navigation_timeout: Duration,
}

impl WebDriver {
    /// Build an adapter against the configured remote endpoint.
    pub fn new(config: &DriverConfig) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            navigation_timeout: config.navigation_timeout,
        })
    }
}

#[async_trait]
impl Driver for WebDriver {
    async fn new_page(&self) -> Result<Box<dyn Page>> {
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": ["--headless=new"] }
                }
            }
        });
        let url = self.endpoint.join("session")?;
        let value = dispatch(&self.http, Method::POST, url, Some(body)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Payload("session response missing sessionId".into()))?;
        debug!(session = %session_id, "webdriver session created");
        let base = self.endpoint.join(&format!("session/{session_id}/"))?;
        Ok(Box::new(WebDriverPage {
            http: self.http.clone(),
            base,
            navigation_timeout: self.navigation_timeout,
        }))
    }
}

struct WebDriverPage {
    http: Client,
    base: Url,
    navigation_timeout: Duration,
}

impl WebDriverPage {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = self.base.join(path)?;
        dispatch(&self.http, method, url, body).await
    }

    async fn find(&self, selector: &str) -> Result<Option<ElementHandle>> {
        let body = json!({ "using": "css selector", "value": selector });
        match self.command(Method::POST, "element", Some(body)).await {
            Ok(value) => Ok(Some(element_from_value(&value)?)),
            Err(DriverError::Protocol { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn require(&self, selector: &str) -> Result<ElementHandle> {
        self.find(selector)
            .await?
            .ok_or_else(|| DriverError::NoSuchElement {
                selector: selector.to_owned(),
            })
    }

    async fn ready_state(&self) -> Result<String> {
        let body = json!({ "script": "return document.readyState", "args": [] });
        let value = self.command(Method::POST, "execute/sync", Some(body)).await?;
        Ok(value.as_str().unwrap_or_default().to_owned())
    }

    fn session_url(&self) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
        }
        url
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn goto(&mut self, url: &str) -> Result<()> {
        trace!(%url, "navigate");
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn query(&mut self, selector: &str) -> Result<Option<ElementHandle>> {
        self.find(selector).await
    }

    async fn query_all(&mut self, selector: &str) -> Result<Vec<ElementHandle>> {
        let body = json!({ "using": "css selector", "value": selector });
        let value = self.command(Method::POST, "elements", Some(body)).await?;
        elements_from_value(&value)
    }

    async fn query_within(
        &mut self,
        element: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>> {
        let body = json!({ "using": "css selector", "value": selector });
        let path = format!("element/{}/elements", element.id());
        let value = self.command(Method::POST, &path, Some(body)).await?;
        elements_from_value(&value)
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let element = self.require(selector).await?;
        self.click_element(&element).await
    }

    async fn click_element(&mut self, element: &ElementHandle) -> Result<()> {
        let path = format!("element/{}/click", element.id());
        self.command(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let element = self.require(selector).await?;
        let path = format!("element/{}/value", element.id());
        self.command(Method::POST, &path, Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    async fn select(&mut self, selector: &str, value: &str) -> Result<()> {
        let select = self.require(selector).await?;
        let body = json!({
            "using": "css selector",
            "value": format!("option[value=\"{value}\"]"),
        });
        let path = format!("element/{}/element", select.id());
        let option = self.command(Method::POST, &path, Some(body)).await?;
        let option = element_from_value(&option)?;
        self.click_element(&option).await
    }

    async fn wait_for_navigation(&mut self) -> Result<()> {
        let started = Instant::now();
        loop {
            if self.ready_state().await? == "complete" {
                return Ok(());
            }
            if started.elapsed() >= self.navigation_timeout {
                return Err(DriverError::NavigationTimeout {
                    timeout_secs: self.navigation_timeout.as_secs(),
                });
            }
            tokio::time::sleep(READINESS_POLL).await;
        }
    }

    async fn cookies(&mut self) -> Result<Vec<CookieRecord>> {
        let value = self.command(Method::GET, "cookie", None).await?;
        let raw = value
            .as_array()
            .ok_or_else(|| DriverError::Payload("cookie response is not an array".into()))?;
        Ok(raw.iter().map(cookie_from_wire).collect())
    }

    async fn set_cookies(&mut self, cookies: &[CookieRecord]) -> Result<()> {
        for cookie in cookies {
            let body = json!({ "cookie": cookie_to_wire(cookie) });
            self.command(Method::POST, "cookie", Some(body)).await?;
        }
        Ok(())
    }

    async fn property(&mut self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let path = format!("element/{}/property/{}", element.id(), name);
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value_to_text(&value))
    }

    async fn render_to_artifact(&mut self, path: &Path) -> Result<()> {
        let value = self.command(Method::POST, "print", Some(json!({}))).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| DriverError::Payload("print response is not base64 text".into()))?;
        let bytes = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|err| DriverError::Payload(format!("undecodable print payload: {err}")))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, bytes).await?;
        debug!(artifact = %path.display(), "receipt rendered");
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let url = self.session_url();
        dispatch(&self.http, Method::DELETE, url, None).await?;
        Ok(())
    }
}

async fn dispatch(http: &Client, method: Method, url: Url, body: Option<Value>) -> Result<Value> {
    let mut request = http.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await?;
    let status = response.status();
    let payload: Value = response.json().await?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(value);
    }
    let kind = value.get("error").and_then(Value::as_str).unwrap_or("unknown");
    let message = value.get("message").and_then(Value::as_str).unwrap_or("");
    Err(DriverError::Protocol {
        status: status.as_u16(),
        message: format!("{kind}: {message}"),
    })
}

fn element_from_value(value: &Value) -> Result<ElementHandle> {
    let map = value
        .as_object()
        .ok_or_else(|| DriverError::Payload("element response is not an object".into()))?;
    map.values()
        .find_map(Value::as_str)
        .map(ElementHandle::new)
        .ok_or_else(|| DriverError::Payload("element response carries no reference".into()))
}

fn elements_from_value(value: &Value) -> Result<Vec<ElementHandle>> {
    let raw = value
        .as_array()
        .ok_or_else(|| DriverError::Payload("elements response is not an array".into()))?;
    raw.iter().map(element_from_value).collect()
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn cookie_from_wire(value: &Value) -> CookieRecord {
    CookieRecord {
        name: value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        value: value
            .get("value")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        domain: value
            .get("domain")
            .and_then(Value::as_str)
            .map(str::to_owned),
        path: value.get("path").and_then(Value::as_str).map(str::to_owned),
        expires: value.get("expiry").and_then(Value::as_f64),
        http_only: value
            .get("httpOnly")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        secure: value
            .get("secure")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

fn cookie_to_wire(cookie: &CookieRecord) -> Value {
    let mut wire = json!({
        "name": cookie.name,
        "value": cookie.value,
        "httpOnly": cookie.http_only,
        "secure": cookie.secure,
    });
    if let Some(domain) = &cookie.domain {
        wire["domain"] = json!(domain);
    }
    if let Some(path) = &cookie.path {
        wire["path"] = json!(path);
    }
    if let Some(expires) = cookie.expires {
        wire["expiry"] = json!(expires as u64);
    }
    wire
}
