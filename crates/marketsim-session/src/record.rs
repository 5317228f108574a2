//! ---
//! msim_section: "02-session-persistence"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "The persisted user-session record and its update deltas."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use marketsim_driver::CookieRecord;
use serde::{Deserialize, Serialize};

/// URL sets discovered from a user's order history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderUrls {
    /// Detail pages of items the user has bought.
    #[serde(default)]
    pub item: IndexSet<String>,
    /// Profile pages of sellers the user has bought from.
    #[serde(default)]
    pub seller: IndexSet<String>,
}

impl OrderUrls {
    /// Whether both sets are empty.
    pub fn is_empty(&self) -> bool {
        self.item.is_empty() && self.seller.is_empty()
    }
}

/// Per-user persisted state.
///
/// Credentials are fixed at registration; `cookies` authenticate every later
/// action without resubmitting them. The optional URL sets distinguish "the
/// producing step never ran" (`None`) from "it ran and found nothing"
/// (`Some` but empty); consuming steps gate on the former.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    /// Registration email address.
    pub email: String,
    /// Registration password, replayed by the funding step.
    pub password: String,
    /// Registration shipping address.
    pub address: String,
    /// Cookies captured at registration.
    #[serde(default)]
    pub cookies: Vec<CookieRecord>,
    /// Buy candidates selected while browsing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<IndexSet<String>>,
    /// Resale candidates selected while browsing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sells: Option<IndexSet<String>>,
    /// Item and seller URLs discovered from order history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<OrderUrls>,
    /// When the record was first created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// When the record was last persisted.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl UserSession {
    /// Build a fresh record at registration time.
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        address: impl Into<String>,
        cookies: Vec<CookieRecord>,
    ) -> Self {
        let now = Utc::now();
        Self {
            email: email.into(),
            password: password.into(),
            address: address.into(),
            cookies,
            items: None,
            sells: None,
            urls: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the record carries any authentication cookies.
    pub fn has_cookies(&self) -> bool {
        !self.cookies.is_empty()
    }

    /// Merge a producing step's delta into the record.
    ///
    /// Each populated field replaces the stored one wholesale; URL sets are
    /// never merged across runs of their producing step.
    pub fn apply(&mut self, delta: SessionDelta) {
        if let Some(items) = delta.items {
            self.items = Some(items);
        }
        if let Some(sells) = delta.sells {
            self.sells = Some(sells);
        }
        if let Some(urls) = delta.urls {
            self.urls = Some(urls);
        }
        self.updated_at = Utc::now();
    }
}

/// Field replacements produced by one step, applied by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionDelta {
    /// Replacement for [`UserSession::items`].
    pub items: Option<IndexSet<String>>,
    /// Replacement for [`UserSession::sells`].
    pub sells: Option<IndexSet<String>>,
    /// Replacement for [`UserSession::urls`].
    pub urls: Option<OrderUrls>,
}

impl SessionDelta {
    /// Delta produced by the browsing step.
    pub fn browse(items: IndexSet<String>, sells: IndexSet<String>) -> Self {
        Self {
            items: Some(items),
            sells: Some(sells),
            urls: None,
        }
    }

    /// Delta produced by the order-history step.
    pub fn order_urls(urls: OrderUrls) -> Self {
        Self {
            items: None,
            sells: None,
            urls: Some(urls),
        }
    }

    /// Whether the delta carries no replacements at all.
    pub fn is_empty(&self) -> bool {
        self.items.is_none() && self.sells.is_none() && self.urls.is_none()
    }
}
