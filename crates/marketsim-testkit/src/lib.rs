//! ---
//! msim_section: "15-testing-qa"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Scripted in-memory driver backing the workflow test suites."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
//! A scripted backend for the driver capability. Tests describe pages as
//! element fixtures keyed by URL, run workflow steps against them, and then
//! assert on the recorded interaction log. Navigating to an undeclared URL
//! yields a valid empty page, which is how the suites model
//! "no actionable elements" outcomes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use marketsim_driver::{CookieRecord, Driver, ElementHandle, Page, Result};

/// One interaction observed by the scripted backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    /// A navigation settled on `url`.
    Goto {
        /// Destination URL.
        url: String,
    },
    /// A selector click on the page at `url`.
    Click {
        /// Page the click happened on.
        url: String,
        /// Selector that was clicked.
        selector: String,
    },
    /// A click on a resolved element.
    ClickElement {
        /// Page the click happened on.
        url: String,
        /// Backend id of the clicked element.
        id: String,
    },
    /// Text typed into a selector.
    Type {
        /// Page the input happened on.
        url: String,
        /// Selector that received the text.
        selector: String,
        /// The typed text.
        text: String,
    },
    /// An option chosen on a select control.
    Select {
        /// Page the input happened on.
        url: String,
        /// Selector of the select control.
        selector: String,
        /// Chosen option value.
        value: String,
    },
    /// Cookies replayed into a page context.
    SetCookies {
        /// How many cookies were replayed.
        count: usize,
    },
    /// The page was rendered to an artifact path.
    Render {
        /// Requested artifact path.
        path: PathBuf,
    },
    /// A page context was released.
    PageClosed,
}

/// Element fixture: a selector it answers to, a unique id, properties,
/// and optional child fixtures reachable via scoped queries.
#[derive(Debug, Clone, Default)]
pub struct ElementFixture {
    selector: String,
    id: String,
    properties: HashMap<String, String>,
    children: Vec<ElementFixture>,
}

/// Start building an element fixture.
pub fn element(selector: impl Into<String>, id: impl Into<String>) -> ElementFixture {
    ElementFixture {
        selector: selector.into(),
        id: id.into(),
        properties: HashMap::new(),
        children: Vec::new(),
    }
}

impl ElementFixture {
    /// Attach a named property (`href`, `innerText`, ...).
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Attach a child fixture reachable through scoped queries.
    pub fn child(mut self, child: ElementFixture) -> Self {
        self.children.push(child);
        self
    }

    fn matches(&self, selector: &str) -> bool {
        self.selector == selector || format!("#{}", self.id) == selector
    }

    fn find_by_id(&self, id: &str) -> Option<&ElementFixture> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_by_id(id))
    }
}

/// Page fixture: elements, navigation wiring, and cookies the page grants.
#[derive(Debug, Clone, Default)]
pub struct PageFixture {
    elements: Vec<ElementFixture>,
    nav: HashMap<String, String>,
    grants: Vec<CookieRecord>,
}

impl PageFixture {
    /// Empty page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element fixture.
    pub fn with(mut self, element: ElementFixture) -> Self {
        self.elements.push(element);
        self
    }

    /// Wire a selector click to a navigation target.
    pub fn nav(mut self, selector: impl Into<String>, target: impl Into<String>) -> Self {
        self.nav.insert(selector.into(), target.into());
        self
    }

    /// Grant a cookie to any page context that lands here.
    pub fn grant_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.grants.push(CookieRecord::new(name, value));
        self
    }
}

#[derive(Debug, Default)]
struct World {
    pages: HashMap<String, PageFixture>,
    events: Vec<Interaction>,
    open_pages: usize,
}

impl World {
    fn record(&mut self, event: Interaction) {
        self.events.push(event);
    }
}

/// Scripted driver over a shared fixture world.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDriver {
    world: Arc<Mutex<World>>,
}

impl ScriptedDriver {
    /// Driver with an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) the fixture served at `url`.
    pub fn install(&self, url: impl Into<String>, fixture: PageFixture) {
        self.lock().pages.insert(url.into(), fixture);
    }

    /// Everything recorded so far, in order.
    pub fn events(&self) -> Vec<Interaction> {
        self.lock().events.clone()
    }

    /// Pages opened but not yet closed; nonzero after a run means a leak.
    pub fn open_pages(&self) -> usize {
        self.lock().open_pages
    }

    /// Recorded `(url, selector, text)` triples, oldest first.
    pub fn typed(&self) -> Vec<(String, String, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Interaction::Type {
                    url,
                    selector,
                    text,
                } => Some((url, selector, text)),
                _ => None,
            })
            .collect()
    }

    /// How many navigations settled on `url`.
    pub fn visits(&self, url: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Interaction::Goto { url: u } if u == url))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, World> {
        self.world.lock().expect("scripted world lock poisoned")
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn new_page(&self) -> Result<Box<dyn Page>> {
        let mut world = self.lock();
        world.open_pages += 1;
        drop(world);
        Ok(Box::new(ScriptedPage {
            world: self.world.clone(),
            url: None,
            jar: Vec::new(),
            pending_nav: None,
        }))
    }
}

struct ScriptedPage {
    world: Arc<Mutex<World>>,
    url: Option<String>,
    jar: Vec<CookieRecord>,
    pending_nav: Option<String>,
}

impl ScriptedPage {
    fn lock(&self) -> std::sync::MutexGuard<'_, World> {
        self.world.lock().expect("scripted world lock poisoned")
    }

    fn current_url(&self) -> String {
        self.url.clone().unwrap_or_default()
    }

    fn land(&mut self, url: String) {
        let grants = {
            let mut world = self.world.lock().expect("scripted world lock poisoned");
            let grants = world
                .pages
                .get(&url)
                .map(|fixture| fixture.grants.clone())
                .unwrap_or_default();
            world.record(Interaction::Goto { url: url.clone() });
            grants
        };
        for cookie in grants {
            if !self.jar.iter().any(|held| held.name == cookie.name) {
                self.jar.push(cookie);
            }
        }
        self.url = Some(url);
        self.pending_nav = None;
    }

    fn with_fixture<R>(&self, f: impl FnOnce(&PageFixture) -> R) -> Option<R> {
        let world = self.lock();
        let url = self.url.as_ref()?;
        world.pages.get(url).map(f)
    }
}

#[async_trait]
impl Page for ScriptedPage {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.land(url.to_owned());
        Ok(())
    }

    async fn query(&mut self, selector: &str) -> Result<Option<ElementHandle>> {
        Ok(self
            .with_fixture(|fixture| {
                fixture
                    .elements
                    .iter()
                    .find(|el| el.matches(selector))
                    .map(|el| ElementHandle::new(el.id.clone()))
            })
            .flatten())
    }

    async fn query_all(&mut self, selector: &str) -> Result<Vec<ElementHandle>> {
        Ok(self
            .with_fixture(|fixture| {
                fixture
                    .elements
                    .iter()
                    .filter(|el| el.matches(selector))
                    .map(|el| ElementHandle::new(el.id.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn query_within(
        &mut self,
        parent: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>> {
        Ok(self
            .with_fixture(|fixture| {
                fixture
                    .elements
                    .iter()
                    .find_map(|el| el.find_by_id(parent.id()))
                    .map(|el| {
                        el.children
                            .iter()
                            .filter(|child| child.matches(selector))
                            .map(|child| ElementHandle::new(child.id.clone()))
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .unwrap_or_default())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let url = self.current_url();
        let target = self.with_fixture(|fixture| fixture.nav.get(selector).cloned());
        self.lock().record(Interaction::Click {
            url,
            selector: selector.to_owned(),
        });
        if let Some(Some(target)) = target {
            self.pending_nav = Some(target);
        }
        Ok(())
    }

    async fn click_element(&mut self, element: &ElementHandle) -> Result<()> {
        let url = self.current_url();
        self.lock().record(Interaction::ClickElement {
            url,
            id: element.id().to_owned(),
        });
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let url = self.current_url();
        self.lock().record(Interaction::Type {
            url,
            selector: selector.to_owned(),
            text: text.to_owned(),
        });
        Ok(())
    }

    async fn select(&mut self, selector: &str, value: &str) -> Result<()> {
        let url = self.current_url();
        self.lock().record(Interaction::Select {
            url,
            selector: selector.to_owned(),
            value: value.to_owned(),
        });
        Ok(())
    }

    async fn wait_for_navigation(&mut self) -> Result<()> {
        if let Some(target) = self.pending_nav.take() {
            self.land(target);
        }
        Ok(())
    }

    async fn cookies(&mut self) -> Result<Vec<CookieRecord>> {
        Ok(self.jar.clone())
    }

    async fn set_cookies(&mut self, cookies: &[CookieRecord]) -> Result<()> {
        self.lock().record(Interaction::SetCookies {
            count: cookies.len(),
        });
        self.jar.extend(cookies.iter().cloned());
        Ok(())
    }

    async fn property(&mut self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        Ok(self
            .with_fixture(|fixture| {
                fixture
                    .elements
                    .iter()
                    .find_map(|el| el.find_by_id(element.id()))
                    .and_then(|el| el.properties.get(name).cloned())
            })
            .flatten())
    }

    async fn render_to_artifact(&mut self, path: &Path) -> Result<()> {
        self.lock().record(Interaction::Render {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut world = self.world.lock().expect("scripted world lock poisoned");
        world.open_pages = world.open_pages.saturating_sub(1);
        world.record(Interaction::PageClosed);
        Ok(())
    }
}
