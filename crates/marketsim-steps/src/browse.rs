//! ---
//! msim_section: "05-workflow-steps"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Catalog browsing: pick buy and resale candidates."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use indexmap::IndexSet;
use marketsim_decision::DecisionEngine;
use marketsim_driver::{Driver, Page};
use marketsim_session::{SessionDelta, SessionStore};
use tracing::{debug, info};

use crate::auth::login;
use crate::{Result, StepContext};

const CATEGORY_SELECT: &str = "#category";
const CATEGORY_OPTIONS: &str = "#category option";
const QUERY_SUBMIT: &str = "#submit";
const BUY_LINKS: &str = "tr a.btn-info";
const SELL_LINKS: &str = "tr a.btn-success";

/// Browse the catalog under a random category filter and gate each result
/// row independently into the buy and resale candidate sets.
///
/// An empty result page is a valid outcome: the produced delta then replaces
/// any prior candidate sets with empty ones.
pub async fn find_items(
    ctx: &StepContext,
    store: &SessionStore,
    engine: &mut DecisionEngine,
    driver: &dyn Driver,
) -> Result<SessionDelta> {
    info!(user = %ctx.user(), depth = ctx.depth(), "browsing catalog");
    let auth = login(ctx, store, driver).await?;
    let mut page = auth.page;

    page.goto(&ctx.page_url("market")).await?;

    let options = page.query_all(CATEGORY_OPTIONS).await?;
    let mut values = Vec::with_capacity(options.len());
    for option in &options {
        if let Some(value) = page.property(option, "value").await? {
            values.push(value);
        }
    }
    if let Some(choice) = engine.pick_category(&values) {
        debug!(user = %ctx.user(), category = %choice, "applying category filter");
        page.select(CATEGORY_SELECT, choice).await?;
    }

    page.click(QUERY_SUBMIT).await?;
    page.wait_for_navigation().await?;

    let items = gated_hrefs(page.as_mut(), BUY_LINKS, engine, Gate::Buy).await?;
    let sells = gated_hrefs(page.as_mut(), SELL_LINKS, engine, Gate::Sell).await?;
    page.close().await?;

    info!(
        user = %ctx.user(),
        items = items.len(),
        sells = sells.len(),
        "catalog browse complete"
    );
    Ok(SessionDelta::browse(items, sells))
}

enum Gate {
    Buy,
    Sell,
}

async fn gated_hrefs(
    page: &mut dyn Page,
    selector: &str,
    engine: &mut DecisionEngine,
    gate: Gate,
) -> Result<IndexSet<String>> {
    let mut picked = IndexSet::new();
    for link in page.query_all(selector).await? {
        let included = match gate {
            Gate::Buy => engine.gate_buy(),
            Gate::Sell => engine.gate_sell(),
        };
        if !included {
            continue;
        }
        if let Some(href) = page.property(&link, "href").await? {
            picked.insert(href);
        }
    }
    Ok(picked)
}
