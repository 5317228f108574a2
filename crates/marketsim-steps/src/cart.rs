//! ---
//! msim_section: "05-workflow-steps"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Add buy candidates to the cart from a random stocked lot."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use marketsim_decision::DecisionEngine;
use marketsim_driver::{Driver, ElementHandle, Page};
use marketsim_session::SessionStore;
use tracing::{debug, info};

use crate::auth::login;
use crate::{Result, StepContext, StepError};

const INVENTORY_ROWS: &str = "body > div:nth-child(5) > table > tbody > tr";
const LOT_FIELDS: &str = "td h5.mt-4";
const LOT_BUY_ACTION: &str = "td div a.btn-info";
const QUANTITY_FIELD: &str = "#quantity";
const SUBMIT: &str = "#submit";

// The remaining-stock figure is the third header cell of a lot row.
const LOT_STOCK_CELL: usize = 2;

/// Visit every buy candidate, pick a random stocked inventory lot, and
/// submit a cart entry for a random quantity within the lot's stock.
///
/// Items whose lots are all exhausted (or missing) are skipped one by one;
/// the step itself still succeeds.
pub async fn add_to_cart(
    ctx: &StepContext,
    store: &SessionStore,
    engine: &mut DecisionEngine,
    driver: &dyn Driver,
) -> Result<()> {
    info!(user = %ctx.user(), depth = ctx.depth(), "filling cart");
    let auth = login(ctx, store, driver).await?;
    let mut page = auth.page;

    let items = match &auth.session.items {
        Some(items) => items.clone(),
        None => {
            page.close().await?;
            return Err(StepError::MissingPrerequisite { field: "items" });
        }
    };

    info!(user = %ctx.user(), count = items.len(), "visiting buy candidates");
    for url in &items {
        page.goto(url).await?;

        let mut lots = page.query_all(INVENTORY_ROWS).await?;
        if lots.is_empty() {
            debug!(user = %ctx.user(), item = %url, "no inventory lots listed");
            continue;
        }
        engine.shuffle(&mut lots);

        let Some(remaining) = first_stocked(page.as_mut(), &lots).await? else {
            debug!(user = %ctx.user(), item = %url, "all lots exhausted");
            continue;
        };

        page.click(LOT_BUY_ACTION).await?;
        page.wait_for_navigation().await?;

        let quantity = engine.pick_unit_quantity(remaining);
        page.type_text(QUANTITY_FIELD, &quantity.to_string()).await?;
        page.click(SUBMIT).await?;
        page.wait_for_navigation().await?;
        debug!(user = %ctx.user(), item = %url, quantity, "cart entry submitted");
    }

    page.close().await?;
    info!(user = %ctx.user(), "cart fill complete");
    Ok(())
}

/// Remaining stock of the first lot in `lots` with positive inventory.
async fn first_stocked(page: &mut dyn Page, lots: &[ElementHandle]) -> Result<Option<u32>> {
    for lot in lots {
        let cells = page.query_within(lot, LOT_FIELDS).await?;
        let Some(cell) = cells.get(LOT_STOCK_CELL) else {
            continue;
        };
        let Some(text) = page.property(cell, "innerHTML").await? else {
            continue;
        };
        match text.trim().parse::<u32>() {
            Ok(remaining) if remaining > 0 => return Ok(Some(remaining)),
            Ok(_) => continue,
            Err(_) => {
                debug!(text = %text, "unparseable stock figure, skipping lot");
                continue;
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;
    use marketsim_common::config::AppConfig;
    use marketsim_driver::CookieRecord;
    use marketsim_session::UserSession;
    use marketsim_testkit::{element, ElementFixture, Interaction, PageFixture, ScriptedDriver};
    use tempfile::tempdir;

    fn lot(id: &str, stock: &str) -> ElementFixture {
        element(INVENTORY_ROWS, id)
            .child(element(LOT_FIELDS, format!("{id}-name")).prop("innerHTML", "widget"))
            .child(element(LOT_FIELDS, format!("{id}-price")).prop("innerHTML", "25"))
            .child(element(LOT_FIELDS, format!("{id}-stock")).prop("innerHTML", stock))
    }

    fn store_with_items(dir: &std::path::Path, items: &[&str]) -> SessionStore {
        let store = SessionStore::new(dir).unwrap();
        let mut session = UserSession::new(
            "usr0@email.com",
            "123456",
            "Address for User 0",
            vec![CookieRecord::new("session", "tok")],
        );
        session.items = Some(items.iter().map(|s| s.to_string()).collect::<IndexSet<_>>());
        store.save("usr0", &session).unwrap();
        store
    }

    #[tokio::test]
    async fn stocked_lot_produces_a_cart_submission() {
        let dir = tempdir().unwrap();
        let store = store_with_items(dir.path(), &["http://127.0.0.1:5000/item/1"]);
        let driver = ScriptedDriver::new();
        driver.install(
            "http://127.0.0.1:5000/item/1",
            PageFixture::new()
                .with(lot("lot-1", "4"))
                .nav(LOT_BUY_ACTION, "http://127.0.0.1:5000/buy/1"),
        );
        driver.install(
            "http://127.0.0.1:5000/buy/1",
            PageFixture::new().nav(SUBMIT, "http://127.0.0.1:5000/item/1"),
        );
        let ctx = StepContext::new("usr0", &AppConfig::default());
        let mut engine = DecisionEngine::from_config(&AppConfig::default());

        add_to_cart(&ctx, &store, &mut engine, &driver).await.unwrap();

        let typed = driver.typed();
        let (_, selector, quantity) = typed.first().expect("a quantity must be typed");
        assert_eq!(selector, QUANTITY_FIELD);
        let quantity: u32 = quantity.parse().unwrap();
        assert!((1..=4).contains(&quantity));
        assert_eq!(driver.open_pages(), 0);
    }

    #[tokio::test]
    async fn exhausted_lots_skip_the_item() {
        let dir = tempdir().unwrap();
        let store = store_with_items(dir.path(), &["http://127.0.0.1:5000/item/1"]);
        let driver = ScriptedDriver::new();
        driver.install(
            "http://127.0.0.1:5000/item/1",
            PageFixture::new().with(lot("lot-1", "0")).with(lot("lot-2", "0")),
        );
        let ctx = StepContext::new("usr0", &AppConfig::default());
        let mut engine = DecisionEngine::from_config(&AppConfig::default());

        add_to_cart(&ctx, &store, &mut engine, &driver).await.unwrap();
        assert!(driver.typed().is_empty(), "nothing should reach the cart");
        assert!(!driver
            .events()
            .iter()
            .any(|event| matches!(event, Interaction::Click { selector, .. } if selector == SUBMIT)));
    }

    #[tokio::test]
    async fn scans_past_exhausted_lots_to_a_stocked_one() {
        let dir = tempdir().unwrap();
        let store = store_with_items(dir.path(), &["http://127.0.0.1:5000/item/1"]);
        let driver = ScriptedDriver::new();
        driver.install(
            "http://127.0.0.1:5000/item/1",
            PageFixture::new()
                .with(lot("lot-1", "0"))
                .with(lot("lot-2", "6"))
                .nav(LOT_BUY_ACTION, "http://127.0.0.1:5000/buy/1"),
        );
        driver.install(
            "http://127.0.0.1:5000/buy/1",
            PageFixture::new().nav(SUBMIT, "http://127.0.0.1:5000/item/1"),
        );
        let ctx = StepContext::new("usr0", &AppConfig::default());
        let mut engine = DecisionEngine::from_config(&AppConfig::default());

        add_to_cart(&ctx, &store, &mut engine, &driver).await.unwrap();
        let typed = driver.typed();
        assert_eq!(typed.len(), 1);
        let quantity: u32 = typed[0].2.parse().unwrap();
        assert!((1..=6).contains(&quantity));
    }

    #[tokio::test]
    async fn missing_items_field_aborts_the_step() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let session = UserSession::new(
            "usr0@email.com",
            "123456",
            "Address for User 0",
            vec![CookieRecord::new("session", "tok")],
        );
        store.save("usr0", &session).unwrap();
        let driver = ScriptedDriver::new();
        let ctx = StepContext::new("usr0", &AppConfig::default());
        let mut engine = DecisionEngine::from_config(&AppConfig::default());

        match add_to_cart(&ctx, &store, &mut engine, &driver).await {
            Err(StepError::MissingPrerequisite { field }) => assert_eq!(field, "items"),
            other => panic!("expected MissingPrerequisite, got {other:?}"),
        }
        assert_eq!(driver.open_pages(), 0, "the login page must still be released");
    }
}
