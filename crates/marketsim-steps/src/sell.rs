//! ---
//! msim_section: "05-workflow-steps"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "List resale candidates at random prices and quantities."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use marketsim_decision::DecisionEngine;
use marketsim_driver::Driver;
use marketsim_session::SessionStore;
use tracing::{debug, info};

use crate::auth::login;
use crate::{Result, StepContext, StepError};

const PRICE_FIELD: &str = "#price";
const QUANTITY_FIELD: &str = "#quantity";
const SUBMIT: &str = "#submit";

/// Create a new listing for every resale candidate, with a drawn price and
/// quantity per listing.
pub async fn make_sell(
    ctx: &StepContext,
    store: &SessionStore,
    engine: &mut DecisionEngine,
    driver: &dyn Driver,
) -> Result<()> {
    info!(user = %ctx.user(), depth = ctx.depth(), "creating listings");
    let auth = login(ctx, store, driver).await?;
    let mut page = auth.page;

    let sells = match &auth.session.sells {
        Some(sells) => sells.clone(),
        None => {
            page.close().await?;
            return Err(StepError::MissingPrerequisite { field: "sells" });
        }
    };

    for url in &sells {
        page.goto(url).await?;

        let price = engine.pick_price();
        page.type_text(PRICE_FIELD, &price.to_string()).await?;

        let quantity = engine.pick_quantity();
        page.type_text(QUANTITY_FIELD, &quantity.to_string()).await?;

        page.click(SUBMIT).await?;
        page.wait_for_navigation().await?;
        debug!(user = %ctx.user(), %url, price, quantity, "listing submitted");
    }

    page.close().await?;
    info!(user = %ctx.user(), listings = sells.len(), "sell pass complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;
    use marketsim_common::config::AppConfig;
    use marketsim_driver::CookieRecord;
    use marketsim_session::UserSession;
    use marketsim_testkit::{PageFixture, ScriptedDriver};
    use tempfile::tempdir;

    #[tokio::test]
    async fn listings_carry_bounded_price_and_quantity() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let mut session = UserSession::new(
            "usr0@email.com",
            "123456",
            "Address for User 0",
            vec![CookieRecord::new("session", "tok")],
        );
        session.sells = Some(
            ["http://127.0.0.1:5000/sell/1".to_owned()]
                .into_iter()
                .collect::<IndexSet<_>>(),
        );
        store.save("usr0", &session).unwrap();

        let driver = ScriptedDriver::new();
        driver.install(
            "http://127.0.0.1:5000/sell/1",
            PageFixture::new().nav(SUBMIT, "http://127.0.0.1:5000/market"),
        );
        let ctx = StepContext::new("usr0", &AppConfig::default());
        let mut engine = DecisionEngine::from_config(&AppConfig::default());

        make_sell(&ctx, &store, &mut engine, &driver).await.unwrap();

        let typed = driver.typed();
        assert_eq!(typed.len(), 2);
        let price: u32 = typed[0].2.parse().unwrap();
        assert!((10..100).contains(&price));
        let quantity: u32 = typed[1].2.parse().unwrap();
        assert!((1..10).contains(&quantity));
        assert_eq!(driver.visits("http://127.0.0.1:5000/market"), 1);
    }

    #[tokio::test]
    async fn missing_sells_field_aborts() {
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

        match make_sell(&ctx, &store, &mut engine, &driver).await {
            Err(StepError::MissingPrerequisite { field }) => assert_eq!(field, "sells"),
            other => panic!("expected MissingPrerequisite, got {other:?}"),
        }
    }
}
