//! ---
//! msim_section: "05-workflow-steps"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Collect item and seller URLs from the purchase history."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use marketsim_driver::Driver;
use marketsim_session::{OrderUrls, SessionDelta, SessionStore};
use tracing::{debug, info};

use crate::auth::login;
use crate::{Result, StepContext, StepError};

const HISTORY_ROWS: &str = "body > div > table > tbody > tr";
const ORDER_DETAIL_LINKS: &str =
    "body > div.container > table > tbody > tr > td:nth-child(7) > div > a";
const ORDER_ITEM_LINKS: &str =
    "body > div.container > table > tbody > tr > td:nth-child(1) > a";
const ORDER_SELLER_LINKS: &str =
    "body > div.container > table > tbody > tr > td:nth-child(6) > div > a";

/// Walk the purchase history and collect the distinct item and seller URLs
/// behind every order, for the review and upvote steps to consume.
///
/// Each order detail opens on its own ephemeral tab that is closed as soon
/// as its links are read.
pub async fn make_order_urls(
    ctx: &StepContext,
    store: &SessionStore,
    driver: &dyn Driver,
) -> Result<SessionDelta> {
    info!(user = %ctx.user(), depth = ctx.depth(), "collecting order urls");
    let auth = login(ctx, store, driver).await?;
    let mut page = auth.page;

    page.goto(&ctx.page_url("buy_history")).await?;

    let rows = page.query_all(HISTORY_ROWS).await?;
    if rows.is_empty() {
        page.close().await?;
        return Err(StepError::NoOrders);
    }

    let mut detail_urls = Vec::new();
    for link in page.query_all(ORDER_DETAIL_LINKS).await? {
        if let Some(href) = page.property(&link, "href").await? {
            detail_urls.push(href);
        }
    }
    page.close().await?;

    debug!(user = %ctx.user(), orders = detail_urls.len(), "inspecting order details");
    let mut urls = OrderUrls::default();
    for detail in detail_urls {
        let mut tab = driver.new_page().await?;
        tab.set_cookies(&auth.session.cookies).await?;
        tab.goto(&detail).await?;

        for link in tab.query_all(ORDER_ITEM_LINKS).await? {
            if let Some(href) = tab.property(&link, "href").await? {
                urls.item.insert(href);
            }
        }
        for link in tab.query_all(ORDER_SELLER_LINKS).await? {
            if let Some(href) = tab.property(&link, "href").await? {
                urls.seller.insert(href);
            }
        }
        tab.close().await?;
    }

    info!(
        user = %ctx.user(),
        items = urls.item.len(),
        sellers = urls.seller.len(),
        "order urls collected"
    );
    Ok(SessionDelta::order_urls(urls))
}
