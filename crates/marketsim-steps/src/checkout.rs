//! ---
//! msim_section: "05-workflow-steps"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Checkout: fund until the balance covers the cart, then place the order."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use marketsim_driver::Driver;
use marketsim_session::SessionStore;
use tracing::{debug, info};

use crate::auth::login;
use crate::funding::add_fund;
use crate::{Result, StepContext, StepError};

const CART_ROWS: &str = "body > div > table:nth-child(2) > tbody > tr";
const NAV_LINKS: &str = "ul.navbar-nav li.nav-item a.nav-link";
const CART_TOTAL: &str = "body > div > div:nth-child(3) > div:nth-child(1) > p";

// The account balance is the fourth navbar link.
const BALANCE_LINK: usize = 3;

/// Place the order for everything in the cart, topping up the balance as
/// often as needed first.
///
/// Funding repeats until the balance strictly exceeds the cart total; each
/// top-up runs on its own ephemeral tab that is closed before checkout
/// proceeds. The rendered receipt is the step's durable artifact.
pub async fn checkout(ctx: &StepContext, store: &SessionStore, driver: &dyn Driver) -> Result<()> {
    info!(user = %ctx.user(), depth = ctx.depth(), "checking out");
    let auth = login(ctx, store, driver).await?;
    let mut page = auth.page;

    page.goto(&ctx.page_url("cart")).await?;

    let rows = page.query_all(CART_ROWS).await?;
    if rows.is_empty() {
        page.close().await?;
        return Err(StepError::EmptyCart);
    }

    let mut balance = read_balance(page.as_mut()).await?;
    let total = read_total(page.as_mut()).await?;
    debug!(user = %ctx.user(), balance, total, "cart inspected");

    let funding_ctx = ctx.descend();
    while balance <= total {
        let mut tab = driver.new_page().await?;
        tab.set_cookies(&auth.session.cookies).await?;
        add_fund(&funding_ctx, &auth.session, tab.as_mut()).await?;
        tab.close().await?;
        balance += f64::from(ctx.fund_increment());
    }

    page.goto(&ctx.page_url("checkout")).await?;
    page.wait_for_navigation().await?;
    page.render_to_artifact(&ctx.receipt_path()).await?;
    page.close().await?;

    info!(user = %ctx.user(), total, "checkout complete");
    Ok(())
}

async fn read_balance(page: &mut dyn marketsim_driver::Page) -> Result<f64> {
    let links = page.query_all(NAV_LINKS).await?;
    let link = links.get(BALANCE_LINK).ok_or_else(|| StepError::Malformed {
        what: "navbar balance",
        text: format!("{} links present", links.len()),
    })?;
    let text = page
        .property(link, "innerText")
        .await?
        .ok_or_else(|| StepError::Malformed {
            what: "navbar balance",
            text: String::new(),
        })?;
    parse_currency("navbar balance", &text)
}

async fn read_total(page: &mut dyn marketsim_driver::Page) -> Result<f64> {
    let element = page
        .query(CART_TOTAL)
        .await?
        .ok_or_else(|| StepError::Malformed {
            what: "cart total",
            text: String::new(),
        })?;
    let text = page
        .property(&element, "innerText")
        .await?
        .ok_or_else(|| StepError::Malformed {
            what: "cart total",
            text: String::new(),
        })?;
    parse_currency("cart total", &text)
}

fn parse_currency(what: &'static str, text: &str) -> Result<f64> {
    text.trim()
        .trim_start_matches('$')
        .parse::<f64>()
        .map_err(|_| StepError::Malformed {
            what,
            text: text.to_owned(),
        })
}
