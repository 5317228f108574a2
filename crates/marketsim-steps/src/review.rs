//! ---
//! msim_section: "05-workflow-steps"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Publish templated reviews for bought items and their sellers."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use marketsim_decision::DecisionEngine;
use marketsim_driver::{Driver, Page};
use marketsim_session::SessionStore;
use tracing::{debug, info};

use crate::auth::login;
use crate::{Result, StepContext, StepError};

const REVIEW_TITLE: &str = "#user-review-title";
const REVIEW_EDITOR: &str = "#user-review-editor";
const REVIEW_PUBLISH: &str = "#user-review-publish-icon";

// Title the review panel shows while this user still has a review slot.
const REVIEW_OPEN_TITLE: &str = "Edit Review";

/// Publish a templated review on every item and seller page collected from
/// the order history, skipping pages this user has already reviewed.
///
/// A drawn rating of zero submits the text without selecting any stars.
pub async fn make_comment(
    ctx: &StepContext,
    store: &SessionStore,
    engine: &mut DecisionEngine,
    driver: &dyn Driver,
) -> Result<()> {
    info!(user = %ctx.user(), depth = ctx.depth(), "publishing reviews");
    let auth = login(ctx, store, driver).await?;
    let mut page = auth.page;

    let urls = match &auth.session.urls {
        Some(urls) => urls.clone(),
        None => {
            page.close().await?;
            return Err(StepError::MissingPrerequisite { field: "urls" });
        }
    };
    let email = auth.session.email.clone();

    let item_text = format!("{email} bought and reviewed on this item.");
    for url in &urls.item {
        publish(ctx, page.as_mut(), engine, url, &item_text).await?;
    }

    let seller_text = format!("{email} bought something from this seller.");
    for url in &urls.seller {
        publish(ctx, page.as_mut(), engine, url, &seller_text).await?;
    }

    page.close().await?;
    info!(user = %ctx.user(), "review pass complete");
    Ok(())
}

async fn publish(
    ctx: &StepContext,
    page: &mut dyn Page,
    engine: &mut DecisionEngine,
    url: &str,
    text: &str,
) -> Result<()> {
    page.goto(url).await?;

    let Some(title) = page.query(REVIEW_TITLE).await? else {
        debug!(user = %ctx.user(), %url, "no review panel, skipping");
        return Ok(());
    };
    let title = page.property(&title, "innerText").await?;
    if title.as_deref() != Some(REVIEW_OPEN_TITLE) {
        debug!(user = %ctx.user(), %url, "already reviewed, skipping");
        return Ok(());
    }

    let rating = engine.pick_rating();
    if rating != 0 {
        page.click(&format!("#user-rating-{rating}")).await?;
    }
    page.type_text(REVIEW_EDITOR, text).await?;
    page.click(REVIEW_PUBLISH).await?;
    debug!(user = %ctx.user(), %url, rating, "review published");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketsim_common::config::AppConfig;
    use marketsim_driver::CookieRecord;
    use marketsim_session::{OrderUrls, UserSession};
    use marketsim_testkit::{element, Interaction, PageFixture, ScriptedDriver};
    use tempfile::tempdir;

    fn store_with_urls(dir: &std::path::Path, urls: Option<OrderUrls>) -> SessionStore {
        let store = SessionStore::new(dir).unwrap();
        let mut session = UserSession::new(
            "usr0@email.com",
            "123456",
            "Address for User 0",
            vec![CookieRecord::new("session", "tok")],
        );
        session.urls = urls;
        store.save("usr0", &session).unwrap();
        store
    }

    fn review_page(title: &str) -> PageFixture {
        PageFixture::new().with(element(REVIEW_TITLE, "review-title").prop("innerText", title))
    }

    #[tokio::test]
    async fn publishes_the_item_template_on_open_slots() {
        let dir = tempdir().unwrap();
        let mut urls = OrderUrls::default();
        urls.item.insert("http://127.0.0.1:5000/item/1".to_owned());
        let store = store_with_urls(dir.path(), Some(urls));
        let driver = ScriptedDriver::new();
        driver.install("http://127.0.0.1:5000/item/1", review_page(REVIEW_OPEN_TITLE));
        let ctx = StepContext::new("usr0", &AppConfig::default());
        let mut engine = DecisionEngine::from_config(&AppConfig::default());

        make_comment(&ctx, &store, &mut engine, &driver).await.unwrap();

        let typed = driver.typed();
        assert_eq!(typed.len(), 1);
        assert_eq!(typed[0].1, REVIEW_EDITOR);
        assert_eq!(
            typed[0].2,
            "usr0@email.com bought and reviewed on this item."
        );
        assert!(driver
            .events()
            .iter()
            .any(|event| matches!(event, Interaction::Click { selector, .. } if selector == REVIEW_PUBLISH)));
    }

    #[tokio::test]
    async fn reviewed_pages_are_skipped() {
        let dir = tempdir().unwrap();
        let mut urls = OrderUrls::default();
        urls.item.insert("http://127.0.0.1:5000/item/1".to_owned());
        let store = store_with_urls(dir.path(), Some(urls));
        let driver = ScriptedDriver::new();
        driver.install("http://127.0.0.1:5000/item/1", review_page("Your Review"));
        let ctx = StepContext::new("usr0", &AppConfig::default());
        let mut engine = DecisionEngine::from_config(&AppConfig::default());

        make_comment(&ctx, &store, &mut engine, &driver).await.unwrap();
        assert!(driver.typed().is_empty());
    }

    #[tokio::test]
    async fn missing_urls_field_aborts() {
        let dir = tempdir().unwrap();
        let store = store_with_urls(dir.path(), None);
        let driver = ScriptedDriver::new();
        let ctx = StepContext::new("usr0", &AppConfig::default());
        let mut engine = DecisionEngine::from_config(&AppConfig::default());

        match make_comment(&ctx, &store, &mut engine, &driver).await {
            Err(StepError::MissingPrerequisite { field }) => assert_eq!(field, "urls"),
            other => panic!("expected MissingPrerequisite, got {other:?}"),
        }
        assert_eq!(driver.open_pages(), 0);
    }
}
