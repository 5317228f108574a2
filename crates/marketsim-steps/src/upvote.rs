//! ---
//! msim_section: "05-workflow-steps"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Toggle upvote controls on reviewed item and seller pages."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use marketsim_decision::DecisionEngine;
use marketsim_driver::{Driver, Page};
use marketsim_session::SessionStore;
use tracing::{debug, info};

use crate::auth::login;
use crate::{Result, StepContext, StepError};

const UPVOTE_ICONS: &str = "i.fa-thumbs-o-up";

/// Toggle each upvote control on the collected item and seller pages,
/// independently gated by the configured probability.
///
/// A session that never collected order URLs yields a missing-prerequisite
/// skip and leaves the record untouched.
pub async fn click_upvote(
    ctx: &StepContext,
    store: &SessionStore,
    engine: &mut DecisionEngine,
    driver: &dyn Driver,
) -> Result<()> {
    info!(user = %ctx.user(), depth = ctx.depth(), "clicking upvotes");
    let auth = login(ctx, store, driver).await?;
    let mut page = auth.page;

    let urls = match &auth.session.urls {
        Some(urls) => urls.clone(),
        None => {
            page.close().await?;
            return Err(StepError::MissingPrerequisite { field: "urls" });
        }
    };

    for url in urls.item.iter().chain(urls.seller.iter()) {
        toggle_controls(ctx, page.as_mut(), engine, url).await?;
    }

    page.close().await?;
    info!(user = %ctx.user(), "upvote pass complete");
    Ok(())
}

async fn toggle_controls(
    ctx: &StepContext,
    page: &mut dyn Page,
    engine: &mut DecisionEngine,
    url: &str,
) -> Result<()> {
    page.goto(url).await?;
    let controls = page.query_all(UPVOTE_ICONS).await?;
    debug!(user = %ctx.user(), %url, controls = controls.len(), "upvote controls found");
    for control in controls {
        if !engine.gate_upvote() {
            continue;
        }
        if let Some(id) = page.property(&control, "id").await? {
            page.click(&format!("#{id}")).await?;
        }
    }
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

    fn session_with_urls(urls: Option<OrderUrls>) -> UserSession {
        let mut session = UserSession::new(
            "usr0@email.com",
            "123456",
            "Address for User 0",
            vec![CookieRecord::new("session", "tok")],
        );
        session.urls = urls;
        session
    }

    #[tokio::test]
    async fn certain_probability_toggles_every_control() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let mut urls = OrderUrls::default();
        urls.item.insert("http://127.0.0.1:5000/item/1".to_owned());
        store.save("usr0", &session_with_urls(Some(urls))).unwrap();

        let driver = ScriptedDriver::new();
        driver.install(
            "http://127.0.0.1:5000/item/1",
            PageFixture::new()
                .with(element(UPVOTE_ICONS, "upvote-11").prop("id", "upvote-11"))
                .with(element(UPVOTE_ICONS, "upvote-12").prop("id", "upvote-12")),
        );
        let ctx = StepContext::new("usr0", &AppConfig::default());
        let mut config = AppConfig::default();
        config.behavior.upvote_probability = 1.0;
        let mut engine = DecisionEngine::from_config(&config);

        click_upvote(&ctx, &store, &mut engine, &driver).await.unwrap();

        let clicks: Vec<_> = driver
            .events()
            .into_iter()
            .filter(|event| matches!(event, Interaction::Click { .. }))
            .collect();
        assert_eq!(clicks.len(), 2);
    }

    #[tokio::test]
    async fn missing_urls_is_a_noop_that_preserves_the_record() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        store.save("usr0", &session_with_urls(None)).unwrap();
        let before = store.load("usr0").unwrap();

        let driver = ScriptedDriver::new();
        let ctx = StepContext::new("usr0", &AppConfig::default());
        let mut engine = DecisionEngine::from_config(&AppConfig::default());

        match click_upvote(&ctx, &store, &mut engine, &driver).await {
            Err(StepError::MissingPrerequisite { field }) => assert_eq!(field, "urls"),
            other => panic!("expected MissingPrerequisite, got {other:?}"),
        }

        let after = store.load("usr0").unwrap();
        assert_eq!(after.cookies, before.cookies);
        assert_eq!(after.items, before.items);
        assert_eq!(after.sells, before.sells);
        assert_eq!(after.urls, None);
        assert_eq!(driver.open_pages(), 0);
    }
}
