//! ---
//! msim_section: "05-workflow-steps"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Registration and cookie-replay login steps."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use marketsim_driver::{Driver, Page};
use marketsim_session::{SessionError, SessionStore, UserSession};
use tracing::{debug, info};

use crate::{Result, StepContext, StepError};

const USERNAME_FIELD: &str = "#username";
const EMAIL_FIELD: &str = "#email";
const ADDRESS_FIELD: &str = "#address";
const PASSWORD_FIELD: &str = "#password1";
const PASSWORD_CONFIRM_FIELD: &str = "#password2";
const SUBMIT: &str = "#submit";

/// A page context with the user's cookies replayed, plus the loaded record.
pub struct AuthenticatedPage {
    /// The authenticated page handle.
    pub page: Box<dyn Page>,
    /// The session record backing the authentication.
    pub session: UserSession,
}

/// Create the synthetic identity on the target application.
///
/// Idempotent: when a session record already exists the stored cookies are
/// the durable proof of registration and the driver is not touched at all.
pub async fn register(
    ctx: &StepContext,
    store: &SessionStore,
    driver: &dyn Driver,
    password: &str,
    address: &str,
) -> Result<()> {
    info!(user = %ctx.user(), depth = ctx.depth(), "registering user");
    if store.exists(ctx.user()) {
        info!(user = %ctx.user(), "user already exists, keeping stored session");
        return Ok(());
    }

    let email = format!("{}@email.com", ctx.user());
    let mut page = driver.new_page().await?;
    page.goto(&ctx.page_url("register")).await?;

    page.type_text(USERNAME_FIELD, ctx.user()).await?;
    page.type_text(EMAIL_FIELD, &email).await?;
    page.type_text(ADDRESS_FIELD, address).await?;
    page.type_text(PASSWORD_FIELD, password).await?;
    page.type_text(PASSWORD_CONFIRM_FIELD, password).await?;

    page.click(SUBMIT).await?;
    page.wait_for_navigation().await?;

    let cookies = page.cookies().await?;
    page.close().await?;

    let session = UserSession::new(email, password, address, cookies);
    store.save(ctx.user(), &session)?;
    info!(user = %ctx.user(), cookies = session.cookies.len(), "registration complete");
    Ok(())
}

/// Open a fresh page authenticated by replaying the stored cookies.
///
/// Credentials are never resubmitted; the cookie set captured at
/// registration is sufficient for every later action.
pub async fn login(
    ctx: &StepContext,
    store: &SessionStore,
    driver: &dyn Driver,
) -> Result<AuthenticatedPage> {
    debug!(user = %ctx.user(), depth = ctx.depth(), "logging in");
    let session = match store.load(ctx.user()) {
        Ok(session) => session,
        Err(SessionError::NotFound { .. }) => {
            return Err(StepError::MissingPrerequisite { field: "session" })
        }
        Err(err) => return Err(err.into()),
    };
    if !session.has_cookies() {
        return Err(StepError::MissingPrerequisite { field: "cookies" });
    }

    let mut page = driver.new_page().await?;
    page.set_cookies(&session.cookies).await?;
    debug!(user = %ctx.user(), "login complete");
    Ok(AuthenticatedPage { page, session })
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketsim_common::config::AppConfig;
    use marketsim_testkit::{Interaction, PageFixture, ScriptedDriver};
    use tempfile::tempdir;

    fn wired_driver() -> ScriptedDriver {
        let driver = ScriptedDriver::new();
        driver.install(
            "http://127.0.0.1:5000/register",
            PageFixture::new().nav(SUBMIT, "http://127.0.0.1:5000/market"),
        );
        driver.install(
            "http://127.0.0.1:5000/market",
            PageFixture::new().grant_cookie("session", "tok-1"),
        );
        driver
    }

    #[tokio::test]
    async fn register_creates_a_record_with_cookies() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let driver = wired_driver();
        let ctx = StepContext::new("usr0", &AppConfig::default());

        register(&ctx, &store, &driver, "123456", "Address for User 0")
            .await
            .unwrap();

        let session = store.load("usr0").unwrap();
        assert_eq!(session.email, "usr0@email.com");
        assert!(session.has_cookies());
        assert_eq!(driver.open_pages(), 0);
    }

    #[tokio::test]
    async fn reregistration_is_a_driverless_noop() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let driver = wired_driver();
        let ctx = StepContext::new("usr0", &AppConfig::default());

        register(&ctx, &store, &driver, "123456", "Address for User 0")
            .await
            .unwrap();
        let before = store.load("usr0").unwrap();
        let events_before = driver.events().len();

        register(&ctx, &store, &driver, "different", "Somewhere else")
            .await
            .unwrap();
        let after = store.load("usr0").unwrap();

        assert_eq!(after.cookies, before.cookies);
        assert_eq!(after.password, before.password);
        assert_eq!(driver.events().len(), events_before);
    }

    #[tokio::test]
    async fn login_requires_a_stored_session() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let driver = ScriptedDriver::new();
        let ctx = StepContext::new("ghost", &AppConfig::default());

        match login(&ctx, &store, &driver).await {
            Err(StepError::MissingPrerequisite { field }) => assert_eq!(field, "session"),
            other => panic!("expected MissingPrerequisite, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn login_replays_stored_cookies() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let driver = wired_driver();
        let ctx = StepContext::new("usr0", &AppConfig::default());

        register(&ctx, &store, &driver, "123456", "Address for User 0")
            .await
            .unwrap();
        let auth = login(&ctx, &store, &driver).await.unwrap();
        auth.page.close().await.unwrap();

        assert!(driver
            .events()
            .iter()
            .any(|event| matches!(event, Interaction::SetCookies { count } if *count == 1)));
    }
}
