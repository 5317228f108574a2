//! ---
//! msim_section: "05-workflow-steps"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Balance top-up performed on an ephemeral page."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use marketsim_driver::Page;
use marketsim_session::UserSession;
use tracing::debug;

use crate::{Result, StepContext};

const BALANCE_FIELD: &str = "#balance_change";
const PASSWORD_FIELD: &str = "#password1";
const PASSWORD_CONFIRM_FIELD: &str = "#password2";
const SUBMIT: &str = "#submit";

/// Top up the user's balance by the fixed increment.
///
/// Runs on a page the caller provides (checkout hands in an ephemeral tab
/// it opens and closes around the call); the stored password confirms the
/// account edit.
pub async fn add_fund(
    ctx: &StepContext,
    session: &UserSession,
    page: &mut dyn Page,
) -> Result<()> {
    debug!(user = %ctx.user(), depth = ctx.depth(), amount = ctx.fund_increment(), "adding funds");

    page.goto(&ctx.page_url("edit_info")).await?;
    page.type_text(BALANCE_FIELD, &ctx.fund_increment().to_string())
        .await?;
    page.type_text(PASSWORD_FIELD, &session.password).await?;
    page.type_text(PASSWORD_CONFIRM_FIELD, &session.password)
        .await?;
    page.click(SUBMIT).await?;
    page.wait_for_navigation().await?;

    debug!(user = %ctx.user(), amount = ctx.fund_increment(), "funds added");
    Ok(())
}
