//! ---
//! msim_section: "05-workflow-steps"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Per-user call context threaded through every step."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use std::path::PathBuf;

use marketsim_common::config::AppConfig;

/// Call context for one user's step invocations.
///
/// Carries the acting user, the target surface, and the nesting depth of
/// the call (a step invoked from inside another step, such as funding from
/// checkout, runs at `depth + 1`). Depth lives here rather than in any
/// process-wide state so log events can report it without coordination.
#[derive(Debug, Clone)]
pub struct StepContext {
    user: String,
    base: String,
    fund_increment: u32,
    receipt_dir: PathBuf,
    depth: u32,
}

impl StepContext {
    /// Context for `user` against the configured target.
    pub fn new(user: impl Into<String>, config: &AppConfig) -> Self {
        Self {
            user: user.into(),
            base: config.target.base_url.as_str().trim_end_matches('/').to_owned(),
            fund_increment: config.behavior.fund_increment,
            receipt_dir: config.driver.receipt_dir.clone(),
            depth: 0,
        }
    }

    /// The acting user's name.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Absolute URL for a target-application path.
    pub fn page_url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Fixed top-up amount for one funding call.
    pub fn fund_increment(&self) -> u32 {
        self.fund_increment
    }

    /// Where this user's checkout receipt is rendered.
    pub fn receipt_path(&self) -> PathBuf {
        self.receipt_dir.join(format!("{}-checkout.pdf", self.user))
    }

    /// Current call depth for log events.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Context one call level deeper, for steps invoked from within steps.
    pub fn descend(&self) -> Self {
        let mut child = self.clone();
        child.depth += 1;
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_urls_join_cleanly() {
        let ctx = StepContext::new("usr0", &AppConfig::default());
        assert_eq!(ctx.page_url("market"), "http://127.0.0.1:5000/market");
        assert_eq!(ctx.page_url("/cart"), "http://127.0.0.1:5000/cart");
    }

    #[test]
    fn descend_increments_depth_only() {
        let ctx = StepContext::new("usr0", &AppConfig::default());
        let child = ctx.descend();
        assert_eq!(ctx.depth(), 0);
        assert_eq!(child.depth(), 1);
        assert_eq!(child.user(), "usr0");
    }
}
