//! ---
//! msim_section: "05-workflow-steps"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Workflow action steps and their failure taxonomy."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
//! The nine workflow actions a synthetic shopper performs. Each step gates
//! on the session state its predecessor produced, consults the decision
//! engine for randomized parameters, drives the abstract page capability,
//! and hands any produced state back as a [`SessionDelta`] for the
//! orchestrator to merge. A step never crashes the run: missing
//! prerequisites and thin pages degrade into typed, logged outcomes.

use marketsim_driver::DriverError;
use marketsim_session::SessionError;

pub use marketsim_session::SessionDelta;

/// Result alias used throughout the steps crate.
pub type Result<T> = std::result::Result<T, StepError>;

/// Failure taxonomy for a single workflow action.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// A required session field was never produced; the step is skipped.
    #[error("missing prerequisite session field '{field}'")]
    MissingPrerequisite {
        /// Name of the absent session field.
        field: &'static str,
    },
    /// The order history holds nothing to review.
    #[error("no completed orders in the purchase history")]
    NoOrders,
    /// Checkout was attempted against an empty cart.
    #[error("cart holds no entries")]
    EmptyCart,
    /// Page text that must carry a number could not be interpreted.
    #[error("malformed {what} text: {text:?}")]
    Malformed {
        /// Which page fragment failed to parse.
        what: &'static str,
        /// The offending text.
        text: String,
    },
    /// Session store failure.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Automation backend failure; fatal for the current repetition.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl StepError {
    /// Whether the failure is a soft skip rather than a backend fault.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            StepError::MissingPrerequisite { .. } | StepError::NoOrders | StepError::EmptyCart
        )
    }
}

mod context;

pub mod auth;
pub mod browse;
pub mod cart;
pub mod checkout;
pub mod funding;
pub mod orders;
pub mod review;
pub mod sell;
pub mod upvote;

pub use auth::{login, register, AuthenticatedPage};
pub use browse::find_items;
pub use cart::add_to_cart;
pub use checkout::checkout;
pub use context::StepContext;
pub use funding::add_fund;
pub use orders::make_order_urls;
pub use review::make_comment;
pub use sell::make_sell;
pub use upvote::click_upvote;
