//! ---
//! msim_section: "06-orchestration"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Ordered step pipeline with first-class skip-on-failure."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use async_trait::async_trait;
use marketsim_steps::StepError;
use tracing::debug;

/// The workflow steps the orchestrator can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Browse the catalog for buy and resale candidates.
    FindItems,
    /// Submit cart entries for the buy candidates.
    AddToCart,
    /// Fund as needed and place the order.
    Checkout,
    /// Collect item and seller URLs from the order history.
    MakeOrderUrls,
    /// Publish templated reviews.
    MakeComment,
    /// List the resale candidates.
    MakeSell,
    /// Toggle upvote controls on reviewed pages.
    ClickUpvote,
}

impl StepKind {
    /// Stable name used in logs and the run report.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::FindItems => "find_items",
            StepKind::AddToCart => "add_to_cart",
            StepKind::Checkout => "checkout",
            StepKind::MakeOrderUrls => "make_order_urls",
            StepKind::MakeComment => "make_comment",
            StepKind::MakeSell => "make_sell",
            StepKind::ClickUpvote => "click_upvote",
        }
    }
}

/// Something that can perform one scheduled step.
///
/// The runner implements this once per user; tests substitute their own
/// executors to exercise the skip policy in isolation.
#[async_trait]
pub trait StepExecutor {
    /// Perform `step`, reporting any failure as a [`StepError`].
    async fn execute(&mut self, step: StepKind) -> Result<(), StepError>;
}

/// An ordered sequence of steps executed with skip-on-failure.
///
/// The first failing step ends the run; the remaining steps are recorded as
/// skipped rather than attempted out of order.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<StepKind>,
}

impl Pipeline {
    /// The six-step chain run once per order repetition.
    pub fn order_chain() -> Self {
        Self {
            steps: vec![
                StepKind::FindItems,
                StepKind::AddToCart,
                StepKind::Checkout,
                StepKind::MakeOrderUrls,
                StepKind::MakeComment,
                StepKind::MakeSell,
            ],
        }
    }

    /// A pipeline over an explicit step sequence.
    pub fn of(steps: Vec<StepKind>) -> Self {
        Self { steps }
    }

    /// The scheduled steps, in order.
    pub fn steps(&self) -> &[StepKind] {
        &self.steps
    }

    /// Run every step in order through `executor`.
    pub async fn run<E: StepExecutor + Send>(&self, executor: &mut E) -> PipelineRun {
        let mut run = PipelineRun::default();
        let mut steps = self.steps.iter().copied();
        for step in steps.by_ref() {
            debug!(step = step.as_str(), "pipeline step starting");
            match executor.execute(step).await {
                Ok(()) => run.executed.push(step),
                Err(err) => {
                    run.failure = Some((step, err));
                    break;
                }
            }
        }
        run.skipped = steps.collect();
        run
    }
}

/// Outcome of one pipeline execution.
#[derive(Debug, Default)]
pub struct PipelineRun {
    /// Steps that completed.
    pub executed: Vec<StepKind>,
    /// The step that failed, with its error, if any.
    pub failure: Option<(StepKind, StepError)>,
    /// Steps dropped because an earlier one failed.
    pub skipped: Vec<StepKind>,
}

impl PipelineRun {
    /// Whether every scheduled step completed.
    pub fn completed(&self) -> bool {
        self.failure.is_none()
    }
}
