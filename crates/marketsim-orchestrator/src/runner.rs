//! ---
//! msim_section: "06-orchestration"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Drives the synthetic population through the workflow."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use async_trait::async_trait;
use marketsim_common::config::AppConfig;
use marketsim_decision::DecisionEngine;
use marketsim_driver::Driver;
use marketsim_session::{SessionDelta, SessionStore};
use marketsim_steps::{
    add_to_cart, checkout, click_upvote, find_items, make_comment, make_order_urls, make_sell,
    register, StepContext, StepError,
};
use tracing::{error, info, warn};

use crate::pipeline::{Pipeline, StepExecutor, StepKind};
use crate::report::RunReport;

// Every synthetic identity shares one throwaway password.
const DEFAULT_PASSWORD: &str = "123456";

/// One full simulation over the configured population.
///
/// All users run sequentially on a single logical flow: every step awaits to
/// completion before the next begins, and each step releases the pages it
/// opened before returning.
pub struct Simulation<'a> {
    config: &'a AppConfig,
    store: SessionStore,
    engine: DecisionEngine,
    driver: &'a dyn Driver,
}

impl<'a> Simulation<'a> {
    /// Assemble a simulation from its collaborators.
    pub fn new(
        config: &'a AppConfig,
        store: SessionStore,
        engine: DecisionEngine,
        driver: &'a dyn Driver,
    ) -> Self {
        Self {
            config,
            store,
            engine,
            driver,
        }
    }

    /// Run the simulation to completion and report what happened.
    pub async fn run(mut self) -> RunReport {
        let mut report = RunReport::default();
        let simulation = &self.config.simulation;
        info!(
            users = simulation.user_count,
            prefix = %simulation.user_prefix,
            "simulation started"
        );

        let mut roster = Vec::with_capacity(simulation.user_count as usize);
        for index in 0..simulation.user_count {
            let name = format!("{}{}", simulation.user_prefix, index);
            let ctx = StepContext::new(name.as_str(), self.config);
            let address = format!("Address for User {index}");
            match register(&ctx, &self.store, self.driver, DEFAULT_PASSWORD, &address).await {
                Ok(()) => {
                    report.record_registration(true);
                    roster.push(name);
                }
                Err(err) => {
                    error!(user = %name, error = %err, "registration failed, dropping user");
                    report.record_registration(false);
                }
            }
        }

        for name in &roster {
            let ctx = StepContext::new(name.as_str(), self.config);
            let orders = self.engine.pick_order_count();
            info!(user = %name, orders, "starting order repetitions");
            for repetition in 0..orders {
                let run = {
                    let mut executor = UserRun {
                        simulation: &mut self,
                        ctx: ctx.clone(),
                    };
                    Pipeline::order_chain().run(&mut executor).await
                };
                if let Some((step, err)) = &run.failure {
                    if err.is_skip() {
                        info!(
                            user = %name,
                            repetition,
                            step = step.as_str(),
                            error = %err,
                            "step skipped, dropping the rest of this repetition"
                        );
                    } else {
                        warn!(
                            user = %name,
                            repetition,
                            step = step.as_str(),
                            error = %err,
                            "step failed, dropping the rest of this repetition"
                        );
                    }
                }
                report.record_pipeline(&run);
            }
        }

        // Walked backwards so that later-registered users' reviews already
        // exist when earlier users go looking for upvote targets.
        // Registration order standing in for content availability is an
        // inherited assumption, preserved as-is.
        for name in roster.iter().rev() {
            let ctx = StepContext::new(name.as_str(), self.config);
            match click_upvote(&ctx, &self.store, &mut self.engine, self.driver).await {
                Ok(()) => report.record_step(StepKind::ClickUpvote, true),
                Err(err) => {
                    warn!(user = %name, error = %err, "upvote pass failed for user");
                    report.record_step(StepKind::ClickUpvote, false);
                }
            }
        }

        info!(
            registered = report.registered,
            repetitions = report.repetitions,
            failures = report.failures(),
            "simulation finished"
        );
        report
    }

    fn apply_delta(&self, ctx: &StepContext, delta: SessionDelta) -> Result<(), StepError> {
        if delta.is_empty() {
            return Ok(());
        }
        let mut session = self.store.load(ctx.user())?;
        session.apply(delta);
        self.store.save(ctx.user(), &session)?;
        Ok(())
    }
}

/// Executes scheduled steps for one user against the shared collaborators.
struct UserRun<'w, 'a> {
    simulation: &'w mut Simulation<'a>,
    ctx: StepContext,
}

#[async_trait]
impl StepExecutor for UserRun<'_, '_> {
    async fn execute(&mut self, step: StepKind) -> Result<(), StepError> {
        let sim = &mut *self.simulation;
        match step {
            StepKind::FindItems => {
                let delta =
                    find_items(&self.ctx, &sim.store, &mut sim.engine, sim.driver).await?;
                sim.apply_delta(&self.ctx, delta)
            }
            StepKind::AddToCart => {
                add_to_cart(&self.ctx, &sim.store, &mut sim.engine, sim.driver).await
            }
            StepKind::Checkout => checkout(&self.ctx, &sim.store, sim.driver).await,
            StepKind::MakeOrderUrls => {
                let delta = make_order_urls(&self.ctx, &sim.store, sim.driver).await?;
                sim.apply_delta(&self.ctx, delta)
            }
            StepKind::MakeComment => {
                make_comment(&self.ctx, &sim.store, &mut sim.engine, sim.driver).await
            }
            StepKind::MakeSell => {
                make_sell(&self.ctx, &sim.store, &mut sim.engine, sim.driver).await
            }
            StepKind::ClickUpvote => {
                click_upvote(&self.ctx, &sim.store, &mut sim.engine, sim.driver).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketsim_testkit::{PageFixture, ScriptedDriver};
    use tempfile::tempdir;

    fn config(users: u32) -> AppConfig {
        let mut config = AppConfig::default();
        config.simulation.user_count = users;
        config.simulation.max_orders_placed = 1;
        config
    }

    /// Registration that captures no cookies leaves users unable to act:
    /// every repetition fails soft at its first step and the run completes.
    #[tokio::test]
    async fn cookieless_population_degrades_without_aborting() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        let driver = ScriptedDriver::new();
        driver.install(
            "http://127.0.0.1:5000/register",
            PageFixture::new().nav("#submit", "http://127.0.0.1:5000/market"),
        );
        driver.install("http://127.0.0.1:5000/market", PageFixture::new());
        let config = config(2);
        let engine = DecisionEngine::from_config(&config);

        let report = Simulation::new(&config, store, engine, &driver).run().await;

        assert_eq!(report.registered, 2);
        assert_eq!(report.repetitions, 2);
        assert_eq!(report.step(StepKind::FindItems).failed, 2);
        assert_eq!(report.step(StepKind::AddToCart).skipped, 2);
        assert_eq!(report.step(StepKind::MakeSell).skipped, 2);
        assert_eq!(report.step(StepKind::ClickUpvote).failed, 2);
        assert_eq!(driver.open_pages(), 0, "no page may leak across the run");
    }

    #[tokio::test]
    async fn reruns_reuse_existing_registrations() {
        let dir = tempdir().unwrap();
        let driver = ScriptedDriver::new();
        driver.install(
            "http://127.0.0.1:5000/register",
            PageFixture::new().nav("#submit", "http://127.0.0.1:5000/market"),
        );
        driver.install(
            "http://127.0.0.1:5000/market",
            PageFixture::new().grant_cookie("session", "tok"),
        );
        let config = config(1);

        let store = SessionStore::new(dir.path()).unwrap();
        let engine = DecisionEngine::from_config(&config);
        let first = Simulation::new(&config, store, engine, &driver).run().await;
        assert_eq!(first.registered, 1);
        let registrations_before = driver.visits("http://127.0.0.1:5000/register");

        let store = SessionStore::new(dir.path()).unwrap();
        let engine = DecisionEngine::from_config(&config);
        let second = Simulation::new(&config, store, engine, &driver).run().await;
        assert_eq!(second.registered, 1);
        assert_eq!(
            driver.visits("http://127.0.0.1:5000/register"),
            registrations_before,
            "an existing user must not be re-registered"
        );
    }
}
