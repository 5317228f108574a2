//! ---
//! msim_section: "03-decision-engine"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Randomized choice functions behind every workflow decision."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
//! Every randomized choice a synthetic shopper makes goes through the
//! [`DecisionEngine`]: category filters, buy/sell/upvote gates, price and
//! quantity draws, and inventory-lot shuffles. The engine owns a seeded
//! generator so any run is reproducible from its configuration.

use marketsim_common::config::{AppConfig, BehaviorConfig};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Seeded source of all workflow randomness.
#[derive(Debug)]
pub struct DecisionEngine {
    rng: StdRng,
    behavior: BehaviorConfig,
    max_orders_placed: u32,
}

impl DecisionEngine {
    /// Build an engine from explicit bounds and a seed.
    pub fn new(behavior: BehaviorConfig, max_orders_placed: u32, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            behavior,
            max_orders_placed: max_orders_placed.max(1),
        }
    }

    /// Build an engine from the effective run configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.behavior.clone(),
            config.simulation.max_orders_placed,
            config.simulation.random_seed,
        )
    }

    /// Uniform choice over `options`, excluding the first element.
    ///
    /// Index 0 is reserved as the "no filter" sentinel on category selects;
    /// fewer than two options means there is nothing to choose.
    pub fn pick_category<'a, T>(&mut self, options: &'a [T]) -> Option<&'a T> {
        if options.len() < 2 {
            return None;
        }
        let index = self.rng.gen_range(1..options.len());
        options.get(index)
    }

    /// Bernoulli gate with success probability `p`.
    pub fn include_with_probability(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    /// Gate a catalog row into the buy candidates.
    pub fn gate_buy(&mut self) -> bool {
        let p = self.behavior.buy_probability;
        self.include_with_probability(p)
    }

    /// Gate a catalog row into the resale candidates.
    pub fn gate_sell(&mut self) -> bool {
        let p = self.behavior.sell_probability;
        self.include_with_probability(p)
    }

    /// Gate one upvote control toggle.
    pub fn gate_upvote(&mut self) -> bool {
        let p = self.behavior.upvote_probability;
        self.include_with_probability(p)
    }

    /// Listing price in `[min_price, max_price)`.
    pub fn pick_price(&mut self) -> u32 {
        self.rng
            .gen_range(self.behavior.min_price..self.behavior.max_price)
    }

    /// Listing quantity in `[min_quantity, max_quantity)`.
    pub fn pick_quantity(&mut self) -> u32 {
        self.rng
            .gen_range(self.behavior.min_quantity..self.behavior.max_quantity)
    }

    /// Star rating in `[0, 5]`; zero means no rating is selected.
    pub fn pick_rating(&mut self) -> u8 {
        self.rng.gen_range(0..=5)
    }

    /// Cart quantity in `[1, remaining]` for a lot with `remaining` stock.
    ///
    /// Callers gate on `remaining > 0` before drawing.
    pub fn pick_unit_quantity(&mut self, remaining: u32) -> u32 {
        self.rng.gen_range(1..=remaining.max(1))
    }

    /// Uniform random permutation of `items`.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Number of order repetitions for one user, in `[1, max_orders_placed]`.
    pub fn pick_order_count(&mut self) -> u32 {
        self.rng.gen_range(1..=self.max_orders_placed)
    }
}
