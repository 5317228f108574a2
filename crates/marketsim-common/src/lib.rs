//! ---
//! msim_section: "01-core-functionality"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Shared primitives for the Marketsim workspace."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
//! Shared primitives for the Marketsim workspace: the TOML configuration
//! model consumed by every other crate and the tracing bootstrap used by the
//! binary and the test suites.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, BehaviorConfig, DriverConfig, LoggingConfig, SimulationConfig, StoreConfig,
    TargetConfig,
};
pub use logging::{init_tracing, LogFormat};
