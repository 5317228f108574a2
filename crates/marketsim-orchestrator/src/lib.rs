//! ---
//! msim_section: "06-orchestration"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Simulation orchestration: pipeline, report, and runner."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Sequences the whole simulation: an idempotent registration pass, a drawn
//! number of order repetitions per user through the six-step chain, and a
//! reverse-order upvote pass. Skip-on-failure is a property of the
//! [`Pipeline`][pipeline::Pipeline] itself: a failing step drops the rest of
//! its repetition and nothing else.

pub mod pipeline;
pub mod report;
pub mod runner;

pub use pipeline::{Pipeline, PipelineRun, StepExecutor, StepKind};
pub use report::{RunReport, StepTally};
pub use runner::Simulation;
