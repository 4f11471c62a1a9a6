//! Scheduling passes over the latency intermediate model.
//!
//! A [PassManager] runs named passes over a [Context]. The
//! [passes::Scheduler] computes a [Latency](forge_lim::Latency) for every
//! exit of the design and leaves the results in [Context::latencies].
pub mod analysis;
mod context;
mod default_passes;
pub mod pass_manager;
pub mod passes;
pub mod traversal;

pub use context::Context;
pub use pass_manager::PassManager;
