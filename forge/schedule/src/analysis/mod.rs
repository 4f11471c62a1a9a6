//! Analyses over a [Design](forge_lim::Design) used by the passes.
mod component_order;
mod latency_tracker;

pub use component_order::ComponentOrder;
pub use latency_tracker::LatencyTracker;
