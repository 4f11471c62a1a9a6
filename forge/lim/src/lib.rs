//! The logical intermediate model: a dependency graph of hardware components
//! annotated with bit-level values and clock latencies.
mod bit;
pub mod common;
mod dependency;
mod design;
mod entry;
mod latency;
mod pin;
mod printer;
mod structure;
mod value;

pub use bit::{Bit, BitData, BitTable};
pub use common::{
    BitIdx, BusIdx, ComponentIdx, DependencyIdx, EntryIdx, ExitIdx, PortIdx,
    ResourceIdx,
};
pub use dependency::{Dependency, DependencyKind, Spacing};
pub use design::Design;
pub use entry::Entry;
pub use latency::{CompositeLatency, Interval, Latency, LatencyKey, OpenLatency};
pub use pin::Pin;
pub use printer::Printer;
pub use structure::{
    Bus, Component, ComponentKind, Exit, ExitKind, Port, PostScheduleCallback,
    Resource, Tag,
};
pub use value::Value;
