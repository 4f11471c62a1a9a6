//! Index types for every node kind stored in a [`Design`](crate::Design).
use crate::LatencyKey;
use forge_idx::{IndexRef, impl_index};

/// A component (operation, register, pin access, or module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentIdx(u32);
impl_index!(ComponentIdx);

/// An input port of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortIdx(u32);
impl_index!(PortIdx);

/// An output bus of an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusIdx(u32);
impl_index!(BusIdx);

/// One completion condition of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExitIdx(u32);
impl_index!(ExitIdx);

/// One admissible binding of dependencies to a component's ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryIdx(u32);
impl_index!(EntryIdx);

/// A dependency edge attached to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyIdx(u32);
impl_index!(DependencyIdx);

/// A non-global bit owned by a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitIdx(u32);
impl_index!(BitIdx);

/// A stateful resource (memory, register, pin) shared between accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIdx(u32);
impl_index!(ResourceIdx);

/// Open latencies created while scheduling a component are keyed by it.
impl From<ComponentIdx> for LatencyKey {
    fn from(comp: ComponentIdx) -> Self {
        LatencyKey::new(comp.index() as u32)
    }
}
