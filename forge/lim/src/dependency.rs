//! Dependency edges between a source bus and a consuming port.
use crate::common::{BusIdx, EntryIdx, PortIdx};
use std::hash::{Hash, Hasher};

/// How the consumer of a resource dependency is spaced from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Spacing {
    /// The consumer's go waits `delay_clocks` after the source's done.
    DoneToGo,
    /// The consumer's go waits `delay_clocks` after the source's go. Only
    /// sound when the source completes in zero clocks.
    GoToGo,
}

/// The type of a [Dependency].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Data,
    Control,
    Reset,
    Clock,
    /// Mutually exclusive access to a shared resource.
    Resource { delay_clocks: u64, spacing: Spacing },
}

impl DependencyKind {
    pub fn is_resource(&self) -> bool {
        matches!(self, DependencyKind::Resource { .. })
    }

    /// Clock and reset edges do not take part in latency propagation.
    pub fn is_timing(&self) -> bool {
        !matches!(self, DependencyKind::Clock | DependencyKind::Reset)
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyKind::Data => write!(f, "data"),
            DependencyKind::Control => write!(f, "control"),
            DependencyKind::Reset => write!(f, "reset"),
            DependencyKind::Clock => write!(f, "clock"),
            DependencyKind::Resource {
                delay_clocks,
                spacing: Spacing::DoneToGo,
            } => write!(f, "resource({delay_clocks})"),
            DependencyKind::Resource {
                delay_clocks,
                spacing: Spacing::GoToGo,
            } => write!(f, "go-to-go({delay_clocks})"),
        }
    }
}

/// A typed edge from `source` to `port` inside `entry`.
///
/// Two dependencies are equal when they have the same kind (including
/// resource delay and spacing) and the same source, regardless of where
/// they are attached.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub source: BusIdx,
    pub kind: DependencyKind,
    pub port: PortIdx,
    pub entry: EntryIdx,
    /// Cleared by the post-schedule validation of a go-to-go dependency.
    pub(crate) precondition_valid: bool,
    pub(crate) attached: bool,
}

impl Dependency {
    pub(crate) fn new(
        source: BusIdx,
        kind: DependencyKind,
        port: PortIdx,
        entry: EntryIdx,
    ) -> Self {
        Self {
            source,
            kind,
            port,
            entry,
            precondition_valid: true,
            attached: true,
        }
    }

    pub fn delay_clocks(&self) -> Option<u64> {
        match self.kind {
            DependencyKind::Resource { delay_clocks, .. } => Some(delay_clocks),
            _ => None,
        }
    }

    pub fn is_go_to_go(&self) -> bool {
        matches!(
            self.kind,
            DependencyKind::Resource {
                spacing: Spacing::GoToGo,
                ..
            }
        )
    }

    /// False once the dependency has been removed from its entry.
    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.source == other.source
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.source.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::{Dependency, DependencyKind, Spacing};
    use crate::common::{BusIdx, EntryIdx, PortIdx};
    use std::collections::HashSet;

    fn resource(delay_clocks: u64, spacing: Spacing, port: u32) -> Dependency {
        Dependency::new(
            BusIdx::from(3_u32),
            DependencyKind::Resource {
                delay_clocks,
                spacing,
            },
            PortIdx::from(port),
            EntryIdx::from(0_u32),
        )
    }

    #[test]
    fn resource_equality_includes_delay() {
        let a = resource(2, Spacing::DoneToGo, 0);
        let b = resource(2, Spacing::DoneToGo, 7);
        let c = resource(4, Spacing::DoneToGo, 0);
        let d = resource(2, Spacing::GoToGo, 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        let set: HashSet<_> = [a, b, c, d].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn only_resources_have_delay() {
        let data = Dependency::new(
            BusIdx::from(0_u32),
            DependencyKind::Data,
            PortIdx::from(1_u32),
            EntryIdx::from(0_u32),
        );
        assert_eq!(data.delay_clocks(), None);
        assert!(!data.is_go_to_go());
        assert!(!DependencyKind::Clock.is_timing());
        assert_eq!(resource(4, Spacing::GoToGo, 0).delay_clocks(), Some(4));
        assert_eq!(
            resource(4, Spacing::GoToGo, 0).kind.to_string(),
            "go-to-go(4)"
        );
    }
}
