use crate::common::{ComponentIdx, DependencyIdx, ExitIdx, PortIdx};
use linked_hash_map::LinkedHashMap;

/// One admissible binding of dependencies to the ports of a component for
/// one control context.
#[derive(Debug, Clone)]
pub struct Entry {
    pub owner: ComponentIdx,
    /// The exit whose completion starts this context, if any.
    pub driving_exit: Option<ExitIdx>,
    dependencies: LinkedHashMap<PortIdx, Vec<DependencyIdx>>,
}

impl Entry {
    pub(crate) fn new(
        owner: ComponentIdx,
        driving_exit: Option<ExitIdx>,
    ) -> Self {
        Self {
            owner,
            driving_exit,
            dependencies: LinkedHashMap::new(),
        }
    }

    /// Dependencies of `port` in insertion order.
    pub fn dependencies(&self, port: PortIdx) -> &[DependencyIdx] {
        self.dependencies
            .get(&port)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Ports with at least one dependency, in the order they were first
    /// connected.
    pub fn ports(&self) -> impl Iterator<Item = PortIdx> + '_ {
        self.dependencies.keys().copied()
    }

    pub fn all_dependencies(&self) -> impl Iterator<Item = DependencyIdx> + '_ {
        self.dependencies.values().flatten().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub(crate) fn add(&mut self, port: PortIdx, dep: DependencyIdx) {
        self.dependencies.entry(port).or_default().push(dep);
    }

    /// Returns true if `dep` was attached to `port`.
    pub(crate) fn remove(&mut self, port: PortIdx, dep: DependencyIdx) -> bool {
        let Some(deps) = self.dependencies.get_mut(&port) else {
            return false;
        };
        let before = deps.len();
        deps.retain(|d| *d != dep);
        let removed = deps.len() != before;
        if deps.is_empty() {
            self.dependencies.remove(&port);
        }
        removed
    }

    pub(crate) fn take(&mut self, port: PortIdx) -> Vec<DependencyIdx> {
        self.dependencies.remove(&port).unwrap_or_default()
    }

    pub(crate) fn take_all(&mut self) -> Vec<DependencyIdx> {
        let all = self.all_dependencies().collect();
        self.dependencies.clear();
        all
    }
}

#[cfg(test)]
mod tests {
    use super::Entry;
    use crate::common::{ComponentIdx, DependencyIdx, PortIdx};

    #[test]
    fn ports_keep_connection_order() {
        let mut entry = Entry::new(ComponentIdx::from(0_u32), None);
        let (p0, p1) = (PortIdx::from(4_u32), PortIdx::from(2_u32));
        entry.add(p0, DependencyIdx::from(0_u32));
        entry.add(p1, DependencyIdx::from(1_u32));
        entry.add(p0, DependencyIdx::from(2_u32));
        assert_eq!(entry.ports().collect::<Vec<_>>(), [p0, p1]);
        assert_eq!(
            entry.dependencies(p0),
            [DependencyIdx::from(0_u32), DependencyIdx::from(2_u32)]
        );

        assert!(entry.remove(p1, DependencyIdx::from(1_u32)));
        assert!(!entry.remove(p1, DependencyIdx::from(1_u32)));
        assert!(entry.dependencies(p1).is_empty());
        assert_eq!(entry.take_all().len(), 2);
        assert!(entry.is_empty());
    }
}
