use forge_lim::{ComponentIdx, Design};
use petgraph::{Direction, algo, graphmap::DiGraphMap};
use std::collections::HashMap;

/// Orders in which components are visited.
pub struct ComponentOrder;

impl ComponentOrder {
    /// Every module reachable from a top-level module, children before
    /// their parents.
    pub fn modules_bottom_up(design: &Design) -> Vec<ComponentIdx> {
        fn visit(
            design: &Design,
            module: ComponentIdx,
            order: &mut Vec<ComponentIdx>,
        ) {
            for &child in &design.components[module].children {
                if design.components[child].is_module() {
                    visit(design, child, order);
                }
            }
            order.push(module);
        }
        let mut order = vec![];
        for (idx, comp) in design.components.iter() {
            if comp.parent.is_none() && comp.is_module() {
                visit(design, idx, &mut order);
            }
        }
        order
    }

    /// The children of `module` in topological order of the dependencies
    /// between them, or in insertion order if those dependencies are cyclic.
    pub fn children(
        design: &Design,
        module: ComponentIdx,
    ) -> Vec<ComponentIdx> {
        let children = &design.components[module].children;
        let mut graph: DiGraphMap<ComponentIdx, ()> = DiGraphMap::new();
        for &child in children {
            graph.add_node(child);
        }
        for &child in children {
            for &entry in &design.components[child].entries {
                for dep in design.entries[entry].all_dependencies() {
                    let source =
                        design.bus_owner(design.dependencies[dep].source);
                    if source != child && graph.contains_node(source) {
                        graph.add_edge(source, child, ());
                    }
                }
            }
        }
        if let Err(cycle) = algo::toposort(&graph, None) {
            log::debug!(
                "children of `{}` form a cycle through `{}`, \
                 using insertion order",
                design.components[module].name,
                design.components[cycle.node_id()].name
            );
            return children.clone();
        }

        // Kahn's algorithm, ties go to the earlier child.
        let mut indegree: HashMap<ComponentIdx, usize> = children
            .iter()
            .map(|&c| {
                let incoming = graph.neighbors_directed(c, Direction::Incoming);
                (c, incoming.count())
            })
            .collect();
        let mut remaining = children.clone();
        let mut order = Vec::with_capacity(children.len());
        while !remaining.is_empty() {
            let pos = remaining
                .iter()
                .position(|c| indegree[c] == 0)
                .unwrap_or_default();
            let next = remaining.remove(pos);
            for succ in graph.neighbors_directed(next, Direction::Outgoing) {
                if let Some(d) = indegree.get_mut(&succ) {
                    *d = d.saturating_sub(1);
                }
            }
            order.push(next);
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::ComponentOrder;
    use forge_lim::{ComponentKind, Design, ExitKind, Latency};

    #[test]
    fn children_follow_dependencies() {
        let mut design = Design::new();
        let top = design
            .add_component("top", ComponentKind::Module, None)
            .unwrap();
        let inner = design
            .add_component("inner", ComponentKind::Module, Some(top))
            .unwrap();
        let late = design
            .add_component("late", ComponentKind::Reg, Some(top))
            .unwrap();
        let early = design
            .add_component("early", ComponentKind::Reg, Some(top))
            .unwrap();
        let exit =
            design.make_exit(early, ExitKind::Done, Latency::ONE).unwrap();
        design.component_add_entry(early, None).unwrap();
        design.component_add_entry(late, Some(exit)).unwrap();

        let order = ComponentOrder::children(&design, top);
        let pos = |c| order.iter().position(|o| *o == c).unwrap();
        assert!(pos(early) < pos(late));
        assert_eq!(order.len(), 3);
        assert_eq!(ComponentOrder::modules_bottom_up(&design), [inner, top]);
    }
}
