//! The arena holding every node of the dependency graph.
use crate::{
    BitTable, Latency, Value,
    bit::Bit,
    common::{
        BusIdx, ComponentIdx, DependencyIdx, EntryIdx, ExitIdx, PortIdx,
        ResourceIdx,
    },
    dependency::{Dependency, DependencyKind, Spacing},
    entry::Entry,
    pin::Pin,
    structure::{
        Bus, Component, ComponentKind, Exit, ExitKind, Port,
        PostScheduleCallback, Resource, Tag,
    },
};
use forge_idx::maps::IndexedMap;
use forge_utils::{Error, ForgeResult, Id, NameGenerator};
use itertools::Itertools;

/// A dependency graph of components.
///
/// Nodes are never freed. Removing an entry or a dependency detaches it from
/// the adjacency tables but keeps its index valid.
#[derive(Debug, Default)]
pub struct Design {
    pub components: IndexedMap<ComponentIdx, Component>,
    pub ports: IndexedMap<PortIdx, Port>,
    pub buses: IndexedMap<BusIdx, Bus>,
    pub exits: IndexedMap<ExitIdx, Exit>,
    pub entries: IndexedMap<EntryIdx, Entry>,
    pub dependencies: IndexedMap<DependencyIdx, Dependency>,
    pub resources: IndexedMap<ResourceIdx, Resource>,
    pub bits: BitTable,
    namegen: NameGenerator,
}

impl Design {
    pub fn new() -> Self {
        Self::default()
    }

    // ============ Construction ============

    /// Add a component named after `prefix`. `parent` must be a module.
    /// Modules get an input buffer whose buses are the inner peers of their
    /// clock, reset and go ports.
    pub fn add_component<S>(
        &mut self,
        prefix: S,
        kind: ComponentKind,
        parent: Option<ComponentIdx>,
    ) -> ForgeResult<ComponentIdx>
    where
        S: Into<Id>,
    {
        if let Some(parent) = parent {
            let p = &self.components[parent];
            if !p.is_module() {
                return Err(Error::malformed_structure(format!(
                    "`{}` is not a module and cannot own children",
                    p.name
                )));
            }
        }
        let name = self.namegen.gen_name(prefix);
        let idx = self.components.peek_next_idx();
        let clock = self.new_port(idx, "clk", 1, false);
        let reset = self.new_port(idx, "reset", 1, false);
        let go = self.new_port(idx, "go", 1, false);
        let is_module = kind.is_module();
        self.components.push(Component {
            name,
            kind,
            parent,
            children: vec![],
            clock,
            reset,
            go,
            data_ports: vec![],
            exits: vec![],
            entries: vec![],
            inbuf: None,
            resources: vec![],
            post_schedule: vec![],
            physical: None,
        });

        if is_module {
            let next = self.exits.peek_next_idx();
            let go_peer = self.new_bus(next, "go", 1, false);
            let inbuf = self.exits.push(Exit {
                owner: idx,
                kind: ExitKind::InBuf,
                done: go_peer,
                data: vec![],
                drives: vec![],
                latency: Latency::ZERO,
                outbuf: None,
            });
            self.ports[go].peer = Some(go_peer);
            for port in [clock, reset] {
                let name = self.ports[port].name;
                let bus = self.new_bus(inbuf, name, 1, false);
                self.exits[inbuf].data.push(bus);
                self.ports[port].peer = Some(bus);
            }
            self.components[idx].inbuf = Some(inbuf);
        }
        if let Some(parent) = parent {
            self.components[parent].children.push(idx);
        }
        log::debug!("added component `{name}`");
        Ok(idx)
    }

    fn new_port<S: Into<Id>>(
        &mut self,
        owner: ComponentIdx,
        name: S,
        width: u64,
        signed: bool,
    ) -> PortIdx {
        self.ports.push(Port {
            name: name.into(),
            owner,
            width,
            signed,
            tag: Tag::Normal,
            used: true,
            peer: None,
        })
    }

    fn new_bus<S: Into<Id>>(
        &mut self,
        exit: ExitIdx,
        name: S,
        width: u64,
        signed: bool,
    ) -> BusIdx {
        let idx = self.buses.peek_next_idx();
        let value = Value::from_bits(
            (0..width).map(|pos| Bit::Owned(self.bits.alloc(idx, pos as u32))),
            signed,
        );
        self.buses.push(Bus {
            name: name.into(),
            exit,
            width,
            signed,
            tag: Tag::Normal,
            used: true,
            peer: None,
            value,
            dependents: vec![],
        })
    }

    /// Add a data port to `comp`. Ports of a module also get a peer bus on
    /// the module's input buffer.
    pub fn make_data_port<S: Into<Id>>(
        &mut self,
        comp: ComponentIdx,
        name: S,
        width: u64,
        signed: bool,
    ) -> PortIdx {
        let port = self.new_port(comp, name, width, signed);
        self.components[comp].data_ports.push(port);
        if let Some(inbuf) = self.components[comp].inbuf {
            let name = self.ports[port].name;
            let bus = self.new_bus(inbuf, name, width, signed);
            self.exits[inbuf].data.push(bus);
            self.ports[port].peer = Some(bus);
        }
        port
    }

    /// Add an exit to `comp` that completes `latency` clocks after go. Exits
    /// of a module get an output buffer child that collects the values
    /// leaving the module; their latency is the start of that buffer, so
    /// they are declared with [`Latency::ZERO`].
    pub fn make_exit(
        &mut self,
        comp: ComponentIdx,
        kind: ExitKind,
        latency: Latency,
    ) -> ForgeResult<ExitIdx> {
        if kind == ExitKind::InBuf {
            return Err(Error::malformed_structure(format!(
                "input buffer of `{}` is created with the module",
                self.components[comp].name
            )));
        }
        if self.components[comp].is_module() && latency != Latency::ZERO {
            return Err(Error::malformed_structure(format!(
                "exit of module `{}` declared with latency {latency}, module \
                 latencies come from scheduling",
                self.components[comp].name
            )));
        }
        let exit = self.exits.peek_next_idx();
        let done = self.new_bus(exit, "done", 1, false);
        self.exits.push(Exit {
            owner: comp,
            kind,
            done,
            data: vec![],
            drives: vec![],
            latency,
            outbuf: None,
        });
        self.components[comp].exits.push(exit);

        if self.components[comp].is_module() {
            let prefix = format!("{}_outbuf", self.components[comp].name);
            let outbuf = self.add_component(
                prefix,
                ComponentKind::OutBuf { exit },
                Some(comp),
            )?;
            self.component_add_entry(outbuf, None)?;
            self.exits[exit].outbuf = Some(outbuf);
            self.buses[done].peer = Some(self.components[outbuf].go);
        }
        Ok(exit)
    }

    /// Add a data bus to `exit`. Buses of a module exit also get a peer port
    /// on the exit's output buffer.
    pub fn make_data_bus<S: Into<Id>>(
        &mut self,
        exit: ExitIdx,
        name: S,
        width: u64,
        signed: bool,
    ) -> BusIdx {
        let bus = self.new_bus(exit, name, width, signed);
        self.exits[exit].data.push(bus);
        if let Some(outbuf) = self.exits[exit].outbuf {
            let name = self.buses[bus].name;
            let port = self.make_data_port(outbuf, name, width, signed);
            self.buses[bus].peer = Some(port);
        }
        bus
    }

    /// Register a resource whose successive accesses are `spacing` clocks
    /// apart.
    pub fn add_resource<S: Into<Id>>(
        &mut self,
        name: S,
        spacing: u64,
    ) -> ResourceIdx {
        self.resources.push(Resource {
            name: name.into(),
            spacing,
            pin: None,
        })
    }

    /// Register a pin as a resource.
    pub fn add_pin(&mut self, pin: Pin, spacing: u64) -> ResourceIdx {
        self.resources.push(Resource {
            name: pin.name,
            spacing,
            pin: Some(pin),
        })
    }

    pub fn access_resource(
        &mut self,
        comp: ComponentIdx,
        resource: ResourceIdx,
    ) {
        let resources = &mut self.components[comp].resources;
        if !resources.contains(&resource) {
            resources.push(resource);
        }
    }

    // ============ Entries and dependencies ============

    /// Create an entry for `comp` driven by `driving_exit`. The entry gets
    /// clock and reset dependencies from the parent module's input buffer
    /// and a go dependency from the driving exit's done, or from the parent's
    /// go when there is no driving exit.
    pub fn component_add_entry(
        &mut self,
        comp: ComponentIdx,
        driving_exit: Option<ExitIdx>,
    ) -> ForgeResult<EntryIdx> {
        let entry = self.entries.push(Entry::new(comp, driving_exit));
        self.components[comp].entries.push(entry);

        let (clock, reset, go) = {
            let c = &self.components[comp];
            (c.clock, c.reset, c.go)
        };
        let parent_ports = self.components[comp].parent.map(|p| {
            let p = &self.components[p];
            (p.clock, p.reset, p.go)
        });
        if let Some((p_clock, p_reset, p_go)) = parent_ports {
            for (port, peer_of, kind) in [
                (clock, p_clock, DependencyKind::Clock),
                (reset, p_reset, DependencyKind::Reset),
            ] {
                let source = self.peer_bus(peer_of)?;
                self.attach(entry, port, source, kind);
            }
            if driving_exit.is_none() {
                let source = self.peer_bus(p_go)?;
                self.attach(entry, go, source, DependencyKind::Control);
            }
        }
        if let Some(exit) = driving_exit {
            let source = self.exits[exit].done;
            self.attach(entry, go, source, DependencyKind::Control);
            self.exits[exit].drives.push(entry);
        }
        Ok(entry)
    }

    pub(crate) fn peer_bus(&self, port: PortIdx) -> ForgeResult<BusIdx> {
        self.ports[port].peer.ok_or_else(|| {
            Error::malformed_structure(format!(
                "port `{}` has no peer bus",
                self.port_name(port)
            ))
        })
    }

    fn attach(
        &mut self,
        entry: EntryIdx,
        port: PortIdx,
        source: BusIdx,
        kind: DependencyKind,
    ) -> DependencyIdx {
        let dep = self
            .dependencies
            .push(Dependency::new(source, kind, port, entry));
        self.entries[entry].add(port, dep);
        self.buses[source].dependents.push(dep);
        dep
    }

    /// The `group`-th entry of `comp`.
    pub fn entry_of(
        &self,
        comp: ComponentIdx,
        group: usize,
    ) -> ForgeResult<EntryIdx> {
        let c = &self.components[comp];
        c.entries.get(group).copied().ok_or_else(|| {
            Error::malformed_structure(format!(
                "group {group} requested for `{}` which has {} entries",
                c.name,
                c.entries.len()
            ))
        })
    }

    /// Attach a data dependency from `bus` to `port` in the `group`-th entry
    /// of the port's owner.
    pub fn connect_data_dependency(
        &mut self,
        bus: BusIdx,
        port: PortIdx,
        group: usize,
    ) -> ForgeResult<DependencyIdx> {
        let entry = self.entry_of(self.ports[port].owner, group)?;
        Ok(self.attach(entry, port, bus, DependencyKind::Data))
    }

    /// Make the go of `comp` wait on the done of `exit` in the `group`-th
    /// entry.
    pub fn connect_control_dependency(
        &mut self,
        comp: ComponentIdx,
        exit: ExitIdx,
        group: usize,
    ) -> ForgeResult<DependencyIdx> {
        self.connect_go(comp, exit, group, DependencyKind::Control)
    }

    /// Make the go of `comp` wait `delay_clocks` after the done of `exit`.
    pub fn connect_resource_dependency(
        &mut self,
        comp: ComponentIdx,
        exit: ExitIdx,
        group: usize,
        delay_clocks: u64,
    ) -> ForgeResult<DependencyIdx> {
        self.connect_go(
            comp,
            exit,
            group,
            DependencyKind::Resource {
                delay_clocks,
                spacing: Spacing::DoneToGo,
            },
        )
    }

    /// Make the go of `comp` wait `delay_clocks` after the go of the owner
    /// of `exit`. The hypothesis that the owner completes in zero clocks is
    /// checked once the owner has been scheduled.
    pub fn connect_go_to_go_dependency(
        &mut self,
        comp: ComponentIdx,
        exit: ExitIdx,
        group: usize,
        delay_clocks: u64,
    ) -> ForgeResult<DependencyIdx> {
        let dep = self.connect_go(
            comp,
            exit,
            group,
            DependencyKind::Resource {
                delay_clocks,
                spacing: Spacing::GoToGo,
            },
        )?;
        let source = self.exits[exit].owner;
        self.components[source]
            .post_schedule
            .push(PostScheduleCallback::ValidateGoToGo(dep));
        Ok(dep)
    }

    fn connect_go(
        &mut self,
        comp: ComponentIdx,
        exit: ExitIdx,
        group: usize,
        kind: DependencyKind,
    ) -> ForgeResult<DependencyIdx> {
        let entry = self.entry_of(comp, group)?;
        let go = self.components[comp].go;
        let source = self.exits[exit].done;
        Ok(self.attach(entry, go, source, kind))
    }

    /// Run the post-schedule callbacks of `comp` now that its latency is
    /// known. Returns the go-to-go dependencies that were invalidated.
    pub fn post_schedule(
        &mut self,
        comp: ComponentIdx,
        latency: &Latency,
    ) -> Vec<DependencyIdx> {
        let mut invalidated = vec![];
        for callback in self.components[comp].post_schedule.clone() {
            match callback {
                PostScheduleCallback::ValidateGoToGo(dep) => {
                    let d = &mut self.dependencies[dep];
                    if d.attached
                        && d.precondition_valid
                        && latency.max_clocks() != Some(0)
                    {
                        d.precondition_valid = false;
                        log::warn!(
                            "go-to-go spacing from `{}` is invalid, \
                             its latency is {latency}",
                            self.components[comp].name
                        );
                        invalidated.push(dep);
                    }
                }
            }
        }
        invalidated
    }

    /// False only for a go-to-go dependency whose source was found to take
    /// clocks.
    pub fn precondition_is_valid(&self, dep: DependencyIdx) -> bool {
        let d = &self.dependencies[dep];
        !d.is_go_to_go() || d.precondition_valid
    }

    /// The spacing actually in force for a resource dependency.
    pub fn effective_spacing(&self, dep: DependencyIdx) -> Option<Spacing> {
        match self.dependencies[dep].kind {
            DependencyKind::Resource {
                spacing: Spacing::GoToGo,
                ..
            } if self.precondition_is_valid(dep) => Some(Spacing::GoToGo),
            DependencyKind::Resource { .. } => Some(Spacing::DoneToGo),
            _ => None,
        }
    }

    pub fn resource_delay(&self, dep: DependencyIdx) -> Option<u64> {
        self.dependencies[dep].delay_clocks()
    }

    /// Detach `dep` from its entry and its source bus.
    pub fn remove_dependency(&mut self, dep: DependencyIdx) {
        let (entry, port, source) = {
            let d = &self.dependencies[dep];
            if !d.attached {
                return;
            }
            (d.entry, d.port, d.source)
        };
        self.entries[entry].remove(port, dep);
        self.detach(dep, source);
    }

    fn detach(&mut self, dep: DependencyIdx, source: BusIdx) {
        self.buses[source].dependents.retain(|d| *d != dep);
        self.dependencies[dep].attached = false;
    }

    /// Make every dependency on `from` depend on `to` instead.
    pub fn move_dependents(&mut self, from: BusIdx, to: BusIdx) {
        let moved = std::mem::take(&mut self.buses[from].dependents);
        for &dep in &moved {
            self.dependencies[dep].source = to;
        }
        self.buses[to].dependents.extend(moved);
    }

    /// Remove every dependency of `port` in `entry`.
    pub fn clear_dependencies(&mut self, entry: EntryIdx, port: PortIdx) {
        for dep in self.entries[entry].take(port) {
            let source = self.dependencies[dep].source;
            self.detach(dep, source);
        }
    }

    /// Clear every dependency of `entry` and detach it from its owner and
    /// driving exit. Later entries of the owner move down one group.
    pub fn remove_entry(&mut self, entry: EntryIdx) {
        for dep in self.entries[entry].take_all() {
            let source = self.dependencies[dep].source;
            self.detach(dep, source);
        }
        let (owner, driving) = {
            let e = &self.entries[entry];
            (e.owner, e.driving_exit)
        };
        if let Some(exit) = driving {
            self.exits[exit].drives.retain(|e| *e != entry);
        }
        self.components[owner].entries.retain(|e| *e != entry);
        self.entries[entry].driving_exit = None;
    }

    /// Attached dependencies sourced from `bus`.
    pub fn dependents(&self, bus: BusIdx) -> &[DependencyIdx] {
        &self.buses[bus].dependents
    }

    /// Every data dependency of `port` across the entries of its owner.
    pub fn data_sources(
        &self,
        port: PortIdx,
    ) -> impl Iterator<Item = BusIdx> + '_ {
        let owner = self.ports[port].owner;
        self.components[owner]
            .entries
            .iter()
            .flat_map(move |e| self.entries[*e].dependencies(port).iter())
            .map(|d| &self.dependencies[*d])
            .filter(|d| d.kind == DependencyKind::Data)
            .map(|d| d.source)
    }

    /// The component that drives the result `bus` of a module through the
    /// bus's peer port. More than one driver is an error.
    pub fn find_driver(
        &self,
        bus: BusIdx,
    ) -> ForgeResult<Option<ComponentIdx>> {
        let Some(peer) = self.buses[bus].peer else {
            return Ok(None);
        };
        let drivers = self
            .data_sources(peer)
            .map(|source| self.exits[self.buses[source].exit].owner)
            .unique()
            .collect_vec();
        match drivers.as_slice() {
            [] => Ok(None),
            [driver] => Ok(Some(*driver)),
            _ => Err(Error::malformed_structure(format!(
                "bus `{}` has {} drivers: {}",
                self.bus_name(bus),
                drivers.len(),
                drivers
                    .iter()
                    .map(|d| self.components[*d].name)
                    .join(", ")
            ))),
        }
    }

    /// The value seen by `port`: the union of its data sources, or a generic
    /// value when it has none.
    pub fn port_value(&self, port: PortIdx) -> ForgeResult<Value> {
        let mut sources = self.data_sources(port).unique();
        let Some(first) = sources.next() else {
            let p = &self.ports[port];
            return Ok(Value::new(p.width as usize, p.signed));
        };
        sources.try_fold(self.buses[first].value.clone(), |acc, source| {
            acc.union(&self.buses[source].value)
        })
    }

    /// Check that every used data port of every component has a data
    /// dependency in every entry. Sideband ports are fed from outside the
    /// design and are skipped.
    pub fn validate(&self) -> ForgeResult<()> {
        for (_, comp) in self.components.iter() {
            for &port in &comp.data_ports {
                let p = &self.ports[port];
                if !p.used || p.tag == Tag::Sideband {
                    continue;
                }
                for (group, &entry) in comp.entries.iter().enumerate() {
                    let connected =
                        self.entries[entry].dependencies(port).iter().any(|d| {
                            self.dependencies[*d].kind == DependencyKind::Data
                        });
                    if !connected {
                        return Err(Error::malformed_structure(format!(
                            "port `{}` of `{}` has no data dependency \
                             in entry {group}",
                            p.name, comp.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    // ============ Naming ============

    pub fn port_name(&self, port: PortIdx) -> String {
        let p = &self.ports[port];
        format!("{}.{}", self.components[p.owner].name, p.name)
    }

    pub fn bus_name(&self, bus: BusIdx) -> String {
        let b = &self.buses[bus];
        format!(
            "{}.{}",
            self.components[self.exits[b.exit].owner].name,
            b.name
        )
    }

    /// The component that owns the exit producing `bus`.
    pub fn bus_owner(&self, bus: BusIdx) -> ComponentIdx {
        self.exits[self.buses[bus].exit].owner
    }

    /// Textual dump of one entry for diagnostics.
    pub fn debug_entry(&self, entry: EntryIdx) -> String {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = crate::Printer::write_entry(self, entry, &mut out);
        String::from_utf8_lossy(&out).into_owned()
    }
}
