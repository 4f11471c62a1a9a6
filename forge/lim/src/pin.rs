//! Logical pin accesses and the physical modules that implement them.
//!
//! A logical access presents the pin to the rest of the design as an
//! ordinary component: an optional address port, a data port for writes and a
//! result bus for reads. [`Design::make_physical_component`] later builds a
//! module that forwards the logical ports to sideband buses leaving the
//! design.
use crate::{
    DependencyKind, Design, Latency, Spacing,
    common::{BusIdx, ComponentIdx, EntryIdx, ExitIdx, PortIdx, ResourceIdx},
    structure::{ComponentKind, ExitKind, Tag},
};
use forge_utils::{Error, ForgeResult, Id};

/// A physical pin of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    pub name: Id,
    pub width: u64,
    pub signed: bool,
    /// Addressed pins (e.g. a memory port) carry an address alongside data.
    pub address_width: Option<u64>,
}

impl Pin {
    pub fn new<S: Into<Id>>(name: S, width: u64, signed: bool) -> Self {
        Self {
            name: name.into(),
            width,
            signed,
            address_width: None,
        }
    }

    pub fn with_address(mut self, address_width: u64) -> Self {
        self.address_width = Some(address_width);
        self
    }
}

impl Design {
    fn pin(&self, pin: ResourceIdx) -> ForgeResult<Pin> {
        let resource = &self.resources[pin];
        resource.pin.clone().ok_or_else(|| {
            Error::malformed_structure(format!(
                "resource `{}` is not a pin",
                resource.name
            ))
        })
    }

    /// Create a logical read of `pin` inside `parent`. The result is
    /// available `depth` clocks after go.
    pub fn make_pin_read(
        &mut self,
        pin: ResourceIdx,
        parent: ComponentIdx,
        depth: u32,
    ) -> ForgeResult<ComponentIdx> {
        let p = self.pin(pin)?;
        let comp = self.add_component(
            format!("{}_read", p.name),
            ComponentKind::PinRead { pin, depth },
            Some(parent),
        )?;
        if let Some(width) = p.address_width {
            self.make_data_port(comp, "address", width, false);
        }
        let latency = Latency::get(depth.into());
        let exit = self.make_exit(comp, ExitKind::Done, latency)?;
        self.make_data_bus(exit, "result", p.width, p.signed);
        self.access_resource(comp, pin);
        Ok(comp)
    }

    /// Create a logical write of `pin` inside `parent`. The data is
    /// registered onto the pin, so the write completes one clock after go.
    pub fn make_pin_write(
        &mut self,
        pin: ResourceIdx,
        parent: ComponentIdx,
    ) -> ForgeResult<ComponentIdx> {
        let p = self.pin(pin)?;
        let comp = self.add_component(
            format!("{}_write", p.name),
            ComponentKind::PinWrite { pin },
            Some(parent),
        )?;
        if let Some(width) = p.address_width {
            self.make_data_port(comp, "address", width, false);
        }
        self.make_data_port(comp, "data", p.width, p.signed);
        self.make_exit(comp, ExitKind::Done, Latency::ONE)?;
        self.access_resource(comp, pin);
        Ok(comp)
    }

    /// Build the physical module implementing the pin access `access`.
    ///
    /// The module is a sibling of the access, entered like the access's
    /// first entry and subject to the same go dependencies. It forwards every
    /// logical data port, connected to the same source as the logical port,
    /// onto sideband buses of its exit and raises an enable sideband. Writes
    /// register the forwarded values and the enable, so the module completes
    /// one clock after go. Reads pass the sideband input through `depth`
    /// registers onto a result bus that takes over the consumers of the
    /// logical result. The access keeps signalling completion: the physical
    /// done bus is unused.
    pub fn make_physical_component(
        &mut self,
        access: ComponentIdx,
    ) -> ForgeResult<ComponentIdx> {
        let (pin, depth) = match self.components[access].kind {
            ComponentKind::PinRead { pin, depth } => (pin, Some(depth)),
            ComponentKind::PinWrite { pin } => (pin, None),
            _ => {
                return Err(Error::unexpected_structure(format!(
                    "`{}` is not a pin access",
                    self.components[access].name
                )));
            }
        };
        if let Some(physical) = self.components[access].physical {
            return Err(Error::malformed_structure(format!(
                "`{}` already has a physical implementation `{}`",
                self.components[access].name, self.components[physical].name
            )));
        }
        let p = self.pin(pin)?;
        let Some(&logical_entry) = self.components[access].entries.first()
        else {
            return Err(Error::unexpected_structure(format!(
                "`{}` has no entry to take its sources from",
                self.components[access].name
            )));
        };

        // Logical ports and the buses that feed them.
        let mut forwarded = vec![];
        for port in self.components[access].data_ports.clone() {
            let source = self.entries[logical_entry]
                .dependencies(port)
                .iter()
                .map(|d| &self.dependencies[*d])
                .find(|d| d.kind == DependencyKind::Data)
                .map(|d| d.source)
                .ok_or_else(|| {
                    Error::unexpected_structure(format!(
                        "logical port `{}` has no source to forward",
                        self.port_name(port)
                    ))
                })?;
            forwarded.push((port, source));
        }
        let go = self.components[access].go;
        let timing = self.entries[logical_entry]
            .dependencies(go)
            .iter()
            .map(|d| (self.dependencies[*d].kind, self.dependencies[*d].source))
            .collect::<Vec<_>>();

        let parent = self.components[access].parent;
        let physical = self.add_component(
            format!("{}_physical", self.components[access].name),
            ComponentKind::Physical { access },
            parent,
        )?;
        self.components[access].physical = Some(physical);
        let driving = self.entries[logical_entry].driving_exit;
        let entry = self.component_add_entry(physical, driving)?;
        self.copy_go_dependencies(physical, entry, timing)?;

        let exit = self.make_exit(physical, ExitKind::Done, Latency::ZERO)?;
        let done = self.exits[exit].done;
        self.buses[done].used = false;

        // Sideband name, width, signedness and the bus inside that drives it.
        let mut sidebands = vec![];
        for (port, source) in forwarded {
            let (name, width, signed) = {
                let l = &self.ports[port];
                (l.name, l.width, l.signed)
            };
            let inner = self.make_data_port(physical, name, width, signed);
            self.connect_data_dependency(source, inner, 0)?;
            let suffix = if name == "data" { "dout" } else { "addr" };
            let value = self.peer_bus(inner)?;
            let name = format!("{}_{suffix}", p.name);
            sidebands.push((name, width, signed, value));
        }
        let enable = self.peer_bus(self.components[physical].go)?;
        sidebands.push((format!("{}_en", p.name), 1, false, enable));

        let mut stages = vec![];
        for (name, width, signed, mut value) in sidebands {
            if depth.is_none() {
                let (stage, q) = self.register_stage(
                    physical,
                    format!("{name}_reg"),
                    (width, signed),
                    value,
                    None,
                )?;
                stages.push(stage);
                value = q;
            }
            self.sideband_bus(exit, name, width, signed, value)?;
        }

        if let Some(depth) = depth {
            let din = self.make_data_port(
                physical,
                format!("{}_din", p.name),
                p.width,
                p.signed,
            );
            self.ports[din].tag = Tag::Sideband;
            let mut stage = self.peer_bus(din)?;
            let mut prev: Option<ExitIdx> = None;
            for _ in 0..depth {
                let (q_exit, q) = self.register_stage(
                    physical,
                    format!("{}_stage", p.name),
                    (p.width, p.signed),
                    stage,
                    prev,
                )?;
                stage = q;
                prev = Some(q_exit);
            }
            stages.extend(prev);
            let result = self.make_data_bus(exit, "result", p.width, p.signed);
            let result_port = self.peer_of_bus(result)?;
            self.connect_data_dependency(stage, result_port, 0)?;

            let logical_result = self.components[access]
                .exits
                .iter()
                .flat_map(|e| self.exits[*e].data.iter().copied())
                .find(|b| self.buses[*b].name == "result");
            if let Some(logical_result) = logical_result {
                self.move_dependents(logical_result, result);
            }

            if depth == 0 {
                let (clock, reset) = {
                    let c = &self.components[physical];
                    (c.clock, c.reset)
                };
                self.ports[clock].used = false;
                self.ports[reset].used = false;
            }
        }

        let outbuf = self.outbuf_of(exit)?;
        for stage in stages {
            self.connect_control_dependency(outbuf, stage, 0)?;
        }
        log::debug!(
            "built physical `{}` for `{}`",
            self.components[physical].name,
            self.components[access].name
        );
        Ok(physical)
    }

    /// Give `entry` of `comp` the go dependencies in `timing` it does not
    /// already have.
    fn copy_go_dependencies(
        &mut self,
        comp: ComponentIdx,
        entry: EntryIdx,
        timing: Vec<(DependencyKind, BusIdx)>,
    ) -> ForgeResult<()> {
        let go = self.components[comp].go;
        for (kind, source) in timing {
            let present =
                self.entries[entry].dependencies(go).iter().any(|d| {
                    let d = &self.dependencies[*d];
                    d.kind == kind && d.source == source
                });
            if present {
                continue;
            }
            let exit = self.buses[source].exit;
            match kind {
                DependencyKind::Resource {
                    delay_clocks,
                    spacing: Spacing::GoToGo,
                } => {
                    self.connect_go_to_go_dependency(
                        comp,
                        exit,
                        0,
                        delay_clocks,
                    )?;
                }
                DependencyKind::Resource { delay_clocks, .. } => {
                    self.connect_resource_dependency(
                        comp,
                        exit,
                        0,
                        delay_clocks,
                    )?;
                }
                _ => {
                    self.connect_control_dependency(comp, exit, 0)?;
                }
            }
        }
        Ok(())
    }

    /// A register inside `parent` loading `input` one clock after it is
    /// entered. Returns its exit and output bus.
    fn register_stage(
        &mut self,
        parent: ComponentIdx,
        prefix: String,
        (width, signed): (u64, bool),
        input: BusIdx,
        driver: Option<ExitIdx>,
    ) -> ForgeResult<(ExitIdx, BusIdx)> {
        let reg = self.add_component(prefix, ComponentKind::Reg, Some(parent))?;
        let d = self.make_data_port(reg, "in", width, signed);
        let q_exit = self.make_exit(reg, ExitKind::Done, Latency::ONE)?;
        let q = self.make_data_bus(q_exit, "out", width, signed);
        self.component_add_entry(reg, driver)?;
        self.connect_data_dependency(input, d, 0)?;
        Ok((q_exit, q))
    }

    fn peer_of_bus(&self, bus: BusIdx) -> ForgeResult<PortIdx> {
        self.buses[bus].peer.ok_or_else(|| {
            Error::malformed_structure(format!(
                "bus `{}` has no peer port",
                self.bus_name(bus)
            ))
        })
    }

    fn outbuf_of(&self, exit: ExitIdx) -> ForgeResult<ComponentIdx> {
        self.exits[exit].outbuf.ok_or_else(|| {
            Error::malformed_structure(format!(
                "exit of `{}` has no output buffer",
                self.components[self.exits[exit].owner].name
            ))
        })
    }

    /// A sideband bus on `exit` driven from `source` inside the module.
    fn sideband_bus(
        &mut self,
        exit: ExitIdx,
        name: String,
        width: u64,
        signed: bool,
        source: BusIdx,
    ) -> ForgeResult<BusIdx> {
        let bus = self.make_data_bus(exit, name, width, signed);
        self.buses[bus].tag = Tag::Sideband;
        let port = self.peer_of_bus(bus)?;
        self.connect_data_dependency(source, port, 0)?;
        Ok(bus)
    }
}
