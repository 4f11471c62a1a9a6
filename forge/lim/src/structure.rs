//! Representation of the structural nodes (components, ports, buses and
//! exits) of a [`Design`](crate::Design).
use crate::{
    Latency, Value,
    common::{
        BusIdx, ComponentIdx, DependencyIdx, EntryIdx, ExitIdx, PortIdx,
        ResourceIdx,
    },
    pin::Pin,
};
use forge_utils::{GetName, Id};

/// Whether a port or bus carries ordinary data or a signal that leaves the
/// design through a physical pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tag {
    #[default]
    Normal,
    Sideband,
}

/// The kind of a [Component].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    /// A component owning child components.
    Module,
    /// An opaque operation with fixed exit latencies, e.g. an adder.
    Operation(Id),
    /// A single-stage register.
    Reg,
    /// A logical read of a pin. `depth` input pipeline registers are placed
    /// in its physical implementation.
    PinRead { pin: ResourceIdx, depth: u32 },
    /// A logical write of a pin.
    PinWrite { pin: ResourceIdx },
    /// The physical implementation of a pin access. This is a module.
    Physical { access: ComponentIdx },
    /// Collects the values that leave a module through `exit`.
    OutBuf { exit: ExitIdx },
}

impl ComponentKind {
    /// Modules own children and an input buffer.
    pub fn is_module(&self) -> bool {
        matches!(self, ComponentKind::Module | ComponentKind::Physical { .. })
    }

    pub fn is_pin_access(&self) -> bool {
        matches!(
            self,
            ComponentKind::PinRead { .. } | ComponentKind::PinWrite { .. }
        )
    }
}

/// The kind of an [Exit].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitKind {
    /// Normal completion.
    Done,
    /// Completion of a method through a return statement.
    Return,
    /// Abnormal completion.
    Exception,
    /// The input buffer of a module. Its buses are the inner peers of the
    /// module's ports.
    InBuf,
}

/// Deferred work attached to a component that runs once the component's
/// latency is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScheduleCallback {
    /// Check the go-to-go hypothesis of a resource dependency sourced from
    /// this component.
    ValidateGoToGo(DependencyIdx),
}

/// An input of a component.
#[derive(Debug, Clone)]
pub struct Port {
    pub name: Id,
    pub owner: ComponentIdx,
    pub width: u64,
    pub signed: bool,
    pub tag: Tag,
    /// Unused ports need no dependencies.
    pub used: bool,
    /// For module ports, the input buffer bus that carries the port's value
    /// inside the module.
    pub peer: Option<BusIdx>,
}

impl GetName for Port {
    fn name(&self) -> Id {
        self.name
    }
}

/// An output of an exit.
#[derive(Debug, Clone)]
pub struct Bus {
    pub name: Id,
    pub exit: ExitIdx,
    pub width: u64,
    pub signed: bool,
    pub tag: Tag,
    pub used: bool,
    /// For module exit buses, the output buffer port that feeds the bus
    /// from inside the module.
    pub peer: Option<PortIdx>,
    /// One owned bit per position.
    pub value: Value,
    /// Every attached dependency sourced from this bus.
    pub(crate) dependents: Vec<DependencyIdx>,
}

impl GetName for Bus {
    fn name(&self) -> Id {
        self.name
    }
}

/// One completion condition of a component.
#[derive(Debug, Clone)]
pub struct Exit {
    pub owner: ComponentIdx,
    pub kind: ExitKind,
    pub done: BusIdx,
    pub data: Vec<BusIdx>,
    /// Entries whose control context begins when this exit completes.
    pub drives: Vec<EntryIdx>,
    /// Clocks from the owner's go to this exit's done. Modules compute this
    /// during scheduling instead.
    pub latency: Latency,
    /// For module exits, the component that collects the exit's values.
    pub outbuf: Option<ComponentIdx>,
}

impl Exit {
    /// The done bus followed by the data buses.
    pub fn buses(&self) -> impl Iterator<Item = BusIdx> + '_ {
        std::iter::once(self.done).chain(self.data.iter().copied())
    }
}

/// A node of the dependency graph.
#[derive(Debug, Clone)]
pub struct Component {
    pub name: Id,
    pub kind: ComponentKind,
    pub parent: Option<ComponentIdx>,
    pub children: Vec<ComponentIdx>,
    pub clock: PortIdx,
    pub reset: PortIdx,
    pub go: PortIdx,
    pub data_ports: Vec<PortIdx>,
    pub exits: Vec<ExitIdx>,
    pub entries: Vec<EntryIdx>,
    /// Only modules have an input buffer.
    pub inbuf: Option<ExitIdx>,
    pub resources: Vec<ResourceIdx>,
    pub(crate) post_schedule: Vec<PostScheduleCallback>,
    /// For pin accesses, the physical implementation once it is built.
    pub physical: Option<ComponentIdx>,
}

impl Component {
    pub fn is_module(&self) -> bool {
        self.kind.is_module()
    }

    /// Clock, reset and go followed by the data ports.
    pub fn ports(&self) -> impl Iterator<Item = PortIdx> + '_ {
        [self.clock, self.reset, self.go]
            .into_iter()
            .chain(self.data_ports.iter().copied())
    }

    pub fn post_schedule_callbacks(&self) -> &[PostScheduleCallback] {
        &self.post_schedule
    }
}

impl GetName for Component {
    fn name(&self) -> Id {
        self.name
    }
}

/// A stateful resource whose accesses must be sequenced.
#[derive(Debug, Clone)]
pub struct Resource {
    pub name: Id,
    /// Minimum clocks between the completion of one access and the start of
    /// the next.
    pub spacing: u64,
    pub pin: Option<Pin>,
}

impl GetName for Resource {
    fn name(&self) -> Id {
        self.name
    }
}
