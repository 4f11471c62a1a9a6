use crate::{
    Context,
    analysis::ComponentOrder,
    traversal::{ConstructPass, Named, ParseVal, Pass, PassOpt},
};
use forge_lim::{ComponentIdx, DependencyKind, Design, ResourceIdx, Spacing};
use forge_utils::{Error, ForgeResult};
use linked_hash_map::LinkedHashMap;

/// Sequences accesses to shared resources.
///
/// Within each module, every accessor of a resource waits on the previous
/// accessor of the same resource (in dependency order) through a resource
/// dependency whose delay is the resource's spacing. Modules are visited
/// bottom-up and inherit the resources of their children, so accesses in
/// different child modules are sequenced too.
///
/// When `go-to-go` is enabled and the previous accessor is not known to take
/// clocks, the cheaper go-to-go spacing is used; the scheduler falls back to
/// done-to-go if that turns out to be wrong.
pub struct ResourceSequencer {
    go_to_go: bool,
}

impl Named for ResourceSequencer {
    fn name() -> &'static str {
        "resource-sequence"
    }

    fn description() -> &'static str {
        "add resource dependencies between successive accesses to a resource"
    }

    fn opts() -> Vec<PassOpt> {
        vec![PassOpt::new(
            "go-to-go",
            "space accesses from the previous go when possible",
            ParseVal::Bool(true),
            PassOpt::parse_bool,
        )]
    }
}

impl ConstructPass for ResourceSequencer {
    fn from(ctx: &Context) -> ForgeResult<Self> {
        let opts = Self::get_opts(ctx);
        Ok(ResourceSequencer {
            go_to_go: opts["go-to-go"].bool(),
        })
    }
}

impl Pass for ResourceSequencer {
    fn run(&mut self, ctx: &mut Context) -> ForgeResult<()> {
        self.sequence(&mut ctx.design)
    }
}

impl ResourceSequencer {
    pub fn new(go_to_go: bool) -> Self {
        Self { go_to_go }
    }

    pub fn sequence(&self, design: &mut Design) -> ForgeResult<()> {
        for module in ComponentOrder::modules_bottom_up(design) {
            let mut last: LinkedHashMap<ResourceIdx, ComponentIdx> =
                LinkedHashMap::new();
            for child in ComponentOrder::children(design, module) {
                for resource in design.components[child].resources.clone() {
                    if let Some(prev) = last.insert(resource, child) {
                        self.connect(design, prev, child, resource)?;
                    }
                }
            }
            for (resource, _) in last {
                design.access_resource(module, resource);
            }
        }
        Ok(())
    }

    /// A component is known to take clocks if one of its exits always
    /// does. Module latencies are only known after scheduling.
    fn takes_clocks(design: &Design, comp: ComponentIdx) -> bool {
        let c = &design.components[comp];
        !c.is_module()
            && c.exits
                .iter()
                .any(|exit| design.exits[*exit].latency.min_clocks() > 0)
    }

    fn connect(
        &self,
        design: &mut Design,
        prev: ComponentIdx,
        next: ComponentIdx,
        resource: ResourceIdx,
    ) -> ForgeResult<()> {
        let Some(&exit) = design.components[prev].exits.first() else {
            return Err(Error::pass_assumption(
                Self::name(),
                format!(
                    "`{}` accesses `{}` but never completes",
                    design.components[prev].name,
                    design.resources[resource].name
                ),
            ));
        };
        let delay_clocks = design.resources[resource].spacing;
        let spacing = if self.go_to_go && !Self::takes_clocks(design, prev) {
            Spacing::GoToGo
        } else {
            Spacing::DoneToGo
        };
        let kind = DependencyKind::Resource {
            delay_clocks,
            spacing,
        };
        let source = design.exits[exit].done;
        let go = design.components[next].go;

        for group in 0..design.components[next].entries.len() {
            let entry = design.entry_of(next, group)?;
            let exists = design.entries[entry].dependencies(go).iter().any(|d| {
                let d = &design.dependencies[*d];
                d.kind == kind && d.source == source
            });
            if exists {
                continue;
            }
            log::debug!(
                "`{}` waits {delay_clocks} clocks on `{}` for `{}`",
                design.components[next].name,
                design.components[prev].name,
                design.resources[resource].name
            );
            match spacing {
                Spacing::GoToGo => design.connect_go_to_go_dependency(
                    next,
                    exit,
                    group,
                    delay_clocks,
                )?,
                Spacing::DoneToGo => design.connect_resource_dependency(
                    next,
                    exit,
                    group,
                    delay_clocks,
                )?,
            };
        }
        Ok(())
    }
}
