use crate::{
    Context,
    traversal::{Named, Pass},
};
use forge_utils::ForgeResult;

/// Builds the physical implementation of every pin access that lacks one.
/// Physical modules copy the go dependencies of their access when they are
/// built, so this runs after resource sequencing.
#[derive(Default)]
pub struct PhysicalPins;

impl Named for PhysicalPins {
    fn name() -> &'static str {
        "physical-pins"
    }

    fn description() -> &'static str {
        "split pin accesses into physical modules with sideband buses"
    }
}

impl Pass for PhysicalPins {
    fn run(&mut self, ctx: &mut Context) -> ForgeResult<()> {
        let design = &mut ctx.design;
        let accesses = design
            .components
            .iter()
            .filter(|(_, c)| c.kind.is_pin_access() && c.physical.is_none())
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        for access in accesses {
            design.make_physical_component(access)?;
        }
        Ok(())
    }
}
