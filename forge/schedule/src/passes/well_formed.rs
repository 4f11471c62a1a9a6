use crate::{
    Context,
    traversal::{Named, Pass},
};
use forge_lim::ComponentKind;
use forge_utils::{Error, ForgeResult};

/// Checks that the design can be scheduled: every used data port is
/// connected in every entry and every non-module component has an exit.
#[derive(Default)]
pub struct WellFormed;

impl Named for WellFormed {
    fn name() -> &'static str {
        "well-formed"
    }

    fn description() -> &'static str {
        "check that the dependency graph is complete"
    }
}

impl Pass for WellFormed {
    fn run(&mut self, ctx: &mut Context) -> ForgeResult<()> {
        let design = &ctx.design;
        design.validate()?;
        for (_, comp) in design.components.iter() {
            let needs_exit = !comp.is_module()
                && !matches!(comp.kind, ComponentKind::OutBuf { .. });
            if needs_exit && comp.exits.is_empty() {
                return Err(Error::malformed_structure(format!(
                    "`{}` has no exit",
                    comp.name
                )));
            }
        }
        Ok(())
    }
}
