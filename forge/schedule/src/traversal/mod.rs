//! Helpers for constructing and running passes over a [Context].
mod construct;

pub use construct::{ConstructPass, Named, ParseVal, PassOpt};

use crate::Context;
use forge_utils::ForgeResult;

/// A transformation or analysis over the design held by a [Context].
pub trait Pass {
    fn run(&mut self, ctx: &mut Context) -> ForgeResult<()>;

    /// Construct the pass from the context and run it.
    fn do_pass_default(ctx: &mut Context) -> ForgeResult<()>
    where
        Self: ConstructPass + Named + Sized,
    {
        let mut pass = Self::from(ctx)?;
        log::debug!("running `{}`", Self::name());
        pass.run(ctx)
    }
}
