//! Defines the default passes available to [PassManager].
use crate::passes::{PhysicalPins, ResourceSequencer, Scheduler, WellFormed};
use crate::traversal::Named;
use crate::{pass_manager::PassManager, register_alias};
use forge_utils::ForgeResult;

impl PassManager {
    pub fn default_passes() -> ForgeResult<Self> {
        let mut pm = PassManager::default();

        // Validation passes
        pm.register_pass::<WellFormed>()?;

        // Lowering passes
        pm.register_pass::<ResourceSequencer>()?;
        pm.register_pass::<PhysicalPins>()?;

        // Analysis passes
        pm.register_pass::<Scheduler>()?;

        register_alias!(pm, "validate", [WellFormed]);
        register_alias!(
            pm,
            "all",
            ["validate", ResourceSequencer, PhysicalPins, Scheduler]
        );
        Ok(pm)
    }
}
