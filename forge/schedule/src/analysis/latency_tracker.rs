use forge_idx::maps::SecondaryMap;
use forge_lim::{ComponentIdx, Design, EntryIdx, ExitIdx, Latency};
use forge_utils::{Error, ForgeResult};

/// The latencies computed by the scheduler.
///
/// Positions (exit and entry latencies, component starts) are relative to
/// the start of the enclosing module. Durations run from a component's go to
/// the completion of one of its exits.
#[derive(Debug, Default, Clone)]
pub struct LatencyTracker {
    exits: SecondaryMap<ExitIdx, Option<Latency>>,
    durations: SecondaryMap<ExitIdx, Option<Latency>>,
    entries: SecondaryMap<EntryIdx, Option<Latency>>,
    starts: SecondaryMap<ComponentIdx, Option<Latency>>,
    components: SecondaryMap<ComponentIdx, Option<Latency>>,
}

/// Store `latency` at `idx` and report whether anything changed.
fn update<K>(
    map: &mut SecondaryMap<K, Option<Latency>>,
    idx: K,
    latency: Latency,
) -> bool
where
    K: forge_idx::IndexRef,
{
    if map[idx].as_ref() == Some(&latency) {
        return false;
    }
    map.insert(idx, Some(latency));
    true
}

impl LatencyTracker {
    /// When `exit` completes, relative to the start of the enclosing module.
    pub fn exit_latency(&self, exit: ExitIdx) -> Option<&Latency> {
        self.exits[exit].as_ref()
    }

    /// Clocks from the go of the exit's owner to the exit's done.
    pub fn exit_duration(&self, exit: ExitIdx) -> Option<&Latency> {
        self.durations[exit].as_ref()
    }

    /// When all dependencies of `entry` are resolved.
    pub fn entry_latency(&self, entry: EntryIdx) -> Option<&Latency> {
        self.entries[entry].as_ref()
    }

    /// When `comp` starts, relative to the start of its parent.
    pub fn start_latency(&self, comp: ComponentIdx) -> Option<&Latency> {
        self.starts[comp].as_ref()
    }

    /// The latency of `comp` itself: a choice among the durations of its
    /// exits.
    pub fn component_latency(&self, comp: ComponentIdx) -> Option<&Latency> {
        self.components[comp].as_ref()
    }

    pub(crate) fn set_exit(&mut self, exit: ExitIdx, latency: Latency) -> bool {
        update(&mut self.exits, exit, latency)
    }

    pub(crate) fn set_duration(
        &mut self,
        exit: ExitIdx,
        latency: Latency,
    ) -> bool {
        update(&mut self.durations, exit, latency)
    }

    pub(crate) fn set_entry(
        &mut self,
        entry: EntryIdx,
        latency: Latency,
    ) -> bool {
        update(&mut self.entries, entry, latency)
    }

    pub(crate) fn set_start(
        &mut self,
        comp: ComponentIdx,
        latency: Latency,
    ) -> bool {
        update(&mut self.starts, comp, latency)
    }

    pub(crate) fn set_component(
        &mut self,
        comp: ComponentIdx,
        latency: Latency,
    ) -> bool {
        update(&mut self.components, comp, latency)
    }

    /// Check that every exit of every scheduled component has a latency.
    /// Components inside a module must have a position; top-level modules
    /// only need durations.
    pub fn verify(&self, design: &Design) -> ForgeResult<()> {
        for (_, comp) in design.components.iter() {
            let top_level = comp.parent.is_none();
            if top_level && !comp.is_module() {
                continue;
            }
            for &exit in &comp.exits {
                let known = if top_level {
                    self.exit_duration(exit).is_some()
                } else {
                    self.exit_latency(exit).is_some()
                };
                if !known {
                    return Err(Error::pass_assumption(
                        "latency-schedule",
                        format!(
                            "{:?} exit of `{}` was never scheduled",
                            design.exits[exit].kind, comp.name
                        ),
                    )
                    .with_post_msg(format!(
                        "`{}` has {} entries",
                        comp.name,
                        comp.entries.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LatencyTracker;
    use forge_lim::{ExitIdx, Latency};

    #[test]
    fn setters_report_changes() {
        let mut tracker = LatencyTracker::default();
        let exit = ExitIdx::from(4_u32);
        assert_eq!(tracker.exit_latency(exit), None);
        assert!(tracker.set_exit(exit, Latency::get(2)));
        assert!(!tracker.set_exit(exit, Latency::get(2)));
        assert!(tracker.set_exit(exit, Latency::get(3)));
        assert_eq!(tracker.exit_latency(exit), Some(&Latency::get(3)));
        assert_eq!(tracker.exit_latency(ExitIdx::from(1_u32)), None);
    }
}
