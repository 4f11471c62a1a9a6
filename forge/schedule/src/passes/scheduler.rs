use crate::{
    Context,
    analysis::{ComponentOrder, LatencyTracker},
    traversal::{ConstructPass, Named, ParseVal, Pass, PassOpt},
};
use forge_lim::{
    ComponentIdx, DependencyIdx, DependencyKind, Design, EntryIdx, Latency,
    LatencyKey, Spacing,
};
use forge_utils::{Error, ForgeResult};
use linked_hash_map::LinkedHashMap;
use std::collections::HashSet;

/// Computes the latency of every exit, entry and component of the design.
///
/// Modules are scheduled bottom-up, each relative to its own start: the input
/// buffer of a module completes at [`Latency::ZERO`]. Within a module the
/// children are visited in dependency order until no latency changes. The
/// start of an entry is the latest of its timing dependencies and the start
/// of a component is a choice among its entries.
///
/// Once every module is scheduled, the post-schedule callbacks of every
/// component run. If any go-to-go hypothesis is invalidated the whole design
/// is scheduled again with done-to-go spacing for those dependencies.
pub struct Scheduler {
    /// Bound on the fixed point within one module.
    max_iterations: u64,
}

impl Named for Scheduler {
    fn name() -> &'static str {
        "latency-schedule"
    }

    fn description() -> &'static str {
        "compute clock latencies for every exit in the design"
    }

    fn opts() -> Vec<PassOpt> {
        vec![PassOpt::new(
            "max-iterations",
            "bound on fixed point iterations per module",
            ParseVal::Num(1000),
            PassOpt::parse_num,
        )]
    }
}

impl ConstructPass for Scheduler {
    fn from(ctx: &Context) -> ForgeResult<Self> {
        let opts = Self::get_opts(ctx);
        let max_iterations = opts["max-iterations"].pos_num().ok_or_else(|| {
            Error::misc(format!(
                "{}:max-iterations must not be negative",
                Self::name()
            ))
        })?;
        Ok(Scheduler::new(max_iterations))
    }
}

impl Pass for Scheduler {
    fn run(&mut self, ctx: &mut Context) -> ForgeResult<()> {
        let tracker = self.schedule(&mut ctx.design)?;
        ctx.latencies = Some(tracker);
        Ok(())
    }
}

impl Scheduler {
    pub fn new(max_iterations: u64) -> Self {
        Self { max_iterations }
    }

    /// Schedule every module of `design`, rescheduling until every go-to-go
    /// hypothesis that survives has been validated.
    pub fn schedule(&self, design: &mut Design) -> ForgeResult<LatencyTracker> {
        let modules = ComponentOrder::modules_bottom_up(design);
        loop {
            let mut tracker = LatencyTracker::default();
            for &module in &modules {
                self.schedule_module(design, module, &mut tracker)?;
            }

            let mut invalidated = vec![];
            for comp in design.components.keys() {
                if let Some(latency) = tracker.component_latency(comp).cloned()
                {
                    invalidated.extend(design.post_schedule(comp, &latency));
                }
            }
            if invalidated.is_empty() {
                tracker.verify(design)?;
                return Ok(tracker);
            }
            log::debug!(
                "rescheduling after invalidating {} go-to-go dependencies",
                invalidated.len()
            );
        }
    }

    fn schedule_module(
        &self,
        design: &Design,
        module: ComponentIdx,
        tracker: &mut LatencyTracker,
    ) -> ForgeResult<()> {
        let comp = &design.components[module];
        let inbuf = comp.inbuf.ok_or_else(|| {
            Error::pass_assumption(
                Self::name(),
                format!("`{}` is not a module", comp.name),
            )
        })?;
        tracker.set_exit(inbuf, Latency::ZERO);

        let order = ComponentOrder::children(design, module);
        let mut iterations = 0;
        loop {
            if iterations == self.max_iterations {
                return Err(Error::pass_assumption(
                    Self::name(),
                    format!(
                        "latencies in `{}` did not converge after {} \
                         iterations",
                        comp.name, self.max_iterations
                    ),
                ));
            }
            iterations += 1;
            let mut changed = false;
            for &child in &order {
                changed |= self.schedule_child(design, child, tracker);
            }
            if !changed {
                break;
            }
        }
        log::debug!("scheduled `{}` in {iterations} iterations", comp.name);

        for &exit in &comp.exits {
            let duration = design.exits[exit]
                .outbuf
                .and_then(|outbuf| tracker.start_latency(outbuf).cloned());
            if let Some(duration) = duration {
                tracker.set_duration(exit, duration);
            }
        }
        self.set_component_latency(design, module, tracker);
        Ok(())
    }

    /// Compute the start and exit latencies of `child`. Returns true if any
    /// of them changed. A child with an entry that is not ready yet is left
    /// alone.
    fn schedule_child(
        &self,
        design: &Design,
        child: ComponentIdx,
        tracker: &mut LatencyTracker,
    ) -> bool {
        let comp = &design.components[child];
        let key = LatencyKey::from(child);
        let mut changed = false;

        let starts = comp
            .entries
            .iter()
            .map(|&entry| {
                Self::entry_start(design, entry, key, tracker)
                    .map(|s| (entry, s))
            })
            .collect::<Option<Vec<_>>>();
        let Some(starts) = starts.filter(|s| !s.is_empty()) else {
            return false;
        };
        for (entry, start) in &starts {
            changed |= tracker.set_entry(*entry, start.clone());
        }
        let start = Latency::or(starts.into_iter().map(|(_, s)| s), key);
        changed |= tracker.set_start(child, start.clone());

        for &exit in &comp.exits {
            let duration = if comp.is_module() {
                tracker.exit_duration(exit).cloned()
            } else {
                Some(design.exits[exit].latency.clone())
            };
            let Some(duration) = duration else {
                continue;
            };
            tracker.set_duration(exit, duration.clone());
            changed |= tracker.set_exit(exit, duration.add_to(&start));
        }
        if !comp.is_module() {
            self.set_component_latency(design, child, tracker);
        }
        changed
    }

    /// The latest of the timing dependencies of `entry`, or `None` if one of
    /// their sources has no latency yet.
    fn entry_start(
        design: &Design,
        entry: EntryIdx,
        key: LatencyKey,
        tracker: &LatencyTracker,
    ) -> Option<Latency> {
        let mut candidates: LinkedHashMap<DependencyIdx, Latency> =
            LinkedHashMap::new();
        let mut preferred = HashSet::new();
        for idx in design.entries[entry].all_dependencies() {
            let dep = &design.dependencies[idx];
            let exit = design.buses[dep.source].exit;
            let latency = match dep.kind {
                DependencyKind::Clock | DependencyKind::Reset => continue,
                DependencyKind::Resource { delay_clocks, .. } => {
                    let base = match design.effective_spacing(idx) {
                        Some(Spacing::GoToGo) => {
                            tracker.start_latency(design.exits[exit].owner)?
                        }
                        _ => tracker.exit_latency(exit)?,
                    };
                    Latency::get(delay_clocks).add_to(base)
                }
                DependencyKind::Control => {
                    preferred.insert(idx);
                    tracker.exit_latency(exit)?.clone()
                }
                DependencyKind::Data => tracker.exit_latency(exit)?.clone(),
            };
            candidates.insert(idx, latency);
        }
        let latest = Latency::get_latest(&candidates, &preferred);
        Some(Latency::and(latest.into_iter().map(|(_, l)| l), key))
    }

    fn set_component_latency(
        &self,
        design: &Design,
        comp: ComponentIdx,
        tracker: &mut LatencyTracker,
    ) {
        let durations = design.components[comp]
            .exits
            .iter()
            .map(|exit| tracker.exit_duration(*exit).cloned())
            .collect::<Option<Vec<_>>>();
        if let Some(durations) = durations {
            let latency = Latency::or(durations, LatencyKey::from(comp));
            tracker.set_component(comp, latency);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Scheduler;
    use forge_lim::{ComponentKind, Design, ExitKind, Latency};
    use forge_utils::{ErrorKind, Id};

    #[test]
    fn module_latency_is_its_outbuf_start() {
        let mut design = Design::new();
        let top = design
            .add_component("top", ComponentKind::Module, None)
            .unwrap();
        let done =
            design.make_exit(top, ExitKind::Done, Latency::ZERO).unwrap();
        let kind = ComponentKind::Operation(Id::from("mul"));
        let mul = design.add_component("mul", kind, Some(top)).unwrap();
        let mul_done =
            design.make_exit(mul, ExitKind::Done, Latency::get(3)).unwrap();
        design.component_add_entry(mul, None).unwrap();
        let outbuf = design.exits[done].outbuf.unwrap();
        design.connect_control_dependency(outbuf, mul_done, 0).unwrap();

        let tracker = Scheduler::new(10).schedule(&mut design).unwrap();
        assert_eq!(tracker.exit_latency(mul_done), Some(&Latency::get(3)));
        assert_eq!(tracker.exit_duration(done), Some(&Latency::get(3)));
        assert_eq!(tracker.component_latency(top), Some(&Latency::get(3)));
    }

    #[test]
    fn unready_children_fail_verification() {
        let mut design = Design::new();
        let top = design
            .add_component("top", ComponentKind::Module, None)
            .unwrap();
        let a =
            design.add_component("a", ComponentKind::Reg, Some(top)).unwrap();
        design.make_exit(a, ExitKind::Done, Latency::ONE).unwrap();
        let err = Scheduler::new(10).schedule(&mut design).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::PassAssumption(..)));
        assert!(err.to_string().contains("exit of `a`"), "{err}");
    }
}
