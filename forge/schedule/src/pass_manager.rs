//! Define the PassManager structure that is used to construct and run
//! passes.
use crate::{
    Context,
    traversal::{ConstructPass, Named, Pass},
};
use forge_utils::{Error, ForgeResult};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::time::Instant;

/// Top-level type for all passes that transform a [Context].
pub type PassClosure = Box<dyn Fn(&mut Context) -> ForgeResult<()>>;

/// Tracks all registered passes.
#[derive(Default)]
pub struct PassManager {
    /// All registered passes
    passes: HashMap<String, PassClosure>,
    /// Aliases for groups of passes that run together.
    aliases: HashMap<String, Vec<String>>,
    help: HashMap<String, String>,
}

impl PassManager {
    /// Register a new pass and return an error if another pass with the same
    /// name has already been registered.
    pub fn register_pass<P>(&mut self) -> ForgeResult<()>
    where
        P: Pass + ConstructPass + Named,
    {
        let name = P::name().to_string();
        if self.passes.contains_key(&name) {
            return Err(Error::misc(format!(
                "Pass with name '{name}' is already registered."
            )));
        }
        self.passes
            .insert(name.clone(), Box::new(|ctx| P::do_pass_default(ctx)));
        let mut help = format!("- {}: {}", name, P::description());
        for opt in P::opts() {
            // Writing to a String cannot fail.
            let _ = write!(
                &mut help,
                "\n  * {}: {} (default: {})",
                opt.name(),
                opt.description(),
                opt.default()
            );
        }
        self.help.insert(name, help);
        Ok(())
    }

    /// Adds a new alias for a group of passes. Each name is either a
    /// registered pass or an existing alias, which is expanded in place.
    pub fn add_alias(
        &mut self,
        name: String,
        passes: Vec<String>,
    ) -> ForgeResult<()> {
        if self.aliases.contains_key(&name) || self.passes.contains_key(&name) {
            return Err(Error::misc(format!(
                "Alias with name '{name}' already registered."
            )));
        }
        let mut all_passes = Vec::with_capacity(passes.len());
        for pass in passes {
            if let Some(expanded) = self.aliases.get(&pass) {
                all_passes.extend(expanded.iter().cloned());
            } else if self.passes.contains_key(&pass) {
                all_passes.push(pass);
            } else {
                return Err(Error::misc(format!(
                    "No pass or alias named: {pass}"
                )));
            }
        }
        self.aliases.insert(name, all_passes);
        Ok(())
    }

    /// Return the help string for a specific pass or alias.
    pub fn specific_help(&self, pass: &str) -> Option<String> {
        self.help.get(pass).cloned().or_else(|| {
            self.aliases.get(pass).map(|passes| {
                let pass_str = passes
                    .iter()
                    .map(|p| format!("- {p}"))
                    .collect::<Vec<String>>()
                    .join("\n");
                format!("`{pass}' is an alias for pass pipeline:\n{pass_str}")
            })
        })
    }

    /// Every available pass and alias, for help text.
    pub fn complete_help(&self) -> String {
        let mut ret = String::with_capacity(1000);

        let mut pass_names = self.passes.keys().collect::<Vec<_>>();
        pass_names.sort();
        ret.push_str("Passes:\n");
        for pass in pass_names {
            ret.push_str(&self.help[pass]);
            ret.push('\n');
        }

        let mut aliases = self.aliases.iter().collect::<Vec<_>>();
        aliases.sort_by(|kv1, kv2| kv1.0.cmp(kv2.0));
        ret.push_str("\nAliases:\n");
        for (alias, passes) in aliases {
            let _ = writeln!(ret, "- {}: {}", alias, passes.join(", "));
        }
        ret
    }

    /// Attempts to resolve the alias name. If there is no alias with this
    /// name, assumes that this is a pass instead.
    fn resolve_alias(&self, maybe_alias: &str) -> Vec<String> {
        self.aliases
            .get(maybe_alias)
            .cloned()
            .unwrap_or_else(|| vec![maybe_alias.to_string()])
    }

    /// Creates a plan from an inclusion and exclusion list which might
    /// contain aliases.
    pub fn create_plan(
        &self,
        incls: &[String],
        excls: &[String],
    ) -> ForgeResult<(Vec<String>, HashSet<String>)> {
        let passes = incls
            .iter()
            .flat_map(|maybe_alias| self.resolve_alias(maybe_alias))
            .collect::<Vec<_>>();

        let excl_set = excls
            .iter()
            .flat_map(|maybe_alias| self.resolve_alias(maybe_alias))
            .collect::<HashSet<String>>();

        passes.iter().chain(excl_set.iter()).try_for_each(|pass| {
            if !self.passes.contains_key(pass) {
                Err(Error::misc(format!("Unknown pass: {pass}.")))
            } else {
                Ok(())
            }
        })?;

        Ok((passes, excl_set))
    }

    /// Executes the plan constructed from the incl and excl lists.
    pub fn execute_plan(
        &self,
        ctx: &mut Context,
        incl: &[String],
        excl: &[String],
    ) -> ForgeResult<()> {
        let (passes, excl_set) = self.create_plan(incl, excl)?;

        for name in passes {
            if excl_set.contains(&name) {
                log::info!("{name}: Ignored");
                continue;
            }
            // Known to exist because create_plan validates the names.
            let pass = &self.passes[&name];
            let start = Instant::now();
            pass(ctx)?;
            let elapsed = start.elapsed();
            if elapsed.as_secs() > 5 {
                log::warn!("{name}: {}ms", elapsed.as_millis());
            } else {
                log::info!("{name}: {}ms", elapsed.as_millis());
            }
        }

        Ok(())
    }
}

/// Simple macro to register an alias with a pass manager.
///
/// ## Example
/// ```ignore
/// let mut pm = PassManager::default();
/// register_alias!(pm, "validate", [WellFormed]);
/// ```
#[macro_export]
macro_rules! register_alias {
    (@unwrap_name $pass:ident) => {
        $pass::name().to_string()
    };

    (@unwrap_name $pass:literal) => {
        $pass.to_string()
    };

    ($manager:expr, $alias:literal, [ $($pass:tt),* $(,)? ]) => {
        $manager.add_alias($alias.to_string(), vec![
            $($crate::register_alias!(@unwrap_name $pass)),*
        ])?;
    };
}

#[cfg(test)]
mod tests {
    use super::PassManager;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut pm = PassManager::default_passes().unwrap();
        assert!(pm.register_pass::<crate::passes::WellFormed>().is_err());
        assert!(pm.add_alias("all".into(), names(&["well-formed"])).is_err());
        assert!(pm.add_alias("bogus".into(), names(&["nope"])).is_err());
    }

    #[test]
    fn aliases_expand_and_exclusions_apply() {
        let pm = PassManager::default_passes().unwrap();
        let (plan, excl) = pm
            .create_plan(&names(&["all"]), &names(&["physical-pins"]))
            .unwrap();
        assert_eq!(
            plan,
            names(&[
                "well-formed",
                "resource-sequence",
                "physical-pins",
                "latency-schedule"
            ])
        );
        assert!(excl.contains("physical-pins"));
        assert!(pm.create_plan(&names(&["missing"]), &[]).is_err());
    }

    #[test]
    fn help_lists_options() {
        let pm = PassManager::default_passes().unwrap();
        let help = pm.specific_help("latency-schedule").unwrap();
        assert!(help.contains("max-iterations"));
        assert!(help.contains("(default: 1000)"));
        let alias = pm.specific_help("validate").unwrap();
        assert!(alias.starts_with("`validate' is an alias"));
        let all = pm.complete_help();
        assert!(all.contains("Passes:\n- latency-schedule"));
        assert!(all.contains("- validate: well-formed"));
        assert!(pm.specific_help("nope").is_none());
    }
}
