//! Textual dumps of a [Design] for diagnostics. Printing never mutates the
//! design.
use crate::{
    Design,
    common::{ComponentIdx, EntryIdx},
    structure::Tag,
};
use itertools::Itertools;
use std::io;

/// Printer for the dependency graph.
pub struct Printer;

impl Printer {
    /// Formats the ports of a component as `name: width`, with `!` marking
    /// unused ports and `~` sideband ports.
    fn format_ports(design: &Design, comp: ComponentIdx) -> String {
        design.components[comp]
            .ports()
            .map(|p| {
                let port = &design.ports[p];
                format!(
                    "{}{}{}: {}",
                    if port.used { "" } else { "!" },
                    if port.tag == Tag::Sideband { "~" } else { "" },
                    port.name,
                    port.width
                )
            })
            .join(", ")
    }

    /// Prints every top-level component and its children.
    pub fn write_design<F: io::Write>(
        design: &Design,
        f: &mut F,
    ) -> io::Result<()> {
        for (idx, comp) in design.components.iter() {
            if comp.parent.is_none() {
                Self::write_component(design, idx, 0, f)?;
            }
        }
        Ok(())
    }

    /// Prints a component, its exits and entries, then its children
    /// indented one level.
    pub fn write_component<F: io::Write>(
        design: &Design,
        idx: ComponentIdx,
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let comp = &design.components[idx];
        write!(f, "{}", " ".repeat(indent_level))?;
        writeln!(
            f,
            "{} {:?}({})",
            comp.name,
            comp.kind,
            Self::format_ports(design, idx)
        )?;
        for exit in &comp.exits {
            let e = &design.exits[*exit];
            writeln!(
                f,
                "{}  exit {:?} {} -> ({})",
                " ".repeat(indent_level),
                e.kind,
                e.latency,
                e.buses()
                    .map(|b| {
                        let bus = &design.buses[b];
                        format!("{}: {}", bus.name, bus.width)
                    })
                    .join(", ")
            )?;
        }
        for entry in &comp.entries {
            Self::write_entry_indented(design, *entry, indent_level + 2, f)?;
        }
        for child in &comp.children {
            Self::write_component(design, *child, indent_level + 2, f)?;
        }
        Ok(())
    }

    /// Prints one entry with its dependencies grouped by port.
    pub fn write_entry<F: io::Write>(
        design: &Design,
        entry: EntryIdx,
        f: &mut F,
    ) -> io::Result<()> {
        Self::write_entry_indented(design, entry, 0, f)
    }

    fn write_entry_indented<F: io::Write>(
        design: &Design,
        entry: EntryIdx,
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let e = &design.entries[entry];
        let driver = match e.driving_exit {
            Some(exit) => {
                design.components[design.exits[exit].owner].name.to_string()
            }
            None => "-".to_string(),
        };
        writeln!(
            f,
            "{}entry of {} driven by {driver}",
            " ".repeat(indent_level),
            design.components[e.owner].name
        )?;
        for port in e.ports() {
            let deps = e
                .dependencies(port)
                .iter()
                .map(|d| {
                    let dep = &design.dependencies[*d];
                    format!("{} {}", dep.kind, design.bus_name(dep.source))
                })
                .join(", ");
            writeln!(
                f,
                "{}  {} <= {deps}",
                " ".repeat(indent_level),
                design.ports[port].name
            )?;
        }
        Ok(())
    }
}
