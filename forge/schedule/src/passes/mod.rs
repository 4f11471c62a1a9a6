//! Passes over a [Context](crate::Context).
mod physical_pins;
mod resource_sequencer;
mod scheduler;
mod well_formed;

pub use physical_pins::PhysicalPins;
pub use resource_sequencer::ResourceSequencer;
pub use scheduler::Scheduler;
pub use well_formed::WellFormed;
