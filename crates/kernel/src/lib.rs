//! World Kernel: authoritative world state, the contact pass, deferred
//! entity removal and system stepping.
//!
//! # Invariants
//! - Entity removal only happens in `World::process_removals`, never while a
//!   system callback is running.
//! - Every structural mutation of the world is recorded in the event log.

pub mod simulation;
pub mod system;
pub mod world;

pub use simulation::Simulation;
pub use system::{ConfigError, RegistryError, System, SystemConfig, SystemFactory, SystemRegistry};
pub use world::{World, WorldEvent};
