//! Waste bin system: removes every model that keeps touching a bin model.
//!
//! The bin model must carry contact sensors on at least one of its
//! collisions. Once contact has lasted longer than the configured delay,
//! every model that touched the bin at any point since contact began is
//! removed, including models that already left while others stayed.
//! Losing all contact resets the timer.
//!
//! The bin does not discriminate: if it rests on the ground plane, the
//! ground plane is removed too.
//!
//! # Invariants
//! - Trigger surfaces are resolved once and never change afterwards.
//! - Removals are detected in `post_update` and requested in the next
//!   `pre_update`, never inline.
//! - The step after a removal request ignores contact data.

mod config;
mod contacts;
mod episode;
mod surfaces;
mod system;

pub use config::{WasteBinConfig, WasteBinError};
pub use contacts::collect_contacts;
pub use episode::{ContactEpisode, EpisodeTransition};
pub use surfaces::TriggerSurfaces;
pub use system::{WasteBin, WasteBinState};

use wastebin_kernel::{RegistryError, System, SystemRegistry};

/// Canonical registry name.
pub const SYSTEM_NAME: &str = "wastebin::systems::WasteBin";

/// Additional names the system answers to.
pub const SYSTEM_ALIASES: &[&str] = &["WasteBin"];

fn create() -> Box<dyn System> {
    Box::new(WasteBin::new())
}

/// Register the waste bin and its aliases.
pub fn register(registry: &mut SystemRegistry) -> Result<(), RegistryError> {
    registry.register(SYSTEM_NAME, create)?;
    for alias in SYSTEM_ALIASES {
        registry.add_alias(alias, SYSTEM_NAME)?;
    }
    Ok(())
}
