//! Shared types used by every crate in the workspace.

pub mod types;

pub use types::{EntityId, UpdateInfo};
