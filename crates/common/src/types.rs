use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an entity in the world.
///
/// Ordered so that sorted id lists support binary search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timing information handed to every system callback for one simulation step.
///
/// All times are in seconds. `dt` is signed: a negative value means the
/// simulation clock jumped backward since the previous step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateInfo {
    /// Number of unpaused steps taken so far.
    pub iteration: u64,
    /// Simulation time at the end of this step.
    pub sim_time: f64,
    /// Step duration. Zero while paused.
    pub dt: f64,
    pub paused: bool,
}

impl UpdateInfo {
    /// True when the clock moved backward during this step.
    pub fn is_time_jump_back(&self) -> bool {
        self.dt < 0.0
    }
}
