use wastebin_common::{EntityId, UpdateInfo};

use crate::system::{System, SystemConfig};
use crate::world::World;

/// Default step size in seconds.
pub const DEFAULT_STEP_SIZE: f64 = 0.001;

struct AttachedSystem {
    entity: EntityId,
    system: Box<dyn System>,
}

/// Owns the world and the systems attached to it, and runs the step loop.
///
/// One step is: every system's `pre_update`, the contact pass,
/// every system's `post_update`, then the queued removals. Removals queued
/// during a step are therefore visible only from the following step on,
/// and the contact pass of the step that queued them still sees the doomed
/// entities.
pub struct Simulation {
    world: World,
    systems: Vec<AttachedSystem>,
    step_size: f64,
    paused: bool,
}

impl Simulation {
    pub fn new(world: World) -> Self {
        Self::with_step_size(world, DEFAULT_STEP_SIZE)
    }

    pub fn with_step_size(world: World, step_size: f64) -> Self {
        Self {
            world,
            systems: Vec::new(),
            step_size,
            paused: false,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access between steps, e.g. to drive contacts.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Number of attached systems.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Configure `system` against `entity` and attach it.
    pub fn add_system(&mut self, entity: EntityId, mut system: Box<dyn System>, config: &SystemConfig) {
        system.configure(entity, config, &mut self.world);
        self.systems.push(AttachedSystem { entity, system });
    }

    /// Entities that systems are attached to, in attachment order.
    pub fn system_entities(&self) -> Vec<EntityId> {
        self.systems.iter().map(|s| s.entity).collect()
    }

    /// Advance by the configured step size.
    pub fn step(&mut self) -> UpdateInfo {
        self.step_by(self.step_size)
    }

    /// Advance by `dt` seconds. A negative `dt` moves the clock backward.
    /// While paused, time does not advance and systems see `paused = true`.
    pub fn step_by(&mut self, dt: f64) -> UpdateInfo {
        let info = if self.paused {
            UpdateInfo {
                iteration: self.world.iteration(),
                sim_time: self.world.sim_time(),
                dt: 0.0,
                paused: true,
            }
        } else {
            UpdateInfo {
                iteration: self.world.iteration() + 1,
                sim_time: self.world.sim_time() + dt,
                dt,
                paused: false,
            }
        };
        let _span = tracing::info_span!("simulation_step", iteration = info.iteration).entered();

        for attached in &mut self.systems {
            attached.system.pre_update(&info, &mut self.world);
        }

        if !info.paused {
            self.world.record_step(&info);
            self.world.update_contacts();
        }

        for attached in &mut self.systems {
            attached.system.post_update(&info, &self.world);
        }

        self.world.process_removals();
        info
    }

    /// Run `steps` steps of the configured size.
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }
}
