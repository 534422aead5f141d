use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use wastebin_common::{EntityId, UpdateInfo};
use wastebin_ecs::{ComponentKind, ComponentStore, Contact, ContactSensor, ContactSensorData, EntityKind};

/// An event record produced by every structural mutation to the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// Entity was spawned under the given parent.
    Spawned {
        id: EntityId,
        name: String,
        kind: EntityKind,
        parent: Option<EntityId>,
    },
    /// Entity was removed together with `descendants` child entities.
    Removed {
        id: EntityId,
        name: String,
        descendants: usize,
        iteration: u64,
        sim_time: f64,
    },
    /// Simulation advanced one unpaused step.
    Stepped { iteration: u64, sim_time: f64 },
}

/// The authoritative world state, acting as host for systems.
///
/// Entities form trees of models, links and collisions. Contacts are
/// driven externally through `begin_contact`/`end_contact` and copied into
/// the `ContactSensorData` of instrumented collisions by the contact pass.
/// Removal is deferred: `request_remove` only queues, and the queue is
/// drained by `process_removals` once all systems have run for the step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    entities: BTreeSet<EntityId>,
    components: ComponentStore,
    /// Active contacts keyed by the unordered collision pair.
    contacts: BTreeMap<(EntityId, EntityId), Contact>,
    removal_requests: BTreeSet<EntityId>,
    iteration: u64,
    sim_time: f64,
    /// Append-only event log of all mutations.
    #[serde(skip)]
    event_log: Vec<WorldEvent>,
}

impl World {
    /// Create an empty world at iteration 0, time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unpaused steps recorded so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Simulation time of the last recorded step, in seconds.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Number of entities in the world.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.contains(&id)
    }

    /// Read-only access to the component store.
    pub fn components(&self) -> &ComponentStore {
        &self.components
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    // --- Spawning ---

    /// Spawn an entity of the given kind. Returns its id.
    pub fn spawn(&mut self, kind: EntityKind, name: &str, parent: Option<EntityId>) -> EntityId {
        let id = EntityId::new();
        self.entities.insert(id);
        self.components.set_kind(id, kind);
        self.components.set_name(id, name.to_string());
        if let Some(parent) = parent {
            self.components.set_parent(id, parent);
        }
        self.event_log.push(WorldEvent::Spawned {
            id,
            name: name.to_string(),
            kind,
            parent,
        });
        id
    }

    /// Spawn a model, optionally nested inside another model.
    pub fn spawn_model(&mut self, name: &str, parent: Option<EntityId>) -> EntityId {
        self.spawn(EntityKind::Model, name, parent)
    }

    pub fn spawn_link(&mut self, model: EntityId, name: &str) -> EntityId {
        self.spawn(EntityKind::Link, name, Some(model))
    }

    pub fn spawn_collision(&mut self, link: EntityId, name: &str) -> EntityId {
        self.spawn(EntityKind::Collision, name, Some(link))
    }

    /// Instrument a collision with a contact sensor.
    ///
    /// The collision's `ContactSensorData` appears on the next contact pass.
    /// Returns false if `collision` is not a collision entity.
    pub fn attach_contact_sensor(&mut self, collision: EntityId, sensor: &str) -> bool {
        if !self.has_component(collision, ComponentKind::Collision) {
            return false;
        }
        self.components.set_contact_sensor(
            collision,
            ContactSensor {
                sensor: sensor.to_string(),
            },
        );
        true
    }

    // --- Structural queries ---

    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.components.get_name(id).map(|n| n.0.as_str())
    }

    pub fn kind(&self, id: EntityId) -> Option<EntityKind> {
        self.components.get_kind(id)
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.components.get_parent(id)
    }

    /// Whether `id` carries a component of the given kind.
    pub fn has_component(&self, id: EntityId, kind: ComponentKind) -> bool {
        self.exists(id) && self.components.has(id, kind)
    }

    /// Direct children of `parent` that carry a component of the given kind.
    pub fn children_by_component(&self, parent: EntityId, kind: ComponentKind) -> Vec<EntityId> {
        if !self.exists(parent) {
            return Vec::new();
        }
        self.components.children_by_component(parent, kind)
    }

    /// Contacts reported for an instrumented collision during the last step.
    pub fn contact_data(&self, collision: EntityId) -> Option<&ContactSensorData> {
        if !self.exists(collision) {
            return None;
        }
        self.components.get_contact_data(collision)
    }

    /// The outermost model that `id` belongs to, possibly `id` itself.
    ///
    /// Returns `None` if the entity no longer exists or has no model ancestor.
    pub fn top_level_model(&self, id: EntityId) -> Option<EntityId> {
        if !self.exists(id) {
            return None;
        }
        let mut top = None;
        let mut current = id;
        loop {
            if self.kind(current) == Some(EntityKind::Model) {
                top = Some(current);
            }
            match self.parent(current) {
                Some(parent) if self.exists(parent) => current = parent,
                _ => break,
            }
        }
        top
    }

    /// Look up an entity by its `/`-separated path from a root entity,
    /// e.g. `bin/body/bottom`.
    pub fn entity_by_scoped_name(&self, scoped: &str) -> Option<EntityId> {
        let mut segments = scoped.split('/');
        let root_name = segments.next()?;
        let mut current = self.entities.iter().copied().find(|id| {
            self.parent(*id).is_none() && self.name(*id) == Some(root_name)
        })?;
        for segment in segments {
            current = self
                .components
                .children(current)
                .into_iter()
                .find(|child| self.name(*child) == Some(segment))?;
        }
        Some(current)
    }

    /// The `/`-separated path of an entity, for log lines and reports.
    pub fn scoped_name(&self, id: EntityId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(entity) = current {
            if !self.exists(entity) {
                break;
            }
            parts.push(self.name(entity).unwrap_or("?"));
            current = self.parent(entity);
        }
        parts.reverse();
        parts.join("/")
    }

    // --- Contacts ---

    /// Start a persistent contact between two collisions. It is reported on
    /// every contact pass until ended or until either side is removed.
    pub fn begin_contact(&mut self, collision1: EntityId, collision2: EntityId) {
        self.contacts.insert(
            pair_key(collision1, collision2),
            Contact {
                collision1,
                collision2,
            },
        );
    }

    /// End a contact. Returns false if the pair was not in contact.
    pub fn end_contact(&mut self, collision1: EntityId, collision2: EntityId) -> bool {
        self.contacts
            .remove(&pair_key(collision1, collision2))
            .is_some()
    }

    /// Number of active contact pairs.
    pub fn active_contacts(&self) -> usize {
        self.contacts.len()
    }

    /// Refresh the `ContactSensorData` of every instrumented collision from
    /// the active contact pairs, creating the component on first use.
    pub fn update_contacts(&mut self) {
        let sensors: Vec<EntityId> = self.components.contact_sensors().keys().copied().collect();
        for collision in sensors {
            let touching: Vec<Contact> = self
                .contacts
                .values()
                .filter(|c| c.other(collision).is_some())
                .copied()
                .collect();
            self.components.set_contact_data(collision, touching);
        }
    }

    // --- Removal ---

    /// Queue an entity and its descendants for removal after this step.
    pub fn request_remove(&mut self, id: EntityId) {
        self.removal_requests.insert(id);
    }

    /// Entities queued for removal.
    pub fn removal_requests(&self) -> &BTreeSet<EntityId> {
        &self.removal_requests
    }

    /// Remove every queued entity together with its descendants and any
    /// contacts involving them. Returns the ids whose removal was requested
    /// and that still existed.
    pub fn process_removals(&mut self) -> Vec<EntityId> {
        let requests = std::mem::take(&mut self.removal_requests);
        let mut removed_roots = Vec::new();
        for id in requests {
            if !self.exists(id) {
                tracing::debug!(entity = %id.short(), "removal requested for missing entity");
                continue;
            }
            let name = self.name(id).unwrap_or_default().to_string();
            let doomed = self.subtree(id);
            for entity in &doomed {
                self.entities.remove(entity);
                self.components.remove_entity(*entity);
            }
            self.contacts
                .retain(|(a, b), _| !doomed.contains(a) && !doomed.contains(b));
            tracing::debug!(%name, entities = doomed.len(), "entity removed");
            self.event_log.push(WorldEvent::Removed {
                id,
                name,
                descendants: doomed.len() - 1,
                iteration: self.iteration,
                sim_time: self.sim_time,
            });
            removed_roots.push(id);
        }
        removed_roots
    }

    /// Record an unpaused step and advance the world clock.
    pub fn record_step(&mut self, info: &UpdateInfo) {
        self.iteration = info.iteration;
        self.sim_time = info.sim_time;
        self.event_log.push(WorldEvent::Stepped {
            iteration: info.iteration,
            sim_time: info.sim_time,
        });
    }

    /// `root` and all of its descendants.
    fn subtree(&self, root: EntityId) -> BTreeSet<EntityId> {
        let mut out = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(entity) = stack.pop() {
            if out.insert(entity) {
                stack.extend(self.components.children(entity));
            }
        }
        out
    }
}

fn pair_key(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b { (a, b) } else { (b, a) }
}
