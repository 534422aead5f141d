//! Minimal deterministic ECS-style component model.
//!
//! Components are stored in BTreeMap for deterministic iteration order.
//! Each component type has its own storage keyed by EntityId, and a
//! [`ComponentKind`] tag lets callers query storages without naming them.
//!
//! # Invariants
//! - Structural mutations (add/remove) produce events.
//! - Contact data refreshes are transient and produce no events.
//! - Iteration order is deterministic (BTreeMap).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wastebin_common::EntityId;

/// Human-readable name component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name(pub String);

/// Structural role of an entity in a model tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Model,
    Link,
    Collision,
}

/// Parent of an entity in the model tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentEntity(pub EntityId);

/// Marks a collision as instrumented by a contact sensor.
///
/// The matching [`ContactSensorData`] only appears once the contact pass
/// has run for the collision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSensor {
    pub sensor: String,
}

/// A single contact between two collision entities, in either order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub collision1: EntityId,
    pub collision2: EntityId,
}

impl Contact {
    /// The side of the contact that is not `own`, if `own` is part of it.
    pub fn other(&self, own: EntityId) -> Option<EntityId> {
        if self.collision1 == own {
            Some(self.collision2)
        } else if self.collision2 == own {
            Some(self.collision1)
        } else {
            None
        }
    }
}

/// Contacts reported for an instrumented collision during the last step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSensorData {
    pub contacts: Vec<Contact>,
}

/// Tag naming a component storage, used for typed queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Name,
    Model,
    Link,
    Collision,
    ParentEntity,
    ContactSensor,
    ContactSensorData,
}

impl ComponentKind {
    /// The component kind that marks entities of the given structural kind.
    pub fn of_entity_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Model => Self::Model,
            EntityKind::Link => Self::Link,
            EntityKind::Collision => Self::Collision,
        }
    }
}

/// Events produced by component mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentEvent {
    NameAdded { entity: EntityId, name: String },
    NameRemoved { entity: EntityId, name: String },
    KindAdded { entity: EntityId, kind: EntityKind },
    KindRemoved { entity: EntityId, kind: EntityKind },
    ParentSet { entity: EntityId, parent: EntityId },
    ParentRemoved { entity: EntityId, parent: EntityId },
    ContactSensorAdded { entity: EntityId, sensor: String },
    ContactSensorRemoved { entity: EntityId, sensor: String },
    ContactDataCreated { entity: EntityId },
    ContactDataRemoved { entity: EntityId },
}

/// Deterministic component storage for all component types.
///
/// Uses BTreeMap for canonical iteration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentStore {
    names: BTreeMap<EntityId, Name>,
    kinds: BTreeMap<EntityId, EntityKind>,
    parents: BTreeMap<EntityId, ParentEntity>,
    contact_sensors: BTreeMap<EntityId, ContactSensor>,
    contact_data: BTreeMap<EntityId, ContactSensorData>,
    #[serde(skip)]
    events: Vec<ComponentEvent>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return all pending component events.
    pub fn drain_events(&mut self) -> Vec<ComponentEvent> {
        std::mem::take(&mut self.events)
    }

    /// Read-only access to pending events.
    pub fn events(&self) -> &[ComponentEvent] {
        &self.events
    }

    // --- Name ---
    pub fn set_name(&mut self, entity: EntityId, name: String) {
        if let Some(old) = self.names.remove(&entity) {
            self.events.push(ComponentEvent::NameRemoved {
                entity,
                name: old.0,
            });
        }
        self.events.push(ComponentEvent::NameAdded {
            entity,
            name: name.clone(),
        });
        self.names.insert(entity, Name(name));
    }

    pub fn remove_name(&mut self, entity: EntityId) -> Option<Name> {
        let removed = self.names.remove(&entity);
        if let Some(ref n) = removed {
            self.events.push(ComponentEvent::NameRemoved {
                entity,
                name: n.0.clone(),
            });
        }
        removed
    }

    pub fn get_name(&self, entity: EntityId) -> Option<&Name> {
        self.names.get(&entity)
    }

    // --- EntityKind ---
    pub fn set_kind(&mut self, entity: EntityId, kind: EntityKind) {
        if let Some(old) = self.kinds.insert(entity, kind) {
            self.events
                .push(ComponentEvent::KindRemoved { entity, kind: old });
        }
        self.events.push(ComponentEvent::KindAdded { entity, kind });
    }

    pub fn remove_kind(&mut self, entity: EntityId) -> Option<EntityKind> {
        let removed = self.kinds.remove(&entity);
        if let Some(kind) = removed {
            self.events.push(ComponentEvent::KindRemoved { entity, kind });
        }
        removed
    }

    pub fn get_kind(&self, entity: EntityId) -> Option<EntityKind> {
        self.kinds.get(&entity).copied()
    }

    // --- ParentEntity ---
    pub fn set_parent(&mut self, entity: EntityId, parent: EntityId) {
        self.parents.insert(entity, ParentEntity(parent));
        self.events.push(ComponentEvent::ParentSet { entity, parent });
    }

    pub fn remove_parent(&mut self, entity: EntityId) -> Option<ParentEntity> {
        let removed = self.parents.remove(&entity);
        if let Some(ParentEntity(parent)) = removed {
            self.events
                .push(ComponentEvent::ParentRemoved { entity, parent });
        }
        removed
    }

    pub fn get_parent(&self, entity: EntityId) -> Option<EntityId> {
        self.parents.get(&entity).map(|p| p.0)
    }

    /// Direct children of `parent`, in id order.
    pub fn children(&self, parent: EntityId) -> Vec<EntityId> {
        self.parents
            .iter()
            .filter(|(_, p)| p.0 == parent)
            .map(|(child, _)| *child)
            .collect()
    }

    // --- ContactSensor ---
    pub fn set_contact_sensor(&mut self, entity: EntityId, sensor: ContactSensor) {
        self.events.push(ComponentEvent::ContactSensorAdded {
            entity,
            sensor: sensor.sensor.clone(),
        });
        self.contact_sensors.insert(entity, sensor);
    }

    pub fn remove_contact_sensor(&mut self, entity: EntityId) -> Option<ContactSensor> {
        let removed = self.contact_sensors.remove(&entity);
        if let Some(ref s) = removed {
            self.events.push(ComponentEvent::ContactSensorRemoved {
                entity,
                sensor: s.sensor.clone(),
            });
        }
        removed
    }

    pub fn get_contact_sensor(&self, entity: EntityId) -> Option<&ContactSensor> {
        self.contact_sensors.get(&entity)
    }

    pub fn contact_sensors(&self) -> &BTreeMap<EntityId, ContactSensor> {
        &self.contact_sensors
    }

    // --- ContactSensorData ---

    /// Replace the contacts reported for `entity`, creating the component on
    /// first use. Only creation is recorded as an event.
    pub fn set_contact_data(&mut self, entity: EntityId, contacts: Vec<Contact>) {
        match self.contact_data.get_mut(&entity) {
            Some(data) => data.contacts = contacts,
            None => {
                tracing::debug!(entity = %entity.short(), "contact sensor data created");
                self.events
                    .push(ComponentEvent::ContactDataCreated { entity });
                self.contact_data
                    .insert(entity, ContactSensorData { contacts });
            }
        }
    }

    pub fn remove_contact_data(&mut self, entity: EntityId) -> Option<ContactSensorData> {
        let removed = self.contact_data.remove(&entity);
        if removed.is_some() {
            self.events
                .push(ComponentEvent::ContactDataRemoved { entity });
        }
        removed
    }

    pub fn get_contact_data(&self, entity: EntityId) -> Option<&ContactSensorData> {
        self.contact_data.get(&entity)
    }

    // --- Queries ---

    /// Whether `entity` carries a component of the given kind.
    pub fn has(&self, entity: EntityId, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Name => self.names.contains_key(&entity),
            ComponentKind::Model => self.get_kind(entity) == Some(EntityKind::Model),
            ComponentKind::Link => self.get_kind(entity) == Some(EntityKind::Link),
            ComponentKind::Collision => self.get_kind(entity) == Some(EntityKind::Collision),
            ComponentKind::ParentEntity => self.parents.contains_key(&entity),
            ComponentKind::ContactSensor => self.contact_sensors.contains_key(&entity),
            ComponentKind::ContactSensorData => self.contact_data.contains_key(&entity),
        }
    }

    /// Direct children of `parent` that carry a component of the given kind.
    pub fn children_by_component(&self, parent: EntityId, kind: ComponentKind) -> Vec<EntityId> {
        self.children(parent)
            .into_iter()
            .filter(|child| self.has(*child, kind))
            .collect()
    }

    /// Remove all components for an entity.
    pub fn remove_entity(&mut self, entity: EntityId) {
        self.remove_name(entity);
        self.remove_kind(entity);
        self.remove_parent(entity);
        self.remove_contact_sensor(entity);
        self.remove_contact_data(entity);
    }

    /// Replay a component event (for replay of a recorded world).
    pub fn apply_event(&mut self, event: &ComponentEvent) {
        match event {
            ComponentEvent::NameAdded { entity, name } => {
                self.names.insert(*entity, Name(name.clone()));
            }
            ComponentEvent::NameRemoved { entity, .. } => {
                self.names.remove(entity);
            }
            ComponentEvent::KindAdded { entity, kind } => {
                self.kinds.insert(*entity, *kind);
            }
            ComponentEvent::KindRemoved { entity, .. } => {
                self.kinds.remove(entity);
            }
            ComponentEvent::ParentSet { entity, parent } => {
                self.parents.insert(*entity, ParentEntity(*parent));
            }
            ComponentEvent::ParentRemoved { entity, .. } => {
                self.parents.remove(entity);
            }
            ComponentEvent::ContactSensorAdded { entity, sensor } => {
                self.contact_sensors.insert(
                    *entity,
                    ContactSensor {
                        sensor: sensor.clone(),
                    },
                );
            }
            ComponentEvent::ContactSensorRemoved { entity, .. } => {
                self.contact_sensors.remove(entity);
            }
            ComponentEvent::ContactDataCreated { entity } => {
                self.contact_data.entry(*entity).or_default();
            }
            ComponentEvent::ContactDataRemoved { entity } => {
                self.contact_data.remove(entity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(store: &mut ComponentStore) -> (EntityId, EntityId, EntityId) {
        let model = EntityId::new();
        let link = EntityId::new();
        let collision = EntityId::new();
        store.set_kind(model, EntityKind::Model);
        store.set_kind(link, EntityKind::Link);
        store.set_parent(link, model);
        store.set_kind(collision, EntityKind::Collision);
        store.set_parent(collision, link);
        (model, link, collision)
    }

    #[test]
    fn name_add_remove() {
        let mut store = ComponentStore::new();
        let id = EntityId::new();
        store.set_name(id, "bin".into());
        assert_eq!(store.get_name(id).unwrap().0, "bin");

        store.remove_name(id);
        assert!(store.get_name(id).is_none());
        assert_eq!(store.events().len(), 2);
    }

    #[test]
    fn kind_queries_by_tag() {
        let mut store = ComponentStore::new();
        let (model, link, collision) = tree(&mut store);
        assert!(store.has(model, ComponentKind::Model));
        assert!(!store.has(model, ComponentKind::Link));
        assert!(store.has(link, ComponentKind::Link));
        assert!(store.has(collision, ComponentKind::Collision));
        assert!(store.has(collision, ComponentKind::ParentEntity));
        assert!(!store.has(model, ComponentKind::ParentEntity));
        assert_eq!(
            ComponentKind::of_entity_kind(EntityKind::Link),
            ComponentKind::Link
        );
    }

    #[test]
    fn children_by_component_filters_kind() {
        let mut store = ComponentStore::new();
        let (model, link, collision) = tree(&mut store);
        let nested = EntityId::new();
        store.set_kind(nested, EntityKind::Model);
        store.set_parent(nested, model);

        assert_eq!(
            store.children_by_component(model, ComponentKind::Link),
            vec![link]
        );
        assert_eq!(
            store.children_by_component(model, ComponentKind::Model),
            vec![nested]
        );
        assert_eq!(
            store.children_by_component(link, ComponentKind::Collision),
            vec![collision]
        );
        assert!(
            store
                .children_by_component(collision, ComponentKind::Collision)
                .is_empty()
        );
    }

    #[test]
    fn contact_data_created_once() {
        let mut store = ComponentStore::new();
        let (_, _, collision) = tree(&mut store);
        store.drain_events();
        assert!(!store.has(collision, ComponentKind::ContactSensorData));

        let other = EntityId::new();
        let contact = Contact {
            collision1: other,
            collision2: collision,
        };
        store.set_contact_data(collision, vec![contact]);
        store.set_contact_data(collision, Vec::new());
        store.set_contact_data(collision, vec![contact, contact]);

        assert!(store.has(collision, ComponentKind::ContactSensorData));
        assert_eq!(store.get_contact_data(collision).unwrap().contacts.len(), 2);
        assert_eq!(
            store.events(),
            &[ComponentEvent::ContactDataCreated { entity: collision }]
        );
    }

    #[test]
    fn contact_other_side() {
        let a = EntityId::new();
        let b = EntityId::new();
        let contact = Contact {
            collision1: a,
            collision2: b,
        };
        assert_eq!(contact.other(a), Some(b));
        assert_eq!(contact.other(b), Some(a));
        assert_eq!(contact.other(EntityId::new()), None);
    }

    #[test]
    fn remove_entity_clears_all() {
        let mut store = ComponentStore::new();
        let (_, _, collision) = tree(&mut store);
        store.set_name(collision, "bottom".into());
        store.set_contact_sensor(
            collision,
            ContactSensor {
                sensor: "bin_sensor".into(),
            },
        );
        store.set_contact_data(collision, Vec::new());

        store.remove_entity(collision);
        assert!(store.get_name(collision).is_none());
        assert!(store.get_kind(collision).is_none());
        assert!(store.get_parent(collision).is_none());
        assert!(store.get_contact_sensor(collision).is_none());
        assert!(store.get_contact_data(collision).is_none());
    }

    #[test]
    fn deterministic_children_order() {
        let mut store = ComponentStore::new();
        let parent = EntityId::new();
        let mut ids: Vec<EntityId> = (0..50).map(|_| EntityId::new()).collect();
        for id in &ids {
            store.set_kind(*id, EntityKind::Link);
            store.set_parent(*id, parent);
        }
        ids.sort();
        assert_eq!(store.children(parent), ids);
    }

    #[test]
    fn apply_event_replay() {
        let mut store = ComponentStore::new();
        let (model, link, collision) = tree(&mut store);
        store.set_contact_sensor(
            collision,
            ContactSensor {
                sensor: "s".into(),
            },
        );
        store.set_contact_data(collision, Vec::new());
        let events = store.drain_events();

        let mut replayed = ComponentStore::new();
        for event in &events {
            replayed.apply_event(event);
        }
        assert!(replayed.has(model, ComponentKind::Model));
        assert_eq!(replayed.get_parent(link), Some(model));
        assert!(replayed.has(collision, ComponentKind::ContactSensor));
        assert!(replayed.has(collision, ComponentKind::ContactSensorData));
    }
}
