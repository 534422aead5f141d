use wastebin_common::EntityId;
use wastebin_ecs::ComponentKind;
use wastebin_kernel::World;

/// Collisions of the bin model that carry contact sensor data.
///
/// Kept sorted and deduplicated so membership tests are a binary search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSurfaces(Vec<EntityId>);

impl TriggerSurfaces {
    /// Scan the links of `model` for collisions with contact sensor data.
    ///
    /// Sensor data only exists once the contact pass has run, so this must
    /// not be called from `configure`.
    pub fn resolve(model: EntityId, world: &World) -> Self {
        let mut surfaces: Vec<EntityId> = world
            .children_by_component(model, ComponentKind::Link)
            .into_iter()
            .flat_map(|link| world.children_by_component(link, ComponentKind::Collision))
            .filter(|collision| world.has_component(*collision, ComponentKind::ContactSensorData))
            .collect();
        surfaces.sort();
        surfaces.dedup();
        Self(surfaces)
    }

    pub fn contains(&self, collision: EntityId) -> bool {
        self.0.binary_search(&collision).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_only_instrumented_collisions() {
        let mut world = World::new();
        let bin = world.spawn_model("bin", None);
        let body = world.spawn_link(bin, "body");
        let lid = world.spawn_link(bin, "lid");
        let bottom = world.spawn_collision(body, "bottom");
        let wall = world.spawn_collision(body, "wall");
        let top = world.spawn_collision(lid, "top");
        world.attach_contact_sensor(bottom, "s1");
        world.attach_contact_sensor(top, "s2");
        world.update_contacts();

        let surfaces = TriggerSurfaces::resolve(bin, &world);
        assert_eq!(surfaces.len(), 2);
        assert!(surfaces.contains(bottom));
        assert!(surfaces.contains(top));
        assert!(!surfaces.contains(wall));
        let listed: Vec<EntityId> = surfaces.iter().collect();
        let mut sorted = listed.clone();
        sorted.sort();
        assert_eq!(listed, sorted);
    }

    #[test]
    fn empty_before_contact_pass() {
        let mut world = World::new();
        let bin = world.spawn_model("bin", None);
        let body = world.spawn_link(bin, "body");
        let bottom = world.spawn_collision(body, "bottom");
        world.attach_contact_sensor(bottom, "s1");

        assert!(TriggerSurfaces::resolve(bin, &world).is_empty());
    }

    #[test]
    fn ignores_other_models() {
        let mut world = World::new();
        let bin = world.spawn_model("bin", None);
        world.spawn_link(bin, "body");
        let other = world.spawn_model("box", None);
        let link = world.spawn_link(other, "link");
        let col = world.spawn_collision(link, "col");
        world.attach_contact_sensor(col, "s");
        world.update_contacts();

        assert!(TriggerSurfaces::resolve(bin, &world).is_empty());
    }
}
