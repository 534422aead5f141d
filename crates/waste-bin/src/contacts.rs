use std::collections::BTreeSet;
use wastebin_common::EntityId;
use wastebin_kernel::World;

use crate::surfaces::TriggerSurfaces;

/// Scan every trigger surface's contacts for this step and add the top
/// level model of each foreign collision to `touched`.
///
/// Returns true if at least one trigger surface reported a contact.
/// Foreign collisions that no longer resolve to a model are dropped.
pub fn collect_contacts(
    surfaces: &TriggerSurfaces,
    world: &World,
    touched: &mut BTreeSet<EntityId>,
) -> bool {
    let mut touching = false;
    for surface in surfaces.iter() {
        let Some(data) = world.contact_data(surface) else {
            continue;
        };
        if data.contacts.is_empty() {
            continue;
        }
        touching = true;
        for contact in &data.contacts {
            // Two trigger surfaces never report against each other, so
            // whichever side is not a trigger is the foreign one.
            let foreign = if surfaces.contains(contact.collision1) {
                contact.collision2
            } else {
                contact.collision1
            };
            match world.top_level_model(foreign) {
                Some(model) => {
                    touched.insert(model);
                }
                None => {
                    tracing::trace!(collision = %foreign.short(), "dropping unresolvable contact");
                }
            }
        }
    }
    touching
}
