use std::collections::BTreeMap;

use tracing::warn;

use crate::model::{MarkerSet, WorldModel};

use super::classify::{ClassifiedBatch, EntityUpdate, SetDelta};
use super::queue::PendingQueues;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub sets_created: u32,
    pub sets_updated: u32,
    pub sets_removed: u32,
    pub entity_updates: u32,
    pub tile_updates: u32,
    pub orphaned_sets: u32,
}

pub fn apply_deltas(
    model: &mut WorldModel,
    queues: &mut PendingQueues,
    batch: ClassifiedBatch,
) -> ApplyStats {
    let mut stats = ApplyStats::default();
    for (set_id, delta) in batch.sets {
        apply_set_delta(model, queues, &mut stats, set_id, delta);
    }
    for tile in batch.tiles {
        queues.push_tile(tile);
        stats.tile_updates = stats.tile_updates.saturating_add(1);
    }
    stats
}

fn apply_set_delta(
    model: &mut WorldModel,
    queues: &mut PendingQueues,
    stats: &mut ApplyStats,
    set_id: String,
    mut delta: SetDelta,
) {
    if !model.sets.contains_key(&set_id) {
        let Some(scalars) = delta.scalars.take() else {
            warn!(set_id = %set_id, "marker_set_update_for_unknown_set");
            stats.orphaned_sets = stats.orphaned_sets.saturating_add(1);
            return;
        };
        model
            .sets
            .insert(set_id.clone(), MarkerSet::from_scalars(scalars));
        queues.ensure_set(&set_id);
        stats.sets_created = stats.sets_created.saturating_add(1);
    }

    if delta.removed {
        model.sets.remove(&set_id);
        queues.remove_set(&set_id);
        stats.sets_removed = stats.sets_removed.saturating_add(1);
        return;
    }

    if let Some(scalars) = delta.scalars.take() {
        if let Some(set) = model.sets.get_mut(&set_id) {
            set.apply_scalars(scalars);
            stats.sets_updated = stats.sets_updated.saturating_add(1);
        }
    }

    let Some(set) = model.sets.get_mut(&set_id) else {
        return;
    };
    for update in delta.markers {
        apply_entity(&mut set.markers, &update);
        queues.push_marker(&set_id, update);
        stats.entity_updates = stats.entity_updates.saturating_add(1);
    }
    for update in delta.areas {
        apply_entity(&mut set.areas, &update);
        queues.push_area(&set_id, update);
        stats.entity_updates = stats.entity_updates.saturating_add(1);
    }
    for update in delta.circles {
        apply_entity(&mut set.circles, &update);
        queues.push_circle(&set_id, update);
        stats.entity_updates = stats.entity_updates.saturating_add(1);
    }
    for update in delta.lines {
        apply_entity(&mut set.lines, &update);
        queues.push_line(&set_id, update);
        stats.entity_updates = stats.entity_updates.saturating_add(1);
    }
}

fn apply_entity<T: Clone>(entities: &mut BTreeMap<String, T>, update: &EntityUpdate<T>) {
    if update.removed {
        entities.remove(&update.id);
    } else if let Some(payload) = &update.payload {
        entities.insert(update.id.clone(), payload.clone());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use serde_json::Value;

    use crate::feed::classify::classify_batch;
    use crate::feed::watermark::Watermark;
    use crate::model::EntityKind;

    use super::*;

    fn apply(records: &[Value], model: &mut WorldModel, queues: &mut PendingQueues) -> ApplyStats {
        let batch = classify_batch(records, Watermark::unset());
        apply_deltas(model, queues, batch)
    }

    fn set_created(id: &str, label: &str) -> Value {
        json!({
            "type": "component", "id": id, "msg": "setupdated",
            "ctype": "markers", "timestamp": 100, "label": label
        })
    }

    fn marker_created(id: &str, set: &str) -> Value {
        json!({
            "type": "component", "id": id, "set": set, "msg": "markercreated",
            "ctype": "markers", "timestamp": 100, "x": 1.0, "y": 2.0, "z": 3.0
        })
    }

    #[test]
    fn set_payload_creates_set_with_empty_maps() {
        let mut model = WorldModel::default();
        let mut queues = PendingQueues::default();
        let stats = apply(&[set_created("s1", "Towns")], &mut model, &mut queues);

        assert_eq!(stats.sets_created, 1);
        let set = model.set("s1").expect("set exists");
        assert_eq!(set.label, "Towns");
        assert_eq!(set.entity_count(), 0);
        assert!(queues.has_set("s1"));
    }

    #[test]
    fn entity_delta_for_unknown_set_is_skipped() {
        let mut model = WorldModel::default();
        let mut queues = PendingQueues::default();
        let stats = apply(&[marker_created("m1", "s1")], &mut model, &mut queues);

        assert_eq!(stats.orphaned_sets, 1);
        assert_eq!(stats.entity_updates, 0);
        assert!(model.set("s1").is_none());
        assert!(!queues.has_set("s1"));
    }

    #[test]
    fn payloadless_set_update_for_unknown_set_never_creates_it() {
        let mut model = WorldModel::default();
        let mut queues = PendingQueues::default();
        let stats = apply(
            &[json!({
                "type": "component", "id": "s1", "msg": "setupdated",
                "ctype": "markers", "timestamp": 100
            })],
            &mut model,
            &mut queues,
        );
        assert_eq!(stats.orphaned_sets, 1);
        assert_eq!(stats.sets_created, 0);
        assert!(model.set("s1").is_none());
        assert!(!queues.has_set("s1"));
    }

    #[test]
    fn set_level_update_without_payload_never_creates_the_set() {
        let mut model = WorldModel::default();
        let mut queues = PendingQueues::default();
        let batch = classify_batch(
            &[json!({
                "type": "component", "id": "s1", "msg": "setdeleted",
                "ctype": "markers", "timestamp": 100
            })],
            Watermark::unset(),
        );
        let stats = apply_deltas(&mut model, &mut queues, batch);

        assert_eq!(stats.orphaned_sets, 1);
        assert_eq!(stats.sets_removed, 0);
        assert!(model.set("s1").is_none());
    }

    #[test]
    fn marker_upsert_updates_model_and_queue_in_one_pass() {
        let mut model = WorldModel::default();
        let mut queues = PendingQueues::default();
        apply(&[set_created("s1", "Towns")], &mut model, &mut queues);
        let stats = apply(&[marker_created("m1", "s1")], &mut model, &mut queues);

        assert_eq!(stats.entity_updates, 1);
        let set = model.set("s1").expect("set exists");
        let marker = set.markers.get("m1").expect("marker inserted");
        assert_eq!((marker.x, marker.y, marker.z), (1.0, 2.0, 3.0));

        let pending = queues.pop_markers("s1", 10);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "m1");
        assert!(!pending[0].removed);
    }

    #[test]
    fn queue_drain_never_touches_the_model() {
        let mut model = WorldModel::default();
        let mut queues = PendingQueues::default();
        apply(
            &[set_created("s1", "Towns"), marker_created("m1", "s1")],
            &mut model,
            &mut queues,
        );
        queues.pop_markers("s1", 10);

        let set = model.set("s1").expect("set exists");
        assert!(set.markers.contains_key("m1"));
    }

    #[test]
    fn removal_deletes_entity_and_frees_id_for_reuse() {
        let mut model = WorldModel::default();
        let mut queues = PendingQueues::default();
        apply(
            &[set_created("s1", "Towns"), marker_created("m1", "s1")],
            &mut model,
            &mut queues,
        );
        apply(
            &[json!({
                "type": "component", "id": "m1", "set": "s1", "msg": "markerdeleted",
                "ctype": "markers", "timestamp": 100
            })],
            &mut model,
            &mut queues,
        );
        assert!(model.set("s1").expect("set").markers.is_empty());

        apply(&[marker_created("m1", "s1")], &mut model, &mut queues);
        assert!(model.set("s1").expect("set").markers.contains_key("m1"));
    }

    #[test]
    fn set_deletion_discards_entities_and_queues_atomically() {
        let mut model = WorldModel::default();
        let mut queues = PendingQueues::default();
        apply(
            &[set_created("s1", "Towns"), marker_created("m1", "s1")],
            &mut model,
            &mut queues,
        );
        assert_eq!(queues.pending("s1", EntityKind::Marker), 1);

        let stats = apply(
            &[json!({
                "type": "component", "id": "s1", "msg": "setdeleted",
                "ctype": "markers", "timestamp": 100
            })],
            &mut model,
            &mut queues,
        );
        assert_eq!(stats.sets_removed, 1);
        assert!(model.set("s1").is_none());
        assert!(!queues.has_set("s1"));
        assert_eq!(queues.total_pending(), 0);
    }

    #[test]
    fn scalar_update_overwrites_fields_but_keeps_entities() {
        let mut model = WorldModel::default();
        let mut queues = PendingQueues::default();
        apply(
            &[set_created("s1", "Towns"), marker_created("m1", "s1")],
            &mut model,
            &mut queues,
        );
        let stats = apply(
            &[json!({
                "type": "component", "id": "s1", "msg": "setupdated",
                "ctype": "markers", "timestamp": 100, "label": "Cities",
                "priority": 5, "hide": true
            })],
            &mut model,
            &mut queues,
        );

        assert_eq!(stats.sets_updated, 1);
        let set = model.set("s1").expect("set exists");
        assert_eq!(set.label, "Cities");
        assert_eq!(set.priority, 5);
        assert!(set.hidden);
        assert!(set.markers.contains_key("m1"));
    }

    #[test]
    fn tile_updates_land_in_the_global_queue() {
        let mut model = WorldModel::default();
        let mut queues = PendingQueues::default();
        let stats = apply(
            &[json!({ "type": "tile", "name": "world/t_0_0.png", "timestamp": 100 })],
            &mut model,
            &mut queues,
        );
        assert_eq!(stats.tile_updates, 1);
        assert_eq!(queues.pending_tiles(), 1);
    }

    #[test]
    fn mixed_batch_preserves_per_category_arrival_order() {
        let mut model = WorldModel::default();
        let mut queues = PendingQueues::default();
        apply(&[set_created("s1", "Towns")], &mut model, &mut queues);
        apply(
            &[
                marker_created("m1", "s1"),
                marker_created("m2", "s1"),
                json!({
                    "type": "component", "id": "m1", "set": "s1", "msg": "markerdeleted",
                    "ctype": "markers", "timestamp": 100
                }),
            ],
            &mut model,
            &mut queues,
        );

        let set = model.set("s1").expect("set exists");
        assert!(!set.markers.contains_key("m1"));
        assert!(set.markers.contains_key("m2"));

        let pending = queues.pop_markers("s1", 10);
        let order = pending
            .iter()
            .map(|update| (update.id.as_str(), update.removed))
            .collect::<Vec<_>>();
        assert_eq!(order, vec![("m1", false), ("m2", false), ("m1", true)]);
    }
}
