use std::collections::{BTreeMap, VecDeque};

use crate::model::{Area, Circle, EntityKind, Line, Marker};

use super::classify::{EntityUpdate, TileUpdate};

#[derive(Debug, Default)]
struct SetQueues {
    markers: VecDeque<EntityUpdate<Marker>>,
    areas: VecDeque<EntityUpdate<Area>>,
    circles: VecDeque<EntityUpdate<Circle>>,
    lines: VecDeque<EntityUpdate<Line>>,
}

impl SetQueues {
    fn pending(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Marker => self.markers.len(),
            EntityKind::Area => self.areas.len(),
            EntityKind::Circle => self.circles.len(),
            EntityKind::Line => self.lines.len(),
        }
    }

    fn total_pending(&self) -> usize {
        EntityKind::ALL.iter().map(|kind| self.pending(*kind)).sum()
    }
}

#[derive(Debug, Default)]
pub struct PendingQueues {
    sets: BTreeMap<String, SetQueues>,
    tiles: VecDeque<TileUpdate>,
}

impl PendingQueues {
    pub(crate) fn ensure_set(&mut self, set_id: &str) {
        if !self.sets.contains_key(set_id) {
            self.sets.insert(set_id.to_string(), SetQueues::default());
        }
    }

    pub(crate) fn remove_set(&mut self, set_id: &str) {
        self.sets.remove(set_id);
    }

    pub(crate) fn push_marker(&mut self, set_id: &str, update: EntityUpdate<Marker>) {
        self.set_queues(set_id).markers.push_back(update);
    }

    pub(crate) fn push_area(&mut self, set_id: &str, update: EntityUpdate<Area>) {
        self.set_queues(set_id).areas.push_back(update);
    }

    pub(crate) fn push_circle(&mut self, set_id: &str, update: EntityUpdate<Circle>) {
        self.set_queues(set_id).circles.push_back(update);
    }

    pub(crate) fn push_line(&mut self, set_id: &str, update: EntityUpdate<Line>) {
        self.set_queues(set_id).lines.push_back(update);
    }

    pub(crate) fn push_tile(&mut self, update: TileUpdate) {
        self.tiles.push_back(update);
    }

    fn set_queues(&mut self, set_id: &str) -> &mut SetQueues {
        self.sets.entry(set_id.to_string()).or_default()
    }

    pub fn pop_markers(&mut self, set_id: &str, max: usize) -> Vec<EntityUpdate<Marker>> {
        match self.sets.get_mut(set_id) {
            Some(queues) => drain_front(&mut queues.markers, max),
            None => Vec::new(),
        }
    }

    pub fn pop_areas(&mut self, set_id: &str, max: usize) -> Vec<EntityUpdate<Area>> {
        match self.sets.get_mut(set_id) {
            Some(queues) => drain_front(&mut queues.areas, max),
            None => Vec::new(),
        }
    }

    pub fn pop_circles(&mut self, set_id: &str, max: usize) -> Vec<EntityUpdate<Circle>> {
        match self.sets.get_mut(set_id) {
            Some(queues) => drain_front(&mut queues.circles, max),
            None => Vec::new(),
        }
    }

    pub fn pop_lines(&mut self, set_id: &str, max: usize) -> Vec<EntityUpdate<Line>> {
        match self.sets.get_mut(set_id) {
            Some(queues) => drain_front(&mut queues.lines, max),
            None => Vec::new(),
        }
    }

    pub fn pop_tiles(&mut self, max: usize) -> Vec<TileUpdate> {
        drain_front(&mut self.tiles, max)
    }

    pub fn has_set(&self, set_id: &str) -> bool {
        self.sets.contains_key(set_id)
    }

    pub fn set_ids(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn pending(&self, set_id: &str, kind: EntityKind) -> usize {
        self.sets
            .get(set_id)
            .map(|queues| queues.pending(kind))
            .unwrap_or(0)
    }

    pub fn pending_tiles(&self) -> usize {
        self.tiles.len()
    }

    pub fn total_pending(&self) -> usize {
        let entities: usize = self.sets.values().map(SetQueues::total_pending).sum();
        entities + self.tiles.len()
    }
}

fn drain_front<T>(queue: &mut VecDeque<T>, max: usize) -> Vec<T> {
    let count = queue.len().min(max);
    queue.drain(..count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_update(id: &str) -> EntityUpdate<Marker> {
        EntityUpdate {
            id: id.to_string(),
            removed: false,
            payload: None,
        }
    }

    #[test]
    fn pop_returns_oldest_first_and_at_most_max() {
        let mut queues = PendingQueues::default();
        for id in ["m1", "m2", "m3"] {
            queues.push_marker("s1", marker_update(id));
        }
        let popped = queues.pop_markers("s1", 2);
        let ids = popped.iter().map(|u| u.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert_eq!(queues.pending("s1", EntityKind::Marker), 1);

        let rest = queues.pop_markers("s1", 10);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, "m3");
        assert!(queues.pop_markers("s1", 10).is_empty());
    }

    #[test]
    fn pop_for_unknown_set_is_empty() {
        let mut queues = PendingQueues::default();
        assert!(queues.pop_markers("missing", 5).is_empty());
        assert!(queues.pop_areas("missing", 5).is_empty());
    }

    #[test]
    fn remove_set_discards_every_category() {
        let mut queues = PendingQueues::default();
        queues.push_marker("s1", marker_update("m1"));
        queues.push_line(
            "s1",
            EntityUpdate {
                id: "l1".to_string(),
                removed: false,
                payload: None,
            },
        );
        assert_eq!(queues.total_pending(), 2);

        queues.remove_set("s1");
        assert!(!queues.has_set("s1"));
        assert_eq!(queues.total_pending(), 0);
    }

    #[test]
    fn tile_queue_is_independent_of_set_queues() {
        let mut queues = PendingQueues::default();
        queues.push_tile(TileUpdate {
            name: "world/t_0_0.png".to_string(),
            timestamp: 100,
        });
        queues.push_tile(TileUpdate {
            name: "world/t_0_1.png".to_string(),
            timestamp: 101,
        });
        assert_eq!(queues.pending_tiles(), 2);

        let popped = queues.pop_tiles(1);
        assert_eq!(popped[0].name, "world/t_0_0.png");
        assert_eq!(queues.pending_tiles(), 1);
    }
}
