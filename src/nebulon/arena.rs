//! Generational entity storage
//!
//! Removal frees the slot and bumps its generation, so an [`EntityId`] held
//! by a timer that outlived its entity resolves to nothing instead of
//! aliasing whatever took the slot next. Iteration follows insertion order.

use super::entity::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

#[derive(Debug, Clone, Default)]
pub struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Live ids in insertion order
    order: Vec<EntityId>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entity = Some(entity);
            EntityId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                entity: Some(entity),
            });
            EntityId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        };
        self.order.push(id);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entity.as_ref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entity.as_mut())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.order.retain(|o| *o != id);
        Some(entity)
    }

    /// Snapshot of live ids in insertion order
    pub fn ids(&self) -> Vec<EntityId> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.order
            .iter()
            .filter_map(|id| self.get(*id).map(|e| (*id, e)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            let slot = &mut self.slots[index];
            if slot.entity.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.order.clear();
    }

    /// Mutable access to two distinct entities at once
    pub fn pair_mut(&mut self, a: EntityId, b: EntityId) -> Option<(&mut Entity, &mut Entity)> {
        if a.index == b.index {
            return None;
        }
        if !self.contains(a) || !self.contains(b) {
            return None;
        }
        let (lo, hi, swapped) = if a.index < b.index {
            (a.index as usize, b.index as usize, false)
        } else {
            (b.index as usize, a.index as usize, true)
        };
        let (left, right) = self.slots.split_at_mut(hi);
        let first = left[lo].entity.as_mut()?;
        let second = right[0].entity.as_mut()?;
        if swapped {
            Some((second, first))
        } else {
            Some((first, second))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nebulon::entity::EntityKind;
    use glam::Vec2;

    fn scout() -> Entity {
        Entity::enemy(EntityKind::Scout, Vec2::ZERO)
    }

    #[test]
    fn test_stale_id_after_reuse() {
        let mut arena = Arena::new();
        let a = arena.insert(scout());
        assert!(arena.remove(a).is_some());
        let b = arena.insert(scout());
        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
        assert!(arena.get(b).is_some());
        assert!(arena.remove(a).is_none());
    }

    #[test]
    fn test_iteration_keeps_insertion_order() {
        let mut arena = Arena::new();
        let a = arena.insert(scout());
        let b = arena.insert(Entity::enemy(EntityKind::Mine, Vec2::ZERO));
        let c = arena.insert(scout());
        arena.remove(b);
        let d = arena.insert(scout());
        let ids: Vec<_> = arena.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, c, d]);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_pair_mut_order_and_same_id() {
        let mut arena = Arena::new();
        let a = arena.insert(scout());
        let b = arena.insert(Entity::enemy(EntityKind::Mine, Vec2::ZERO));
        let (eb, ea) = arena.pair_mut(b, a).expect("both live");
        assert_eq!(eb.kind, EntityKind::Mine);
        assert_eq!(ea.kind, EntityKind::Scout);
        assert!(arena.pair_mut(a, a).is_none());
    }

    #[test]
    fn test_clear_invalidates_ids() {
        let mut arena = Arena::new();
        let a = arena.insert(scout());
        arena.clear();
        assert!(arena.is_empty());
        assert!(!arena.contains(a));
    }
}
