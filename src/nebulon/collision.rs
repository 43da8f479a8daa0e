//! Faction-aware collision resolution

use super::arena::{Arena, EntityId};
use super::entity::Entity;

/// A resolved hit between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub a: EntityId,
    pub b: EntityId,
    pub a_killed: bool,
    pub b_killed: bool,
}

/// Whether `a` and `b` collide: both live and collidable, opposing
/// factions, neither invincible, not both projectiles, rectangles overlap.
pub fn collides(a: &Entity, b: &Entity) -> bool {
    a.alive
        && b.alive
        && a.kind.collidable()
        && b.kind.collidable()
        && a.faction.opposes(b.faction)
        && !a.invincible
        && !b.invincible
        && !(a.kind.is_projectile() && b.kind.is_projectile())
        && a.rect().overlaps(&b.rect())
}

/// Exchange damage between two colliding entities. Both sides are hit with
/// the other's attack value as it was before the exchange; a kind that
/// detonates on contact dies regardless of its health.
pub fn exchange_damage(a: &mut Entity, b: &mut Entity) -> (bool, bool) {
    let (attack_a, attack_b) = (a.attack, b.attack);
    (hit(a, attack_b), hit(b, attack_a))
}

fn hit(entity: &mut Entity, damage: i32) -> bool {
    let killed = entity.take_damage(damage);
    if entity.kind.detonates_on_contact() {
        return entity.detonate() || killed;
    }
    killed
}

/// Detect and resolve every colliding pair, in insertion order.
///
/// Pairs are taken from a snapshot of ids; an entity killed by an earlier
/// pair in the same pass no longer collides with later ones.
pub fn resolve(arena: &mut Arena) -> Vec<Hit> {
    let ids = arena.ids();
    let mut hits = Vec::new();
    for (i, &a) in ids.iter().enumerate() {
        for &b in &ids[i + 1..] {
            let Some((ea, eb)) = arena.pair_mut(a, b) else {
                continue;
            };
            if !collides(ea, eb) {
                continue;
            }
            let (a_killed, b_killed) = exchange_damage(ea, eb);
            hits.push(Hit {
                a,
                b,
                a_killed,
                b_killed,
            });
        }
    }
    hits
}
