//! The simulated playfield
//!
//! [`World`] owns the entity arena and the scheduler that drives every
//! entity's timed tracks (movement, firing, roaming, damage flash, explosion
//! frames, projectile lifetime). One [`World::update`] per frame:
//!
//! 1. advance the clock and dispatch due timers in order
//! 2. resolve collisions over a snapshot of the arena
//! 3. cull projectiles that left the canvas
//! 4. reap dead entities (explosion + [`WorldEvent::Destroyed`], once)

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::arena::{Arena, EntityId};
use super::collision;
use super::entity::{Entity, EntityKind, Faction, FirePolicy, Tracks};
use super::motion::{MOVE_INTERVAL_MS, Motion, MotionStatus};
use crate::geom::{Rect, confine_step, fully_outside};
use crate::render::{Color, Renderer};
use crate::sched::{Scheduler, TimerHandle};

/// Frames in an explosion animation
pub const EXPLOSION_FRAMES: u8 = 4;
/// Time per explosion frame (ms)
pub const EXPLOSION_FRAME_MS: u64 = 80;
/// How long a damaged entity flashes (ms)
pub const FLASH_MS: u64 = 100;
/// Homing bullets expire after this long (ms)
pub const HOMING_LIFETIME_MS: u64 = 4000;
/// How often a roaming enemy picks a new spot (ms)
pub const ROAM_INTERVAL_MS: u64 = 2000;
pub const ROAM_SPEED: f32 = 1.5;
/// Share of the canvas height enemies roam in
const ROAM_DEPTH: f32 = 0.4;

/// Per-entity timer kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    Movement,
    Firing,
    Roam,
    Flash,
    Animation,
    Lifetime,
}

/// Game-level timers, reported back through [`WorldEvent::Timer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameTimer {
    ReadyBlink,
    ReadyDone,
    Respawn,
    PowerEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    Entity(EntityId, Track),
    Game(GameTimer),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    /// A killed entity was removed
    Destroyed {
        id: EntityId,
        kind: EntityKind,
        faction: Faction,
        score_value: u32,
    },
    /// A point or path move finished
    PathComplete(EntityId),
    Timer(GameTimer),
}

fn track_slot(tracks: &mut Tracks, track: Track) -> &mut Option<TimerHandle> {
    match track {
        Track::Movement => &mut tracks.movement,
        Track::Firing => &mut tracks.firing,
        Track::Roam => &mut tracks.roam,
        Track::Flash => &mut tracks.flash,
        Track::Animation => &mut tracks.animation,
        Track::Lifetime => &mut tracks.lifetime,
    }
}

#[derive(Debug, Clone)]
pub struct World {
    pub arena: Arena,
    pub sched: Scheduler<Timer>,
    pub bounds: Rect,
    rng: Pcg32,
    player: Option<EntityId>,
    events: Vec<WorldEvent>,
}

impl World {
    pub fn new(bounds: Rect, seed: u64) -> Self {
        Self {
            arena: Arena::new(),
            sched: Scheduler::new(),
            bounds,
            rng: Pcg32::seed_from_u64(seed),
            player: None,
            events: Vec::new(),
        }
    }

    /// Drop every entity and timer
    pub fn reset(&mut self) {
        self.arena.clear();
        self.sched.clear();
        self.player = None;
        self.events.clear();
    }

    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    pub fn player_entity(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.arena.get(id))
    }

    pub fn player_entity_mut(&mut self) -> Option<&mut Entity> {
        self.player.and_then(|id| self.arena.get_mut(id))
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.arena.get(id)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.arena.get(id).is_some_and(|e| e.alive)
    }

    /// Add an entity and start the tracks its kind needs
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let kind = entity.kind;
        let moving = !entity.motion.is_idle();
        let id = self.arena.insert(entity);

        if kind == EntityKind::Player {
            self.player = Some(id);
        }
        if moving {
            self.ensure_track(id, Track::Movement);
        }
        match kind {
            EntityKind::Explosion => self.ensure_track(id, Track::Animation),
            EntityKind::HomingBullet => self.ensure_track(id, Track::Lifetime),
            _ => {}
        }
        id
    }

    /// Remove an entity after cancelling every track it owns
    pub fn dispose(&mut self, id: EntityId) -> Option<Entity> {
        if let Some(entity) = self.arena.get_mut(id) {
            for slot in entity.tracks.handles_mut() {
                self.sched.cancel_slot(slot);
            }
        }
        if self.player == Some(id) {
            self.player = None;
        }
        self.arena.remove(id)
    }

    /// Constant displacement per movement step
    pub fn move_in_vector(&mut self, id: EntityId, velocity: Vec2) {
        let Some(entity) = self.arena.get_mut(id) else {
            return;
        };
        entity.motion = Motion::Vector { velocity };
        self.ensure_track(id, Track::Movement);
    }

    /// Halt movement
    pub fn stop(&mut self, id: EntityId) {
        if let Some(entity) = self.arena.get_mut(id) {
            entity.motion = Motion::Idle;
            self.sched.cancel_slot(&mut entity.tracks.movement);
        }
    }

    /// Start moving toward `target`. Ignored (returns false) while another
    /// point or path move is outstanding.
    pub fn move_to_point(&mut self, id: EntityId, target: Vec2, speed: f32) -> bool {
        let Some(entity) = self.arena.get_mut(id) else {
            return false;
        };
        if entity.motion.is_outstanding() {
            return false;
        }
        entity.motion = Motion::to_point(entity.pos, target, speed);
        self.ensure_track(id, Track::Movement);
        true
    }

    /// Start walking `points` in order. Same exclusivity as
    /// [`World::move_to_point`].
    pub fn move_path(&mut self, id: EntityId, points: Vec<Vec2>, speed: f32) -> bool {
        let Some(entity) = self.arena.get_mut(id) else {
            return false;
        };
        if entity.motion.is_outstanding() {
            return false;
        }
        entity.motion = Motion::path(entity.pos, points, speed);
        if entity.motion.is_idle() {
            return false;
        }
        self.ensure_track(id, Track::Movement);
        true
    }

    pub fn start_firing(&mut self, id: EntityId) {
        self.ensure_track(id, Track::Firing);
    }

    /// Autonomous wandering inside the upper canvas, with firing
    pub fn enable_roam(&mut self, id: EntityId) {
        let Some(entity) = self.arena.get_mut(id) else {
            return;
        };
        entity.roam_after_path = false;
        entity.confined = true;
        self.ensure_track(id, Track::Roam);
        self.start_firing(id);
        self.roam_step(id);
    }

    /// Make `id` flash for [`FLASH_MS`]
    pub fn flash(&mut self, id: EntityId) {
        let Some(entity) = self.arena.get_mut(id) else {
            return;
        };
        entity.damaged = true;
        self.sched.cancel_slot(&mut entity.tracks.flash);
        entity.tracks.flash = Some(
            self.sched
                .schedule_once(FLASH_MS, Timer::Entity(id, Track::Flash)),
        );
    }

    /// One-shot game timer
    pub fn schedule_game(&mut self, delay_ms: u64, timer: GameTimer) -> TimerHandle {
        self.sched.schedule_once(delay_ms, Timer::Game(timer))
    }

    /// Repeating game timer
    pub fn schedule_game_repeating(&mut self, interval_ms: u64, timer: GameTimer) -> TimerHandle {
        self.sched.schedule(interval_ms, Timer::Game(timer))
    }

    pub fn cancel(&mut self, slot: &mut Option<TimerHandle>) {
        self.sched.cancel_slot(slot);
    }

    /// Advance the world by `dt_ms` and report what happened
    pub fn update(&mut self, dt_ms: u64) -> Vec<WorldEvent> {
        self.sched.advance(dt_ms);
        while let Some(fired) = self.sched.pop_due() {
            match fired.action {
                Timer::Entity(id, track) => {
                    if self.arena.contains(id) {
                        self.dispatch(id, track);
                    } else {
                        log::debug!("cancelling orphaned {track:?} timer");
                        self.sched.cancel(fired.handle);
                    }
                }
                Timer::Game(timer) => self.events.push(WorldEvent::Timer(timer)),
            }
        }

        for hit in collision::resolve(&mut self.arena) {
            for (id, killed) in [(hit.a, hit.a_killed), (hit.b, hit.b_killed)] {
                if !killed && self.is_alive(id) {
                    self.flash(id);
                }
            }
        }

        self.cull();
        self.reap();
        std::mem::take(&mut self.events)
    }

    pub fn render(&self, renderer: &mut dyn Renderer) {
        for (_, entity) in self.arena.iter() {
            let rect = entity.rect();
            renderer.draw_image(entity.sprite(), rect);
            if entity.damaged {
                renderer.stroke_rect(rect, Color::Red);
            } else if entity.invincible {
                renderer.stroke_rect(rect, Color::Highlight);
            }
        }
    }

    fn ensure_track(&mut self, id: EntityId, track: Track) {
        let Some(entity) = self.arena.get_mut(id) else {
            return;
        };
        let slot = track_slot(&mut entity.tracks, track);
        if self.sched.slot_active(slot) {
            return;
        }
        let action = Timer::Entity(id, track);
        let handle = match track {
            Track::Movement => self.sched.schedule(MOVE_INTERVAL_MS, action),
            Track::Firing => match entity.fire.interval_ms() {
                Some(interval) => self.sched.schedule(interval, action),
                None => return,
            },
            Track::Roam => self.sched.schedule(ROAM_INTERVAL_MS, action),
            Track::Flash => self.sched.schedule_once(FLASH_MS, action),
            Track::Animation => self.sched.schedule(EXPLOSION_FRAME_MS, action),
            Track::Lifetime => self.sched.schedule_once(HOMING_LIFETIME_MS, action),
        };
        *slot = Some(handle);
    }

    fn dispatch(&mut self, id: EntityId, track: Track) {
        match track {
            Track::Movement => self.move_step(id),
            Track::Firing => self.fire(id),
            Track::Roam => self.roam_step(id),
            Track::Flash => {
                if let Some(entity) = self.arena.get_mut(id) {
                    entity.damaged = false;
                    entity.tracks.flash = None;
                }
            }
            Track::Animation => {
                let done = match self.arena.get_mut(id) {
                    Some(entity) => {
                        entity.frame += 1;
                        entity.frame >= EXPLOSION_FRAMES
                    }
                    None => false,
                };
                if done {
                    self.dispose(id);
                }
            }
            Track::Lifetime => {
                self.dispose(id);
            }
        }
    }

    fn move_step(&mut self, id: EntityId) {
        let target = self.player_entity().map(|p| p.center());
        let bounds = self.bounds;
        let Some(entity) = self.arena.get_mut(id) else {
            return;
        };

        if entity.kind == EntityKind::HomingBullet {
            let center = entity.center();
            if let (Motion::Vector { velocity }, Some(target)) = (&mut entity.motion, target) {
                let speed = velocity.length();
                let aim = (target - center).normalize_or_zero();
                if aim != Vec2::ZERO {
                    *velocity = aim * speed;
                }
            }
        }

        let mut delta = entity.motion.delta(entity.pos);
        if entity.confined {
            delta = confine_step(&entity.rect(), delta, &bounds);
        }
        entity.pos += delta;

        match entity.motion.settle(entity.pos) {
            MotionStatus::Arrived => {
                self.sched.cancel_slot(&mut entity.tracks.movement);
                let roam = entity.roam_after_path;
                self.events.push(WorldEvent::PathComplete(id));
                if roam {
                    self.enable_roam(id);
                }
            }
            MotionStatus::Moving => {
                if entity.motion.is_idle() {
                    self.sched.cancel_slot(&mut entity.tracks.movement);
                }
            }
        }
    }

    fn roam_step(&mut self, id: EntityId) {
        let bounds = self.bounds;
        let Some(entity) = self.arena.get(id) else {
            return;
        };
        if entity.motion.is_outstanding() {
            return;
        }
        let max_x = (bounds.right() - entity.size.x).max(bounds.x);
        let max_y = (bounds.y + bounds.h * ROAM_DEPTH - entity.size.y).max(bounds.y);
        let target = Vec2::new(
            self.rng.random_range(bounds.x..=max_x),
            self.rng.random_range(bounds.y..=max_y),
        );
        self.move_to_point(id, target, ROAM_SPEED);
    }

    fn fire(&mut self, id: EntityId) {
        let player_center = self.player_entity().map(|p| p.center());
        let bounds = self.bounds;
        let Some(shooter) = self.arena.get(id) else {
            return;
        };
        if !shooter.alive || !shooter.rect().overlaps(&bounds) {
            return;
        }

        let forward = match shooter.faction {
            Faction::Allied => Vec2::NEG_Y,
            Faction::Enemy => Vec2::Y,
        };
        let rect = shooter.rect();
        let muzzle = match shooter.faction {
            Faction::Allied => Vec2::new(rect.center().x, rect.y),
            Faction::Enemy => Vec2::new(rect.center().x, rect.bottom()),
        };
        let faction = shooter.faction;

        let bullet = match shooter.fire {
            FirePolicy::None => return,
            FirePolicy::Standard { speed, .. } => {
                Entity::bullet(EntityKind::Bullet, faction, muzzle, forward * speed)
            }
            FirePolicy::Homing { speed, .. } => {
                let aim = player_center
                    .map(|p| (p - muzzle).normalize_or_zero())
                    .filter(|a| *a != Vec2::ZERO)
                    .unwrap_or(forward);
                Entity::bullet(EntityKind::HomingBullet, faction, muzzle, aim * speed)
            }
        };
        self.spawn(bullet);
    }

    /// Dispose culled kinds that have fully left the canvas and are still
    /// travelling away from it. Culling is silent.
    fn cull(&mut self) {
        let bounds = self.bounds;
        let gone: Vec<EntityId> = self
            .arena
            .iter()
            .filter(|(_, e)| e.kind.culled_offscreen())
            .filter(|(_, e)| {
                let rect = e.rect();
                if !fully_outside(&rect, &bounds) {
                    return false;
                }
                let d = e.motion.delta(e.pos);
                (rect.bottom() <= bounds.y && d.y < 0.0)
                    || (rect.y >= bounds.bottom() && d.y > 0.0)
                    || (rect.right() <= bounds.x && d.x < 0.0)
                    || (rect.x >= bounds.right() && d.x > 0.0)
                    || d == Vec2::ZERO
            })
            .map(|(id, _)| id)
            .collect();
        for id in gone {
            self.dispose(id);
        }
    }

    fn reap(&mut self) {
        let dead: Vec<EntityId> = self
            .arena
            .iter()
            .filter(|(_, e)| !e.alive)
            .map(|(id, _)| id)
            .collect();
        for id in dead {
            let Some(entity) = self.dispose(id) else {
                continue;
            };
            log::debug!("{:?} destroyed", entity.kind);
            if entity.kind.explodes() {
                self.spawn(Entity::explosion(entity.center()));
            }
            self.events.push(WorldEvent::Destroyed {
                id,
                kind: entity.kind,
                faction: entity.faction,
                score_value: entity.score_value,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(Rect::new(0.0, 0.0, 480.0, 640.0), 7)
    }

    fn destroyed(events: &[WorldEvent]) -> Vec<EntityKind> {
        events
            .iter()
            .filter_map(|e| match e {
                WorldEvent::Destroyed { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_dispose_cancels_every_track() {
        let mut world = world();
        let id = world.spawn(Entity::enemy(EntityKind::Fighter, Vec2::new(100.0, 100.0)));
        world.enable_roam(id);
        world.flash(id);
        assert!(!world.sched.is_empty());

        world.dispose(id);
        assert!(world.sched.is_empty());
        assert!(world.update(10_000).is_empty());
    }

    #[test]
    fn test_second_move_is_ignored_while_outstanding() {
        let mut world = world();
        let id = world.spawn(Entity::enemy(EntityKind::Scout, Vec2::new(0.0, 0.0)));
        assert!(world.move_to_point(id, Vec2::new(100.0, 0.0), 2.0));
        assert!(!world.move_to_point(id, Vec2::new(0.0, 300.0), 2.0));
        assert!(!world.move_path(id, vec![Vec2::new(5.0, 5.0)], 2.0));

        let mut completions = 0;
        for _ in 0..100 {
            completions += world
                .update(MOVE_INTERVAL_MS)
                .iter()
                .filter(|e| matches!(e, WorldEvent::PathComplete(_)))
                .count();
        }
        assert_eq!(completions, 1);
        assert_eq!(world.get(id).map(|e| e.pos), Some(Vec2::new(100.0, 0.0)));
        assert!(world.move_to_point(id, Vec2::new(100.0, 50.0), 2.0));
    }

    #[test]
    fn test_path_completion_enables_roam() {
        let mut world = world();
        let mut fighter = Entity::enemy(EntityKind::Fighter, Vec2::new(100.0, -40.0));
        fighter.roam_after_path = true;
        let id = world.spawn(fighter);
        assert!(world.move_path(id, vec![Vec2::new(100.0, 60.0)], 5.0));
        let mut done = false;
        for _ in 0..40 {
            if world
                .update(MOVE_INTERVAL_MS)
                .contains(&WorldEvent::PathComplete(id))
            {
                done = true;
                break;
            }
        }
        assert!(done);
        let fighter = world.get(id).expect("alive");
        assert!(fighter.confined);
        assert!(!fighter.roam_after_path);
        assert!(world.sched.slot_active(&fighter.tracks.roam));
        assert!(world.sched.slot_active(&fighter.tracks.firing));
    }

    #[test]
    fn test_kill_scores_once_and_explodes() {
        let mut world = world();
        let scout = world.spawn(Entity::enemy(EntityKind::Scout, Vec2::new(200.0, 200.0)));
        let center = world.get(scout).map(|e| e.center()).unwrap_or_default();
        world.spawn(Entity::bullet(
            EntityKind::Bullet,
            Faction::Allied,
            center,
            Vec2::ZERO,
        ));

        let events = world.update(1);
        assert_eq!(destroyed(&events), vec![EntityKind::Scout, EntityKind::Bullet]);
        assert!(!world.arena.contains(scout));
        let explosions = world
            .arena
            .iter()
            .filter(|(_, e)| e.kind == EntityKind::Explosion)
            .count();
        assert_eq!(explosions, 1);

        let later = world.update(EXPLOSION_FRAME_MS * EXPLOSION_FRAMES as u64);
        assert!(destroyed(&later).is_empty());
        assert!(world.arena.is_empty());
    }

    #[test]
    fn test_bullets_leaving_canvas_are_culled_silently() {
        let mut world = world();
        world.spawn(Entity::bullet(
            EntityKind::Bullet,
            Faction::Allied,
            Vec2::new(100.0, 10.0),
            Vec2::new(0.0, -8.0),
        ));
        let events = world.update(MOVE_INTERVAL_MS * 4);
        assert!(events.is_empty());
        assert!(world.arena.is_empty());
        assert!(world.sched.is_empty());
    }

    #[test]
    fn test_mine_entering_from_above_is_kept() {
        let mut world = world();
        let mine = world.spawn(
            Entity::enemy(EntityKind::Mine, Vec2::new(50.0, -30.0)).with_motion(Motion::Vector {
                velocity: Vec2::new(0.0, 1.0),
            }),
        );
        world.update(MOVE_INTERVAL_MS);
        assert!(world.arena.contains(mine));
    }

    #[test]
    fn test_mine_explodes_on_player_contact() {
        let mut world = world();
        let player = world.spawn(Entity::player(Vec2::new(200.0, 500.0), 5, 250));
        let mine = world.spawn(Entity::enemy(EntityKind::Mine, Vec2::new(205.0, 505.0)));

        let events = world.update(1);
        let scored: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                WorldEvent::Destroyed {
                    kind: EntityKind::Mine,
                    score_value,
                    ..
                } => Some(*score_value),
                _ => None,
            })
            .collect();
        assert_eq!(scored, vec![EntityKind::Mine.stats().score_value]);
        assert!(!world.arena.contains(mine));
        assert_eq!(world.get(player).map(|p| p.health), Some(2));
        let explosions = world
            .arena
            .iter()
            .filter(|(_, e)| e.kind == EntityKind::Explosion)
            .count();
        assert_eq!(explosions, 1);
    }

    #[test]
    fn test_damage_flash_clears_after_timeout() {
        let mut world = world();
        let fighter = world.spawn(Entity::enemy(EntityKind::Fighter, Vec2::new(200.0, 200.0)));
        let center = world.get(fighter).map(|e| e.center()).unwrap_or_default();
        world.spawn(Entity::bullet(
            EntityKind::Bullet,
            Faction::Allied,
            center,
            Vec2::ZERO,
        ));

        world.update(1);
        assert!(world.get(fighter).is_some_and(|e| e.damaged && e.alive));
        world.update(FLASH_MS);
        assert!(world.get(fighter).is_some_and(|e| !e.damaged));
    }

    #[test]
    fn test_homing_bullet_turns_and_expires() {
        let mut world = world();
        world.spawn(Entity::player(Vec2::new(400.0, 300.0), 3, 250));
        let bullet = world.spawn(Entity::bullet(
            EntityKind::HomingBullet,
            Faction::Enemy,
            Vec2::new(100.0, 300.0),
            Vec2::new(0.0, 3.0),
        ));
        world.update(MOVE_INTERVAL_MS);
        let b = world.get(bullet).expect("bullet");
        assert!(b.pos.x > 96.0);

        world.update(HOMING_LIFETIME_MS);
        assert!(!world.arena.contains(bullet) || world.get(bullet).is_some_and(|b| !b.alive));
    }

    #[test]
    fn test_player_fires_upward() {
        let mut world = world();
        let player = world.spawn(Entity::player(Vec2::new(200.0, 500.0), 3, 250));
        world.start_firing(player);
        world.update(250);
        let bullets: Vec<_> = world
            .arena
            .iter()
            .filter(|(_, e)| e.kind == EntityKind::Bullet)
            .map(|(_, e)| e.faction)
            .collect();
        assert_eq!(bullets, vec![Faction::Allied]);
    }
}
