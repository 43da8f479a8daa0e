//! Nebulon entities
//!
//! One record type covers every variant. The `kind` tag selects default
//! stats and sprite; behaviour comes from the capability fields (`motion`,
//! `fire`, `confined`, ...) so variants differ only in data.

use glam::Vec2;

use super::motion::Motion;
use crate::geom::Rect;
use crate::render::Sprite;
use crate::sched::TimerHandle;

/// Allegiance; only opposing factions damage each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Faction {
    Enemy,
    Allied,
}

impl Faction {
    pub fn opposes(&self, other: Faction) -> bool {
        *self != other
    }
}

/// Entity variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    /// Light enemy, never fires
    Scout,
    /// Fires standard bullets
    Fighter,
    /// Armoured, fires homing bullets
    Gunship,
    /// Drifts downward, damages on contact
    Mine,
    Bullet,
    HomingBullet,
    Bomb,
    /// Pure animation
    Explosion,
}

/// Default numbers for a kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub size: Vec2,
    pub health: i32,
    pub attack: i32,
    pub score_value: u32,
}

impl EntityKind {
    pub fn stats(&self) -> Stats {
        let (w, h, health, attack, score_value) = match self {
            EntityKind::Player => (32.0, 32.0, 3, 1, 0),
            EntityKind::Scout => (28.0, 24.0, 1, 1, 10),
            EntityKind::Fighter => (32.0, 28.0, 2, 1, 20),
            EntityKind::Gunship => (48.0, 40.0, 6, 2, 50),
            EntityKind::Mine => (20.0, 20.0, 1, 3, 15),
            EntityKind::Bullet => (4.0, 10.0, 1, 1, 0),
            EntityKind::HomingBullet => (8.0, 8.0, 1, 1, 0),
            EntityKind::Bomb => (14.0, 14.0, 4, 10, 0),
            EntityKind::Explosion => (32.0, 32.0, 1, 0, 0),
        };
        Stats {
            size: Vec2::new(w, h),
            health,
            attack,
            score_value,
        }
    }

    /// Default firing behaviour
    pub fn fire_policy(&self) -> FirePolicy {
        match self {
            EntityKind::Fighter => FirePolicy::Standard {
                interval_ms: 1500,
                speed: 4.0,
            },
            EntityKind::Gunship => FirePolicy::Homing {
                interval_ms: 2500,
                speed: 3.0,
            },
            _ => FirePolicy::None,
        }
    }

    /// Sprite for a faction (bullets are coloured by side)
    pub fn sprite(&self, faction: Faction) -> Sprite {
        match self {
            EntityKind::Player => Sprite::Player,
            EntityKind::Scout => Sprite::Scout,
            EntityKind::Fighter => Sprite::Fighter,
            EntityKind::Gunship => Sprite::Gunship,
            EntityKind::Mine => Sprite::Mine,
            EntityKind::Bullet => match faction {
                Faction::Allied => Sprite::PlayerBullet,
                Faction::Enemy => Sprite::EnemyBullet,
            },
            EntityKind::HomingBullet => Sprite::HomingBullet,
            EntityKind::Bomb => Sprite::Bomb,
            EntityKind::Explosion => Sprite::Explosion(0),
        }
    }

    /// Bullets never collide with each other
    pub fn is_projectile(&self) -> bool {
        matches!(self, EntityKind::Bullet | EntityKind::HomingBullet)
    }

    /// Whether the kind takes part in collisions at all
    pub fn collidable(&self) -> bool {
        !matches!(self, EntityKind::Explosion)
    }

    /// Whether a destroyed entity of this kind leaves an explosion
    pub fn explodes(&self) -> bool {
        !matches!(
            self,
            EntityKind::Bullet | EntityKind::HomingBullet | EntityKind::Explosion
        )
    }

    /// Whether the entity is removed once it leaves the canvas
    pub fn culled_offscreen(&self) -> bool {
        matches!(
            self,
            EntityKind::Bullet | EntityKind::HomingBullet | EntityKind::Bomb | EntityKind::Mine
        )
    }

    /// Mines blow up on any contact, whatever their remaining health
    pub fn detonates_on_contact(&self) -> bool {
        matches!(self, EntityKind::Mine)
    }

    pub fn is_enemy_ship(&self) -> bool {
        matches!(
            self,
            EntityKind::Scout | EntityKind::Fighter | EntityKind::Gunship | EntityKind::Mine
        )
    }
}

/// How an entity shoots
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FirePolicy {
    None,
    /// Straight bullets along the faction's forward direction
    Standard { interval_ms: u64, speed: f32 },
    /// Bullets that keep turning toward the player
    Homing { interval_ms: u64, speed: f32 },
}

impl FirePolicy {
    pub fn interval_ms(&self) -> Option<u64> {
        match self {
            FirePolicy::None => None,
            FirePolicy::Standard { interval_ms, .. } | FirePolicy::Homing { interval_ms, .. } => {
                Some(*interval_ms)
            }
        }
    }
}

/// Scheduled handles owned by one entity. All of them are cancelled before
/// the entity leaves the arena.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tracks {
    pub movement: Option<TimerHandle>,
    pub firing: Option<TimerHandle>,
    pub roam: Option<TimerHandle>,
    pub flash: Option<TimerHandle>,
    pub animation: Option<TimerHandle>,
    pub lifetime: Option<TimerHandle>,
}

impl Tracks {
    pub fn handles_mut(&mut self) -> [&mut Option<TimerHandle>; 6] {
        [
            &mut self.movement,
            &mut self.firing,
            &mut self.roam,
            &mut self.flash,
            &mut self.animation,
            &mut self.lifetime,
        ]
    }
}

/// A simulated object
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub kind: EntityKind,
    pub faction: Faction,
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    pub health: i32,
    pub attack: i32,
    pub score_value: u32,
    pub alive: bool,
    pub invincible: bool,
    /// Flashing after a hit
    pub damaged: bool,
    pub motion: Motion,
    pub fire: FirePolicy,
    /// Kept inside the canvas while moving
    pub confined: bool,
    /// Start roaming once the current path finishes
    pub roam_after_path: bool,
    /// Animation frame (explosions)
    pub frame: u8,
    pub tracks: Tracks,
}

impl Entity {
    /// New entity with the kind's default stats
    pub fn new(kind: EntityKind, faction: Faction, pos: Vec2) -> Self {
        let stats = kind.stats();
        Self {
            kind,
            faction,
            pos,
            size: stats.size,
            health: stats.health,
            attack: stats.attack,
            score_value: stats.score_value,
            alive: true,
            invincible: false,
            damaged: false,
            motion: Motion::Idle,
            fire: kind.fire_policy(),
            confined: false,
            roam_after_path: false,
            frame: 0,
            tracks: Tracks::default(),
        }
    }

    /// Enemy ship of `kind`
    pub fn enemy(kind: EntityKind, pos: Vec2) -> Self {
        Self::new(kind, Faction::Enemy, pos)
    }

    /// The player ship
    pub fn player(pos: Vec2, health: i32, fire_interval_ms: u64) -> Self {
        let mut player = Self::new(EntityKind::Player, Faction::Allied, pos);
        player.health = health;
        player.confined = true;
        player.fire = FirePolicy::Standard {
            interval_ms: fire_interval_ms,
            speed: 8.0,
        };
        player
    }

    /// A bullet centred on `center`
    pub fn bullet(kind: EntityKind, faction: Faction, center: Vec2, velocity: Vec2) -> Self {
        let size = kind.stats().size;
        let mut bullet = Self::new(kind, faction, center - size / 2.0);
        bullet.motion = Motion::Vector { velocity };
        bullet
    }

    /// An explosion centred on `center`
    pub fn explosion(center: Vec2) -> Self {
        let size = EntityKind::Explosion.stats().size;
        Self::new(EntityKind::Explosion, Faction::Allied, center - size / 2.0)
    }

    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }

    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size / 2.0
    }

    /// Apply damage; returns true if this hit killed the entity.
    /// Invincible or already dead entities are untouched.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        if self.invincible || !self.alive {
            return false;
        }
        self.health -= amount;
        if self.health <= 0 {
            self.alive = false;
            return true;
        }
        false
    }

    /// Kill outright; returns true if the entity was alive
    pub fn detonate(&mut self) -> bool {
        if self.invincible || !self.alive {
            return false;
        }
        self.health = 0;
        self.alive = false;
        true
    }

    /// Current sprite
    pub fn sprite(&self) -> Sprite {
        match self.kind {
            EntityKind::Explosion => Sprite::Explosion(self.frame),
            kind => kind.sprite(self.faction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_damage_kills_once() {
        let mut ship = Entity::enemy(EntityKind::Fighter, Vec2::ZERO);
        assert!(!ship.take_damage(1));
        assert_eq!(ship.health, 1);
        assert!(ship.alive);
        assert!(ship.take_damage(1));
        assert!(!ship.alive);
        // Further hits don't report another kill
        assert!(!ship.take_damage(1));
    }

    #[test]
    fn test_invincible_takes_no_damage() {
        let mut player = Entity::player(Vec2::ZERO, 3, 250);
        player.invincible = true;
        assert!(!player.take_damage(100));
        assert_eq!(player.health, 3);
    }

    #[test]
    fn test_bullet_is_centred() {
        let b = Entity::bullet(
            EntityKind::Bullet,
            Faction::Allied,
            Vec2::new(100.0, 100.0),
            Vec2::new(0.0, -8.0),
        );
        assert_eq!(b.center(), Vec2::new(100.0, 100.0));
        assert_eq!(b.sprite(), Sprite::PlayerBullet);
    }

    #[test]
    fn test_kind_capabilities() {
        assert!(EntityKind::Bullet.is_projectile());
        assert!(!EntityKind::Bomb.is_projectile());
        assert!(!EntityKind::Explosion.collidable());
        assert!(!EntityKind::Bullet.explodes());
        assert!(EntityKind::Mine.explodes());
        assert!(EntityKind::Mine.detonates_on_contact());
        assert!(!EntityKind::Fighter.detonates_on_contact());
        assert_eq!(EntityKind::Scout.fire_policy(), FirePolicy::None);
        assert_eq!(EntityKind::Gunship.fire_policy().interval_ms(), Some(2500));
    }
}
