//! Waves and levels
//!
//! A [`Wave`] is a scripted group of enemies with their entry paths. It only
//! keeps the ids of the enemies it spawned, for the clear check; the world
//! simulates them like any other entity. A [`Level`] runs its waves one at a
//! time, in order.

use std::collections::VecDeque;

use glam::Vec2;

use super::arena::EntityId;
use super::entity::{Entity, EntityKind};
use super::world::World;
use crate::geom::Rect;

/// How a spawned enemy enters the canvas
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Walk waypoints, then roam
    Path(Vec<Vec2>),
    /// Constant drift (mines)
    Drift(Vec2),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spawn {
    pub kind: EntityKind,
    pub start: Vec2,
    pub entry: Entry,
    pub speed: f32,
    /// Added to the kind's default health
    pub health_bonus: i32,
}

impl Spawn {
    pub fn on_path(kind: EntityKind, start: Vec2, path: Vec<Vec2>, speed: f32) -> Self {
        Self {
            kind,
            start,
            entry: Entry::Path(path),
            speed,
            health_bonus: 0,
        }
    }

    pub fn drifting(kind: EntityKind, start: Vec2, velocity: Vec2) -> Self {
        Self {
            kind,
            start,
            entry: Entry::Drift(velocity),
            speed: velocity.length(),
            health_bonus: 0,
        }
    }
}

/// When a wave counts as cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClearCondition {
    /// Every listed enemy is gone
    #[default]
    AllDestroyed,
    /// At most this many listed enemies remain
    Remaining(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    spawns: Vec<Spawn>,
    enemies: Vec<EntityId>,
    clear: ClearCondition,
}

impl Wave {
    pub fn new(spawns: Vec<Spawn>) -> Self {
        Self {
            spawns,
            enemies: Vec::new(),
            clear: ClearCondition::default(),
        }
    }

    pub fn with_clear(mut self, clear: ClearCondition) -> Self {
        self.clear = clear;
        self
    }

    pub fn spawns(&self) -> &[Spawn] {
        &self.spawns
    }

    pub fn enemies(&self) -> &[EntityId] {
        &self.enemies
    }

    /// Add every enemy to the world, then start their entries
    pub fn begin(&mut self, world: &mut World) {
        let mut entering = Vec::with_capacity(self.spawns.len());
        for spawn in &self.spawns {
            let mut enemy = Entity::enemy(spawn.kind, spawn.start);
            enemy.health += spawn.health_bonus;
            let id = world.spawn(enemy);
            self.enemies.push(id);
            entering.push((id, spawn));
        }
        for (id, spawn) in entering {
            match &spawn.entry {
                Entry::Path(path) => {
                    if let Some(enemy) = world.arena.get_mut(id) {
                        enemy.roam_after_path = true;
                    }
                    if !world.move_path(id, path.clone(), spawn.speed) {
                        world.enable_roam(id);
                    }
                }
                Entry::Drift(velocity) => world.move_in_vector(id, *velocity),
            }
        }
    }

    pub fn remaining(&self, world: &World) -> usize {
        self.enemies.iter().filter(|id| world.is_alive(**id)).count()
    }

    pub fn is_cleared_condition_met(&self, world: &World) -> bool {
        let remaining = self.remaining(world);
        match self.clear {
            ClearCondition::AllDestroyed => remaining == 0,
            ClearCondition::Remaining(n) => remaining <= n,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub number: u32,
    pending: VecDeque<Wave>,
    current: Option<Wave>,
    /// Enemies of earlier waves still alive when their wave cleared
    stragglers: Vec<EntityId>,
    /// Waves begun so far
    started: usize,
    cleared: bool,
}

impl Level {
    pub fn new(number: u32, waves: Vec<Wave>) -> Self {
        Self {
            number,
            pending: waves.into(),
            current: None,
            stragglers: Vec::new(),
            started: 0,
            cleared: false,
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    pub fn current(&self) -> Option<&Wave> {
        self.current.as_ref()
    }

    pub fn waves_started(&self) -> usize {
        self.started
    }

    pub fn waves_left(&self) -> usize {
        self.pending.len()
    }

    /// Start the first wave; a level without waves is cleared at once
    pub fn begin(&mut self, world: &mut World) {
        self.advance(world);
    }

    /// Enemies spawned by this level that are still alive
    pub fn remaining(&self, world: &World) -> usize {
        let stragglers = self.stragglers.iter().filter(|id| world.is_alive(**id)).count();
        stragglers + self.current.as_ref().map_or(0, |wave| wave.remaining(world))
    }

    /// Per-tick check of the running wave. After the last wave the level
    /// only clears once every enemy it spawned is gone.
    pub fn on_tick(&mut self, world: &mut World) {
        if self.cleared {
            return;
        }
        let done = self
            .current
            .as_ref()
            .is_none_or(|wave| wave.is_cleared_condition_met(world));
        if !done || (self.pending.is_empty() && self.remaining(world) > 0) {
            return;
        }
        self.advance(world);
    }

    fn advance(&mut self, world: &mut World) {
        if let Some(wave) = self.current.take() {
            self.stragglers
                .extend(wave.enemies.iter().copied().filter(|id| world.is_alive(*id)));
        }
        self.stragglers.retain(|id| world.is_alive(*id));
        match self.pending.pop_front() {
            Some(mut wave) => {
                self.started += 1;
                log::info!(
                    "level {} wave {} ({} enemies)",
                    self.number,
                    self.started,
                    wave.spawns.len()
                );
                wave.begin(world);
                self.current = Some(wave);
            }
            None => {
                log::info!("level {} cleared", self.number);
                self.current = None;
                self.cleared = true;
            }
        }
    }

    /// Scripted level `number` for a canvas of `bounds`. Later levels have
    /// more waves, more enemies per wave and tougher enemies.
    pub fn generate(number: u32, bounds: Rect) -> Self {
        let n = number.max(1);
        let wave_count = (2 + n as usize).min(6);
        let tier = Tier {
            extra: ((n - 1) / 2).min(4) as usize,
            health_bonus: ((n - 1) / 3) as i32,
            speed: (3.0 + 0.25 * (n - 1) as f32).min(6.0),
        };
        let waves = (0..wave_count)
            .map(|i| {
                let template = TEMPLATES[(n as usize - 1 + i) % TEMPLATES.len()];
                template.build(bounds, &tier)
            })
            .collect();
        Self::new(n, waves)
    }
}

struct Tier {
    extra: usize,
    health_bonus: i32,
    speed: f32,
}

#[derive(Debug, Clone, Copy)]
enum Template {
    /// Scouts dropping in a column, fanning out into a row
    ColumnDive,
    /// Fighters settling into a V
    VFormation,
    /// Scouts sweeping in from both sides
    Pincer,
    /// Mines drifting down
    Minefield,
    /// A gunship flanked by fighters
    Escort,
}

const TEMPLATES: [Template; 5] = [
    Template::ColumnDive,
    Template::VFormation,
    Template::Pincer,
    Template::Minefield,
    Template::Escort,
];

impl Template {
    fn build(self, bounds: Rect, tier: &Tier) -> Wave {
        let w = bounds.w;
        let mid = bounds.x + w / 2.0;
        let above = bounds.y - 48.0;
        let mut spawns = Vec::new();

        match self {
            Template::ColumnDive => {
                let count = 4 + tier.extra;
                let gap = w / (count + 1) as f32;
                for i in 0..count {
                    let start = Vec2::new(mid - 14.0, above - 40.0 * i as f32);
                    let slot = Vec2::new(bounds.x + gap * (i + 1) as f32 - 14.0, 80.0);
                    spawns.push(Spawn::on_path(
                        EntityKind::Scout,
                        start,
                        vec![Vec2::new(mid - 14.0, 200.0), slot],
                        tier.speed,
                    ));
                }
            }
            Template::VFormation => {
                let count = 3 + tier.extra;
                for i in 0..count {
                    let side = if i % 2 == 0 { 1.0 } else { -1.0 };
                    let rank = (i + 1) / 2;
                    let x = mid - 16.0 + side * 56.0 * rank as f32;
                    let y = 160.0 - 36.0 * rank as f32;
                    spawns.push(Spawn::on_path(
                        EntityKind::Fighter,
                        Vec2::new(x, above),
                        vec![Vec2::new(x, y)],
                        tier.speed,
                    ));
                }
            }
            Template::Pincer => {
                let per_side = 2 + tier.extra / 2;
                for i in 0..per_side {
                    let y = 60.0 + 40.0 * i as f32;
                    let left_start = Vec2::new(bounds.x - 40.0, y);
                    let right_start = Vec2::new(bounds.right() + 12.0, y);
                    spawns.push(Spawn::on_path(
                        EntityKind::Scout,
                        left_start,
                        vec![Vec2::new(mid - 60.0, y + 120.0), Vec2::new(mid - 100.0, y)],
                        tier.speed,
                    ));
                    spawns.push(Spawn::on_path(
                        EntityKind::Scout,
                        right_start,
                        vec![Vec2::new(mid + 32.0, y + 120.0), Vec2::new(mid + 72.0, y)],
                        tier.speed,
                    ));
                }
            }
            Template::Minefield => {
                let count = 5 + tier.extra;
                for i in 0..count {
                    // Spread across the width without a random source
                    let frac = ((i * 7) % count) as f32 / count as f32;
                    let x = bounds.x + 10.0 + frac * (w - 40.0);
                    let start = Vec2::new(x, above - 60.0 * i as f32);
                    spawns.push(Spawn::drifting(
                        EntityKind::Mine,
                        start,
                        Vec2::new(0.0, 1.0 + tier.speed / 6.0),
                    ));
                }
            }
            Template::Escort => {
                spawns.push(Spawn::on_path(
                    EntityKind::Gunship,
                    Vec2::new(mid - 24.0, above - 20.0),
                    vec![Vec2::new(mid - 24.0, 100.0)],
                    tier.speed * 0.6,
                ));
                let wings = 2 + tier.extra / 2;
                for i in 0..wings {
                    let side = if i % 2 == 0 { -1.0 } else { 1.0 };
                    let x = mid - 16.0 + side * (70.0 + 40.0 * (i / 2) as f32);
                    spawns.push(Spawn::on_path(
                        EntityKind::Fighter,
                        Vec2::new(x, above),
                        vec![Vec2::new(x, 130.0)],
                        tier.speed,
                    ));
                }
            }
        }

        for spawn in &mut spawns {
            spawn.health_bonus = tier.health_bonus;
        }
        let wave = Wave::new(spawns);
        match self {
            // The next wave comes in while the last pincer straggler roams
            Template::Pincer => wave.with_clear(ClearCondition::Remaining(1)),
            _ => wave,
        }
    }
}
