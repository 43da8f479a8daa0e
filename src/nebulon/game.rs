//! Nebulon game state machine
//!
//! `Title -> Playing -> Title`. While playing, a nested machine runs
//! `ReadyScreen -> HandleLevel -> Running`, with `Respawning` between a
//! player death and the next ready screen. The host calls
//! [`NebulonGame::frame`] once per animation frame; the background scrolls
//! every frame regardless of state.

use glam::Vec2;

use super::entity::{Entity, EntityKind, Faction};
use super::wave::Level;
use super::world::{GameTimer, World, WorldEvent};
use crate::geom::Rect;
use crate::input::NebulonInput;
use crate::render::{Color, Renderer, Sprite};
use crate::sched::TimerHandle;
use crate::settings::NebulonSettings;

const BOMB_SPEED: f32 = 6.0;
const HUD_TEXT: f32 = 16.0;
const BAR_WIDTH: f32 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NebulonPhase {
    Title,
    Playing,
}

/// Sub-state while playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// Blinking "READY" label for a fixed time
    ReadyScreen,
    /// Set up the next level if needed and spawn the player
    HandleLevel,
    Running,
    /// Player destroyed, waiting out the respawn delay
    Respawning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NebulonEvent {
    Started,
    LevelStarted { level: u32 },
    LevelCleared { level: u32 },
    EnemyDestroyed { kind: EntityKind, points: u32 },
    PlayerDestroyed { lives_left: u32 },
    BombDropped,
    PowerActivated,
    GameOver { score: u64 },
}

pub struct NebulonGame {
    settings: NebulonSettings,
    phase: NebulonPhase,
    play: PlayState,
    world: World,
    level: Option<Level>,
    level_number: u32,
    score: u64,
    last_score: Option<u64>,
    lives: u32,
    bombs: u32,
    power: u32,
    background_offset: f32,
    ready_visible: bool,
    ready_blink: Option<TimerHandle>,
    ready_done: Option<TimerHandle>,
    respawn: Option<TimerHandle>,
    power_timer: Option<TimerHandle>,
    events: Vec<NebulonEvent>,
}

impl NebulonGame {
    pub fn new(settings: NebulonSettings, seed: u64) -> Self {
        let bounds = Rect::new(0.0, 0.0, settings.canvas_width, settings.canvas_height);
        Self {
            phase: NebulonPhase::Title,
            play: PlayState::ReadyScreen,
            world: World::new(bounds, seed),
            level: None,
            level_number: 0,
            score: 0,
            last_score: None,
            lives: settings.lives,
            bombs: settings.bombs_per_life,
            power: 0,
            background_offset: 0.0,
            ready_visible: false,
            ready_blink: None,
            ready_done: None,
            respawn: None,
            power_timer: None,
            events: Vec::new(),
            settings,
        }
    }

    pub fn phase(&self) -> NebulonPhase {
        self.phase
    }

    pub fn play_state(&self) -> PlayState {
        self.play
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn bombs(&self) -> u32 {
        self.bombs
    }

    pub fn power(&self) -> u32 {
        self.power
    }

    pub fn level_number(&self) -> u32 {
        self.level_number
    }

    pub fn drain_events(&mut self) -> Vec<NebulonEvent> {
        std::mem::take(&mut self.events)
    }

    /// Run one animation frame of `dt_ms`
    pub fn frame(&mut self, dt_ms: u64, input: &NebulonInput, renderer: &mut dyn Renderer) {
        self.scroll_background(dt_ms, renderer);
        match self.phase {
            NebulonPhase::Title => self.title_tick(input, renderer),
            NebulonPhase::Playing => self.play_tick(dt_ms, input, renderer),
        }
    }

    /// Start a new game
    pub fn start(&mut self) {
        self.reset();
        self.phase = NebulonPhase::Playing;
        self.events.push(NebulonEvent::Started);
        log::info!("Nebulon started with {} lives", self.lives);
        self.enter_ready();
    }

    fn reset(&mut self) {
        self.world.reset();
        self.level = None;
        self.level_number = 0;
        self.score = 0;
        self.lives = self.settings.lives;
        self.bombs = self.settings.bombs_per_life;
        self.power = 0;
        self.ready_visible = false;
        self.ready_blink = None;
        self.ready_done = None;
        self.respawn = None;
        self.power_timer = None;
    }

    fn scroll_background(&mut self, dt_ms: u64, renderer: &mut dyn Renderer) {
        let h = self.settings.canvas_height;
        let w = self.settings.canvas_width;
        self.background_offset =
            (self.background_offset + self.settings.scroll_speed * dt_ms as f32 / 1000.0) % h;
        renderer.clear(Color::Background);
        renderer.draw_image(
            Sprite::Background,
            Rect::new(0.0, self.background_offset - h, w, h),
        );
        renderer.draw_image(Sprite::Background, Rect::new(0.0, self.background_offset, w, h));
    }

    fn title_tick(&mut self, input: &NebulonInput, renderer: &mut dyn Renderer) {
        let center = Vec2::new(self.settings.canvas_width / 2.0, self.settings.canvas_height / 2.0);
        renderer.draw_text("NEBULON", center - Vec2::new(0.0, 40.0), 36.0, Color::Highlight);
        renderer.draw_text("PRESS ENTER", center, 20.0, Color::Text);
        if let Some(score) = self.last_score {
            renderer.draw_text(
                &format!("LAST SCORE {score}"),
                center + Vec2::new(0.0, 40.0),
                HUD_TEXT,
                Color::Dim,
            );
        }
        if input.start {
            self.start();
        }
    }

    fn play_tick(&mut self, dt_ms: u64, input: &NebulonInput, renderer: &mut dyn Renderer) {
        self.render_hud(renderer);
        self.apply_input(input);

        for event in self.world.update(dt_ms) {
            self.handle_world_event(event);
            if self.phase != NebulonPhase::Playing {
                return;
            }
        }
        self.world.render(renderer);

        match self.play {
            PlayState::ReadyScreen => {
                if self.ready_visible {
                    let center = Vec2::new(
                        self.settings.canvas_width / 2.0,
                        self.settings.canvas_height / 2.0,
                    );
                    renderer.draw_text("READY", center, 28.0, Color::Highlight);
                }
            }
            PlayState::HandleLevel => self.handle_level(),
            PlayState::Running => self.running_tick(),
            PlayState::Respawning => {}
        }
    }

    fn apply_input(&mut self, input: &NebulonInput) {
        let Some(player) = self.world.player() else {
            return;
        };
        let direction = input.direction();
        if direction == Vec2::ZERO {
            self.world.stop(player);
        } else {
            self.world
                .move_in_vector(player, direction * self.settings.player_speed);
        }

        if input.bomb {
            self.drop_bomb();
        }
        if input.power {
            self.activate_power();
        }
    }

    fn drop_bomb(&mut self) {
        if self.bombs == 0 {
            return;
        }
        let Some(player) = self.world.player_entity() else {
            return;
        };
        let rect = player.rect();
        let muzzle = Vec2::new(rect.center().x, rect.y);
        self.bombs -= 1;
        self.world.spawn(Entity::bullet(
            EntityKind::Bomb,
            Faction::Allied,
            muzzle,
            Vec2::new(0.0, -BOMB_SPEED),
        ));
        self.events.push(NebulonEvent::BombDropped);
        log::debug!("bomb dropped, {} left", self.bombs);
    }

    /// Spend a full power meter on temporary invincibility
    fn activate_power(&mut self) {
        if self.power < self.settings.power_max {
            return;
        }
        let Some(player) = self.world.player_entity_mut() else {
            return;
        };
        player.invincible = true;
        self.power = 0;
        self.world.cancel(&mut self.power_timer);
        self.power_timer = Some(
            self.world
                .schedule_game(self.settings.power_duration_ms, GameTimer::PowerEnd),
        );
        self.events.push(NebulonEvent::PowerActivated);
        log::info!("power activated");
    }

    fn handle_world_event(&mut self, event: WorldEvent) {
        match event {
            WorldEvent::Destroyed {
                kind: EntityKind::Player,
                ..
            } => self.player_destroyed(),
            WorldEvent::Destroyed {
                kind,
                faction: Faction::Enemy,
                score_value,
                ..
            } if kind.is_enemy_ship() => {
                self.score += u64::from(score_value);
                self.power = (self.power + score_value).min(self.settings.power_max);
                self.events.push(NebulonEvent::EnemyDestroyed {
                    kind,
                    points: score_value,
                });
            }
            WorldEvent::Destroyed { .. } | WorldEvent::PathComplete(_) => {}
            WorldEvent::Timer(GameTimer::ReadyBlink) => self.ready_visible = !self.ready_visible,
            WorldEvent::Timer(GameTimer::ReadyDone) => {
                self.world.cancel(&mut self.ready_blink);
                self.ready_done = None;
                self.ready_visible = false;
                self.play = PlayState::HandleLevel;
            }
            WorldEvent::Timer(GameTimer::Respawn) => {
                self.respawn = None;
                self.enter_ready();
            }
            WorldEvent::Timer(GameTimer::PowerEnd) => {
                self.power_timer = None;
                if let Some(player) = self.world.player_entity_mut() {
                    player.invincible = false;
                }
            }
        }
    }

    fn enter_ready(&mut self) {
        self.play = PlayState::ReadyScreen;
        self.ready_visible = true;
        self.world.cancel(&mut self.respawn);
        self.world.cancel(&mut self.ready_blink);
        self.world.cancel(&mut self.ready_done);
        self.ready_blink = Some(
            self.world
                .schedule_game_repeating(self.settings.ready_blink_ms, GameTimer::ReadyBlink),
        );
        self.ready_done = Some(
            self.world
                .schedule_game(self.settings.ready_ms, GameTimer::ReadyDone),
        );
    }

    /// Create the next level when there is none to resume, then put the
    /// player on the field
    fn handle_level(&mut self) {
        let resume = self.level.as_ref().is_some_and(|l| !l.is_cleared());
        if !resume {
            self.level_number += 1;
            let mut level = Level::generate(self.level_number, self.world.bounds);
            level.begin(&mut self.world);
            self.level = Some(level);
            self.events.push(NebulonEvent::LevelStarted {
                level: self.level_number,
            });
            log::info!("level {} started", self.level_number);
        }
        if self.world.player().is_none() {
            self.spawn_player();
        }
        self.play = PlayState::Running;
    }

    fn spawn_player(&mut self) {
        let size = EntityKind::Player.stats().size;
        let pos = Vec2::new(
            (self.settings.canvas_width - size.x) / 2.0,
            self.settings.canvas_height - size.y - 24.0,
        );
        let player = Entity::player(
            pos,
            self.settings.player_health,
            self.settings.player_fire_ms,
        );
        let id = self.world.spawn(player);
        self.world.start_firing(id);
        self.bombs = self.settings.bombs_per_life;
    }

    fn running_tick(&mut self) {
        let Some(level) = self.level.as_mut() else {
            self.play = PlayState::HandleLevel;
            return;
        };
        level.on_tick(&mut self.world);
        if level.is_cleared() {
            let number = level.number;
            self.events.push(NebulonEvent::LevelCleared { level: number });
            self.enter_ready();
        }
    }

    fn player_destroyed(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        self.world.cancel(&mut self.power_timer);
        self.events.push(NebulonEvent::PlayerDestroyed {
            lives_left: self.lives,
        });

        if self.lives == 0 {
            self.game_over();
            return;
        }
        log::info!("player destroyed, {} lives left", self.lives);
        self.world.cancel(&mut self.ready_blink);
        self.world.cancel(&mut self.ready_done);
        self.play = PlayState::Respawning;
        self.respawn = Some(
            self.world
                .schedule_game(self.settings.respawn_delay_ms, GameTimer::Respawn),
        );
    }

    fn game_over(&mut self) {
        let score = self.score;
        log::info!("Nebulon over with score {score}");
        self.events.push(NebulonEvent::GameOver { score });
        self.reset();
        self.last_score = Some(score);
        self.phase = NebulonPhase::Title;
    }

    /// Score, shield, power, lives and bombs
    fn render_hud(&self, renderer: &mut dyn Renderer) {
        renderer.draw_text(
            &format!("SCORE {}", self.score),
            Vec2::new(10.0, 20.0),
            HUD_TEXT,
            Color::Text,
        );

        let shield = self
            .world
            .player_entity()
            .map(|p| p.health.max(0) as f32 / self.settings.player_health.max(1) as f32)
            .unwrap_or(0.0);
        self.render_bar(renderer, "SHIELD", Vec2::new(10.0, 40.0), shield, Color::Cyan);

        let power = self.power as f32 / self.settings.power_max.max(1) as f32;
        let power_color = if self.power >= self.settings.power_max {
            Color::Highlight
        } else {
            Color::Purple
        };
        self.render_bar(renderer, "POWER", Vec2::new(10.0, 60.0), power, power_color);

        let right = self.settings.canvas_width - 100.0;
        renderer.draw_text(
            &format!("LIVES {}", self.lives),
            Vec2::new(right, 20.0),
            HUD_TEXT,
            Color::Text,
        );
        renderer.draw_text(
            &format!("BOMBS {}", self.bombs),
            Vec2::new(right, 40.0),
            HUD_TEXT,
            Color::Text,
        );
    }

    fn render_bar(
        &self,
        renderer: &mut dyn Renderer,
        label: &str,
        pos: Vec2,
        fill: f32,
        color: Color,
    ) {
        renderer.draw_text(label, pos, HUD_TEXT * 0.75, Color::Dim);
        let frame = Rect::new(pos.x + 60.0, pos.y - 10.0, BAR_WIDTH, 10.0);
        renderer.stroke_rect(frame, Color::Dim);
        renderer.fill_rect(
            Rect::new(frame.x, frame.y, BAR_WIDTH * fill.clamp(0.0, 1.0), frame.h),
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DrawCall, NullRenderer, RecordingRenderer};

    const FRAME: u64 = 16;

    fn defaults() -> NebulonSettings {
        NebulonSettings::default()
    }

    fn run(game: &mut NebulonGame, ms: u64) {
        let input = NebulonInput::default();
        for _ in 0..ms.div_ceil(FRAME) {
            game.frame(FRAME, &input, &mut NullRenderer);
        }
    }

    fn started() -> NebulonGame {
        let mut game = NebulonGame::new(NebulonSettings::default(), 11);
        let input = NebulonInput {
            start: true,
            ..Default::default()
        };
        game.frame(FRAME, &input, &mut NullRenderer);
        game
    }

    fn running() -> NebulonGame {
        let mut game = started();
        run(&mut game, defaults().ready_ms);
        assert_eq!(game.play_state(), PlayState::Running);
        game.drain_events();
        game
    }

    fn kill_player(game: &mut NebulonGame) {
        if let Some(player) = game.world.player_entity_mut() {
            player.alive = false;
        }
        run(game, FRAME);
    }

    #[test]
    fn test_title_waits_for_start() {
        let mut game = NebulonGame::new(NebulonSettings::default(), 1);
        run(&mut game, 1000);
        assert_eq!(game.phase(), NebulonPhase::Title);
        assert!(game.world().arena.is_empty());
    }

    #[test]
    fn test_ready_screen_leads_to_first_level() {
        let mut game = started();
        assert_eq!(game.phase(), NebulonPhase::Playing);
        assert_eq!(game.play_state(), PlayState::ReadyScreen);
        assert!(game.world().player().is_none());

        run(&mut game, defaults().ready_ms);
        assert_eq!(game.play_state(), PlayState::Running);
        assert_eq!(game.level_number(), 1);
        assert!(game.world().player().is_some());
        assert!(game
            .drain_events()
            .contains(&NebulonEvent::LevelStarted { level: 1 }));
    }

    #[test]
    fn test_ready_label_blinks() {
        let mut game = started();
        let mut shown = Vec::new();
        let input = NebulonInput::default();
        for _ in 0..40 {
            let mut renderer = RecordingRenderer::new();
            game.frame(FRAME, &input, &mut renderer);
            shown.push(renderer.texts().contains(&"READY"));
        }
        assert!(shown.contains(&true));
        assert!(shown.contains(&false));
    }

    #[test]
    fn test_hud_draws_before_entities() {
        let mut game = running();
        let mut renderer = RecordingRenderer::new();
        game.frame(FRAME, &NebulonInput::default(), &mut renderer);

        let hud = renderer
            .position(|c| matches!(c, DrawCall::Text(s, _, _) if s.starts_with("SCORE")));
        let player = renderer.position(|c| matches!(c, DrawCall::Image(Sprite::Player, _)));
        let background = renderer.position(|c| matches!(c, DrawCall::Image(Sprite::Background, _)));
        assert!(background < hud);
        assert!(hud.is_some() && player.is_some());
        assert!(hud < player);
        for label in ["SHIELD", "POWER"] {
            assert!(renderer.texts().contains(&label));
        }
    }

    #[test]
    fn test_player_death_respawns_then_ends() {
        let mut game = running();
        let lives = game.lives();

        kill_player(&mut game);
        assert_eq!(game.lives(), lives - 1);
        assert_eq!(game.play_state(), PlayState::Respawning);
        assert!(game.world().player().is_none());

        run(&mut game, defaults().respawn_delay_ms);
        assert_eq!(game.play_state(), PlayState::ReadyScreen);
        run(&mut game, defaults().ready_ms);
        assert_eq!(game.play_state(), PlayState::Running);
        assert!(game.world().player().is_some());
        // The interrupted level resumes
        assert_eq!(game.level_number(), 1);

        for _ in 1..lives {
            kill_player(&mut game);
            if game.phase() == NebulonPhase::Title {
                break;
            }
            run(&mut game, defaults().respawn_delay_ms + defaults().ready_ms);
        }
        assert_eq!(game.phase(), NebulonPhase::Title);
        assert_eq!(game.lives(), game.settings.lives);
        assert!(game.world().arena.is_empty());
        assert!(game
            .drain_events()
            .iter()
            .any(|e| matches!(e, NebulonEvent::GameOver { .. })));
    }

    #[test]
    fn test_kill_scores_once_and_charges_power() {
        let mut game = started();
        let scout = game
            .world
            .spawn(Entity::enemy(EntityKind::Scout, Vec2::new(100.0, 100.0)));
        if let Some(e) = game.world.arena.get_mut(scout) {
            e.alive = false;
        }
        run(&mut game, FRAME);
        assert_eq!(game.score(), 10);
        assert_eq!(game.power(), 10);

        run(&mut game, 500);
        assert_eq!(game.score(), 10);
        let kills = game
            .drain_events()
            .iter()
            .filter(|e| matches!(e, NebulonEvent::EnemyDestroyed { .. }))
            .count();
        assert_eq!(kills, 1);
    }

    #[test]
    fn test_bombs_are_limited() {
        let mut game = running();
        let input = NebulonInput {
            bomb: true,
            ..Default::default()
        };
        let stock = game.bombs();
        for _ in 0..stock + 2 {
            game.frame(FRAME, &input, &mut NullRenderer);
        }
        assert_eq!(game.bombs(), 0);
        let dropped = game
            .drain_events()
            .iter()
            .filter(|e| **e == NebulonEvent::BombDropped)
            .count();
        assert_eq!(dropped as u32, stock);
    }

    #[test]
    fn test_power_grants_timed_invincibility() {
        let mut game = running();
        let input = NebulonInput {
            power: true,
            ..Default::default()
        };

        // Not charged yet
        game.frame(FRAME, &input, &mut NullRenderer);
        assert!(game.world().player_entity().is_some_and(|p| !p.invincible));

        game.power = game.settings.power_max;
        game.frame(FRAME, &input, &mut NullRenderer);
        assert_eq!(game.power(), 0);
        assert!(game.world().player_entity().is_some_and(|p| p.invincible));

        run(&mut game, defaults().power_duration_ms);
        assert!(game.world().player_entity().is_some_and(|p| !p.invincible));
    }

    #[test]
    fn test_player_moves_with_input() {
        let mut game = running();
        let x = game.world().player_entity().map(|p| p.pos.x).unwrap_or_default();
        let input = NebulonInput {
            left: true,
            ..Default::default()
        };
        for _ in 0..10 {
            game.frame(FRAME, &input, &mut NullRenderer);
        }
        let moved = game.world().player_entity().map(|p| p.pos.x).unwrap_or_default();
        assert!(moved < x);
    }

    #[test]
    fn test_cleared_level_advances() {
        let mut game = running();
        let mut empty = Level::new(1, Vec::new());
        empty.begin(&mut game.world);
        game.level = Some(empty);

        run(&mut game, FRAME);
        assert_eq!(game.play_state(), PlayState::ReadyScreen);
        assert!(game
            .drain_events()
            .contains(&NebulonEvent::LevelCleared { level: 1 }));

        run(&mut game, defaults().ready_ms);
        assert_eq!(game.level_number(), 2);
        assert_eq!(game.play_state(), PlayState::Running);
    }
}
