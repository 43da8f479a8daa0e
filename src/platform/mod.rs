//! Browser host
//!
//! Draws through a `CanvasRenderingContext2d`, feeds keyboard events to the
//! active game and drives it from `requestAnimationFrame`. The page picks
//! the game with the location hash (`#tetris`, anything else is Nebulon).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, KeyboardEvent};

use crate::consts::MAX_FRAME_MS;
use crate::geom::Rect;
use crate::highscores::HighScores;
use crate::input::{NebulonInput, NebulonKey, TetrisIntent};
use crate::nebulon::NebulonGame;
use crate::render::{Color, Renderer, Sprite};
use crate::settings::Settings;
use crate::tetris::game::CELL_SIZE;
use crate::tetris::{TetrisEvent, TetrisGame};

/// Canvas width reserved right of the Tetris board
const SIDEBOARD_WIDTH: u32 = 220;

/// Renderer over a 2D canvas context
pub struct CanvasRenderer {
    ctx: CanvasRenderingContext2d,
    width: f64,
    height: f64,
    images: HashMap<&'static str, HtmlImageElement>,
}

impl CanvasRenderer {
    pub fn new(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self {
            ctx,
            width: f64::from(canvas.width()),
            height: f64::from(canvas.height()),
            images: HashMap::new(),
        })
    }

    /// Start loading `assets/<key>.png` for every sprite
    pub fn load_sprites(&mut self, sprites: &[Sprite]) {
        for sprite in sprites {
            let key = sprite.key();
            if self.images.contains_key(key) {
                continue;
            }
            match HtmlImageElement::new() {
                Ok(img) => {
                    img.set_src(&format!("assets/{key}.png"));
                    self.images.insert(key, img);
                }
                Err(e) => log::warn!("Cannot create image for {}: {:?}", key, e),
            }
        }
    }

    /// Stand-in colour while an image is missing
    fn fallback_color(sprite: Sprite) -> Color {
        match sprite {
            Sprite::Background => Color::Background,
            Sprite::Player | Sprite::PlayerBullet => Color::Cyan,
            Sprite::Scout => Color::Green,
            Sprite::Fighter => Color::Orange,
            Sprite::Gunship => Color::Purple,
            Sprite::Mine | Sprite::Bomb => Color::Yellow,
            Sprite::EnemyBullet | Sprite::HomingBullet => Color::Red,
            Sprite::Explosion(_) => Color::Highlight,
        }
    }
}

impl Renderer for CanvasRenderer {
    fn clear(&mut self, color: Color) {
        self.ctx.set_fill_style_str(color.css());
        self.ctx.fill_rect(0.0, 0.0, self.width, self.height);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ctx.set_fill_style_str(color.css());
        self.ctx.fill_rect(
            f64::from(rect.x),
            f64::from(rect.y),
            f64::from(rect.w),
            f64::from(rect.h),
        );
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color) {
        self.ctx.set_stroke_style_str(color.css());
        self.ctx.stroke_rect(
            f64::from(rect.x),
            f64::from(rect.y),
            f64::from(rect.w),
            f64::from(rect.h),
        );
    }

    fn draw_image(&mut self, sprite: Sprite, rect: Rect) {
        let drawn = self
            .images
            .get(sprite.key())
            .filter(|img| img.complete() && img.natural_width() > 0)
            .is_some_and(|img| {
                self.ctx
                    .draw_image_with_html_image_element_and_dw_and_dh(
                        img,
                        f64::from(rect.x),
                        f64::from(rect.y),
                        f64::from(rect.w),
                        f64::from(rect.h),
                    )
                    .is_ok()
            });
        if !drawn && sprite != Sprite::Background {
            self.fill_rect(rect, Self::fallback_color(sprite));
        }
    }

    fn draw_text(&mut self, text: &str, pos: Vec2, size: f32, color: Color) {
        self.ctx.set_fill_style_str(color.css());
        self.ctx.set_font(&format!("{size}px monospace"));
        let _ = self.ctx.fill_text(text, f64::from(pos.x), f64::from(pos.y));
    }
}

enum Active {
    Tetris(TetrisGame),
    Nebulon(Box<NebulonGame>, NebulonInput),
}

struct Host {
    active: Active,
    renderer: CanvasRenderer,
    last_time: f64,
}

impl Host {
    fn key_down(&mut self, key: &str) {
        match &mut self.active {
            Active::Tetris(game) => {
                if let Some(intent) = TetrisIntent::from_key(key) {
                    game.handle_intent(intent);
                }
            }
            Active::Nebulon(_, input) => {
                if let Some(key) = NebulonKey::from_key(key) {
                    input.key_down(key);
                }
            }
        }
    }

    fn key_up(&mut self, key: &str) {
        if let Active::Nebulon(_, input) = &mut self.active {
            if let Some(key) = NebulonKey::from_key(key) {
                input.key_up(key);
            }
        }
    }

    fn frame(&mut self, time: f64) {
        let dt = if self.last_time > 0.0 {
            (time - self.last_time).clamp(0.0, MAX_FRAME_MS as f64)
        } else {
            0.0
        };
        self.last_time = time;
        let dt_ms = dt as u64;

        match &mut self.active {
            Active::Tetris(game) => {
                game.tick(dt_ms);
                for event in game.drain_events() {
                    if let TetrisEvent::NewHighScore { score } = event {
                        let name = prompt_name(score);
                        let date = String::from(js_sys::Date::new_0().to_iso_string());
                        if let Err(e) = game.submit_name(&name, &date) {
                            log::warn!("Score not recorded: {}", e);
                        }
                    }
                }
                game.render(&mut self.renderer);
            }
            Active::Nebulon(game, input) => {
                game.frame(dt_ms, input, &mut self.renderer);
                input.clear_one_shots();
            }
        }
    }
}

fn prompt_name(score: u64) -> String {
    web_sys::window()
        .and_then(|w| {
            w.prompt_with_message(&format!("New high score {score}! Your name:"))
                .ok()
                .flatten()
        })
        .unwrap_or_default()
}

/// Boot the host on the page's `#canvas`
pub fn run() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas: HtmlCanvasElement = document
        .get_element_by_id("canvas")
        .ok_or_else(|| JsValue::from_str("no canvas"))?
        .dyn_into()?;

    let mut settings = Settings::load();
    if let Err(e) = settings.validate() {
        log::warn!("Invalid settings ({}), using defaults", e);
        settings = Settings::default();
    }

    let seed = js_sys::Date::now() as u64;
    let hash = window.location().hash().unwrap_or_default();
    let active = if hash == "#tetris" {
        let cell = CELL_SIZE as u32;
        canvas.set_width(settings.tetris.columns as u32 * cell + SIDEBOARD_WIDTH);
        canvas.set_height(settings.tetris.rows as u32 * cell);
        log::info!("Starting Tetris with seed {}", seed);
        Active::Tetris(TetrisGame::new(
            settings.tetris.clone(),
            Box::new(HighScores::load()),
            seed,
        ))
    } else {
        canvas.set_width(settings.nebulon.canvas_width as u32);
        canvas.set_height(settings.nebulon.canvas_height as u32);
        log::info!("Starting Nebulon with seed {}", seed);
        Active::Nebulon(
            Box::new(NebulonGame::new(settings.nebulon.clone(), seed)),
            NebulonInput::default(),
        )
    };

    let mut renderer = CanvasRenderer::new(&canvas)?;
    renderer.load_sprites(&Sprite::all());

    let host = Rc::new(RefCell::new(Host {
        active,
        renderer,
        last_time: 0.0,
    }));

    setup_key_handlers(&window, host.clone())?;
    request_animation_frame(host);
    Ok(())
}

fn setup_key_handlers(window: &web_sys::Window, host: Rc<RefCell<Host>>) -> Result<(), JsValue> {
    {
        let host = host.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let key = event.key();
            if matches!(key.as_str(), " " | "ArrowUp" | "ArrowDown" | "ArrowLeft" | "ArrowRight") {
                event.prevent_default();
            }
            host.borrow_mut().key_down(&key);
        });
        window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            host.borrow_mut().key_up(&event.key());
        });
        window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}

fn request_animation_frame(host: Rc<RefCell<Host>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::once(move |time: f64| {
        host.borrow_mut().frame(time);
        request_animation_frame(host);
    });
    let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
    closure.forget();
}
