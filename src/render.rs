//! Rendering sink
//!
//! The games own no pixels. Each frame they describe what to draw through
//! [`Renderer`]; the browser host maps the calls onto a 2D canvas context,
//! tests record them.

use glam::Vec2;

use crate::geom::Rect;

/// Named colours used by both games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Cyan,
    Blue,
    Orange,
    Yellow,
    Green,
    Purple,
    Red,
    Background,
    Grid,
    Text,
    Highlight,
    Dim,
}

impl Color {
    /// CSS colour string for canvas hosts
    pub fn css(&self) -> &'static str {
        match self {
            Color::Cyan => "#00f0f0",
            Color::Blue => "#0000f0",
            Color::Orange => "#f0a000",
            Color::Yellow => "#f0f000",
            Color::Green => "#00f000",
            Color::Purple => "#a000f0",
            Color::Red => "#f00000",
            Color::Background => "#111111",
            Color::Grid => "#222222",
            Color::Text => "#ffffff",
            Color::Highlight => "#ffd700",
            Color::Dim => "#777777",
        }
    }
}

/// Image handles. Asset loading belongs to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sprite {
    Background,
    Player,
    Scout,
    Fighter,
    Gunship,
    Mine,
    PlayerBullet,
    EnemyBullet,
    HomingBullet,
    Bomb,
    /// Explosion animation frame
    Explosion(u8),
}

impl Sprite {
    /// Asset key the host resolves to an image
    pub fn key(&self) -> &'static str {
        match self {
            Sprite::Background => "background",
            Sprite::Player => "player",
            Sprite::Scout => "scout",
            Sprite::Fighter => "fighter",
            Sprite::Gunship => "gunship",
            Sprite::Mine => "mine",
            Sprite::PlayerBullet => "bullet-player",
            Sprite::EnemyBullet => "bullet-enemy",
            Sprite::HomingBullet => "bullet-homing",
            Sprite::Bomb => "bomb",
            Sprite::Explosion(0) => "explosion-0",
            Sprite::Explosion(1) => "explosion-1",
            Sprite::Explosion(2) => "explosion-2",
            Sprite::Explosion(_) => "explosion-3",
        }
    }

    /// Every sprite with its own asset, explosion frames included
    pub fn all() -> Vec<Sprite> {
        let mut sprites = vec![
            Sprite::Background,
            Sprite::Player,
            Sprite::Scout,
            Sprite::Fighter,
            Sprite::Gunship,
            Sprite::Mine,
            Sprite::PlayerBullet,
            Sprite::EnemyBullet,
            Sprite::HomingBullet,
            Sprite::Bomb,
        ];
        sprites.extend((0..4).map(Sprite::Explosion));
        sprites
    }
}

/// Draw-call sink implemented by hosts
pub trait Renderer {
    fn clear(&mut self, color: Color);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_rect(&mut self, rect: Rect, color: Color);
    fn draw_image(&mut self, sprite: Sprite, rect: Rect);
    fn draw_text(&mut self, text: &str, pos: Vec2, size: f32, color: Color);
}

/// Discards everything (headless runs)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn clear(&mut self, _color: Color) {}
    fn fill_rect(&mut self, _rect: Rect, _color: Color) {}
    fn stroke_rect(&mut self, _rect: Rect, _color: Color) {}
    fn draw_image(&mut self, _sprite: Sprite, _rect: Rect) {}
    fn draw_text(&mut self, _text: &str, _pos: Vec2, _size: f32, _color: Color) {}
}

/// A recorded draw call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear(Color),
    FillRect(Rect, Color),
    StrokeRect(Rect, Color),
    Image(Sprite, Rect),
    Text(String, Vec2, Color),
}

/// Keeps every draw call of the current frame
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    pub calls: Vec<DrawCall>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.calls.clear();
    }

    /// All text drawn, in order
    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Text(s, _, _) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Index of the first call matching `pred`
    pub fn position(&self, pred: impl Fn(&DrawCall) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }
}

impl Renderer for RecordingRenderer {
    fn clear(&mut self, color: Color) {
        self.calls.push(DrawCall::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.calls.push(DrawCall::FillRect(rect, color));
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color) {
        self.calls.push(DrawCall::StrokeRect(rect, color));
    }

    fn draw_image(&mut self, sprite: Sprite, rect: Rect) {
        self.calls.push(DrawCall::Image(sprite, rect));
    }

    fn draw_text(&mut self, text: &str, pos: Vec2, _size: f32, color: Color) {
        self.calls.push(DrawCall::Text(text.to_string(), pos, color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_explosion_frame_has_an_asset() {
        let keys: HashSet<&str> = Sprite::all().iter().map(|s| s.key()).collect();
        assert_eq!(keys.len(), Sprite::all().len());
        for frame in 0..4 {
            assert!(keys.contains(Sprite::Explosion(frame).key()));
        }
    }
}
