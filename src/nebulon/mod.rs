//! Nebulon, a vertical-scrolling shooter
//!
//! - `entity`: the single entity record, kinds and capabilities
//! - `arena`: generational storage with stable iteration order
//! - `motion`: vector, point and path movement programs
//! - `collision`: faction-aware hit detection and damage
//! - `world`: per-entity timer tracks, update pipeline, rendering
//! - `wave`: scripted waves and generated levels
//! - `game`: title/playing state machine, lives, HUD

pub mod arena;
pub mod collision;
pub mod entity;
pub mod game;
pub mod motion;
pub mod wave;
pub mod world;

pub use arena::{Arena, EntityId};
pub use entity::{Entity, EntityKind, Faction, FirePolicy};
pub use game::{NebulonEvent, NebulonGame, NebulonPhase, PlayState};
pub use motion::{Motion, MotionStatus};
pub use wave::{ClearCondition, Level, Spawn, Wave};
pub use world::{World, WorldEvent};
