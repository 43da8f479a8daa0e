//! Nebulon & Tetris entry point
//!
//! In the browser this boots the canvas host. Natively there is no window,
//! so it plays both games headless for a while with scripted input and logs
//! what happened.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::error_1(&JsValue::from_str(&e.to_string()));
    }
    log::info!("Nebulon & Tetris starting...");
    nebulon_tetris::platform::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Nebulon & Tetris (native) starting headless demo");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(2024);
    let settings = nebulon_tetris::Settings::load();

    headless::tetris(&settings, seed);
    headless::nebulon(&settings, seed);
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use nebulon_tetris::consts::FRAME_MS;
    use nebulon_tetris::highscores::HighScores;
    use nebulon_tetris::input::{NebulonInput, TetrisIntent};
    use nebulon_tetris::nebulon::{NebulonEvent, NebulonGame, NebulonPhase};
    use nebulon_tetris::render::NullRenderer;
    use nebulon_tetris::settings::Settings;
    use nebulon_tetris::tetris::{TetrisEvent, TetrisGame, TetrisPhase};

    /// Frames to simulate per game (about two minutes)
    const FRAMES: u32 = 60 * 120;

    pub fn tetris(settings: &Settings, seed: u64) {
        let mut game = TetrisGame::new(settings.tetris.clone(), Box::new(HighScores::load()), seed);
        game.handle_intent(TetrisIntent::Start);

        let script = [
            TetrisIntent::Rotate,
            TetrisIntent::MoveLeft,
            TetrisIntent::MoveLeft,
            TetrisIntent::HardDrop,
            TetrisIntent::MoveRight,
            TetrisIntent::MoveRight,
            TetrisIntent::MoveRight,
            TetrisIntent::HardDrop,
        ];
        for frame in 0..FRAMES {
            if frame % 20 == 0 {
                game.handle_intent(script[(frame / 20) as usize % script.len()]);
            }
            game.tick(FRAME_MS);
            for event in game.drain_events() {
                if let TetrisEvent::NewHighScore { .. } = event {
                    if let Err(e) = game.submit_name("CPU", "headless") {
                        log::warn!("Score not recorded: {}", e);
                    }
                }
            }
            if game.phase() != TetrisPhase::Playing {
                break;
            }
        }
        game.render(&mut NullRenderer);

        let scoring = game.scoring();
        println!(
            "Tetris: score {} lines {} level {} ({:?})",
            scoring.score,
            scoring.lines,
            scoring.level,
            game.phase()
        );
    }

    pub fn nebulon(settings: &Settings, seed: u64) {
        let mut game = NebulonGame::new(settings.nebulon.clone(), seed);
        let mut input = NebulonInput {
            start: true,
            ..Default::default()
        };
        let mut kills = 0;

        for frame in 0..FRAMES {
            // Sweep left and right, bombing now and then
            let sweep = (frame / 90) % 2 == 0;
            input.left = sweep;
            input.right = !sweep;
            input.bomb = frame % 600 == 599;
            input.power = game.power() >= settings.nebulon.power_max;

            game.frame(FRAME_MS, &input, &mut NullRenderer);
            input.clear_one_shots();

            for event in game.drain_events() {
                match event {
                    NebulonEvent::EnemyDestroyed { .. } => kills += 1,
                    NebulonEvent::GameOver { score } => {
                        println!("Nebulon: game over with score {score}");
                    }
                    _ => {}
                }
            }
            if game.phase() == NebulonPhase::Title && frame > 0 {
                break;
            }
        }

        println!(
            "Nebulon: score {} level {} lives {} kills {}",
            game.score(),
            game.level_number(),
            game.lives(),
            kills
        );
    }
}
