/// Entry point and terminal game loop.
///
/// The loop drains keyboard input every frame, queues commands on the
/// world, steps the simulation on `tick_rate_ms` and renders a snapshot.
/// Everything game-related lives in the library; this file only wires
/// the terminal, the clock and the score files to it.

mod ui;

use std::time::{Duration, Instant};

use mazechase::config::GameConfig;
use mazechase::domain::clock::MonotonicClock;
use mazechase::sim::command::Command;
use mazechase::sim::event::GameEvent;
use mazechase::sim::scores::HighScores;
use mazechase::sim::step;
use mazechase::sim::world::{Phase, WorldState};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use ui::input::{InputState, UiAction};
use ui::renderer::{Renderer, Screen};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "mazechase.log";

fn main() {
    // The terminal belongs to the game, so logs go to a file.
    setup_logging();

    let config = GameConfig::load();
    let player_name = resolve_player_name(std::env::args().nth(1), &config.player_name);

    let mut world = WorldState::new(config.rules.clone(), Box::new(MonotonicClock::new()));
    let mut scores = HighScores::load(&config.scores_dir).unwrap_or_else(|e| {
        tracing::warn!("{e}; starting with empty score tables");
        HighScores::default()
    });

    let mut renderer = Renderer::new();
    let key_release = match renderer.init() {
        Ok(supported) => supported,
        Err(e) => {
            eprintln!("Terminal init failed: {e}");
            return;
        }
    };

    let mut kb = InputState::new();
    kb.honor_release = key_release;
    let result = game_loop(&mut world, &mut scores, &mut renderer, &mut kb, &config, &player_name);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        tracing::error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Maze Chase!");
}

/// A blank command-line name falls back to the configured one, and a
/// blank configured name to "player".
fn resolve_player_name(arg: Option<String>, configured: &str) -> String {
    [arg.as_deref().unwrap_or(""), configured]
        .into_iter()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or("player")
        .to_string()
}

fn setup_logging() {
    let file_appender = tracing_appender::rolling::never(".", LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    // Keep the writer alive for the whole process.
    std::mem::forget(guard);
}

fn game_loop(
    world: &mut WorldState,
    scores: &mut HighScores,
    renderer: &mut Renderer,
    kb: &mut InputState,
    config: &GameConfig,
    player_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick_rate = Duration::from_millis(config.tick_rate_ms);
    let mut last_tick = Instant::now();
    let mut message = String::new();
    // A fresh press always moves once, even when tapped between ticks.
    let mut pressed_move = false;

    loop {
        kb.drain_events();
        if kb.ctrl_c_pressed() {
            break;
        }

        for key in kb.presses.clone() {
            let Some(action) = ui::input::map_key(&key, world.phase) else { continue };
            match action {
                UiAction::Quit => return Ok(()),
                UiAction::StartGame(mode) => {
                    world.start_game(mode, player_name);
                    message.clear();
                    if world.used_fallback {
                        message = "Maze generation fell back to the default layout".to_string();
                    }
                    last_tick = Instant::now();
                }
                UiAction::Dismiss => {
                    world.return_to_menu();
                    message.clear();
                }
                UiAction::Game(command) => {
                    if matches!(command, Command::Move(_)) {
                        pressed_move = true;
                    }
                    world.submit(command);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            // Held direction keys keep moving between key-repeat events.
            if world.phase == Phase::Running && !pressed_move {
                if let Some(dir) = kb.held_direction() {
                    world.submit(Command::Move(dir));
                }
            }
            pressed_move = false;

            let events = step::step(world);
            handle_events(&events, scores, config, &mut message);
            last_tick = Instant::now();
        }

        let snapshot = world.snapshot();
        renderer.render(&Screen {
            snapshot: &snapshot,
            scores: &*scores,
            result: world.result,
            message: &message,
        })?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn handle_events(events: &[GameEvent], scores: &mut HighScores, config: &GameConfig, message: &mut String) {
    for event in events {
        match event {
            GameEvent::TrapRejected => *message = "Can't place a trap here yet".to_string(),
            GameEvent::EnemyTrapped { .. } => *message = "Trapped one!".to_string(),
            GameEvent::EnemyEscaped { .. } => *message = "One got away...".to_string(),
            GameEvent::Restarted | GameEvent::Abandoned => message.clear(),
            GameEvent::GameOver { record: Some(record), .. } => {
                match HighScores::merge_record(&config.scores_dir, record.clone()) {
                    Ok(merged) => *scores = merged,
                    Err(e) => {
                        tracing::error!("{e}");
                        *message = "Could not save the high score".to_string();
                        scores.add(record.clone());
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_name_prefers_a_non_blank_argument() {
        assert_eq!(resolve_player_name(Some("  ana ".into()), "cfg"), "ana");
        assert_eq!(resolve_player_name(Some("".into()), "cfg"), "cfg");
        assert_eq!(resolve_player_name(Some("   ".into()), " cfg "), "cfg");
        assert_eq!(resolve_player_name(None, "cfg"), "cfg");
        assert_eq!(resolve_player_name(None, ""), "player");
    }
}
