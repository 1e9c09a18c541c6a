/// Keyboard input: event draining and key mapping.
///
/// Tracks which direction keys are held so holding an arrow keeps the
/// player moving at tick rate, while every other key is edge-triggered and
/// mapped to exactly one action.
///
/// Release events are honored when the renderer managed to push crossterm's
/// keyboard enhancement flags. Other terminals fall back to timeout-based
/// release detection.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use mazechase::domain::entity::MoveDir;
use mazechase::sim::command::Command;
use mazechase::sim::world::{Mode, Phase};

/// After this long without a Press/Repeat event, a key counts as released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// What a key press asks the driver to do.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UiAction {
    Game(Command),
    StartGame(Mode),
    /// Leave the game-over screen.
    Dismiss,
    Quit,
}

pub struct InputState {
    /// Last Press/Repeat time per key.
    last_active: HashMap<KeyCode, Instant>,

    /// Press events from the most recent drain, in arrival order.
    pub presses: Vec<KeyEvent>,

    /// Only honor Release events once keyboard enhancement is confirmed.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            presses: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events without blocking.
    /// Call once per frame.
    pub fn drain_events(&mut self) {
        self.presses.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            let Ok(Event::Key(key)) = event::read() else { continue };
            self.record(key);
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn record(&mut self, key: KeyEvent) {
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            KeyEventKind::Repeat => {
                self.last_active.insert(key.code, Instant::now());
            }
            KeyEventKind::Press => {
                self.last_active.insert(key.code, Instant::now());
                self.presses.push(key);
            }
        }
    }

    /// Most recently pressed direction key still held.
    pub fn held_direction(&self) -> Option<MoveDir> {
        self.last_active
            .iter()
            .filter(|(_, t)| t.elapsed() < HOLD_TIMEOUT)
            .filter_map(|(code, t)| direction_of(*code).map(|dir| (dir, *t)))
            .max_by_key(|(_, t)| *t)
            .map(|(dir, _)| dir)
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.presses.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }
}

pub fn direction_of(code: KeyCode) -> Option<MoveDir> {
    match code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(MoveDir::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(MoveDir::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(MoveDir::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(MoveDir::Right),
        _ => None,
    }
}

/// Map one key press to an action for the current phase.
pub fn map_key(key: &KeyEvent, phase: Phase) -> Option<UiAction> {
    let code = match key.code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    };

    match phase {
        Phase::Menu => match code {
            KeyCode::Char('1') => Some(UiAction::StartGame(Mode::Escape)),
            KeyCode::Char('2') => Some(UiAction::StartGame(Mode::Hunter)),
            KeyCode::Char('q') | KeyCode::Esc => Some(UiAction::Quit),
            _ => None,
        },
        Phase::GameOver => match code {
            KeyCode::Char('r') => Some(UiAction::Game(Command::Restart)),
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => Some(UiAction::Dismiss),
            _ => None,
        },
        Phase::Running | Phase::Paused => {
            if let Some(dir) = direction_of(code) {
                return Some(UiAction::Game(Command::Move(dir)));
            }
            let command = match code {
                KeyCode::Tab => Command::ToggleRun,
                KeyCode::Char(' ') => Command::PlaceTrap,
                KeyCode::Char('p') => Command::TogglePause,
                KeyCode::Char('r') => Command::Restart,
                KeyCode::Char('q') => Command::EndHunt,
                KeyCode::Esc => Command::Abandon,
                _ => return None,
            };
            Some(UiAction::Game(command))
        }
    }
}
