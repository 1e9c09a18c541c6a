/// WorldState: one game session and everything it owns.
///
/// ## Lifecycle
///
///   Menu → Running ⇄ Paused → GameOver → Menu
///
/// `start_game` generates a maze and enters `Running`; `restart` swaps in a
/// fresh maze for the same mode and player; `abandon` drops everything and
/// returns to `Menu`. Ticks only advance the simulation while `Running`.
///
/// ## Ownership
///
/// The grid and all entities belong to this struct alone. Randomness comes
/// from the world's own RNG and time from its injected clock, sampled once
/// per tick into `now`.

use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::RulesConfig;
use crate::domain::clock::Clock;
use crate::domain::entity::{Enemy, Player};
use crate::domain::grid::Grid;
use crate::domain::tile::{manhattan, Position, Tile, TileKind};
use super::command::Command;
use super::event::GameEvent;
use super::generator::{MazeGenerator, MazeResult};
use super::scores::ScoreRecord;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum Mode {
    /// Reach an exit while enemies chase you.
    Escape,
    /// Catch fleeing enemies before they reach an exit.
    Hunter,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Escape, Mode::Hunter];

    pub fn label(self) -> &'static str {
        match self {
            Mode::Escape => "ESCAPE",
            Mode::Hunter => "HUNTER",
        }
    }

    /// Enemies advance on every Nth tick.
    pub fn enemy_period(self, rules: &RulesConfig) -> u64 {
        match self {
            Mode::Escape => rules.escape_enemy_period,
            Mode::Hunter => rules.hunter_enemy_period,
        }
    }

    pub fn enemies_flee(self) -> bool {
        self == Mode::Hunter
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum Phase {
    Menu,
    Running,
    Paused,
    GameOver,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum Outcome {
    /// Escape mode: the player reached an exit.
    Won,
    /// Escape mode: an enemy reached the player.
    Caught,
    /// Hunter mode: the player stopped the hunt.
    Ended,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GameResult {
    pub outcome: Outcome,
    pub score: u32,
    pub elapsed: Duration,
}

pub struct WorldState {
    pub rules: RulesConfig,
    clock: Box<dyn Clock>,
    rng: StdRng,

    // ── Session ──
    pub phase: Phase,
    pub mode: Mode,
    pub player_name: String,
    pub result: Option<GameResult>,

    // ── Map ──
    pub grid: Grid,
    pub exits: Vec<Position>,
    pub used_fallback: bool,

    // ── Entities ──
    pub player: Player,
    pub enemies: Vec<Enemy>,
    next_enemy_id: usize,

    // ── Input ──
    pub running: bool,
    pending: VecDeque<Command>,

    // ── Time ──
    pub tick: u64,
    pub started_at: Duration,
    pub now: Duration,
}

// ── Construction ──

impl WorldState {
    pub fn new(rules: RulesConfig, clock: Box<dyn Clock>) -> Self {
        Self::with_rng(rules, clock, StdRng::from_entropy())
    }

    /// Seeded world, for reproducible tests.
    pub fn with_seed(rules: RulesConfig, clock: Box<dyn Clock>, seed: u64) -> Self {
        Self::with_rng(rules, clock, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rules: RulesConfig, clock: Box<dyn Clock>, rng: StdRng) -> Self {
        let now = clock.now();
        let player = Player::new(Position::new(0, 0), &rules);
        WorldState {
            rules,
            clock,
            rng,
            phase: Phase::Menu,
            mode: Mode::Escape,
            player_name: String::new(),
            result: None,
            grid: Grid::filled(0, 0, Tile::Wall),
            exits: vec![],
            used_fallback: false,
            player,
            enemies: vec![],
            next_enemy_id: 0,
            running: false,
            pending: VecDeque::new(),
            tick: 0,
            started_at: now,
            now,
        }
    }
}

// ── Session lifecycle ──

impl WorldState {
    /// Generate a maze and start playing.
    pub fn start_game(&mut self, mode: Mode, player_name: &str) {
        let maze = MazeGenerator::with_rng(&self.rules, &mut self.rng).generate();
        self.start_with_maze(mode, player_name, maze);
    }

    /// Start on a prepared maze. Enemies are still placed at random.
    pub fn start_with_maze(&mut self, mode: Mode, player_name: &str, maze: MazeResult) {
        self.mode = mode;
        self.player_name = player_name.trim().to_string();
        self.install_maze(maze);
        self.spawn_initial_enemies();
        tracing::info!(
            mode = mode.label(),
            player = %self.player_name,
            enemies = self.enemies.len(),
            fallback = self.used_fallback,
            "game started"
        );
    }

    /// Same mode and player, fresh maze.
    pub fn restart(&mut self) {
        let name = std::mem::take(&mut self.player_name);
        self.start_game(self.mode, &name);
    }

    /// Leave the session without recording anything.
    pub fn abandon(&mut self) {
        self.pending.clear();
        self.enemies.clear();
        self.result = None;
        self.phase = Phase::Menu;
        tracing::info!("session abandoned");
    }

    /// Acknowledge a finished game.
    pub fn return_to_menu(&mut self) {
        if self.phase == Phase::GameOver {
            self.phase = Phase::Menu;
        }
    }

    fn install_maze(&mut self, maze: MazeResult) {
        self.now = self.clock.now();
        self.started_at = self.now;
        self.tick = 0;
        self.running = false;
        self.pending.clear();
        self.result = None;
        self.used_fallback = maze.fallback;
        self.player = Player::new(maze.spawn, &self.rules);
        self.grid = maze.grid;
        self.exits = maze.exits;
        self.enemies.clear();
        self.next_enemy_id = 0;
        self.phase = Phase::Running;
    }

    /// End the game. Returns the event carrying the outcome and, when the
    /// session qualifies, the score record.
    pub fn finish(&mut self, outcome: Outcome) -> GameEvent {
        let result = GameResult { outcome, score: self.player.score, elapsed: self.elapsed() };
        self.result = Some(result);
        self.phase = Phase::GameOver;
        self.pending.clear();
        tracing::info!(
            mode = self.mode.label(),
            ?outcome,
            score = result.score,
            secs = result.elapsed.as_secs_f64(),
            "game over"
        );
        GameEvent::GameOver { outcome, score: result.score, record: self.score_record() }
    }

    /// Hunter sessions always record; escape sessions only when won.
    pub fn score_record(&self) -> Option<ScoreRecord> {
        let result = self.result?;
        if self.mode == Mode::Hunter || result.outcome == Outcome::Won {
            Some(ScoreRecord {
                player_name: self.player_name.clone(),
                score: result.score,
                mode: self.mode,
                date: super::scores::timestamp_now(),
            })
        } else {
            None
        }
    }
}

// ── Commands & time ──

impl WorldState {
    pub fn submit(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    pub(crate) fn drain_commands(&mut self) -> Vec<Command> {
        self.pending.drain(..).collect()
    }

    /// Read the clock once for this tick.
    pub(crate) fn sample_clock(&mut self) -> Duration {
        self.now = self.clock.now();
        self.now
    }

    pub fn elapsed(&self) -> Duration {
        self.now.saturating_sub(self.started_at)
    }
}

// ── Enemy placement ──

impl WorldState {
    pub fn living_enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.iter().filter(|e| e.alive)
    }

    /// Path cells satisfying `keep`, row-major.
    fn path_cells_where(&self, keep: impl Fn(Position) -> bool) -> Vec<Position> {
        self.grid
            .positions_of(TileKind::Path)
            .into_iter()
            .filter(|p| keep(*p))
            .collect()
    }

    /// Distinct Path cells at least `min_enemy_spawn_distance` from the
    /// player; any Path cell when none qualifies.
    fn spawn_initial_enemies(&mut self) {
        let player = self.player.pos;
        let min = self.rules.min_enemy_spawn_distance;
        let mut cells = self.path_cells_where(|p| manhattan(p, player) >= min);
        if cells.is_empty() {
            cells = self.path_cells_where(|p| p != player);
        }
        let count = self.rules.enemy_count.min(cells.len());
        let chosen: Vec<Position> = cells.choose_multiple(&mut self.rng, count).copied().collect();
        for pos in chosen {
            self.push_enemy(pos);
        }
    }

    fn push_enemy(&mut self, pos: Position) -> usize {
        let id = self.next_enemy_id;
        self.next_enemy_id += 1;
        self.enemies.push(Enemy::new(id, pos));
        id
    }

    /// Where a dead enemy may come back: a Path cell (so never a trap) at
    /// least `min_enemy_spawn_distance` from the player.
    pub(crate) fn respawn_cell(&mut self) -> Option<Position> {
        let player = self.player.pos;
        let min = self.rules.min_enemy_spawn_distance;
        let cells = self.path_cells_where(|p| manhattan(p, player) >= min);
        cells.choose(&mut self.rng).copied()
    }

    /// Add a fresh enemy strictly farther than `min_replacement_distance`
    /// from the player. None when no cell qualifies.
    pub(crate) fn spawn_replacement(&mut self) -> Option<(usize, Position)> {
        let player = self.player.pos;
        let min = self.rules.min_replacement_distance;
        let cells = self.path_cells_where(|p| manhattan(p, player) > min);
        let pos = *cells.choose(&mut self.rng)?;
        let id = self.push_enemy(pos);
        tracing::debug!(id, ?pos, "replacement enemy spawned");
        Some((id, pos))
    }

    /// Put an enemy at an exact cell. Used by tests and scripted setups.
    pub fn add_enemy_at(&mut self, pos: Position) -> usize {
        self.push_enemy(pos)
    }
}
