/// Read-only view of the world for renderers.
///
/// Carries tile kinds rather than tiles, so trap timestamps and other
/// internal state never leak into the presentation layer.

use serde::Serialize;

use crate::domain::tile::{Position, TileKind};
use super::world::{Mode, Phase, WorldState};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnemyView {
    pub id: usize,
    pub pos: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub rows: usize,
    pub cols: usize,
    pub tiles: Vec<Vec<TileKind>>,
    pub player: Position,
    /// Living enemies only.
    pub enemies: Vec<EnemyView>,
    pub score: u32,
    pub stamina: u32,
    pub stamina_max: u32,
    pub active_traps: u32,
    pub max_traps: u32,
    pub running: bool,
    pub phase: Phase,
    pub mode: Mode,
    pub elapsed_secs: f64,
}

impl RenderSnapshot {
    pub fn tile(&self, pos: Position) -> TileKind {
        self.tiles
            .get(pos.row)
            .and_then(|r| r.get(pos.col))
            .copied()
            .unwrap_or(TileKind::Wall)
    }

    pub fn enemy_at(&self, pos: Position) -> bool {
        self.enemies.iter().any(|e| e.pos == pos)
    }
}

impl WorldState {
    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot {
            rows: self.grid.rows(),
            cols: self.grid.cols(),
            tiles: self.grid.kinds(),
            player: self.player.pos,
            enemies: self
                .living_enemies()
                .map(|e| EnemyView { id: e.id, pos: e.pos })
                .collect(),
            score: self.player.score,
            stamina: self.player.stamina,
            stamina_max: self.rules.stamina_max,
            active_traps: self.player.active_traps,
            max_traps: self.rules.max_active_traps,
            running: self.running,
            phase: self.phase,
            mode: self.mode,
            elapsed_secs: self.elapsed().as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::RulesConfig;
    use crate::domain::clock::ManualClock;
    use crate::sim::generator::fallback_maze;

    #[test]
    fn snapshot_reflects_world() {
        let clock = ManualClock::new();
        let rules = RulesConfig { enemy_count: 0, ..RulesConfig::default() };
        let mut w = WorldState::with_seed(rules, Box::new(clock.clone()), 3);
        w.start_with_maze(Mode::Hunter, "ana", fallback_maze(12, 18));
        w.add_enemy_at(Position::new(6, 1));
        let dead = w.add_enemy_at(Position::new(6, 2));
        w.enemies[dead].die(Duration::ZERO);
        w.player.score = 42;
        w.now = Duration::from_millis(2500);

        let s = w.snapshot();
        assert_eq!((s.rows, s.cols), (12, 18));
        assert_eq!(s.player, Position::new(6, 9));
        assert_eq!(s.enemies, vec![EnemyView { id: 0, pos: Position::new(6, 1) }]);
        assert!(s.enemy_at(Position::new(6, 1)));
        assert!(!s.enemy_at(Position::new(6, 2)));
        assert_eq!(s.tile(Position::new(0, 0)), TileKind::Exit);
        assert_eq!(s.tile(Position::new(40, 40)), TileKind::Wall);
        assert_eq!(s.score, 42);
        assert_eq!(s.stamina, s.stamina_max);
        assert_eq!(s.max_traps, 3);
        assert_eq!(s.phase, Phase::Running);
        assert_eq!(s.mode, Mode::Hunter);
        assert!((s.elapsed_secs - 2.5).abs() < 1e-9);
    }

    #[test]
    fn snapshot_hides_trap_state() {
        let clock = ManualClock::new();
        let rules = RulesConfig { enemy_count: 0, ..RulesConfig::default() };
        let mut w = WorldState::with_seed(rules, Box::new(clock.clone()), 3);
        w.start_with_maze(Mode::Escape, "ana", fallback_maze(12, 18));
        let pos = w.player.pos;
        assert!(w.grid.place_trap(pos, Duration::from_secs(1)));
        assert_eq!(w.snapshot().tile(pos), TileKind::Trap);
    }
}
