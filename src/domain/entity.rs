/// Entities: Player and Enemy.
///
/// Every operation reports rejection with `false` and leaves state untouched,
/// so an invalid command simply produces no change for that tick.
/// Timers are stored as timestamps and compared against the tick's `now`.

use std::time::Duration;

use serde::Serialize;

use super::ai;
use super::grid::Grid;
use super::tile::Position;
use crate::config::RulesConfig;

/// Movement direction, one cell per step.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum MoveDir {
    Up,
    Down,
    Left,
    Right,
}

impl MoveDir {
    pub const ALL: [MoveDir; 4] = [MoveDir::Up, MoveDir::Down, MoveDir::Left, MoveDir::Right];

    /// (row delta, col delta)
    pub const fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Up    => (-1, 0),
            MoveDir::Down  => (1, 0),
            MoveDir::Left  => (0, -1),
            MoveDir::Right => (0, 1),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub pos: Position,
    pub stamina: u32,
    pub last_trap_at: Option<Duration>, // None: never placed
    pub active_traps: u32,
    pub score: u32,
    pub alive: bool,
}

impl Player {
    pub fn new(pos: Position, rules: &RulesConfig) -> Self {
        Player {
            pos,
            stamina: rules.stamina_max,
            last_trap_at: None,
            active_traps: 0,
            score: 0,
            alive: true,
        }
    }

    /// Move to `target`. Running costs stamina; without enough of it the
    /// move is refused outright rather than downgraded to a walk.
    pub fn try_move(&mut self, grid: &Grid, target: Position, running: bool, rules: &RulesConfig) -> bool {
        if !grid.can_player_enter(target) {
            return false;
        }
        if running {
            if self.stamina < rules.run_cost {
                return false;
            }
            self.stamina -= rules.run_cost;
        }
        self.pos = target;
        true
    }

    pub fn recover_stamina(&mut self, rules: &RulesConfig) {
        self.stamina = (self.stamina + rules.stamina_regen).min(rules.stamina_max);
    }

    pub fn can_place_trap(&self, now: Duration, rules: &RulesConfig) -> bool {
        if self.active_traps >= rules.max_active_traps {
            return false;
        }
        match self.last_trap_at {
            None => true,
            Some(at) => now.saturating_sub(at) >= rules.trap_cooldown(),
        }
    }

    /// Arm a trap on the player's own cell. Only Path cells take a trap.
    pub fn place_trap(&mut self, grid: &mut Grid, now: Duration, rules: &RulesConfig) -> bool {
        if !self.can_place_trap(now, rules) {
            return false;
        }
        if !grid.place_trap(self.pos, now) {
            return false;
        }
        self.active_traps += 1;
        self.last_trap_at = Some(now);
        true
    }

    /// One of this player's traps fired or was otherwise consumed.
    pub fn trap_consumed(&mut self) {
        self.active_traps = self.active_traps.saturating_sub(1);
    }

    pub fn award(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// Deduct points, floored at zero.
    pub fn penalize(&mut self, points: u32) {
        self.score = self.score.saturating_sub(points);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    pub id: usize,
    pub pos: Position,
    pub alive: bool,
    pub died_at: Option<Duration>,
    /// Hunter mode: set the first time this enemy reaches an exit.
    pub escaped: bool,
}

impl Enemy {
    pub fn new(id: usize, pos: Position) -> Self {
        Enemy { id, pos, alive: true, died_at: None, escaped: false }
    }

    /// Greedy single step toward (`flee == false`) or away from `target`.
    /// Returns whether the enemy moved. Dead enemies never move.
    pub fn move_toward_or_away(&mut self, grid: &Grid, target: Position, flee: bool) -> bool {
        if !self.alive {
            return false;
        }
        match ai::choose_step(grid, self.pos, target, flee) {
            Some(next) => {
                self.pos = next;
                true
            }
            None => false,
        }
    }

    pub fn die(&mut self, now: Duration) {
        self.alive = false;
        self.died_at = Some(now);
    }

    /// Dead for at least `delay`.
    pub fn can_respawn(&self, now: Duration, delay: Duration) -> bool {
        match (self.alive, self.died_at) {
            (false, Some(at)) => now.saturating_sub(at) >= delay,
            _ => false,
        }
    }

    pub fn revive(&mut self, pos: Position) {
        self.pos = pos;
        self.alive = true;
        self.died_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{Tile, TileKind};

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn corridor() -> Grid {
        Grid::from_rows(&[
            "#####",
            "#..v#",
            "#.t.#",
            "#####",
        ])
    }

    #[test]
    fn rejected_move_changes_nothing() {
        let rules = RulesConfig::default();
        let grid = corridor();
        let mut p = Player::new(Position::new(1, 1), &rules);
        p.score = 40;
        p.stamina = 55;
        let before = p.clone();

        assert!(!p.try_move(&grid, Position::new(0, 1), false, &rules), "wall");
        assert!(!p.try_move(&grid, Position::new(1, 3), true, &rules), "vine");
        assert!(!p.try_move(&grid, Position::new(9, 9), false, &rules), "out of bounds");
        assert_eq!(p, before);
    }

    #[test]
    fn running_costs_stamina() {
        let rules = RulesConfig::default();
        let grid = corridor();
        let mut p = Player::new(Position::new(1, 1), &rules);
        assert!(p.try_move(&grid, Position::new(1, 2), true, &rules));
        assert_eq!(p.stamina, rules.stamina_max - rules.run_cost);
        assert!(p.try_move(&grid, Position::new(2, 2), false, &rules), "tunnel, walking");
        assert_eq!(p.stamina, rules.stamina_max - rules.run_cost);
    }

    #[test]
    fn running_without_stamina_is_refused() {
        let rules = RulesConfig::default();
        let grid = corridor();
        let mut p = Player::new(Position::new(1, 1), &rules);
        p.stamina = rules.run_cost - 1;
        assert!(!p.try_move(&grid, Position::new(1, 2), true, &rules));
        assert_eq!(p.pos, Position::new(1, 1));
        assert_eq!(p.stamina, rules.run_cost - 1);
    }

    #[test]
    fn stamina_regen_is_capped() {
        let rules = RulesConfig::default();
        let mut p = Player::new(Position::new(1, 1), &rules);
        p.stamina = rules.stamina_max - 2;
        p.recover_stamina(&rules);
        assert_eq!(p.stamina, rules.stamina_max);
        p.stamina = 0;
        p.recover_stamina(&rules);
        assert_eq!(p.stamina, rules.stamina_regen);
    }

    #[test]
    fn trap_respects_cooldown() {
        let rules = RulesConfig::default();
        let mut grid = Grid::from_rows(&["...."]);
        let mut p = Player::new(Position::new(0, 0), &rules);

        assert!(p.place_trap(&mut grid, secs(1.0), &rules));
        p.pos = Position::new(0, 1);
        assert!(!p.place_trap(&mut grid, secs(5.9), &rules), "cooling down");
        assert_eq!(grid.kind_at(Position::new(0, 1)), TileKind::Path);
        assert!(p.place_trap(&mut grid, secs(6.0), &rules));
        assert_eq!(p.active_traps, 2);
    }

    #[test]
    fn trap_cap_blocks_further_placement() {
        let rules = RulesConfig::default();
        let mut grid = Grid::from_rows(&["......"]);
        let mut p = Player::new(Position::new(0, 0), &rules);
        let mut t = 0.0;
        for col in 0..rules.max_active_traps as usize {
            p.pos = Position::new(0, col);
            assert!(p.place_trap(&mut grid, secs(t), &rules));
            t += rules.trap_cooldown_secs;
        }
        p.pos = Position::new(0, 5);
        let before = grid.clone();
        assert!(!p.can_place_trap(secs(t + 100.0), &rules));
        assert!(!p.place_trap(&mut grid, secs(t + 100.0), &rules));
        assert_eq!(grid, before);

        p.trap_consumed();
        assert!(p.place_trap(&mut grid, secs(t + 100.0), &rules));
    }

    #[test]
    fn trap_needs_path_underfoot() {
        let rules = RulesConfig::default();
        let mut grid = Grid::from_rows(&["tE"]);
        let mut p = Player::new(Position::new(0, 0), &rules);
        assert!(!p.place_trap(&mut grid, secs(0.0), &rules));
        p.pos = Position::new(0, 1);
        assert!(!p.place_trap(&mut grid, secs(0.0), &rules));
        assert_eq!(p.active_traps, 0);
        assert_eq!(p.last_trap_at, None);
    }

    #[test]
    fn penalty_floors_at_zero() {
        let rules = RulesConfig::default();
        let mut p = Player::new(Position::new(0, 0), &rules);
        p.award(30);
        p.penalize(100);
        assert_eq!(p.score, 0);
    }

    #[test]
    fn dead_enemy_does_not_move() {
        let grid = corridor();
        let mut e = Enemy::new(0, Position::new(1, 1));
        e.die(secs(2.0));
        assert!(!e.move_toward_or_away(&grid, Position::new(2, 3), false));
        assert_eq!(e.pos, Position::new(1, 1));
    }

    #[test]
    fn respawn_after_exact_delay() {
        let delay = secs(10.0);
        let mut e = Enemy::new(0, Position::new(1, 1));
        assert!(!e.can_respawn(secs(50.0), delay), "alive");
        e.die(secs(3.0));
        assert!(!e.can_respawn(secs(12.999), delay));
        assert!(e.can_respawn(secs(13.0), delay));

        e.revive(Position::new(2, 1));
        assert!(e.alive);
        assert_eq!(e.died_at, None);
        assert_eq!(e.pos, Position::new(2, 1));
    }

    #[test]
    fn enemy_stays_on_enemy_tiles() {
        let grid = Grid::from_rows(&[
            "#####",
            "#tEv#",
            "#t.t#",
            "#####",
        ]);
        let mut e = Enemy::new(0, Position::new(2, 2));
        // Only (2,2) and the vine at (1,3) are enemy-passable; (1,3) is diagonal.
        assert!(!e.move_toward_or_away(&grid, Position::new(1, 2), false));
        assert_eq!(e.pos, Position::new(2, 2));
        assert_eq!(grid.get(e.pos), Tile::Path);
    }
}
