/// Enemy AI: greedy one-step movement.
///
/// Looks only at the four neighbours of the current cell and picks the one
/// whose Manhattan distance to the target is smallest (chase) or largest
/// (flee). No lookahead: enemies can oscillate in dead ends or stall
/// against walls.

use super::entity::MoveDir;
use super::grid::Grid;
use super::tile::{manhattan, Position};

/// Neighbour examination order: +col, +row, -col, -row.
/// On equal distances the earlier direction wins.
pub const SCAN_ORDER: [MoveDir; 4] = [MoveDir::Right, MoveDir::Down, MoveDir::Left, MoveDir::Up];

/// Pick the next cell for an enemy at `from`. None when every neighbour is
/// out of bounds or closed to enemies.
pub fn choose_step(grid: &Grid, from: Position, target: Position, flee: bool) -> Option<Position> {
    let mut best: Option<(Position, usize)> = None;

    for dir in SCAN_ORDER {
        let Some(next) = grid.neighbor(from, dir) else { continue };
        if !grid.can_enemy_enter(next) {
            continue;
        }
        let dist = manhattan(next, target);
        let better = match best {
            None => true,
            Some((_, d)) if flee => dist > d,
            Some((_, d)) => dist < d,
        };
        if better {
            best = Some((next, dist));
        }
    }

    best.map(|(pos, _)| pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(rows: usize, cols: usize) -> Grid {
        let line = ".".repeat(cols);
        let rows: Vec<&str> = (0..rows).map(|_| line.as_str()).collect();
        Grid::from_rows(&rows)
    }

    #[test]
    fn chase_moves_closer() {
        let g = open(5, 5);
        let step = choose_step(&g, Position::new(2, 2), Position::new(2, 4), false);
        assert_eq!(step, Some(Position::new(2, 3)));
    }

    #[test]
    fn flee_moves_away() {
        let g = open(5, 5);
        let step = choose_step(&g, Position::new(2, 2), Position::new(2, 0), true);
        assert_eq!(step, Some(Position::new(2, 3)));
    }

    #[test]
    fn chase_tie_prefers_plus_col_then_plus_row() {
        let g = open(5, 5);
        // Target diagonal down-right: +col and +row both reduce distance equally.
        let step = choose_step(&g, Position::new(1, 1), Position::new(3, 3), false);
        assert_eq!(step, Some(Position::new(1, 2)));

        // Block +col: +row is next in order.
        let g = Grid::from_rows(&[".....", ".###.", ".....", ".....", "....."]);
        let step = choose_step(&g, Position::new(1, 0), Position::new(3, 3), false);
        assert_eq!(step, Some(Position::new(2, 0)));
    }

    #[test]
    fn flee_tie_prefers_first_in_order() {
        let g = open(5, 5);
        // Target directly on top of the enemy: every neighbour is distance 1.
        let step = choose_step(&g, Position::new(2, 2), Position::new(2, 2), true);
        assert_eq!(step, Some(Position::new(2, 3)));

        // Target up-left: -col/-row get closer, +col/+row are tied farthest.
        let step = choose_step(&g, Position::new(2, 2), Position::new(1, 1), true);
        assert_eq!(step, Some(Position::new(2, 3)));
    }

    #[test]
    fn greedy_may_step_away_when_blocked() {
        // Only neighbour is behind the enemy; chase still takes it.
        let g = Grid::from_rows(&["..#."]);
        let step = choose_step(&g, Position::new(0, 1), Position::new(0, 3), false);
        assert_eq!(step, Some(Position::new(0, 0)));
    }

    #[test]
    fn boxed_in_enemy_has_no_step() {
        let g = Grid::from_rows(&["###", "#.#", "#E#"]);
        assert_eq!(choose_step(&g, Position::new(1, 1), Position::new(2, 1), false), None);
    }

    #[test]
    fn never_steps_onto_player_only_tiles() {
        let g = Grid::from_rows(&["tEt", "t.v"]);
        let step = choose_step(&g, Position::new(1, 1), Position::new(0, 1), false);
        assert_eq!(step, Some(Position::new(1, 2)), "vine is the only enemy tile");
    }
}
