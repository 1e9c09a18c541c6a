/// Grid: the rows × cols tile map owned by one session.
///
/// All tile mutations go through `set()`, `place_trap()` or `clear_trap()`.
/// Out-of-bounds reads return `Tile::Wall`, so callers never index past
/// the edge and never need to special-case the border.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use super::entity::MoveDir;
use super::tile::{Position, Tile, TileKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Vec<Tile>>,
}

impl Grid {
    pub fn filled(rows: usize, cols: usize, tile: Tile) -> Self {
        Grid { rows, cols, cells: vec![vec![tile; cols]; rows] }
    }

    /// Build a grid from symbol rows (see `TileKind::symbol`).
    /// Unknown symbols become walls; short rows are padded with walls.
    pub fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut grid = Grid::filled(height, width, Tile::Wall);
        for (r, line) in rows.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                grid.cells[r][c] = Tile::from_symbol(ch).unwrap_or(Tile::Wall);
            }
        }
        grid
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Is the cell on the outer ring of the grid?
    pub fn on_border(&self, pos: Position) -> bool {
        pos.row == 0 || pos.col == 0 || pos.row + 1 == self.rows || pos.col + 1 == self.cols
    }

    #[inline]
    pub fn get(&self, pos: Position) -> Tile {
        if self.in_bounds(pos) {
            self.cells[pos.row][pos.col]
        } else {
            Tile::Wall
        }
    }

    #[inline]
    pub fn set(&mut self, pos: Position, tile: Tile) {
        if self.in_bounds(pos) {
            self.cells[pos.row][pos.col] = tile;
        }
    }

    #[inline]
    pub fn kind_at(&self, pos: Position) -> TileKind {
        self.get(pos).kind()
    }

    /// In bounds and passable for the player.
    pub fn can_player_enter(&self, pos: Position) -> bool {
        self.in_bounds(pos) && self.get(pos).accessible_by_player()
    }

    /// In bounds and passable for enemies.
    pub fn can_enemy_enter(&self, pos: Position) -> bool {
        self.in_bounds(pos) && self.get(pos).accessible_by_enemy()
    }

    /// The in-bounds neighbour in `dir`, if any.
    pub fn neighbor(&self, pos: Position, dir: MoveDir) -> Option<Position> {
        let (dr, dc) = dir.delta();
        pos.offset(dr, dc).filter(|p| self.in_bounds(*p))
    }

    /// Every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows).flat_map(move |r| (0..self.cols).map(move |c| Position::new(r, c)))
    }

    /// Positions of a given kind, row-major.
    pub fn positions_of(&self, kind: TileKind) -> Vec<Position> {
        self.positions().filter(|p| self.kind_at(*p) == kind).collect()
    }

    pub fn count_of(&self, kind: TileKind) -> usize {
        self.positions().filter(|p| self.kind_at(*p) == kind).count()
    }

    /// Turn a Path cell into an armed trap. Any other kind is left untouched.
    pub fn place_trap(&mut self, pos: Position, now: Duration) -> bool {
        if !self.get(pos).is_path() {
            return false;
        }
        self.set(pos, Tile::Trap { active: true, placed_at: now });
        true
    }

    /// Revert a trap back to Path.
    pub fn clear_trap(&mut self, pos: Position) -> bool {
        if self.kind_at(pos) != TileKind::Trap {
            return false;
        }
        self.set(pos, Tile::Path);
        true
    }

    /// Stateless copy of the tile layout for rendering.
    pub fn kinds(&self) -> Vec<Vec<TileKind>> {
        self.cells.iter().map(|row| row.iter().map(|t| t.kind()).collect()).collect()
    }

    /// Cells reachable by the player from `start`, 4-directional BFS.
    /// `visited[r][c]` is true for every reached cell, including `start`.
    pub fn player_reachable(&self, start: Position) -> Vec<Vec<bool>> {
        let mut visited = vec![vec![false; self.cols]; self.rows];
        if !self.in_bounds(start) {
            return visited;
        }
        visited[start.row][start.col] = true;

        let mut queue = VecDeque::with_capacity(self.rows * self.cols);
        queue.push_back(start);
        while let Some(cur) = queue.pop_front() {
            for dir in MoveDir::ALL {
                if let Some(next) = self.neighbor(cur, dir) {
                    if !visited[next.row][next.col] && self.get(next).accessible_by_player() {
                        visited[next.row][next.col] = true;
                        queue.push_back(next);
                    }
                }
            }
        }
        visited
    }

    /// Can the player walk from `start` to any of `targets`?
    pub fn player_can_reach_any(&self, start: Position, targets: &[Position]) -> bool {
        let visited = self.player_reachable(start);
        targets.iter().any(|t| self.in_bounds(*t) && visited[t.row][t.col])
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            let line: String = row.iter().map(|t| t.kind().symbol()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_reads_as_wall() {
        let g = Grid::from_rows(&["..", ".."]);
        assert_eq!(g.get(Position::new(5, 5)), Tile::Wall);
        assert!(!g.can_player_enter(Position::new(2, 0)));
        assert!(!g.can_enemy_enter(Position::new(0, 2)));
    }

    #[test]
    fn entry_rules_follow_tile_kind() {
        let g = Grid::from_rows(&[".vtE#^"]);
        let at = |c| Position::new(0, c);
        assert!(g.can_player_enter(at(0)) && g.can_enemy_enter(at(0)));
        assert!(!g.can_player_enter(at(1)) && g.can_enemy_enter(at(1)));
        assert!(g.can_player_enter(at(2)) && !g.can_enemy_enter(at(2)));
        assert!(g.can_player_enter(at(3)) && !g.can_enemy_enter(at(3)));
        assert!(!g.can_player_enter(at(4)) && !g.can_enemy_enter(at(4)));
        assert!(g.can_player_enter(at(5)) && g.can_enemy_enter(at(5)));
    }

    #[test]
    fn trap_only_on_path() {
        let mut g = Grid::from_rows(&[".#E"]);
        let now = Duration::from_secs(7);
        assert!(g.place_trap(Position::new(0, 0), now));
        assert_eq!(g.get(Position::new(0, 0)), Tile::Trap { active: true, placed_at: now });
        assert!(!g.place_trap(Position::new(0, 0), now), "already a trap");
        assert!(!g.place_trap(Position::new(0, 1), now));
        assert!(!g.place_trap(Position::new(0, 2), now));
        assert!(!g.place_trap(Position::new(3, 3), now));

        assert!(g.clear_trap(Position::new(0, 0)));
        assert_eq!(g.kind_at(Position::new(0, 0)), TileKind::Path);
        assert!(!g.clear_trap(Position::new(0, 0)));
    }

    #[test]
    fn reachability_uses_player_rules() {
        // Vine blocks the player; tunnel lets them through.
        let g = Grid::from_rows(&[
            "#####",
            "#.v.E",
            "#.t.#",
            "#####",
        ]);
        let start = Position::new(1, 1);
        assert!(g.player_can_reach_any(start, &[Position::new(1, 4)]));

        let blocked = Grid::from_rows(&[
            "#####",
            "#.v.E",
            "#.#.#",
            "#####",
        ]);
        assert!(!blocked.player_can_reach_any(start, &[Position::new(1, 4)]));
        let visited = blocked.player_reachable(start);
        assert!(visited[1][1] && visited[2][1]);
        assert!(!visited[1][3]);
    }

    #[test]
    fn display_dumps_symbols() {
        let g = Grid::from_rows(&["#.E", "vt^"]);
        assert_eq!(g.to_string(), "#.E\nvt^\n");
    }

    #[test]
    fn border_detection() {
        let g = Grid::filled(4, 5, Tile::Wall);
        assert!(g.on_border(Position::new(0, 2)));
        assert!(g.on_border(Position::new(3, 2)));
        assert!(g.on_border(Position::new(2, 4)));
        assert!(!g.on_border(Position::new(2, 2)));
    }
}
