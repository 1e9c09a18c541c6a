/// Tile types, grid positions and the passability table.
/// Passability is a pure function of the tile kind, so tile semantics
/// are centralized here and never depend on who is asking.

use std::time::Duration;

use serde::Serialize;

/// A cell coordinate. `row` grows downward, `col` grows rightward.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }

    /// Apply a signed offset. Returns None when the result would go negative;
    /// the upper bound is the grid's business.
    pub fn offset(self, dr: i32, dc: i32) -> Option<Position> {
        let row = self.row as i64 + dr as i64;
        let col = self.col as i64 + dc as i64;
        if row < 0 || col < 0 {
            return None;
        }
        Some(Position::new(row as usize, col as usize))
    }
}

/// Sum of absolute row and column differences.
pub fn manhattan(a: Position, b: Position) -> usize {
    a.row.abs_diff(b.row) + a.col.abs_diff(b.col)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Wall,
    Path,
    Vine,   // enemy-only shortcut
    Tunnel, // player-only shortcut
    Exit,
    /// Player-placed; fires on the first living enemy that stands on it.
    Trap { active: bool, placed_at: Duration },
}

/// Stateless view of a tile, used for snapshots and kind comparisons.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum TileKind {
    Wall,
    Path,
    Vine,
    Tunnel,
    Exit,
    Trap,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Passability {
    pub player: bool,
    pub enemy: bool,
}

impl TileKind {
    pub const ALL: [TileKind; 6] = [
        TileKind::Wall,
        TileKind::Path,
        TileKind::Vine,
        TileKind::Tunnel,
        TileKind::Exit,
        TileKind::Trap,
    ];

    pub const fn passability(self) -> Passability {
        let (player, enemy) = match self {
            TileKind::Wall   => (false, false),
            TileKind::Path   => (true, true),
            TileKind::Vine   => (false, true),
            TileKind::Tunnel => (true, false),
            TileKind::Exit   => (true, false),
            TileKind::Trap   => (true, true),
        };
        Passability { player, enemy }
    }

    /// Single-character symbol used by text dumps and test fixtures.
    pub const fn symbol(self) -> char {
        match self {
            TileKind::Wall   => '#',
            TileKind::Path   => '.',
            TileKind::Vine   => 'v',
            TileKind::Tunnel => 't',
            TileKind::Exit   => 'E',
            TileKind::Trap   => '^',
        }
    }
}

impl Tile {
    pub fn kind(self) -> TileKind {
        match self {
            Tile::Wall      => TileKind::Wall,
            Tile::Path      => TileKind::Path,
            Tile::Vine      => TileKind::Vine,
            Tile::Tunnel    => TileKind::Tunnel,
            Tile::Exit      => TileKind::Exit,
            Tile::Trap { .. } => TileKind::Trap,
        }
    }

    pub fn accessible_by_player(self) -> bool {
        self.kind().passability().player
    }

    pub fn accessible_by_enemy(self) -> bool {
        self.kind().passability().enemy
    }

    pub fn is_path(self) -> bool {
        matches!(self, Tile::Path)
    }

    pub fn is_wall(self) -> bool {
        matches!(self, Tile::Wall)
    }

    /// An armed trap. Traps are placed armed; the flag exists so a trap
    /// can be disarmed without being removed.
    pub fn is_armed_trap(self) -> bool {
        matches!(self, Tile::Trap { active: true, .. })
    }

    /// Parse a fixture symbol. Traps parse as armed, placed at time zero.
    pub fn from_symbol(c: char) -> Option<Tile> {
        match c {
            '#' => Some(Tile::Wall),
            '.' => Some(Tile::Path),
            'v' => Some(Tile::Vine),
            't' => Some(Tile::Tunnel),
            'E' => Some(Tile::Exit),
            '^' => Some(Tile::Trap { active: true, placed_at: Duration::ZERO }),
            _ => None,
        }
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::Wall
    }
}
