pub mod ai;
pub mod clock;
pub mod entity;
pub mod grid;
pub mod tile;
