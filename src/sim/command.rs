/// Commands from the controller to the core.
///
/// Commands are queued with `WorldState::submit` and drained at the start
/// of the next tick. Commands that make no sense in the current phase or
/// mode are dropped without effect.

use crate::domain::entity::MoveDir;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Move(MoveDir),
    /// Flip between walking and running for subsequent moves.
    ToggleRun,
    /// Escape mode only.
    PlaceTrap,
    Pause,
    Resume,
    TogglePause,
    /// New maze, same mode and player.
    Restart,
    /// Drop the session and go back to the menu. Nothing is recorded.
    Abandon,
    /// Hunter mode only: stop hunting and bank the current score.
    EndHunt,
}
