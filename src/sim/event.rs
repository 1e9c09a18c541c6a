/// Events emitted during a simulation step.
/// The presentation layer consumes these for messages and score persistence.

use crate::domain::tile::Position;
use super::scores::ScoreRecord;
use super::world::Outcome;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PlayerMoved { to: Position },
    MoveRejected,
    RunToggled { running: bool },
    TrapPlaced { at: Position },
    TrapRejected,
    EnemyRespawned { id: usize, at: Position },
    EnemySpawned { id: usize, at: Position },
    EnemyCaptured { id: usize, at: Position },
    EnemyTrapped { id: usize, at: Position },
    EnemyEscaped { id: usize, at: Position },
    PlayerCaught { by: usize },
    PlayerEscaped { score: u32 },
    Paused,
    Resumed,
    Restarted,
    Abandoned,
    GameOver { outcome: Outcome, score: u32, record: Option<ScoreRecord> },
}
