/// The step function: advances the world by one tick.
///
/// Processing order:
///   0. Sample the clock; drain queued commands (pause/resume/restart/... act
///      even while paused)
///   1. Paused or not running → stop here
///   2. Player input: trap placement, then the latest move
///   3. Contact at the player's new cell, then win (escape): player on an exit
///   4. Every Nth tick: enemies chase (escape) or flee (hunter); dead
///      enemies past their respawn delay come back
///   5. Contact again: escape → caught; hunter → capture + bonus
///   6. Traps (escape): an enemy on an armed trap dies, the trap clears
///   7. Exits (hunter): an enemy on an exit escapes once, costing points
///   8. Stamina regeneration
///
/// Checking contact before enemies move means a player can neither walk
/// into an enemy unharmed nor swap cells with one.
///
/// All timers compare against the single `now` sampled in step 0.

use std::time::Duration;

use crate::config::RulesConfig;
use crate::domain::entity::MoveDir;
use crate::domain::tile::TileKind;
use super::command::Command;
use super::event::GameEvent;
use super::world::{Mode, Outcome, Phase, WorldState};

/// Player intent gathered from this tick's commands.
#[derive(Clone, Copy, Debug, Default)]
struct FrameInput {
    movement: Option<MoveDir>,
    place_trap: bool,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    let now = world.sample_clock();

    let Some(input) = resolve_commands(world, &mut events) else { return events };
    if world.phase != Phase::Running { return events; }

    world.tick += 1;

    resolve_player_input(world, input, now, &mut events);
    if resolve_contact(world, now, &mut events) { return events; }
    if resolve_win(world, &mut events) { return events; }
    resolve_enemy_movement(world, now, &mut events);
    if resolve_contact(world, now, &mut events) { return events; }
    resolve_traps(world, now, &mut events);
    resolve_enemy_escapes(world, now, &mut events);
    world.player.recover_stamina(&world.rules);

    events
}

/// Final escape-mode score: time bonus decaying per second (floored), a
/// flat bonus per configured enemy, plus whatever was earned in the run.
pub fn escape_score(rules: &RulesConfig, elapsed: Duration, earned: u32) -> u32 {
    let decay = (elapsed.as_secs_f64() * rules.win_decay_per_sec as f64) as u32;
    let time_bonus = rules.win_base.saturating_sub(decay).max(rules.win_floor);
    let enemies = u32::try_from(rules.enemy_count).unwrap_or(u32::MAX);
    let difficulty = rules.difficulty_bonus_per_enemy.saturating_mul(enemies);
    time_bonus.saturating_add(difficulty).saturating_add(earned)
}

// ══════════════════════════════════════════════════════════════
// Commands
// ══════════════════════════════════════════════════════════════

/// Apply control commands and collect player intent.
/// None when the session was restarted, abandoned or ended this tick.
fn resolve_commands(world: &mut WorldState, events: &mut Vec<GameEvent>) -> Option<FrameInput> {
    let mut input = FrameInput::default();

    for command in world.drain_commands() {
        match command {
            Command::Pause | Command::TogglePause if world.phase == Phase::Running => {
                world.phase = Phase::Paused;
                events.push(GameEvent::Paused);
            }
            Command::Resume | Command::TogglePause if world.phase == Phase::Paused => {
                world.phase = Phase::Running;
                events.push(GameEvent::Resumed);
            }
            Command::Restart if world.phase != Phase::Menu => {
                world.restart();
                events.push(GameEvent::Restarted);
                return None;
            }
            Command::Abandon if world.phase != Phase::Menu => {
                world.abandon();
                events.push(GameEvent::Abandoned);
                return None;
            }
            Command::EndHunt
                if world.mode == Mode::Hunter
                    && matches!(world.phase, Phase::Running | Phase::Paused) =>
            {
                events.push(world.finish(Outcome::Ended));
                return None;
            }
            Command::ToggleRun if world.phase == Phase::Running => {
                world.running = !world.running;
                events.push(GameEvent::RunToggled { running: world.running });
            }
            Command::Move(dir) if world.phase == Phase::Running => {
                input.movement = Some(dir);
            }
            Command::PlaceTrap if world.phase == Phase::Running && world.mode == Mode::Escape => {
                input.place_trap = true;
            }
            _ => {}
        }
    }

    Some(input)
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_player_input(world: &mut WorldState, input: FrameInput, now: Duration, events: &mut Vec<GameEvent>) {
    if !world.player.alive { return; }

    if input.place_trap {
        if world.player.place_trap(&mut world.grid, now, &world.rules) {
            events.push(GameEvent::TrapPlaced { at: world.player.pos });
        } else {
            events.push(GameEvent::TrapRejected);
        }
    }

    let Some(dir) = input.movement else { return };
    let moved = match world.grid.neighbor(world.player.pos, dir) {
        Some(target) => world.player.try_move(&world.grid, target, world.running, &world.rules),
        None => false,
    };
    if moved {
        events.push(GameEvent::PlayerMoved { to: world.player.pos });
    } else {
        events.push(GameEvent::MoveRejected);
    }
}

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

fn resolve_enemy_movement(world: &mut WorldState, now: Duration, events: &mut Vec<GameEvent>) {
    let period = world.mode.enemy_period(&world.rules);
    if world.tick % period != 0 { return; }

    let target = world.player.pos;
    let flee = world.mode.enemies_flee();
    let delay = world.rules.respawn_delay();

    for i in 0..world.enemies.len() {
        if world.enemies[i].alive {
            world.enemies[i].move_toward_or_away(&world.grid, target, flee);
        } else if world.enemies[i].can_respawn(now, delay) {
            // No qualifying cell: stays dead, tried again next time.
            if let Some(at) = world.respawn_cell() {
                world.enemies[i].revive(at);
                let id = world.enemies[i].id;
                tracing::debug!(id, ?at, "enemy respawned");
                events.push(GameEvent::EnemyRespawned { id, at });
            }
        }
    }
}

/// Returns true when the game ended.
fn resolve_contact(world: &mut WorldState, now: Duration, events: &mut Vec<GameEvent>) -> bool {
    let player = world.player.pos;
    let hits: Vec<usize> = (0..world.enemies.len())
        .filter(|&i| world.enemies[i].alive && world.enemies[i].pos == player)
        .collect();
    if hits.is_empty() { return false; }

    match world.mode {
        Mode::Escape => {
            let by = world.enemies[hits[0]].id;
            world.player.alive = false;
            events.push(GameEvent::PlayerCaught { by });
            events.push(world.finish(Outcome::Caught));
            true
        }
        Mode::Hunter => {
            for i in hits {
                world.enemies[i].die(now);
                world.player.award(world.rules.capture_bonus);
                let (id, at) = (world.enemies[i].id, world.enemies[i].pos);
                tracing::debug!(id, ?at, score = world.player.score, "enemy captured");
                events.push(GameEvent::EnemyCaptured { id, at });
                spawn_replacement(world, events);
            }
            false
        }
    }
}

fn resolve_traps(world: &mut WorldState, now: Duration, events: &mut Vec<GameEvent>) {
    if world.mode != Mode::Escape { return; }

    for i in 0..world.enemies.len() {
        let at = world.enemies[i].pos;
        if !world.enemies[i].alive || !world.grid.get(at).is_armed_trap() { continue; }

        world.enemies[i].die(now);
        world.grid.clear_trap(at);
        world.player.award(world.rules.trap_bonus);
        world.player.trap_consumed();
        let id = world.enemies[i].id;
        tracing::debug!(id, ?at, "enemy trapped");
        events.push(GameEvent::EnemyTrapped { id, at });
    }
}

fn resolve_enemy_escapes(world: &mut WorldState, now: Duration, events: &mut Vec<GameEvent>) {
    if world.mode != Mode::Hunter { return; }

    let existing = world.enemies.len();
    for i in 0..existing {
        let e = &world.enemies[i];
        if !e.alive || e.escaped || world.grid.kind_at(e.pos) != TileKind::Exit { continue; }

        let (id, at) = (e.id, e.pos);
        world.enemies[i].escaped = true;
        world.enemies[i].die(now);
        world.player.penalize(world.rules.escape_penalty);
        tracing::debug!(id, ?at, score = world.player.score, "enemy escaped");
        events.push(GameEvent::EnemyEscaped { id, at });
        spawn_replacement(world, events);
    }
}

fn spawn_replacement(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if let Some((id, at)) = world.spawn_replacement() {
        events.push(GameEvent::EnemySpawned { id, at });
    }
}

// ══════════════════════════════════════════════════════════════
// Win
// ══════════════════════════════════════════════════════════════

/// Escape mode only; in hunter mode standing on an exit does nothing.
fn resolve_win(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    if world.mode != Mode::Escape { return false; }
    if world.grid.kind_at(world.player.pos) != TileKind::Exit { return false; }

    let score = escape_score(&world.rules, world.elapsed(), world.player.score);
    world.player.score = score;
    events.push(GameEvent::PlayerEscaped { score });
    events.push(world.finish(Outcome::Won));
    true
}
