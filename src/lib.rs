//! Maze Chase core: maze generation, entities, enemy AI and the tick engine.
//!
//! The library owns no terminal, no global state and no wall clock of its
//! own. A driver builds a [`sim::world::WorldState`] from a
//! [`config::RulesConfig`] and a [`domain::clock::Clock`], submits
//! [`sim::command::Command`]s, calls [`sim::step::step`] once per tick and
//! renders [`sim::snapshot::RenderSnapshot`]s.

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;
