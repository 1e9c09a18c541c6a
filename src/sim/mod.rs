pub mod command;
pub mod event;
pub mod generator;
pub mod scores;
pub mod snapshot;
pub mod step;
pub mod world;
