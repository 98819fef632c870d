#![warn(missing_docs)]
//! Core of self-play off-policy training for two-player arena games.
//!
//! * [`replay_buffer::PrioritizedReplayBuffer`] stores [`Transition`]s and
//!   samples them by priority.
//! * [`Agent`] is the interface of the trainers; implementations live in
//!   backend crates.
//! * [`Environment`] and [`Actuator`] connect the loop to the game host.
//! * [`self_play::SelfPlay`] plays matches, collects transitions of both
//!   players, trains the agent and rotates the pool of historical opponents.
pub mod checkpoint;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod record;
pub mod replay_buffer;
pub mod reward;
pub mod schedule;
pub mod self_play;
pub mod state;

mod base;
mod transition;
pub use base::{
    ActionKind, Actuator, Agent, Environment, InputIntent, PlayerId, PlayerSnapshot, Policy,
    SensorUnavailable, Snapshot, StateSnapshot, TrainContext, TrainOutput,
};
pub use transition::{Transition, TransitionBatch};
