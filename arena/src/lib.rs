//! Self-play training of agents for two-player arena games.
//!
//! The workspace consists of the following crates:
//!
//! * [arena-core](arena_core) holds the prioritized replay buffer, the
//!   schedules, the interfaces to the game host and the self-play loop.
//! * [arena-candle-agent](arena_candle_agent) implements the trainers with
//!   [candle](https://crates.io/crates/candle-core).
//! * [arena-tensorboard](arena_tensorboard) writes records as TensorBoard
//!   event files.
//!
//! This crate adds [`sim`], a toy arena standing in for a game host, and the
//! `arena-selfplay` binary.
pub mod sim;

pub use arena_candle_agent::{AgentConfig, ArenaAgent};
pub use arena_core::{config::ArenaConfig, self_play::SelfPlay};
pub use arena_tensorboard::TensorboardRecorder;

/// Configuration of a run with one of the candle agents.
pub type RunConfig = ArenaConfig<AgentConfig>;

/// Self-play loop of a candle agent in the toy arena.
pub type SimSelfPlay = SelfPlay<ArenaAgent, sim::SimEnvironment, sim::SimActuator>;
