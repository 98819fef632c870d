//! Self-play training loop.
mod base;
mod config;
mod pause;
pub use base::{LoopExit, MatchSummary, SelfPlay};
pub use config::SelfPlayConfig;
pub use pause::PauseHandle;
