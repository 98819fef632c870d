//! Prioritized experience replay.
//!
//! [`PrioritizedReplayBuffer`] is a ring buffer of [`Transition`]s with a
//! priority per slot. Batches are drawn with probability proportional to
//! `priority^alpha` and carry importance weights
//! `w_i = (N * P(i))^(-beta)` normalized by the batch maximum.
//!
//! [`Transition`]: crate::Transition
mod base;
mod config;
pub use base::{PrioritizedReplayBuffer, PRIORITY_EPS};
pub use config::{PerConfig, ReplayBufferConfig};
