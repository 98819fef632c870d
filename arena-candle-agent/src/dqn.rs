//! Double-Dueling Q-learning over multi-binary actions.
mod base;
mod config;
pub use base::{Dqn, FrozenDqn};
pub use config::DqnConfig;
