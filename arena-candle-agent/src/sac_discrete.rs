//! Soft actor-critic with relaxed Bernoulli actions.
mod base;
mod config;
pub use base::{relaxed_bernoulli, DiscreteSac, FrozenBernoulli};
pub use config::DiscreteSacConfig;
