//! Soft actor-critic (SAC) with tanh-Gaussian actions.
mod base;
mod config;
mod ent_coef;
pub use base::{tanh_gaussian, FrozenGaussian, Sac};
pub use config::SacConfig;
pub use ent_coef::{EntCoef, EntCoefMode};
