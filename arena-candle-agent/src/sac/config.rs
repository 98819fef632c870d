//! Configuration of SAC agent.
use super::EntCoefMode;
use crate::{
    critic::CriticConfig,
    mlp::{Activation, MlpConfig},
    opt::OptimizerConfig,
    Device,
};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Sac`](super::Sac).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SacConfig {
    /// Dimension of the encoded state.
    pub state_dim: usize,

    /// Dimension of the action vectors.
    pub action_dim: usize,

    /// Units of the hidden layers of the actor.
    pub actor_units: Vec<usize>,

    /// Optimizer of the actor.
    pub actor_opt_config: OptimizerConfig,

    /// Critics.
    pub critic_config: CriticConfig,

    /// How to update entropy coefficient.
    pub ent_coef_mode: EntCoefMode,

    /// Batch size for training.
    pub batch_size: usize,

    /// Discount factor.
    pub discount_factor: f64,

    /// Multiplier of rewards in the TD target.
    pub reward_scale: f64,

    /// Polyak factor of the target critics.
    pub tau: f64,

    /// The actor and the entropy coefficient are updated every this many steps.
    pub actor_update_delay: usize,

    /// Element-wise gradient clip of the actor and the critics.
    pub grad_clip: Option<f64>,

    /// Lower bound of the log standard deviation.
    pub min_lstd: f64,

    /// Upper bound of the log standard deviation.
    pub max_lstd: f64,

    /// Device of the networks.
    pub device: Device,
}

impl Default for SacConfig {
    fn default() -> Self {
        Self {
            state_dim: 24,
            action_dim: 5,
            actor_units: vec![256, 256],
            actor_opt_config: OptimizerConfig::Adam { lr: 1e-4 },
            critic_config: CriticConfig::default(),
            ent_coef_mode: EntCoefMode::default(),
            batch_size: 256,
            discount_factor: 0.99,
            reward_scale: 1.0,
            tau: 0.005,
            actor_update_delay: 2,
            grad_clip: Some(0.5),
            min_lstd: -20.0,
            max_lstd: 2.0,
            device: Device::Cpu,
        }
    }
}

impl SacConfig {
    /// Sets the state and action dimensions.
    pub fn dims(mut self, state_dim: usize, action_dim: usize) -> Self {
        self.state_dim = state_dim;
        self.action_dim = action_dim;
        self
    }

    /// Sets the units of the hidden layers of the actor.
    pub fn actor_units(mut self, v: Vec<usize>) -> Self {
        self.actor_units = v;
        self
    }

    /// Sets the optimizer of the actor.
    pub fn actor_opt_config(mut self, v: OptimizerConfig) -> Self {
        self.actor_opt_config = v;
        self
    }

    /// Sets the critics.
    pub fn critic_config(mut self, v: CriticConfig) -> Self {
        self.critic_config = v;
        self
    }

    /// SAC-alpha.
    pub fn ent_coef_mode(mut self, v: EntCoefMode) -> Self {
        self.ent_coef_mode = v;
        self
    }

    /// Batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Reward scale.
    pub fn reward_scale(mut self, v: f64) -> Self {
        self.reward_scale = v;
        self
    }

    /// Polyak factor.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Delay of the actor updates.
    pub fn actor_update_delay(mut self, v: usize) -> Self {
        self.actor_update_delay = v;
        self
    }

    /// Gradient clip.
    pub fn grad_clip(mut self, v: Option<f64>) -> Self {
        self.grad_clip = v;
        self
    }

    /// Configuration of the actor network.
    pub fn actor_config(&self) -> MlpConfig {
        MlpConfig::new(
            self.state_dim,
            self.actor_units.clone(),
            self.action_dim,
            Activation::None,
        )
    }

    /// Constructs [`SacConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of SAC agent from {:?}", path_);
        Ok(b)
    }

    /// Saves [`SacConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of SAC agent into {:?}", path_);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_sac_config() -> Result<()> {
        let config = SacConfig::default()
            .dims(26, 6)
            .actor_units(vec![32])
            .reward_scale(2.0)
            .ent_coef_mode(EntCoefMode::Fix(0.1));

        let dir = TempDir::new("sac_config")?;
        let path = dir.path().join("sac_config.yaml");
        config.save(&path)?;
        assert_eq!(config, SacConfig::load(&path)?);
        Ok(())
    }
}
