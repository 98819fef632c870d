//! Configuration of DQN agent.
use crate::{mlp::DuelingMlpConfig, opt::OptimizerConfig, Device};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Dqn`](super::Dqn).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DqnConfig {
    /// Dimension of the encoded state.
    pub state_dim: usize,

    /// Number of binary action dimensions.
    pub action_dim: usize,

    /// Units of the shared layers of the Q-network.
    pub units: Vec<usize>,

    /// Optimizer of the Q-network.
    pub opt_config: OptimizerConfig,

    /// Batch size for training.
    pub batch_size: usize,

    /// Discount factor.
    pub discount_factor: f64,

    /// Number of training steps between copies of the Q-network into the target.
    pub target_update_frequency: usize,

    /// Element-wise gradient clip.
    pub grad_clip: Option<f64>,

    /// Device of the networks.
    pub device: Device,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            state_dim: 24,
            action_dim: 5,
            units: vec![256, 256],
            opt_config: OptimizerConfig::Adam { lr: 3e-4 },
            batch_size: 256,
            discount_factor: 0.99,
            target_update_frequency: 20,
            grad_clip: None,
            device: Device::Cpu,
        }
    }
}

impl DqnConfig {
    /// Sets the state and action dimensions.
    pub fn dims(mut self, state_dim: usize, action_dim: usize) -> Self {
        self.state_dim = state_dim;
        self.action_dim = action_dim;
        self
    }

    /// Sets the units of the shared layers.
    pub fn units(mut self, v: Vec<usize>) -> Self {
        self.units = v;
        self
    }

    /// Sets the optimizer.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
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

    /// Interval of target network updates.
    pub fn target_update_frequency(mut self, v: usize) -> Self {
        self.target_update_frequency = v;
        self
    }

    /// Gradient clip.
    pub fn grad_clip(mut self, v: Option<f64>) -> Self {
        self.grad_clip = v;
        self
    }

    /// Device.
    pub fn device(mut self, v: Device) -> Self {
        self.device = v;
        self
    }

    /// Configuration of the Q-network.
    pub fn q_config(&self) -> DuelingMlpConfig {
        DuelingMlpConfig {
            in_dim: self.state_dim,
            units: self.units.clone(),
            action_dim: self.action_dim,
        }
    }

    /// Constructs [`DqnConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of DQN agent from {:?}", path_);
        Ok(b)
    }

    /// Saves [`DqnConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of DQN agent into {:?}", path_);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_dqn_config() -> Result<()> {
        let config = DqnConfig::default()
            .dims(26, 6)
            .units(vec![64, 64])
            .grad_clip(Some(1.0))
            .target_update_frequency(50);

        let dir = TempDir::new("dqn_config")?;
        let path = dir.path().join("dqn_config.yaml");
        config.save(&path)?;
        let config_ = DqnConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
