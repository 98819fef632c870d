//! Configuration of the discrete SAC agent.
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

/// Configuration of [`DiscreteSac`](super::DiscreteSac).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DiscreteSacConfig {
    /// Dimension of the encoded state.
    pub state_dim: usize,

    /// Number of binary action dimensions.
    pub action_dim: usize,

    /// Units of the hidden layers of the actor.
    pub actor_units: Vec<usize>,

    /// Optimizer of the actor.
    pub actor_opt_config: OptimizerConfig,

    /// Critics.
    pub critic_config: CriticConfig,

    /// Batch size for training.
    pub batch_size: usize,

    /// Discount factor.
    pub discount_factor: f64,

    /// Weight of the entropy bonus.
    pub ent_coef: f64,

    /// Polyak factor of the target critics.
    pub tau: f64,

    /// Element-wise gradient clip.
    pub grad_clip: Option<f64>,

    /// Seed of the sampling of hard actions.
    pub seed: u64,

    /// Device of the networks.
    pub device: Device,
}

impl Default for DiscreteSacConfig {
    fn default() -> Self {
        Self {
            state_dim: 24,
            action_dim: 5,
            actor_units: vec![256, 256],
            actor_opt_config: OptimizerConfig::Adam { lr: 1e-4 },
            critic_config: CriticConfig::default(),
            batch_size: 256,
            discount_factor: 0.99,
            ent_coef: 0.3,
            tau: 0.005,
            grad_clip: None,
            seed: 42,
            device: Device::Cpu,
        }
    }
}

impl DiscreteSacConfig {
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

    /// Entropy coefficient.
    pub fn ent_coef(mut self, v: f64) -> Self {
        self.ent_coef = v;
        self
    }

    /// Polyak factor.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Gradient clip.
    pub fn grad_clip(mut self, v: Option<f64>) -> Self {
        self.grad_clip = v;
        self
    }

    /// Seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Configuration of the actor network.
    pub fn actor_config(&self) -> MlpConfig {
        MlpConfig::new(
            self.state_dim,
            self.actor_units.clone(),
            self.action_dim,
            Activation::Sigmoid,
        )
    }

    /// Constructs [`DiscreteSacConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of discrete SAC agent from {:?}", path_);
        Ok(b)
    }

    /// Saves [`DiscreteSacConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of discrete SAC agent into {:?}", path_);
        Ok(())
    }
}
