use crate::{
    dqn::{Dqn, DqnConfig, FrozenDqn},
    sac::{FrozenGaussian, Sac, SacConfig},
    sac_discrete::{DiscreteSac, DiscreteSacConfig, FrozenBernoulli},
    util::NamedTensors,
};
use anyhow::Result;
use arena_core::{
    ActionKind, Agent, Policy, Snapshot, TrainContext, TrainOutput, TransitionBatch,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Trainer selected in configuration.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum AgentConfig {
    /// Double-Dueling Q-learning.
    DoubleDueling(DqnConfig),

    /// Soft actor-critic with relaxed Bernoulli actions.
    DiscreteSac(DiscreteSacConfig),

    /// Soft actor-critic with tanh-Gaussian actions.
    ContinuousSac(SacConfig),
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::DoubleDueling(DqnConfig::default())
    }
}

impl AgentConfig {
    /// Dimension of the encoded state.
    pub fn state_dim(&self) -> usize {
        match self {
            Self::DoubleDueling(c) => c.state_dim,
            Self::DiscreteSac(c) => c.state_dim,
            Self::ContinuousSac(c) => c.state_dim,
        }
    }

    /// Dimension of the actions.
    pub fn action_dim(&self) -> usize {
        match self {
            Self::DoubleDueling(c) => c.action_dim,
            Self::DiscreteSac(c) => c.action_dim,
            Self::ContinuousSac(c) => c.action_dim,
        }
    }

    /// Constructs [`AgentConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load agent config from {:?}", path_);
        Ok(b)
    }

    /// Saves [`AgentConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Trainer held by an [`ArenaAgent`].
pub enum Trainer {
    /// Double-Dueling Q-learning.
    DoubleDueling(Dqn),

    /// Soft actor-critic with relaxed Bernoulli actions.
    DiscreteSac(DiscreteSac),

    /// Soft actor-critic with tanh-Gaussian actions.
    ContinuousSac(Sac),
}

/// Frozen policy of an [`ArenaAgent`].
pub enum FrozenPolicy {
    /// Greedy dueling Q-network.
    DoubleDueling(FrozenDqn),

    /// Bernoulli actor.
    DiscreteSac(FrozenBernoulli),

    /// Tanh-Gaussian actor.
    ContinuousSac(FrozenGaussian),
}

/// Agent over any of the trainers of this crate, selected by [`AgentConfig`].
pub struct ArenaAgent {
    config: AgentConfig,
    trainer: Trainer,
}

impl ArenaAgent {
    /// The underlying trainer.
    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }
}

/// Forwards a call to the agent in any variant.
macro_rules! dispatch {
    ($ty:ident, $value:expr, $agent:ident => $body:expr) => {
        match $value {
            $ty::DoubleDueling($agent) => $body,
            $ty::DiscreteSac($agent) => $body,
            $ty::ContinuousSac($agent) => $body,
        }
    };
}

impl Policy for ArenaAgent {
    fn sample(&mut self, state: &[f32]) -> Result<Vec<f32>> {
        dispatch!(Trainer, &mut self.trainer, a => a.sample(state))
    }
}

impl Snapshot for ArenaAgent {
    type Params = NamedTensors;

    fn export_params(&self) -> Result<NamedTensors> {
        dispatch!(Trainer, &self.trainer, a => a.export_params())
    }

    fn import_params(&mut self, params: &NamedTensors) -> Result<()> {
        dispatch!(Trainer, &mut self.trainer, a => a.import_params(params))
    }
}

impl Policy for FrozenPolicy {
    fn sample(&mut self, state: &[f32]) -> Result<Vec<f32>> {
        dispatch!(FrozenPolicy, self, p => p.sample(state))
    }
}

impl Snapshot for FrozenPolicy {
    type Params = NamedTensors;

    fn export_params(&self) -> Result<NamedTensors> {
        dispatch!(FrozenPolicy, self, p => p.export_params())
    }

    fn import_params(&mut self, params: &NamedTensors) -> Result<()> {
        dispatch!(FrozenPolicy, self, p => p.import_params(params))
    }
}

impl Agent for ArenaAgent {
    type Config = AgentConfig;
    type Frozen = FrozenPolicy;

    fn build(config: AgentConfig) -> Result<Self> {
        let trainer = match config.clone() {
            AgentConfig::DoubleDueling(c) => Trainer::DoubleDueling(Dqn::build(c)?),
            AgentConfig::DiscreteSac(c) => Trainer::DiscreteSac(DiscreteSac::build(c)?),
            AgentConfig::ContinuousSac(c) => Trainer::ContinuousSac(Sac::build(c)?),
        };
        Ok(Self { config, trainer })
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn action_kind(&self) -> ActionKind {
        dispatch!(Trainer, &self.trainer, a => a.action_kind())
    }

    fn action_dim(&self) -> usize {
        dispatch!(Trainer, &self.trainer, a => a.action_dim())
    }

    fn batch_size(&self) -> usize {
        dispatch!(Trainer, &self.trainer, a => a.batch_size())
    }

    fn opt(&mut self, batch: &TransitionBatch, ctx: &TrainContext) -> Result<Option<TrainOutput>> {
        dispatch!(Trainer, &mut self.trainer, a => a.opt(batch, ctx))
    }

    fn freeze(&self) -> Result<FrozenPolicy> {
        Ok(match &self.trainer {
            Trainer::DoubleDueling(a) => FrozenPolicy::DoubleDueling(a.freeze()?),
            Trainer::DiscreteSac(a) => FrozenPolicy::DiscreteSac(a.freeze()?),
            Trainer::ContinuousSac(a) => FrozenPolicy::ContinuousSac(a.freeze()?),
        })
    }
}
