//! Configuration of a whole self-play run.
use crate::{
    replay_buffer::ReplayBufferConfig, reward::RewardConfig, schedule::ScheduleConfig,
    self_play::SelfPlayConfig, state::StateConfig,
};
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Every configuration of a run, with the agent configuration `A`.
///
/// This is the configuration stored in checkpoint documents.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct ArenaConfig<A> {
    /// Self-play loop.
    pub self_play: SelfPlayConfig,

    /// Replay buffer and prioritized sampling.
    pub replay_buffer: ReplayBufferConfig,

    /// Temperature and exploration schedules.
    pub schedule: ScheduleConfig,

    /// Reward shaping.
    pub reward: RewardConfig,

    /// State encoding.
    pub state: StateConfig,

    /// Agent.
    pub agent: A,
}

impl<A> ArenaConfig<A>
where
    A: Serialize + DeserializeOwned,
{
    /// Creates a configuration with default values except for the agent.
    pub fn new(agent: A) -> Self {
        Self {
            self_play: SelfPlayConfig::default(),
            replay_buffer: ReplayBufferConfig::default(),
            schedule: ScheduleConfig::default(),
            reward: RewardConfig::default(),
            state: StateConfig::default(),
            agent,
        }
    }

    /// Sets the configuration of the self-play loop.
    pub fn self_play(mut self, v: SelfPlayConfig) -> Self {
        self.self_play = v;
        self
    }

    /// Sets the configuration of the replay buffer.
    pub fn replay_buffer(mut self, v: ReplayBufferConfig) -> Self {
        self.replay_buffer = v;
        self
    }

    /// Sets the schedules.
    pub fn schedule(mut self, v: ScheduleConfig) -> Self {
        self.schedule = v;
        self
    }

    /// Sets the reward shaping.
    pub fn reward(mut self, v: RewardConfig) -> Self {
        self.reward = v;
        self
    }

    /// Sets the state encoding.
    pub fn state(mut self, v: StateConfig) -> Self {
        self.state = v;
        self
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
    struct DummyAgentConfig {
        units: Vec<usize>,
    }

    #[test]
    fn test_serde_arena_config() -> Result<()> {
        let config = ArenaConfig::new(DummyAgentConfig {
            units: vec![256, 256],
        })
        .self_play(SelfPlayConfig::default().max_ticks(10).forced_action(Some(vec![1.0; 5]), 3));

        let dir = TempDir::new("arena_config")?;
        let path = dir.path().join("arena.yaml");
        config.save(&path)?;
        let config_ = ArenaConfig::<DummyAgentConfig>::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
